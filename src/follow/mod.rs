use crate::backend::{Backend, Counter};
use crate::error::{ServiceError, ServiceResult};

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FollowState {
    pub user_id: String,
    pub following: bool,
    pub followers_count: i64,
}

pub struct FollowManager {
    backend: Arc<dyn Backend>,
}

impl FollowManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        FollowManager { backend }
    }

    async fn ensure_target(&self, follower_id: &str, target_id: &str) -> ServiceResult<()> {
        if follower_id == target_id {
            return Err(ServiceError::invalid("You cannot follow yourself"));
        }
        if self.backend.get_profile(target_id).await?.is_none() {
            return Err(ServiceError::not_found(format!("User {}", target_id)));
        }
        Ok(())
    }

    /// Counter RPCs run after the follows row changed and cannot be rolled
    /// back with it, so failures are only logged.
    async fn adjust_counters(&self, follower_id: &str, target_id: &str, amount: i64) {
        let updates = [
            (Counter::FollowerCount, target_id),
            (Counter::FollowingCount, follower_id),
        ];
        for (counter, id) in updates {
            if let Err(err) = self.backend.increment(counter, id, amount).await {
                warn!(
                    counter = counter.rpc_name(),
                    user_id = id,
                    amount,
                    "Counter update failed: {}",
                    err
                );
            }
        }
    }

    pub async fn follow(&self, follower_id: &str, target_id: &str) -> ServiceResult<FollowState> {
        self.ensure_target(follower_id, target_id).await?;
        if self.backend.insert_follow(follower_id, target_id).await? {
            self.adjust_counters(follower_id, target_id, 1).await;
            info!(follower_id, target_id, "Followed");
        }
        self.state(follower_id, target_id).await
    }

    pub async fn unfollow(&self, follower_id: &str, target_id: &str) -> ServiceResult<FollowState> {
        self.ensure_target(follower_id, target_id).await?;
        if self.backend.delete_follow(follower_id, target_id).await? {
            self.adjust_counters(follower_id, target_id, -1).await;
            info!(follower_id, target_id, "Unfollowed");
        }
        self.state(follower_id, target_id).await
    }

    pub async fn state(&self, viewer_id: &str, target_id: &str) -> ServiceResult<FollowState> {
        let profile = self
            .backend
            .get_profile(target_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("User {}", target_id)))?;
        Ok(FollowState {
            following: self.backend.is_following(viewer_id, target_id).await?,
            followers_count: profile.followers_count,
            user_id: profile.id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::PasswordHasher;
    use crate::backend::{
        BackendError, BackendResult, CounterRpc, MemoryBackend, NewUserProfile, ProfileStore,
    };

    async fn backend_with(ids: &[&str]) -> Arc<MemoryBackend> {
        let backend = Arc::new(MemoryBackend::new(PasswordHasher::Argon2Fast));
        for id in ids {
            backend
                .insert_profile(NewUserProfile::with_defaults(
                    id.to_string(),
                    id.to_string(),
                    String::new(),
                ))
                .await
                .unwrap();
        }
        backend
    }

    #[tokio::test]
    async fn follow_and_unfollow_adjust_counters_once() {
        let backend = backend_with(&["a", "b"]).await;
        let manager = FollowManager::new(backend.clone());

        let state = manager.follow("a", "b").await.unwrap();
        assert!(state.following);
        assert_eq!(state.followers_count, 1);

        // Second follow is a no-op.
        let state = manager.follow("a", "b").await.unwrap();
        assert_eq!(state.followers_count, 1);
        let a = backend.get_profile("a").await.unwrap().unwrap();
        assert_eq!(a.following_count, 1);

        let state = manager.unfollow("a", "b").await.unwrap();
        assert!(!state.following);
        assert_eq!(state.followers_count, 0);

        let state = manager.unfollow("a", "b").await.unwrap();
        assert_eq!(state.followers_count, 0);
        let a = backend.get_profile("a").await.unwrap().unwrap();
        assert_eq!(a.following_count, 0);
    }

    #[tokio::test]
    async fn cannot_follow_self_or_missing_user() {
        let backend = backend_with(&["a"]).await;
        let manager = FollowManager::new(backend);

        assert!(matches!(
            manager.follow("a", "a").await,
            Err(ServiceError::InvalidInput(_))
        ));
        assert!(matches!(
            manager.follow("a", "ghost").await,
            Err(ServiceError::NotFound(_))
        ));
    }

    /// Memory backend whose counter procedures always fail.
    struct BrokenCounters(MemoryBackend);

    macro_rules! delegate {
        ($($trait_name:ident { $(fn $name:ident(&self $(, $arg:ident: $ty:ty)*) -> $ret:ty;)* })*) => {
            $(
                #[async_trait::async_trait]
                impl crate::backend::$trait_name for BrokenCounters {
                    $(async fn $name(&self $(, $arg: $ty)*) -> $ret {
                        crate::backend::$trait_name::$name(&self.0 $(, $arg)*).await
                    })*
                }
            )*
        };
    }

    delegate! {
        AuthBackend {
            fn sign_up(&self, email: &str, password: &str) -> BackendResult<crate::backend::AuthUser>;
            fn sign_in(&self, email: &str, password: &str) -> BackendResult<crate::backend::AuthSession>;
            fn sign_out(&self, token: &str) -> BackendResult<()>;
            fn get_user(&self, token: &str) -> BackendResult<Option<crate::backend::AuthUser>>;
        }
        ProfileStore {
            fn insert_profile(&self, profile: NewUserProfile) -> BackendResult<crate::backend::UserProfile>;
            fn get_profile(&self, id: &str) -> BackendResult<Option<crate::backend::UserProfile>>;
            fn get_profiles(&self, ids: &[String]) -> BackendResult<Vec<crate::backend::UserProfile>>;
            fn list_profiles(&self) -> BackendResult<Vec<crate::backend::UserProfile>>;
            fn update_profile(&self, id: &str, update: crate::backend::ProfileUpdate) -> BackendResult<Option<crate::backend::UserProfile>>;
        }
        TimeslotStore {
            fn insert_timeslot(&self, t: crate::backend::NewTimeslot) -> BackendResult<crate::backend::Timeslot>;
            fn get_timeslot(&self, id: &str) -> BackendResult<Option<crate::backend::Timeslot>>;
            fn get_timeslots(&self, ids: &[String]) -> BackendResult<Vec<crate::backend::Timeslot>>;
            fn list_user_timeslots(&self, id: &str) -> BackendResult<Vec<crate::backend::Timeslot>>;
            fn delete_timeslot(&self, id: &str) -> BackendResult<bool>;
        }
        BookingStore {
            fn insert_booking(&self, b: crate::backend::NewBooking) -> BackendResult<crate::backend::Booking>;
            fn get_booking(&self, id: &str) -> BackendResult<Option<crate::backend::Booking>>;
            fn list_guest_bookings(&self, id: &str) -> BackendResult<Vec<crate::backend::Booking>>;
            fn list_host_bookings(&self, id: &str) -> BackendResult<Vec<crate::backend::Booking>>;
            fn list_slot_bookings_on(&self, id: &str, date: chrono::NaiveDate) -> BackendResult<Vec<crate::backend::Booking>>;
            fn update_booking_status(&self, id: &str, from: crate::backend::BookingStatus, to: crate::backend::BookingStatus) -> BackendResult<Option<crate::backend::Booking>>;
        }
        FollowStore {
            fn insert_follow(&self, a: &str, b: &str) -> BackendResult<bool>;
            fn delete_follow(&self, a: &str, b: &str) -> BackendResult<bool>;
            fn is_following(&self, a: &str, b: &str) -> BackendResult<bool>;
            fn list_following_ids(&self, a: &str) -> BackendResult<Vec<String>>;
            fn list_follower_ids(&self, a: &str) -> BackendResult<Vec<String>>;
        }
        EventStore {
            fn insert_event(&self, e: crate::backend::NewCalendarEvent) -> BackendResult<crate::backend::CalendarEvent>;
            fn get_event(&self, id: &str) -> BackendResult<Option<crate::backend::CalendarEvent>>;
            fn list_events_by(&self, ids: &[String]) -> BackendResult<Vec<crate::backend::CalendarEvent>>;
            fn insert_attendee(&self, e: &str, u: &str) -> BackendResult<bool>;
            fn delete_attendee(&self, e: &str, u: &str) -> BackendResult<bool>;
            fn attended_event_ids(&self, u: &str, ids: &[String]) -> BackendResult<Vec<String>>;
        }
    }

    #[async_trait::async_trait]
    impl CounterRpc for BrokenCounters {
        async fn increment(&self, _: Counter, _: &str, _: i64) -> BackendResult<()> {
            Err(BackendError::Unavailable("rpc down".to_string()))
        }
    }

    #[tokio::test]
    async fn counter_failures_do_not_fail_follow() {
        let inner = MemoryBackend::new(PasswordHasher::Argon2Fast);
        for id in ["a", "b"] {
            inner
                .insert_profile(NewUserProfile::with_defaults(
                    id.to_string(),
                    id.to_string(),
                    String::new(),
                ))
                .await
                .unwrap();
        }
        let manager = FollowManager::new(Arc::new(BrokenCounters(inner)));

        let state = manager.follow("a", "b").await.unwrap();
        assert!(state.following);
        assert_eq!(state.followers_count, 0);
    }
}
