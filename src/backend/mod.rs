//! Data access seam.
//!
//! Every user action ends up as one or more calls on these traits. The
//! production implementation talks to Supabase over REST, the memory one keeps
//! rows in process and is used for local runs and tests.

mod memory;
pub mod models;

pub use memory::MemoryBackend;
pub use models::*;

use async_trait::async_trait;
use chrono::NaiveDate;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Backend unavailable: {0}")]
    Unavailable(String),

    #[error("Internal error: {0}")]
    Internal(#[from] anyhow::Error),
}

pub type BackendResult<T> = Result<T, BackendError>;

#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Creates the auth user. Duplicate emails are a [`BackendError::Conflict`].
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser>;

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession>;

    async fn sign_out(&self, access_token: &str) -> BackendResult<()>;

    /// Resolves an access token, `None` when it is unknown or expired.
    async fn get_user(&self, access_token: &str) -> BackendResult<Option<AuthUser>>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn insert_profile(&self, profile: NewUserProfile) -> BackendResult<UserProfile>;

    async fn get_profile(&self, user_id: &str) -> BackendResult<Option<UserProfile>>;

    async fn get_profiles(&self, user_ids: &[String]) -> BackendResult<Vec<UserProfile>>;

    /// All profiles, newest first.
    async fn list_profiles(&self) -> BackendResult<Vec<UserProfile>>;

    async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> BackendResult<Option<UserProfile>>;
}

#[async_trait]
pub trait TimeslotStore: Send + Sync {
    async fn insert_timeslot(&self, timeslot: NewTimeslot) -> BackendResult<Timeslot>;

    async fn get_timeslot(&self, id: &str) -> BackendResult<Option<Timeslot>>;

    async fn get_timeslots(&self, ids: &[String]) -> BackendResult<Vec<Timeslot>>;

    /// Timeslots hosted by `user_id`, newest first.
    async fn list_user_timeslots(&self, user_id: &str) -> BackendResult<Vec<Timeslot>>;

    /// Returns false when nothing was deleted.
    async fn delete_timeslot(&self, id: &str) -> BackendResult<bool>;
}

#[async_trait]
pub trait BookingStore: Send + Sync {
    async fn insert_booking(&self, booking: NewBooking) -> BackendResult<Booking>;

    async fn get_booking(&self, id: &str) -> BackendResult<Option<Booking>>;

    /// Bookings where `user_id` is the guest, latest booking date first.
    async fn list_guest_bookings(&self, user_id: &str) -> BackendResult<Vec<Booking>>;

    /// Bookings where `user_id` is the host, latest booking date first.
    async fn list_host_bookings(&self, user_id: &str) -> BackendResult<Vec<Booking>>;

    async fn list_slot_bookings_on(
        &self,
        timeslot_id: &str,
        date: NaiveDate,
    ) -> BackendResult<Vec<Booking>>;

    /// Sets `to` only if the row is still in `from`. `None` means the row
    /// was not in `from` (or is gone).
    async fn update_booking_status(
        &self,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> BackendResult<Option<Booking>>;
}

#[async_trait]
pub trait FollowStore: Send + Sync {
    /// Returns false when the pair already existed.
    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> BackendResult<bool>;

    /// Returns false when there was nothing to delete.
    async fn delete_follow(&self, follower_id: &str, following_id: &str) -> BackendResult<bool>;

    async fn is_following(&self, follower_id: &str, following_id: &str) -> BackendResult<bool>;

    async fn list_following_ids(&self, follower_id: &str) -> BackendResult<Vec<String>>;

    async fn list_follower_ids(&self, following_id: &str) -> BackendResult<Vec<String>>;
}

#[async_trait]
pub trait EventStore: Send + Sync {
    async fn insert_event(&self, event: NewCalendarEvent) -> BackendResult<CalendarEvent>;

    async fn get_event(&self, id: &str) -> BackendResult<Option<CalendarEvent>>;

    /// Events authored by any of `user_ids`, earliest date first.
    async fn list_events_by(&self, user_ids: &[String]) -> BackendResult<Vec<CalendarEvent>>;

    /// Returns false when the pair already existed.
    async fn insert_attendee(&self, event_id: &str, user_id: &str) -> BackendResult<bool>;

    /// Returns false when there was nothing to delete.
    async fn delete_attendee(&self, event_id: &str, user_id: &str) -> BackendResult<bool>;

    /// Subset of `event_ids` that `user_id` attends.
    async fn attended_event_ids(
        &self,
        user_id: &str,
        event_ids: &[String],
    ) -> BackendResult<Vec<String>>;
}

#[async_trait]
pub trait CounterRpc: Send + Sync {
    async fn increment(&self, counter: Counter, id: &str, amount: i64) -> BackendResult<()>;
}

pub trait Backend:
    AuthBackend + ProfileStore + TimeslotStore + BookingStore + FollowStore + EventStore + CounterRpc
{
}

impl<T> Backend for T where
    T: AuthBackend
        + ProfileStore
        + TimeslotStore
        + BookingStore
        + FollowStore
        + EventStore
        + CounterRpc
{
}
