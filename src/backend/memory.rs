//! In-process backend.
//!
//! Rows live in insertion order behind a single mutex. "Newest first" listings
//! walk the rows backwards and then sort stably, so rows created within the
//! same clock tick still come out newest first.

use super::*;
use crate::auth::{AuthTokenValue, PasswordCredentials, PasswordHasher};

use anyhow::anyhow;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::debug;
use uuid::Uuid;

/// Sessions unused for this long are dropped.
pub const DEFAULT_SESSION_IDLE_TTL_DAYS: i64 = 7;

struct MemorySession {
    user_id: String,
    last_used: DateTime<Utc>,
}

impl MemorySession {
    fn is_expired(&self, now: DateTime<Utc>, idle_ttl: chrono::Duration) -> bool {
        now - self.last_used >= idle_ttl
    }
}

#[derive(Default)]
struct MemoryState {
    credentials: Vec<PasswordCredentials>,
    sessions: HashMap<AuthTokenValue, MemorySession>,
    profiles: Vec<UserProfile>,
    timeslots: Vec<Timeslot>,
    bookings: Vec<Booking>,
    follows: Vec<Follow>,
    events: Vec<CalendarEvent>,
    attendees: Vec<EventAttendee>,
}

struct EventAttendee {
    event_id: String,
    user_id: String,
    #[allow(dead_code)]
    created_at: DateTime<Utc>,
}

pub struct MemoryBackend {
    hasher: PasswordHasher,
    session_idle_ttl: chrono::Duration,
    state: Mutex<MemoryState>,
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new(PasswordHasher::Argon2)
    }
}

impl MemoryBackend {
    pub fn new(hasher: PasswordHasher) -> Self {
        MemoryBackend {
            hasher,
            session_idle_ttl: chrono::Duration::days(DEFAULT_SESSION_IDLE_TTL_DAYS),
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub fn with_session_idle_ttl(mut self, idle_ttl: chrono::Duration) -> Self {
        self.session_idle_ttl = idle_ttl;
        self
    }

    /// Drops expired sessions, returning how many were removed.
    pub fn prune_sessions(&self) -> BackendResult<usize> {
        let now = Utc::now();
        let mut state = self.state()?;
        let before = state.sessions.len();
        state
            .sessions
            .retain(|_, session| !session.is_expired(now, self.session_idle_ttl));
        Ok(before - state.sessions.len())
    }

    fn state(&self) -> BackendResult<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| BackendError::Internal(anyhow!("Memory backend lock poisoned")))
    }
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn newest_first<T: Clone>(rows: impl DoubleEndedIterator<Item = T>, key: impl Fn(&T) -> DateTime<Utc>) -> Vec<T> {
    let mut rows: Vec<T> = rows.rev().collect();
    rows.sort_by(|a, b| key(b).cmp(&key(a)));
    rows
}

fn bookings_latest_first<'a>(rows: impl DoubleEndedIterator<Item = &'a Booking>) -> Vec<Booking> {
    let mut rows: Vec<Booking> = rows.rev().cloned().collect();
    rows.sort_by(|a, b| b.booking_date.cmp(&a.booking_date));
    rows
}

#[async_trait]
impl AuthBackend for MemoryBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        if self.state()?.credentials.iter().any(|c| c.email == email) {
            return Err(BackendError::Conflict("User already registered".to_string()));
        }

        // Hashing is slow, keep it out of the lock.
        let user_id = new_id();
        let credentials =
            PasswordCredentials::new(user_id.clone(), email.to_string(), password, self.hasher)?;

        let mut state = self.state()?;
        if state.credentials.iter().any(|c| c.email == email) {
            return Err(BackendError::Conflict("User already registered".to_string()));
        }
        state.credentials.push(credentials);
        debug!(user_id = %user_id, "Registered auth user");
        Ok(AuthUser {
            id: user_id,
            email: email.to_string(),
        })
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let credentials = self
            .state()?
            .credentials
            .iter()
            .find(|c| c.email == email)
            .cloned();

        let credentials = match credentials {
            Some(c) if c.verify(password)? => c,
            _ => {
                return Err(BackendError::Unauthorized(
                    "Invalid login credentials".to_string(),
                ))
            }
        };

        let pruned = self.prune_sessions()?;
        if pruned > 0 {
            debug!("Pruned {} expired sessions", pruned);
        }
        let token = AuthTokenValue::generate();
        self.state()?.sessions.insert(
            token.clone(),
            MemorySession {
                user_id: credentials.user_id.clone(),
                last_used: Utc::now(),
            },
        );
        Ok(AuthSession {
            access_token: token.0,
            user: AuthUser {
                id: credentials.user_id,
                email: credentials.email,
            },
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        let removed = self
            .state()?
            .sessions
            .remove(&AuthTokenValue(access_token.to_string()));
        match removed {
            Some(_) => Ok(()),
            None => Err(BackendError::Unauthorized("Invalid session".to_string())),
        }
    }

    async fn get_user(&self, access_token: &str) -> BackendResult<Option<AuthUser>> {
        let now = Utc::now();
        let token = AuthTokenValue(access_token.to_string());
        let mut state = self.state()?;
        let live_user_id = match state.sessions.get_mut(&token) {
            None => return Ok(None),
            Some(session) if session.is_expired(now, self.session_idle_ttl) => None,
            Some(session) => {
                session.last_used = now;
                Some(session.user_id.clone())
            }
        };
        let user_id = match live_user_id {
            Some(id) => id,
            None => {
                state.sessions.remove(&token);
                return Ok(None);
            }
        };
        Ok(state
            .credentials
            .iter()
            .find(|c| c.user_id == user_id)
            .map(|c| AuthUser {
                id: c.user_id.clone(),
                email: c.email.clone(),
            }))
    }
}

#[async_trait]
impl ProfileStore for MemoryBackend {
    async fn insert_profile(&self, profile: NewUserProfile) -> BackendResult<UserProfile> {
        let mut state = self.state()?;
        if state.profiles.iter().any(|p| p.id == profile.id) {
            return Err(BackendError::Conflict(format!(
                "Profile {} already exists",
                profile.id
            )));
        }
        let row = UserProfile {
            id: profile.id,
            name: profile.name,
            title: profile.title,
            bio: profile.bio,
            category: profile.category,
            avatar: profile.avatar,
            rating: profile.rating,
            reviews_count: profile.reviews_count,
            followers_count: profile.followers_count,
            following_count: profile.following_count,
            created_at: Utc::now(),
        };
        state.profiles.push(row.clone());
        Ok(row)
    }

    async fn get_profile(&self, user_id: &str) -> BackendResult<Option<UserProfile>> {
        Ok(self
            .state()?
            .profiles
            .iter()
            .find(|p| p.id == user_id)
            .cloned())
    }

    async fn get_profiles(&self, user_ids: &[String]) -> BackendResult<Vec<UserProfile>> {
        let state = self.state()?;
        Ok(newest_first(
            state
                .profiles
                .iter()
                .filter(|p| user_ids.contains(&p.id))
                .cloned(),
            |p| p.created_at,
        ))
    }

    async fn list_profiles(&self) -> BackendResult<Vec<UserProfile>> {
        let state = self.state()?;
        Ok(newest_first(state.profiles.iter().cloned(), |p| p.created_at))
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> BackendResult<Option<UserProfile>> {
        let mut state = self.state()?;
        Ok(state
            .profiles
            .iter_mut()
            .find(|p| p.id == user_id)
            .map(|p| {
                p.name = update.name;
                p.avatar = update.avatar;
                p.title = update.title;
                p.bio = update.bio;
                p.category = update.category;
                p.clone()
            }))
    }
}

#[async_trait]
impl TimeslotStore for MemoryBackend {
    async fn insert_timeslot(&self, timeslot: NewTimeslot) -> BackendResult<Timeslot> {
        let row = Timeslot {
            id: new_id(),
            user_id: timeslot.user_id,
            title: timeslot.title,
            description: timeslot.description,
            duration: timeslot.duration,
            location: timeslot.location,
            price: timeslot.price,
            available_days: timeslot.available_days,
            available_times: timeslot.available_times,
            requires_approval: timeslot.requires_approval,
            created_at: Utc::now(),
        };
        self.state()?.timeslots.push(row.clone());
        Ok(row)
    }

    async fn get_timeslot(&self, id: &str) -> BackendResult<Option<Timeslot>> {
        Ok(self
            .state()?
            .timeslots
            .iter()
            .find(|t| t.id == id)
            .cloned())
    }

    async fn get_timeslots(&self, ids: &[String]) -> BackendResult<Vec<Timeslot>> {
        Ok(self
            .state()?
            .timeslots
            .iter()
            .filter(|t| ids.contains(&t.id))
            .cloned()
            .collect())
    }

    async fn list_user_timeslots(&self, user_id: &str) -> BackendResult<Vec<Timeslot>> {
        let state = self.state()?;
        Ok(newest_first(
            state
                .timeslots
                .iter()
                .filter(|t| t.user_id == user_id)
                .cloned(),
            |t| t.created_at,
        ))
    }

    async fn delete_timeslot(&self, id: &str) -> BackendResult<bool> {
        let mut state = self.state()?;
        let before = state.timeslots.len();
        state.timeslots.retain(|t| t.id != id);
        Ok(state.timeslots.len() != before)
    }
}

#[async_trait]
impl BookingStore for MemoryBackend {
    async fn insert_booking(&self, booking: NewBooking) -> BackendResult<Booking> {
        let mut state = self.state()?;
        if booking.status.is_active()
            && state.bookings.iter().any(|b| {
                b.status.is_active()
                    && b.timeslot_id == booking.timeslot_id
                    && b.booking_date == booking.booking_date
                    && b.booking_time == booking.booking_time
            })
        {
            return Err(BackendError::Conflict(format!(
                "{} {} is already booked",
                booking.booking_date, booking.booking_time
            )));
        }

        let row = Booking {
            id: new_id(),
            timeslot_id: booking.timeslot_id,
            host_id: booking.host_id,
            guest_id: booking.guest_id,
            booking_date: booking.booking_date,
            booking_time: booking.booking_time,
            price: booking.price,
            status: booking.status,
            created_at: Utc::now(),
        };
        state.bookings.push(row.clone());
        Ok(row)
    }

    async fn get_booking(&self, id: &str) -> BackendResult<Option<Booking>> {
        Ok(self
            .state()?
            .bookings
            .iter()
            .find(|b| b.id == id)
            .cloned())
    }

    async fn list_guest_bookings(&self, user_id: &str) -> BackendResult<Vec<Booking>> {
        let state = self.state()?;
        Ok(bookings_latest_first(
            state.bookings.iter().filter(|b| b.guest_id == user_id),
        ))
    }

    async fn list_host_bookings(&self, user_id: &str) -> BackendResult<Vec<Booking>> {
        let state = self.state()?;
        Ok(bookings_latest_first(
            state.bookings.iter().filter(|b| b.host_id == user_id),
        ))
    }

    async fn list_slot_bookings_on(
        &self,
        timeslot_id: &str,
        date: NaiveDate,
    ) -> BackendResult<Vec<Booking>> {
        Ok(self
            .state()?
            .bookings
            .iter()
            .filter(|b| b.timeslot_id == timeslot_id && b.booking_date == date)
            .cloned()
            .collect())
    }

    async fn update_booking_status(
        &self,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> BackendResult<Option<Booking>> {
        let mut state = self.state()?;
        Ok(state
            .bookings
            .iter_mut()
            .find(|b| b.id == id && b.status == from)
            .map(|b| {
                b.status = to;
                b.clone()
            }))
    }
}

#[async_trait]
impl FollowStore for MemoryBackend {
    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> BackendResult<bool> {
        let mut state = self.state()?;
        if state
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id)
        {
            return Ok(false);
        }
        state.follows.push(Follow {
            follower_id: follower_id.to_string(),
            following_id: following_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn delete_follow(&self, follower_id: &str, following_id: &str) -> BackendResult<bool> {
        let mut state = self.state()?;
        let before = state.follows.len();
        state
            .follows
            .retain(|f| !(f.follower_id == follower_id && f.following_id == following_id));
        Ok(state.follows.len() != before)
    }

    async fn is_following(&self, follower_id: &str, following_id: &str) -> BackendResult<bool> {
        Ok(self
            .state()?
            .follows
            .iter()
            .any(|f| f.follower_id == follower_id && f.following_id == following_id))
    }

    async fn list_following_ids(&self, follower_id: &str) -> BackendResult<Vec<String>> {
        Ok(self
            .state()?
            .follows
            .iter()
            .filter(|f| f.follower_id == follower_id)
            .map(|f| f.following_id.clone())
            .collect())
    }

    async fn list_follower_ids(&self, following_id: &str) -> BackendResult<Vec<String>> {
        Ok(self
            .state()?
            .follows
            .iter()
            .filter(|f| f.following_id == following_id)
            .map(|f| f.follower_id.clone())
            .collect())
    }
}

#[async_trait]
impl EventStore for MemoryBackend {
    async fn insert_event(&self, event: NewCalendarEvent) -> BackendResult<CalendarEvent> {
        let row = CalendarEvent {
            id: new_id(),
            user_id: event.user_id,
            title: event.title,
            description: event.description,
            event_date: event.event_date,
            event_time: event.event_time,
            location: event.location,
            attendees_count: 0,
            created_at: Utc::now(),
        };
        self.state()?.events.push(row.clone());
        Ok(row)
    }

    async fn get_event(&self, id: &str) -> BackendResult<Option<CalendarEvent>> {
        Ok(self.state()?.events.iter().find(|e| e.id == id).cloned())
    }

    async fn list_events_by(&self, user_ids: &[String]) -> BackendResult<Vec<CalendarEvent>> {
        let mut events: Vec<CalendarEvent> = self
            .state()?
            .events
            .iter()
            .filter(|e| user_ids.contains(&e.user_id))
            .cloned()
            .collect();
        events.sort_by(|a, b| a.event_date.cmp(&b.event_date));
        Ok(events)
    }

    async fn insert_attendee(&self, event_id: &str, user_id: &str) -> BackendResult<bool> {
        let mut state = self.state()?;
        if state
            .attendees
            .iter()
            .any(|a| a.event_id == event_id && a.user_id == user_id)
        {
            return Ok(false);
        }
        state.attendees.push(EventAttendee {
            event_id: event_id.to_string(),
            user_id: user_id.to_string(),
            created_at: Utc::now(),
        });
        Ok(true)
    }

    async fn delete_attendee(&self, event_id: &str, user_id: &str) -> BackendResult<bool> {
        let mut state = self.state()?;
        let before = state.attendees.len();
        state
            .attendees
            .retain(|a| !(a.event_id == event_id && a.user_id == user_id));
        Ok(state.attendees.len() != before)
    }

    async fn attended_event_ids(
        &self,
        user_id: &str,
        event_ids: &[String],
    ) -> BackendResult<Vec<String>> {
        Ok(self
            .state()?
            .attendees
            .iter()
            .filter(|a| a.user_id == user_id && event_ids.contains(&a.event_id))
            .map(|a| a.event_id.clone())
            .collect())
    }
}

#[async_trait]
impl CounterRpc for MemoryBackend {
    async fn increment(&self, counter: Counter, id: &str, amount: i64) -> BackendResult<()> {
        let mut state = self.state()?;
        match counter {
            Counter::FollowerCount => {
                if let Some(p) = state.profiles.iter_mut().find(|p| p.id == id) {
                    p.followers_count += amount;
                }
            }
            Counter::FollowingCount => {
                if let Some(p) = state.profiles.iter_mut().find(|p| p.id == id) {
                    p.following_count += amount;
                }
            }
            Counter::EventAttendees => {
                if let Some(e) = state.events.iter_mut().find(|e| e.id == id) {
                    e.attendees_count += amount;
                }
            }
        }
        Ok(())
    }
}
