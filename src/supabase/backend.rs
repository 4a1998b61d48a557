use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::client::SupabaseClient;
use super::query::Query;
use crate::backend::*;

const USERS: &str = "users";
const TIMESLOTS: &str = "timeslots";
const BOOKINGS: &str = "bookings";
const FOLLOWS: &str = "follows";
const CALENDAR_EVENTS: &str = "calendar_events";
const EVENT_ATTENDEES: &str = "event_attendees";

/// Signup answers with a session when email confirmation is off and with the
/// bare user otherwise.
#[derive(Deserialize)]
#[serde(untagged)]
enum SignUpResponse {
    WithSession { user: AuthUser },
    User(AuthUser),
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    user: AuthUser,
}

#[derive(Deserialize)]
struct FollowingIdRow {
    following_id: String,
}

#[derive(Deserialize)]
struct FollowerIdRow {
    follower_id: String,
}

#[derive(Deserialize)]
struct AttendeeRow {
    event_id: String,
}

pub struct SupabaseBackend {
    client: SupabaseClient,
}

impl SupabaseBackend {
    pub fn new(url: &str, service_key: &str, timeout_sec: u64) -> Result<Self> {
        Ok(SupabaseBackend {
            client: SupabaseClient::new(url, service_key, timeout_sec)?,
        })
    }
}

fn follow_pair(follower_id: &str, following_id: &str) -> Query {
    Query::new()
        .eq("follower_id", follower_id)
        .eq("following_id", following_id)
}

fn attendee_pair(event_id: &str, user_id: &str) -> Query {
    Query::new().eq("event_id", event_id).eq("user_id", user_id)
}

/// Unique violations on pair tables mean the row is already there.
fn inserted(result: BackendResult<serde_json::Value>) -> BackendResult<bool> {
    match result {
        Ok(_) => Ok(true),
        Err(BackendError::Conflict(_)) => Ok(false),
        Err(err) => Err(err),
    }
}

#[async_trait]
impl AuthBackend for SupabaseBackend {
    async fn sign_up(&self, email: &str, password: &str) -> BackendResult<AuthUser> {
        let body = json!({ "email": email, "password": password });
        let response: SignUpResponse = self
            .client
            .auth_post("signup", &body, None)
            .await
            .map_err(|err| match err {
                BackendError::Rejected { status: 422, message }
                    if message.to_lowercase().contains("already") =>
                {
                    BackendError::Conflict(message)
                }
                other => other,
            })?;

        let user = match response {
            SignUpResponse::WithSession { user } => user,
            SignUpResponse::User(user) => user,
        };
        debug!(user_id = %user.id, "Created auth user");
        Ok(user)
    }

    async fn sign_in(&self, email: &str, password: &str) -> BackendResult<AuthSession> {
        let body = json!({ "email": email, "password": password });
        let response: TokenResponse = self
            .client
            .auth_post("token?grant_type=password", &body, None)
            .await
            .map_err(|err| match err {
                BackendError::Rejected { status: 400, message } => {
                    BackendError::Unauthorized(message)
                }
                other => other,
            })?;

        Ok(AuthSession {
            access_token: response.access_token,
            user: response.user,
        })
    }

    async fn sign_out(&self, access_token: &str) -> BackendResult<()> {
        self.client.auth_logout(access_token).await
    }

    async fn get_user(&self, access_token: &str) -> BackendResult<Option<AuthUser>> {
        self.client.auth_user(access_token).await
    }
}

#[async_trait]
impl ProfileStore for SupabaseBackend {
    async fn insert_profile(&self, profile: NewUserProfile) -> BackendResult<UserProfile> {
        self.client.insert(USERS, &profile).await
    }

    async fn get_profile(&self, user_id: &str) -> BackendResult<Option<UserProfile>> {
        let query = Query::new().select("*").eq("id", user_id).limit(1);
        let rows: Vec<UserProfile> = self.client.select(USERS, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_profiles(&self, user_ids: &[String]) -> BackendResult<Vec<UserProfile>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let query = Query::new()
            .select("*")
            .in_list("id", user_ids)
            .order("created_at", false);
        self.client.select(USERS, &query).await
    }

    async fn list_profiles(&self) -> BackendResult<Vec<UserProfile>> {
        let query = Query::new().select("*").order("created_at", false);
        self.client.select(USERS, &query).await
    }

    async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> BackendResult<Option<UserProfile>> {
        let query = Query::new().eq("id", user_id);
        let rows: Vec<UserProfile> = self.client.update(USERS, &query, &update).await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl TimeslotStore for SupabaseBackend {
    async fn insert_timeslot(&self, timeslot: NewTimeslot) -> BackendResult<Timeslot> {
        self.client.insert(TIMESLOTS, &timeslot).await
    }

    async fn get_timeslot(&self, id: &str) -> BackendResult<Option<Timeslot>> {
        let query = Query::new().select("*").eq("id", id).limit(1);
        let rows: Vec<Timeslot> = self.client.select(TIMESLOTS, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn get_timeslots(&self, ids: &[String]) -> BackendResult<Vec<Timeslot>> {
        if ids.is_empty() {
            return Ok(vec![]);
        }
        let query = Query::new().select("*").in_list("id", ids);
        self.client.select(TIMESLOTS, &query).await
    }

    async fn list_user_timeslots(&self, user_id: &str) -> BackendResult<Vec<Timeslot>> {
        let query = Query::new()
            .select("*")
            .eq("user_id", user_id)
            .order("created_at", false);
        self.client.select(TIMESLOTS, &query).await
    }

    async fn delete_timeslot(&self, id: &str) -> BackendResult<bool> {
        let query = Query::new().eq("id", id);
        let rows: Vec<serde_json::Value> = self.client.delete(TIMESLOTS, &query).await?;
        Ok(!rows.is_empty())
    }
}

#[async_trait]
impl BookingStore for SupabaseBackend {
    async fn insert_booking(&self, booking: NewBooking) -> BackendResult<Booking> {
        self.client.insert(BOOKINGS, &booking).await
    }

    async fn get_booking(&self, id: &str) -> BackendResult<Option<Booking>> {
        let query = Query::new().select("*").eq("id", id).limit(1);
        let rows: Vec<Booking> = self.client.select(BOOKINGS, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_guest_bookings(&self, user_id: &str) -> BackendResult<Vec<Booking>> {
        let query = Query::new()
            .select("*")
            .eq("guest_id", user_id)
            .order("booking_date", false)
            .order("created_at", false);
        self.client.select(BOOKINGS, &query).await
    }

    async fn list_host_bookings(&self, user_id: &str) -> BackendResult<Vec<Booking>> {
        let query = Query::new()
            .select("*")
            .eq("host_id", user_id)
            .order("booking_date", false)
            .order("created_at", false);
        self.client.select(BOOKINGS, &query).await
    }

    async fn list_slot_bookings_on(
        &self,
        timeslot_id: &str,
        date: NaiveDate,
    ) -> BackendResult<Vec<Booking>> {
        let query = Query::new()
            .select("*")
            .eq("timeslot_id", timeslot_id)
            .eq("booking_date", date.format("%Y-%m-%d"));
        self.client.select(BOOKINGS, &query).await
    }

    async fn update_booking_status(
        &self,
        id: &str,
        from: BookingStatus,
        to: BookingStatus,
    ) -> BackendResult<Option<Booking>> {
        let query = Query::new().eq("id", id).eq("status", from);
        let rows: Vec<Booking> = self
            .client
            .update(BOOKINGS, &query, &json!({ "status": to }))
            .await?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl FollowStore for SupabaseBackend {
    async fn insert_follow(&self, follower_id: &str, following_id: &str) -> BackendResult<bool> {
        let row = json!({ "follower_id": follower_id, "following_id": following_id });
        inserted(self.client.insert(FOLLOWS, &row).await)
    }

    async fn delete_follow(&self, follower_id: &str, following_id: &str) -> BackendResult<bool> {
        let rows: Vec<serde_json::Value> = self
            .client
            .delete(FOLLOWS, &follow_pair(follower_id, following_id))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn is_following(&self, follower_id: &str, following_id: &str) -> BackendResult<bool> {
        let query = follow_pair(follower_id, following_id)
            .select("follower_id")
            .limit(1);
        let rows: Vec<FollowerIdRow> = self.client.select(FOLLOWS, &query).await?;
        Ok(!rows.is_empty())
    }

    async fn list_following_ids(&self, follower_id: &str) -> BackendResult<Vec<String>> {
        let query = Query::new()
            .select("following_id")
            .eq("follower_id", follower_id);
        let rows: Vec<FollowingIdRow> = self.client.select(FOLLOWS, &query).await?;
        Ok(rows.into_iter().map(|r| r.following_id).collect())
    }

    async fn list_follower_ids(&self, following_id: &str) -> BackendResult<Vec<String>> {
        let query = Query::new()
            .select("follower_id")
            .eq("following_id", following_id);
        let rows: Vec<FollowerIdRow> = self.client.select(FOLLOWS, &query).await?;
        Ok(rows.into_iter().map(|r| r.follower_id).collect())
    }
}

#[async_trait]
impl EventStore for SupabaseBackend {
    async fn insert_event(&self, event: NewCalendarEvent) -> BackendResult<CalendarEvent> {
        self.client.insert(CALENDAR_EVENTS, &event).await
    }

    async fn get_event(&self, id: &str) -> BackendResult<Option<CalendarEvent>> {
        let query = Query::new().select("*").eq("id", id).limit(1);
        let rows: Vec<CalendarEvent> = self.client.select(CALENDAR_EVENTS, &query).await?;
        Ok(rows.into_iter().next())
    }

    async fn list_events_by(&self, user_ids: &[String]) -> BackendResult<Vec<CalendarEvent>> {
        if user_ids.is_empty() {
            return Ok(vec![]);
        }
        let query = Query::new()
            .select("*")
            .in_list("user_id", user_ids)
            .order("event_date", true);
        self.client.select(CALENDAR_EVENTS, &query).await
    }

    async fn insert_attendee(&self, event_id: &str, user_id: &str) -> BackendResult<bool> {
        let row = json!({ "event_id": event_id, "user_id": user_id });
        inserted(self.client.insert(EVENT_ATTENDEES, &row).await)
    }

    async fn delete_attendee(&self, event_id: &str, user_id: &str) -> BackendResult<bool> {
        let rows: Vec<serde_json::Value> = self
            .client
            .delete(EVENT_ATTENDEES, &attendee_pair(event_id, user_id))
            .await?;
        Ok(!rows.is_empty())
    }

    async fn attended_event_ids(
        &self,
        user_id: &str,
        event_ids: &[String],
    ) -> BackendResult<Vec<String>> {
        if event_ids.is_empty() {
            return Ok(vec![]);
        }
        let query = Query::new()
            .select("event_id")
            .eq("user_id", user_id)
            .in_list("event_id", event_ids);
        let rows: Vec<AttendeeRow> = self.client.select(EVENT_ATTENDEES, &query).await?;
        Ok(rows.into_iter().map(|r| r.event_id).collect())
    }
}

#[async_trait]
impl CounterRpc for SupabaseBackend {
    async fn increment(&self, counter: Counter, id: &str, amount: i64) -> BackendResult<()> {
        let mut args = serde_json::Map::new();
        args.insert(counter.id_arg().to_string(), json!(id));
        args.insert("amount".to_string(), json!(amount));
        self.client
            .rpc(counter.rpc_name(), &serde_json::Value::Object(args))
            .await
    }
}
