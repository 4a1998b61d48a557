//! Row shapes of the remote relations.
//!
//! Field names match the column names so rows can be (de)serialized straight
//! from PostgREST responses. Nullable text and counter columns fall back to
//! their default value instead of failing the whole row.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

pub const DEFAULT_CATEGORY: &str = "기타";
pub const DEFAULT_AVATAR: &str = "👤";

pub const PROFILE_CATEGORIES: &[&str] = &[
    "개발",
    "디자인",
    "마케팅",
    "비즈니스",
    "교육",
    "헬스",
    "상담",
    "요리",
    "음악",
    "기타",
];

fn nullable<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub name: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub bio: String,
    #[serde(default, deserialize_with = "nullable")]
    pub category: String,
    #[serde(default, deserialize_with = "nullable")]
    pub avatar: String,
    #[serde(default, deserialize_with = "nullable")]
    pub rating: f64,
    #[serde(default, deserialize_with = "nullable")]
    pub reviews_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub followers_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub following_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: DateTime<Utc>,
}

impl UserProfile {
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            avatar: self.avatar.clone(),
        }
    }
}

/// Profile row inserted right after the auth user is created.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewUserProfile {
    pub id: String,
    pub name: String,
    pub title: String,
    pub bio: String,
    pub category: String,
    pub avatar: String,
    pub rating: f64,
    pub reviews_count: i64,
    pub followers_count: i64,
    pub following_count: i64,
}

impl NewUserProfile {
    pub fn with_defaults(id: String, name: String, title: String) -> Self {
        NewUserProfile {
            id,
            name,
            title,
            bio: String::new(),
            category: DEFAULT_CATEGORY.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
            rating: 0.0,
            reviews_count: 0,
            followers_count: 0,
            following_count: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    pub name: String,
    pub avatar: String,
    pub title: String,
    pub bio: String,
    pub category: String,
}

/// Minimal author/counterpart info attached to joined views.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub name: String,
    pub avatar: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Timeslot {
    pub id: String,
    pub user_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    #[serde(default, deserialize_with = "nullable")]
    pub duration: String,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub price: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub available_days: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub available_times: Vec<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub requires_approval: bool,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewTimeslot {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub duration: String,
    pub location: String,
    pub price: i64,
    pub available_days: Vec<String>,
    pub available_times: Vec<String>,
    pub requires_approval: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Confirmed => "confirmed",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(BookingStatus::Pending),
            "confirmed" => Some(BookingStatus::Confirmed),
            "completed" => Some(BookingStatus::Completed),
            "cancelled" => Some(BookingStatus::Cancelled),
            _ => None,
        }
    }

    /// Pending and confirmed bookings hold their date/time.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Confirmed)
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Booking {
    pub id: String,
    pub timeslot_id: String,
    pub host_id: String,
    pub guest_id: String,
    pub booking_date: NaiveDate,
    #[serde(default, deserialize_with = "nullable")]
    pub booking_time: String,
    #[serde(default, deserialize_with = "nullable")]
    pub price: i64,
    pub status: BookingStatus,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewBooking {
    pub timeslot_id: String,
    pub host_id: String,
    pub guest_id: String,
    pub booking_date: NaiveDate,
    pub booking_time: String,
    pub price: i64,
    pub status: BookingStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Follow {
    pub follower_id: String,
    pub following_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub title: String,
    #[serde(default, deserialize_with = "nullable")]
    pub description: String,
    pub event_date: NaiveDate,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default, deserialize_with = "nullable")]
    pub location: String,
    #[serde(default, deserialize_with = "nullable")]
    pub attendees_count: i64,
    #[serde(default, deserialize_with = "nullable")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NewCalendarEvent {
    pub user_id: String,
    pub title: String,
    pub description: String,
    pub event_date: NaiveDate,
    pub event_time: Option<String>,
    pub location: String,
}

/// Remote counter procedures. Each takes the row id and a signed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Counter {
    FollowerCount,
    FollowingCount,
    EventAttendees,
}

impl Counter {
    pub fn rpc_name(&self) -> &'static str {
        match self {
            Counter::FollowerCount => "increment_follower_count",
            Counter::FollowingCount => "increment_following_count",
            Counter::EventAttendees => "increment_event_attendees",
        }
    }

    pub fn id_arg(&self) -> &'static str {
        match self {
            Counter::FollowerCount | Counter::FollowingCount => "user_id",
            Counter::EventAttendees => "event_id",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default, deserialize_with = "nullable")]
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user: AuthUser,
}
