//! Calendar events and attendance.

use crate::backend::{
    Backend, CalendarEvent, Counter, NewCalendarEvent, UserProfile, UserSummary, DEFAULT_AVATAR,
};
use crate::booking::UNKNOWN_NAME;
use crate::error::{ServiceError, ServiceResult};
use crate::timeslot::schedule;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateEventRequest {
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub event_date: String,
    #[serde(default)]
    pub event_time: Option<String>,
    #[serde(default)]
    pub location: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventScope {
    #[default]
    My,
    Following,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventView {
    #[serde(flatten)]
    pub event: CalendarEvent,
    pub author: UserSummary,
    pub is_attending: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceState {
    pub event_id: String,
    pub attending: bool,
    pub attendees_count: i64,
}

pub struct CalendarManager {
    backend: Arc<dyn Backend>,
}

impl CalendarManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        CalendarManager { backend }
    }

    pub async fn create(
        &self,
        user_id: &str,
        request: CreateEventRequest,
    ) -> ServiceResult<CalendarEvent> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(ServiceError::invalid("title is required"));
        }
        let event_date = schedule::parse_date(&request.event_date).ok_or_else(|| {
            ServiceError::invalid(format!("invalid date '{}'", request.event_date))
        })?;
        let event_time = match request.event_time.as_deref().map(str::trim) {
            None | Some("") => None,
            Some(t) => Some(
                schedule::normalize_time(t)
                    .ok_or_else(|| ServiceError::invalid(format!("invalid time '{}'", t)))?,
            ),
        };

        let event = self
            .backend
            .insert_event(NewCalendarEvent {
                user_id: user_id.to_string(),
                title: title.to_string(),
                description: request.description.trim().to_string(),
                event_date,
                event_time,
                location: request.location.trim().to_string(),
            })
            .await?;
        info!(user_id, event_id = %event.id, "Created calendar event");
        Ok(event)
    }

    /// Events of the caller or of the users they follow, earliest first.
    pub async fn list(
        &self,
        user_id: &str,
        scope: EventScope,
        date: Option<NaiveDate>,
    ) -> ServiceResult<Vec<EventView>> {
        let authors = match scope {
            EventScope::My => vec![user_id.to_string()],
            EventScope::Following => self.backend.list_following_ids(user_id).await?,
        };
        if authors.is_empty() {
            return Ok(vec![]);
        }

        let events: Vec<CalendarEvent> = self
            .backend
            .list_events_by(&authors)
            .await?
            .into_iter()
            .filter(|e| date.map_or(true, |d| e.event_date == d))
            .collect();
        if events.is_empty() {
            return Ok(vec![]);
        }

        let event_ids: Vec<String> = events.iter().map(|e| e.id.clone()).collect();
        let author_ids: Vec<String> = events
            .iter()
            .map(|e| e.user_id.clone())
            .collect::<HashSet<_>>()
            .into_iter()
            .collect();
        let (attending, profiles) = futures::try_join!(
            self.backend.attended_event_ids(user_id, &event_ids),
            self.backend.get_profiles(&author_ids),
        )?;
        let attending: HashSet<String> = attending.into_iter().collect();
        let profiles: HashMap<String, UserProfile> =
            profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        debug!(user_id, ?scope, events = events.len(), "Listed calendar events");

        Ok(events
            .into_iter()
            .map(|event| {
                let author = match profiles.get(&event.user_id) {
                    Some(p) => p.summary(),
                    None => UserSummary {
                        id: event.user_id.clone(),
                        name: UNKNOWN_NAME.to_string(),
                        avatar: DEFAULT_AVATAR.to_string(),
                    },
                };
                EventView {
                    is_attending: attending.contains(&event.id),
                    author,
                    event,
                }
            })
            .collect())
    }

    async fn get_event(&self, event_id: &str) -> ServiceResult<CalendarEvent> {
        self.backend
            .get_event(event_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Event {}", event_id)))
    }

    async fn adjust_attendees(&self, event_id: &str, amount: i64) {
        if let Err(err) = self
            .backend
            .increment(Counter::EventAttendees, event_id, amount)
            .await
        {
            warn!(event_id, amount, "Attendee counter update failed: {}", err);
        }
    }

    pub async fn attend(&self, user_id: &str, event_id: &str) -> ServiceResult<AttendanceState> {
        self.get_event(event_id).await?;
        if self.backend.insert_attendee(event_id, user_id).await? {
            self.adjust_attendees(event_id, 1).await;
            info!(user_id, event_id, "Attending event");
        }
        self.attendance(user_id, event_id).await
    }

    pub async fn unattend(&self, user_id: &str, event_id: &str) -> ServiceResult<AttendanceState> {
        self.get_event(event_id).await?;
        if self.backend.delete_attendee(event_id, user_id).await? {
            self.adjust_attendees(event_id, -1).await;
            info!(user_id, event_id, "No longer attending event");
        }
        self.attendance(user_id, event_id).await
    }

    async fn attendance(&self, user_id: &str, event_id: &str) -> ServiceResult<AttendanceState> {
        let event = self.get_event(event_id).await?;
        let attending = !self
            .backend
            .attended_event_ids(user_id, &[event.id.clone()])
            .await?
            .is_empty();
        Ok(AttendanceState {
            event_id: event.id,
            attending,
            attendees_count: event.attendees_count,
        })
    }
}
