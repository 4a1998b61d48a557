//! Reservations and the host approval workflow.
//!
//! A booking starts `pending` when its slot requires approval and `confirmed`
//! otherwise. Every status change is a conditional update on the status the
//! caller saw, so two concurrent actions on the same booking cannot both win.

mod status;

pub use status::{BookingAction, Party};

use crate::backend::{
    Backend, BackendError, Booking, BookingStatus, NewBooking, Timeslot, UserProfile, UserSummary,
    DEFAULT_AVATAR,
};
use crate::error::{ServiceError, ServiceResult};
use crate::server::metrics;
use crate::timeslot::{schedule, TimeslotManager};

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info};

pub const PLATFORM_FEE_PERCENT: i64 = 15;
pub const UNKNOWN_NAME: &str = "알 수 없음";

pub fn host_payout(price: i64) -> ServiceResult<i64> {
    price
        .checked_mul(100 - PLATFORM_FEE_PERCENT)
        .map(|gross| gross / 100)
        .ok_or_else(|| {
            BackendError::Internal(anyhow::anyhow!("price {} overflows the payout", price)).into()
        })
}

#[derive(Debug, Clone, Deserialize)]
pub struct BookingRequest {
    pub date: String,
    pub time: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingDirection {
    Sent,
    Received,
}

/// A booking joined with its slot and the other party.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BookingSummary {
    #[serde(flatten)]
    pub booking: Booking,
    pub slot_title: String,
    pub slot_location: String,
    pub counterpart: UserSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host_payout: Option<i64>,
}

fn unique_ids<'a>(ids: impl Iterator<Item = &'a String>) -> Vec<String> {
    let mut seen: HashSet<&'a String> = HashSet::new();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}

fn counterpart_summary(id: &str, profile: Option<&UserProfile>) -> UserSummary {
    match profile {
        Some(p) => p.summary(),
        None => UserSummary {
            id: id.to_string(),
            name: UNKNOWN_NAME.to_string(),
            avatar: DEFAULT_AVATAR.to_string(),
        },
    }
}

pub struct BookingManager {
    backend: Arc<dyn Backend>,
    timeslots: TimeslotManager,
}

impl BookingManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        BookingManager {
            timeslots: TimeslotManager::new(backend.clone()),
            backend,
        }
    }

    pub async fn request(
        &self,
        guest_id: &str,
        timeslot_id: &str,
        request: BookingRequest,
        today: NaiveDate,
    ) -> ServiceResult<Booking> {
        let date = schedule::parse_date(&request.date)
            .ok_or_else(|| ServiceError::invalid(format!("invalid date '{}'", request.date)))?;
        let time = schedule::normalize_time(&request.time)
            .ok_or_else(|| ServiceError::invalid(format!("invalid time '{}'", request.time)))?;

        let timeslot = self.timeslots.get(timeslot_id).await?;
        self.check_bookable(&timeslot, guest_id, date, &time, today)?;

        let free = self.timeslots.free_times(&timeslot, date, today).await?;
        if !free.contains(&time) {
            return Err(ServiceError::Conflict(format!(
                "{} {} is already booked",
                date, time
            )));
        }

        let status = if timeslot.requires_approval {
            BookingStatus::Pending
        } else {
            BookingStatus::Confirmed
        };
        let booking = self
            .backend
            .insert_booking(NewBooking {
                timeslot_id: timeslot.id.clone(),
                host_id: timeslot.user_id.clone(),
                guest_id: guest_id.to_string(),
                booking_date: date,
                booking_time: time,
                price: timeslot.price,
                status,
            })
            .await?;

        metrics::record_booking_created(status);
        info!(
            booking_id = %booking.id,
            timeslot_id = %timeslot.id,
            guest_id,
            status = %status,
            "Booking requested"
        );
        Ok(booking)
    }

    fn check_bookable(
        &self,
        timeslot: &Timeslot,
        guest_id: &str,
        date: NaiveDate,
        time: &str,
        today: NaiveDate,
    ) -> ServiceResult<()> {
        if timeslot.user_id == guest_id {
            return Err(ServiceError::Forbidden(
                "You cannot book your own timeslot".to_string(),
            ));
        }
        if date < today {
            return Err(ServiceError::invalid("date is in the past"));
        }
        if !schedule::is_available_on(&timeslot.available_days, date) {
            return Err(ServiceError::invalid(format!(
                "timeslot is not offered on {}",
                schedule::weekday_label(date.weekday())
            )));
        }
        if !schedule::offered_times(&timeslot.available_times).iter().any(|t| t == time) {
            return Err(ServiceError::invalid(format!(
                "timeslot is not offered at {}",
                time
            )));
        }
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: &str,
        direction: BookingDirection,
    ) -> ServiceResult<Vec<BookingSummary>> {
        let bookings = match direction {
            BookingDirection::Sent => self.backend.list_guest_bookings(user_id).await?,
            BookingDirection::Received => self.backend.list_host_bookings(user_id).await?,
        };
        if bookings.is_empty() {
            return Ok(vec![]);
        }

        let slot_ids = unique_ids(bookings.iter().map(|b| &b.timeslot_id));

        let counterpart_of = |b: &Booking| -> String {
            match direction {
                BookingDirection::Sent => b.host_id.clone(),
                BookingDirection::Received => b.guest_id.clone(),
            }
        };
        let counterpart_ids: Vec<String> = {
            let ids: Vec<String> = bookings.iter().map(counterpart_of).collect();
            unique_ids(ids.iter())
        };
        let (slots, profiles) = futures::try_join!(
            self.backend.get_timeslots(&slot_ids),
            self.backend.get_profiles(&counterpart_ids),
        )?;
        let slots: HashMap<String, Timeslot> =
            slots.into_iter().map(|s| (s.id.clone(), s)).collect();
        let profiles: HashMap<String, UserProfile> =
            profiles.into_iter().map(|p| (p.id.clone(), p)).collect();
        debug!(
            user_id,
            bookings = bookings.len(),
            slots = slots.len(),
            profiles = profiles.len(),
            "Joined booking summaries"
        );

        bookings
            .into_iter()
            .map(|booking| -> ServiceResult<BookingSummary> {
                let slot = slots.get(&booking.timeslot_id);
                let counterpart_id = counterpart_of(&booking);
                let host_payout = match direction {
                    BookingDirection::Received => Some(host_payout(booking.price)?),
                    BookingDirection::Sent => None,
                };
                Ok(BookingSummary {
                    slot_title: slot
                        .map(|s| s.title.clone())
                        .unwrap_or_else(|| UNKNOWN_NAME.to_string()),
                    slot_location: slot.map(|s| s.location.clone()).unwrap_or_default(),
                    counterpart: counterpart_summary(
                        &counterpart_id,
                        profiles.get(&counterpart_id),
                    ),
                    host_payout,
                    booking,
                })
            })
            .collect()
    }

    /// Applies `action` on behalf of `user_id`.
    pub async fn act(
        &self,
        user_id: &str,
        booking_id: &str,
        action: BookingAction,
    ) -> ServiceResult<Booking> {
        let booking = self
            .backend
            .get_booking(booking_id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Booking {}", booking_id)))?;
        self.apply_action(user_id, booking, action).await
    }

    /// Moves `booking`, as last read, to the action's target status. Fails
    /// with the current status when the row changed since it was read.
    async fn apply_action(
        &self,
        user_id: &str,
        booking: Booking,
        action: BookingAction,
    ) -> ServiceResult<Booking> {
        let booking_id = booking.id.as_str();
        let party = Party::of(&booking, user_id).ok_or_else(|| {
            ServiceError::Forbidden("You are not part of this booking".to_string())
        })?;
        if !action.allowed_for(party) {
            return Err(ServiceError::Forbidden(format!(
                "Only the host can {} a booking",
                action
            )));
        }

        let target = action.target();
        if !action.allowed_from(booking.status) {
            metrics::record_booking_transition(action, "invalid");
            return Err(ServiceError::InvalidTransition {
                from: booking.status,
                to: target,
            });
        }

        match self
            .backend
            .update_booking_status(booking_id, booking.status, target)
            .await?
        {
            Some(updated) => {
                metrics::record_booking_transition(action, "ok");
                info!(
                    booking_id,
                    user_id,
                    from = %booking.status,
                    to = %updated.status,
                    "Booking {}", action
                );
                Ok(updated)
            }
            None => {
                // Someone else changed it first.
                metrics::record_booking_transition(action, "lost_race");
                let current = self
                    .backend
                    .get_booking(booking_id)
                    .await?
                    .map(|b| b.status)
                    .ok_or_else(|| ServiceError::not_found(format!("Booking {}", booking_id)))?;
                Err(ServiceError::InvalidTransition {
                    from: current,
                    to: target,
                })
            }
        }
    }
}
