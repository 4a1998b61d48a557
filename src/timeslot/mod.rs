//! Bookable time slots offered by hosts.

pub mod schedule;

use crate::backend::{Backend, NewTimeslot, Timeslot};
use crate::error::{ServiceError, ServiceResult};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info};

/// Largest price the remote `integer` column can hold.
pub const MAX_PRICE: i64 = i32::MAX as i64;

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTimeslotRequest {
    pub title: String,
    pub description: String,
    pub duration: String,
    pub location: String,
    pub price: i64,
    pub available_days: Vec<String>,
    #[serde(default)]
    pub available_times: Vec<String>,
    #[serde(default)]
    pub requires_approval: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Availability {
    pub timeslot_id: String,
    pub date: NaiveDate,
    pub times: Vec<String>,
}

fn required(field: &str, value: &str) -> ServiceResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ServiceError::invalid(format!("{} is required", field)));
    }
    Ok(value.to_string())
}

fn dedup_preserving_order(values: Vec<String>) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(values.len());
    for value in values {
        if !out.contains(&value) {
            out.push(value);
        }
    }
    out
}

impl CreateTimeslotRequest {
    fn validate(self, host_id: &str) -> ServiceResult<NewTimeslot> {
        let title = required("title", &self.title)?;
        let description = required("description", &self.description)?;
        let duration = required("duration", &self.duration)?;
        let location = required("location", &self.location)?;

        if self.price < 0 {
            return Err(ServiceError::invalid("price must not be negative"));
        }
        if self.price > MAX_PRICE {
            return Err(ServiceError::invalid(format!(
                "price must not exceed {}",
                MAX_PRICE
            )));
        }
        if self.available_days.is_empty() {
            return Err(ServiceError::invalid("select at least one available day"));
        }

        let days = self
            .available_days
            .iter()
            .map(|d| {
                schedule::parse_weekday(d)
                    .map(|w| schedule::weekday_label(w).to_string())
                    .ok_or_else(|| ServiceError::invalid(format!("unknown weekday '{}'", d)))
            })
            .collect::<ServiceResult<Vec<String>>>()?;

        let times = self
            .available_times
            .iter()
            .map(|t| {
                schedule::normalize_time(t)
                    .ok_or_else(|| ServiceError::invalid(format!("invalid time '{}'", t)))
            })
            .collect::<ServiceResult<Vec<String>>>()?;

        Ok(NewTimeslot {
            user_id: host_id.to_string(),
            title,
            description,
            duration,
            location,
            price: self.price,
            available_days: dedup_preserving_order(days),
            available_times: dedup_preserving_order(times),
            requires_approval: self.requires_approval,
        })
    }
}

pub struct TimeslotManager {
    backend: Arc<dyn Backend>,
}

impl TimeslotManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        TimeslotManager { backend }
    }

    pub async fn create(
        &self,
        host_id: &str,
        request: CreateTimeslotRequest,
    ) -> ServiceResult<Timeslot> {
        let timeslot = request.validate(host_id)?;
        let created = self.backend.insert_timeslot(timeslot).await?;
        info!(host_id, timeslot_id = %created.id, "Created timeslot");
        Ok(created)
    }

    pub async fn get(&self, id: &str) -> ServiceResult<Timeslot> {
        self.backend
            .get_timeslot(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(format!("Timeslot {}", id)))
    }

    pub async fn list_for_user(&self, user_id: &str) -> ServiceResult<Vec<Timeslot>> {
        Ok(self.backend.list_user_timeslots(user_id).await?)
    }

    /// Bookings that referenced the slot are kept.
    pub async fn delete(&self, user_id: &str, id: &str) -> ServiceResult<()> {
        let timeslot = self.get(id).await?;
        if timeslot.user_id != user_id {
            return Err(ServiceError::Forbidden(
                "Only the host can delete this timeslot".to_string(),
            ));
        }
        if !self.backend.delete_timeslot(id).await? {
            return Err(ServiceError::not_found(format!("Timeslot {}", id)));
        }
        info!(user_id, timeslot_id = id, "Deleted timeslot");
        Ok(())
    }

    /// Times still free on `date`. Past dates and days the slot is not
    /// offered on have none.
    pub async fn availability(
        &self,
        id: &str,
        date: NaiveDate,
        today: NaiveDate,
    ) -> ServiceResult<Availability> {
        let timeslot = self.get(id).await?;
        let times = self.free_times(&timeslot, date, today).await?;
        Ok(Availability {
            timeslot_id: timeslot.id,
            date,
            times,
        })
    }

    pub(crate) async fn free_times(
        &self,
        timeslot: &Timeslot,
        date: NaiveDate,
        today: NaiveDate,
    ) -> ServiceResult<Vec<String>> {
        if date < today || !schedule::is_available_on(&timeslot.available_days, date) {
            return Ok(vec![]);
        }

        let taken: Vec<String> = self
            .backend
            .list_slot_bookings_on(&timeslot.id, date)
            .await?
            .into_iter()
            .filter(|b| b.status.is_active())
            .map(|b| b.booking_time)
            .collect();
        debug!(
            timeslot_id = %timeslot.id,
            %date,
            taken = taken.len(),
            "Computed availability"
        );

        Ok(schedule::offered_times(&timeslot.available_times)
            .into_iter()
            .filter(|t| !taken.contains(t))
            .collect())
    }
}
