use crate::backend::{Booking, BookingStatus};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Who performs an action on a booking.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    Host,
    Guest,
}

impl Party {
    pub fn of(booking: &Booking, user_id: &str) -> Option<Party> {
        if booking.host_id == user_id {
            Some(Party::Host)
        } else if booking.guest_id == user_id {
            Some(Party::Guest)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingAction {
    Approve,
    Reject,
    Cancel,
    Complete,
}

impl BookingAction {
    pub fn target(&self) -> BookingStatus {
        match self {
            BookingAction::Approve => BookingStatus::Confirmed,
            BookingAction::Reject | BookingAction::Cancel => BookingStatus::Cancelled,
            BookingAction::Complete => BookingStatus::Completed,
        }
    }

    pub fn allowed_from(&self, status: BookingStatus) -> bool {
        match self {
            BookingAction::Approve | BookingAction::Reject => status == BookingStatus::Pending,
            BookingAction::Cancel => status.is_active(),
            BookingAction::Complete => status == BookingStatus::Confirmed,
        }
    }

    pub fn allowed_for(&self, party: Party) -> bool {
        match self {
            BookingAction::Cancel => true,
            _ => party == Party::Host,
        }
    }
}

impl fmt::Display for BookingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            BookingAction::Approve => "approve",
            BookingAction::Reject => "reject",
            BookingAction::Cancel => "cancel",
            BookingAction::Complete => "complete",
        };
        f.write_str(name)
    }
}
