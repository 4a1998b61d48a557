//! Test data seeding
//!
//! Users are created through the same sign-up path the HTTP API uses, so
//! their profiles carry the default category and avatar.

use super::constants::*;
use chrono::{Datelike, Duration, NaiveDate, Utc, Weekday};
use std::sync::Arc;
use timeslot_server::auth::{AuthManager, SignUpRequest};
use timeslot_server::backend::Backend;

/// Ids of the seeded users.
#[derive(Debug, Clone)]
pub struct SeededUsers {
    pub host_id: String,
    pub guest_id: String,
    pub other_id: String,
}

pub async fn seed_users(backend: Arc<dyn Backend>) -> anyhow::Result<SeededUsers> {
    let auth = AuthManager::new(backend);
    let mut ids = Vec::new();
    for (email, password, name, title) in [
        (HOST_EMAIL, HOST_PASS, HOST_NAME, "Rust mentor"),
        (GUEST_EMAIL, GUEST_PASS, GUEST_NAME, "Student"),
        (OTHER_EMAIL, OTHER_PASS, OTHER_NAME, "Designer"),
    ] {
        let profile = auth
            .sign_up(SignUpRequest {
                email: email.to_string(),
                password: password.to_string(),
                name: name.to_string(),
                title: title.to_string(),
            })
            .await?;
        ids.push(profile.id);
    }
    let mut ids = ids.into_iter();
    let mut next = || ids.next().ok_or_else(|| anyhow::anyhow!("missing seeded user"));
    Ok(SeededUsers {
        host_id: next()?,
        guest_id: next()?,
        other_id: next()?,
    })
}

/// First date strictly after today (UTC) that falls on `weekday`.
pub fn next_date_on(weekday: Weekday) -> NaiveDate {
    let mut date = Utc::now().date_naive() + Duration::days(1);
    while date.weekday() != weekday {
        date += Duration::days(1);
    }
    date
}
