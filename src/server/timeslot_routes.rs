//! Timeslot HTTP routes.
//!
//! - POST   /                      create a timeslot
//! - GET    /mine                  caller's timeslots
//! - GET    /{id}                  one timeslot
//! - DELETE /{id}                  delete (host only)
//! - GET    /{id}/availability     free times on `?date=YYYY-MM-DD`
//! - POST   /{id}/bookings         book a free time

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::debug;

use crate::booking::BookingRequest;
use crate::error::ServiceError;
use crate::server::session::Session;
use crate::server::state::{GuardedBookingManager, GuardedTimeslotManager, ServerState};
use crate::timeslot::{schedule, CreateTimeslotRequest};

#[derive(Debug, Deserialize)]
pub struct AvailabilityQuery {
    pub date: String,
}

async fn create_timeslot(
    session: Session,
    State(timeslots): State<GuardedTimeslotManager>,
    WithRejection(Json(body), _): WithRejection<Json<CreateTimeslotRequest>, ServiceError>,
) -> Response {
    match timeslots.create(&session.user_id, body).await {
        Ok(timeslot) => (StatusCode::CREATED, Json(timeslot)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_my_timeslots(
    session: Session,
    State(timeslots): State<GuardedTimeslotManager>,
) -> Response {
    match timeslots.list_for_user(&session.user_id).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_timeslot(
    _session: Session,
    State(timeslots): State<GuardedTimeslotManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match timeslots.get(&id).await {
        Ok(timeslot) => Json(timeslot).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_timeslot(
    session: Session,
    State(timeslots): State<GuardedTimeslotManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match timeslots.delete(&session.user_id, &id).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_availability(
    _session: Session,
    State(timeslots): State<GuardedTimeslotManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
    WithRejection(Query(query), _): WithRejection<Query<AvailabilityQuery>, ServiceError>,
) -> Response {
    let date = match schedule::parse_date(&query.date) {
        Some(date) => date,
        None => {
            return ServiceError::invalid(format!("invalid date '{}'", query.date)).into_response()
        }
    };
    debug!("Availability of {} on {}", id, date);
    match timeslots.availability(&id, date, schedule::today()).await {
        Ok(availability) => Json(availability).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_booking(
    session: Session,
    State(bookings): State<GuardedBookingManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
    WithRejection(Json(body), _): WithRejection<Json<BookingRequest>, ServiceError>,
) -> Response {
    match bookings
        .request(&session.user_id, &id, body, schedule::today())
        .await
    {
        Ok(booking) => (StatusCode::CREATED, Json(booking)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn timeslot_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(create_timeslot))
        .route("/mine", get(get_my_timeslots))
        .route("/{id}", get(get_timeslot).delete(delete_timeslot))
        .route("/{id}/availability", get(get_availability))
        .route("/{id}/bookings", post(post_booking))
}
