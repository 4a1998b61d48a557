//! Booking HTTP routes.
//!
//! - GET  /?direction=sent|received   caller's bookings with joined details
//! - POST /{id}/{action}              approve, reject, cancel or complete

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use tracing::debug;

use crate::booking::{BookingAction, BookingDirection};
use crate::error::ServiceError;
use crate::server::session::Session;
use crate::server::state::{GuardedBookingManager, ServerState};

#[derive(Debug, Deserialize)]
pub struct BookingsQuery {
    #[serde(default = "default_direction")]
    pub direction: BookingDirection,
}

fn default_direction() -> BookingDirection {
    BookingDirection::Sent
}

async fn get_bookings(
    session: Session,
    State(bookings): State<GuardedBookingManager>,
    WithRejection(Query(query), _): WithRejection<Query<BookingsQuery>, ServiceError>,
) -> Response {
    match bookings.list(&session.user_id, query.direction).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_booking_action(
    session: Session,
    State(bookings): State<GuardedBookingManager>,
    WithRejection(Path((id, action)), _): WithRejection<
        Path<(String, BookingAction)>,
        ServiceError,
    >,
) -> Response {
    debug!("User {} wants to {} booking {}", session.user_id, action, id);
    match bookings.act(&session.user_id, &id, action).await {
        Ok(booking) => Json(booking).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn booking_routes() -> Router<ServerState> {
    Router::new()
        .route("/", get(get_bookings))
        .route("/{id}/{action}", post(post_booking_action))
}
