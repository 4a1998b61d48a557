//! Calendar HTTP routes.
//!
//! - POST   /                                  create an event
//! - GET    /?scope=my|following&date=...      list events
//! - POST   /{id}/attend                       attend
//! - DELETE /{id}/attend                       stop attending

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::post,
    Json, Router,
};
use axum_extra::extract::WithRejection;
use serde::Deserialize;

use crate::calendar::{CreateEventRequest, EventScope};
use crate::error::ServiceError;
use crate::server::session::Session;
use crate::server::state::{GuardedCalendarManager, ServerState};
use crate::timeslot::schedule;

#[derive(Debug, Default, Deserialize)]
pub struct EventsQuery {
    #[serde(default)]
    pub scope: EventScope,
    pub date: Option<String>,
}

async fn create_event(
    session: Session,
    State(calendar): State<GuardedCalendarManager>,
    WithRejection(Json(body), _): WithRejection<Json<CreateEventRequest>, ServiceError>,
) -> Response {
    match calendar.create(&session.user_id, body).await {
        Ok(event) => (StatusCode::CREATED, Json(event)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_events(
    session: Session,
    State(calendar): State<GuardedCalendarManager>,
    WithRejection(Query(query), _): WithRejection<Query<EventsQuery>, ServiceError>,
) -> Response {
    let date = match query.date.as_deref().filter(|d| !d.is_empty()) {
        None => None,
        Some(raw) => match schedule::parse_date(raw) {
            Some(date) => Some(date),
            None => return ServiceError::invalid(format!("invalid date '{}'", raw)).into_response(),
        },
    };
    match calendar.list(&session.user_id, query.scope, date).await {
        Ok(events) => Json(events).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn attend_event(
    session: Session,
    State(calendar): State<GuardedCalendarManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match calendar.attend(&session.user_id, &id).await {
        Ok(state) => Json(state).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn unattend_event(
    session: Session,
    State(calendar): State<GuardedCalendarManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match calendar.unattend(&session.user_id, &id).await {
        Ok(state) => Json(state).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn calendar_routes() -> Router<ServerState> {
    Router::new()
        .route("/", post(create_event).get(get_events))
        .route("/{id}/attend", post(attend_event).delete(unattend_event))
}
