//! Profile, user page, follow and explore routes.

use axum::{
    extract::{Path, Query, State},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};

use axum_extra::extract::WithRejection;

use crate::backend::ProfileUpdate;
use crate::error::ServiceError;
use crate::profile::ExploreFilter;
use crate::server::session::Session;
use crate::server::state::{GuardedFollowManager, GuardedProfileManager, ServerState};

async fn get_my_profile(
    session: Session,
    State(profiles): State<GuardedProfileManager>,
) -> Response {
    match profiles.own_page(&session.user_id).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn put_my_profile(
    session: Session,
    State(profiles): State<GuardedProfileManager>,
    WithRejection(Json(body), _): WithRejection<Json<ProfileUpdate>, ServiceError>,
) -> Response {
    match profiles.update(&session.user_id, body).await {
        Ok(profile) => Json(profile).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_my_followers(
    session: Session,
    State(profiles): State<GuardedProfileManager>,
) -> Response {
    match profiles.followers(&session.user_id).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_my_following(
    session: Session,
    State(profiles): State<GuardedProfileManager>,
) -> Response {
    match profiles.following(&session.user_id).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_user_page(
    session: Option<Session>,
    State(profiles): State<GuardedProfileManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    let viewer = session.as_ref().map(|s| s.user_id.as_str());
    match profiles.user_page(viewer, &id).await {
        Ok(page) => Json(page).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_follow_state(
    session: Session,
    State(follows): State<GuardedFollowManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match follows.state(&session.user_id, &id).await {
        Ok(state) => Json(state).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn post_follow(
    session: Session,
    State(follows): State<GuardedFollowManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match follows.follow(&session.user_id, &id).await {
        Ok(state) => Json(state).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn delete_follow(
    session: Session,
    State(follows): State<GuardedFollowManager>,
    WithRejection(Path(id), _): WithRejection<Path<String>, ServiceError>,
) -> Response {
    match follows.unfollow(&session.user_id, &id).await {
        Ok(state) => Json(state).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn get_explore(
    session: Option<Session>,
    State(profiles): State<GuardedProfileManager>,
    WithRejection(Query(filter), _): WithRejection<Query<ExploreFilter>, ServiceError>,
) -> Response {
    let viewer = session.as_ref().map(|s| s.user_id.as_str());
    match profiles.explore(viewer, &filter).await {
        Ok(list) => Json(list).into_response(),
        Err(err) => err.into_response(),
    }
}

/// - GET /me, PUT /me
/// - GET /me/followers, GET /me/following
pub fn profile_routes() -> Router<ServerState> {
    Router::new()
        .route("/me", get(get_my_profile).put(put_my_profile))
        .route("/me/followers", get(get_my_followers))
        .route("/me/following", get(get_my_following))
}

/// - GET /{id}
/// - GET, POST, DELETE /{id}/follow
pub fn user_routes() -> Router<ServerState> {
    Router::new().route("/{id}", get(get_user_page)).route(
        "/{id}/follow",
        get(get_follow_state).post(post_follow).delete(delete_follow),
    )
}

/// - GET /?category=&q=
pub fn explore_routes() -> Router<ServerState> {
    Router::new().route("/", get(get_explore))
}
