use anyhow::{Context, Result};
use std::time::{Duration, Instant};

use tracing::{debug, error, info};

use axum_extra::extract::{
    cookie::{Cookie, SameSite},
    WithRejection,
};
use tower_http::services::ServeDir;

use axum::{
    body::Body,
    extract::State,
    http::{header, response, HeaderValue, StatusCode},
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

#[cfg(feature = "slowdown")]
use super::slowdown_request;
use super::{
    booking_routes::booking_routes,
    calendar_routes::calendar_routes,
    log_requests,
    metrics::{metrics_handler, record_login_attempt},
    profile_routes::{explore_routes, profile_routes, user_routes},
    session::{Session, COOKIE_SESSION_TOKEN_KEY},
    state::*,
    timeslot_routes::timeslot_routes,
    ServerConfig,
};
use crate::auth::SignUpRequest;
use crate::error::ServiceError;

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
    pub signed_in: bool,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize)]
struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Serialize)]
struct LoginSuccessResponse {
    token: String,
    user_id: String,
}

#[derive(Serialize)]
struct SessionResponse {
    user_id: String,
}

async fn home(session: Option<Session>, State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
        signed_in: session.is_some(),
    };
    Json(stats)
}

async fn signup(
    State(auth_manager): State<GuardedAuthManager>,
    WithRejection(Json(body), _): WithRejection<Json<SignUpRequest>, ServiceError>,
) -> Response {
    match auth_manager.sign_up(body).await {
        Ok(profile) => (StatusCode::CREATED, Json(profile)).into_response(),
        Err(err) => err.into_response(),
    }
}

async fn login(
    State(auth_manager): State<GuardedAuthManager>,
    WithRejection(Json(body), _): WithRejection<Json<LoginBody>, ServiceError>,
) -> Response {
    debug!("login() called for {}", body.email);
    let start = Instant::now();
    let session = match auth_manager.sign_in(&body.email, &body.password).await {
        Ok(session) => session,
        Err(err) => {
            if matches!(err, ServiceError::Unauthorized) {
                record_login_attempt("failure", start.elapsed());
            }
            return err.into_response();
        }
    };
    record_login_attempt("success", start.elapsed());

    let cookie_value = match HeaderValue::from_str(&format!(
        "{}={}; Path=/; HttpOnly",
        COOKIE_SESSION_TOKEN_KEY, session.access_token
    )) {
        Ok(value) => value,
        Err(err) => {
            error!("Session token is not a valid header value: {}", err);
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    let response_body = LoginSuccessResponse {
        token: session.access_token,
        user_id: session.user.id,
    };

    (
        StatusCode::CREATED,
        [(header::SET_COOKIE, cookie_value)],
        Json(response_body),
    )
        .into_response()
}

async fn logout(State(auth_manager): State<GuardedAuthManager>, session: Session) -> Response {
    if let Err(err) = auth_manager.sign_out(&session.token).await {
        return err.into_response();
    }
    let cookie_value = Cookie::build(Cookie::new(COOKIE_SESSION_TOKEN_KEY, ""))
        .path("/")
        .expires(time::OffsetDateTime::now_utc() - time::Duration::days(1))
        .same_site(SameSite::Lax)
        .build();

    match response::Builder::new()
        .status(StatusCode::OK)
        .header(header::SET_COOKIE, cookie_value.to_string())
        .body(Body::empty())
    {
        Ok(response) => response,
        Err(err) => {
            error!("Failed to build logout response: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn get_session(session: Session) -> Response {
    Json(SessionResponse {
        user_id: session.user_id,
    })
    .into_response()
}

fn auth_routes() -> Router<ServerState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/session", get(get_session))
}

pub fn make_app(config: ServerConfig, backend: GuardedBackend, hash: String) -> Result<Router> {
    let state = ServerState::new(config.clone(), backend, hash);

    let home_router: Router<ServerState> = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new().route("/", get(home)),
    };

    let mut app: Router = home_router
        .nest("/v1/auth", auth_routes())
        .nest("/v1/profile", profile_routes())
        .nest("/v1/users", user_routes())
        .nest("/v1/explore", explore_routes())
        .nest("/v1/timeslots", timeslot_routes())
        .nest("/v1/bookings", booking_routes())
        .nest("/v1/events", calendar_routes())
        .with_state(state.clone());

    #[cfg(feature = "slowdown")]
    {
        app = app.layer(middleware::from_fn(slowdown_request));
    }
    app = app.layer(middleware::from_fn_with_state(state, log_requests));

    Ok(app)
}

fn make_metrics_app() -> Router {
    Router::new().route("/metrics", get(metrics_handler))
}

pub async fn run_server(config: ServerConfig, backend: GuardedBackend, hash: String) -> Result<()> {
    let port = config.port;
    let metrics_port = config.metrics_port;
    let app = make_app(config, backend, hash)?;

    let metrics_listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", metrics_port))
        .await
        .with_context(|| format!("Failed to bind metrics port {}", metrics_port))?;
    tokio::spawn(async move {
        if let Err(err) = axum::serve(metrics_listener, make_metrics_app()).await {
            error!("Metrics server stopped: {}", err);
        }
    });

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Listening on {}", listener.local_addr()?);

    Ok(axum::serve(listener, app).await?)
}
