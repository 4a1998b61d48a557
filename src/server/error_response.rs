//! HTTP mapping of domain errors.

use crate::backend::BackendError;
use crate::error::ServiceError;

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{error, warn};

#[derive(Serialize)]
struct ErrorBody {
    error: String,
}

impl ServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ServiceError::InvalidInput(_) => StatusCode::BAD_REQUEST,
            ServiceError::Unauthorized => StatusCode::UNAUTHORIZED,
            ServiceError::Forbidden(_) => StatusCode::FORBIDDEN,
            ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
            ServiceError::Conflict(_) | ServiceError::InvalidTransition { .. } => {
                StatusCode::CONFLICT
            }
            ServiceError::Backend(err) => match err {
                BackendError::Conflict(_) => StatusCode::CONFLICT,
                BackendError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                BackendError::Rejected { .. } | BackendError::Unavailable(_) => {
                    StatusCode::BAD_GATEWAY
                }
                BackendError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
        }
    }
}

// Malformed request input is reported like any other validation failure.
impl From<JsonRejection> for ServiceError {
    fn from(rejection: JsonRejection) -> Self {
        ServiceError::InvalidInput(rejection.body_text())
    }
}

impl From<QueryRejection> for ServiceError {
    fn from(rejection: QueryRejection) -> Self {
        ServiceError::InvalidInput(rejection.body_text())
    }
}

impl From<PathRejection> for ServiceError {
    fn from(rejection: PathRejection) -> Self {
        ServiceError::InvalidInput(rejection.body_text())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        } else if let ServiceError::Backend(_) = self {
            warn!("Backend refused request: {}", self);
        }

        let message = match &self {
            ServiceError::Backend(BackendError::Internal(_)) => "Internal server error".to_string(),
            other => other.to_string(),
        };
        (status, Json(ErrorBody { error: message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BookingStatus;

    #[test]
    fn maps_errors_to_statuses() {
        let cases = vec![
            (ServiceError::invalid("bad"), StatusCode::BAD_REQUEST),
            (ServiceError::Unauthorized, StatusCode::UNAUTHORIZED),
            (ServiceError::Forbidden("no".into()), StatusCode::FORBIDDEN),
            (ServiceError::not_found("User x"), StatusCode::NOT_FOUND),
            (ServiceError::Conflict("taken".into()), StatusCode::CONFLICT),
            (
                ServiceError::InvalidTransition {
                    from: BookingStatus::Cancelled,
                    to: BookingStatus::Confirmed,
                },
                StatusCode::CONFLICT,
            ),
            (
                BackendError::Conflict("dup".into()).into(),
                StatusCode::CONFLICT,
            ),
            (
                BackendError::Unavailable("down".into()).into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BackendError::Rejected {
                    status: 400,
                    message: "bad column".into(),
                }
                .into(),
                StatusCode::BAD_GATEWAY,
            ),
            (
                BackendError::Internal(anyhow::anyhow!("boom")).into(),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, expected) in cases {
            assert_eq!(err.status_code(), expected, "{:?}", err);
        }
    }

    #[test]
    fn transition_message_names_both_states() {
        let err = ServiceError::InvalidTransition {
            from: BookingStatus::Completed,
            to: BookingStatus::Cancelled,
        };
        assert_eq!(
            err.to_string(),
            "Cannot move booking from completed to cancelled"
        );
    }
}
