//! Sign-up, sign-in and session resolution.

mod credentials;

pub use credentials::{AuthTokenValue, PasswordCredentials, PasswordHasher};

use crate::backend::{AuthSession, AuthUser, Backend, BackendError, NewUserProfile, UserProfile};
use crate::error::{ServiceError, ServiceResult};

use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, error, info};

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Debug, Clone, Deserialize)]
pub struct SignUpRequest {
    pub email: String,
    pub password: String,
    pub name: String,
    #[serde(default)]
    pub title: String,
}

fn normalize_email(email: &str) -> ServiceResult<String> {
    let email = email.trim().to_lowercase();
    match email.split_once('@') {
        Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(email),
        _ => Err(ServiceError::invalid("a valid email is required")),
    }
}

pub struct AuthManager {
    backend: Arc<dyn Backend>,
}

impl AuthManager {
    pub fn new(backend: Arc<dyn Backend>) -> Self {
        AuthManager { backend }
    }

    /// Creates the auth user and then its profile row.
    pub async fn sign_up(&self, request: SignUpRequest) -> ServiceResult<UserProfile> {
        let email = normalize_email(&request.email)?;
        if request.password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ServiceError::invalid(format!(
                "password must be at least {} characters",
                MIN_PASSWORD_LENGTH
            )));
        }
        let name = request.name.trim();
        if name.is_empty() {
            return Err(ServiceError::invalid("name is required"));
        }

        let user = self
            .backend
            .sign_up(&email, &request.password)
            .await
            .map_err(|err| match err {
                BackendError::Conflict(_) => {
                    ServiceError::Conflict("This email is already registered".to_string())
                }
                other => other.into(),
            })?;

        let profile = NewUserProfile::with_defaults(
            user.id.clone(),
            name.to_string(),
            request.title.trim().to_string(),
        );
        let profile = self.backend.insert_profile(profile).await.map_err(|err| {
            // The auth user stays behind, there is no remote transaction.
            error!(user_id = %user.id, "Profile insert after sign-up failed: {}", err);
            ServiceError::from(err)
        })?;

        info!(user_id = %profile.id, "Signed up");
        Ok(profile)
    }

    pub async fn sign_in(&self, email: &str, password: &str) -> ServiceResult<AuthSession> {
        let email = normalize_email(email)?;
        match self.backend.sign_in(&email, password).await {
            Ok(session) => {
                info!(user_id = %session.user.id, "Signed in");
                Ok(session)
            }
            Err(BackendError::Unauthorized(message)) => {
                debug!("Sign-in refused: {}", message);
                Err(ServiceError::Unauthorized)
            }
            Err(err) => Err(err.into()),
        }
    }

    pub async fn sign_out(&self, token: &str) -> ServiceResult<()> {
        self.backend.sign_out(token).await?;
        Ok(())
    }

    /// `None` for unknown or expired tokens.
    pub async fn resolve(&self, token: &str) -> ServiceResult<Option<AuthUser>> {
        Ok(self.backend.get_user(token).await?)
    }
}
