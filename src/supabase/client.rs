//! HTTP client for the Supabase REST (PostgREST) and auth (GoTrue) APIs.

use anyhow::{Context, Result};
use reqwest::{Method, RequestBuilder, Response, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, warn};

use super::query::Query;
use crate::backend::{AuthUser, BackendError, BackendResult};
use crate::server::metrics;

/// Error body shapes of both APIs, PostgREST uses `message` and GoTrue
/// uses one of the others depending on the endpoint.
#[derive(Deserialize, Default)]
struct RemoteError {
    message: Option<String>,
    msg: Option<String>,
    error_description: Option<String>,
    error: Option<String>,
}

pub(crate) fn error_from_status(status: StatusCode, body: &str) -> BackendError {
    let message = serde_json::from_str::<RemoteError>(body)
        .ok()
        .and_then(|e| e.message.or(e.msg).or(e.error_description).or(e.error))
        .unwrap_or_else(|| body.trim().to_string());

    match status {
        StatusCode::CONFLICT => BackendError::Conflict(message),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BackendError::Unauthorized(message),
        _ => BackendError::Rejected {
            status: status.as_u16(),
            message,
        },
    }
}

pub struct SupabaseClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseClient {
    /// * `base_url` - project URL (e.g., "https://xyz.supabase.co")
    /// * `api_key` - key sent as `apikey` and as bearer for table access
    pub fn new(base_url: &str, api_key: &str, timeout_sec: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_sec))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn request(&self, method: Method, url: String, bearer: Option<&str>) -> RequestBuilder {
        self.http
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer.unwrap_or(&self.api_key))
    }

    fn rest(&self, method: Method, path: &str) -> RequestBuilder {
        self.request(method, format!("{}/rest/v1/{}", self.base_url, path), None)
    }

    fn auth(&self, method: Method, path: &str, bearer: Option<&str>) -> RequestBuilder {
        self.request(method, format!("{}/auth/v1/{}", self.base_url, path), bearer)
    }

    async fn send(&self, operation: &str, builder: RequestBuilder) -> BackendResult<Response> {
        let start = Instant::now();
        let result = builder.send().await;
        let elapsed = start.elapsed();

        let response = match result {
            Ok(response) => response,
            Err(err) => {
                warn!(operation, "Supabase request failed: {}", err);
                metrics::record_backend_request(operation, "unavailable", elapsed);
                return Err(BackendError::Unavailable(format!("{}: {}", operation, err)));
            }
        };

        let status = response.status();
        if status.is_success() {
            metrics::record_backend_request(operation, "ok", elapsed);
            return Ok(response);
        }

        metrics::record_backend_request(operation, "error", elapsed);
        let body = response.text().await.unwrap_or_default();
        debug!(operation, status = status.as_u16(), body = %body, "Supabase rejected request");
        Err(error_from_status(status, &body))
    }

    async fn read_json<T: DeserializeOwned>(operation: &str, response: Response) -> BackendResult<T> {
        let value = response
            .json::<T>()
            .await
            .with_context(|| format!("Failed to parse {} response", operation))?;
        Ok(value)
    }

    pub async fn select<T: DeserializeOwned>(&self, table: &str, query: &Query) -> BackendResult<Vec<T>> {
        let operation = format!("select:{}", table);
        let builder = self.rest(Method::GET, table).query(query.params());
        let response = self.send(&operation, builder).await?;
        Self::read_json(&operation, response).await
    }

    /// Inserts one row and returns the stored representation.
    pub async fn insert<B, T>(&self, table: &str, row: &B) -> BackendResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let operation = format!("insert:{}", table);
        let builder = self
            .rest(Method::POST, table)
            .header("Prefer", "return=representation")
            .json(row);
        let response = self.send(&operation, builder).await?;
        let mut rows: Vec<T> = Self::read_json(&operation, response).await?;
        match rows.pop() {
            Some(row) => Ok(row),
            None => Err(BackendError::Internal(anyhow::anyhow!(
                "Insert into {} returned no rows",
                table
            ))),
        }
    }

    /// Returns the updated rows, empty when the filter matched nothing.
    pub async fn update<B, T>(&self, table: &str, query: &Query, patch: &B) -> BackendResult<Vec<T>>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let operation = format!("update:{}", table);
        let builder = self
            .rest(Method::PATCH, table)
            .query(query.params())
            .header("Prefer", "return=representation")
            .json(patch);
        let response = self.send(&operation, builder).await?;
        Self::read_json(&operation, response).await
    }

    /// Returns the deleted rows.
    pub async fn delete<T: DeserializeOwned>(&self, table: &str, query: &Query) -> BackendResult<Vec<T>> {
        let operation = format!("delete:{}", table);
        let builder = self
            .rest(Method::DELETE, table)
            .query(query.params())
            .header("Prefer", "return=representation");
        let response = self.send(&operation, builder).await?;
        Self::read_json(&operation, response).await
    }

    pub async fn rpc(&self, function: &str, args: &serde_json::Value) -> BackendResult<()> {
        let operation = format!("rpc:{}", function);
        let builder = self
            .rest(Method::POST, &format!("rpc/{}", function))
            .json(args);
        self.send(&operation, builder).await?;
        Ok(())
    }

    pub async fn auth_post<B, T>(&self, path: &str, body: &B, bearer: Option<&str>) -> BackendResult<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let operation = format!("auth:{}", path);
        let builder = self.auth(Method::POST, path, bearer).json(body);
        let response = self.send(&operation, builder).await?;
        Self::read_json(&operation, response).await
    }

    /// `None` when the token is not (or no longer) valid.
    pub async fn auth_user(&self, access_token: &str) -> BackendResult<Option<AuthUser>> {
        let builder = self.auth(Method::GET, "user", Some(access_token));
        match self.send("auth:user", builder).await {
            Ok(response) => Ok(Some(Self::read_json("auth:user", response).await?)),
            Err(BackendError::Unauthorized(_)) => Ok(None),
            Err(err) => Err(err),
        }
    }

    pub async fn auth_logout(&self, access_token: &str) -> BackendResult<()> {
        let builder = self.auth(Method::POST, "logout", Some(access_token));
        self.send("auth:logout", builder).await?;
        Ok(())
    }
}
