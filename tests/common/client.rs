//! HTTP client for end-to-end tests
//!
//! This module provides a high-level HTTP client that wraps reqwest
//! and provides methods for all timeslot-server endpoints.
//!
//! When API routes or request formats change, update only this file.

use super::constants::*;
use chrono::NaiveDate;
use reqwest::Response;
use serde_json::{json, Value};
use std::time::Duration;

/// HTTP test client with cookie-based session management
pub struct TestClient {
    /// The underlying reqwest client (public for custom requests in tests)
    pub client: reqwest::Client,
    /// The base URL of the test server
    pub base_url: String,
}

impl TestClient {
    /// Creates a new unauthenticated client
    ///
    /// Use this for testing authentication flows.
    pub fn new(base_url: String) -> Self {
        let client = reqwest::Client::builder()
            .cookie_store(true) // Automatically handle session cookies
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()
            .expect("Failed to build reqwest client");

        Self { client, base_url }
    }

    async fn authenticated(base_url: String, email: &str, password: &str) -> Self {
        let client = Self::new(base_url);

        let response = client.login(email, password).await;
        assert_eq!(
            response.status(),
            reqwest::StatusCode::CREATED,
            "Authentication of {} failed: {:?}",
            email,
            response.text().await
        );

        client
    }

    /// Client logged in as the seeded host
    pub async fn authenticated_host(base_url: String) -> Self {
        Self::authenticated(base_url, HOST_EMAIL, HOST_PASS).await
    }

    /// Client logged in as the seeded guest
    pub async fn authenticated_guest(base_url: String) -> Self {
        Self::authenticated(base_url, GUEST_EMAIL, GUEST_PASS).await
    }

    /// Client logged in as the seeded third user
    pub async fn authenticated_other(base_url: String) -> Self {
        Self::authenticated(base_url, OTHER_EMAIL, OTHER_PASS).await
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get(&self, path: &str) -> Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("GET {} failed: {}", path, e))
    }

    async fn post_json(&self, path: &str, body: Value) -> Response {
        self.client
            .post(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    async fn post_empty(&self, path: &str) -> Response {
        self.client
            .post(self.url(path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("POST {} failed: {}", path, e))
    }

    async fn put_json(&self, path: &str, body: Value) -> Response {
        self.client
            .put(self.url(path))
            .json(&body)
            .send()
            .await
            .unwrap_or_else(|e| panic!("PUT {} failed: {}", path, e))
    }

    async fn delete(&self, path: &str) -> Response {
        self.client
            .delete(self.url(path))
            .send()
            .await
            .unwrap_or_else(|e| panic!("DELETE {} failed: {}", path, e))
    }

    // ========================================================================
    // Authentication Endpoints
    // ========================================================================

    /// POST /v1/auth/signup
    pub async fn signup(&self, email: &str, password: &str, name: &str) -> Response {
        self.post_json(
            "/v1/auth/signup",
            json!({ "email": email, "password": password, "name": name, "title": "Tester" }),
        )
        .await
    }

    /// POST /v1/auth/login
    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.post_json(
            "/v1/auth/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    /// GET /v1/auth/logout
    pub async fn logout(&self) -> Response {
        self.get("/v1/auth/logout").await
    }

    /// GET /v1/auth/session
    pub async fn get_session(&self) -> Response {
        self.get("/v1/auth/session").await
    }

    // ========================================================================
    // Profile Endpoints
    // ========================================================================

    /// GET /v1/profile/me
    pub async fn get_my_profile(&self) -> Response {
        self.get("/v1/profile/me").await
    }

    /// PUT /v1/profile/me
    pub async fn update_my_profile(&self, body: Value) -> Response {
        self.put_json("/v1/profile/me", body).await
    }

    /// GET /v1/profile/me/followers
    pub async fn get_my_followers(&self) -> Response {
        self.get("/v1/profile/me/followers").await
    }

    /// GET /v1/profile/me/following
    pub async fn get_my_following(&self) -> Response {
        self.get("/v1/profile/me/following").await
    }

    /// GET /v1/users/{id}
    pub async fn get_user_page(&self, user_id: &str) -> Response {
        self.get(&format!("/v1/users/{}", user_id)).await
    }

    /// GET /v1/explore
    pub async fn explore(&self, category: Option<&str>, q: Option<&str>) -> Response {
        let mut query = vec![];
        if let Some(category) = category {
            query.push(("category", category));
        }
        if let Some(q) = q {
            query.push(("q", q));
        }
        self.client
            .get(self.url("/v1/explore"))
            .query(&query)
            .send()
            .await
            .expect("Explore request failed")
    }

    // ========================================================================
    // Follow Endpoints
    // ========================================================================

    /// POST /v1/users/{id}/follow
    pub async fn follow(&self, user_id: &str) -> Response {
        self.post_empty(&format!("/v1/users/{}/follow", user_id))
            .await
    }

    /// DELETE /v1/users/{id}/follow
    pub async fn unfollow(&self, user_id: &str) -> Response {
        self.delete(&format!("/v1/users/{}/follow", user_id)).await
    }

    /// GET /v1/users/{id}/follow
    pub async fn get_follow_state(&self, user_id: &str) -> Response {
        self.get(&format!("/v1/users/{}/follow", user_id)).await
    }

    // ========================================================================
    // Timeslot Endpoints
    // ========================================================================

    /// POST /v1/timeslots
    pub async fn create_timeslot(&self, body: Value) -> Response {
        self.post_json("/v1/timeslots", body).await
    }

    /// POST /v1/timeslots with a valid body, returns the created id
    pub async fn create_default_timeslot(&self, days: &[&str], requires_approval: bool) -> String {
        let response = self
            .create_timeslot(json!({
                "title": "Rust code review",
                "description": "One hour of review on your project",
                "duration": "60분",
                "location": "Online",
                "price": 30000,
                "available_days": days,
                "available_times": ["10:00", "14:00"],
                "requires_approval": requires_approval,
            }))
            .await;
        assert_eq!(response.status(), reqwest::StatusCode::CREATED);
        let body: Value = response.json().await.expect("Invalid timeslot body");
        body["id"].as_str().expect("Timeslot without id").to_string()
    }

    /// GET /v1/timeslots/mine
    pub async fn get_my_timeslots(&self) -> Response {
        self.get("/v1/timeslots/mine").await
    }

    /// GET /v1/timeslots/{id}
    pub async fn get_timeslot(&self, id: &str) -> Response {
        self.get(&format!("/v1/timeslots/{}", id)).await
    }

    /// DELETE /v1/timeslots/{id}
    pub async fn delete_timeslot(&self, id: &str) -> Response {
        self.delete(&format!("/v1/timeslots/{}", id)).await
    }

    /// GET /v1/timeslots/{id}/availability?date=
    pub async fn get_availability(&self, id: &str, date: &str) -> Response {
        self.get(&format!("/v1/timeslots/{}/availability?date={}", id, date))
            .await
    }

    // ========================================================================
    // Booking Endpoints
    // ========================================================================

    /// POST /v1/timeslots/{id}/bookings
    pub async fn book(&self, timeslot_id: &str, date: NaiveDate, time: &str) -> Response {
        self.post_json(
            &format!("/v1/timeslots/{}/bookings", timeslot_id),
            json!({ "date": date.format("%Y-%m-%d").to_string(), "time": time }),
        )
        .await
    }

    /// GET /v1/bookings?direction=
    pub async fn get_bookings(&self, direction: &str) -> Response {
        self.get(&format!("/v1/bookings?direction={}", direction))
            .await
    }

    /// POST /v1/bookings/{id}/{action}
    pub async fn booking_action(&self, booking_id: &str, action: &str) -> Response {
        self.post_empty(&format!("/v1/bookings/{}/{}", booking_id, action))
            .await
    }

    // ========================================================================
    // Calendar Endpoints
    // ========================================================================

    /// POST /v1/events
    pub async fn create_event(&self, body: Value) -> Response {
        self.post_json("/v1/events", body).await
    }

    /// GET /v1/events?scope=&date=
    pub async fn get_events(&self, scope: &str, date: Option<&str>) -> Response {
        let mut path = format!("/v1/events?scope={}", scope);
        if let Some(date) = date {
            path.push_str(&format!("&date={}", date));
        }
        self.get(&path).await
    }

    /// POST /v1/events/{id}/attend
    pub async fn attend(&self, event_id: &str) -> Response {
        self.post_empty(&format!("/v1/events/{}/attend", event_id))
            .await
    }

    /// DELETE /v1/events/{id}/attend
    pub async fn unattend(&self, event_id: &str) -> Response {
        self.delete(&format!("/v1/events/{}/attend", event_id))
            .await
    }
}
