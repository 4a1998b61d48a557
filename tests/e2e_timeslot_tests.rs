//! End-to-end tests for timeslots and their availability

mod common;

use chrono::Weekday;
use common::{next_date_on, TestClient, TestServer};
use reqwest::StatusCode;
use serde_json::{json, Value};

fn timeslot_body() -> Value {
    json!({
        "title": "Career chat",
        "description": "Ask me anything about switching to backend work",
        "duration": "30분",
        "location": "Gangnam cafe",
        "price": 0,
        "available_days": ["Monday", "수요일", "월"],
        "available_times": ["9:00", "13:30", "09:00"],
    })
}

#[tokio::test]
async fn test_create_timeslot_normalizes_schedule() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_host(server.base_url.clone()).await;

    let response = client.create_timeslot(timeslot_body()).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created: Value = response.json().await.unwrap();

    assert_eq!(created["user_id"], server.users.host_id.as_str());
    assert_eq!(created["available_days"], json!(["월", "수"]));
    assert_eq!(created["available_times"], json!(["09:00", "13:30"]));
    assert_eq!(created["requires_approval"], false);

    let id = created["id"].as_str().unwrap();
    let fetched: Value = client.get_timeslot(id).await.json().await.unwrap();
    assert_eq!(fetched, created);

    let mine: Value = client.get_my_timeslots().await.json().await.unwrap();
    assert_eq!(mine.as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn test_create_timeslot_validation() {
    let server = TestServer::spawn().await;
    let client = TestClient::authenticated_host(server.base_url.clone()).await;

    let mut missing_title = timeslot_body();
    missing_title["title"] = json!("  ");
    let mut no_days = timeslot_body();
    no_days["available_days"] = json!([]);
    let mut bad_day = timeslot_body();
    bad_day["available_days"] = json!(["someday"]);
    let mut bad_time = timeslot_body();
    bad_time["available_times"] = json!(["25:00"]);
    let mut negative_price = timeslot_body();
    negative_price["price"] = json!(-1);
    let mut huge_price = timeslot_body();
    huge_price["price"] = json!(9_000_000_000_000_000_000i64);
    let mut no_description = timeslot_body();
    no_description.as_object_mut().unwrap().remove("description");
    let mut price_as_text = timeslot_body();
    price_as_text["price"] = json!("free");

    for body in [
        missing_title,
        no_days,
        bad_day,
        bad_time,
        negative_price,
        huge_price,
        no_description,
        price_as_text,
    ] {
        let response = client.create_timeslot(body).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let error: Value = response.json().await.unwrap();
        assert!(error["error"].is_string());
    }

    let mine: Value = client.get_my_timeslots().await.json().await.unwrap();
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_only_host_deletes_timeslot() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;
    let guest = TestClient::authenticated_guest(server.base_url.clone()).await;

    let id = host.create_default_timeslot(&["월"], false).await;

    let response = guest.delete_timeslot(&id).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = host.delete_timeslot(&id).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = host.get_timeslot(&id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let response = host.delete_timeslot(&id).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_availability_follows_weekdays_and_bookings() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;
    let guest = TestClient::authenticated_guest(server.base_url.clone()).await;

    let id = host.create_default_timeslot(&["월"], false).await;
    let monday = next_date_on(Weekday::Mon);
    let tuesday = next_date_on(Weekday::Tue);

    let response = guest.get_availability(&id, &monday.to_string()).await;
    assert_eq!(response.status(), StatusCode::OK);
    let availability: Value = response.json().await.unwrap();
    assert_eq!(availability["timeslot_id"], id.as_str());
    assert_eq!(availability["date"], monday.to_string());
    assert_eq!(availability["times"], json!(["10:00", "14:00"]));

    let availability: Value = guest
        .get_availability(&id, &tuesday.to_string())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(availability["times"], json!([]));

    let response = guest.book(&id, monday, "10:00").await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let availability: Value = guest
        .get_availability(&id, &monday.to_string())
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(availability["times"], json!(["14:00"]));
}

#[tokio::test]
async fn test_availability_rejects_bad_date() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;
    let id = host.create_default_timeslot(&["월"], false).await;

    let response = host.get_availability(&id, "next-monday").await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = host.get_availability("no-such-slot", "2030-01-07").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
