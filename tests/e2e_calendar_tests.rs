//! End-to-end tests for calendar events and attendance

mod common;

use common::{TestClient, TestServer, HOST_NAME};
use reqwest::StatusCode;
use serde_json::{json, Value};

async fn create_event(client: &TestClient, title: &str, date: &str) -> String {
    let response = client
        .create_event(json!({
            "title": title,
            "description": "Bring a laptop",
            "event_date": date,
            "event_time": "19:00",
            "location": "Seongsu",
        }))
        .await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let event: Value = response.json().await.unwrap();
    event["id"].as_str().unwrap().to_string()
}

fn titles(events: &Value) -> Vec<String> {
    events
        .as_array()
        .unwrap()
        .iter()
        .map(|e| e["title"].as_str().unwrap().to_string())
        .collect()
}

#[tokio::test]
async fn test_create_and_list_own_events() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;

    create_event(&host, "Rust meetup", "2030-05-10").await;
    create_event(&host, "Study group", "2030-05-03").await;

    let response = host.get_events("my", None).await;
    assert_eq!(response.status(), StatusCode::OK);
    let events: Value = response.json().await.unwrap();
    assert_eq!(titles(&events), vec!["Study group", "Rust meetup"]);
    assert_eq!(events[0]["author"]["name"], HOST_NAME);
    assert_eq!(events[0]["event_time"], "19:00");
    assert_eq!(events[0]["is_attending"], false);

    let on_day: Value = host
        .get_events("my", Some("2030-05-10"))
        .await
        .json()
        .await
        .unwrap();
    assert_eq!(titles(&on_day), vec!["Rust meetup"]);
}

#[tokio::test]
async fn test_create_event_validation() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;

    let response = host
        .create_event(json!({ "title": "", "event_date": "2030-05-10" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = host
        .create_event(json!({ "title": "Party", "event_date": "May 10th" }))
        .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = host.get_events("my", Some("tomorrow")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_following_scope_shows_followed_authors_only() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;
    let guest = TestClient::authenticated_guest(server.base_url.clone()).await;
    let other = TestClient::authenticated_other(server.base_url.clone()).await;

    create_event(&host, "Rust meetup", "2030-05-10").await;
    create_event(&other, "Design review", "2030-05-11").await;

    let events: Value = guest.get_events("following", None).await.json().await.unwrap();
    assert!(events.as_array().unwrap().is_empty());

    guest.follow(&server.users.host_id).await;

    let events: Value = guest.get_events("following", None).await.json().await.unwrap();
    assert_eq!(titles(&events), vec!["Rust meetup"]);

    let mine: Value = guest.get_events("my", None).await.json().await.unwrap();
    assert!(mine.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn test_attend_and_unattend() {
    let server = TestServer::spawn().await;
    let host = TestClient::authenticated_host(server.base_url.clone()).await;
    let guest = TestClient::authenticated_guest(server.base_url.clone()).await;

    let id = create_event(&host, "Rust meetup", "2030-05-10").await;
    guest.follow(&server.users.host_id).await;

    let response = guest.attend(&id).await;
    assert_eq!(response.status(), StatusCode::OK);
    let state: Value = response.json().await.unwrap();
    assert_eq!(state["event_id"], id.as_str());
    assert_eq!(state["attending"], true);
    assert_eq!(state["attendees_count"], 1);

    let state: Value = guest.attend(&id).await.json().await.unwrap();
    assert_eq!(state["attendees_count"], 1);

    let events: Value = guest.get_events("following", None).await.json().await.unwrap();
    assert_eq!(events[0]["is_attending"], true);
    assert_eq!(events[0]["attendees_count"], 1);

    let state: Value = guest.unattend(&id).await.json().await.unwrap();
    assert_eq!(state["attending"], false);
    assert_eq!(state["attendees_count"], 0);

    let response = guest.attend("no-such-event").await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
