//! End-to-end tests: HTTP router -> subscription service -> mocked MailChimp.

use std::path::PathBuf;
use std::sync::Arc;

use axum::body::{Body, to_bytes};
use axum::http::{Method, Request, StatusCode};
use httpmock::{Method::GET, Method::PUT, MockServer};
use mailsub::api::create_router;
use mailsub::mailchimp::member_id;
use mailsub::settings::{SettingsStore, SubscriberStatus, SubscriptionSettings};
use mailsub::subscription::SubscriptionService;
use serde_json::{Value, json};
use tower::ServiceExt;

fn temp_settings_path(name: &str) -> PathBuf {
    let path =
        std::env::temp_dir().join(format!("mailsub-e2e-{name}-{}.json", std::process::id()));
    let _ = std::fs::remove_file(&path);
    path
}

async fn build_app(name: &str, mailchimp: &MockServer) -> axum::Router {
    let store = Arc::new(SettingsStore::open(temp_settings_path(name)).expect("open store"));
    store
        .update(SubscriptionSettings {
            api_key: "key123-us10".into(),
            list_id: "abc123".into(),
            status: SubscriberStatus::Pending,
            text: "Subscribe to our newsletter".into(),
            form_ids: vec![
                "warranty_form|EMAIL:field_email|FNAME:text:field_fname,BDAY:birthday:field_bday"
                    .into(),
            ],
            interest_group: Some("grp9".into()),
        })
        .await
        .expect("seed settings");

    let service =
        SubscriptionService::new(store, Some(mailchimp.base_url())).expect("build service");
    create_router(Arc::new(service))
}

async fn json_response(response: axum::response::Response) -> Value {
    let body = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body bytes");
    serde_json::from_slice(&body).expect("json body")
}

fn post_json(uri: &str, payload: &Value) -> Request<Body> {
    Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(payload.to_string()))
        .expect("request")
}

#[tokio::test]
async fn submission_flows_through_to_mailchimp() {
    let mailchimp = MockServer::start_async().await;
    let expected_path = format!("/lists/abc123/members/{}", member_id("Ada@Example.com"));
    let upsert = mailchimp
        .mock_async(|when, then| {
            when.method(PUT).path(expected_path.clone()).json_body_partial(
                json!({
                    "email_address": "Ada@Example.com",
                    "status": "pending",
                    "language": "en",
                    "merge_fields": { "FNAME": "Ada", "BDAY": "12/25" },
                    "interests": { "9143cf3bd1": true }
                })
                .to_string(),
            );
            then.status(200).json_body(json!({"id": "member"}));
        })
        .await;

    let app = build_app("flow", &mailchimp).await;
    let response = app
        .oneshot(post_json(
            "/subscribe",
            &json!({
                "form_id": "warranty_form",
                "fields": {
                    "field_email": "Ada@Example.com",
                    "field_fname": "Ada",
                    "field_bday": "12/25/2024"
                },
                "interests": ["9143cf3bd1"]
            }),
        ))
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_response(response).await;
    assert_eq!(body["subscribed"], true);
    assert_eq!(
        body["message"],
        "You have successfully subscribed. Check your inbox to confirm your subscription."
    );
    upsert.assert_async().await;
}

#[tokio::test]
async fn api_rejection_fails_soft_with_detail() {
    let mailchimp = MockServer::start_async().await;
    mailchimp
        .mock_async(|when, then| {
            when.method(PUT);
            then.status(400)
                .json_body(json!({"title": "Invalid Resource", "detail": "Invalid Resource"}));
        })
        .await;

    let app = build_app("reject", &mailchimp).await;
    let response = app
        .clone()
        .oneshot(post_json(
            "/subscribe",
            &json!({
                "form_id": "warranty_form",
                "fields": { "field_email": "bad@example.com" }
            }),
        ))
        .await
        .expect("router response");

    // The host flow must complete: HTTP 200, failure carried in the body.
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_response(response).await;
    assert_eq!(body["subscribed"], false);
    assert_eq!(body["message"], "Invalid Resource");

    let response = app
        .oneshot(
            Request::builder()
                .uri("/metrics")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");
    let metrics = json_response(response).await;
    assert_eq!(metrics["attempts"], 1);
    assert_eq!(metrics["failed"], 1);
}

#[tokio::test]
async fn interest_group_is_fetched_per_request() {
    let mailchimp = MockServer::start_async().await;
    mailchimp
        .mock_async(|when, then| {
            when.method(GET).path("/lists/abc123/interest-categories/grp9");
            then.status(200).json_body(json!({"id": "grp9", "title": "Topics"}));
        })
        .await;
    mailchimp
        .mock_async(|when, then| {
            when.method(GET)
                .path("/lists/abc123/interest-categories/grp9/interests");
            then.status(200).json_body(json!({
                "interests": [
                    { "id": "9143cf3bd1", "name": "Releases" },
                    { "id": "77f1b2a3c4", "name": "Events" }
                ]
            }));
        })
        .await;

    let app = build_app("group", &mailchimp).await;
    let response = app
        .oneshot(
            Request::builder()
                .uri("/interest-group")
                .body(Body::empty())
                .expect("request"),
        )
        .await
        .expect("router response");

    assert_eq!(response.status(), StatusCode::OK);
    let body = json_response(response).await;
    assert_eq!(body["title"], "Topics");
    assert_eq!(body["interests"][0]["name"], "Releases");
}

#[tokio::test]
async fn settings_edits_apply_to_the_next_submission() {
    let mailchimp = MockServer::start_async().await;
    let upsert = mailchimp
        .mock_async(|when, then| {
            when.method(PUT)
                .path_contains("/lists/newlist/members/");
            then.status(200).json_body(json!({"id": "member"}));
        })
        .await;

    let app = build_app("edit", &mailchimp).await;

    // Point the gateway at a different audience through the settings surface.
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method(Method::PUT)
                .uri("/settings")
                .header("content-type", "application/json")
                .body(Body::from(
                    json!({
                        "api_key": "key123-us10",
                        "list_id": "newlist",
                        "status": "subscribed",
                        "text": "Subscribe",
                        "form_ids": ["warranty_form|EMAIL:field_email"],
                        "interest_group": null
                    })
                    .to_string(),
                ))
                .expect("request"),
        )
        .await
        .expect("router response");
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(post_json(
            "/subscribe",
            &json!({
                "form_id": "warranty_form",
                "fields": { "field_email": "ada@example.com" }
            }),
        ))
        .await
        .expect("router response");
    assert_eq!(json_response(response).await["subscribed"], true);
    upsert.assert_async().await;
}
