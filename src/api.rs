//! HTTP surface for the Mailsub gateway.
//!
//! This module exposes a compact Axum router with a handful of endpoints:
//!
//! - `POST /subscribe` – Process a host form submission and upsert the member
//!   into the configured MailChimp audience. Always answers `200` with
//!   `{subscribed, message}`; subscription problems never fail the host flow.
//! - `GET /settings` / `PUT /settings` – Read and persist the subscription
//!   settings (API key, list id, default status, opt-in text, enabled-forms
//!   mapping lines, interest group).
//! - `GET /interest-group` – Title and options of the configured interest
//!   category, for rendering opt-in checkboxes.
//! - `GET /metrics` – Observe subscription counters.
//! - `GET /commands` – Machine-readable command catalog for quick discovery
//!   by tools/hosts.

use std::collections::HashMap;
use std::sync::Arc;

use axum::{
    Json, Router,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::mailchimp::MailchimpError;
use crate::metrics::MetricsSnapshot;
use crate::settings::SubscriptionSettings;
use crate::subscription::{FormSubmission, SubscriptionApi, SubscriptionError};

/// Build the HTTP router exposing the gateway surface.
pub fn create_router<S>(service: Arc<S>) -> Router
where
    S: SubscriptionApi + 'static,
{
    Router::new()
        .route("/subscribe", post(subscribe::<S>))
        .route("/settings", get(get_settings::<S>).put(put_settings::<S>))
        .route("/interest-group", get(interest_group::<S>))
        .route("/metrics", get(get_metrics::<S>))
        .route("/commands", get(get_commands))
        .with_state(service)
}

/// Request body for the `POST /subscribe` endpoint.
#[derive(Deserialize)]
struct SubscribeRequest {
    /// Identifier of the host form that was submitted.
    form_id: String,
    /// Submitted field values keyed by field name.
    #[serde(default)]
    fields: HashMap<String, String>,
    /// Interest ids the subscriber ticked.
    #[serde(default)]
    interests: Vec<String>,
    /// Optional locale tag (defaults to `en`).
    #[serde(default)]
    language: Option<String>,
}

/// Response body for the `POST /subscribe` endpoint.
#[derive(Serialize)]
struct SubscribeResponse {
    /// Whether the member upsert went through.
    subscribed: bool,
    /// User-facing confirmation or failure message.
    message: String,
}

/// Process a form submission.
///
/// The handler never returns an error status for subscription problems; the
/// outcome carries the user-facing message either way, so the host page can
/// complete its own submit flow regardless.
async fn subscribe<S>(
    State(service): State<Arc<S>>,
    Json(request): Json<SubscribeRequest>,
) -> Json<SubscribeResponse>
where
    S: SubscriptionApi,
{
    let SubscribeRequest {
        form_id,
        fields,
        interests,
        language,
    } = request;
    let outcome = service
        .subscribe(FormSubmission {
            form_id,
            fields,
            interests,
            language,
        })
        .await;
    Json(SubscribeResponse {
        subscribed: outcome.subscribed,
        message: outcome.message,
    })
}

/// Read the current subscription settings.
async fn get_settings<S>(State(service): State<Arc<S>>) -> Json<SubscriptionSettings>
where
    S: SubscriptionApi,
{
    Json(service.settings().await)
}

/// Persist new subscription settings.
async fn put_settings<S>(
    State(service): State<Arc<S>>,
    Json(settings): Json<SubscriptionSettings>,
) -> Result<Json<SubscriptionSettings>, AppError>
where
    S: SubscriptionApi,
{
    service.update_settings(settings).await?;
    Ok(Json(service.settings().await))
}

/// Response body for `GET /interest-group`.
#[derive(Serialize)]
struct InterestGroupResponse {
    title: String,
    interests: Vec<crate::mailchimp::Interest>,
}

/// Fetch the configured interest category for checkbox rendering.
async fn interest_group<S>(
    State(service): State<Arc<S>>,
) -> Result<Json<InterestGroupResponse>, AppError>
where
    S: SubscriptionApi,
{
    let group = service.interest_group().await?;
    Ok(Json(InterestGroupResponse {
        title: group.title,
        interests: group.interests,
    }))
}

/// Return a concise metrics snapshot with subscription counters.
async fn get_metrics<S>(State(service): State<Arc<S>>) -> Json<MetricsSnapshot>
where
    S: SubscriptionApi,
{
    Json(service.metrics_snapshot())
}

/// Descriptor for a single command in the discovery catalog.
#[derive(Serialize)]
struct CommandDescriptor {
    name: &'static str,
    method: &'static str,
    path: &'static str,
    description: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    request_example: Option<serde_json::Value>,
}

/// Response body for `GET /commands`.
#[derive(Serialize)]
struct CommandsResponse {
    commands: Vec<CommandDescriptor>,
}

/// Enumerate supported HTTP commands for discovery/UX in hosts and tools.
async fn get_commands() -> Json<CommandsResponse> {
    Json(CommandsResponse {
        commands: vec![
            CommandDescriptor {
                name: "subscribe",
                method: "POST",
                path: "/subscribe",
                description: "Process a form submission and upsert the member into the configured audience. Always returns { \"subscribed\": bool, \"message\": string }.",
                request_example: Some(json!({
                    "form_id": "warranty_form",
                    "fields": { "field_email": "ada@example.com", "field_fname": "Ada" },
                    "interests": ["9143cf3bd1"],
                    "language": "en"
                })),
            },
            CommandDescriptor {
                name: "get_settings",
                method: "GET",
                path: "/settings",
                description: "Return the current subscription settings record.",
                request_example: None,
            },
            CommandDescriptor {
                name: "put_settings",
                method: "PUT",
                path: "/settings",
                description: "Persist a full subscription settings record and return it.",
                request_example: Some(json!({
                    "api_key": "key123-us10",
                    "list_id": "abc123",
                    "status": "pending",
                    "text": "Subscribe to our newsletter",
                    "form_ids": ["warranty_form|EMAIL:field_email|FNAME:text:field_fname"],
                    "interest_group": null
                })),
            },
            CommandDescriptor {
                name: "interest_group",
                method: "GET",
                path: "/interest-group",
                description: "Return the configured interest category's title and options.",
                request_example: None,
            },
            CommandDescriptor {
                name: "metrics",
                method: "GET",
                path: "/metrics",
                description: "Return subscription counters useful for observability dashboards.",
                request_example: None,
            },
        ],
    })
}

struct AppError(SubscriptionError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = match &self.0 {
            SubscriptionError::Mailchimp(MailchimpError::MissingInterestGroup) => {
                StatusCode::NOT_FOUND
            }
            SubscriptionError::Mailchimp(_) => StatusCode::BAD_GATEWAY,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.0.to_string()).into_response()
    }
}

impl From<SubscriptionError> for AppError {
    fn from(inner: SubscriptionError) -> Self {
        Self(inner)
    }
}
