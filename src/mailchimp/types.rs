//! Shared types used by the MailChimp client.

use std::collections::BTreeMap;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::settings::SubscriberStatus;

/// Errors returned while interacting with MailChimp.
#[derive(Debug, Error)]
pub enum MailchimpError {
    /// API key is missing the `-<datacenter>` suffix the endpoint is derived from.
    #[error("MailChimp API key has no datacenter suffix")]
    InvalidApiKey,
    /// A group resource was requested but no interest group is configured.
    #[error("No interest group is configured")]
    MissingInterestGroup,
    /// HTTP layer failed before receiving a response.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// MailChimp responded with a non-success status code.
    #[error("MailChimp API error ({status}): {detail}")]
    Api {
        /// HTTP status returned by the API.
        status: StatusCode,
        /// Human-readable problem description from the response body's
        /// `detail` field, or the raw body when absent.
        detail: String,
    },
}

/// Addressable API resources.
///
/// Each variant maps to one endpoint path; group resources additionally
/// require an interest group to be configured.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Resource {
    /// Interest-category metadata (its title).
    GroupTitle,
    /// Interest options within the category.
    GroupData,
    /// Member upsert collection; the member id is appended per call.
    Subscribe,
}

/// Wire body for the member upsert PUT.
///
/// `merge_fields` and `interests` are omitted entirely when empty; MailChimp
/// rejects empty merge values for typed fields.
#[derive(Debug, Serialize)]
pub struct MemberUpsert {
    /// API key, mirrored into the body as the legacy API accepted it.
    pub apikey: String,
    /// Subscriber email address, as submitted.
    pub email_address: String,
    /// Status assigned to the member on insert.
    pub status: SubscriberStatus,
    /// Locale tag, e.g. `en`.
    pub language: String,
    /// Merge-tag values keyed by tag name.
    #[serde(skip_serializing_if = "Map::is_empty")]
    pub merge_fields: Map<String, Value>,
    /// Interest opt-ins keyed by interest id.
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub interests: BTreeMap<String, bool>,
}

/// One selectable interest within the configured category.
#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct Interest {
    /// Interest identifier used in upsert payloads.
    pub id: String,
    /// Display name shown next to the opt-in checkbox.
    pub name: String,
}

#[derive(Deserialize)]
pub(crate) struct InterestCategoryResponse {
    pub(crate) title: String,
}

#[derive(Deserialize)]
pub(crate) struct InterestListResponse {
    pub(crate) interests: Vec<Interest>,
}
