//! Core data types and error definitions for the subscription gateway.

use std::collections::HashMap;

use serde::Serialize;
use thiserror::Error;

use crate::mailchimp::{Interest, MailchimpError};
use crate::settings::SettingsError;
use crate::subscription::mapping::MappingError;

/// One submitted host form, as handed to the gateway.
#[derive(Clone, Debug, Default)]
pub struct FormSubmission {
    /// Identifier of the host form that was submitted.
    pub form_id: String,
    /// Submitted field values keyed by field name.
    pub fields: HashMap<String, String>,
    /// Interest ids the subscriber ticked, if any.
    pub interests: Vec<String>,
    /// Optional locale tag; defaults to `en`.
    pub language: Option<String>,
}

/// Result handed back to the host form flow.
///
/// Subscription failure never fails the surrounding submission; the host
/// renders `message` either way.
#[derive(Clone, Debug, Serialize)]
pub struct SubscribeOutcome {
    /// Whether the member upsert went through.
    pub subscribed: bool,
    /// User-facing confirmation or failure message.
    pub message: String,
}

/// Interest-category metadata used to render opt-in checkboxes.
#[derive(Clone, Debug, Serialize)]
pub struct InterestGroup {
    /// Category title.
    pub title: String,
    /// Selectable interests within the category.
    pub interests: Vec<Interest>,
}

/// Errors emitted while processing a subscription attempt.
#[derive(Debug, Error)]
pub enum SubscriptionError {
    /// Settings store failed to load or persist.
    #[error("Settings store error: {0}")]
    Settings(#[from] SettingsError),
    /// Enabled-forms lines could not be parsed.
    #[error("Form mapping is invalid: {0}")]
    Mapping(#[from] MappingError),
    /// Submitted form id has no mapping line.
    #[error("Form '{0}' is not enabled for subscriptions")]
    UnknownForm(String),
    /// Mapped email field was absent or empty in the submission.
    #[error("Form '{form_id}' submission carries no email address")]
    MissingEmail {
        /// Form the submission belonged to.
        form_id: String,
    },
    /// MailChimp call failed at the transport or API level.
    #[error(transparent)]
    Mailchimp(#[from] MailchimpError),
}
