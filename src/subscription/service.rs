//! Subscription service coordinating settings, mapping, and MailChimp calls.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;

use crate::mailchimp::{MailchimpClient, MailchimpError};
use crate::metrics::{MetricsSnapshot, SubscriptionMetrics};
use crate::settings::{SettingsStore, SubscriptionSettings};
use crate::subscription::mapping::{build_merge_fields, find_mapping, parse_form_mappings};
use crate::subscription::types::{
    FormSubmission, InterestGroup, SubscribeOutcome, SubscriptionError,
};

const DEFAULT_LANGUAGE: &str = "en";

const CONFIRMATION_MESSAGE: &str =
    "You have successfully subscribed. Check your inbox to confirm your subscription.";

const UNAVAILABLE_MESSAGE: &str =
    "We could not complete your subscription right now. Please try again later.";

const MISSING_EMAIL_MESSAGE: &str = "Please provide an email address to subscribe.";

/// Abstraction over the gateway used by external surfaces (HTTP today).
#[async_trait]
pub trait SubscriptionApi: Send + Sync {
    /// Process a form submission. Never fails: subscription problems are
    /// folded into the outcome so the host form flow always completes.
    async fn subscribe(&self, submission: FormSubmission) -> SubscribeOutcome;

    /// Fetch the configured interest category's title and options.
    async fn interest_group(&self) -> Result<InterestGroup, SubscriptionError>;

    /// Snapshot of the live settings.
    async fn settings(&self) -> SubscriptionSettings;

    /// Persist new settings.
    async fn update_settings(
        &self,
        settings: SubscriptionSettings,
    ) -> Result<(), SubscriptionError>;

    /// Retrieve the current metrics snapshot for diagnostics.
    fn metrics_snapshot(&self) -> MetricsSnapshot;
}

/// Coordinates the full subscription path: settings lookup, mapping parse,
/// field normalization, and the MailChimp upsert.
///
/// The service owns the shared HTTP connection pool and the metrics registry.
/// Construct it once near process start and share it through an `Arc`.
/// Settings are re-read from the store on every attempt, so edits made
/// through the HTTP surface apply to the next submission.
pub struct SubscriptionService {
    store: Arc<SettingsStore>,
    http: Client,
    endpoint_override: Option<String>,
    metrics: Arc<SubscriptionMetrics>,
}

impl SubscriptionService {
    /// Build a new gateway service over the given settings store.
    ///
    /// `endpoint_override` replaces the datacenter-derived MailChimp endpoint
    /// when set (proxies, test harnesses).
    pub fn new(
        store: Arc<SettingsStore>,
        endpoint_override: Option<String>,
    ) -> Result<Self, SubscriptionError> {
        let http = Client::builder()
            .user_agent(concat!("mailsub/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(MailchimpError::from)?;
        Ok(Self {
            store,
            http,
            endpoint_override,
            metrics: Arc::new(SubscriptionMetrics::new()),
        })
    }

    fn client(
        &self,
        settings: &SubscriptionSettings,
    ) -> Result<MailchimpClient, MailchimpError> {
        match &self.endpoint_override {
            Some(endpoint) => Ok(MailchimpClient::with_endpoint(
                self.http.clone(),
                endpoint.clone(),
                settings,
            )),
            None => MailchimpClient::new(self.http.clone(), settings),
        }
    }

    async fn try_subscribe(&self, submission: &FormSubmission) -> Result<(), SubscriptionError> {
        let settings = self.store.current().await;
        let mappings = parse_form_mappings(&settings.form_ids)?;
        let mapping = find_mapping(&mappings, &submission.form_id)
            .ok_or_else(|| SubscriptionError::UnknownForm(submission.form_id.clone()))?;

        let email = submission
            .fields
            .get(&mapping.email_field)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| SubscriptionError::MissingEmail {
                form_id: submission.form_id.clone(),
            })?;

        let merge_fields = build_merge_fields(mapping, &submission.fields);
        let interests: BTreeMap<String, bool> = submission
            .interests
            .iter()
            .map(|id| (id.clone(), true))
            .collect();
        let language = submission.language.as_deref().unwrap_or(DEFAULT_LANGUAGE);

        let client = self.client(&settings)?;
        client
            .subscribe(email, merge_fields, interests, language)
            .await?;
        Ok(())
    }
}

#[async_trait]
impl SubscriptionApi for SubscriptionService {
    async fn subscribe(&self, submission: FormSubmission) -> SubscribeOutcome {
        match self.try_subscribe(&submission).await {
            Ok(()) => {
                self.metrics.record_success();
                SubscribeOutcome {
                    subscribed: true,
                    message: CONFIRMATION_MESSAGE.to_string(),
                }
            }
            Err(err) => {
                self.metrics.record_failure();
                tracing::warn!(form = %submission.form_id, error = %err, "Subscription failed");
                SubscribeOutcome {
                    subscribed: false,
                    message: user_message(&err),
                }
            }
        }
    }

    async fn interest_group(&self) -> Result<InterestGroup, SubscriptionError> {
        let settings = self.store.current().await;
        let client = self.client(&settings)?;
        let title = client.group_title().await?;
        let interests = client.group_data().await?;
        Ok(InterestGroup { title, interests })
    }

    async fn settings(&self) -> SubscriptionSettings {
        self.store.current().await
    }

    async fn update_settings(
        &self,
        settings: SubscriptionSettings,
    ) -> Result<(), SubscriptionError> {
        self.store.update(settings).await?;
        Ok(())
    }

    fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

/// Message shown to the subscriber when an attempt fails.
///
/// API problem details are surfaced verbatim, matching what MailChimp would
/// tell the subscriber (duplicate member, fake address, and so on). Local
/// and transport problems collapse to a generic message; operators get the
/// specifics from the log.
fn user_message(err: &SubscriptionError) -> String {
    match err {
        SubscriptionError::Mailchimp(MailchimpError::Api { detail, .. }) => detail.clone(),
        SubscriptionError::MissingEmail { .. } => MISSING_EMAIL_MESSAGE.to_string(),
        _ => UNAVAILABLE_MESSAGE.to_string(),
    }
}
