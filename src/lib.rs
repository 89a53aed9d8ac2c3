#![deny(missing_docs)]

//! Core library for the Mailsub subscription gateway.

/// HTTP routing and REST handlers.
pub mod api;
/// Environment-driven configuration management.
pub mod config;
/// Structured logging and tracing setup.
pub mod logging;
/// MailChimp v3 API integration.
pub mod mailchimp;
/// Subscription metrics helpers.
pub mod metrics;
/// Persistent subscription settings store.
pub mod settings;
/// Form-submission processing and fail-soft subscription orchestration.
pub mod subscription;
