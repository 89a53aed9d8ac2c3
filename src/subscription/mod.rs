//! Form-submission processing: mapping resolution, field normalization, and
//! the fail-soft subscription orchestration.

/// Enabled-forms mapping mini-language.
pub mod mapping;
/// Field normalizers (date, zip code).
pub mod normalize;
mod service;
mod types;

pub use service::{SubscriptionApi, SubscriptionService};
pub use types::{FormSubmission, InterestGroup, SubscribeOutcome, SubscriptionError};
