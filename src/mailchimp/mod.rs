//! MailChimp v3 API integration: endpoint derivation, resource URLs, and the
//! authenticated HTTP client.

mod client;
mod types;

pub use client::{MailchimpClient, endpoint_from_api_key, member_id};
pub use types::{Interest, MailchimpError, MemberUpsert, Resource};
