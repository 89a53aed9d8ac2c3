//! HTTP client wrapper for the MailChimp v3 API.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::mailchimp::types::{
    Interest, InterestCategoryResponse, InterestListResponse, MailchimpError, MemberUpsert,
    Resource,
};
use crate::settings::{SubscriberStatus, SubscriptionSettings};

/// Derive the API endpoint from the key's datacenter suffix.
///
/// MailChimp keys look like `<hex>-<datacenter>`; the datacenter names the
/// host the account lives on. Keys without the suffix are rejected here so a
/// typo shows up in the logs instead of as a DNS failure.
pub fn endpoint_from_api_key(api_key: &str) -> Result<String, MailchimpError> {
    let (_, datacenter) = api_key
        .split_once('-')
        .ok_or(MailchimpError::InvalidApiKey)?;
    if datacenter.is_empty() {
        return Err(MailchimpError::InvalidApiKey);
    }
    Ok(format!("https://{datacenter}.api.mailchimp.com/3.0"))
}

/// Member resource id: lowercase hex MD5 of the lowercased email address.
pub fn member_id(email: &str) -> String {
    hex::encode(Md5::digest(email.to_lowercase()))
}

/// Authenticated client bound to one audience and its configured settings.
///
/// Construction is cheap; the gateway rebuilds one per attempt so that
/// settings edits apply immediately. The `reqwest::Client` handle is shared
/// so the connection pool is reused across attempts.
pub struct MailchimpClient {
    http: Client,
    endpoint: String,
    api_key: String,
    list_id: String,
    interest_group: Option<String>,
    status: SubscriberStatus,
}

impl MailchimpClient {
    /// Build a client whose endpoint is derived from the API key.
    pub fn new(http: Client, settings: &SubscriptionSettings) -> Result<Self, MailchimpError> {
        let endpoint = endpoint_from_api_key(&settings.api_key)?;
        Ok(Self::with_endpoint(http, endpoint, settings))
    }

    /// Build a client against an explicit endpoint.
    ///
    /// Used when fronting the API with a proxy, or a mock server in tests.
    pub fn with_endpoint(
        http: Client,
        endpoint: impl Into<String>,
        settings: &SubscriptionSettings,
    ) -> Self {
        let mut endpoint = endpoint.into();
        while endpoint.ends_with('/') {
            endpoint.pop();
        }
        Self {
            http,
            endpoint,
            api_key: settings.api_key.clone(),
            list_id: settings.list_id.clone(),
            interest_group: settings.interest_group.clone(),
            status: settings.status,
        }
    }

    /// Full URL for `resource`.
    pub fn resource_url(&self, resource: Resource) -> Result<String, MailchimpError> {
        let path = match resource {
            Resource::GroupTitle => format!(
                "/lists/{}/interest-categories/{}",
                self.list_id,
                self.group_id()?
            ),
            Resource::GroupData => format!(
                "/lists/{}/interest-categories/{}/interests",
                self.list_id,
                self.group_id()?
            ),
            Resource::Subscribe => format!("/lists/{}/members/", self.list_id),
        };
        Ok(format!("{}{}", self.endpoint, path))
    }

    /// Issue an authenticated GET for `resource` and parse the JSON body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        resource: Resource,
    ) -> Result<T, MailchimpError> {
        let url = self.resource_url(resource)?;
        let response = self
            .http
            .get(&url)
            .basic_auth("apikey", Some(&self.api_key))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(response.json().await?)
        } else {
            Err(api_error(response).await)
        }
    }

    /// Title of the configured interest category.
    pub async fn group_title(&self) -> Result<String, MailchimpError> {
        self.request::<InterestCategoryResponse>(Resource::GroupTitle)
            .await
            .map(|category| category.title)
    }

    /// Interest options within the configured category.
    pub async fn group_data(&self) -> Result<Vec<Interest>, MailchimpError> {
        self.request::<InterestListResponse>(Resource::GroupData)
            .await
            .map(|list| list.interests)
    }

    /// Upsert a list member keyed by [`member_id`].
    pub async fn subscribe(
        &self,
        email: &str,
        merge_fields: Map<String, Value>,
        interests: BTreeMap<String, bool>,
        language: &str,
    ) -> Result<(), MailchimpError> {
        let url = format!(
            "{}{}",
            self.resource_url(Resource::Subscribe)?,
            member_id(email)
        );
        let body = MemberUpsert {
            apikey: self.api_key.clone(),
            email_address: email.to_string(),
            status: self.status,
            language: language.to_string(),
            merge_fields,
            interests,
        };

        let response = self
            .http
            .put(&url)
            .basic_auth("apikey", Some(&self.api_key))
            .json(&body)
            .send()
            .await?;

        if response.status().is_success() {
            tracing::info!(list = %self.list_id, status = %self.status, "Member upserted");
            Ok(())
        } else {
            Err(api_error(response).await)
        }
    }

    fn group_id(&self) -> Result<&str, MailchimpError> {
        self.interest_group
            .as_deref()
            .filter(|group| !group.is_empty())
            .ok_or(MailchimpError::MissingInterestGroup)
    }
}

/// Turn a non-success response into [`MailchimpError::Api`].
///
/// MailChimp error bodies follow RFC 7807 and carry the human-readable
/// problem in `detail`; fall back to the raw body when it is absent.
async fn api_error(response: reqwest::Response) -> MailchimpError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|value| {
            value
                .get("detail")
                .and_then(Value::as_str)
                .map(str::to_string)
        })
        .unwrap_or(body);
    MailchimpError::Api { status, detail }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{Method::GET, Method::PUT, MockServer};
    use serde_json::json;

    fn settings() -> SubscriptionSettings {
        SubscriptionSettings {
            api_key: "key123-us10".into(),
            list_id: "abc123".into(),
            status: SubscriberStatus::Pending,
            interest_group: Some("grp9".into()),
            ..SubscriptionSettings::default()
        }
    }

    #[test]
    fn endpoint_derived_from_datacenter_suffix() {
        assert_eq!(
            endpoint_from_api_key("key123-us10").expect("endpoint"),
            "https://us10.api.mailchimp.com/3.0"
        );
        assert!(matches!(
            endpoint_from_api_key("keywithoutsuffix"),
            Err(MailchimpError::InvalidApiKey)
        ));
        assert!(matches!(
            endpoint_from_api_key("key123-"),
            Err(MailchimpError::InvalidApiKey)
        ));
    }

    #[test]
    fn member_id_hashes_lowercased_email() {
        assert_eq!(member_id("USER@Example.com"), member_id("user@example.com"));
        // RFC 1321 test vector: md5("abc").
        assert_eq!(member_id("ABC"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn resource_urls_follow_v3_paths() {
        let client = MailchimpClient::new(Client::new(), &settings()).expect("client");
        assert_eq!(
            client.resource_url(Resource::Subscribe).expect("url"),
            "https://us10.api.mailchimp.com/3.0/lists/abc123/members/"
        );
        assert_eq!(
            client.resource_url(Resource::GroupData).expect("url"),
            "https://us10.api.mailchimp.com/3.0/lists/abc123/interest-categories/grp9/interests"
        );
    }

    #[test]
    fn group_resources_require_configured_group() {
        let mut settings = settings();
        settings.interest_group = None;
        let client = MailchimpClient::new(Client::new(), &settings).expect("client");
        assert!(matches!(
            client.resource_url(Resource::GroupTitle),
            Err(MailchimpError::MissingInterestGroup)
        ));
        // Subscribing never needs the group.
        assert!(client.resource_url(Resource::Subscribe).is_ok());
    }

    #[tokio::test]
    async fn subscribe_puts_member_keyed_by_digest() {
        let server = MockServer::start_async().await;
        let expected_path = format!("/lists/abc123/members/{}", member_id("User@Example.com"));

        let mock = server
            .mock_async(|when, then| {
                when.method(PUT)
                    .path(expected_path.clone())
                    .json_body_partial(
                        json!({
                            "email_address": "User@Example.com",
                            "status": "pending",
                            "language": "en",
                            "merge_fields": { "FNAME": "Ada" }
                        })
                        .to_string(),
                    );
                then.status(200).json_body(json!({"id": "x"}));
            })
            .await;

        let client = MailchimpClient::with_endpoint(Client::new(), server.base_url(), &settings());
        let mut merges = Map::new();
        merges.insert("FNAME".into(), Value::String("Ada".into()));
        client
            .subscribe("User@Example.com", merges, BTreeMap::new(), "en")
            .await
            .expect("subscribe");

        mock.assert_async().await;
    }

    #[test]
    fn empty_merges_and_interests_are_omitted() {
        let body = MemberUpsert {
            apikey: "key123-us10".into(),
            email_address: "a@b.c".into(),
            status: SubscriberStatus::Pending,
            language: "en".into(),
            merge_fields: Map::new(),
            interests: BTreeMap::new(),
        };
        let encoded = serde_json::to_value(&body).expect("encode");
        assert!(encoded.get("merge_fields").is_none());
        assert!(encoded.get("interests").is_none());
        assert_eq!(encoded["status"], "pending");
    }

    #[tokio::test]
    async fn api_errors_surface_detail_field() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(PUT);
                then.status(400)
                    .json_body(json!({"title": "Invalid Resource", "detail": "Invalid Resource"}));
            })
            .await;

        let client = MailchimpClient::with_endpoint(Client::new(), server.base_url(), &settings());
        let err = client
            .subscribe("a@b.c", Map::new(), BTreeMap::new(), "en")
            .await
            .expect_err("must fail");
        match err {
            MailchimpError::Api { status, detail } => {
                assert_eq!(status.as_u16(), 400);
                assert_eq!(detail, "Invalid Resource");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn group_title_parses_category_response() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/lists/abc123/interest-categories/grp9");
                then.status(200)
                    .json_body(json!({"id": "grp9", "title": "Topics"}));
            })
            .await;

        let client = MailchimpClient::with_endpoint(Client::new(), server.base_url(), &settings());
        assert_eq!(client.group_title().await.expect("title"), "Topics");
    }
}
