//! Persistent subscription settings.
//!
//! Administrators edit these values through the HTTP surface; every
//! subscription attempt re-reads them, so credential or mapping changes take
//! effect without a restart. The backing store is a single JSON file whose
//! keys mirror the settings record one to one.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;

/// Errors raised while loading or persisting the settings file.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Settings file exists but could not be read.
    #[error("Failed to read settings file {path}: {source}")]
    Read {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Settings file could not be written.
    #[error("Failed to write settings file {path}: {source}")]
    Write {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying filesystem error.
        #[source]
        source: std::io::Error,
    },
    /// Settings file contents were not valid JSON for the settings record.
    #[error("Settings file {path} is malformed: {source}")]
    Malformed {
        /// Path of the settings file.
        path: PathBuf,
        /// Underlying serde error.
        #[source]
        source: serde_json::Error,
    },
}

/// Lifecycle state assigned to newly upserted list members.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriberStatus {
    /// Member receives campaigns immediately.
    Subscribed,
    /// Member is present on the list but opted out.
    Unsubscribed,
    /// Address hard-bounced and was removed by MailChimp.
    Cleaned,
    /// Member must confirm via the double-opt-in email.
    Pending,
}

impl Display for SubscriberStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Subscribed => "subscribed",
            Self::Unsubscribed => "unsubscribed",
            Self::Cleaned => "cleaned",
            Self::Pending => "pending",
        })
    }
}

/// The editable settings record.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubscriptionSettings {
    /// MailChimp API key, `<key>-<datacenter>`.
    #[serde(default)]
    pub api_key: String,
    /// Target audience (list) identifier.
    #[serde(default)]
    pub list_id: String,
    /// Default status assigned to new subscribers.
    #[serde(default = "default_status")]
    pub status: SubscriberStatus,
    /// Opt-in label rendered next to the subscribe checkbox.
    #[serde(default = "default_text")]
    pub text: String,
    /// Enabled-form mapping lines, one form per entry.
    ///
    /// Format: `FORM_ID|EMAIL:email_field|TAG:type:field,...`; see
    /// [`crate::subscription::mapping`] for the full grammar.
    #[serde(default)]
    pub form_ids: Vec<String>,
    /// Optional interest-category id users may opt into.
    #[serde(default)]
    pub interest_group: Option<String>,
}

fn default_status() -> SubscriberStatus {
    SubscriberStatus::Pending
}

fn default_text() -> String {
    "Subscribe to our newsletter".to_string()
}

impl Default for SubscriptionSettings {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            list_id: String::new(),
            status: default_status(),
            text: default_text(),
            form_ids: Vec::new(),
            interest_group: None,
        }
    }
}

/// File-backed settings store shared by the HTTP surface and the gateway.
#[derive(Debug)]
pub struct SettingsStore {
    path: PathBuf,
    current: RwLock<SubscriptionSettings>,
}

impl SettingsStore {
    /// Open the store at `path`, loading the current settings.
    ///
    /// A missing file yields defaults; nothing is written until the first
    /// [`SettingsStore::update`].
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, SettingsError> {
        let path = path.into();
        let current = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| SettingsError::Malformed {
                path: path.clone(),
                source,
            })?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No settings file yet, starting from defaults");
                SubscriptionSettings::default()
            }
            Err(source) => {
                return Err(SettingsError::Read {
                    path: path.clone(),
                    source,
                });
            }
        };

        Ok(Self {
            path,
            current: RwLock::new(current),
        })
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Snapshot of the live settings.
    pub async fn current(&self) -> SubscriptionSettings {
        self.current.read().await.clone()
    }

    /// Persist `settings` to disk, then swap the in-memory copy.
    ///
    /// The in-memory record is only replaced after a successful write, so a
    /// failed save leaves the previous settings in effect.
    pub async fn update(&self, settings: SubscriptionSettings) -> Result<(), SettingsError> {
        let raw = serde_json::to_string_pretty(&settings).expect("settings record serializes");
        let mut guard = self.current.write().await;
        fs::write(&self.path, raw).map_err(|source| SettingsError::Write {
            path: self.path.clone(),
            source,
        })?;
        *guard = settings;
        tracing::info!(path = %self.path.display(), "Subscription settings saved");
        Ok(())
    }
}
