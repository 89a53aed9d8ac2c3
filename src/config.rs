use std::env;
use std::path::PathBuf;
use thiserror::Error;

/// Errors encountered while loading configuration from environment variables.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Environment variable contained a value that could not be parsed.
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(String),
}

/// Runtime configuration for the Mailsub gateway.
///
/// Everything here is process-level wiring. The MailChimp credentials and
/// form mappings live in the [`crate::settings`] store, which administrators
/// edit at runtime through the HTTP surface.
#[derive(Debug)]
pub struct Config {
    /// Location of the JSON settings file.
    pub settings_path: PathBuf,
    /// Optional override for the HTTP server port.
    pub server_port: Option<u16>,
    /// Optional override for the MailChimp API endpoint.
    ///
    /// When unset, the endpoint is derived from the API key's datacenter
    /// suffix. Setting this is intended for proxies and test harnesses.
    pub api_endpoint: Option<String>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self {
            settings_path: load_env_optional("SETTINGS_PATH")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("settings.json")),
            server_port: load_env_optional("SERVER_PORT")
                .map(|value| {
                    value
                        .parse()
                        .map_err(|_| ConfigError::InvalidValue("SERVER_PORT".into()))
                })
                .transpose()?,
            api_endpoint: load_env_optional("MAILCHIMP_ENDPOINT"),
        })
    }
}

fn load_env_optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    // Process env is shared across the test binary, so each test uses its
    // own variable names via the private loader rather than Config::from_env.
    #[test]
    fn optional_loader_filters_blank_values() {
        // SAFETY: Tests run in a single process and only touch test-scoped keys.
        unsafe { env::set_var("MAILSUB_TEST_BLANK", "   ") };
        assert_eq!(load_env_optional("MAILSUB_TEST_BLANK"), None);

        // SAFETY: As above.
        unsafe { env::set_var("MAILSUB_TEST_SET", "value") };
        assert_eq!(load_env_optional("MAILSUB_TEST_SET"), Some("value".into()));

        assert_eq!(load_env_optional("MAILSUB_TEST_UNSET"), None);
    }
}
