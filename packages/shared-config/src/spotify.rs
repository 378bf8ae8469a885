//! Spotify Web API configuration types

use std::fmt;

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};

/// Production Web API endpoint
pub const DEFAULT_API_URL: &str = "https://api.spotify.com/v1";

/// Production accounts (authorization) endpoint
pub const DEFAULT_ACCOUNTS_URL: &str = "https://accounts.spotify.com";

/// Spotify application credentials and endpoint settings
#[derive(Clone)]
pub struct SpotifyConfig {
    /// OAuth client ID of the registered application
    pub client_id: String,

    /// OAuth client secret of the registered application
    pub client_secret: String,

    /// Redirect URI registered in the developer dashboard
    pub redirect_uri: String,

    /// Web API base URL
    pub api_url: String,

    /// Accounts service base URL
    pub accounts_url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,

    /// Maximum attempts per request before giving up on transient failures
    pub max_retries: u32,
}

impl fmt::Debug for SpotifyConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpotifyConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"[REDACTED]")
            .field("redirect_uri", &self.redirect_uri)
            .field("api_url", &self.api_url)
            .field("accounts_url", &self.accounts_url)
            .field("timeout_secs", &self.timeout_secs)
            .field("max_retries", &self.max_retries)
            .finish()
    }
}

impl SpotifyConfig {
    /// Load Spotify configuration from environment variables
    ///
    /// Credentials default to empty strings; the API server decides whether
    /// that is acceptable for the current environment.
    pub fn from_env() -> ConfigResult<Self> {
        let config = Self {
            client_id: get_env_or_default("SPOTIFY_CLIENT_ID", ""),
            client_secret: get_env_or_default("SPOTIFY_CLIENT_SECRET", ""),
            redirect_uri: get_env_or_default(
                "SPOTIFY_REDIRECT_URI",
                "http://127.0.0.1:8080/auth/callback",
            ),
            api_url: get_env_or_default("SPOTIFY_API_URL", DEFAULT_API_URL),
            accounts_url: get_env_or_default("SPOTIFY_ACCOUNTS_URL", DEFAULT_ACCOUNTS_URL),
            timeout_secs: parse_env("SPOTIFY_TIMEOUT", 15)?,
            max_retries: parse_env("SPOTIFY_MAX_RETRIES", 4)?,
        };

        for (name, value) in [
            ("SPOTIFY_REDIRECT_URI", &config.redirect_uri),
            ("SPOTIFY_API_URL", &config.api_url),
            ("SPOTIFY_ACCOUNTS_URL", &config.accounts_url),
        ] {
            if !(value.starts_with("http://") || value.starts_with("https://")) {
                return Err(ConfigError::InvalidUrl(
                    name.to_string(),
                    format!("expected an http(s) URL, got '{}'", value),
                ));
            }
        }

        Ok(config)
    }

    /// Create a configuration pointing both API and accounts endpoints at a
    /// single base URL (useful for testing against a mock server)
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            client_id: "test-client-id".to_string(),
            client_secret: "test-client-secret".to_string(),
            redirect_uri: "http://127.0.0.1:8080/auth/callback".to_string(),
            api_url: format!("{}/v1", base_url.trim_end_matches('/')),
            accounts_url: base_url,
            timeout_secs: 5,
            max_retries: 3,
        }
    }

    /// Check if application credentials are present
    pub fn has_credentials(&self) -> bool {
        !self.client_id.trim().is_empty() && !self.client_secret.trim().is_empty()
    }

    /// Get the full URL of a Web API endpoint
    pub fn api_endpoint(&self, path: &str) -> String {
        let base = self.api_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }

    /// Get the full URL of an accounts service endpoint
    pub fn accounts_endpoint(&self, path: &str) -> String {
        let base = self.accounts_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{}/{}", base, path)
    }
}

impl Default for SpotifyConfig {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            redirect_uri: "http://127.0.0.1:8080/auth/callback".to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            accounts_url: DEFAULT_ACCOUNTS_URL.to_string(),
            timeout_secs: 15,
            max_retries: 4,
        }
    }
}
