//! Authorization-code flow helpers for the Spotify accounts service

use url::Url;
use tracing::{debug, instrument};

use crate::client::SpotifyClient;
use crate::error::{SpotifyError, SpotifyResult};
use crate::models::TokenGrant;

/// Scopes needed to read saved shows, see playback progress and rewrite playlists
pub const SCOPES: &[&str] = &[
    "user-library-read",
    "user-read-playback-position",
    "playlist-read-private",
    "playlist-modify-public",
    "playlist-modify-private",
];

/// Accounts-service operations of the authorization-code flow
///
/// Shares the HTTP client, configuration and retry policy of the
/// [`SpotifyClient`] it is created from.
#[derive(Debug, Clone)]
pub struct SpotifyAuth {
    client: SpotifyClient,
}

impl SpotifyAuth {
    /// Create an accounts helper backed by an existing client
    pub fn new(client: &SpotifyClient) -> Self {
        Self {
            client: client.clone(),
        }
    }

    /// Build the URL the user is sent to in order to grant access
    ///
    /// # Errors
    /// Returns `SpotifyError::InvalidInput` if the accounts URL is malformed
    pub fn authorize_url(&self, state: &str) -> SpotifyResult<String> {
        let config = self.client.config();
        let scope = SCOPES.join(" ");
        let url = Url::parse_with_params(
            &config.accounts_endpoint("authorize"),
            &[
                ("client_id", config.client_id.as_str()),
                ("response_type", "code"),
                ("redirect_uri", config.redirect_uri.as_str()),
                ("scope", scope.as_str()),
                ("state", state),
                ("show_dialog", "true"),
            ],
        )
        .map_err(|e| SpotifyError::InvalidInput(format!("invalid accounts URL: {}", e)))?;

        Ok(url.into())
    }

    /// Exchange an authorization code for tokens
    ///
    /// # Errors
    /// - `SpotifyError::InvalidInput` - If the code is empty
    /// - `SpotifyError::Api` - If the accounts service rejects the code
    #[instrument(skip(self, code))]
    pub async fn exchange_code(&self, code: &str) -> SpotifyResult<TokenGrant> {
        let code = code.trim();
        if code.is_empty() {
            return Err(SpotifyError::InvalidInput(
                "authorization code cannot be empty".to_string(),
            ));
        }

        let config = self.client.config();
        let url = config.accounts_endpoint("api/token");

        let text = self
            .client
            .retry_policy()
            .run(|| async {
                let response = self
                    .client
                    .http_client()
                    .post(&url)
                    .basic_auth(&config.client_id, Some(&config.client_secret))
                    .form(&[
                        ("grant_type", "authorization_code"),
                        ("code", code),
                        ("redirect_uri", config.redirect_uri.as_str()),
                    ])
                    .send()
                    .await
                    .map_err(SpotifyClient::map_send_error)?;
                SpotifyClient::read_response(response).await
            })
            .await?;

        let grant: TokenGrant = serde_json::from_str(&text)?;
        debug!(expires_in = grant.expires_in, "Exchanged authorization code");
        Ok(grant)
    }
}
