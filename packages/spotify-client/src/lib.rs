//! Spotify Web API client for Podqueue
//!
//! This crate provides a client for the parts of the Spotify Web API that
//! queue curation needs:
//! - Saved shows and their episodes (fully paginated)
//! - Playlist lookup, creation and full replacement
//! - The authorization-code exchange with the accounts service
//!
//! Every HTTP call runs under a bounded [`RetryPolicy`]: rate limits and
//! transient failures are retried with backoff, an expired token is not.
//!
//! # Example
//!
//! ```rust,no_run
//! use futures_util::TryStreamExt;
//! use podqueue_shared_config::SpotifyConfig;
//! use podqueue_spotify_client::SpotifyClient;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = SpotifyClient::new(&SpotifyConfig::default())?.authorized("access-token");
//!
//! for show in client.list_saved_shows().await? {
//!     let episodes: Vec<_> = client.episodes(&show.id).try_collect().await?;
//!     println!("{}: {} episodes", show.name, episodes.len());
//! }
//! # Ok(())
//! # }
//! ```

mod auth;
mod client;
mod error;
mod models;
mod retry;

pub use auth::{SpotifyAuth, SCOPES};
pub use client::{SpotifyClient, PLAYLIST_WRITE_CHUNK};
pub use error::{SpotifyError, SpotifyResult};
pub use models::{
    episode_uri, CurrentUser, Episode, Playlist, PlaylistItem, PlaylistItemKind, Show, TokenGrant,
};
pub use retry::{RetryPolicy, DEFAULT_MAX_ATTEMPTS};
