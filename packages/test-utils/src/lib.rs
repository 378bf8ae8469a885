//! Shared test utilities for the Podqueue workspace
//!
//! This crate provides a mock Spotify Web API so that client, pipeline and
//! route tests run without network access.
//!
//! # Mock Services
//!
//! - [`MockSpotifyServer`] - Mock Web API and accounts service
//!
//! # Example
//!
//! ```rust,ignore
//! use podqueue_test_utils::{EpisodeFixture, MockSpotifyServer, ShowFixture};
//!
//! #[tokio::test]
//! async fn test_with_mocks() {
//!     let spotify = MockSpotifyServer::start().await;
//!     spotify.mock_saved_shows(vec![ShowFixture::new("show1", "Daily")]).await;
//!
//!     // Use SpotifyConfig::with_base_url(spotify.url()) to configure your client
//! }
//! ```

mod spotify;

pub use spotify::{EpisodeFixture, MockSpotifyServer, PlaylistWrite, ShowFixture};
