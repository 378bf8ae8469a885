//! API server configuration

use std::env;
use std::str::FromStr;

use anyhow::{bail, Context, Result};
use podqueue_shared_config::{
    CommonConfig, CurationConfig, DatabaseConfig, Environment, SpotifyConfig,
};

/// Minimum required length for SESSION_SECRET to be considered secure
const MIN_SESSION_SECRET_LENGTH: usize = 32;

/// Secret used when SESSION_SECRET is unset outside production
const DEVELOPMENT_SESSION_SECRET: &str = "development-session-secret-change-me";

/// Where scan state is persisted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StateBackend {
    #[default]
    Postgres,
    /// Process-local store; state is lost on restart
    Memory,
}

impl FromStr for StateBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Ok(Self::Postgres),
            "memory" | "in-memory" | "mem" => Ok(Self::Memory),
            other => Err(format!(
                "unknown state backend '{}', expected 'postgres' or 'memory'",
                other
            )),
        }
    }
}

impl StateBackend {
    /// Name reported by the readiness probe
    pub fn name(&self) -> &'static str {
        match self {
            Self::Postgres => "postgres",
            Self::Memory => "memory",
        }
    }
}

/// API server configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct Config {
    /// Common configuration shared with other crates
    pub common: CommonConfig,

    /// Server port (default: 8080)
    pub port: u16,

    /// HMAC secret for session and OAuth state tokens
    pub session_secret: String,

    /// Scan state persistence backend (default: postgres)
    pub state_backend: StateBackend,

    /// CORS allowed origins (optional)
    pub cors_allowed_origins: Option<Vec<String>>,
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// In production mode, this function requires:
    /// - `SESSION_SECRET`: Must be set and at least 32 characters long
    /// - `SPOTIFY_CLIENT_ID` and `SPOTIFY_CLIENT_SECRET`
    /// - `DATABASE_URL` when the state backend is postgres
    ///
    /// In development/staging mode, sensible defaults are used for convenience.
    pub fn from_env() -> Result<Self> {
        let environment = Environment::from_str(
            &env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
        )
        .unwrap_or_default();
        let is_production = environment.is_production();

        let session_secret = Self::load_session_secret(is_production)?;
        let state_backend = Self::load_state_backend()?;

        if is_production && state_backend == StateBackend::Postgres {
            Self::validate_database_url()?;
        }

        let common = CommonConfig::from_env()
            .map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))?;

        Self::validate_spotify_credentials(&common.spotify, is_production)?;

        Ok(Self {
            common,

            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .context("Invalid PORT value")?,

            session_secret,

            state_backend,

            cors_allowed_origins: env::var("CORS_ORIGINS").ok().map(|s| {
                s.split(',')
                    .map(|s| s.trim().to_string())
                    .filter(|s| !s.is_empty())
                    .collect()
            }),
        })
    }

    /// Load and validate SESSION_SECRET
    ///
    /// In production:
    /// - SESSION_SECRET must be explicitly set
    /// - Must be at least MIN_SESSION_SECRET_LENGTH characters
    ///
    /// In development: uses a default value with a warning
    fn load_session_secret(is_production: bool) -> Result<String> {
        match env::var("SESSION_SECRET") {
            Ok(secret) if !secret.is_empty() => {
                if is_production && secret.len() < MIN_SESSION_SECRET_LENGTH {
                    bail!(
                        "SESSION_SECRET must be at least {} characters in production (got {})",
                        MIN_SESSION_SECRET_LENGTH,
                        secret.len()
                    );
                }
                Ok(secret)
            }
            _ if is_production => {
                bail!(
                    "SESSION_SECRET environment variable is required in production. \
                     Please set a secure secret of at least {} characters.",
                    MIN_SESSION_SECRET_LENGTH
                );
            }
            _ => {
                tracing::warn!(
                    "SESSION_SECRET not set, using insecure default. \
                     This is only acceptable in development mode."
                );
                Ok(DEVELOPMENT_SESSION_SECRET.to_string())
            }
        }
    }

    fn load_state_backend() -> Result<StateBackend> {
        match env::var("STATE_BACKEND") {
            Ok(raw) if !raw.trim().is_empty() => {
                raw.parse().map_err(|e: String| anyhow::anyhow!(e))
            }
            _ => Ok(StateBackend::default()),
        }
    }

    /// Validate that DATABASE_URL is explicitly set
    fn validate_database_url() -> Result<()> {
        match env::var("DATABASE_URL") {
            Ok(url) if !url.is_empty() => Ok(()),
            _ => {
                bail!(
                    "DATABASE_URL environment variable is required in production. \
                     Please set your PostgreSQL connection string."
                );
            }
        }
    }

    /// Spotify credentials are mandatory in production
    fn validate_spotify_credentials(spotify: &SpotifyConfig, is_production: bool) -> Result<()> {
        if spotify.has_credentials() {
            return Ok(());
        }
        if is_production {
            bail!(
                "SPOTIFY_CLIENT_ID and SPOTIFY_CLIENT_SECRET are required in production. \
                 Register an application in the Spotify developer dashboard."
            );
        }
        tracing::warn!("Spotify credentials not set; login will fail until they are configured");
        Ok(())
    }

    /// Get database configuration
    pub fn database(&self) -> &DatabaseConfig {
        &self.common.database
    }

    /// Get Spotify application configuration
    pub fn spotify(&self) -> &SpotifyConfig {
        &self.common.spotify
    }

    /// Get curation settings
    pub fn curation(&self) -> &CurationConfig {
        &self.common.curation
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.common.environment.is_production()
    }
}
