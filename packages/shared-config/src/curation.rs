//! Queue curation settings: backlog filtering and batch banding

use crate::{get_env_or_default, parse_env, ConfigError, ConfigResult};
use std::env;

/// Title keywords that mark an episode as filler rather than content
pub const DEFAULT_BLOCKLIST: &[&str] = &["trailer", "bonus:", "replay:", "announcement", "preview"];

/// Name given to playlists created by the service
pub const DEFAULT_PLAYLIST_NAME: &str = "My Smart Podcast Queue";

/// Settings that shape how episodes are classified and batched
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurationConfig {
    /// Backlog episodes shorter than this are never queued
    pub min_backlog_duration_secs: u64,

    /// Width of a duration band in seconds
    pub band_width_secs: u64,

    /// Explicit band boundaries in seconds; overrides `band_width_secs`
    pub band_thresholds: Option<Vec<u64>>,

    /// Lowercased title keywords excluded from the queue
    pub blocklist: Vec<String>,

    /// Name for playlists created through setup
    pub playlist_name: String,
}

impl CurationConfig {
    /// Load curation settings from environment variables
    pub fn from_env() -> ConfigResult<Self> {
        let band_width_secs: u64 = parse_env("BATCH_BAND_WIDTH_SECONDS", 60)?;
        if band_width_secs == 0 {
            return Err(ConfigError::InvalidValue(
                "BATCH_BAND_WIDTH_SECONDS".to_string(),
                "band width must be greater than zero".to_string(),
            ));
        }

        let band_thresholds = match env::var("BATCH_BAND_THRESHOLDS") {
            Ok(raw) if !raw.trim().is_empty() => Some(parse_thresholds(&raw)?),
            _ => None,
        };

        let blocklist = match env::var("EPISODE_BLOCKLIST") {
            Ok(raw) => raw
                .split(',')
                .map(|s| s.trim().to_lowercase())
                .filter(|s| !s.is_empty())
                .collect(),
            Err(_) => DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
        };

        Ok(Self {
            min_backlog_duration_secs: parse_env("MIN_BACKLOG_DURATION_SECONDS", 0)?,
            band_width_secs,
            band_thresholds,
            blocklist,
            playlist_name: get_env_or_default("QUEUE_PLAYLIST_NAME", DEFAULT_PLAYLIST_NAME),
        })
    }
}

impl Default for CurationConfig {
    fn default() -> Self {
        Self {
            min_backlog_duration_secs: 0,
            band_width_secs: 60,
            band_thresholds: None,
            blocklist: DEFAULT_BLOCKLIST.iter().map(|s| s.to_string()).collect(),
            playlist_name: DEFAULT_PLAYLIST_NAME.to_string(),
        }
    }
}

/// Parse a comma-separated, strictly ascending list of band boundaries
fn parse_thresholds(raw: &str) -> ConfigResult<Vec<u64>> {
    let invalid = |reason: String| ConfigError::InvalidValue("BATCH_BAND_THRESHOLDS".to_string(), reason);

    let thresholds = raw
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| s.parse::<u64>().map_err(|e| invalid(format!("'{}': {}", s, e))))
        .collect::<ConfigResult<Vec<u64>>>()?;

    if thresholds.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(invalid("thresholds must be strictly ascending".to_string()));
    }

    Ok(thresholds)
}
