//! Duration-band batch selection for the backlog
//!
//! Backlog episodes are grouped into bands by duration. Each scan takes the
//! next non-empty band after the one consumed last, wrapping back to the
//! shortest band after the longest.

use std::collections::BTreeMap;

use podqueue_shared_config::CurationConfig;
use podqueue_spotify_client::Episode;

/// How episode durations map to band keys
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BandLayout {
    /// Bands of equal width in seconds; key = duration / width
    FixedWidth(u64),
    /// Ascending boundaries in seconds; key = number of boundaries <= duration
    Thresholds(Vec<u64>),
}

impl Default for BandLayout {
    fn default() -> Self {
        Self::FixedWidth(60)
    }
}

impl BandLayout {
    /// Thresholds win over the fixed width when both are configured
    pub fn from_config(config: &CurationConfig) -> Self {
        match &config.band_thresholds {
            Some(thresholds) if !thresholds.is_empty() => Self::Thresholds(thresholds.clone()),
            _ => Self::FixedWidth(config.band_width_secs),
        }
    }

    /// Band key for a duration
    pub fn band_of(&self, duration_secs: u64) -> u64 {
        match self {
            Self::FixedWidth(width) => duration_secs / (*width).max(1),
            Self::Thresholds(thresholds) => {
                thresholds.iter().filter(|t| **t <= duration_secs).count() as u64
            }
        }
    }

    /// Duration range of a band as `(start, end)` seconds; `end` is exclusive
    pub fn bounds(&self, band: u64) -> (u64, Option<u64>) {
        match self {
            Self::FixedWidth(width) => {
                let width = (*width).max(1);
                let start = band.saturating_mul(width);
                (start, Some(start.saturating_add(width)))
            }
            Self::Thresholds(thresholds) => {
                let index = band as usize;
                let start = if index == 0 {
                    0
                } else {
                    thresholds.get(index - 1).copied().unwrap_or(0)
                };
                (start, thresholds.get(index).copied())
            }
        }
    }

    /// Human-readable range such as `10-25 min` or `25+ min`
    pub fn label(&self, band: u64) -> String {
        let (start, end) = self.bounds(band);
        match end {
            Some(end) => format!("{}-{}", format_duration(start), format_duration(end)),
            None => format!("{}+", format_duration(start)),
        }
    }
}

fn format_duration(secs: u64) -> String {
    if secs % 60 == 0 {
        format!("{} min", secs / 60)
    } else {
        format!("{}s", secs)
    }
}

/// Backlog episodes selected for one scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Batch {
    pub band: u64,
    /// Ordered by duration, then release, then ID
    pub episodes: Vec<Episode>,
}

impl Batch {
    pub fn episode_ids(&self) -> impl Iterator<Item = &str> {
        self.episodes.iter().map(|e| e.id.as_str())
    }
}

/// Group backlog episodes by band, bands ascending
pub fn group_bands<'a>(backlog: &'a [Episode], layout: &BandLayout) -> BTreeMap<u64, Vec<&'a Episode>> {
    let mut bands: BTreeMap<u64, Vec<&Episode>> = BTreeMap::new();
    for episode in backlog {
        bands
            .entry(layout.band_of(episode.duration_secs))
            .or_default()
            .push(episode);
    }
    bands
}

/// Select the batch following `pointer`
///
/// Returns `None` only for an empty backlog.
pub fn next_batch(backlog: &[Episode], pointer: Option<u64>, layout: &BandLayout) -> Option<Batch> {
    let bands = group_bands(backlog, layout);

    let (band, members) = match pointer {
        Some(last) => bands
            .range(last.saturating_add(1)..)
            .next()
            .filter(|_| last < u64::MAX)
            .or_else(|| bands.iter().next()),
        None => bands.iter().next(),
    }?;

    let mut episodes: Vec<Episode> = members.iter().map(|e| (*e).clone()).collect();
    episodes.sort_by(|a, b| {
        a.duration_secs
            .cmp(&b.duration_secs)
            .then_with(|| a.released_at.cmp(&b.released_at))
            .then_with(|| a.id.cmp(&b.id))
    });

    tracing::debug!(
        band = *band,
        previous = ?pointer,
        episodes = episodes.len(),
        band_count = bands.len(),
        "Selected backlog batch"
    );

    Some(Batch {
        band: *band,
        episodes,
    })
}
