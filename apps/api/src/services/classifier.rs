//! Splits fetched episodes into new arrivals, backlog and exclusions

use std::collections::BTreeSet;

use chrono::{DateTime, Duration, NaiveTime, Utc};
use podqueue_shared_config::CurationConfig;
use podqueue_spotify_client::Episode;
use serde::Serialize;

/// Why an episode is kept out of the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExclusionReason {
    /// Spotify reports it as fully played
    Played,
    /// Surfaced by an earlier scan
    AlreadyQueued,
    /// Title matches a blocklist keyword
    Blocklisted,
    /// Backlog episode below the minimum duration
    TooShort,
}

/// Filtering rules applied during classification
#[derive(Debug, Clone, Default)]
pub struct ClassificationRules {
    pub min_backlog_duration_secs: u64,
    /// Lowercased title keywords
    pub blocklist: Vec<String>,
}

impl ClassificationRules {
    pub fn from_config(config: &CurationConfig) -> Self {
        Self {
            min_backlog_duration_secs: config.min_backlog_duration_secs,
            blocklist: config
                .blocklist
                .iter()
                .map(|keyword| keyword.to_lowercase())
                .filter(|keyword| !keyword.is_empty())
                .collect(),
        }
    }

    fn is_blocklisted(&self, title: &str) -> bool {
        let title = title.to_lowercase();
        self.blocklist.iter().any(|keyword| title.contains(keyword))
    }
}

/// Result of classifying a catalog
///
/// Every input episode lands in exactly one of the three buckets.
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Released after the watermark, oldest first
    pub new_episodes: Vec<Episode>,
    /// Eligible older episodes, in input order
    pub backlog: Vec<Episode>,
    pub excluded: Vec<(Episode, ExclusionReason)>,
}

impl Classification {
    /// Total number of classified episodes
    pub fn len(&self) -> usize {
        self.new_episodes.len() + self.backlog.len() + self.excluded.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Watermark to commit for a scan started at `scan_started`
///
/// Release dates carry day precision and map to midnight UTC, so the mark
/// sits one second before the scan's UTC day. Episodes released later that
/// same day still count as new on the next scan.
pub fn watermark_for(scan_started: DateTime<Utc>) -> DateTime<Utc> {
    scan_started.date_naive().and_time(NaiveTime::default()).and_utc() - Duration::seconds(1)
}

/// Partition episodes around the watermark
///
/// An episode released exactly at the watermark is backlog. Without a
/// watermark every eligible episode is backlog.
pub fn classify(
    episodes: Vec<Episode>,
    watermark: Option<DateTime<Utc>>,
    queued: &BTreeSet<String>,
    rules: &ClassificationRules,
) -> Classification {
    let mut result = Classification::default();

    for episode in episodes {
        let reason = if episode.played {
            Some(ExclusionReason::Played)
        } else if queued.contains(&episode.id) {
            Some(ExclusionReason::AlreadyQueued)
        } else if rules.is_blocklisted(&episode.name) {
            Some(ExclusionReason::Blocklisted)
        } else {
            None
        };

        if let Some(reason) = reason {
            result.excluded.push((episode, reason));
            continue;
        }

        match watermark {
            Some(mark) if episode.released_at > mark => result.new_episodes.push(episode),
            _ if episode.duration_secs < rules.min_backlog_duration_secs => {
                result.excluded.push((episode, ExclusionReason::TooShort))
            }
            _ => result.backlog.push(episode),
        }
    }

    result
        .new_episodes
        .sort_by(|a, b| a.released_at.cmp(&b.released_at).then_with(|| a.id.cmp(&b.id)));

    tracing::debug!(
        new = result.new_episodes.len(),
        backlog = result.backlog.len(),
        excluded = result.excluded.len(),
        "Classified episodes"
    );
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rstest::rstest;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn episode(id: &str, released_at: DateTime<Utc>, duration_secs: u64) -> Episode {
        Episode {
            id: id.to_string(),
            show_id: "show".to_string(),
            name: format!("Episode {}", id),
            released_at,
            duration_secs,
            played: false,
        }
    }

    fn ids(episodes: &[Episode]) -> Vec<&str> {
        episodes.iter().map(|e| e.id.as_str()).collect()
    }

    #[test]
    fn test_first_run_puts_everything_in_backlog() {
        let episodes = vec![episode("1", t0(), 600), episode("2", t0() + Duration::days(1), 600)];
        let result = classify(episodes, None, &BTreeSet::new(), &ClassificationRules::default());

        assert!(result.new_episodes.is_empty());
        assert_eq!(ids(&result.backlog), vec!["1", "2"]);
    }

    #[rstest]
    #[case::at_watermark(0, false)]
    #[case::one_second_after(1, true)]
    #[case::one_second_before(-1, false)]
    fn test_watermark_boundary(#[case] offset_secs: i64, #[case] is_new: bool) {
        let mark = t0();
        let episodes = vec![episode("x", mark + Duration::seconds(offset_secs), 600)];
        let result = classify(episodes, Some(mark), &BTreeSet::new(), &ClassificationRules::default());

        assert_eq!(result.new_episodes.len(), usize::from(is_new));
        assert_eq!(result.backlog.len(), usize::from(!is_new));
    }

    #[test]
    fn test_watermark_precedes_scan_day() {
        let started = Utc.with_ymd_and_hms(2024, 6, 2, 10, 30, 0).unwrap();
        let mark = watermark_for(started);
        assert_eq!(mark, Utc.with_ymd_and_hms(2024, 6, 1, 23, 59, 59).unwrap());

        // Published on the scan day after the scan ran
        let same_day = episode("late", Utc.with_ymd_and_hms(2024, 6, 2, 0, 0, 0).unwrap(), 600);
        let previous_day = episode("old", Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap(), 600);
        let result = classify(
            vec![same_day, previous_day],
            Some(mark),
            &BTreeSet::new(),
            &ClassificationRules::default(),
        );

        assert_eq!(ids(&result.new_episodes), vec!["late"]);
        assert_eq!(ids(&result.backlog), vec!["old"]);
    }

    #[test]
    fn test_new_episodes_sorted_by_release_then_id() {
        let mark = t0();
        let episodes = vec![
            episode("c", mark + Duration::days(2), 100),
            episode("b", mark + Duration::days(1), 900),
            episode("a", mark + Duration::days(1), 300),
        ];
        let result = classify(episodes, Some(mark), &BTreeSet::new(), &ClassificationRules::default());
        assert_eq!(ids(&result.new_episodes), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_exclusion_reasons() {
        let mark = t0();
        let mut played = episode("played", mark + Duration::days(1), 600);
        played.played = true;
        let mut trailer = episode("trailer", mark - Duration::days(1), 600);
        trailer.name = "Season 2 Trailer".to_string();
        let queued_ep = episode("queued", mark - Duration::days(3), 600);
        let short = episode("short", mark - Duration::days(2), 30);
        let short_new = episode("short_new", mark + Duration::days(1), 30);

        let queued: BTreeSet<String> = ["queued".to_string()].into_iter().collect();
        let rules = ClassificationRules {
            min_backlog_duration_secs: 60,
            blocklist: vec!["trailer".to_string()],
        };
        let result = classify(
            vec![played, trailer, queued_ep, short, short_new],
            Some(mark),
            &queued,
            &rules,
        );

        let reasons: Vec<(&str, ExclusionReason)> = result
            .excluded
            .iter()
            .map(|(e, r)| (e.id.as_str(), *r))
            .collect();
        assert_eq!(
            reasons,
            vec![
                ("played", ExclusionReason::Played),
                ("trailer", ExclusionReason::Blocklisted),
                ("queued", ExclusionReason::AlreadyQueued),
                ("short", ExclusionReason::TooShort),
            ]
        );
        // Minimum duration does not apply to new arrivals
        assert_eq!(ids(&result.new_episodes), vec!["short_new"]);
        assert!(result.backlog.is_empty());
    }

    #[test]
    fn test_partition_is_exact() {
        let mark = t0();
        let episodes: Vec<Episode> = (0..40)
            .map(|i| {
                let mut e = episode(&format!("e{}", i), mark + Duration::hours(i - 20), (i as u64) * 45);
                e.played = i % 7 == 0;
                if i % 5 == 0 {
                    e.name = format!("Bonus: extra {}", i);
                }
                e
            })
            .collect();
        let queued: BTreeSet<String> = ["e3", "e11", "e33"].iter().map(|s| s.to_string()).collect();
        let rules = ClassificationRules {
            min_backlog_duration_secs: 300,
            blocklist: vec!["bonus:".to_string()],
        };

        let result = classify(episodes.clone(), Some(mark), &queued, &rules);

        assert_eq!(result.len(), episodes.len());
        let mut seen: Vec<&str> = ids(&result.new_episodes);
        seen.extend(ids(&result.backlog));
        seen.extend(result.excluded.iter().map(|(e, _)| e.id.as_str()));
        seen.sort_unstable();
        let mut expected: Vec<&str> = ids(&episodes);
        expected.sort_unstable();
        assert_eq!(seen, expected);
    }

    #[test]
    fn test_rules_from_config_lowercase_keywords() {
        let config = CurationConfig {
            blocklist: vec!["PREVIEW".to_string(), String::new()],
            ..CurationConfig::default()
        };
        let rules = ClassificationRules::from_config(&config);
        assert_eq!(rules.blocklist, vec!["preview".to_string()]);
        assert!(rules.is_blocklisted("Series Preview"));
    }
}
