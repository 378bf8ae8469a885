//! Writes the curated queue to the target playlist

use podqueue_spotify_client::{Episode, SpotifyClient};
use tracing::info;

use crate::services::planner::Batch;
use crate::services::scan::{ScanError, ScanResult};

/// Playlist order: new arrivals first, then the backlog batch
pub fn queue_order(new_episodes: &[Episode], batch: Option<&Batch>) -> Vec<String> {
    new_episodes
        .iter()
        .map(|e| e.id.clone())
        .chain(batch.into_iter().flat_map(|b| b.episode_ids().map(str::to_string)))
        .collect()
}

/// Replace the playlist contents with `episode_ids`
///
/// An empty list clears the playlist. An expired session surfaces as
/// `Unauthorized`; every other failure is `WriteFailed`.
pub async fn write_queue(
    client: &SpotifyClient,
    playlist_id: &str,
    episode_ids: &[String],
) -> ScanResult<()> {
    client
        .replace_playlist_items(playlist_id, episode_ids)
        .await
        .map_err(|e| {
            if e.requires_reauthentication() {
                ScanError::Unauthorized(e.to_string())
            } else {
                ScanError::WriteFailed(e.to_string())
            }
        })?;

    info!(playlist_id = %playlist_id, episodes = episode_ids.len(), "Playlist updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn episode(id: &str) -> Episode {
        Episode {
            id: id.to_string(),
            show_id: "s".to_string(),
            name: id.to_string(),
            released_at: Utc::now(),
            duration_secs: 60,
            played: false,
        }
    }

    #[test]
    fn test_new_episodes_precede_batch() {
        let batch = Batch {
            band: 1,
            episodes: vec![episode("b1"), episode("b2")],
        };
        let order = queue_order(&[episode("n1")], Some(&batch));
        assert_eq!(order, vec!["n1", "b1", "b2"]);
    }

    #[test]
    fn test_no_batch() {
        assert_eq!(queue_order(&[episode("n1")], None), vec!["n1"]);
        assert!(queue_order(&[], None).is_empty());
    }
}
