//! Walks the user's saved shows and collects every episode

use std::pin::pin;

use futures_util::{stream, Stream, StreamExt, TryStreamExt};
use podqueue_spotify_client::{Episode, Show, SpotifyClient, SpotifyError, SpotifyResult};
use tracing::{debug, info};

use crate::services::progress::ProgressHandle;

/// Episodes of one show
#[derive(Debug, Clone)]
pub struct ShowEpisodes {
    pub show: Show,
    pub episodes: Vec<Episode>,
}

/// Every episode of every saved show
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    pub shows_scanned: usize,
    pub episodes: Vec<Episode>,
}

/// Lazily fetch the episodes of each show, one show per item
pub fn show_batches<'a>(
    client: &'a SpotifyClient,
    shows: &'a [Show],
) -> impl Stream<Item = SpotifyResult<ShowEpisodes>> + 'a {
    stream::iter(shows).then(move |show| async move {
        let episodes = client.list_episodes(&show.id).await?;
        debug!(show_id = %show.id, episodes = episodes.len(), "Fetched show episodes");
        Ok::<_, SpotifyError>(ShowEpisodes {
            show: show.clone(),
            episodes,
        })
    })
}

/// Fetch the full catalog, checkpointing progress after each show
///
/// Client errors propagate unchanged; retries happen inside the client.
pub async fn fetch_catalog(
    client: &SpotifyClient,
    progress: &ProgressHandle,
) -> SpotifyResult<Catalog> {
    progress.fetching_shows();
    let shows = client.list_saved_shows().await?;
    let total = shows.len();
    progress.fetching_episodes(0, total, "");

    let mut batches = pin!(show_batches(client, &shows));
    let mut catalog = Catalog {
        shows_scanned: total,
        episodes: Vec::new(),
    };
    let mut processed = 0;

    while let Some(batch) = batches.try_next().await? {
        processed += 1;
        progress.fetching_episodes(processed, total, &batch.show.name);
        catalog.episodes.extend(batch.episodes);
    }

    info!(
        user_id = %progress.user_id(),
        shows = total,
        episodes = catalog.episodes.len(),
        "Catalog fetched"
    );
    Ok(catalog)
}
