//! Scan state repository
//!
//! [`ScanStateStore`] is the persistence seam of the curation pipeline.
//! [`PgScanStateRepository`] stores state in PostgreSQL and commits each scan
//! in one transaction; [`InMemoryScanStateStore`] keeps it in process memory
//! for development and tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use sqlx::types::Json;
use sqlx::PgPool;

use crate::models::{ScanCommit, ScanState, ScanStateRow};

/// Durable per-user curation state
#[async_trait]
pub trait ScanStateStore: Send + Sync {
    /// Load a user's state; users without a record get an empty state
    async fn load(&self, user_id: &str) -> Result<ScanState, sqlx::Error>;

    /// Set the target playlist and reset the band pointer
    async fn set_target_playlist(&self, user_id: &str, playlist_id: &str)
        -> Result<(), sqlx::Error>;

    /// Atomically record a successful scan
    async fn commit_scan(&self, user_id: &str, commit: &ScanCommit) -> Result<(), sqlx::Error>;

    /// Verify the backing store is reachable
    async fn health_check(&self) -> Result<(), sqlx::Error>;
}

/// Repository for scan state in PostgreSQL
#[derive(Clone)]
pub struct PgScanStateRepository {
    pool: PgPool,
}

impl PgScanStateRepository {
    /// Create a new PgScanStateRepository instance
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ScanStateStore for PgScanStateRepository {
    async fn load(&self, user_id: &str) -> Result<ScanState, sqlx::Error> {
        let row = sqlx::query_as::<_, ScanStateRow>(
            r#"
            SELECT user_id, playlist_id, watermark, band_pointer, last_scan
            FROM scan_states
            WHERE user_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(ScanState::empty(user_id));
        };

        let queued: Vec<String> = sqlx::query_scalar(
            "SELECT episode_id FROM queued_episodes WHERE user_id = $1",
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(row.into_state(queued.into_iter().collect::<BTreeSet<_>>()))
    }

    async fn set_target_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            INSERT INTO scan_states (user_id, playlist_id, band_pointer)
            VALUES ($1, $2, NULL)
            ON CONFLICT (user_id) DO UPDATE
            SET playlist_id = EXCLUDED.playlist_id,
                band_pointer = NULL,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(playlist_id)
        .execute(&self.pool)
        .await?;

        tracing::debug!(user_id = %user_id, playlist_id = %playlist_id, "Target playlist stored");
        Ok(())
    }

    async fn commit_scan(&self, user_id: &str, commit: &ScanCommit) -> Result<(), sqlx::Error> {
        let band_pointer = commit
            .band_pointer
            .map(|band| i64::try_from(band).unwrap_or(i64::MAX));

        let mut tx = self.pool.begin().await?;

        // GREATEST ignores NULL, so the first commit takes the new watermark
        sqlx::query(
            r#"
            INSERT INTO scan_states (user_id, watermark, band_pointer, last_scan)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (user_id) DO UPDATE
            SET watermark = GREATEST(scan_states.watermark, EXCLUDED.watermark),
                band_pointer = COALESCE(EXCLUDED.band_pointer, scan_states.band_pointer),
                last_scan = EXCLUDED.last_scan,
                updated_at = NOW()
            "#,
        )
        .bind(user_id)
        .bind(commit.watermark)
        .bind(band_pointer)
        .bind(Json(&commit.summary))
        .execute(&mut *tx)
        .await?;

        if !commit.queued_episode_ids.is_empty() {
            sqlx::query(
                r#"
                INSERT INTO queued_episodes (user_id, episode_id)
                SELECT $1, UNNEST($2::text[])
                ON CONFLICT (user_id, episode_id) DO NOTHING
                "#,
            )
            .bind(user_id)
            .bind(&commit.queued_episode_ids)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;

        tracing::debug!(
            user_id = %user_id,
            queued = commit.queued_episode_ids.len(),
            band_pointer = ?commit.band_pointer,
            "Scan committed"
        );
        Ok(())
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Process-local scan state store
#[derive(Clone, Default)]
pub struct InMemoryScanStateStore {
    states: Arc<DashMap<String, ScanState>>,
}

impl InMemoryScanStateStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a user's state wholesale (for seeding tests)
    pub fn insert(&self, state: ScanState) {
        self.states.insert(state.user_id.clone(), state);
    }
}

#[async_trait]
impl ScanStateStore for InMemoryScanStateStore {
    async fn load(&self, user_id: &str) -> Result<ScanState, sqlx::Error> {
        Ok(self
            .states
            .get(user_id)
            .map(|state| state.clone())
            .unwrap_or_else(|| ScanState::empty(user_id)))
    }

    async fn set_target_playlist(
        &self,
        user_id: &str,
        playlist_id: &str,
    ) -> Result<(), sqlx::Error> {
        self.states
            .entry(user_id.to_string())
            .or_insert_with(|| ScanState::empty(user_id))
            .retarget(playlist_id);
        Ok(())
    }

    async fn commit_scan(&self, user_id: &str, commit: &ScanCommit) -> Result<(), sqlx::Error> {
        // The entry guard holds the shard lock for the whole update
        self.states
            .entry(user_id.to_string())
            .or_insert_with(|| ScanState::empty(user_id))
            .apply(commit);
        Ok(())
    }

    async fn health_check(&self) -> Result<(), sqlx::Error> {
        Ok(())
    }
}
