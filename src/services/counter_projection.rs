// CounterProjection - writes the denormalized stats carried on each tuit

use std::sync::Arc;
use tracing::{debug, info};

use crate::core::{EntityId, StatsUpdate, TuitStats};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, DatabaseTransaction};

#[derive(Clone)]
pub struct CounterProjection {
    db: Arc<dyn DatabaseInterface>,
}

impl CounterProjection {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    /// Store the supplied counts in one write and return the resulting stats.
    /// Fields left `None` keep their stored value.
    pub async fn recompute_and_store(
        &self,
        target: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<TuitStats> {
        let stats = self
            .db
            .write_stats(target, update)
            .await?
            .ok_or_else(|| tuit_not_found(target))?;
        debug!(tuit = target.value(), ?stats, "Stats stored");
        Ok(stats)
    }

    pub async fn recompute_and_store_tx(
        &self,
        tx: &mut DatabaseTransaction,
        target: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<TuitStats> {
        self.db
            .write_stats_tx(tx, target, update)
            .await?
            .ok_or_else(|| tuit_not_found(target))
    }

    /// Zero all four counters without touching relationship rows.
    pub async fn reset_all(&self, target: EntityId) -> AppResult<TuitStats> {
        let stats = self
            .recompute_and_store(target, &StatsUpdate::zeroed())
            .await?;
        info!(tuit = target.value(), "Stats reset");
        Ok(stats)
    }
}

pub(crate) fn tuit_not_found(id: EntityId) -> AppError {
    AppError::NotFound(format!("Tuit {} not found", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NewTuit;
    use crate::infrastructure::SqliteDatabase;

    async fn projection_with_tuit() -> (CounterProjection, Arc<dyn DatabaseInterface>, EntityId) {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let db: Arc<dyn DatabaseInterface> = Arc::new(db);
        let new_tuit = NewTuit {
            tuit: "stats".into(),
            posted_on: None,
        };
        let tuit = db.create_tuit(EntityId(50), EntityId(1), &new_tuit).await;
        (CounterProjection::new(db.clone()), db, tuit.unwrap().id)
    }

    #[tokio::test]
    async fn test_reset_zeroes_every_counter() {
        let (projection, _, tid) = projection_with_tuit().await;
        let update = StatsUpdate {
            likes: Some(5),
            dislikes: Some(3),
            replies: Some(2),
            retuits: Some(1),
        };
        projection.recompute_and_store(tid, &update).await.unwrap();

        let stats = projection.reset_all(tid).await.unwrap();
        assert_eq!(stats, TuitStats::default());
    }

    #[tokio::test]
    async fn test_missing_tuit_is_not_found() {
        let (projection, _, _) = projection_with_tuit().await;
        let result = projection.reset_all(EntityId(12345)).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_partial_update_keeps_untouched_fields() {
        let (projection, db, tid) = projection_with_tuit().await;
        let replies = StatsUpdate {
            replies: Some(7),
            ..Default::default()
        };
        let likes = StatsUpdate {
            likes: Some(1),
            ..Default::default()
        };
        projection.recompute_and_store(tid, &replies).await.unwrap();
        projection.recompute_and_store(tid, &likes).await.unwrap();

        let tuit = db.get_tuit(tid).await.unwrap().unwrap();
        assert_eq!(tuit.stats.replies, 7);
        assert_eq!(tuit.stats.likes, 1);
    }
}
