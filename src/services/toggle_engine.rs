// EngagementToggleEngine - like/dislike transitions with mutual exclusion and counter upkeep
//
// Every transition runs in one transaction that first locks the target tuit,
// so concurrent toggles on the same tuit are applied one after another.

use serde::Serialize;
use std::sync::Arc;
use tracing::{info, warn};

use crate::core::{EntityId, Relationship, RelationshipKind, StatsUpdate, TuitStats};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, DatabaseTransaction};
use crate::services::counter_projection::{tuit_not_found, CounterProjection};
use crate::services::relationship_store::RelationshipStore;

/// Result of a reaction change, returned to the HTTP caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToggleOutcome {
    pub kind: RelationshipKind,
    /// Whether the actor holds the reaction after the call.
    pub active: bool,
    pub stats: TuitStats,
}

#[derive(Clone)]
pub struct EngagementToggleEngine {
    db: Arc<dyn DatabaseInterface>,
    relationships: RelationshipStore,
    counters: CounterProjection,
}

impl EngagementToggleEngine {
    pub fn new(
        db: Arc<dyn DatabaseInterface>,
        relationships: RelationshipStore,
        counters: CounterProjection,
    ) -> Self {
        Self {
            db,
            relationships,
            counters,
        }
    }

    pub async fn toggle_like(&self, actor: EntityId, target: EntityId) -> AppResult<ToggleOutcome> {
        self.run(RelationshipKind::Like, actor, target, None).await
    }

    pub async fn toggle_dislike(
        &self,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<ToggleOutcome> {
        self.run(RelationshipKind::Dislike, actor, target, None)
            .await
    }

    /// Idempotent form: make the reaction active or inactive regardless of its current state.
    pub async fn set_reaction(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
        active: bool,
    ) -> AppResult<ToggleOutcome> {
        self.run(kind, actor, target, Some(active)).await
    }

    async fn run(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
        desired: Option<bool>,
    ) -> AppResult<ToggleOutcome> {
        let Some(opposite) = kind.opposite() else {
            return Err(AppError::BadRequest(format!("{} is not a reaction", kind)));
        };

        let mut tx = self.db.begin_transaction().await?;
        let result = self
            .transition(&mut tx, kind, opposite, actor, target, desired)
            .await;
        match result {
            Ok(outcome) => {
                tx.commit().await?;
                info!(
                    %kind,
                    actor = actor.value(),
                    tuit = target.value(),
                    active = outcome.active,
                    likes = outcome.stats.likes,
                    dislikes = outcome.stats.dislikes,
                    "Reaction updated"
                );
                Ok(outcome)
            }
            Err(err) => {
                if let Err(rollback_err) = tx.rollback().await {
                    warn!(error = %rollback_err, "Rollback after failed reaction change failed");
                }
                warn!(
                    %kind,
                    actor = actor.value(),
                    tuit = target.value(),
                    error = %err,
                    "Reaction change failed"
                );
                Err(err)
            }
        }
    }

    async fn transition(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        opposite: RelationshipKind,
        actor: EntityId,
        target: EntityId,
        desired: Option<bool>,
    ) -> AppResult<ToggleOutcome> {
        let tuit = self
            .db
            .lock_tuit_tx(tx, target)
            .await?
            .ok_or_else(|| tuit_not_found(target))?;

        let had_reaction = self
            .relationships
            .find_one_tx(tx, kind, actor, target)
            .await?
            .is_some();
        let had_opposite = self
            .relationships
            .find_one_tx(tx, opposite, actor, target)
            .await?
            .is_some();
        let count = self.relationships.count_tx(tx, kind, target).await?;
        let opposite_count = self.relationships.count_tx(tx, opposite, target).await?;

        let active = desired.unwrap_or(!had_reaction);
        let mut update = StatsUpdate::default();

        if active {
            if !had_reaction {
                self.relationships
                    .insert_unique_tx(tx, &Relationship::new(kind, actor, target))
                    .await?;
                set_count(&mut update, kind, count + 1);
            }
            if had_opposite {
                self.relationships
                    .delete_tx(tx, opposite, actor, target)
                    .await?;
                set_count(&mut update, opposite, opposite_count.saturating_sub(1));
            }
        } else if had_reaction {
            self.relationships.delete_tx(tx, kind, actor, target).await?;
            set_count(&mut update, kind, count.saturating_sub(1));
        }

        let stats = if update.is_empty() {
            tuit.stats
        } else {
            self.counters
                .recompute_and_store_tx(tx, target, &update)
                .await?
        };

        Ok(ToggleOutcome {
            kind,
            active,
            stats,
        })
    }
}

fn set_count(update: &mut StatsUpdate, kind: RelationshipKind, value: u64) {
    match kind {
        RelationshipKind::Like => update.likes = Some(value),
        RelationshipKind::Dislike => update.dislikes = Some(value),
        RelationshipKind::Follow | RelationshipKind::Bookmark => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::NewTuit;
    use crate::infrastructure::SqliteDatabase;

    const LIKE: RelationshipKind = RelationshipKind::Like;
    const DISLIKE: RelationshipKind = RelationshipKind::Dislike;

    struct Fixture {
        db: Arc<dyn DatabaseInterface>,
        engine: EngagementToggleEngine,
        store: RelationshipStore,
        tuit: EntityId,
    }

    impl Fixture {
        async fn stats(&self) -> TuitStats {
            self.db.get_tuit(self.tuit).await.unwrap().unwrap().stats
        }

        async fn holds(&self, kind: RelationshipKind, actor: EntityId) -> bool {
            let found = self.store.find_one(kind, actor, self.tuit).await;
            found.unwrap().is_some()
        }

        async fn rows(&self, kind: RelationshipKind) -> u64 {
            self.store.count(kind, self.tuit).await.unwrap()
        }
    }

    async fn fixture() -> Fixture {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let db: Arc<dyn DatabaseInterface> = Arc::new(db);
        let new_tuit = NewTuit {
            tuit: "toggle me".into(),
            posted_on: None,
        };
        let tuit = db.create_tuit(EntityId(900), EntityId(1), &new_tuit).await;
        let store = RelationshipStore::new(db.clone());
        let counters = CounterProjection::new(db.clone());
        let engine = EngagementToggleEngine::new(db.clone(), store.clone(), counters);
        Fixture {
            db,
            engine,
            store,
            tuit: tuit.unwrap().id,
        }
    }

    #[tokio::test]
    async fn test_first_like_is_pure_increment() {
        let f = fixture().await;
        let outcome = f.engine.toggle_like(EntityId(2), f.tuit).await.unwrap();

        assert!(outcome.active);
        assert_eq!(outcome.stats.likes, 1);
        assert_eq!(outcome.stats.dislikes, 0);
        assert_eq!(f.stats().await, outcome.stats);
    }

    #[tokio::test]
    async fn test_toggle_round_trip_restores_state() {
        let f = fixture().await;
        f.engine.toggle_like(EntityId(3), f.tuit).await.unwrap();
        let before = f.stats().await;

        f.engine.toggle_like(EntityId(2), f.tuit).await.unwrap();
        let outcome = f.engine.toggle_like(EntityId(2), f.tuit).await.unwrap();

        assert!(!outcome.active);
        assert_eq!(f.stats().await, before);
        assert!(!f.holds(LIKE, EntityId(2)).await);
    }

    #[tokio::test]
    async fn test_like_replaces_dislike() {
        let f = fixture().await;
        // 5 likes and 3 dislikes, one of the dislikes belonging to the actor.
        for user in 10..15 {
            f.engine.toggle_like(EntityId(user), f.tuit).await.unwrap();
        }
        for user in [2, 20, 21] {
            f.engine
                .toggle_dislike(EntityId(user), f.tuit)
                .await
                .unwrap();
        }
        assert_eq!(f.stats().await.likes, 5);
        assert_eq!(f.stats().await.dislikes, 3);

        let outcome = f.engine.toggle_like(EntityId(2), f.tuit).await.unwrap();
        assert_eq!(outcome.stats.likes, 6);
        assert_eq!(outcome.stats.dislikes, 2);
        assert!(!f.holds(DISLIKE, EntityId(2)).await);
    }

    #[tokio::test]
    async fn test_dislike_replaces_like() {
        let f = fixture().await;
        f.engine.toggle_like(EntityId(2), f.tuit).await.unwrap();
        let outcome = f.engine.toggle_dislike(EntityId(2), f.tuit).await.unwrap();

        assert!(outcome.active);
        assert_eq!(outcome.stats.likes, 0);
        assert_eq!(outcome.stats.dislikes, 1);
        assert!(!f.holds(LIKE, EntityId(2)).await);
    }

    #[tokio::test]
    async fn test_alternating_toggles_keep_exclusion_and_non_negative_counts() {
        let f = fixture().await;
        let actor = EntityId(2);
        for step in 0..12 {
            if step % 3 == 0 {
                f.engine.toggle_dislike(actor, f.tuit).await.unwrap();
            } else {
                f.engine.toggle_like(actor, f.tuit).await.unwrap();
            }

            let liked = f.holds(LIKE, actor).await;
            let disliked = f.holds(DISLIKE, actor).await;
            assert!(!(liked && disliked));
            let current = f.stats().await;
            assert_eq!(current.likes, f.rows(LIKE).await);
            assert_eq!(current.dislikes, f.rows(DISLIKE).await);
        }
    }

    #[tokio::test]
    async fn test_missing_tuit_writes_nothing() {
        let f = fixture().await;
        let result = f.engine.toggle_like(EntityId(2), EntityId(404)).await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
        let likes = f.store.find_all_by_actor(LIKE, EntityId(2)).await;
        assert!(likes.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_removal_on_missing_tuit_is_not_found() {
        let f = fixture().await;
        let result = f
            .engine
            .set_reaction(DISLIKE, EntityId(2), EntityId(404), false)
            .await;

        assert!(matches!(result, Err(AppError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_set_reaction_is_idempotent() {
        let f = fixture().await;
        for _ in 0..3 {
            let outcome = f
                .engine
                .set_reaction(LIKE, EntityId(2), f.tuit, true)
                .await
                .unwrap();
            assert!(outcome.active);
            assert_eq!(outcome.stats.likes, 1);
        }
        for _ in 0..2 {
            let outcome = f
                .engine
                .set_reaction(LIKE, EntityId(2), f.tuit, false)
                .await
                .unwrap();
            assert!(!outcome.active);
            assert_eq!(outcome.stats.likes, 0);
        }
    }

    #[tokio::test]
    async fn test_follow_is_not_a_reaction() {
        let f = fixture().await;
        let result = f
            .engine
            .set_reaction(RelationshipKind::Follow, EntityId(2), f.tuit, true)
            .await;
        assert!(matches!(result, Err(AppError::BadRequest(_))));
    }

    #[tokio::test]
    async fn test_reset_then_toggle_resyncs_changed_field() {
        let f = fixture().await;
        f.engine.toggle_like(EntityId(2), f.tuit).await.unwrap();
        f.engine.toggle_like(EntityId(3), f.tuit).await.unwrap();
        let counters = CounterProjection::new(f.db.clone());
        counters.reset_all(f.tuit).await.unwrap();
        assert_eq!(f.stats().await.likes, 0);

        let outcome = f.engine.toggle_like(EntityId(4), f.tuit).await.unwrap();
        assert_eq!(outcome.stats.likes, 3);
    }

    #[tokio::test]
    async fn test_concurrent_toggles_match_relationship_rows() {
        let f = fixture().await;
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let engine = f.engine.clone();
                let tuit = f.tuit;
                tokio::spawn(async move {
                    let actor = EntityId(2 + (i % 2));
                    if i % 4 == 0 {
                        engine.toggle_dislike(actor, tuit).await
                    } else {
                        engine.toggle_like(actor, tuit).await
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        let current = f.stats().await;
        assert_eq!(current.likes, f.rows(LIKE).await);
        assert_eq!(current.dislikes, f.rows(DISLIKE).await);
        assert!(current.likes <= 2);
    }
}
