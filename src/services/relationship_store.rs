// RelationshipStore - unique (kind, actor, target) edges for likes, dislikes, follows and bookmarks

use futures::stream::{BoxStream, TryStreamExt};
use std::sync::Arc;
use tracing::debug;

use crate::core::{EntityId, Relationship, RelationshipKind, RelationshipScope};
use crate::error::AppResult;
use crate::infrastructure::{DatabaseInterface, DatabaseTransaction};

#[derive(Clone)]
pub struct RelationshipStore {
    db: Arc<dyn DatabaseInterface>,
}

impl RelationshipStore {
    pub fn new(db: Arc<dyn DatabaseInterface>) -> Self {
        Self { db }
    }

    /// Insert the edge, or return the one already stored for the same triple.
    pub async fn create(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Relationship> {
        let rel = Relationship::new(kind, actor, target);
        if self.db.insert_relationship(&rel).await? {
            debug!(
                %kind,
                actor = actor.value(),
                target = target.value(),
                "Relationship created"
            );
            return Ok(rel);
        }
        Ok(self.find_one(kind, actor, target).await?.unwrap_or(rel))
    }

    /// Whether a row was actually written.
    pub async fn insert_unique_tx(
        &self,
        tx: &mut DatabaseTransaction,
        rel: &Relationship,
    ) -> AppResult<bool> {
        self.db.insert_relationship_tx(tx, rel).await
    }

    /// Rows removed: 0 or 1. Deleting an absent edge is not an error.
    pub async fn delete(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64> {
        self.db.delete_relationship(kind, actor, target).await
    }

    pub async fn delete_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64> {
        self.db
            .delete_relationship_tx(tx, kind, actor, target)
            .await
    }

    pub async fn find_one(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        self.db.get_relationship(kind, actor, target).await
    }

    pub async fn find_one_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        self.db.get_relationship_tx(tx, kind, actor, target).await
    }

    /// Edges created by `actor`. The stream re-runs its query on every call.
    pub fn stream_by_actor(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
    ) -> BoxStream<'_, AppResult<Relationship>> {
        self.db
            .stream_relationships(kind, RelationshipScope::Actor(actor))
    }

    /// Edges pointing at `target`.
    pub fn stream_by_target(
        &self,
        kind: RelationshipKind,
        target: EntityId,
    ) -> BoxStream<'_, AppResult<Relationship>> {
        self.db
            .stream_relationships(kind, RelationshipScope::Target(target))
    }

    pub async fn find_all_by_actor(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
    ) -> AppResult<Vec<Relationship>> {
        self.stream_by_actor(kind, actor).try_collect().await
    }

    pub async fn find_all_by_target(
        &self,
        kind: RelationshipKind,
        target: EntityId,
    ) -> AppResult<Vec<Relationship>> {
        self.stream_by_target(kind, target).try_collect().await
    }

    pub async fn count(&self, kind: RelationshipKind, target: EntityId) -> AppResult<u64> {
        self.db
            .count_relationships(kind, RelationshipScope::Target(target))
            .await
    }

    pub async fn count_by_actor(&self, kind: RelationshipKind, actor: EntityId) -> AppResult<u64> {
        self.db
            .count_relationships(kind, RelationshipScope::Actor(actor))
            .await
    }

    pub async fn count_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        target: EntityId,
    ) -> AppResult<u64> {
        self.db
            .count_relationships_tx(tx, kind, RelationshipScope::Target(target))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteDatabase;
    use futures::StreamExt;

    const LIKE: RelationshipKind = RelationshipKind::Like;
    const FOLLOW: RelationshipKind = RelationshipKind::Follow;
    const BOOKMARK: RelationshipKind = RelationshipKind::Bookmark;

    async fn store() -> RelationshipStore {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        RelationshipStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_create_twice_returns_first_record() {
        let store = store().await;
        let (alice, bob) = (EntityId(1), EntityId(2));
        let first = store.create(FOLLOW, alice, bob).await.unwrap();
        let second = store.create(FOLLOW, alice, bob).await.unwrap();

        assert_eq!(first, second);
        assert_eq!(store.count(FOLLOW, bob).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = store().await;
        let (user, tuit) = (EntityId(1), EntityId(9));
        store.create(BOOKMARK, user, tuit).await.unwrap();

        assert_eq!(store.delete(BOOKMARK, user, tuit).await.unwrap(), 1);
        assert_eq!(store.delete(BOOKMARK, user, tuit).await.unwrap(), 0);

        let found = store.find_one(BOOKMARK, user, tuit).await;
        assert!(found.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_stream_is_restartable() {
        let store = store().await;
        for target in [10, 11, 12] {
            store
                .create(LIKE, EntityId(1), EntityId(target))
                .await
                .unwrap();
        }

        let first: Vec<_> = store.stream_by_actor(LIKE, EntityId(1)).collect().await;
        assert_eq!(first.len(), 3);

        store.create(LIKE, EntityId(1), EntityId(13)).await.unwrap();
        let again = store.find_all_by_actor(LIKE, EntityId(1)).await.unwrap();
        assert_eq!(again.len(), 4);
        assert_eq!(store.count_by_actor(LIKE, EntityId(1)).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn test_kinds_do_not_mix() {
        let store = store().await;
        store.create(LIKE, EntityId(1), EntityId(5)).await.unwrap();

        let found = store
            .find_one(RelationshipKind::Dislike, EntityId(1), EntityId(5))
            .await;
        assert!(found.unwrap().is_none());
        let marks = store.find_all_by_target(BOOKMARK, EntityId(5)).await;
        assert!(marks.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_insert_unique_reports_duplicates() {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let db: Arc<dyn DatabaseInterface> = Arc::new(db);
        let store = RelationshipStore::new(db.clone());
        let rel = Relationship::new(LIKE, EntityId(1), EntityId(5));

        let mut tx = db.begin_transaction().await.unwrap();
        assert!(store.insert_unique_tx(&mut tx, &rel).await.unwrap());
        assert!(!store.insert_unique_tx(&mut tx, &rel).await.unwrap());
        tx.commit().await.unwrap();

        assert_eq!(store.count(LIKE, EntityId(5)).await.unwrap(), 1);
    }
}
