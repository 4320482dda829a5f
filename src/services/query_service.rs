// QueryService - read-side lookups over relationships; absence is never an error

use serde::Serialize;

use crate::core::{EntityId, Follow, Relationship, RelationshipKind};
use crate::error::AppResult;
use crate::services::relationship_store::RelationshipStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FollowCounts {
    pub followers: u64,
    pub following: u64,
}

#[derive(Clone)]
pub struct QueryService {
    relationships: RelationshipStore,
}

impl QueryService {
    pub fn new(relationships: RelationshipStore) -> Self {
        Self { relationships }
    }

    pub async fn find_one(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        self.relationships.find_one(kind, actor, target).await
    }

    pub async fn by_actor(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
    ) -> AppResult<Vec<Relationship>> {
        self.relationships.find_all_by_actor(kind, actor).await
    }

    pub async fn by_target(
        &self,
        kind: RelationshipKind,
        target: EntityId,
    ) -> AppResult<Vec<Relationship>> {
        self.relationships.find_all_by_target(kind, target).await
    }

    pub async fn count(&self, kind: RelationshipKind, target: EntityId) -> AppResult<u64> {
        self.relationships.count(kind, target).await
    }

    /// Users following `user`.
    pub async fn followers(&self, user: EntityId) -> AppResult<Vec<Follow>> {
        let rows = self.by_target(RelationshipKind::Follow, user).await?;
        Ok(rows.into_iter().map(Follow::from).collect())
    }

    /// Users that `user` follows.
    pub async fn following(&self, user: EntityId) -> AppResult<Vec<Follow>> {
        let rows = self.by_actor(RelationshipKind::Follow, user).await?;
        Ok(rows.into_iter().map(Follow::from).collect())
    }

    pub async fn follow_counts(&self, user: EntityId) -> AppResult<FollowCounts> {
        let follow = RelationshipKind::Follow;
        Ok(FollowCounts {
            followers: self.relationships.count(follow, user).await?,
            following: self.relationships.count_by_actor(follow, user).await?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::SqliteDatabase;
    use std::sync::Arc;

    const FOLLOW: RelationshipKind = RelationshipKind::Follow;

    async fn store() -> RelationshipStore {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        RelationshipStore::new(Arc::new(db))
    }

    #[tokio::test]
    async fn test_follow_direction_and_counts() {
        let store = store().await;
        let queries = QueryService::new(store.clone());

        // 1 and 3 follow 2; 2 follows 1.
        for (follower, followed) in [(1, 2), (3, 2), (2, 1)] {
            store
                .create(FOLLOW, EntityId(follower), EntityId(followed))
                .await
                .unwrap();
        }

        let followers = queries.followers(EntityId(2)).await.unwrap();
        assert_eq!(followers.len(), 2);
        assert!(followers.iter().all(|f| f.followed_user == EntityId(2)));

        let following = queries.following(EntityId(2)).await.unwrap();
        assert_eq!(following.len(), 1);
        assert_eq!(following[0].followed_user, EntityId(1));

        let counts = queries.follow_counts(EntityId(2)).await.unwrap();
        assert_eq!(counts.followers, 2);
        assert_eq!(counts.following, 1);
    }

    #[tokio::test]
    async fn test_absent_lookups_are_empty() {
        let queries = QueryService::new(store().await);
        let like = RelationshipKind::Like;

        let found = queries.find_one(like, EntityId(1), EntityId(2)).await;
        assert!(found.unwrap().is_none());
        let likers = queries.by_target(like, EntityId(2)).await;
        assert!(likers.unwrap().is_empty());
        let dislikes = queries.count(RelationshipKind::Dislike, EntityId(2)).await;
        assert_eq!(dislikes.unwrap(), 0);
    }
}
