// ContentService - users, tuits and messages CRUD

use serde::Serialize;
use std::sync::Arc;
use tracing::info;

use crate::core::{
    current_time_millis, millis_to_datetime, EntityId, Message, MessageFilter, NewMessage, NewTuit,
    NewUser, Tuit, TuitUpdate, User, UserUpdate,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::{DatabaseInterface, IdGenerator, TuitFilter};

/// Rows touched by an update or delete.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WriteStatus {
    pub acknowledged: bool,
    pub count: u64,
}

impl From<u64> for WriteStatus {
    fn from(count: u64) -> Self {
        Self {
            acknowledged: true,
            count,
        }
    }
}

#[derive(Clone)]
pub struct ContentService {
    db: Arc<dyn DatabaseInterface>,
    ids: Arc<IdGenerator>,
}

impl ContentService {
    pub fn new(db: Arc<dyn DatabaseInterface>, ids: Arc<IdGenerator>) -> Self {
        Self { db, ids }
    }

    // Users

    pub async fn list_users(&self) -> AppResult<Vec<User>> {
        self.db.list_users().await
    }

    pub async fn find_user(&self, id: EntityId) -> AppResult<Option<User>> {
        self.db.get_user(id).await
    }

    pub async fn create_user(&self, user: &NewUser) -> AppResult<User> {
        require(user.missing_fields())?;
        let created = self.db.create_user(self.ids.next_id(), user).await?;
        info!(user = created.id.value(), username = %created.username, "User created");
        Ok(created)
    }

    pub async fn update_user(&self, id: EntityId, update: &UserUpdate) -> AppResult<WriteStatus> {
        Ok(self.db.update_user(id, update).await?.into())
    }

    /// Relationships and tuits of the user are left in place.
    pub async fn delete_user(&self, id: EntityId) -> AppResult<WriteStatus> {
        Ok(self.db.delete_user(id).await?.into())
    }

    pub async fn delete_all_users(&self) -> AppResult<WriteStatus> {
        Ok(self.db.delete_all_users().await?.into())
    }

    // Tuits

    pub async fn list_tuits(&self) -> AppResult<Vec<Tuit>> {
        self.db.list_tuits(None).await
    }

    pub async fn find_tuit(&self, id: EntityId) -> AppResult<Option<Tuit>> {
        self.db.get_tuit(id).await
    }

    pub async fn tuits_by_author(&self, author: EntityId) -> AppResult<Vec<Tuit>> {
        self.db.list_tuits(Some(author)).await
    }

    pub async fn create_tuit(&self, author: EntityId, tuit: &NewTuit) -> AppResult<Tuit> {
        require(tuit.missing_fields())?;
        let created = self.db.create_tuit(self.ids.next_id(), author, tuit).await?;
        info!(
            tuit = created.id.value(),
            author = author.value(),
            "Tuit created"
        );
        Ok(created)
    }

    pub async fn update_tuit(&self, id: EntityId, update: &TuitUpdate) -> AppResult<WriteStatus> {
        Ok(self.db.update_tuit(id, update).await?.into())
    }

    pub async fn delete_tuit(&self, id: EntityId) -> AppResult<WriteStatus> {
        Ok(self.db.delete_tuits(&TuitFilter::Id(id)).await?.into())
    }

    pub async fn delete_tuits_by_author(&self, author: EntityId) -> AppResult<WriteStatus> {
        let removed = self.db.delete_tuits(&TuitFilter::Author(author)).await?;
        Ok(removed.into())
    }

    pub async fn delete_tuits_by_content(&self, content: &str) -> AppResult<WriteStatus> {
        Ok(self
            .db
            .delete_tuits(&TuitFilter::Content(content.to_string()))
            .await?
            .into())
    }

    // Messages

    pub async fn messages_sent(&self, from: EntityId) -> AppResult<Vec<Message>> {
        self.db
            .list_messages(MessageFilter {
                from_user: Some(from),
                to_user: None,
            })
            .await
    }

    pub async fn messages_received(&self, to: EntityId) -> AppResult<Vec<Message>> {
        self.db
            .list_messages(MessageFilter {
                from_user: None,
                to_user: Some(to),
            })
            .await
    }

    pub async fn messages_between(&self, from: EntityId, to: EntityId) -> AppResult<Vec<Message>> {
        self.db
            .list_messages(MessageFilter {
                from_user: Some(from),
                to_user: Some(to),
            })
            .await
    }

    pub async fn send_message(
        &self,
        from: EntityId,
        to: EntityId,
        body: &NewMessage,
    ) -> AppResult<Message> {
        require(body.missing_fields())?;
        let message = Message {
            id: self.ids.next_id(),
            from_user: from,
            to_user: to,
            message: body.message.clone(),
            sent_on: millis_to_datetime(current_time_millis()),
        };
        self.db.create_message(&message).await?;
        Ok(message)
    }

    pub async fn delete_message(&self, id: EntityId) -> AppResult<WriteStatus> {
        Ok(self.db.delete_message(id).await?.into())
    }
}

fn require(missing: Vec<&'static str>) -> AppResult<()> {
    if missing.is_empty() {
        return Ok(());
    }
    let message = format!("Missing required fields: {}", missing.join(", "));
    Err(AppError::Validation(message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::RelationshipKind;
    use crate::infrastructure::SqliteDatabase;
    use crate::services::relationship_store::RelationshipStore;

    async fn service() -> (ContentService, Arc<dyn DatabaseInterface>) {
        let db = SqliteDatabase::new_in_memory().await.unwrap();
        let db: Arc<dyn DatabaseInterface> = Arc::new(db);
        let ids = Arc::new(IdGenerator::new(1));
        (ContentService::new(db.clone(), ids), db)
    }

    fn new_tuit(text: &str) -> NewTuit {
        NewTuit {
            tuit: text.to_string(),
            posted_on: None,
        }
    }

    #[tokio::test]
    async fn test_tuits_by_author_and_delete_by_content() {
        let (service, _) = service().await;
        for (author, text) in [(1, "first"), (1, "second"), (2, "first")] {
            let tuit = new_tuit(text);
            service.create_tuit(EntityId(author), &tuit).await.unwrap();
        }

        assert_eq!(service.tuits_by_author(EntityId(1)).await.unwrap().len(), 2);
        assert_eq!(service.list_tuits().await.unwrap().len(), 3);

        let status = service.delete_tuits_by_content("first").await.unwrap();
        assert_eq!(status.count, 2);
        assert_eq!(service.list_tuits().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_tuit_removes_its_likes() {
        let (service, db) = service().await;
        let tuit = service.create_tuit(EntityId(1), &new_tuit("bye")).await;
        let tid = tuit.unwrap().id;
        let store = RelationshipStore::new(db);
        let like = RelationshipKind::Like;
        store.create(like, EntityId(5), tid).await.unwrap();

        assert_eq!(service.delete_tuit(tid).await.unwrap().count, 1);
        assert_eq!(store.count(like, tid).await.unwrap(), 0);
        assert!(service.find_tuit(tid).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_message_directions() {
        let (service, _) = service().await;
        let body = NewMessage {
            message: "hey".into(),
        };
        let (alice, bob, carol) = (EntityId(1), EntityId(2), EntityId(3));
        service.send_message(alice, bob, &body).await.unwrap();
        service.send_message(alice, carol, &body).await.unwrap();
        let reply = service.send_message(bob, alice, &body).await.unwrap();

        assert_eq!(service.messages_sent(alice).await.unwrap().len(), 2);
        assert_eq!(service.messages_received(alice).await.unwrap().len(), 1);
        let between = service.messages_between(alice, bob).await.unwrap();
        assert_eq!(between.len(), 1);

        assert_eq!(service.delete_message(reply.id).await.unwrap().count, 1);
        assert_eq!(service.delete_message(reply.id).await.unwrap().count, 0);
        let inbox = service.messages_received(alice).await.unwrap();
        assert!(inbox.is_empty());
    }

    #[tokio::test]
    async fn test_user_lifecycle() {
        let (service, _) = service().await;
        let user = service
            .create_user(&NewUser {
                username: "bob".into(),
                password: "pw".into(),
                email: "bob@example.com".into(),
                ..Default::default()
            })
            .await
            .unwrap();

        let found = service.find_user(user.id).await.unwrap();
        assert_eq!(found.unwrap().username, "bob");
        assert_eq!(service.list_users().await.unwrap().len(), 1);
        assert_eq!(service.delete_all_users().await.unwrap().count, 1);
        assert!(service.find_user(user.id).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_blank_required_fields_are_rejected() {
        let (service, _) = service().await;
        let user = NewUser {
            username: "dave".into(),
            ..Default::default()
        };
        let result = service.create_user(&user).await;
        assert!(matches!(result, Err(AppError::Validation(_))));

        let result = service.create_tuit(EntityId(1), &new_tuit(" ")).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(service.list_users().await.unwrap().is_empty());
        assert!(service.list_tuits().await.unwrap().is_empty());
    }
}
