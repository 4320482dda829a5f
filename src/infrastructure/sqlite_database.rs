use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use sqlx::query::Query;
use sqlx::sqlite::{
    Sqlite, SqliteArguments, SqliteConnectOptions, SqliteJournalMode, SqlitePool,
    SqlitePoolOptions, SqliteRow,
};
use sqlx::Row;
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::core::models::{AccountType, DEFAULT_SALARY};
use crate::core::{
    current_time_millis, millis_to_datetime, EntityId, Location, Message, MessageFilter, NewTuit,
    NewUser, Relationship, RelationshipKind, RelationshipScope, StatsUpdate, Tuit, TuitStats,
    TuitUpdate, User, UserUpdate,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::database::{
    parse_enum, to_count, to_i64, DatabaseInterface, DatabaseTransaction, TuitFilter,
    REACTION_KINDS, TUIT_COLUMNS, USER_COLUMNS,
};

const SQLITE_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id INTEGER PRIMARY KEY,
        username TEXT NOT NULL,
        password TEXT NOT NULL,
        first_name TEXT,
        last_name TEXT,
        email TEXT NOT NULL,
        profile_photo TEXT,
        header_image TEXT,
        account_type TEXT NOT NULL DEFAULT 'PERSONAL',
        marital_status TEXT,
        biography TEXT,
        date_of_birth INTEGER,
        joined INTEGER NOT NULL,
        latitude REAL NOT NULL DEFAULT 0,
        longitude REAL NOT NULL DEFAULT 0,
        salary REAL NOT NULL DEFAULT 50000
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tuits (
        id INTEGER PRIMARY KEY,
        tuit TEXT NOT NULL,
        posted_by INTEGER NOT NULL,
        posted_on INTEGER NOT NULL,
        replies INTEGER NOT NULL DEFAULT 0 CHECK (replies >= 0),
        retuits INTEGER NOT NULL DEFAULT 0 CHECK (retuits >= 0),
        likes INTEGER NOT NULL DEFAULT 0 CHECK (likes >= 0),
        dislikes INTEGER NOT NULL DEFAULT 0 CHECK (dislikes >= 0)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tuits_posted_by ON tuits(posted_by)",
    r#"
    CREATE TABLE IF NOT EXISTS relationships (
        kind TEXT NOT NULL,
        actor_id INTEGER NOT NULL,
        target_id INTEGER NOT NULL,
        created_at INTEGER NOT NULL,
        PRIMARY KEY (kind, actor_id, target_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_relationships_target ON relationships(kind, target_id)",
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id INTEGER PRIMARY KEY,
        from_user INTEGER NOT NULL,
        to_user INTEGER NOT NULL,
        message TEXT NOT NULL,
        sent_on INTEGER NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_from ON messages(from_user)",
    "CREATE INDEX IF NOT EXISTS idx_messages_to ON messages(to_user)",
];

/// SQLite implementation of database interface, used for local runs and tests
pub struct SqliteDatabase {
    pool: SqlitePool,
}

impl SqliteDatabase {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Fresh private in-memory database with the schema applied.
    pub async fn new_in_memory() -> AppResult<Self> {
        let db = Self::connect(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            min_connections: 1,
            acquire_timeout_secs: 30,
        })
        .await?;
        db.initialize().await?;
        Ok(db)
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let mut options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::store(format!("Invalid SQLite url {}", config.url), e))?
            .create_if_missing(true);

        // Each connection to ":memory:" is its own database, so an in-memory
        // store is pinned to one connection that is never recycled.
        let pool_options = if config.is_in_memory() {
            SqlitePoolOptions::new()
                .max_connections(1)
                .min_connections(1)
                .idle_timeout(None)
                .max_lifetime(None)
        } else {
            options = options.journal_mode(SqliteJournalMode::Wal);
            SqlitePoolOptions::new()
                .max_connections(config.max_connections)
                .min_connections(config.min_connections.min(config.max_connections))
        };

        let pool = pool_options
            .acquire_timeout(config.acquire_timeout())
            .connect_with(options)
            .await
            .map_err(|e| AppError::store("Failed to connect to SQLite", e))?;
        Ok(Self::new(pool))
    }
}

fn col<'r, T>(row: &'r SqliteRow, name: &str) -> AppResult<T>
where
    T: sqlx::Decode<'r, Sqlite> + sqlx::Type<Sqlite>,
{
    row.try_get(name)
        .map_err(|e| AppError::DatabaseError(format!("Failed to decode column {}: {}", name, e)))
}

fn user_from_row(row: &SqliteRow) -> AppResult<User> {
    let account_type: String = col(row, "account_type")?;
    let marital_status: Option<String> = col(row, "marital_status")?;
    let date_of_birth: Option<i64> = col(row, "date_of_birth")?;
    Ok(User {
        id: EntityId(col(row, "id")?),
        username: col(row, "username")?,
        password: col(row, "password")?,
        first_name: col(row, "first_name")?,
        last_name: col(row, "last_name")?,
        email: col(row, "email")?,
        profile_photo: col(row, "profile_photo")?,
        header_image: col(row, "header_image")?,
        account_type: parse_enum(&account_type)?,
        marital_status: marital_status.as_deref().map(parse_enum).transpose()?,
        biography: col(row, "biography")?,
        date_of_birth: date_of_birth.map(millis_to_datetime),
        joined: millis_to_datetime(col(row, "joined")?),
        location: Location {
            latitude: col(row, "latitude")?,
            longitude: col(row, "longitude")?,
        },
        salary: col(row, "salary")?,
    })
}

fn stats_from_row(row: &SqliteRow) -> AppResult<TuitStats> {
    Ok(TuitStats {
        replies: to_count(col(row, "replies")?),
        retuits: to_count(col(row, "retuits")?),
        likes: to_count(col(row, "likes")?),
        dislikes: to_count(col(row, "dislikes")?),
    })
}

fn tuit_from_row(row: &SqliteRow) -> AppResult<Tuit> {
    Ok(Tuit {
        id: EntityId(col(row, "id")?),
        tuit: col(row, "tuit")?,
        posted_by: EntityId(col(row, "posted_by")?),
        posted_on: millis_to_datetime(col(row, "posted_on")?),
        stats: stats_from_row(row)?,
    })
}

fn relationship_from_row(row: &SqliteRow) -> AppResult<Relationship> {
    let kind: String = col(row, "kind")?;
    Ok(Relationship {
        kind: parse_enum(&kind)?,
        actor_id: EntityId(col(row, "actor_id")?),
        target_id: EntityId(col(row, "target_id")?),
        created_at: millis_to_datetime(col(row, "created_at")?),
    })
}

fn message_from_row(row: &SqliteRow) -> AppResult<Message> {
    Ok(Message {
        id: EntityId(col(row, "id")?),
        from_user: EntityId(col(row, "from_user")?),
        to_user: EntityId(col(row, "to_user")?),
        message: col(row, "message")?,
        sent_on: millis_to_datetime(col(row, "sent_on")?),
    })
}

fn bind_tuit_filter<'q>(
    query: Query<'q, Sqlite, SqliteArguments<'q>>,
    filter: &'q TuitFilter,
) -> Query<'q, Sqlite, SqliteArguments<'q>> {
    match filter {
        TuitFilter::Id(id) | TuitFilter::Author(id) => query.bind(id.value()),
        TuitFilter::Content(content) => query.bind(content.as_str()),
    }
}

fn count_sql(scope: RelationshipScope) -> (&'static str, EntityId) {
    match scope {
        RelationshipScope::Actor(id) => (
            "SELECT COUNT(*) FROM relationships WHERE kind = ? AND actor_id = ?",
            id,
        ),
        RelationshipScope::Target(id) => (
            "SELECT COUNT(*) FROM relationships WHERE kind = ? AND target_id = ?",
            id,
        ),
    }
}

fn select_sql(scope: RelationshipScope) -> (&'static str, EntityId) {
    match scope {
        RelationshipScope::Actor(id) => (
            "SELECT kind, actor_id, target_id, created_at FROM relationships \
             WHERE kind = ? AND actor_id = ? ORDER BY created_at, target_id",
            id,
        ),
        RelationshipScope::Target(id) => (
            "SELECT kind, actor_id, target_id, created_at FROM relationships \
             WHERE kind = ? AND target_id = ? ORDER BY created_at, actor_id",
            id,
        ),
    }
}

async fn write_stats_on<'e, E>(
    executor: E,
    id: EntityId,
    update: &StatsUpdate,
) -> AppResult<Option<TuitStats>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "UPDATE tuits SET likes = COALESCE(?, likes), dislikes = COALESCE(?, dislikes), \
         replies = COALESCE(?, replies), retuits = COALESCE(?, retuits) \
         WHERE id = ? RETURNING replies, retuits, likes, dislikes",
    )
    .bind(update.likes.map(to_i64))
    .bind(update.dislikes.map(to_i64))
    .bind(update.replies.map(to_i64))
    .bind(update.retuits.map(to_i64))
    .bind(id.value())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::store(format!("Failed to write stats for tuit {}", id), e))?;

    row.as_ref().map(stats_from_row).transpose()
}

async fn insert_relationship_on<'e, E>(executor: E, rel: &Relationship) -> AppResult<bool>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT OR IGNORE INTO relationships (kind, actor_id, target_id, created_at) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(rel.kind.as_str())
    .bind(rel.actor_id.value())
    .bind(rel.target_id.value())
    .bind(rel.created_at.timestamp_millis())
    .execute(executor)
    .await
    .map_err(|e| AppError::store("Failed to create relationship", e))?;
    Ok(result.rows_affected() > 0)
}

async fn delete_relationship_on<'e, E>(
    executor: E,
    kind: RelationshipKind,
    actor: EntityId,
    target: EntityId,
) -> AppResult<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "DELETE FROM relationships WHERE kind = ? AND actor_id = ? AND target_id = ?",
    )
    .bind(kind.as_str())
    .bind(actor.value())
    .bind(target.value())
    .execute(executor)
    .await
        .map_err(|e| AppError::store("Failed to delete relationship", e))?;
    Ok(result.rows_affected())
}

async fn get_relationship_on<'e, E>(
    executor: E,
    kind: RelationshipKind,
    actor: EntityId,
    target: EntityId,
) -> AppResult<Option<Relationship>>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let row = sqlx::query(
        "SELECT kind, actor_id, target_id, created_at FROM relationships \
         WHERE kind = ? AND actor_id = ? AND target_id = ?",
    )
    .bind(kind.as_str())
    .bind(actor.value())
    .bind(target.value())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::store("Failed to look up relationship", e))?;
    row.as_ref().map(relationship_from_row).transpose()
}

async fn count_relationships_on<'e, E>(
    executor: E,
    kind: RelationshipKind,
    scope: RelationshipScope,
) -> AppResult<u64>
where
    E: sqlx::Executor<'e, Database = Sqlite>,
{
    let (sql, anchor) = count_sql(scope);
    let count: i64 = sqlx::query_scalar(sql)
        .bind(kind.as_str())
        .bind(anchor.value())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::store("Failed to count relationships", e))?;
    Ok(to_count(count))
}

#[async_trait]
impl DatabaseInterface for SqliteDatabase {
    fn backend(&self) -> &'static str {
        "sqlite"
    }

    async fn initialize(&self) -> AppResult<()> {
        for statement in SQLITE_SCHEMA {
            sqlx::query(statement)
                .execute(&self.pool)
                .await
                .map_err(|e| AppError::store("Failed to create schema", e))?;
        }
        Ok(())
    }

    async fn health_check(&self) -> AppResult<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store("Database health check failed", e))?;
        Ok(())
    }

    async fn begin_transaction(&self) -> AppResult<DatabaseTransaction> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::store("Failed to begin SQLite transaction", e))?;
        Ok(DatabaseTransaction::Sqlite(tx))
    }

    async fn create_user(&self, id: EntityId, user: &NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?) \
             RETURNING {}",
            USER_COLUMNS, USER_COLUMNS
        );
        let location = user.location.unwrap_or_default();
        let row = sqlx::query(&sql)
            .bind(id.value())
            .bind(&user.username)
            .bind(&user.password)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .bind(&user.email)
            .bind(&user.profile_photo)
            .bind(&user.header_image)
            .bind(user.account_type.unwrap_or(AccountType::Personal).as_str())
            .bind(user.marital_status.map(|m| m.as_str()))
            .bind(&user.biography)
            .bind(user.date_of_birth.map(|d| d.timestamp_millis()))
            .bind(current_time_millis())
            .bind(location.latitude)
            .bind(location.longitude)
            .bind(user.salary.unwrap_or(DEFAULT_SALARY))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to create user {}", id), e))?;
        user_from_row(&row)
    }

    async fn get_user(&self, id: EntityId) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = ?", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to get user {}", id), e))?;
        row.as_ref().map(user_from_row).transpose()
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to list users", e))?;
        rows.iter().map(user_from_row).collect()
    }

    async fn update_user(&self, id: EntityId, update: &UserUpdate) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET username = COALESCE(?, username), password = COALESCE(?, password), \
             email = COALESCE(?, email), first_name = COALESCE(?, first_name), \
             last_name = COALESCE(?, last_name), profile_photo = COALESCE(?, profile_photo), \
             header_image = COALESCE(?, header_image), account_type = COALESCE(?, account_type), \
             marital_status = COALESCE(?, marital_status), biography = COALESCE(?, biography), \
             date_of_birth = COALESCE(?, date_of_birth), latitude = COALESCE(?, latitude), \
             longitude = COALESCE(?, longitude), salary = COALESCE(?, salary) WHERE id = ?",
        )
        .bind(&update.username)
        .bind(&update.password)
        .bind(&update.email)
        .bind(&update.first_name)
        .bind(&update.last_name)
        .bind(&update.profile_photo)
        .bind(&update.header_image)
        .bind(update.account_type.map(|a| a.as_str()))
        .bind(update.marital_status.map(|m| m.as_str()))
        .bind(&update.biography)
        .bind(update.date_of_birth.map(|d| d.timestamp_millis()))
        .bind(update.location.map(|l| l.latitude))
        .bind(update.location.map(|l| l.longitude))
        .bind(update.salary)
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::store(format!("Failed to update user {}", id), e))?;
        Ok(result.rows_affected())
    }

    async fn delete_user(&self, id: EntityId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to delete user {}", id), e))?;
        Ok(result.rows_affected())
    }

    async fn delete_all_users(&self) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM users")
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to delete users", e))?;
        Ok(result.rows_affected())
    }

    async fn create_tuit(&self, id: EntityId, author: EntityId, tuit: &NewTuit) -> AppResult<Tuit> {
        let sql = format!(
            "INSERT INTO tuits (id, tuit, posted_by, posted_on) VALUES (?, ?, ?, ?) RETURNING {}",
            TUIT_COLUMNS
        );
        let posted_on = tuit
            .posted_on
            .map(|d| d.timestamp_millis())
            .unwrap_or_else(current_time_millis);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .bind(&tuit.tuit)
            .bind(author.value())
            .bind(posted_on)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to create tuit {}", id), e))?;
        tuit_from_row(&row)
    }

    async fn get_tuit(&self, id: EntityId) -> AppResult<Option<Tuit>> {
        let sql = format!("SELECT {} FROM tuits WHERE id = ?", TUIT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to get tuit {}", id), e))?;
        row.as_ref().map(tuit_from_row).transpose()
    }

    async fn list_tuits(&self, author: Option<EntityId>) -> AppResult<Vec<Tuit>> {
        let sql = format!(
            "SELECT {} FROM tuits WHERE (? IS NULL OR posted_by = ?) \
             ORDER BY posted_on DESC, id DESC",
            TUIT_COLUMNS
        );
        let anchor = author.map(EntityId::value);
        let rows = sqlx::query(&sql)
            .bind(anchor)
            .bind(anchor)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to list tuits", e))?;
        rows.iter().map(tuit_from_row).collect()
    }

    async fn update_tuit(&self, id: EntityId, update: &TuitUpdate) -> AppResult<u64> {
        let result = sqlx::query("UPDATE tuits SET tuit = COALESCE(?, tuit) WHERE id = ?")
            .bind(&update.tuit)
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to update tuit {}", id), e))?;
        Ok(result.rows_affected())
    }

    async fn delete_tuits(&self, filter: &TuitFilter) -> AppResult<u64> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| AppError::store("Failed to begin SQLite transaction", e))?;

        let cascade = format!(
            "DELETE FROM relationships WHERE kind IN {} \
             AND target_id IN (SELECT id FROM tuits WHERE {})",
            REACTION_KINDS,
            filter.condition("?")
        );
        bind_tuit_filter(sqlx::query(&cascade), filter)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::store("Failed to delete tuit relationships", e))?;

        let delete = format!("DELETE FROM tuits WHERE {}", filter.condition("?"));
        let result = bind_tuit_filter(sqlx::query(&delete), filter)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::store("Failed to delete tuits", e))?;

        tx.commit()
            .await
            .map_err(|e| AppError::store("Failed to commit tuit delete", e))?;
        Ok(result.rows_affected())
    }

    async fn lock_tuit_tx(
        &self,
        tx: &mut DatabaseTransaction,
        id: EntityId,
    ) -> AppResult<Option<Tuit>> {
        let sqlite_tx = tx.as_sqlite_mut()?;
        // SQLite has no row locks; a no-op write takes the database write lock
        // and holds it until the transaction ends.
        let sql = format!(
            "UPDATE tuits SET likes = likes WHERE id = ? RETURNING {}",
            TUIT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&mut **sqlite_tx)
            .await
            .map_err(|e| AppError::store(format!("Failed to lock tuit {}", id), e))?;
        row.as_ref().map(tuit_from_row).transpose()
    }

    async fn write_stats(
        &self,
        id: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<Option<TuitStats>> {
        write_stats_on(&self.pool, id, update).await
    }

    async fn write_stats_tx(
        &self,
        tx: &mut DatabaseTransaction,
        id: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<Option<TuitStats>> {
        let sqlite_tx = tx.as_sqlite_mut()?;
        write_stats_on(&mut **sqlite_tx, id, update).await
    }

    async fn insert_relationship(&self, rel: &Relationship) -> AppResult<bool> {
        insert_relationship_on(&self.pool, rel).await
    }

    async fn insert_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        rel: &Relationship,
    ) -> AppResult<bool> {
        let sqlite_tx = tx.as_sqlite_mut()?;
        insert_relationship_on(&mut **sqlite_tx, rel).await
    }

    async fn delete_relationship(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64> {
        delete_relationship_on(&self.pool, kind, actor, target)
            .await
    }

    async fn delete_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64> {
        let sqlite_tx = tx.as_sqlite_mut()?;
        delete_relationship_on(&mut **sqlite_tx, kind, actor, target).await
    }

    async fn get_relationship(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        get_relationship_on(&self.pool, kind, actor, target).await
    }

    async fn get_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        let sqlite_tx = tx.as_sqlite_mut()?;
        get_relationship_on(&mut **sqlite_tx, kind, actor, target).await
    }

    fn stream_relationships(
        &self,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> BoxStream<'_, AppResult<Relationship>> {
        let (sql, anchor) = select_sql(scope);
        sqlx::query(sql)
            .bind(kind.as_str())
            .bind(anchor.value())
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(|e| AppError::store("Failed to stream relationships", e))
                    .and_then(|row| relationship_from_row(&row))
            })
            .boxed()
    }

    async fn count_relationships(
        &self,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> AppResult<u64> {
        count_relationships_on(&self.pool, kind, scope).await
    }

    async fn count_relationships_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> AppResult<u64> {
        let sqlite_tx = tx.as_sqlite_mut()?;
        count_relationships_on(&mut **sqlite_tx, kind, scope).await
    }

    async fn create_message(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, from_user, to_user, message, sent_on) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(message.id.value())
        .bind(message.from_user.value())
        .bind(message.to_user.value())
        .bind(&message.message)
        .bind(message.sent_on.timestamp_millis())
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to create message", e))?;
        Ok(())
    }

    async fn list_messages(&self, filter: MessageFilter) -> AppResult<Vec<Message>> {
        let from_user = filter.from_user.map(EntityId::value);
        let to_user = filter.to_user.map(EntityId::value);
        let rows = sqlx::query(
            "SELECT id, from_user, to_user, message, sent_on FROM messages \
             WHERE (? IS NULL OR from_user = ?) AND (? IS NULL OR to_user = ?) \
             ORDER BY sent_on, id",
        )
        .bind(from_user)
        .bind(from_user)
        .bind(to_user)
        .bind(to_user)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to list messages", e))?;
        rows.iter().map(message_from_row).collect()
    }

    async fn delete_message(&self, id: EntityId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to delete message {}", id), e))?;
        Ok(result.rows_affected())
    }
}
