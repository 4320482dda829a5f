// Database Interface - Low-level database operations for the engagement backend
// This layer converts store operations directly into SQL queries

use async_trait::async_trait;
use futures::stream::{BoxStream, StreamExt};
use sqlx::postgres::{PgArguments, PgPool, PgPoolOptions, PgRow};
use sqlx::query::Query;
use sqlx::{Postgres, Row, Sqlite, Transaction};
use std::sync::Arc;
use tracing::info;

use crate::config::DatabaseConfig;
use crate::core::models::{AccountType, DEFAULT_SALARY};
use crate::core::{
    current_time_millis, millis_to_datetime, EntityId, Location, Message, MessageFilter, NewTuit,
    NewUser, Relationship, RelationshipKind, RelationshipScope, StatsUpdate, Tuit, TuitStats,
    TuitUpdate, User, UserUpdate,
};
use crate::error::{AppError, AppResult};
use crate::infrastructure::sqlite_database::SqliteDatabase;

/// Selects the tuits removed by a delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TuitFilter {
    Id(EntityId),
    Author(EntityId),
    Content(String),
}

impl TuitFilter {
    pub(crate) fn condition(&self, placeholder: &str) -> String {
        match self {
            TuitFilter::Id(_) => format!("id = {}", placeholder),
            TuitFilter::Author(_) => format!("posted_by = {}", placeholder),
            TuitFilter::Content(_) => format!("tuit = {}", placeholder),
        }
    }
}

/// Transaction wrapper for database operations
pub enum DatabaseTransaction {
    Postgres(Transaction<'static, Postgres>),
    Sqlite(Transaction<'static, Sqlite>),
}

impl DatabaseTransaction {
    /// Commit the transaction
    pub async fn commit(self) -> AppResult<()> {
        match self {
            DatabaseTransaction::Postgres(tx) => tx.commit().await,
            DatabaseTransaction::Sqlite(tx) => tx.commit().await,
        }
        .map_err(|e| AppError::store("Failed to commit transaction", e))
    }

    /// Rollback the transaction
    pub async fn rollback(self) -> AppResult<()> {
        match self {
            DatabaseTransaction::Postgres(tx) => tx.rollback().await,
            DatabaseTransaction::Sqlite(tx) => tx.rollback().await,
        }
        .map_err(|e| AppError::store("Failed to rollback transaction", e))
    }

    pub(crate) fn as_postgres_mut(&mut self) -> AppResult<&mut Transaction<'static, Postgres>> {
        match self {
            DatabaseTransaction::Postgres(tx) => Ok(tx),
            DatabaseTransaction::Sqlite(_) => Err(AppError::Internal(
                "SQLite transaction passed to PostgreSQL backend".to_string(),
            )),
        }
    }

    pub(crate) fn as_sqlite_mut(&mut self) -> AppResult<&mut Transaction<'static, Sqlite>> {
        match self {
            DatabaseTransaction::Sqlite(tx) => Ok(tx),
            DatabaseTransaction::Postgres(_) => Err(AppError::Internal(
                "PostgreSQL transaction passed to SQLite backend".to_string(),
            )),
        }
    }
}

/// Storage seam for users, tuits, relationships and messages.
///
/// Relationship rows are unique per (kind, actor, target); inserting an
/// existing edge is a no-op reported as `false`. The `_tx` variants run inside
/// a transaction obtained from [`DatabaseInterface::begin_transaction`].
#[async_trait]
pub trait DatabaseInterface: Send + Sync {
    fn backend(&self) -> &'static str;

    /// Create tables and indexes if they do not exist yet.
    async fn initialize(&self) -> AppResult<()>;
    async fn health_check(&self) -> AppResult<()>;
    async fn begin_transaction(&self) -> AppResult<DatabaseTransaction>;

    // Users
    async fn create_user(&self, id: EntityId, user: &NewUser) -> AppResult<User>;
    async fn get_user(&self, id: EntityId) -> AppResult<Option<User>>;
    async fn list_users(&self) -> AppResult<Vec<User>>;
    async fn update_user(&self, id: EntityId, update: &UserUpdate) -> AppResult<u64>;
    async fn delete_user(&self, id: EntityId) -> AppResult<u64>;
    async fn delete_all_users(&self) -> AppResult<u64>;

    // Tuits
    async fn create_tuit(&self, id: EntityId, author: EntityId, tuit: &NewTuit) -> AppResult<Tuit>;
    async fn get_tuit(&self, id: EntityId) -> AppResult<Option<Tuit>>;
    async fn list_tuits(&self, author: Option<EntityId>) -> AppResult<Vec<Tuit>>;
    async fn update_tuit(&self, id: EntityId, update: &TuitUpdate) -> AppResult<u64>;
    /// Deletes matching tuits together with the likes, dislikes and bookmarks pointing at them.
    async fn delete_tuits(&self, filter: &TuitFilter) -> AppResult<u64>;

    // Stats
    /// Load a tuit and hold its write lock until the transaction ends.
    async fn lock_tuit_tx(
        &self,
        tx: &mut DatabaseTransaction,
        id: EntityId,
    ) -> AppResult<Option<Tuit>>;
    async fn write_stats(&self, id: EntityId, update: &StatsUpdate) -> AppResult<Option<TuitStats>>;
    async fn write_stats_tx(
        &self,
        tx: &mut DatabaseTransaction,
        id: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<Option<TuitStats>>;

    // Relationships
    async fn insert_relationship(&self, rel: &Relationship) -> AppResult<bool>;
    async fn insert_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        rel: &Relationship,
    ) -> AppResult<bool>;
    async fn delete_relationship(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64>;
    async fn delete_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64>;
    async fn get_relationship(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>>;
    async fn get_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>>;
    /// Lazily stream matching rows; every call re-runs the query.
    fn stream_relationships(
        &self,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> BoxStream<'_, AppResult<Relationship>>;
    async fn count_relationships(
        &self,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> AppResult<u64>;
    async fn count_relationships_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> AppResult<u64>;

    // Messages
    async fn create_message(&self, message: &Message) -> AppResult<()>;
    async fn list_messages(&self, filter: MessageFilter) -> AppResult<Vec<Message>>;
    async fn delete_message(&self, id: EntityId) -> AppResult<u64>;
}

pub(crate) const USER_COLUMNS: &str = "id, username, password, first_name, last_name, email, \
     profile_photo, header_image, account_type, marital_status, biography, date_of_birth, joined, \
     latitude, longitude, salary";
pub(crate) const TUIT_COLUMNS: &str =
    "id, tuit, posted_by, posted_on, replies, retuits, likes, dislikes";
pub(crate) const REACTION_KINDS: &str = "('like', 'dislike', 'bookmark')";

/// Clamp a stored counter into the unsigned domain.
pub(crate) fn to_count(value: i64) -> u64 {
    value.max(0) as u64
}

pub(crate) fn to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Decode a text column holding one of the crate's string enums.
pub(crate) fn parse_enum<T: std::str::FromStr<Err = String>>(value: &str) -> AppResult<T> {
    value
        .parse()
        .map_err(|e: String| AppError::DatabaseError(format!("Corrupt enum column: {}", e)))
}

/// Connect to the configured store and make sure its schema exists.
pub async fn initialize_database(config: &DatabaseConfig) -> AppResult<Arc<dyn DatabaseInterface>> {
    let database: Arc<dyn DatabaseInterface> = if config.is_sqlite() {
        Arc::new(SqliteDatabase::connect(config).await?)
    } else {
        Arc::new(PostgresDatabase::connect(config).await?)
    };

    database.initialize().await?;
    info!(
        backend = database.backend(),
        max_connections = config.max_connections,
        acquire_timeout_secs = config.acquire_timeout_secs,
        "Database initialized"
    );
    Ok(database)
}

/// PostgreSQL implementation of database interface
pub struct PostgresDatabase {
    pool: PgPool,
}

const PG_SCHEMA: &[&str] = &[
    r#"
    CREATE TABLE IF NOT EXISTS users (
        id BIGINT PRIMARY KEY,
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
        date_of_birth BIGINT,
        joined BIGINT NOT NULL,
        latitude DOUBLE PRECISION NOT NULL DEFAULT 0,
        longitude DOUBLE PRECISION NOT NULL DEFAULT 0,
        salary DOUBLE PRECISION NOT NULL DEFAULT 50000
    )
    "#,
    r#"
    CREATE TABLE IF NOT EXISTS tuits (
        id BIGINT PRIMARY KEY,
        tuit TEXT NOT NULL,
        posted_by BIGINT NOT NULL,
        posted_on BIGINT NOT NULL,
        replies BIGINT NOT NULL DEFAULT 0 CHECK (replies >= 0),
        retuits BIGINT NOT NULL DEFAULT 0 CHECK (retuits >= 0),
        likes BIGINT NOT NULL DEFAULT 0 CHECK (likes >= 0),
        dislikes BIGINT NOT NULL DEFAULT 0 CHECK (dislikes >= 0)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_tuits_posted_by ON tuits(posted_by)",
    r#"
    CREATE TABLE IF NOT EXISTS relationships (
        kind VARCHAR(16) NOT NULL,
        actor_id BIGINT NOT NULL,
        target_id BIGINT NOT NULL,
        created_at BIGINT NOT NULL,
        PRIMARY KEY (kind, actor_id, target_id)
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_relationships_target ON relationships(kind, target_id)",
    r#"
    CREATE TABLE IF NOT EXISTS messages (
        id BIGINT PRIMARY KEY,
        from_user BIGINT NOT NULL,
        to_user BIGINT NOT NULL,
        message TEXT NOT NULL,
        sent_on BIGINT NOT NULL
    )
    "#,
    "CREATE INDEX IF NOT EXISTS idx_messages_from ON messages(from_user)",
    "CREATE INDEX IF NOT EXISTS idx_messages_to ON messages(to_user)",
];

impl PostgresDatabase {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn connect(config: &DatabaseConfig) -> AppResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections.min(config.max_connections))
            .acquire_timeout(config.acquire_timeout())
            .idle_timeout(std::time::Duration::from_secs(600))
            .max_lifetime(std::time::Duration::from_secs(1800))
            .test_before_acquire(true)
            .connect(&config.url)
            .await
            .map_err(|e| AppError::store("Failed to connect to database", e))?;
        Ok(Self::new(pool))
    }
}

fn pg_user_from_row(row: &PgRow) -> AppResult<User> {
    let account_type: String = pg_col(row, "account_type")?;
    let marital_status: Option<String> = pg_col(row, "marital_status")?;
    let date_of_birth: Option<i64> = pg_col(row, "date_of_birth")?;
    Ok(User {
        id: EntityId(pg_col(row, "id")?),
        username: pg_col(row, "username")?,
        password: pg_col(row, "password")?,
        first_name: pg_col(row, "first_name")?,
        last_name: pg_col(row, "last_name")?,
        email: pg_col(row, "email")?,
        profile_photo: pg_col(row, "profile_photo")?,
        header_image: pg_col(row, "header_image")?,
        account_type: parse_enum(&account_type)?,
        marital_status: marital_status.as_deref().map(parse_enum).transpose()?,
        biography: pg_col(row, "biography")?,
        date_of_birth: date_of_birth.map(millis_to_datetime),
        joined: millis_to_datetime(pg_col(row, "joined")?),
        location: Location {
            latitude: pg_col(row, "latitude")?,
            longitude: pg_col(row, "longitude")?,
        },
        salary: pg_col(row, "salary")?,
    })
}

fn pg_tuit_from_row(row: &PgRow) -> AppResult<Tuit> {
    Ok(Tuit {
        id: EntityId(pg_col(row, "id")?),
        tuit: pg_col(row, "tuit")?,
        posted_by: EntityId(pg_col(row, "posted_by")?),
        posted_on: millis_to_datetime(pg_col(row, "posted_on")?),
        stats: pg_stats_from_row(row)?,
    })
}

fn pg_stats_from_row(row: &PgRow) -> AppResult<TuitStats> {
    Ok(TuitStats {
        replies: to_count(pg_col(row, "replies")?),
        retuits: to_count(pg_col(row, "retuits")?),
        likes: to_count(pg_col(row, "likes")?),
        dislikes: to_count(pg_col(row, "dislikes")?),
    })
}

fn pg_relationship_from_row(row: &PgRow) -> AppResult<Relationship> {
    let kind: String = pg_col(row, "kind")?;
    Ok(Relationship {
        kind: parse_enum(&kind)?,
        actor_id: EntityId(pg_col(row, "actor_id")?),
        target_id: EntityId(pg_col(row, "target_id")?),
        created_at: millis_to_datetime(pg_col(row, "created_at")?),
    })
}

fn pg_message_from_row(row: &PgRow) -> AppResult<Message> {
    Ok(Message {
        id: EntityId(pg_col(row, "id")?),
        from_user: EntityId(pg_col(row, "from_user")?),
        to_user: EntityId(pg_col(row, "to_user")?),
        message: pg_col(row, "message")?,
        sent_on: millis_to_datetime(pg_col(row, "sent_on")?),
    })
}

fn pg_col<'r, T>(row: &'r PgRow, name: &str) -> AppResult<T>
where
    T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
{
    row.try_get(name)
        .map_err(|e| AppError::DatabaseError(format!("Failed to decode column {}: {}", name, e)))
}

fn pg_bind_tuit_filter<'q>(
    query: Query<'q, Postgres, PgArguments>,
    filter: &'q TuitFilter,
) -> Query<'q, Postgres, PgArguments> {
    match filter {
        TuitFilter::Id(id) | TuitFilter::Author(id) => query.bind(id.value()),
        TuitFilter::Content(content) => query.bind(content.as_str()),
    }
}

fn pg_count_sql(scope: RelationshipScope) -> (&'static str, EntityId) {
    match scope {
        RelationshipScope::Actor(id) => (
            "SELECT COUNT(*) FROM relationships WHERE kind = $1 AND actor_id = $2",
            id,
        ),
        RelationshipScope::Target(id) => (
            "SELECT COUNT(*) FROM relationships WHERE kind = $1 AND target_id = $2",
            id,
        ),
    }
}

fn pg_select_sql(scope: RelationshipScope) -> (&'static str, EntityId) {
    match scope {
        RelationshipScope::Actor(id) => (
            "SELECT kind, actor_id, target_id, created_at FROM relationships \
             WHERE kind = $1 AND actor_id = $2 ORDER BY created_at, target_id",
            id,
        ),
        RelationshipScope::Target(id) => (
            "SELECT kind, actor_id, target_id, created_at FROM relationships \
             WHERE kind = $1 AND target_id = $2 ORDER BY created_at, actor_id",
            id,
        ),
    }
}

async fn pg_write_stats<'e, E>(
    executor: E,
    id: EntityId,
    update: &StatsUpdate,
) -> AppResult<Option<TuitStats>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        "UPDATE tuits SET likes = COALESCE($1, likes), dislikes = COALESCE($2, dislikes), \
         replies = COALESCE($3, replies), retuits = COALESCE($4, retuits) \
         WHERE id = $5 RETURNING replies, retuits, likes, dislikes",
    )
    .bind(update.likes.map(to_i64))
    .bind(update.dislikes.map(to_i64))
    .bind(update.replies.map(to_i64))
    .bind(update.retuits.map(to_i64))
    .bind(id.value())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::store(format!("Failed to write stats for tuit {}", id), e))?;

    row.as_ref().map(pg_stats_from_row).transpose()
}

async fn pg_insert_relationship<'e, E>(executor: E, rel: &Relationship) -> AppResult<bool>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        "INSERT INTO relationships (kind, actor_id, target_id, created_at) VALUES ($1, $2, $3, $4) \
         ON CONFLICT DO NOTHING",
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

async fn pg_delete_relationship<'e, E>(
    executor: E,
    kind: RelationshipKind,
    actor: EntityId,
    target: EntityId,
) -> AppResult<u64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let result = sqlx::query(
        "DELETE FROM relationships WHERE kind = $1 AND actor_id = $2 AND target_id = $3",
    )
    .bind(kind.as_str())
    .bind(actor.value())
    .bind(target.value())
    .execute(executor)
    .await
    .map_err(|e| AppError::store("Failed to delete relationship", e))?;
    Ok(result.rows_affected())
}

async fn pg_get_relationship<'e, E>(
    executor: E,
    kind: RelationshipKind,
    actor: EntityId,
    target: EntityId,
) -> AppResult<Option<Relationship>>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let row = sqlx::query(
        "SELECT kind, actor_id, target_id, created_at FROM relationships \
         WHERE kind = $1 AND actor_id = $2 AND target_id = $3",
    )
    .bind(kind.as_str())
    .bind(actor.value())
    .bind(target.value())
    .fetch_optional(executor)
    .await
    .map_err(|e| AppError::store("Failed to look up relationship", e))?;
    row.as_ref().map(pg_relationship_from_row).transpose()
}

async fn pg_count_relationships<'e, E>(
    executor: E,
    kind: RelationshipKind,
    scope: RelationshipScope,
) -> AppResult<u64>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    let (sql, anchor) = pg_count_sql(scope);
    let count: i64 = sqlx::query_scalar(sql)
        .bind(kind.as_str())
        .bind(anchor.value())
        .fetch_one(executor)
        .await
        .map_err(|e| AppError::store("Failed to count relationships", e))?;
    Ok(to_count(count))
}

#[async_trait]
impl DatabaseInterface for PostgresDatabase {
    fn backend(&self) -> &'static str {
        "postgres"
    }

    async fn initialize(&self) -> AppResult<()> {
        for statement in PG_SCHEMA {
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
            .map_err(|e| AppError::store("Failed to begin transaction", e))?;
        Ok(DatabaseTransaction::Postgres(tx))
    }

    async fn create_user(&self, id: EntityId, user: &NewUser) -> AppResult<User> {
        let sql = format!(
            "INSERT INTO users ({}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, \
             $13, $14, $15, $16) RETURNING {}",
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
        pg_user_from_row(&row)
    }

    async fn get_user(&self, id: EntityId) -> AppResult<Option<User>> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to get user {}", id), e))?;
        row.as_ref().map(pg_user_from_row).transpose()
    }

    async fn list_users(&self) -> AppResult<Vec<User>> {
        let sql = format!("SELECT {} FROM users ORDER BY id", USER_COLUMNS);
        let rows = sqlx::query(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| AppError::store("Failed to list users", e))?;
        rows.iter().map(pg_user_from_row).collect()
    }

    async fn update_user(&self, id: EntityId, update: &UserUpdate) -> AppResult<u64> {
        let result = sqlx::query(
            "UPDATE users SET username = COALESCE($1, username), \
             password = COALESCE($2, password), email = COALESCE($3, email), \
             first_name = COALESCE($4, first_name), \
             last_name = COALESCE($5, last_name), profile_photo = COALESCE($6, profile_photo), \
             header_image = COALESCE($7, header_image), account_type = COALESCE($8, account_type), \
             marital_status = COALESCE($9, marital_status), biography = COALESCE($10, biography), \
             date_of_birth = COALESCE($11, date_of_birth), latitude = COALESCE($12, latitude), \
             longitude = COALESCE($13, longitude), salary = COALESCE($14, salary) WHERE id = $15",
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
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
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
            "INSERT INTO tuits (id, tuit, posted_by, posted_on) VALUES ($1, $2, $3, $4) \
             RETURNING {}",
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
        pg_tuit_from_row(&row)
    }

    async fn get_tuit(&self, id: EntityId) -> AppResult<Option<Tuit>> {
        let sql = format!("SELECT {} FROM tuits WHERE id = $1", TUIT_COLUMNS);
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to get tuit {}", id), e))?;
        row.as_ref().map(pg_tuit_from_row).transpose()
    }

    async fn list_tuits(&self, author: Option<EntityId>) -> AppResult<Vec<Tuit>> {
        let rows = match author {
            Some(author) => {
                let sql = format!(
                    "SELECT {} FROM tuits WHERE posted_by = $1 ORDER BY posted_on DESC, id DESC",
                    TUIT_COLUMNS
                );
                sqlx::query(&sql)
                    .bind(author.value())
                    .fetch_all(&self.pool)
                    .await
            }
            None => {
                let sql = format!(
                    "SELECT {} FROM tuits ORDER BY posted_on DESC, id DESC",
                    TUIT_COLUMNS
                );
                sqlx::query(&sql).fetch_all(&self.pool).await
            }
        }
        .map_err(|e| AppError::store("Failed to list tuits", e))?;
        rows.iter().map(pg_tuit_from_row).collect()
    }

    async fn update_tuit(&self, id: EntityId, update: &TuitUpdate) -> AppResult<u64> {
        let result = sqlx::query("UPDATE tuits SET tuit = COALESCE($1, tuit) WHERE id = $2")
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
            .map_err(|e| AppError::store("Failed to begin transaction", e))?;

        let cascade = format!(
            "DELETE FROM relationships WHERE kind IN {} \
             AND target_id IN (SELECT id FROM tuits WHERE {})",
            REACTION_KINDS,
            filter.condition("$1")
        );
        pg_bind_tuit_filter(sqlx::query(&cascade), filter)
            .execute(&mut *tx)
            .await
            .map_err(|e| AppError::store("Failed to delete tuit relationships", e))?;

        let delete = format!("DELETE FROM tuits WHERE {}", filter.condition("$1"));
        let result = pg_bind_tuit_filter(sqlx::query(&delete), filter)
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
        let tx = tx.as_postgres_mut()?;
        let sql = format!(
            "SELECT {} FROM tuits WHERE id = $1 FOR UPDATE",
            TUIT_COLUMNS
        );
        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&mut **tx)
            .await
            .map_err(|e| AppError::store(format!("Failed to lock tuit {}", id), e))?;
        row.as_ref().map(pg_tuit_from_row).transpose()
    }

    async fn write_stats(
        &self,
        id: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<Option<TuitStats>> {
        pg_write_stats(&self.pool, id, update).await
    }

    async fn write_stats_tx(
        &self,
        tx: &mut DatabaseTransaction,
        id: EntityId,
        update: &StatsUpdate,
    ) -> AppResult<Option<TuitStats>> {
        let tx = tx.as_postgres_mut()?;
        pg_write_stats(&mut **tx, id, update).await
    }

    async fn insert_relationship(&self, rel: &Relationship) -> AppResult<bool> {
        pg_insert_relationship(&self.pool, rel).await
    }

    async fn insert_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        rel: &Relationship,
    ) -> AppResult<bool> {
        let tx = tx.as_postgres_mut()?;
        pg_insert_relationship(&mut **tx, rel).await
    }

    async fn delete_relationship(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64> {
        pg_delete_relationship(&self.pool, kind, actor, target)
            .await
    }

    async fn delete_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<u64> {
        let tx = tx.as_postgres_mut()?;
        pg_delete_relationship(&mut **tx, kind, actor, target).await
    }

    async fn get_relationship(
        &self,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        pg_get_relationship(&self.pool, kind, actor, target).await
    }

    async fn get_relationship_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        actor: EntityId,
        target: EntityId,
    ) -> AppResult<Option<Relationship>> {
        let tx = tx.as_postgres_mut()?;
        pg_get_relationship(&mut **tx, kind, actor, target).await
    }

    fn stream_relationships(
        &self,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> BoxStream<'_, AppResult<Relationship>> {
        let (sql, anchor) = pg_select_sql(scope);
        sqlx::query(sql)
            .bind(kind.as_str())
            .bind(anchor.value())
            .fetch(&self.pool)
            .map(|row| {
                row.map_err(|e| AppError::store("Failed to stream relationships", e))
                    .and_then(|row| pg_relationship_from_row(&row))
            })
            .boxed()
    }

    async fn count_relationships(
        &self,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> AppResult<u64> {
        pg_count_relationships(&self.pool, kind, scope).await
    }

    async fn count_relationships_tx(
        &self,
        tx: &mut DatabaseTransaction,
        kind: RelationshipKind,
        scope: RelationshipScope,
    ) -> AppResult<u64> {
        let tx = tx.as_postgres_mut()?;
        pg_count_relationships(&mut **tx, kind, scope).await
    }

    async fn create_message(&self, message: &Message) -> AppResult<()> {
        sqlx::query(
            "INSERT INTO messages (id, from_user, to_user, message, sent_on) \
             VALUES ($1, $2, $3, $4, $5)",
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
        let rows = sqlx::query(
            "SELECT id, from_user, to_user, message, sent_on FROM messages \
             WHERE ($1::BIGINT IS NULL OR from_user = $1) \
             AND ($2::BIGINT IS NULL OR to_user = $2) \
             ORDER BY sent_on, id",
        )
        .bind(filter.from_user.map(EntityId::value))
        .bind(filter.to_user.map(EntityId::value))
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::store("Failed to list messages", e))?;
        rows.iter().map(pg_message_from_row).collect()
    }

    async fn delete_message(&self, id: EntityId) -> AppResult<u64> {
        let result = sqlx::query("DELETE FROM messages WHERE id = $1")
            .bind(id.value())
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::store(format!("Failed to delete message {}", id), e))?;
        Ok(result.rows_affected())
    }
}
