use std::sync::Arc;

use crate::{
    config::{Config, SessionConfig},
    error::AppResult,
    infrastructure::{initialize_database, DatabaseInterface, HasSessionConfig, IdGenerator},
    services::{
        ContentService, CounterProjection, EngagementToggleEngine, QueryService, RelationshipStore,
    },
};

/// Everything a handler needs, built once at startup and shared through axum state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Arc<dyn DatabaseInterface>,
    pub relationships: RelationshipStore,
    pub counters: CounterProjection,
    pub toggles: EngagementToggleEngine,
    pub queries: QueryService,
    pub content: ContentService,
}

impl AppState {
    pub async fn new(config: Config) -> AppResult<Self> {
        let db = initialize_database(&config.database).await?;
        Ok(Self::with_database(config, db))
    }

    /// Wire services around an already initialized database.
    pub fn with_database(config: Config, db: Arc<dyn DatabaseInterface>) -> Self {
        let ids = Arc::new(IdGenerator::new(config.server.id_shard));
        let relationships = RelationshipStore::new(db.clone());
        let counters = CounterProjection::new(db.clone());
        let toggles =
            EngagementToggleEngine::new(db.clone(), relationships.clone(), counters.clone());
        let queries = QueryService::new(relationships.clone());
        let content = ContentService::new(db.clone(), ids);

        Self {
            config: Arc::new(config),
            db,
            relationships,
            counters,
            toggles,
            queries,
            content,
        }
    }
}

impl HasSessionConfig for AppState {
    fn session_config(&self) -> &SessionConfig {
        &self.config.session
    }
}
