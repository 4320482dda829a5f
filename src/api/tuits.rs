// Tuit endpoints

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, put},
    Router,
};

use super::extract::Path;
use crate::{
    app_state::AppState,
    core::{EntityId, Tuit, TuitStats, TuitUpdate},
    error::AppError,
    services::WriteStatus,
};

pub async fn list_tuits_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<Tuit>>, AppError> {
    Ok(Json(state.content.list_tuits().await?))
}

pub async fn get_tuit_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
) -> Result<Json<Option<Tuit>>, AppError> {
    Ok(Json(state.content.find_tuit(tid).await?))
}

pub async fn update_tuit_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
    Json(update): Json<TuitUpdate>,
) -> Result<Json<WriteStatus>, AppError> {
    Ok(Json(state.content.update_tuit(tid, &update).await?))
}

pub async fn delete_tuit_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
) -> Result<Json<WriteStatus>, AppError> {
    Ok(Json(state.content.delete_tuit(tid).await?))
}

pub async fn delete_tuits_by_content_handler(
    State(state): State<AppState>,
    Path(content): Path<String>,
) -> Result<Json<WriteStatus>, AppError> {
    Ok(Json(state.content.delete_tuits_by_content(&content).await?))
}

/// Zeroes the stats; relationship rows are untouched.
pub async fn reset_stats_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
) -> Result<Json<TuitStats>, AppError> {
    Ok(Json(state.counters.reset_all(tid).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/tuits", get(list_tuits_handler))
        .route(
            "/tuits/{tid}",
            get(get_tuit_handler)
                .put(update_tuit_handler)
                .delete(delete_tuit_handler),
        )
        .route(
            "/tuits/content/{content}",
            delete(delete_tuits_by_content_handler),
        )
        .route("/tuits/{tid}/reset", put(reset_stats_handler))
}
