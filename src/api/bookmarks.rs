// Bookmark endpoints

use axum::{
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};

use super::extract::Path;
use crate::{
    app_state::AppState,
    core::{EntityId, Relationship, RelationshipKind},
    error::AppError,
    infrastructure::{UserRef, Viewer},
    services::WriteStatus,
};

pub async fn bookmark_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<Relationship>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(
        state
            .relationships
            .create(RelationshipKind::Bookmark, uid, tid)
            .await?,
    ))
}

pub async fn unbookmark_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<WriteStatus>, AppError> {
    let uid = uid.resolve(&viewer)?;
    let removed = state
        .relationships
        .delete(RelationshipKind::Bookmark, uid, tid)
        .await?;
    Ok(Json(removed.into()))
}

pub async fn bookmarks_by_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Relationship>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(
        state
            .queries
            .by_actor(RelationshipKind::Bookmark, uid)
            .await?,
    ))
}

pub async fn bookmarks_on_tuit_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
) -> Result<Json<Vec<Relationship>>, AppError> {
    Ok(Json(
        state
            .queries
            .by_target(RelationshipKind::Bookmark, tid)
            .await?,
    ))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{uid}/bookmarks", get(bookmarks_by_user_handler))
        .route("/tuits/{tid}/bookmarks", get(bookmarks_on_tuit_handler))
        .route(
            "/users/{uid}/bookmarks/{tid}",
            post(bookmark_handler).delete(unbookmark_handler),
        )
}
