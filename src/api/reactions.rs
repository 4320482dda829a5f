// Like and dislike endpoints. Every write goes through the toggle engine so the
// tuit's stats always match the relationship rows.

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get},
    Router,
};

use super::extract::Path;
use crate::{
    app_state::AppState,
    core::{EntityId, Relationship, RelationshipKind},
    error::AppError,
    infrastructure::{UserRef, Viewer},
    services::ToggleOutcome,
};

use RelationshipKind::{Dislike, Like};

pub async fn toggle_like_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<ToggleOutcome>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.toggles.toggle_like(uid, tid).await?))
}

pub async fn toggle_dislike_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<ToggleOutcome>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.toggles.toggle_dislike(uid, tid).await?))
}

async fn set_reaction(
    state: &AppState,
    viewer: &Viewer,
    kind: RelationshipKind,
    uid: UserRef,
    tid: EntityId,
    active: bool,
) -> Result<Json<ToggleOutcome>, AppError> {
    let uid = uid.resolve(viewer)?;
    Ok(Json(state.toggles.set_reaction(kind, uid, tid, active).await?))
}

pub async fn like_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<ToggleOutcome>, AppError> {
    set_reaction(&state, &viewer, Like, uid, tid, true).await
}

pub async fn unlike_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<ToggleOutcome>, AppError> {
    set_reaction(&state, &viewer, Like, uid, tid, false).await
}

pub async fn dislike_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<ToggleOutcome>, AppError> {
    set_reaction(&state, &viewer, Dislike, uid, tid, true).await
}

pub async fn undislike_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<ToggleOutcome>, AppError> {
    set_reaction(&state, &viewer, Dislike, uid, tid, false).await
}

pub async fn find_like_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<Option<Relationship>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.find_one(Like, uid, tid).await?))
}

pub async fn find_dislike_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, tid)): Path<(UserRef, EntityId)>,
) -> Result<Json<Option<Relationship>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.find_one(Dislike, uid, tid).await?))
}

pub async fn likes_by_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Relationship>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.by_actor(Like, uid).await?))
}

pub async fn dislikes_by_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Relationship>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.by_actor(Dislike, uid).await?))
}

pub async fn likes_on_tuit_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
) -> Result<Json<Vec<Relationship>>, AppError> {
    Ok(Json(state.queries.by_target(Like, tid).await?))
}

pub async fn dislikes_on_tuit_handler(
    State(state): State<AppState>,
    Path(tid): Path<EntityId>,
) -> Result<Json<Vec<Relationship>>, AppError> {
    Ok(Json(state.queries.by_target(Dislike, tid).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users/{uid}/likes/{tid}",
            get(find_like_handler)
                .put(toggle_like_handler)
                .post(like_handler),
        )
        .route("/users/{uid}/unlikes/{tid}", delete(unlike_handler))
        .route("/users/{uid}/likes", get(likes_by_user_handler))
        .route("/tuits/{tid}/likes", get(likes_on_tuit_handler))
        .route(
            "/users/{uid}/dislikes/{tid}",
            get(find_dislike_handler)
                .put(toggle_dislike_handler)
                .post(dislike_handler),
        )
        .route(
            "/users/{uid}/undislikes/{tid}",
            delete(undislike_handler),
        )
        .route("/users/{uid}/dislikes", get(dislikes_by_user_handler))
        .route("/tuits/{tid}/dislikes", get(dislikes_on_tuit_handler))
}
