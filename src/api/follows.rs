// Follow endpoints: the path user is always the following side

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};
use tracing::info;

use super::extract::Path;
use crate::{
    app_state::AppState,
    core::{Follow, RelationshipKind},
    error::AppError,
    infrastructure::{UserRef, Viewer},
    services::{FollowCounts, WriteStatus},
};

pub async fn follow_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, followed)): Path<(UserRef, UserRef)>,
) -> Result<Json<Follow>, AppError> {
    let following_user = uid.resolve(&viewer)?;
    let followed_user = followed.resolve(&viewer)?;
    let rel = state
        .relationships
        .create(RelationshipKind::Follow, following_user, followed_user)
        .await?;
    info!(
        follower = following_user.value(),
        followed = followed_user.value(),
        "Follow stored"
    );
    Ok(Json(Follow::from(rel)))
}

pub async fn unfollow_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, followed)): Path<(UserRef, UserRef)>,
) -> Result<Json<WriteStatus>, AppError> {
    let following_user = uid.resolve(&viewer)?;
    let followed_user = followed.resolve(&viewer)?;
    let removed = state
        .relationships
        .delete(RelationshipKind::Follow, following_user, followed_user)
        .await?;
    Ok(Json(removed.into()))
}

pub async fn followers_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Follow>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.followers(uid).await?))
}

pub async fn following_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Follow>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.following(uid).await?))
}

pub async fn follow_counts_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<FollowCounts>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.queries.follow_counts(uid).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{uid}/follows/{followed}", post(follow_handler))
        .route(
            "/users/{uid}/unfollows/{followed}",
            delete(unfollow_handler),
        )
        .route("/users/{uid}/followers", get(followers_handler))
        .route("/users/{uid}/following", get(following_handler))
        .route("/users/{uid}/follow-counts", get(follow_counts_handler))
}
