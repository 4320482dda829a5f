// User and per-author tuit endpoints

use axum::{extract::State, response::Json, routing::get, Router};

use super::extract::Path;
use crate::{
    app_state::AppState,
    core::{NewTuit, NewUser, Tuit, User, UserUpdate},
    error::AppError,
    infrastructure::{UserRef, Viewer},
    services::WriteStatus,
};

pub async fn list_users_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<User>>, AppError> {
    Ok(Json(state.content.list_users().await?))
}

pub async fn create_user_handler(
    State(state): State<AppState>,
    Json(user): Json<NewUser>,
) -> Result<Json<User>, AppError> {
    Ok(Json(state.content.create_user(&user).await?))
}

pub async fn delete_all_users_handler(
    State(state): State<AppState>,
) -> Result<Json<WriteStatus>, AppError> {
    Ok(Json(state.content.delete_all_users().await?))
}

pub async fn get_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Option<User>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.find_user(uid).await?))
}

pub async fn update_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
    Json(update): Json<UserUpdate>,
) -> Result<Json<WriteStatus>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.update_user(uid, &update).await?))
}

pub async fn delete_user_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<WriteStatus>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.delete_user(uid).await?))
}

pub async fn list_user_tuits_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Tuit>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.tuits_by_author(uid).await?))
}

pub async fn create_user_tuit_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
    Json(tuit): Json<NewTuit>,
) -> Result<Json<Tuit>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.create_tuit(uid, &tuit).await?))
}

pub async fn delete_user_tuits_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<WriteStatus>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.delete_tuits_by_author(uid).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route(
            "/users",
            get(list_users_handler)
                .post(create_user_handler)
                .delete(delete_all_users_handler),
        )
        .route(
            "/users/{uid}",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .route(
            "/users/{uid}/tuits",
            get(list_user_tuits_handler)
                .post(create_user_tuit_handler)
                .delete(delete_user_tuits_handler),
        )
}
