// Direct message endpoints

use axum::{
    extract::State,
    response::Json,
    routing::{delete, get, post},
    Router,
};

use super::extract::Path;
use crate::{
    app_state::AppState,
    core::{EntityId, Message, NewMessage},
    error::AppError,
    infrastructure::{UserRef, Viewer},
    services::WriteStatus,
};

pub async fn messages_sent_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Message>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.messages_sent(uid).await?))
}

pub async fn messages_received_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path(uid): Path<UserRef>,
) -> Result<Json<Vec<Message>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    Ok(Json(state.content.messages_received(uid).await?))
}

/// Messages `uid` sent to `receiver`.
pub async fn messages_sent_to_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, receiver)): Path<(UserRef, UserRef)>,
) -> Result<Json<Vec<Message>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    let receiver = receiver.resolve(&viewer)?;
    Ok(Json(state.content.messages_between(uid, receiver).await?))
}

/// Messages `uid` received from `sender`.
pub async fn messages_received_from_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, sender)): Path<(UserRef, UserRef)>,
) -> Result<Json<Vec<Message>>, AppError> {
    let uid = uid.resolve(&viewer)?;
    let sender = sender.resolve(&viewer)?;
    Ok(Json(state.content.messages_between(sender, uid).await?))
}

pub async fn send_message_handler(
    State(state): State<AppState>,
    viewer: Viewer,
    Path((uid, receiver)): Path<(UserRef, UserRef)>,
    Json(body): Json<NewMessage>,
) -> Result<Json<Message>, AppError> {
    let uid = uid.resolve(&viewer)?;
    let receiver = receiver.resolve(&viewer)?;
    Ok(Json(state.content.send_message(uid, receiver, &body).await?))
}

pub async fn delete_message_handler(
    State(state): State<AppState>,
    Path(mid): Path<EntityId>,
) -> Result<Json<WriteStatus>, AppError> {
    Ok(Json(state.content.delete_message(mid).await?))
}

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/users/{uid}/messagesSent", get(messages_sent_handler))
        .route(
            "/users/{uid}/messagesReceived",
            get(messages_received_handler),
        )
        .route(
            "/users/{uid}/messagesSent/{receiver}",
            get(messages_sent_to_handler),
        )
        .route(
            "/users/{uid}/messagesReceived/{sender}",
            get(messages_received_from_handler),
        )
        .route(
            "/users/{uid}/messages/{receiver}",
            post(send_message_handler),
        )
        .route("/messages/{mid}", delete(delete_message_handler))
}
