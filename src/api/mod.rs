// HTTP API - axum routers for every resource, nested under /api

pub mod bookmarks;
pub mod extract;
pub mod follows;
pub mod messages;
pub mod reactions;
pub mod tuits;
pub mod users;

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, Method},
    middleware::from_fn_with_state,
    response::Json,
    routing::get,
    Router,
};
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::warn;

use crate::{
    app_state::AppState, config::Config, error::AppError,
    infrastructure::viewer_context_middleware,
};

pub async fn health_handler(State(state): State<AppState>) -> Result<Json<Value>, AppError> {
    state.db.health_check().await?;
    Ok(Json(json!({
        "status": "ok",
        "backend": state.db.backend(),
    })))
}

/// Build the full application router.
pub fn create_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/health", get(health_handler))
        .merge(users::routes())
        .merge(tuits::routes())
        .merge(reactions::routes())
        .merge(follows::routes())
        .merge(bookmarks::routes())
        .merge(messages::routes())
        .layer(from_fn_with_state(state.clone(), viewer_context_middleware::<AppState>))
        .with_state(state.clone());

    Router::new()
        .nest("/api", api)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(&state.config)),
        )
}

fn cors_layer(config: &Config) -> CorsLayer {
    let Some(origin) = config.server.cors_origin.as_deref() else {
        return CorsLayer::permissive();
    };

    let (origin, viewer_header) = match (
        origin.parse::<HeaderValue>(),
        config.session.viewer_header.parse::<HeaderName>(),
    ) {
        (Ok(origin), Ok(viewer_header)) => (origin, viewer_header),
        _ => {
            warn!(origin, "Invalid CORS configuration, allowing any origin");
            return CorsLayer::permissive();
        }
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_credentials(true)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE, viewer_header])
}
