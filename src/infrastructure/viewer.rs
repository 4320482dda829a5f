// Viewer context - who is making the request, resolved once per request at the boundary
// The session collaborator supplies the authenticated user id in a request header

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, Instrument};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::core::EntityId;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerContext {
    /// None for anonymous requests.
    pub user_id: Option<EntityId>,
    pub request_id: String,
}

impl ViewerContext {
    pub fn anonymous() -> Self {
        Self {
            user_id: None,
            request_id: format!("req-{}", Uuid::new_v4()),
        }
    }

    pub fn authenticated(user_id: EntityId) -> Self {
        Self {
            user_id: Some(user_id),
            ..Self::anonymous()
        }
    }
}

/// Application state that knows which header carries the viewer id.
pub trait HasSessionConfig {
    fn session_config(&self) -> &SessionConfig;
}

/// Builds the request's [`ViewerContext`] and stores it in the request extensions.
pub async fn viewer_context_middleware<T>(
    State(state): State<T>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError>
where
    T: HasSessionConfig + Clone + Send + Sync + 'static,
{
    let user_id = viewer_from_headers(request.headers(), &state.session_config().viewer_header)?;
    let viewer = match user_id {
        Some(id) => ViewerContext::authenticated(id),
        None => ViewerContext::anonymous(),
    };

    let span = tracing::info_span!(
        "request",
        request_id = %viewer.request_id,
        viewer = ?viewer.user_id.map(EntityId::value),
    );
    debug!(parent: &span, method = %request.method(), uri = %request.uri(), "Viewer resolved");

    request.extensions_mut().insert(Arc::new(viewer));
    Ok(next.run(request).instrument(span).await)
}

fn viewer_from_headers(headers: &HeaderMap, header: &str) -> AppResult<Option<EntityId>> {
    let Some(value) = headers.get(header) else {
        return Ok(None);
    };
    let raw = value
        .to_str()
        .map_err(|_| AppError::BadRequest(format!("Header {} is not valid text", header)))?
        .trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<EntityId>()
        .map(Some)
        .map_err(|_| AppError::BadRequest(format!("Header {} must be a numeric user id", header)))
}

/// Handler-side access to the viewer context.
#[derive(Debug, Clone)]
pub struct Viewer(Arc<ViewerContext>);

impl std::ops::Deref for Viewer {
    type Target = ViewerContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> FromRequestParts<S> for Viewer
where
    S: Send + Sync,
{
    type Rejection = AppError;

    fn from_request_parts(
        parts: &mut Parts,
        _state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        // Routes mounted without the middleware still see an anonymous viewer.
        let vc = parts
            .extensions
            .get::<Arc<ViewerContext>>()
            .cloned()
            .unwrap_or_else(|| Arc::new(ViewerContext::anonymous()));

        async move { Ok(Viewer(vc)) }
    }
}

/// A user path segment: a numeric id or `me`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(try_from = "String")]
pub enum UserRef {
    Me,
    Id(EntityId),
}

impl UserRef {
    /// Replace `me` with the viewer's id.
    pub fn resolve(self, viewer: &ViewerContext) -> AppResult<EntityId> {
        match self {
            UserRef::Id(id) => Ok(id),
            UserRef::Me => viewer
                .user_id
                .ok_or_else(|| AppError::Unauthorized("No viewer for 'me'".to_string())),
        }
    }
}

impl TryFrom<String> for UserRef {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        if value == "me" {
            return Ok(UserRef::Me);
        }
        value
            .parse::<EntityId>()
            .map(UserRef::Id)
            .map_err(|_| format!("Invalid user id: {}", value))
    }
}
