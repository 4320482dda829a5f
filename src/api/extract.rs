// Request extractors whose rejections use the JSON error body

use axum::{extract::FromRequestParts, http::request::Parts};
use serde::de::DeserializeOwned;
use std::ops::Deref;
use tracing::debug;

use crate::error::AppError;

/// Path parameters. A segment that does not parse is a 400 with the usual error body.
#[derive(Debug, Clone, Copy)]
pub struct Path<T>(pub T);

impl<T, S> FromRequestParts<S> for Path<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        match axum::extract::Path::<T>::from_request_parts(parts, state).await {
            Ok(axum::extract::Path(value)) => Ok(Path(value)),
            Err(rejection) => {
                debug!(uri = %parts.uri, error = %rejection, "Rejected path parameters");
                Err(AppError::BadRequest(rejection.body_text()))
            }
        }
    }
}

impl<T> Deref for Path<T> {
    type Target = T;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}
