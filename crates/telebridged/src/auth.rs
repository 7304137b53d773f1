//! Bus API access token
//!
//! When `bus.auth_token` is set every route except `/health` expects
//! `Authorization: Bearer <token>`.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ApiError;

const HEALTH_PATH: &str = "/health";

/// Token clients must present on the bus API
#[derive(Clone)]
pub struct BusToken(Arc<[u8]>);

impl BusToken {
    pub fn new(token: impl AsRef<str>) -> Self {
        Self(Arc::from(token.as_ref().as_bytes()))
    }

    /// Compare without exiting early on the first differing byte
    pub fn matches(&self, provided: &[u8]) -> bool {
        if provided.len() != self.0.len() {
            return false;
        }
        self.0
            .iter()
            .zip(provided)
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

fn bearer(headers: &HeaderMap) -> Option<&[u8]> {
    headers
        .get(header::AUTHORIZATION)?
        .as_bytes()
        .strip_prefix(b"Bearer ")
}

/// Layer body for [`crate::with_auth`]
pub async fn require_bearer(
    State(token): State<BusToken>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    if request.uri().path() == HEALTH_PATH {
        return Ok(next.run(request).await);
    }

    match bearer(request.headers()) {
        Some(provided) if token.matches(provided) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(path = %request.uri().path(), "Rejected bus token");
            Err(ApiError::Unauthorized("invalid bus token".to_string()))
        }
        None => Err(ApiError::Unauthorized(
            "bearer token required".to_string(),
        )),
    }
}
