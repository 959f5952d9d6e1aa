//! Bearer authentication gate.
//!
//! Wraps the whole router. Requests to an exempt path (the agent card by
//! default) pass straight through; every other request must carry
//! `Authorization: Bearer <API_PASSWORD>` exactly.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{header::AUTHORIZATION, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::config::AuthConfig;

/// Whether a request with this path and `Authorization` value may pass.
pub fn is_authorized(auth: &AuthConfig, path: &str, authorization: Option<&[u8]>) -> bool {
    if auth.is_exempt(path) {
        return true;
    }
    authorization == Some(auth.expected_header().as_bytes())
}

/// The 401 response sent on denial.
pub fn unauthorized() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({
            "error": "Unauthorized",
            "message": "Invalid or missing API password"
        })),
    )
        .into_response()
}

/// Middleware enforcing [`is_authorized`]. Approved requests and their
/// responses are passed through untouched.
pub async fn require_bearer(
    State(auth): State<Arc<AuthConfig>>,
    request: Request,
    next: Next,
) -> Response {
    let allowed = is_authorized(
        &auth,
        request.uri().path(),
        request.headers().get(AUTHORIZATION).map(|v| v.as_bytes()),
    );

    if !allowed {
        tracing::debug!(path = %request.uri().path(), "Rejected unauthenticated request");
        return unauthorized();
    }

    next.run(request).await
}
