//! Bearer-token guard for the elevated routes.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::server::AppState;

/// Extract bearer token from Authorization header
fn extract_bearer_token(req: &Request) -> Option<&str> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())?;

    // Support both "Bearer" and "bearer" (case insensitive)
    let (scheme, token) = auth_header.split_once(' ')?;
    if scheme.eq_ignore_ascii_case("Bearer") && !token.is_empty() {
        Some(token.trim())
    } else {
        None
    }
}

/// Compare without short-circuiting on the first differing byte.
fn tokens_match(given: &str, expected: &str) -> bool {
    let (a, b) = (given.as_bytes(), expected.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Returns 401 unless the request carries the configured API token.
///
/// With no token configured every request is rejected.
pub async fn require_token(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let Some(expected) = state.api_token.as_deref() else {
        tracing::debug!("Rejecting {}: no API token configured", req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    };

    let token = extract_bearer_token(&req).ok_or(StatusCode::UNAUTHORIZED)?;
    if !tokens_match(token, expected) {
        tracing::debug!("Rejecting {}: invalid API token", req.uri().path());
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(req).await)
}
