//! Request validation ahead of routing.
//!
//! Checks run in a fixed order and the first failure answers the request:
//! username header missing or not UTF-8 (401), JSON responses accepted
//! (406), method (405), then the body content type (415).

use axum::body::HttpBody;
use axum::extract::{Request, State};
use axum::http::{HeaderMap, Method, header};
use axum::middleware::Next;
use axum::response::Response;
use berth_common::constants::USERNAME_HEADER;

use crate::api::AppState;
use crate::error::ApiError;

const JSON: &str = "application/json";

/// Middleware rejecting requests the API does not serve.
///
/// # Errors
///
/// Returns the [`ApiError`] for the first failed check.
pub async fn require_json(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let body_len = content_length(request.headers())
        .or_else(|| request.body().size_hint().exact());
    check(request.method(), request.headers(), body_len, state.require_username)?;
    Ok(next.run(request).await)
}

/// Validates one request. `body_len` is `None` when the length is unknown.
///
/// # Errors
///
/// Returns the [`ApiError`] for the first failed check.
pub fn check(
    method: &Method,
    headers: &HeaderMap,
    body_len: Option<u64>,
    require_username: bool,
) -> Result<(), ApiError> {
    match headers.get(USERNAME_HEADER) {
        None if require_username => return Err(ApiError::Unauthorized),
        Some(value) if std::str::from_utf8(value.as_bytes()).is_err() => {
            return Err(ApiError::Unauthorized);
        }
        _ => {}
    }
    if !accepts_json(headers) {
        return Err(ApiError::NotAcceptable);
    }
    if ![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS].contains(method) {
        return Err(ApiError::MethodNotAllowed(method.to_string()));
    }

    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.to_ascii_lowercase().contains(JSON));
    let has_body = body_len.is_some_and(|n| n > 0);
    if (*method == Method::GET || *method == Method::POST) && has_body && !is_json {
        return Err(ApiError::UnsupportedMediaType(
            "API supports JSON encoded requests only",
        ));
    }
    if (*method == Method::PUT || *method == Method::DELETE) && !(has_body && is_json) {
        return Err(ApiError::UnsupportedMediaType(
            "API requires JSON encoded requests",
        ));
    }
    Ok(())
}

fn content_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Whether the `Accept` header allows a JSON response. A missing header does.
fn accepts_json(headers: &HeaderMap) -> bool {
    let values: Vec<&str> = headers
        .get_all(header::ACCEPT)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .collect();
    if values.is_empty() {
        return true;
    }
    values
        .iter()
        .flat_map(|v| v.split(','))
        .map(|range| range.split(';').next().unwrap_or_default().trim().to_ascii_lowercase())
        .any(|range| matches!(range.as_str(), "" | "*/*" | "application/*" | JSON))
}
