//! HTTP-facing errors.
//!
//! Request-shape failures use a `title`/`description` body. Domain failures
//! are answered by the handlers with endpoint-specific 412 bodies and never
//! reach this type. Engine error text is logged, not returned.

use std::net::SocketAddr;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use berth_common::error::BerthError;
use thiserror::Error;

/// Methods the service answers.
pub const ALLOWED_METHODS: &str = "GET, POST, PUT, DELETE, OPTIONS";

/// Errors returned before or outside domain handling.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The `username` header is required and missing, or is not UTF-8.
    #[error("username required in request header")]
    Unauthorized,

    /// The client does not accept JSON responses.
    #[error("API supports JSON encoded responses only")]
    NotAcceptable,

    /// The method is not one the service answers.
    #[error("unsupported method {0}")]
    MethodNotAllowed(String),

    /// A body that is not JSON, or a missing body where one is required.
    #[error("{0}")]
    UnsupportedMediaType(&'static str),

    /// The body is not valid JSON.
    #[error("could not parse JSON body: {0}")]
    MalformedJson(String),

    /// The engine could not answer a read-only request.
    #[error("container engine request failed")]
    Engine(#[source] BerthError),
}

impl ApiError {
    /// Returns the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Self::UnsupportedMediaType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::MalformedJson(_) => StatusCode::BAD_REQUEST,
            Self::Engine(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    const fn title(&self) -> &'static str {
        match self {
            Self::Unauthorized => "username required in header",
            Self::NotAcceptable => "API supports JSON encoded responses only.",
            Self::MethodNotAllowed(_) => "Unsupported Method in API call",
            Self::UnsupportedMediaType(_) => "API supports JSON encoded requests only.",
            Self::MalformedJson(_) => "Malformed JSON",
            Self::Engine(_) => "Container engine unavailable",
        }
    }
}

impl From<BerthError> for ApiError {
    fn from(err: BerthError) -> Self {
        Self::Engine(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match &self {
            Self::Engine(source) => tracing::error!(error = %source, "engine request failed"),
            _ => tracing::warn!(status = status.as_u16(), reason = %self, "request rejected"),
        }
        let body = serde_json::json!({
            "title": self.title(),
            "description": self.to_string(),
        });
        let mut response = (status, axum::Json(body)).into_response();
        if matches!(self, Self::MethodNotAllowed(_)) {
            let _ = response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static(ALLOWED_METHODS));
        }
        response
    }
}

/// Errors that stop the server from starting or running.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: SocketAddr,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_text_is_not_exposed() {
        let err = ApiError::from(BerthError::engine("list", "socket /var/run/docker.sock refused"));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("docker.sock"));
    }

    #[test]
    fn method_not_allowed_lists_methods() {
        let response = ApiError::MethodNotAllowed("PATCH".into()).into_response();
        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(
            response.headers().get(header::ALLOW).unwrap(),
            ALLOWED_METHODS
        );
    }
}
