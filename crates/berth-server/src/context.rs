//! Per-request logging context.
//!
//! Every request runs inside a span carrying the caller identity, the client
//! address and a request id. The id is taken from `X-Request-Id` when the
//! client sends one and is echoed on the response.

use std::net::SocketAddr;

use axum::async_trait;
use axum::extract::{ConnectInfo, FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderName, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use berth_common::constants::{REQUEST_ID_HEADER, USERNAME_HEADER};
use berth_common::types::CallerId;
use tracing::Instrument;

/// Identity and correlation data for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Caller identity from the `username` header.
    pub caller: CallerId,
    /// Client address, first forwarded hop when present.
    pub client: String,
    /// Correlation id.
    pub request_id: String,
}

impl RequestContext {
    /// Derives the context from request headers and the peer address.
    #[must_use]
    pub fn from_headers(headers: &HeaderMap, peer: Option<SocketAddr>) -> Self {
        let username = username(headers);
        if username.is_none() {
            tracing::warn!("no username in header");
        }
        let request_id = headers
            .get(REQUEST_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|s| !s.is_empty())
            .map_or_else(|| uuid::Uuid::new_v4().to_string(), String::from);
        let client = headers
            .get("x-forwarded-for")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(String::from)
            .or_else(|| peer.map(|p| p.ip().to_string()))
            .unwrap_or_else(|| "unknown".to_string());
        Self {
            caller: CallerId::from_header(username),
            client,
            request_id,
        }
    }
}

/// The `username` header decoded as UTF-8.
///
/// `None` when the header is absent or its bytes are not UTF-8; the guard
/// rejects the latter before any handler runs.
pub(crate) fn username(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(USERNAME_HEADER)
        .and_then(|v| std::str::from_utf8(v.as_bytes()).ok())
}

/// Middleware running the request inside its logging span.
pub async fn request_context(mut request: Request, next: Next) -> Response {
    let peer = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|info| info.0);
    let ctx = RequestContext::from_headers(request.headers(), peer);
    let span = tracing::info_span!(
        "request",
        caller = %ctx.caller,
        client = %ctx.client,
        request_id = %ctx.request_id,
        method = %request.method(),
        path = %request.uri().path(),
    );
    let request_id = ctx.request_id.clone();
    let _ = request.extensions_mut().insert(ctx);

    let mut response = next.run(request).instrument(span).await;
    if let Ok(value) = HeaderValue::from_str(&request_id) {
        let _ = response
            .headers_mut()
            .insert(HeaderName::from_static(REQUEST_ID_HEADER), value);
    }
    response
}

/// Extracts the caller identity for a handler.
#[derive(Debug, Clone)]
pub struct Caller(pub CallerId);

#[async_trait]
impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = parts.extensions.get::<RequestContext>().map_or_else(
            || {
                CallerId::from_header(username(&parts.headers))
            },
            |ctx| ctx.caller.clone(),
        );
        Ok(Self(caller))
    }
}

#[cfg(test)]
mod tests {
    use std::net::{IpAddr, Ipv4Addr};

    use super::*;

    #[test]
    fn supplied_request_id_is_reused() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(REQUEST_ID_HEADER, HeaderValue::from_static("req-42"));
        let _ = headers.insert(USERNAME_HEADER, HeaderValue::from_static("alice"));
        let ctx = RequestContext::from_headers(&headers, None);
        assert_eq!(ctx.request_id, "req-42");
        assert_eq!(ctx.caller.as_str(), "alice");
        assert_eq!(ctx.client, "unknown");
    }

    #[test]
    fn missing_username_is_system_and_forwarded_hop_wins() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            "x-forwarded-for",
            HeaderValue::from_static("203.0.113.7, 10.0.0.1"),
        );
        let peer = SocketAddr::new(IpAddr::V4(Ipv4Addr::new(10, 0, 0, 1)), 4242);
        let ctx = RequestContext::from_headers(&headers, Some(peer));
        assert_eq!(ctx.caller.as_str(), "system");
        assert_eq!(ctx.client, "203.0.113.7");
        assert_eq!(uuid::Uuid::parse_str(&ctx.request_id).unwrap().get_version_num(), 4);
    }

    #[test]
    fn non_ascii_username_is_kept_verbatim() {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(
            USERNAME_HEADER,
            HeaderValue::from_bytes("jérôme".as_bytes()).unwrap(),
        );
        let ctx = RequestContext::from_headers(&headers, None);
        assert_eq!(ctx.caller.as_str(), "jérôme");
    }
}
