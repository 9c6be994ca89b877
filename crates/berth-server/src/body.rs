//! JSON request documents.

use axum::async_trait;
use axum::body::Bytes;
use axum::extract::{FromRequest, Request};
use berth_common::verbosity;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::ApiError;

/// Request body parsed as JSON into `T`.
///
/// An empty body yields `T::default()`. A document of the wrong shape (an
/// array where an object is expected) also yields the default. A `loglevel`
/// field changes the process-wide verbosity before `T` is built.
#[derive(Debug, Clone, Default)]
pub struct JsonDoc<T>(pub T);

#[async_trait]
impl<S, T> FromRequest<S> for JsonDoc<T>
where
    S: Send + Sync,
    T: DeserializeOwned + Default,
{
    type Rejection = ApiError;

    async fn from_request(request: Request, state: &S) -> Result<Self, Self::Rejection> {
        let bytes = Bytes::from_request(request, state)
            .await
            .map_err(|e| ApiError::MalformedJson(e.body_text()))?;
        if bytes.iter().all(u8::is_ascii_whitespace) {
            tracing::debug!("empty request body");
            return Ok(Self(T::default()));
        }
        let document: Value =
            serde_json::from_slice(&bytes).map_err(|e| ApiError::MalformedJson(e.to_string()))?;
        tracing::debug!(body = %document, "request body");
        let _ = apply_loglevel(&document);

        match serde_json::from_value(document) {
            Ok(value) => Ok(Self(value)),
            Err(e) => {
                tracing::debug!(error = %e, "request body has an unexpected shape, using defaults");
                Ok(Self(T::default()))
            }
        }
    }
}

/// Applies a `loglevel` field, if the document has a usable one.
///
/// Returns whether the level changed.
pub fn apply_loglevel(document: &Value) -> bool {
    let Some(raw) = document.get("loglevel").filter(|v| !v.is_null()) else {
        return false;
    };
    match verbosity::parse(raw) {
        Some(level) => {
            let previous = verbosity::set(level);
            tracing::warn!(%previous, %level, "log level changed");
            previous != level
        }
        None => {
            tracing::warn!(loglevel = %raw, "incorrect loglevel in body, ignored");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use berth_common::request::LaunchRequest;
    use serde_json::json;

    use super::*;

    async fn extract<T: DeserializeOwned + Default>(body: &'static str) -> Result<T, ApiError> {
        let request = axum::http::Request::builder()
            .body(Body::from(body))
            .unwrap();
        JsonDoc::<T>::from_request(request, &()).await.map(|doc| doc.0)
    }

    #[tokio::test]
    async fn empty_body_is_the_default_document() {
        let request: LaunchRequest = extract("").await.unwrap();
        assert_eq!(request, LaunchRequest::default());
    }

    #[tokio::test]
    async fn invalid_json_is_rejected() {
        let err = extract::<LaunchRequest>("{not json").await.unwrap_err();
        assert!(matches!(err, ApiError::MalformedJson(_)));
    }

    #[tokio::test]
    async fn non_object_document_falls_back_to_defaults() {
        let request: LaunchRequest = extract("[1, 2]").await.unwrap();
        assert_eq!(request, LaunchRequest::default());
    }

    #[tokio::test]
    async fn typed_fields_are_read() {
        let request: LaunchRequest = extract(r#"{"image": "nginx:1.27", "cpus": "lots"}"#)
            .await
            .unwrap();
        assert_eq!(request.image.as_deref(), Some("nginx:1.27"));
        assert_eq!(request.cpus, None);
    }

    #[test]
    fn unusable_loglevel_is_ignored() {
        assert!(!apply_loglevel(&json!({"loglevel": "chatty"})));
        assert!(!apply_loglevel(&json!({"loglevel": null})));
        assert!(!apply_loglevel(&json!({"image": "x"})));
    }
}
