//! Typed request bodies, validated once at the HTTP boundary.
//!
//! Every field is optional. A field of the wrong JSON type is treated as
//! absent, so the documented default applies instead of rejecting the body.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::types::{MountSpec, PortMap};

/// Deserializes `T`, mapping a value of the wrong shape to `None`.
fn lenient<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(value).ok())
}

/// Body of `POST /containers`.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct LaunchRequest {
    /// Image reference; the configured default image when absent.
    #[serde(default, deserialize_with = "lenient")]
    pub image: Option<String>,
    /// Delete the container when it stops; `true` when absent.
    #[serde(default, deserialize_with = "lenient")]
    pub remove: Option<bool>,
    /// Command line arguments.
    #[serde(default, deserialize_with = "lenient")]
    pub command: Option<Vec<String>>,
    /// Bind mounts, ignored for the default image.
    #[serde(default, deserialize_with = "lenient")]
    pub mounts: Option<Vec<MountSpec>>,
    /// `host`, `bridge` or `overlay`.
    #[serde(default, deserialize_with = "lenient")]
    pub network_mode: Option<String>,
    /// Port mappings, ignored in host mode.
    #[serde(default, deserialize_with = "lenient")]
    pub ports: Option<PortMap>,
    /// Requested CPU count.
    #[serde(default, deserialize_with = "lenient")]
    pub cpus: Option<f64>,
    /// Requested memory, `<number><b|k|m|g>`.
    #[serde(default, deserialize_with = "lenient")]
    pub memory: Option<String>,
}

/// Container selector fields shared by `PUT` and `DELETE`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct SelectorFields {
    /// Exact container name.
    #[serde(default, rename = "container name", deserialize_with = "lenient")]
    pub name: Option<String>,
    /// Container id, possibly truncated.
    #[serde(default, rename = "container id", deserialize_with = "lenient")]
    pub id: Option<String>,
}

/// How a caller designates one of their containers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Match by exact name.
    Name(String),
    /// Match by id prefix, in either direction.
    Id(String),
}

impl SelectorFields {
    /// Returns the selector; a supplied name takes precedence over an id.
    #[must_use]
    pub fn selector(&self) -> Option<Selector> {
        self.name
            .clone()
            .map(Selector::Name)
            .or_else(|| self.id.clone().map(Selector::Id))
    }
}

/// Body of `PUT /containers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ActionRequest {
    /// `start`, `stop` or `restart`.
    #[serde(default, deserialize_with = "lenient")]
    pub action: Option<String>,
    /// Target container.
    #[serde(flatten)]
    pub target: SelectorFields,
}

/// Body of `DELETE /containers`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteRequest {
    /// Target container.
    #[serde(flatten)]
    pub target: SelectorFields,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_all_defaults() {
        let req: LaunchRequest = serde_json::from_str("{}").unwrap();
        assert_eq!(req, LaunchRequest::default());
    }

    #[test]
    fn wrongly_typed_fields_are_dropped() {
        let req: LaunchRequest = serde_json::from_str(
            r#"{"cpus": "lots", "remove": "yes", "command": "ls", "memory": 12, "image": "nginx"}"#,
        )
        .unwrap();
        assert_eq!(req.cpus, None);
        assert_eq!(req.remove, None);
        assert_eq!(req.command, None);
        assert_eq!(req.memory, None);
        assert_eq!(req.image.as_deref(), Some("nginx"));
    }

    #[test]
    fn integer_cpus_are_accepted() {
        let req: LaunchRequest = serde_json::from_str(r#"{"cpus": 2}"#).unwrap();
        assert_eq!(req.cpus, Some(2.0));
    }

    #[test]
    fn name_wins_over_id() {
        let req: ActionRequest = serde_json::from_str(
            r#"{"action": "stop", "container name": "bob1", "container id": "a1b2"}"#,
        )
        .unwrap();
        assert_eq!(req.target.selector(), Some(Selector::Name("bob1".into())));
    }

    #[test]
    fn id_is_used_when_name_is_missing() {
        let req: DeleteRequest = serde_json::from_str(r#"{"container id": "a1b2"}"#).unwrap();
        assert_eq!(req.target.selector(), Some(Selector::Id("a1b2".into())));
    }

    #[test]
    fn no_selector_without_name_or_id() {
        let req: DeleteRequest = serde_json::from_str(r#"{"loglevel": 10}"#).unwrap();
        assert_eq!(req.target.selector(), None);
    }
}
