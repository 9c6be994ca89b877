//! Caller-scoped container operations over a [`ContainerEngine`].

use std::net::IpAddr;
use std::sync::Arc;

use berth_common::config::BerthConfig;
use berth_common::error::{BerthError, Result};
use berth_common::request::Selector;
use berth_common::types::{CallerId, ContainerAction, ContainerRecord, MountSpec};
use berth_core::port::PortAllocator;
use berth_core::resolver;
use berth_core::resources::ResourcePolicy;

use crate::engine::ContainerEngine;
use crate::info::{ContainerInfo, ImageInfo};
use crate::locks::CallerLocks;

/// Status reported for a container the engine removed as part of an action.
const REMOVED: &str = "removed";

/// Operator settings the service applies to every request.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Image that gets host networking, a probed port and default mounts.
    pub default_image: String,
    /// Maximum live containers per caller.
    pub max_per_user: usize,
    /// Program placed before `--port N` for the default image.
    pub launcher: Option<String>,
    /// CPU and memory ceilings.
    pub policy: ResourcePolicy,
    /// Port range probed for default-image launches.
    pub ports: PortAllocator,
    /// Bind mounts attached to default-image launches.
    pub default_mounts: Vec<MountSpec>,
    /// Host name used in application URLs.
    pub advertised_host: String,
    /// Hold a per-caller lock from quota check to container creation.
    pub serialize_launches: bool,
}

impl ServiceSettings {
    /// Builds settings from configuration and the discovered host identity.
    ///
    /// # Errors
    ///
    /// Returns an error if the memory ceiling cannot be parsed.
    pub fn from_config(
        config: &BerthConfig,
        advertised_host: impl Into<String>,
        host_ip: IpAddr,
        default_mounts: Vec<MountSpec>,
    ) -> Result<Self> {
        Ok(Self {
            default_image: config.default_image.clone(),
            max_per_user: config.max_per_user,
            launcher: config.launcher.clone(),
            policy: ResourcePolicy::from_config(config)?,
            ports: PortAllocator::new(host_ip, config.min_port, config.max_port),
            default_mounts,
            advertised_host: advertised_host.into(),
            serialize_launches: config.serialize_launches,
        })
    }
}

/// Container operations on behalf of callers.
///
/// Holds no container state: every call re-reads the engine listing.
pub struct ContainerService {
    pub(crate) engine: Arc<dyn ContainerEngine>,
    pub(crate) settings: ServiceSettings,
    pub(crate) locks: Option<CallerLocks>,
}

impl std::fmt::Debug for ContainerService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerService")
            .field("engine", &self.engine.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl ContainerService {
    /// Creates a service over `engine`.
    #[must_use]
    pub fn new(engine: Arc<dyn ContainerEngine>, settings: ServiceSettings) -> Self {
        let locks = settings.serialize_launches.then(CallerLocks::new);
        Self {
            engine,
            settings,
            locks,
        }
    }

    /// The settings this service applies.
    #[must_use]
    pub const fn settings(&self) -> &ServiceSettings {
        &self.settings
    }

    /// The underlying engine.
    #[must_use]
    pub fn engine(&self) -> &Arc<dyn ContainerEngine> {
        &self.engine
    }

    /// Lists the caller's containers, in engine order.
    ///
    /// A container removed between listing and inspection is skipped.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    pub async fn list(&self, caller: &CallerId) -> Result<Vec<ContainerInfo>> {
        let records = self.engine.list_containers().await?;
        let mut infos = Vec::new();
        for record in records.iter().filter(|r| caller.owns(&r.name)) {
            match self.engine.inspect(&record.name).await {
                Ok(details) => {
                    infos.push(ContainerInfo::project(&details, &self.settings.advertised_host));
                }
                Err(BerthError::NotFound { .. }) => {
                    tracing::debug!(name = %record.name, "container vanished before inspection");
                }
                Err(e) => return Err(e),
            }
        }
        tracing::info!(%caller, count = infos.len(), "listed containers");
        Ok(infos)
    }

    /// Lists the images on the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    pub async fn images(&self) -> Result<Vec<ImageInfo>> {
        let images = self.engine.list_images().await?;
        Ok(images.iter().map(ImageInfo::from).collect())
    }

    /// Resolves `selector` to one of the caller's containers.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::NotFound`] when no owned container matches, or an
    /// engine error from the listing.
    pub async fn resolve(&self, caller: &CallerId, selector: &Selector) -> Result<ContainerRecord> {
        let records = self.engine.list_containers().await?;
        resolver::resolve(caller, selector, &records)
            .cloned()
            .ok_or_else(|| BerthError::NotFound {
                kind: "container",
                id: match selector {
                    Selector::Name(v) | Selector::Id(v) => v.clone(),
                },
            })
    }

    /// Applies a lifecycle action and returns the refreshed container info.
    ///
    /// Stopping an auto-remove container deletes it; the info then reflects
    /// the container as last inspected with status `removed`.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::UnsupportedAction`] for a missing or unknown
    /// action, [`BerthError::NotFound`] when the selector resolves to nothing,
    /// or the engine error that made the action fail.
    pub async fn act(
        &self,
        caller: &CallerId,
        action: Option<&str>,
        selector: Option<&Selector>,
    ) -> Result<ContainerInfo> {
        let action = action
            .and_then(ContainerAction::parse)
            .ok_or_else(|| BerthError::UnsupportedAction {
                action: action.unwrap_or_default().to_string(),
            })?;
        let selector = selector.ok_or_else(|| missing_selector(caller))?;
        let record = self.resolve(caller, selector).await?;
        let before = self.engine.inspect(&record.name).await?;

        let outcome = match action {
            ContainerAction::Start => self.engine.start(&record.name).await,
            ContainerAction::Stop => self.engine.stop(&record.name).await,
            ContainerAction::Restart => self.engine.restart(&record.name).await,
        };
        if let Err(e) = outcome {
            tracing::error!(%caller, %action, name = %record.name, error = %e, "container action failed");
            return Err(e);
        }
        tracing::info!(%caller, %action, name = %record.name, id = %record.short_id, "container action applied");

        let details = match self.engine.inspect(&record.name).await {
            Ok(details) => details,
            Err(BerthError::NotFound { .. }) => {
                let mut gone = before;
                gone.status = REMOVED.to_string();
                gone
            }
            Err(e) => return Err(e),
        };
        Ok(ContainerInfo::project(&details, &self.settings.advertised_host))
    }

    /// Force-removes one of the caller's containers.
    ///
    /// # Errors
    ///
    /// Returns [`BerthError::NotFound`] when the selector resolves to nothing,
    /// or the engine error from the removal.
    pub async fn delete(
        &self,
        caller: &CallerId,
        selector: Option<&Selector>,
    ) -> Result<ContainerRecord> {
        let selector = selector.ok_or_else(|| missing_selector(caller))?;
        let record = self.resolve(caller, selector).await?;
        if let Err(e) = self.engine.remove(&record.name, true).await {
            tracing::error!(%caller, name = %record.name, error = %e, "container removal failed");
            return Err(e);
        }
        tracing::info!(%caller, name = %record.name, id = %record.short_id, "container deleted");
        Ok(record)
    }
}

fn missing_selector(caller: &CallerId) -> BerthError {
    tracing::debug!(%caller, "no container name or id supplied");
    BerthError::NotFound {
        kind: "container",
        id: String::new(),
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use berth_common::types::ContainerDetails;

    use super::*;
    use crate::backend::memory::MemoryEngine;

    fn service(engine: Arc<MemoryEngine>) -> ContainerService {
        let settings = ServiceSettings {
            default_image: "base:latest".into(),
            max_per_user: 3,
            launcher: None,
            policy: ResourcePolicy::new(2.0, "4g").unwrap(),
            ports: PortAllocator::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 1, 2),
            default_mounts: Vec::new(),
            advertised_host: "node1".into(),
            serialize_launches: true,
        };
        ContainerService::new(engine, settings)
    }

    fn container(name: &str, id: &str) -> ContainerDetails {
        ContainerDetails {
            name: name.into(),
            short_id: id.into(),
            status: "running".into(),
            image: "base:latest".into(),
            ..Default::default()
        }
    }

    fn seeded() -> Arc<MemoryEngine> {
        let engine = Arc::new(MemoryEngine::new());
        engine.insert(container("alice", "aaaa1111")).unwrap();
        engine.insert(container("bob", "bbbb2222")).unwrap();
        engine.insert(container("bob1", "bbbb3333")).unwrap();
        engine
    }

    #[tokio::test]
    async fn list_returns_only_owned_containers() {
        let svc = service(seeded());
        let names: Vec<_> = svc
            .list(&CallerId::new("bob"))
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, ["bob", "bob1"]);
    }

    #[tokio::test]
    async fn act_stops_an_owned_container() {
        let svc = service(seeded());
        let info = svc
            .act(
                &CallerId::new("bob"),
                Some("STOP"),
                Some(&Selector::Id("bbbb3333ffff".into())),
            )
            .await
            .unwrap();
        assert_eq!(info.name, "bob1");
        assert_eq!(info.details.status, "exited");
    }

    #[tokio::test]
    async fn act_rejects_unknown_action_before_resolving() {
        let svc = service(seeded());
        let err = svc
            .act(
                &CallerId::new("bob"),
                Some("kill"),
                Some(&Selector::Name("bob".into())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BerthError::UnsupportedAction { .. }));
    }

    #[tokio::test]
    async fn act_never_touches_other_callers_containers() {
        let svc = service(seeded());
        let err = svc
            .act(
                &CallerId::new("bob"),
                Some("stop"),
                Some(&Selector::Name("alice".into())),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, BerthError::NotFound { .. }));
    }

    #[tokio::test]
    async fn delete_removes_running_container() {
        let engine = seeded();
        let svc = service(Arc::clone(&engine));
        let record = svc
            .delete(&CallerId::new("alice"), Some(&Selector::Id("aaaa".into())))
            .await
            .unwrap();
        assert_eq!(record.name, "alice");
        assert_eq!(engine.list_containers().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn delete_without_selector_is_not_found() {
        let svc = service(seeded());
        let err = svc.delete(&CallerId::new("alice"), None).await.unwrap_err();
        assert!(matches!(err, BerthError::NotFound { .. }));
    }
}
