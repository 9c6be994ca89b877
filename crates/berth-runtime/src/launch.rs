//! The launch orchestrator.
//!
//! A launch runs through a fixed sequence: quota check, image defaults,
//! network placement (probed port and default mounts, or caller ports and
//! mounts), CPU and memory clamping, naming, the engine run, and finally a
//! fresh inspection projected for the caller. Quota and port failures stop
//! the sequence before the engine is asked to create anything.

use berth_common::constants::PORT_FLAG;
use berth_common::error::Result;
use berth_common::request::LaunchRequest;
use berth_common::types::{CallerId, LaunchSpec, NetworkMode};
use berth_core::naming;

use crate::info::ContainerInfo;
use crate::service::ContainerService;

impl ContainerService {
    /// Launches a container for `caller` and returns its info.
    ///
    /// # Errors
    ///
    /// - [`QuotaExceeded`] when the caller is at the per-user limit.
    /// - [`PortExhausted`] when a default-image launch finds no free port.
    /// - An engine error when creation, start or inspection fails. The
    ///   container may exist anyway; callers should re-list.
    ///
    /// [`QuotaExceeded`]: berth_common::error::BerthError::QuotaExceeded
    /// [`PortExhausted`]: berth_common::error::BerthError::PortExhausted
    pub async fn launch(&self, caller: &CallerId, request: &LaunchRequest) -> Result<ContainerInfo> {
        let _serialized = match &self.locks {
            Some(locks) => Some(locks.acquire(caller).await),
            None => None,
        };

        let records = self.engine.list_containers().await?;
        let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
        let owned = naming::check_quota(caller, names.iter().copied(), self.settings.max_per_user)?;

        let spec = self.build_spec(caller, request, &names).await?;
        tracing::debug!(%caller, owned, ?spec, "launching container");

        let record = match self.engine.run(&spec).await {
            Ok(record) => record,
            Err(e) => {
                tracing::error!(%caller, name = %spec.name, image = %spec.image, error = %e, "container launch failed");
                return Err(e);
            }
        };
        tracing::info!(%caller, name = %record.name, id = %record.short_id, image = %spec.image, "container launched");

        let details = self.engine.inspect(&record.name).await?;
        Ok(ContainerInfo::project(&details, &self.settings.advertised_host))
    }

    /// Assembles the launch specification for one request.
    async fn build_spec(
        &self,
        caller: &CallerId,
        request: &LaunchRequest,
        existing: &[&str],
    ) -> Result<LaunchSpec> {
        let settings = &self.settings;
        let image = request
            .image
            .clone()
            .unwrap_or_else(|| settings.default_image.clone());
        let mut spec = LaunchSpec::for_image(image);
        spec.remove = request.remove.unwrap_or(true);

        if spec.image == settings.default_image {
            let port = settings.ports.allocate().await?;
            spec.network_mode = NetworkMode::Host;
            spec.mounts.clone_from(&settings.default_mounts);
            let mut command: Vec<String> = settings.launcher.iter().cloned().collect();
            command.extend([PORT_FLAG.to_string(), port.to_string()]);
            command.extend(request.command.iter().flatten().cloned());
            spec.command = Some(command);
        } else {
            spec.network_mode = NetworkMode::parse_or_default(request.network_mode.as_deref());
            if spec.network_mode != NetworkMode::Host {
                spec.ports = request.ports.clone().unwrap_or_default();
            }
            spec.mounts = request.mounts.clone().unwrap_or_default();
            spec.command.clone_from(&request.command);
        }

        spec.nano_cpus = settings.policy.nano_cpus(request.cpus);
        spec.mem_limit = settings.policy.mem_limit(request.memory.as_deref());
        spec.name = naming::next_name(caller, existing);
        Ok(spec)
    }
}
