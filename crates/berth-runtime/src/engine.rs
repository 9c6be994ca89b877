//! The container engine seam.

use async_trait::async_trait;
use berth_common::error::Result;
use berth_common::types::{ContainerDetails, ContainerRecord, ImageRecord, LaunchSpec};

/// Primitives consumed from the container engine.
///
/// Implementations hold no authoritative state of their own beyond what the
/// engine reports; callers re-read the listing for every decision.
#[async_trait]
pub trait ContainerEngine: Send + Sync {
    /// Short backend name for logs.
    fn name(&self) -> &'static str;

    /// Lists every container, running or not, in engine order.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    async fn list_containers(&self) -> Result<Vec<ContainerRecord>>;

    /// Inspects one container by name or id.
    ///
    /// # Errors
    ///
    /// Returns `NotFound` for an unknown container, or an engine error.
    async fn inspect(&self, name_or_id: &str) -> Result<ContainerDetails>;

    /// Creates and starts a container from a launch specification.
    ///
    /// # Errors
    ///
    /// Returns an error if creation or start fails.
    async fn run(&self, spec: &LaunchSpec) -> Result<ContainerRecord>;

    /// Starts a stopped container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the start.
    async fn start(&self, name_or_id: &str) -> Result<()>;

    /// Stops a running container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the stop.
    async fn stop(&self, name_or_id: &str) -> Result<()>;

    /// Restarts a container.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the restart.
    async fn restart(&self, name_or_id: &str) -> Result<()>;

    /// Removes a container; `force` removes it even while running.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine rejects the removal.
    async fn remove(&self, name_or_id: &str, force: bool) -> Result<()>;

    /// Lists images available on the host.
    ///
    /// # Errors
    ///
    /// Returns an error if the engine cannot be queried.
    async fn list_images(&self) -> Result<Vec<ImageRecord>>;
}
