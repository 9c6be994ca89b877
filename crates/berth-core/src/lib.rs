//! # berth-core
//!
//! The container-launch decision engine. Everything here is independent of
//! the HTTP transport and of any particular container engine:
//!
//! - [`port`]: finds a free TCP port on the host by liveness probing.
//! - [`naming`]: ownership by name prefix, quota checks and per-caller names.
//! - [`resources`]: CPU and memory clamping against operator ceilings.
//! - [`resolver`]: maps a name or truncated id to one owned container.
//! - [`mounts`]: discovers the host paths mounted into default-image containers.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod mounts;
pub mod naming;
pub mod port;
pub mod resolver;
pub mod resources;
