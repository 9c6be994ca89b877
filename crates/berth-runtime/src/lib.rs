//! Container engine adapter and launch orchestration for berth.
//!
//! [`engine::ContainerEngine`] is the narrow seam to the container engine;
//! [`service::ContainerService`] composes the decision engine from
//! `berth-core` with an engine to launch, list, act on and delete
//! containers on behalf of a caller.

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod backend;
pub mod engine;
pub mod info;
pub mod launch;
pub mod locks;
pub mod service;
