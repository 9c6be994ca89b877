//! # berth-server
//!
//! The HTTP face of berth. Requests pass a guard (username header, accepted
//! media types, method, body content type), get a per-request logging
//! context, and reach handlers that call into
//! [`berth_runtime::service::ContainerService`].

#![cfg_attr(test, allow(clippy::expect_used, clippy::unwrap_used))]

pub mod api;
pub mod body;
pub mod context;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod host;
pub mod server;
