//! End-to-end launch and lifecycle scenarios against the in-memory engine.

#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::net::{IpAddr, Ipv4Addr, TcpListener};
use std::sync::Arc;

use berth_common::error::BerthError;
use berth_common::request::{DeleteRequest, LaunchRequest, Selector};
use berth_common::types::{CallerId, ContainerDetails};
use berth_core::port::PortAllocator;
use berth_core::resources::ResourcePolicy;
use berth_runtime::backend::memory::MemoryEngine;
use berth_runtime::engine::ContainerEngine;
use berth_runtime::service::{ContainerService, ServiceSettings};

fn free_port() -> u16 {
    let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, 0)).unwrap();
    listener.local_addr().unwrap().port()
}

fn service(engine: &Arc<MemoryEngine>, max_per_user: usize) -> ContainerService {
    let port = free_port();
    let settings = ServiceSettings {
        default_image: "base:latest".into(),
        max_per_user,
        launcher: None,
        policy: ResourcePolicy::new(2.0, "4g").unwrap(),
        ports: PortAllocator::new(IpAddr::V4(Ipv4Addr::LOCALHOST), port, port.saturating_add(1)),
        default_mounts: Vec::new(),
        advertised_host: "node1.example.com".into(),
        serialize_launches: true,
    };
    ContainerService::new(Arc::clone(engine) as Arc<dyn ContainerEngine>, settings)
}

fn existing(name: &str, short_id: &str) -> ContainerDetails {
    ContainerDetails {
        name: name.into(),
        short_id: short_id.into(),
        status: "running".into(),
        image: "base:latest".into(),
        ..Default::default()
    }
}

#[tokio::test]
async fn first_default_launch_is_named_after_the_caller() {
    let engine = Arc::new(MemoryEngine::new());
    let svc = service(&engine, 3);

    let info = svc
        .launch(&CallerId::new("alice"), &LaunchRequest::default())
        .await
        .unwrap();

    assert_eq!(info.name, "alice");
    let details = engine.inspect("alice").await.unwrap();
    assert_eq!(details.args.first().map(String::as_str), Some("--port"));
    let port: u16 = details.args[1].parse().unwrap();
    assert_eq!(info.application_url, Some(format!("node1.example.com:{port}")));
    assert!(details.published_ports.is_empty());
    assert_eq!(details.nano_cpus, 1_000_000_000);
    assert_eq!(details.memory_bytes, 512 * 1024 * 1024);
}

#[tokio::test]
async fn default_image_forces_host_networking() {
    let engine = Arc::new(MemoryEngine::new());
    let svc = service(&engine, 3);
    let request: LaunchRequest =
        serde_json::from_str(r#"{"network_mode": "bridge", "ports": {"80": 8080}}"#).unwrap();

    let info = svc.launch(&CallerId::new("alice"), &request).await.unwrap();

    let details = engine.inspect(&info.name).await.unwrap();
    assert!(details.published_ports.is_empty());
}

#[tokio::test]
async fn next_launch_takes_the_following_suffix() {
    let engine = Arc::new(MemoryEngine::new());
    engine.insert(existing("bob", "b0b000000001")).unwrap();
    engine.insert(existing("bob1", "b0b000000002")).unwrap();
    let svc = service(&engine, 3);

    let info = svc
        .launch(&CallerId::new("bob"), &LaunchRequest::default())
        .await
        .unwrap();

    assert_eq!(info.name, "bob2");
}

#[tokio::test]
async fn quota_rejects_without_calling_the_engine() {
    let engine = Arc::new(MemoryEngine::new());
    engine.insert(existing("carol", "c0000000001")).unwrap();
    engine.insert(existing("carol1", "c0000000002")).unwrap();
    let svc = service(&engine, 2);

    let err = svc
        .launch(&CallerId::new("carol"), &LaunchRequest::default())
        .await
        .unwrap_err();

    assert!(matches!(err, BerthError::QuotaExceeded { limit: 2, .. }));
    assert_eq!(engine.run_count(), 0);
    assert_eq!(engine.list_containers().await.unwrap().len(), 2);
}

#[tokio::test]
async fn delete_by_truncated_id_echoes_full_identity() {
    let engine = Arc::new(MemoryEngine::new());
    engine.insert(existing("dan", "a1b2c3d4")).unwrap();
    let svc = service(&engine, 3);
    let request: DeleteRequest = serde_json::from_str(r#"{"container id": "a1b2"}"#).unwrap();

    let record = svc
        .delete(&CallerId::new("dan"), request.target.selector().as_ref())
        .await
        .unwrap();

    assert_eq!(record.name, "dan");
    assert_eq!(record.short_id, "a1b2c3d4");
    assert!(engine.list_containers().await.unwrap().is_empty());
}

#[tokio::test]
async fn longer_supplied_id_still_matches() {
    let engine = Arc::new(MemoryEngine::new());
    engine.insert(existing("erin", "a1b2c3d4")).unwrap();
    let svc = service(&engine, 3);
    let request: DeleteRequest =
        serde_json::from_str(r#"{"container id": "a1b2c3d4e5f6a7b8"}"#).unwrap();

    let record = svc
        .delete(&CallerId::new("erin"), request.target.selector().as_ref())
        .await
        .unwrap();
    assert_eq!(record.name, "erin");
}

#[tokio::test]
async fn foreign_container_is_never_deleted() {
    let engine = Arc::new(MemoryEngine::new());
    engine.insert(existing("frank", "f00000000001")).unwrap();
    let svc = service(&engine, 3);
    let request: DeleteRequest = serde_json::from_str(r#"{"container id": "f000"}"#).unwrap();

    let err = svc
        .delete(&CallerId::new("grace"), request.target.selector().as_ref())
        .await
        .unwrap_err();
    assert!(matches!(err, BerthError::NotFound { .. }));
    assert_eq!(engine.list_containers().await.unwrap().len(), 1);
}

#[tokio::test]
async fn stopping_an_auto_remove_container_reports_removed() {
    let engine = Arc::new(MemoryEngine::new());
    let svc = service(&engine, 3);
    let launched = svc
        .launch(&CallerId::new("heidi"), &LaunchRequest::default())
        .await
        .unwrap();

    let selector = Selector::Name(launched.name.clone());
    let info = svc
        .act(&CallerId::new("heidi"), Some("stop"), Some(&selector))
        .await
        .unwrap();

    assert_eq!(info.details.status, "removed");
    assert!(engine.list_containers().await.unwrap().is_empty());
}
