// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Integration tests for the request dispatcher against a mock backend
//!
//! The mock records every backend invocation so tests can assert not just
//! on outcomes but on whether the backend was reached at all — unsupported
//! kind tags must be rejected before any RPC happens.

use async_trait::async_trait;
use cloudview_api::{
    MonitorTarget, PoolMonitoringBody, ResourceId, ResourceKind, UploadImageRequest,
    VncSessionResponse,
};
use cloudview_service::backend::{
    AccountingScope, Backend, BackendError, BackendResult, HistoryRecord, ImageStatus,
};
use cloudview_service::config::{Config, FILTER_ALL};
use cloudview_service::dispatch::Dispatcher;
use cloudview_service::error::DispatchError;
use cloudview_service::upload::NoDelay;
use cloudview_service::vnc::{VncError, VncProxy};
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

// ============================================================================
// Mock collaborators
// ============================================================================

#[derive(Default)]
struct MockBackend {
    /// Every backend invocation, in order, as "method(args)" strings
    calls: Mutex<Vec<String>>,
    /// Document served by `resource_info`; `None` makes lookups fail
    resource: Option<Value>,
    /// When set, `delete` fails with this message
    delete_error: Option<String>,
    /// History records served by `accounting`
    records: Vec<HistoryRecord>,
    /// Image state snapshots served in order; the last one repeats
    image_states: Vec<ImageStatus>,
    image_state_cursor: Mutex<usize>,
}

impl MockBackend {
    fn log(&self, call: String) {
        self.calls.lock().unwrap().push(call);
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn pool_info(&self, kind: ResourceKind, filter: i32) -> BackendResult<Value> {
        self.log(format!("pool_info({kind}, {filter})"));
        Ok(json!({ "pool": kind.to_string() }))
    }

    async fn resource_info(&self, kind: ResourceKind, id: ResourceId) -> BackendResult<Value> {
        self.log(format!("resource_info({kind}, {id})"));
        self.resource
            .clone()
            .ok_or_else(|| BackendError::new(format!("Error getting {kind} [{id}].")))
    }

    async fn resource_template(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> BackendResult<String> {
        self.log(format!("resource_template({kind}, {id})"));
        Ok(format!("NAME = \"{kind}-{id}\""))
    }

    async fn create(&self, kind: ResourceKind, _template: &Value) -> BackendResult<ResourceId> {
        self.log(format!("create({kind})"));
        Ok(42)
    }

    async fn delete(&self, kind: ResourceKind, id: ResourceId) -> BackendResult<()> {
        self.log(format!("delete({kind}, {id})"));
        match &self.delete_error {
            Some(message) => Err(BackendError::new(message.clone())),
            None => Ok(()),
        }
    }

    async fn perform_action(
        &self,
        kind: ResourceKind,
        id: ResourceId,
        _action: &Value,
    ) -> BackendResult<()> {
        self.log(format!("perform_action({kind}, {id})"));
        Ok(())
    }

    async fn pool_monitoring(
        &self,
        target: MonitorTarget,
        meters: &[String],
    ) -> BackendResult<Value> {
        self.log(format!("pool_monitoring({target}, {})", meters.join("+")));
        Ok(json!([]))
    }

    async fn resource_monitoring(
        &self,
        target: MonitorTarget,
        id: ResourceId,
        meters: &[String],
    ) -> BackendResult<Value> {
        self.log(format!(
            "resource_monitoring({target}, {id}, {})",
            meters.join("+")
        ));
        Ok(json!([]))
    }

    async fn accounting(
        &self,
        scope: AccountingScope,
        start: i64,
        end: i64,
    ) -> BackendResult<Vec<HistoryRecord>> {
        self.log(format!("accounting({scope:?}, {start}, {end})"));
        Ok(self.records.clone())
    }

    async fn image_status(&self, id: ResourceId) -> BackendResult<ImageStatus> {
        self.log(format!("image_status({id})"));
        let mut cursor = self.image_state_cursor.lock().unwrap();
        let index = (*cursor).min(self.image_states.len().saturating_sub(1));
        *cursor += 1;
        self.image_states
            .get(index)
            .cloned()
            .ok_or_else(|| BackendError::new("no image state configured"))
    }
}

struct StubVnc;

#[async_trait]
impl VncProxy for StubVnc {
    async fn proxy(&self, _vm: &Value) -> Result<VncSessionResponse, VncError> {
        Ok(VncSessionResponse {
            host: "proxy.test".to_string(),
            port: 29876,
            token: "tok".to_string(),
            password: None,
        })
    }
}

fn dispatcher(backend: Arc<MockBackend>, config: Config) -> Dispatcher {
    Dispatcher::new(backend, Arc::new(StubVnc), Arc::new(NoDelay), config)
}

fn record(start: i64, end: i64, meters: &[(&str, i64)]) -> HistoryRecord {
    HistoryRecord {
        start,
        end,
        meters: meters
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect::<HashMap<_, _>>(),
    }
}

fn locked(running_vms: i64) -> ImageStatus {
    ImageStatus { state: "LOCKED".to_string(), running_vms }
}

fn ready() -> ImageStatus {
    ImageStatus { state: "READY".to_string(), running_vms: 0 }
}

fn upload_request() -> UploadImageRequest {
    UploadImageRequest {
        image: json!({ "NAME": "test-image" }),
        ds_id: 1,
        path: "/var/tmp/upload-1".to_string(),
    }
}

// ============================================================================
// Unsupported kind tags
// ============================================================================

#[tokio::test]
async fn unsupported_kind_is_rejected_before_the_backend() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 7 })),
        ..Default::default()
    });
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    assert!(matches!(
        dispatcher.list_pool("widget", None).await,
        Err(DispatchError::UnsupportedKind(tag)) if tag == "widget"
    ));
    assert!(matches!(
        dispatcher.get_resource("widget", 1).await,
        Err(DispatchError::UnsupportedKind(_))
    ));
    assert!(matches!(
        dispatcher.get_template("widget", 1).await,
        Err(DispatchError::UnsupportedKind(_))
    ));
    assert!(matches!(
        dispatcher.create_resource("widget", json!({})).await,
        Err(DispatchError::UnsupportedKind(_))
    ));
    assert!(matches!(
        dispatcher.delete_resource("widget", 1).await,
        Err(DispatchError::UnsupportedKind(_))
    ));
    assert!(matches!(
        dispatcher.perform_action("widget", 1, json!({})).await,
        Err(DispatchError::UnsupportedKind(_))
    ));

    assert!(
        backend.calls().is_empty(),
        "unsupported kinds must never reach the backend, got {:?}",
        backend.calls()
    );
}

#[tokio::test]
async fn every_supported_kind_dispatches() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 7 })),
        ..Default::default()
    });
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    for tag in [
        "group",
        "cluster",
        "host",
        "image",
        "vmtemplate",
        "vm",
        "vnet",
        "user",
        "acl",
        "datastore",
        "zone",
    ] {
        let pool = dispatcher.list_pool(tag, None).await.unwrap();
        assert_eq!(pool["pool"], tag);
    }
}

// ============================================================================
// Resource lifecycle
// ============================================================================

#[tokio::test]
async fn get_then_delete_returns_the_pre_image() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 7, "NAME": "web-1" })),
        ..Default::default()
    });
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let fetched = dispatcher.get_resource("vm", 7).await.unwrap();
    assert_eq!(fetched["NAME"], "web-1");

    let deleted = dispatcher.delete_resource("vm", 7).await.unwrap();
    assert_eq!(deleted["NAME"], "web-1");

    assert_eq!(
        backend.calls(),
        vec![
            "resource_info(vm, 7)",
            "resource_info(vm, 7)",
            "delete(vm, 7)"
        ]
    );
}

#[tokio::test]
async fn delete_of_a_missing_resource_is_not_found() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let err = dispatcher.delete_resource("vm", 7).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));

    // The lookup failed, so no delete was issued.
    assert_eq!(backend.calls(), vec!["resource_info(vm, 7)"]);
}

#[tokio::test]
async fn failed_delete_surfaces_the_backend_message() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 7 })),
        delete_error: Some("VM is in state ACTIVE".to_string()),
        ..Default::default()
    });
    let dispatcher = dispatcher(backend, Config::default());

    let err = dispatcher.delete_resource("vm", 7).await.unwrap_err();
    assert!(matches!(err, DispatchError::Backend(message) if message == "VM is in state ACTIVE"));
}

#[tokio::test]
async fn create_returns_the_fresh_document() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 42, "NAME": "new-vnet" })),
        ..Default::default()
    });
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let created = dispatcher
        .create_resource("vnet", json!({ "NAME": "new-vnet" }))
        .await
        .unwrap();
    assert_eq!(created["ID"], 42);

    assert_eq!(
        backend.calls(),
        vec!["create(vnet)", "resource_info(vnet, 42)"]
    );
}

// ============================================================================
// Pool filter
// ============================================================================

#[tokio::test]
async fn group_zero_always_lists_everything() {
    let config = Config { pool_filter: -1, ..Config::default() };
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), config);

    dispatcher.list_pool("vm", Some(0)).await.unwrap();
    dispatcher.list_pool("vm", Some(100)).await.unwrap();

    assert_eq!(
        backend.calls(),
        vec![
            format!("pool_info(vm, {FILTER_ALL})"),
            "pool_info(vm, -1)".to_string()
        ]
    );
}

#[tokio::test]
async fn infrastructure_pools_ignore_the_session_filter() {
    let config = Config { pool_filter: -1, ..Config::default() };
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), config);

    dispatcher.list_pool("host", Some(100)).await.unwrap();

    assert_eq!(backend.calls(), vec![format!("pool_info(host, {FILTER_ALL})")]);
}

// ============================================================================
// Monitoring
// ============================================================================

#[tokio::test]
async fn pool_monitoring_unsupported_target_soft_fails_by_default() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let body = dispatcher
        .get_pool_monitoring("datastore", "CPU")
        .await
        .unwrap();

    match body {
        PoolMonitoringBody::Error(error) => {
            assert_eq!(error.error.message, "Monitoring not supported for datastore");
        }
        PoolMonitoringBody::Data(_) => panic!("expected the error body"),
    }
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn pool_monitoring_unsupported_target_hard_fails_when_configured() {
    let config = Config {
        pool_monitor_unsupported_status: 403,
        ..Config::default()
    };
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(backend, config);

    let err = dispatcher
        .get_pool_monitoring("datastore", "CPU")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        DispatchError::UnsupportedMonitoringTarget { status: 403, .. }
    ));
}

#[tokio::test]
async fn resource_monitoring_unsupported_target_is_forbidden() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let err = dispatcher
        .get_resource_monitoring("datastore", 7, "CPU")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        DispatchError::UnsupportedMonitoringTarget { status: 403, .. }
    ));
    assert!(backend.calls().is_empty());
}

#[tokio::test]
async fn monitoring_targets_parse_case_insensitively() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let body = dispatcher
        .get_resource_monitoring("VM", 7, "CPU,MEMORY")
        .await
        .unwrap();

    assert_eq!(body.resource, "vm");
    assert_eq!(body.id, 7);
    assert_eq!(
        backend.calls(),
        vec!["resource_monitoring(vm, 7, CPU+MEMORY)"]
    );
}

// ============================================================================
// Accounting
// ============================================================================

#[tokio::test]
async fn accounting_aggregates_running_records_across_buckets() {
    let backend = Arc::new(MockBackend {
        records: vec![record(0, 0, &[("CPU", 2)])],
        ..Default::default()
    });
    let dispatcher = dispatcher(backend, Config::default());

    let response = dispatcher
        .get_user_accounting(5, 0, 30, 10, "CPU", None)
        .await
        .unwrap();

    assert_eq!(response.monitoring["CPU"], vec![(0, 2), (10, 2), (20, 2)]);
}

#[tokio::test]
async fn accounting_counts_overlap_not_just_the_start_bucket() {
    let backend = Arc::new(MockBackend {
        records: vec![record(5, 15, &[("CPU", 4)])],
        ..Default::default()
    });
    let dispatcher = dispatcher(backend, Config::default());

    let response = dispatcher
        .get_user_accounting(5, 0, 20, 10, "CPU", None)
        .await
        .unwrap();

    assert_eq!(response.monitoring["CPU"], vec![(0, 4), (10, 4)]);
}

#[tokio::test]
async fn accounting_group_scope_is_forwarded() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    dispatcher
        .get_user_accounting(5, 0, 10, 10, "CPU", Some(3))
        .await
        .unwrap();

    assert_eq!(backend.calls(), vec!["accounting(Group(3), 0, 10)"]);
}

// ============================================================================
// Upload poll
// ============================================================================

#[tokio::test]
async fn upload_with_running_vms_returns_without_polling_again() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 42, "STATE": "LOCKED" })),
        image_states: vec![locked(1)],
        ..Default::default()
    });
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    dispatcher.upload_image(upload_request()).await.unwrap();

    // create, one state check (locked but in use => ready), final fetch
    assert_eq!(
        backend.calls(),
        vec![
            "create(image)",
            "image_status(42)",
            "resource_info(image, 42)"
        ]
    );
}

#[tokio::test]
async fn upload_polls_until_the_image_unlocks() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 42, "STATE": "READY" })),
        image_states: vec![locked(0), locked(0), ready()],
        ..Default::default()
    });
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let image = dispatcher.upload_image(upload_request()).await.unwrap();
    assert_eq!(image["STATE"], "READY");

    let status_checks = backend
        .calls()
        .iter()
        .filter(|c| c.starts_with("image_status"))
        .count();
    assert_eq!(status_checks, 3);
}

#[tokio::test]
async fn bounded_upload_poll_reports_a_stalled_image() {
    let config = Config { upload_poll_limit: Some(2), ..Config::default() };
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 42 })),
        image_states: vec![locked(0)],
        ..Default::default()
    });
    let dispatcher = dispatcher(backend, config);

    let err = dispatcher.upload_image(upload_request()).await.unwrap_err();
    assert!(matches!(err, DispatchError::UploadStalled { id: 42, .. }));
}

#[tokio::test]
async fn upload_rejects_a_non_object_image_template() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(Arc::clone(&backend), Config::default());

    let request = UploadImageRequest {
        image: json!("not an object"),
        ds_id: 1,
        path: "/var/tmp/upload-1".to_string(),
    };

    let err = dispatcher.upload_image(request).await.unwrap_err();
    assert!(matches!(err, DispatchError::Backend(_)));
    assert!(backend.calls().is_empty());
}

// ============================================================================
// VNC and logs
// ============================================================================

#[tokio::test]
async fn vnc_for_a_missing_vm_is_not_found() {
    let backend = Arc::new(MockBackend::default());
    let dispatcher = dispatcher(backend, Config::default());

    let err = dispatcher.start_vnc(7).await.unwrap_err();
    assert!(matches!(err, DispatchError::NotFound(_)));
}

#[tokio::test]
async fn vnc_session_comes_from_the_proxy_collaborator() {
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 7 })),
        ..Default::default()
    });
    let dispatcher = dispatcher(backend, Config::default());

    let session = dispatcher.start_vnc(7).await.unwrap();
    assert_eq!(session.host, "proxy.test");
}

#[tokio::test]
async fn unreadable_vm_log_is_replaced_with_a_placeholder() {
    let config = Config {
        vm_log_dir: std::path::PathBuf::from("/nonexistent/cloudview-test"),
        ..Config::default()
    };
    let backend = Arc::new(MockBackend {
        resource: Some(json!({ "ID": 7 })),
        ..Default::default()
    });
    let dispatcher = dispatcher(backend, config);

    let log = dispatcher.get_vm_log(7).await.unwrap();
    assert_eq!(log.vm_log, "Log for VM 7 not available");
}
