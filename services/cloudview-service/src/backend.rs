// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cloud manager RPC backend abstraction
//!
//! The dispatcher only ever talks to the [`Backend`] trait. The concrete
//! [`RpcBackend`] speaks the manager's JSON-over-HTTP RPC endpoint; tests
//! substitute an in-process mock. Backend failures carry the backend's own
//! message and are never retried here — status mapping and policy live in
//! the dispatcher.

use async_trait::async_trait;
use cloudview_api::{MonitorTarget, ResourceId, ResourceKind};
use serde::Deserialize;
use serde_json::{Value, json};
use std::collections::HashMap;
use thiserror::Error;

/// A backend call failed; the message is whatever the backend reported
#[derive(Error, Debug, Clone)]
#[error("{message}")]
pub struct BackendError {
    pub message: String,
}

impl BackendError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

pub type BackendResult<T> = Result<T, BackendError>;

/// One interval during which a VM occupied a given state, with the meter
/// values sampled for it. `end == 0` means the VM is still running.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryRecord {
    pub start: i64,
    pub end: i64,
    #[serde(default)]
    pub meters: HashMap<String, i64>,
}

/// Image state snapshot used by the upload readiness poll
#[derive(Debug, Clone, Deserialize)]
pub struct ImageStatus {
    /// Backend state string; "LOCKED" while the transfer is in progress
    pub state: String,
    /// Number of VMs currently using the image
    pub running_vms: i64,
}

/// Whose VM history an accounting request covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccountingScope {
    /// One user's VMs
    User(ResourceId),
    /// Every VM in a group, across owners
    Group(i64),
}

/// The operations the dispatcher needs from the cloud manager
#[async_trait]
pub trait Backend: Send + Sync {
    /// Fetch a pool listing for `kind`, filtered by ownership
    async fn pool_info(&self, kind: ResourceKind, filter: i32) -> BackendResult<Value>;

    /// Fetch one resource's document
    async fn resource_info(&self, kind: ResourceKind, id: ResourceId) -> BackendResult<Value>;

    /// Render one resource's template as a string
    async fn resource_template(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> BackendResult<String>;

    /// Allocate a resource from a template, returning its new id
    async fn create(&self, kind: ResourceKind, template: &Value) -> BackendResult<ResourceId>;

    /// Delete a resource
    async fn delete(&self, kind: ResourceKind, id: ResourceId) -> BackendResult<()>;

    /// Submit an action (start, stop, chown, ...) against a resource
    async fn perform_action(
        &self,
        kind: ResourceKind,
        id: ResourceId,
        action: &Value,
    ) -> BackendResult<()>;

    /// Fetch monitoring series for every resource of a target kind
    async fn pool_monitoring(
        &self,
        target: MonitorTarget,
        meters: &[String],
    ) -> BackendResult<Value>;

    /// Fetch monitoring series for one resource
    async fn resource_monitoring(
        &self,
        target: MonitorTarget,
        id: ResourceId,
        meters: &[String],
    ) -> BackendResult<Value>;

    /// Fetch raw VM history records for the whole time range in one call
    async fn accounting(
        &self,
        scope: AccountingScope,
        start: i64,
        end: i64,
    ) -> BackendResult<Vec<HistoryRecord>>;

    /// Fetch the state snapshot of an image (upload poll path)
    async fn image_status(&self, id: ResourceId) -> BackendResult<ImageStatus>;
}

// ============================================================================
// Concrete RPC client
// ============================================================================

/// RPC response envelope: exactly one of `result` / `error` is set
#[derive(Debug, Deserialize)]
struct RpcEnvelope {
    result: Option<Value>,
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    message: String,
}

/// Backend client speaking the manager's JSON RPC endpoint
pub struct RpcBackend {
    client: reqwest::Client,
    endpoint: String,
}

impl RpcBackend {
    /// Create a client for the RPC endpoint at `base_url`
    pub fn new(base_url: &str) -> BackendResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .user_agent("cloudview/0.1.0")
            .build()
            .map_err(|e| BackendError::new(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: format!("{}/rpc", base_url.trim_end_matches('/')),
        })
    }

    /// Issue one RPC call and unwrap the result/error envelope
    async fn call(&self, method: &str, params: Value) -> BackendResult<Value> {
        let request = json!({ "method": method, "params": params });

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| BackendError::new(format!("RPC transport failure: {e}")))?;

        let envelope: RpcEnvelope = response
            .json()
            .await
            .map_err(|e| BackendError::new(format!("Malformed RPC response: {e}")))?;

        match (envelope.result, envelope.error) {
            (_, Some(error)) => Err(BackendError::new(error.message)),
            (Some(result), None) => Ok(result),
            (None, None) => Err(BackendError::new("Empty RPC response")),
        }
    }
}

fn parse_result<T: serde::de::DeserializeOwned>(method: &str, value: Value) -> BackendResult<T> {
    serde_json::from_value(value)
        .map_err(|e| BackendError::new(format!("Unexpected {method} result shape: {e}")))
}

#[async_trait]
impl Backend for RpcBackend {
    async fn pool_info(&self, kind: ResourceKind, filter: i32) -> BackendResult<Value> {
        self.call(&format!("{kind}pool.info"), json!([filter])).await
    }

    async fn resource_info(&self, kind: ResourceKind, id: ResourceId) -> BackendResult<Value> {
        self.call(&format!("{kind}.info"), json!([id])).await
    }

    async fn resource_template(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> BackendResult<String> {
        let method = format!("{kind}.template");
        let value = self.call(&method, json!([id])).await?;
        parse_result(&method, value)
    }

    async fn create(&self, kind: ResourceKind, template: &Value) -> BackendResult<ResourceId> {
        let method = format!("{kind}.allocate");
        let value = self.call(&method, json!([template])).await?;
        parse_result(&method, value)
    }

    async fn delete(&self, kind: ResourceKind, id: ResourceId) -> BackendResult<()> {
        self.call(&format!("{kind}.delete"), json!([id])).await?;
        Ok(())
    }

    async fn perform_action(
        &self,
        kind: ResourceKind,
        id: ResourceId,
        action: &Value,
    ) -> BackendResult<()> {
        self.call(&format!("{kind}.action"), json!([id, action])).await?;
        Ok(())
    }

    async fn pool_monitoring(
        &self,
        target: MonitorTarget,
        meters: &[String],
    ) -> BackendResult<Value> {
        self.call(&format!("{target}pool.monitoring"), json!([meters])).await
    }

    async fn resource_monitoring(
        &self,
        target: MonitorTarget,
        id: ResourceId,
        meters: &[String],
    ) -> BackendResult<Value> {
        self.call(&format!("{target}.monitoring"), json!([id, meters])).await
    }

    async fn accounting(
        &self,
        scope: AccountingScope,
        start: i64,
        end: i64,
    ) -> BackendResult<Vec<HistoryRecord>> {
        let params = match scope {
            AccountingScope::User(id) => {
                json!([id, { "start_time": start, "end_time": end }])
            }
            AccountingScope::Group(gid) => {
                // Group scope asks for every visible VM and lets the
                // backend constrain by group.
                json!([crate::config::FILTER_ALL,
                       { "start_time": start, "end_time": end, "group": gid }])
            }
        };

        let value = self.call("vmpool.accounting", params).await?;
        parse_result("vmpool.accounting", value)
    }

    async fn image_status(&self, id: ResourceId) -> BackendResult<ImageStatus> {
        let value = self.call("image.status", json!([id])).await?;
        parse_result("image.status", value)
    }
}
