// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Request dispatcher
//!
//! Resolves a kind tag to the backend operation, invokes it, and maps the
//! outcome onto the service's error/status model. Kind parsing always
//! happens before any backend call, so tags outside the closed set never
//! reach the wire.

use crate::accounting;
use crate::backend::{AccountingScope, Backend};
use crate::config::{Config, FILTER_ALL};
use crate::error::DispatchError;
use crate::upload::{Delay, UploadPoller};
use crate::vnc::VncProxy;
use cloudview_api::{
    AccountingResponse, ErrorBody, MonitorTarget, PoolMonitoringBody, PoolMonitoringResponse,
    ResourceId, ResourceKind, ResourceMonitoringResponse, TemplateResponse, UploadImageRequest,
    VmLogResponse, VncSessionResponse,
};
use serde_json::{Value, json};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// The dispatch layer: one short-lived backend conversation per call, no
/// shared mutable state across requests
pub struct Dispatcher {
    backend: Arc<dyn Backend>,
    vnc: Arc<dyn VncProxy>,
    delay: Arc<dyn Delay>,
    config: Config,
}

fn parse_kind(tag: &str) -> Result<ResourceKind, DispatchError> {
    ResourceKind::from_str(tag).map_err(|_| DispatchError::UnsupportedKind(tag.to_string()))
}

fn split_meters(meters: &str) -> Vec<String> {
    meters
        .split(',')
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(String::from)
        .collect()
}

impl Dispatcher {
    pub fn new(
        backend: Arc<dyn Backend>,
        vnc: Arc<dyn VncProxy>,
        delay: Arc<dyn Delay>,
        config: Config,
    ) -> Self {
        Self { backend, vnc, delay, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Filter for a pool listing. Group 0 sees everything; other sessions
    /// get the configured filter, and infrastructure pools are unfiltered
    /// by nature.
    fn pool_filter(&self, kind: ResourceKind, gid: Option<i64>) -> i32 {
        let user_flag = match gid {
            Some(0) => FILTER_ALL,
            _ => self.config.pool_filter,
        };

        match kind {
            ResourceKind::Image
            | ResourceKind::VmTemplate
            | ResourceKind::Vm
            | ResourceKind::Vnet => user_flag,
            ResourceKind::Group
            | ResourceKind::Cluster
            | ResourceKind::Host
            | ResourceKind::User
            | ResourceKind::Acl
            | ResourceKind::Datastore
            | ResourceKind::Zone => FILTER_ALL,
        }
    }

    /// Fetch a resource's document; a failed lookup is the 404 path
    async fn retrieve_resource(
        &self,
        kind: ResourceKind,
        id: ResourceId,
    ) -> Result<Value, DispatchError> {
        self.backend
            .resource_info(kind, id)
            .await
            .map_err(|e| DispatchError::NotFound(e.message))
    }

    // ========================================================================
    // Pools and resources
    // ========================================================================

    /// List a pool (200)
    pub async fn list_pool(
        &self,
        kind_tag: &str,
        gid: Option<i64>,
    ) -> Result<Value, DispatchError> {
        let kind = parse_kind(kind_tag)?;
        let filter = self.pool_filter(kind, gid);

        self.backend
            .pool_info(kind, filter)
            .await
            .map_err(|e| DispatchError::Backend(e.message))
    }

    /// Get one resource (200, or 404 when the lookup fails)
    pub async fn get_resource(
        &self,
        kind_tag: &str,
        id: ResourceId,
    ) -> Result<Value, DispatchError> {
        let kind = parse_kind(kind_tag)?;
        self.retrieve_resource(kind, id).await
    }

    /// Get a resource's template string (200)
    pub async fn get_template(
        &self,
        kind_tag: &str,
        id: ResourceId,
    ) -> Result<TemplateResponse, DispatchError> {
        let kind = parse_kind(kind_tag)?;
        self.retrieve_resource(kind, id).await?;

        let template = self
            .backend
            .resource_template(kind, id)
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        Ok(TemplateResponse { template })
    }

    /// Create a resource and return its freshly fetched document (201)
    pub async fn create_resource(
        &self,
        kind_tag: &str,
        template: Value,
    ) -> Result<Value, DispatchError> {
        let kind = parse_kind(kind_tag)?;

        let id = self
            .backend
            .create(kind, &template)
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        self.backend
            .resource_info(kind, id)
            .await
            .map_err(|e| DispatchError::Backend(e.message))
    }

    /// Delete a resource, returning its pre-deletion document (204)
    pub async fn delete_resource(
        &self,
        kind_tag: &str,
        id: ResourceId,
    ) -> Result<Value, DispatchError> {
        let kind = parse_kind(kind_tag)?;
        let resource = self.retrieve_resource(kind, id).await?;

        self.backend
            .delete(kind, id)
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        Ok(resource)
    }

    /// Perform an action, returning the pre-action document (204)
    pub async fn perform_action(
        &self,
        kind_tag: &str,
        id: ResourceId,
        action: Value,
    ) -> Result<Value, DispatchError> {
        let kind = parse_kind(kind_tag)?;
        let resource = self.retrieve_resource(kind, id).await?;

        self.backend
            .perform_action(kind, id, &action)
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        Ok(resource)
    }

    // ========================================================================
    // Monitoring and accounting
    // ========================================================================

    /// Monitoring samples for a whole pool
    ///
    /// Unsupported targets historically answered 200 with an error body;
    /// that stays the default and is logged so the inconsistency with the
    /// single-resource path stays visible.
    pub async fn get_pool_monitoring(
        &self,
        target_tag: &str,
        meters: &str,
    ) -> Result<PoolMonitoringBody, DispatchError> {
        let target = match MonitorTarget::from_str(target_tag) {
            Ok(target) => target,
            Err(_) => {
                if self.config.pool_monitor_unsupported_status == 200 {
                    warn!(
                        target = target_tag,
                        "unsupported pool monitoring target answered with 200 + error body"
                    );
                    return Ok(PoolMonitoringBody::Error(ErrorBody::new(format!(
                        "Monitoring not supported for {target_tag}"
                    ))));
                }
                return Err(DispatchError::UnsupportedMonitoringTarget {
                    target: target_tag.to_string(),
                    status: self.config.pool_monitor_unsupported_status,
                });
            }
        };

        let monitoring = self
            .backend
            .pool_monitoring(target, &split_meters(meters))
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        Ok(PoolMonitoringBody::Data(PoolMonitoringResponse {
            resource: target.to_string(),
            monitoring,
        }))
    }

    /// Monitoring samples for one resource
    pub async fn get_resource_monitoring(
        &self,
        target_tag: &str,
        id: ResourceId,
        meters: &str,
    ) -> Result<ResourceMonitoringResponse, DispatchError> {
        let target = MonitorTarget::from_str(target_tag).map_err(|_| {
            DispatchError::UnsupportedMonitoringTarget {
                target: target_tag.to_string(),
                status: self.config.resource_monitor_unsupported_status,
            }
        })?;

        let monitoring = self
            .backend
            .resource_monitoring(target, id, &split_meters(meters))
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        Ok(ResourceMonitoringResponse {
            resource: target.to_string(),
            id,
            monitoring,
        })
    }

    /// Aggregated accounting series for a user (or a whole group when
    /// `gid` is present)
    pub async fn get_user_accounting(
        &self,
        id: ResourceId,
        start: i64,
        end: i64,
        interval: i64,
        meters: &str,
        gid: Option<i64>,
    ) -> Result<AccountingResponse, DispatchError> {
        let scope = match gid {
            Some(gid) => AccountingScope::Group(gid),
            None => AccountingScope::User(id),
        };

        let records = self
            .backend
            .accounting(scope, start, end)
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        let meters = split_meters(meters);
        let monitoring = accounting::aggregate(&records, start, end, interval, &meters);

        Ok(AccountingResponse { monitoring })
    }

    // ========================================================================
    // Images and VMs
    // ========================================================================

    /// Register an uploaded image, then block until the backend reports it
    /// out of the transitional LOCKED state (201)
    pub async fn upload_image(
        &self,
        request: UploadImageRequest,
    ) -> Result<Value, DispatchError> {
        let UploadImageRequest { image, ds_id, path } = request;

        let mut image = match image {
            Value::Object(map) => map,
            _ => {
                return Err(DispatchError::Backend(
                    "Error parsing image template: expected a JSON object".to_string(),
                ));
            }
        };
        image.insert("PATH".to_string(), json!(path));

        let template = json!({ "image": image, "ds_id": ds_id });

        let id = self
            .backend
            .create(ResourceKind::Image, &template)
            .await
            .map_err(|e| DispatchError::Backend(e.message))?;

        let poller = UploadPoller::new(
            Duration::from_secs(self.config.upload_poll_interval_secs),
            self.config.upload_poll_limit,
            Arc::clone(&self.delay),
        );
        poller.wait_until_ready(self.backend.as_ref(), id).await?;

        self.backend
            .resource_info(ResourceKind::Image, id)
            .await
            .map_err(|e| DispatchError::Backend(e.message))
    }

    /// Start a VNC proxy session for a VM (200)
    pub async fn start_vnc(&self, id: ResourceId) -> Result<VncSessionResponse, DispatchError> {
        let vm = self.retrieve_resource(ResourceKind::Vm, id).await?;

        self.vnc
            .proxy(&vm)
            .await
            .map_err(|e| DispatchError::Backend(e.message))
    }

    /// Fetch a VM's log file; an unreadable file is answered with a
    /// placeholder body, not an error
    pub async fn get_vm_log(&self, id: ResourceId) -> Result<VmLogResponse, DispatchError> {
        self.retrieve_resource(ResourceKind::Vm, id).await?;

        let log_path = self.config.vm_log_dir.join(format!("{id}.log"));
        let vm_log = match tokio::fs::read_to_string(&log_path).await {
            Ok(contents) => contents,
            Err(_) => format!("Log for VM {id} not available"),
        };

        Ok(VmLogResponse { vm_log })
    }
}
