// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cloudview API trait definition
//!
//! This crate defines the API trait for the Cloudview dashboard backend,
//! a thin dispatch layer that translates resource operations (list, get,
//! create, delete, action, monitor) into calls against the cloud manager's
//! RPC backend. Resource kinds are a closed set; an unknown kind tag is a
//! 404, never a routing hole.

use dropshot::{
    HttpError, HttpResponseCreated, HttpResponseDeleted, HttpResponseOk,
    HttpResponseUpdatedNoContent, Path, Query, RequestContext, TypedBody,
};

pub mod types;
pub use types::*;

/// Cloudview API trait
///
/// One endpoint per dispatcher operation. Path `kind` and `target` segments
/// are plain strings on purpose: tags outside the closed set must surface as
/// the dispatcher's own 404 body, not as a framework-level parse failure.
#[dropshot::api_description]
pub trait CloudviewApi {
    /// Context type for request handlers
    type Context: Send + Sync + 'static;

    // ========================================================================
    // Pools and resources
    // ========================================================================

    /// List a resource pool
    #[endpoint {
        method = GET,
        path = "/pools/{kind}",
        tags = ["resources"],
    }]
    async fn list_pool(
        rqctx: RequestContext<Self::Context>,
        path: Path<PoolPath>,
        query: Query<PoolQuery>,
    ) -> Result<HttpResponseOk<serde_json::Value>, HttpError>;

    /// Get one resource
    #[endpoint {
        method = GET,
        path = "/resources/{kind}/{id}",
        tags = ["resources"],
    }]
    async fn get_resource(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
    ) -> Result<HttpResponseOk<serde_json::Value>, HttpError>;

    /// Get a resource's template string
    #[endpoint {
        method = GET,
        path = "/resources/{kind}/{id}/template",
        tags = ["resources"],
    }]
    async fn get_template(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
    ) -> Result<HttpResponseOk<TemplateResponse>, HttpError>;

    /// Create a resource from a template
    #[endpoint {
        method = POST,
        path = "/resources/{kind}",
        tags = ["resources"],
    }]
    async fn create_resource(
        rqctx: RequestContext<Self::Context>,
        path: Path<PoolPath>,
        body: TypedBody<CreateResourceRequest>,
    ) -> Result<HttpResponseCreated<serde_json::Value>, HttpError>;

    /// Delete a resource
    #[endpoint {
        method = DELETE,
        path = "/resources/{kind}/{id}",
        tags = ["resources"],
    }]
    async fn delete_resource(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
    ) -> Result<HttpResponseDeleted, HttpError>;

    /// Perform an action on a resource (start, stop, chown, ...)
    #[endpoint {
        method = POST,
        path = "/resources/{kind}/{id}/action",
        tags = ["resources"],
    }]
    async fn perform_action(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
        body: TypedBody<ActionRequest>,
    ) -> Result<HttpResponseUpdatedNoContent, HttpError>;

    // ========================================================================
    // Monitoring and accounting
    // ========================================================================

    /// Get monitoring samples for a whole pool
    #[endpoint {
        method = GET,
        path = "/monitoring/{target}",
        tags = ["monitoring"],
    }]
    async fn get_pool_monitoring(
        rqctx: RequestContext<Self::Context>,
        path: Path<MonitorPoolPath>,
        query: Query<MeterQuery>,
    ) -> Result<HttpResponseOk<PoolMonitoringBody>, HttpError>;

    /// Get monitoring samples for one resource
    #[endpoint {
        method = GET,
        path = "/monitoring/{target}/{id}",
        tags = ["monitoring"],
    }]
    async fn get_resource_monitoring(
        rqctx: RequestContext<Self::Context>,
        path: Path<MonitorResourcePath>,
        query: Query<MeterQuery>,
    ) -> Result<HttpResponseOk<ResourceMonitoringResponse>, HttpError>;

    /// Get aggregated accounting series for a user or group
    #[endpoint {
        method = GET,
        path = "/accounting",
        tags = ["monitoring"],
    }]
    async fn get_user_accounting(
        rqctx: RequestContext<Self::Context>,
        query: Query<AccountingQuery>,
    ) -> Result<HttpResponseOk<AccountingResponse>, HttpError>;

    // ========================================================================
    // Images and VMs
    // ========================================================================

    /// Register an uploaded image and wait until the backend reports it ready
    #[endpoint {
        method = POST,
        path = "/images/upload",
        tags = ["images"],
    }]
    async fn upload_image(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<UploadImageRequest>,
    ) -> Result<HttpResponseCreated<serde_json::Value>, HttpError>;

    /// Start a VNC proxy session for a VM
    #[endpoint {
        method = POST,
        path = "/vms/{id}/vnc",
        tags = ["vms"],
    }]
    async fn start_vnc(
        rqctx: RequestContext<Self::Context>,
        path: Path<VmPath>,
    ) -> Result<HttpResponseOk<VncSessionResponse>, HttpError>;

    /// Fetch a VM's log file
    #[endpoint {
        method = GET,
        path = "/vms/{id}/log",
        tags = ["vms"],
    }]
    async fn get_vm_log(
        rqctx: RequestContext<Self::Context>,
        path: Path<VmPath>,
    ) -> Result<HttpResponseOk<VmLogResponse>, HttpError>;
}
