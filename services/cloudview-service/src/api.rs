// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Dropshot implementation of the Cloudview API trait
//!
//! A thin mapping layer: every handler parses nothing itself, calls the
//! dispatcher, and converts `DispatchError` into the HTTP status the
//! dispatch contract assigns it.

use crate::dispatch::Dispatcher;
use crate::error::DispatchError;
use cloudview_api::{
    AccountingQuery, AccountingResponse, ActionRequest, CloudviewApi, CreateResourceRequest,
    MeterQuery, MonitorPoolPath, MonitorResourcePath, PoolMonitoringBody, PoolPath, PoolQuery,
    ResourceMonitoringResponse, ResourcePath, TemplateResponse, UploadImageRequest, VmLogResponse,
    VmPath, VncSessionResponse,
};
use dropshot::{
    ClientErrorStatusCode, HttpError, HttpResponseCreated, HttpResponseDeleted, HttpResponseOk,
    HttpResponseUpdatedNoContent, Path, Query, RequestContext, TypedBody,
};
use std::sync::Arc;

/// Context for API handlers
pub struct ApiContext {
    pub dispatcher: Arc<Dispatcher>,
}

/// Map a dispatch error onto its HTTP status
fn to_http_error(err: DispatchError) -> HttpError {
    let message = err.to_string();
    match err {
        DispatchError::UnsupportedKind(_) | DispatchError::NotFound(_) => {
            HttpError::for_not_found(None, message)
        }
        DispatchError::UnsupportedMonitoringTarget { status, .. } => {
            match http::StatusCode::from_u16(status)
                .ok()
                .and_then(|code| ClientErrorStatusCode::try_from(code).ok())
            {
                Some(code) => HttpError::for_client_error(None, code, message),
                // A configured status outside the 4xx range cannot be
                // expressed as a client error; fall back to 500.
                None => HttpError::for_internal_error(message),
            }
        }
        DispatchError::Backend(_) | DispatchError::UploadStalled { .. } => {
            HttpError::for_internal_error(message)
        }
    }
}

/// Cloudview service implementation
pub enum CloudviewServiceImpl {}

impl CloudviewApi for CloudviewServiceImpl {
    type Context = ApiContext;

    async fn list_pool(
        rqctx: RequestContext<Self::Context>,
        path: Path<PoolPath>,
        query: Query<PoolQuery>,
    ) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();
        let query = query.into_inner();

        let pool = ctx
            .dispatcher
            .list_pool(&path.kind, query.gid)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(pool))
    }

    async fn get_resource(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
    ) -> Result<HttpResponseOk<serde_json::Value>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();

        let resource = ctx
            .dispatcher
            .get_resource(&path.kind, path.id)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(resource))
    }

    async fn get_template(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
    ) -> Result<HttpResponseOk<TemplateResponse>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();

        let template = ctx
            .dispatcher
            .get_template(&path.kind, path.id)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(template))
    }

    async fn create_resource(
        rqctx: RequestContext<Self::Context>,
        path: Path<PoolPath>,
        body: TypedBody<CreateResourceRequest>,
    ) -> Result<HttpResponseCreated<serde_json::Value>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();
        let body = body.into_inner();

        let resource = ctx
            .dispatcher
            .create_resource(&path.kind, body.template)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseCreated(resource))
    }

    async fn delete_resource(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
    ) -> Result<HttpResponseDeleted, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();

        ctx.dispatcher
            .delete_resource(&path.kind, path.id)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseDeleted())
    }

    async fn perform_action(
        rqctx: RequestContext<Self::Context>,
        path: Path<ResourcePath>,
        body: TypedBody<ActionRequest>,
    ) -> Result<HttpResponseUpdatedNoContent, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();
        let body = body.into_inner();

        ctx.dispatcher
            .perform_action(&path.kind, path.id, body.action)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseUpdatedNoContent())
    }

    async fn get_pool_monitoring(
        rqctx: RequestContext<Self::Context>,
        path: Path<MonitorPoolPath>,
        query: Query<MeterQuery>,
    ) -> Result<HttpResponseOk<PoolMonitoringBody>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();
        let query = query.into_inner();

        let body = ctx
            .dispatcher
            .get_pool_monitoring(&path.target, &query.meters)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(body))
    }

    async fn get_resource_monitoring(
        rqctx: RequestContext<Self::Context>,
        path: Path<MonitorResourcePath>,
        query: Query<MeterQuery>,
    ) -> Result<HttpResponseOk<ResourceMonitoringResponse>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();
        let query = query.into_inner();

        let body = ctx
            .dispatcher
            .get_resource_monitoring(&path.target, path.id, &query.meters)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(body))
    }

    async fn get_user_accounting(
        rqctx: RequestContext<Self::Context>,
        query: Query<AccountingQuery>,
    ) -> Result<HttpResponseOk<AccountingResponse>, HttpError> {
        let ctx = rqctx.context();
        let query = query.into_inner();

        let body = ctx
            .dispatcher
            .get_user_accounting(
                query.id,
                query.start,
                query.end,
                query.interval,
                &query.meters,
                query.gid,
            )
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(body))
    }

    async fn upload_image(
        rqctx: RequestContext<Self::Context>,
        body: TypedBody<UploadImageRequest>,
    ) -> Result<HttpResponseCreated<serde_json::Value>, HttpError> {
        let ctx = rqctx.context();
        let body = body.into_inner();

        let image = ctx
            .dispatcher
            .upload_image(body)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseCreated(image))
    }

    async fn start_vnc(
        rqctx: RequestContext<Self::Context>,
        path: Path<VmPath>,
    ) -> Result<HttpResponseOk<VncSessionResponse>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();

        let session = ctx
            .dispatcher
            .start_vnc(path.id)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(session))
    }

    async fn get_vm_log(
        rqctx: RequestContext<Self::Context>,
        path: Path<VmPath>,
    ) -> Result<HttpResponseOk<VmLogResponse>, HttpError> {
        let ctx = rqctx.context();
        let path = path.into_inner();

        let log = ctx
            .dispatcher
            .get_vm_log(path.id)
            .await
            .map_err(to_http_error)?;

        Ok(HttpResponseOk(log))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_kind_maps_to_404() {
        let err = to_http_error(DispatchError::UnsupportedKind("widget".to_string()));
        assert_eq!(err.status_code.as_u16(), 404);
    }

    #[test]
    fn backend_error_maps_to_500() {
        let err = to_http_error(DispatchError::Backend("boom".to_string()));
        assert_eq!(err.status_code.as_u16(), 500);
    }

    #[test]
    fn monitoring_target_uses_configured_client_status() {
        let err = to_http_error(DispatchError::UnsupportedMonitoringTarget {
            target: "datastore".to_string(),
            status: 403,
        });
        assert_eq!(err.status_code.as_u16(), 403);
    }

    #[test]
    fn monitoring_target_with_non_client_status_falls_back_to_500() {
        let err = to_http_error(DispatchError::UnsupportedMonitoringTarget {
            target: "datastore".to_string(),
            status: 200,
        });
        assert_eq!(err.status_code.as_u16(), 500);
    }
}
