// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Wire types shared by the Cloudview API trait and its service
//! implementation.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Numeric identifier assigned by the backend to every resource
pub type ResourceId = i64;

/// The closed set of resource kinds the dispatcher routes on
///
/// Every dispatch operation matches exhaustively over this enum, so adding
/// a kind forces a handler in each arm at compile time. The string form is
/// the lowercase tag used in URLs and backend method names.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ResourceKind {
    Group,
    Cluster,
    Host,
    Image,
    VmTemplate,
    Vm,
    Vnet,
    User,
    Acl,
    Datastore,
    Zone,
}

/// Resource kinds that report monitoring samples
///
/// Only virtual machines and hosts have meters; asking for anything else is
/// the unsupported-monitoring-target error. Tags parse case-insensitively
/// because existing dashboards send both "vm" and "VM".
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    JsonSchema,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum MonitorTarget {
    Vm,
    Host,
}

/// Error body in the backend's classic shape: `{"error": {"message": ...}}`
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorBody {
    pub error: ErrorMessage,
}

/// Message payload of an [`ErrorBody`]
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorMessage {
    pub message: String,
}

impl ErrorBody {
    pub fn new(message: impl Into<String>) -> Self {
        Self { error: ErrorMessage { message: message.into() } }
    }
}

// ============================================================================
// Path and query parameters
// ============================================================================

/// Path parameter for pool-level endpoints
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PoolPath {
    /// Resource kind tag (e.g., "vm", "host")
    pub kind: String,
}

/// Path parameter for single-resource endpoints
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ResourcePath {
    /// Resource kind tag (e.g., "vm", "host")
    pub kind: String,
    /// Resource identifier
    pub id: ResourceId,
}

/// Path parameter for VM-only endpoints (VNC, log retrieval)
#[derive(Debug, Deserialize, JsonSchema)]
pub struct VmPath {
    /// Virtual machine identifier
    pub id: ResourceId,
}

/// Path parameter for pool monitoring
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MonitorPoolPath {
    /// Monitoring target tag ("vm" or "host")
    pub target: String,
}

/// Path parameter for single-resource monitoring
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MonitorResourcePath {
    /// Monitoring target tag ("vm" or "host")
    pub target: String,
    /// Resource identifier
    pub id: ResourceId,
}

/// Query parameters for pool listings
#[derive(Debug, Deserialize, JsonSchema)]
pub struct PoolQuery {
    /// Primary group of the requesting user; group 0 always sees every
    /// resource regardless of the configured pool filter
    #[serde(default)]
    pub gid: Option<i64>,
}

/// Query parameters for monitoring endpoints
#[derive(Debug, Deserialize, JsonSchema)]
pub struct MeterQuery {
    /// Comma-separated meter names (e.g., "CPU,MEMORY")
    pub meters: String,
}

/// Query parameters for the user accounting endpoint
#[derive(Debug, Deserialize, JsonSchema)]
pub struct AccountingQuery {
    /// User whose VM history is aggregated
    pub id: ResourceId,
    /// Range start, epoch seconds (inclusive)
    pub start: i64,
    /// Range end, epoch seconds (exclusive)
    pub end: i64,
    /// Bucket width in seconds
    pub interval: i64,
    /// Comma-separated meter names to aggregate
    pub meters: String,
    /// When present, aggregate over every VM in this group instead of the
    /// single user's
    #[serde(default)]
    pub gid: Option<i64>,
}

// ============================================================================
// Request bodies
// ============================================================================

/// Body for resource creation
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct CreateResourceRequest {
    /// Backend template for the new resource, passed through opaquely
    pub template: Value,
}

/// Body for the action endpoint
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ActionRequest {
    /// Action document (name plus arguments), passed through opaquely
    pub action: Value,
}

/// Body for image upload
///
/// The HTTP front end stores the uploaded file on disk before this endpoint
/// runs; `path` is where it landed. The dispatcher injects it into the image
/// template before handing the create to the backend.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct UploadImageRequest {
    /// Image attributes (the `image` object of a create template)
    pub image: Value,
    /// Target datastore identifier
    pub ds_id: ResourceId,
    /// Filesystem path of the already-received upload
    pub path: String,
}

// ============================================================================
// Response bodies
// ============================================================================

/// Template of a resource, rendered as a single string
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct TemplateResponse {
    pub template: String,
}

/// Pool-level monitoring samples
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PoolMonitoringResponse {
    /// Target tag the samples belong to
    pub resource: String,
    /// Raw per-resource sample series from the backend
    pub monitoring: Value,
}

/// Body of the pool monitoring endpoint
///
/// Unsupported targets have historically been answered with 200 and an error
/// body rather than an error status; the service keeps that reachable (and
/// configurable), so the success type admits both shapes.
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
#[serde(untagged)]
pub enum PoolMonitoringBody {
    Data(PoolMonitoringResponse),
    Error(ErrorBody),
}

/// Monitoring samples for one resource
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ResourceMonitoringResponse {
    /// Target tag the samples belong to
    pub resource: String,
    /// Resource identifier
    pub id: ResourceId,
    /// Raw sample series from the backend
    pub monitoring: Value,
}

/// Aggregated accounting series, one chronological `[timestamp, sum]` list
/// per requested meter
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AccountingResponse {
    pub monitoring: BTreeMap<String, Vec<(i64, i64)>>,
}

/// Descriptor of an established VNC proxy session
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct VncSessionResponse {
    /// Proxy host the client should connect to
    pub host: String,
    /// Proxy port
    pub port: u16,
    /// One-time session token
    pub token: String,
    /// VNC password from the VM's graphics definition, when set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

/// VM log contents (or a placeholder when the log file is unreadable)
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VmLogResponse {
    pub vm_log: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn kind_tags_round_trip() {
        for kind in ResourceKind::iter() {
            let tag = kind.to_string();
            assert_eq!(tag, tag.to_lowercase());
            assert_eq!(ResourceKind::from_str(&tag).ok(), Some(kind));
        }
    }

    #[test]
    fn vmtemplate_tag_is_one_word() {
        assert_eq!(ResourceKind::VmTemplate.to_string(), "vmtemplate");
        assert_eq!(
            ResourceKind::from_str("vmtemplate").ok(),
            Some(ResourceKind::VmTemplate)
        );
    }

    #[test]
    fn monitor_target_parses_case_insensitively() {
        assert_eq!(MonitorTarget::from_str("VM").ok(), Some(MonitorTarget::Vm));
        assert_eq!(MonitorTarget::from_str("host").ok(), Some(MonitorTarget::Host));
        assert!(MonitorTarget::from_str("datastore").is_err());
    }

    #[test]
    fn error_body_shape() {
        let body = ErrorBody::new("Error: widget resource not supported");
        let json = serde_json::to_value(&body).unwrap();
        assert_eq!(
            json["error"]["message"],
            "Error: widget resource not supported"
        );
    }
}
