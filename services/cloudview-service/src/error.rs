// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Error types for the dispatch layer

use cloudview_api::ResourceId;
use thiserror::Error;

/// Errors a dispatch operation can fail with
///
/// Only two families exist: client input outside the closed sets
/// (`UnsupportedKind`, `UnsupportedMonitoringTarget`) and backend failures
/// surfaced with the backend's own message (`NotFound` when the lookup
/// itself failed, `Backend` for everything else). Backend calls are never
/// retried.
#[derive(Error, Debug)]
pub enum DispatchError {
    /// The kind tag is not in the closed resource-kind set
    #[error("Error: {0} resource not supported")]
    UnsupportedKind(String),

    /// The monitoring target tag is neither "vm" nor "host"
    ///
    /// The HTTP status for this condition is configured per path; the
    /// dispatcher records the one that applies so the HTTP layer does not
    /// need to know which path produced the error.
    #[error("Monitoring not supported for {target}")]
    UnsupportedMonitoringTarget { target: String, status: u16 },

    /// The backend could not find or fetch the addressed resource
    #[error("{0}")]
    NotFound(String),

    /// The backend call failed; the message is the backend's own
    #[error("{0}")]
    Backend(String),

    /// The upload poll bound was exceeded while the image stayed locked
    #[error("image {id} still locked after {attempts} poll attempts")]
    UploadStalled { id: ResourceId, attempts: u32 },
}
