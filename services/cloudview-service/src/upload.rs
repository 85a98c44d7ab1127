// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Image-upload readiness polling
//!
//! After the dispatcher creates an image from an upload, the backend keeps
//! it in the transitional LOCKED state while the transfer to the datastore
//! runs. This module polls the image state until the backend moves on,
//! through an injected [`Delay`] so tests run without real sleeps.

use crate::backend::{Backend, ImageStatus};
use crate::error::DispatchError;
use async_trait::async_trait;
use cloudview_api::ResourceId;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Sleep abstraction injected into the poller
#[async_trait]
pub trait Delay: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Production delay backed by the tokio timer
pub struct TokioDelay;

#[async_trait]
impl Delay for TokioDelay {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// No-op delay for tests
pub struct NoDelay;

#[async_trait]
impl Delay for NoDelay {
    async fn sleep(&self, _duration: Duration) {}
}

/// Outcome of inspecting one image-state snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollStep {
    /// Image is no longer in the transitional state; return it
    Ready,
    /// Still transferring; sleep and poll again
    Wait,
    /// The configured poll bound was exceeded
    Stalled,
}

/// Decide the next transition from a state snapshot.
///
/// Polling continues only while the image is LOCKED with zero running VMs;
/// a LOCKED image that already has running VMs is usable and returns
/// immediately.
pub fn advance(status: &ImageStatus, attempts: u32, limit: Option<u32>) -> PollStep {
    let transferring = status.state == "LOCKED" && status.running_vms == 0;
    if !transferring {
        return PollStep::Ready;
    }
    match limit {
        Some(limit) if attempts >= limit => PollStep::Stalled,
        _ => PollStep::Wait,
    }
}

/// Poll loop around [`advance`]
pub struct UploadPoller {
    interval: Duration,
    limit: Option<u32>,
    delay: Arc<dyn Delay>,
}

impl UploadPoller {
    pub fn new(interval: Duration, limit: Option<u32>, delay: Arc<dyn Delay>) -> Self {
        Self { interval, limit, delay }
    }

    /// Block until the backend reports the image out of the transitional
    /// state. With no configured limit this can wait indefinitely on a
    /// backend stuck in LOCKED; callers rely on externally imposed request
    /// timeouts.
    pub async fn wait_until_ready(
        &self,
        backend: &dyn Backend,
        id: ResourceId,
    ) -> Result<(), DispatchError> {
        let mut attempts: u32 = 0;
        loop {
            let status = backend
                .image_status(id)
                .await
                .map_err(|e| DispatchError::Backend(e.message))?;

            match advance(&status, attempts, self.limit) {
                PollStep::Ready => return Ok(()),
                PollStep::Stalled => {
                    return Err(DispatchError::UploadStalled { id, attempts });
                }
                PollStep::Wait => {
                    debug!(image = id, state = %status.state, "image still locked, polling");
                    attempts += 1;
                    self.delay.sleep(self.interval).await;
                }
            }
        }
    }
}
