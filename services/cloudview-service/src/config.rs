// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Configuration for the Cloudview service

use std::path::PathBuf;

use anyhow::{Context, Result};

/// Pool filter selecting every resource visible to the session, regardless
/// of owner. Group 0 requests always use this filter.
pub const FILTER_ALL: i32 = -2;

/// Service configuration loaded from environment variables
///
/// Every field has a default except `backend_url`; the defaults reproduce
/// the behaviour the dashboards already depend on (five-second upload poll,
/// unbounded polling, soft-200 on unsupported pool monitoring targets).
#[derive(Clone, Debug)]
pub struct Config {
    /// Address the HTTP server binds to
    pub bind_address: String,

    /// Base URL of the cloud manager's RPC endpoint
    pub backend_url: String,

    /// Pool filter applied to listings for users outside group 0
    pub pool_filter: i32,

    /// Seconds to sleep between image-state checks during upload
    pub upload_poll_interval_secs: u64,

    /// Maximum number of poll attempts before an upload is declared
    /// stalled. Unset means poll until the backend changes state, which is
    /// the historical behaviour.
    pub upload_poll_limit: Option<u32>,

    /// Status returned when pool monitoring is asked for an unsupported
    /// target. 200 answers with an error body instead of an error status;
    /// kept reachable until product settles the inconsistency with the
    /// single-resource path.
    pub pool_monitor_unsupported_status: u16,

    /// Status returned when single-resource monitoring is asked for an
    /// unsupported target
    pub resource_monitor_unsupported_status: u16,

    /// Directory holding per-VM log files (`<id>.log`)
    pub vm_log_dir: PathBuf,

    /// Host the VNC proxy listens on
    pub vnc_proxy_host: String,

    /// Port the VNC proxy listens on
    pub vnc_proxy_port: u16,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind_address: "127.0.0.1:9869".to_string(),
            backend_url: String::new(),
            pool_filter: FILTER_ALL,
            upload_poll_interval_secs: 5,
            upload_poll_limit: None,
            pool_monitor_unsupported_status: 200,
            resource_monitor_unsupported_status: 403,
            vm_log_dir: PathBuf::from("/var/log/cloud/vms"),
            vnc_proxy_host: "127.0.0.1".to_string(),
            vnc_proxy_port: 29876,
        }
    }
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Config::default();

        let backend_url =
            std::env::var("BACKEND_URL").context("BACKEND_URL environment variable required")?;

        let bind_address =
            std::env::var("BIND_ADDRESS").unwrap_or(defaults.bind_address);

        let pool_filter = match std::env::var("POOL_FILTER") {
            Ok(v) => v.parse().context("Invalid POOL_FILTER")?,
            Err(_) => defaults.pool_filter,
        };

        let upload_poll_interval_secs = match std::env::var("UPLOAD_POLL_INTERVAL_SECS") {
            Ok(v) => v.parse().context("Invalid UPLOAD_POLL_INTERVAL_SECS")?,
            Err(_) => defaults.upload_poll_interval_secs,
        };

        let upload_poll_limit = match std::env::var("UPLOAD_POLL_LIMIT") {
            Ok(v) => Some(v.parse().context("Invalid UPLOAD_POLL_LIMIT")?),
            Err(_) => None,
        };

        let pool_monitor_unsupported_status =
            match std::env::var("POOL_MONITOR_UNSUPPORTED_STATUS") {
                Ok(v) => v.parse().context("Invalid POOL_MONITOR_UNSUPPORTED_STATUS")?,
                Err(_) => defaults.pool_monitor_unsupported_status,
            };

        let resource_monitor_unsupported_status =
            match std::env::var("RESOURCE_MONITOR_UNSUPPORTED_STATUS") {
                Ok(v) => v
                    .parse()
                    .context("Invalid RESOURCE_MONITOR_UNSUPPORTED_STATUS")?,
                Err(_) => defaults.resource_monitor_unsupported_status,
            };

        let vm_log_dir = std::env::var("VM_LOG_DIR")
            .map(PathBuf::from)
            .unwrap_or(defaults.vm_log_dir);

        let vnc_proxy_host =
            std::env::var("VNC_PROXY_HOST").unwrap_or(defaults.vnc_proxy_host);

        let vnc_proxy_port = match std::env::var("VNC_PROXY_PORT") {
            Ok(v) => v.parse().context("Invalid VNC_PROXY_PORT")?,
            Err(_) => defaults.vnc_proxy_port,
        };

        Ok(Self {
            bind_address,
            backend_url,
            pool_filter,
            upload_poll_interval_secs,
            upload_poll_limit,
            pool_monitor_unsupported_status,
            resource_monitor_unsupported_status,
            vm_log_dir,
            vnc_proxy_host,
            vnc_proxy_port,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // We deliberately avoid testing `from_env()` directly: in Rust 2024
    // `std::env::set_var` is unsafe because of data races with other
    // threads reading the environment, and `from_env()` is a plain
    // read-and-parse. The defaults are the interesting contract.

    #[test]
    fn defaults_preserve_historical_behaviour() {
        let config = Config::default();

        assert_eq!(config.pool_filter, FILTER_ALL);
        assert_eq!(config.upload_poll_interval_secs, 5);
        assert!(config.upload_poll_limit.is_none());
        assert_eq!(config.pool_monitor_unsupported_status, 200);
        assert_eq!(config.resource_monitor_unsupported_status, 403);
    }

    #[test]
    fn default_bind_address_parses() {
        let config = Config::default();
        assert!(config.bind_address.parse::<std::net::SocketAddr>().is_ok());
    }
}
