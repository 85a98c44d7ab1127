// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cloudview service entry point

use anyhow::Result;
use cloudview_service::api::{ApiContext, CloudviewServiceImpl};
use cloudview_service::backend::RpcBackend;
use cloudview_service::config::Config;
use cloudview_service::dispatch::Dispatcher;
use cloudview_service::upload::TokioDelay;
use cloudview_service::vnc::WebsocketVncProxy;
use dropshot::{ConfigDropshot, ConfigLogging, ConfigLoggingLevel, HttpServerStarter};
use std::sync::Arc;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "cloudview_service=info,dropshot=info".to_string()),
        ))
        .init();

    let config = Config::from_env()?;

    info!(backend_url = %config.backend_url, "Initializing backend client");
    let backend = RpcBackend::new(&config.backend_url)
        .map_err(|e| anyhow::anyhow!("failed to create backend client: {}", e))?;

    let vnc = WebsocketVncProxy::new(config.vnc_proxy_host.clone(), config.vnc_proxy_port);

    let bind_address = config.bind_address.parse()?;

    let dispatcher = Dispatcher::new(
        Arc::new(backend),
        Arc::new(vnc),
        Arc::new(TokioDelay),
        config,
    );

    let api_context = ApiContext { dispatcher: Arc::new(dispatcher) };

    // Get API description from the trait implementation
    let api = cloudview_api::cloudview_api_mod::api_description::<CloudviewServiceImpl>()
        .map_err(|e| anyhow::anyhow!("Failed to create API description: {}", e))?;

    let config_dropshot = ConfigDropshot {
        bind_address,
        default_request_body_max_bytes: 1024 * 1024, // 1MB
        default_handler_task_mode: dropshot::HandlerTaskMode::Detached,
        ..Default::default()
    };

    let config_logging = ConfigLogging::StderrTerminal {
        level: ConfigLoggingLevel::Info,
    };

    let log = config_logging
        .to_logger("cloudview-service")
        .map_err(|error| anyhow::anyhow!("failed to create logger: {}", error))?;

    let server = HttpServerStarter::new(&config_dropshot, api, api_context, &log)
        .map_err(|error| anyhow::anyhow!("failed to create server: {}", error))?
        .start();

    info!("Cloudview service running on http://{}", bind_address);

    server
        .await
        .map_err(|error| anyhow::anyhow!("server failed: {}", error))
}
