// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! VNC proxy collaborator
//!
//! The dispatcher resolves the VM document and hands it here; the proxy
//! mints a session descriptor the websocket front end uses to reach the
//! hypervisor's VNC port. Transport details stay behind the trait.

use async_trait::async_trait;
use cloudview_api::VncSessionResponse;
use serde_json::Value;
use thiserror::Error;

/// The proxy could not establish a session for the VM
#[derive(Error, Debug)]
#[error("{message}")]
pub struct VncError {
    pub message: String,
}

impl VncError {
    fn new(message: impl Into<String>) -> Self {
        Self { message: message.into() }
    }
}

/// Collaborator that turns a resolved VM document into a proxy session
#[async_trait]
pub trait VncProxy: Send + Sync {
    async fn proxy(&self, vm: &Value) -> Result<VncSessionResponse, VncError>;
}

/// Default proxy: reads the VM's graphics definition and points the client
/// at the configured websocket proxy with a fresh session token
pub struct WebsocketVncProxy {
    host: String,
    port: u16,
}

impl WebsocketVncProxy {
    pub fn new(host: String, port: u16) -> Self {
        Self { host, port }
    }
}

#[async_trait]
impl VncProxy for WebsocketVncProxy {
    async fn proxy(&self, vm: &Value) -> Result<VncSessionResponse, VncError> {
        let graphics = vm
            .pointer("/TEMPLATE/GRAPHICS")
            .ok_or_else(|| VncError::new("VM has no graphics definition"))?;

        let graphics_type = graphics
            .get("TYPE")
            .and_then(|v| v.as_str())
            .unwrap_or("");
        if !graphics_type.eq_ignore_ascii_case("vnc") {
            return Err(VncError::new(format!(
                "VNC not enabled for this VM (graphics type: {graphics_type})"
            )));
        }

        // Backends report the port either as a number or a string.
        let vnc_port = match graphics.get("PORT") {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.parse().ok(),
            _ => None,
        }
        .and_then(|p| u16::try_from(p).ok())
        .ok_or_else(|| VncError::new("VM graphics definition has no usable port"))?;

        let password = graphics
            .get("PASSWD")
            .and_then(|v| v.as_str())
            .filter(|s| !s.is_empty())
            .map(|s| s.to_string());

        let token = session_token();
        tracing::info!(port = vnc_port, "established VNC proxy session");

        Ok(VncSessionResponse {
            host: self.host.clone(),
            port: self.port,
            token,
            password,
        })
    }
}

/// Random 12-character alphanumeric session token
fn session_token() -> String {
    use rand::Rng;

    let mut rng = rand::rng();
    (0..12)
        .map(|_| {
            let idx = rng.random_range(0..62);
            match idx {
                0..=9 => (b'0' + idx) as char,
                10..=35 => (b'a' + idx - 10) as char,
                _ => (b'A' + idx - 36) as char,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn vm_with_graphics(graphics: Value) -> Value {
        json!({ "ID": 7, "TEMPLATE": { "GRAPHICS": graphics } })
    }

    #[tokio::test]
    async fn proxies_vnc_graphics() {
        let proxy = WebsocketVncProxy::new("proxy.local".to_string(), 29876);
        let vm = vm_with_graphics(json!({ "TYPE": "VNC", "PORT": "5907" }));

        let session = proxy.proxy(&vm).await.unwrap();

        assert_eq!(session.host, "proxy.local");
        assert_eq!(session.port, 29876);
        assert_eq!(session.token.len(), 12);
        assert!(session.password.is_none());
    }

    #[tokio::test]
    async fn rejects_non_vnc_graphics() {
        let proxy = WebsocketVncProxy::new("proxy.local".to_string(), 29876);
        let vm = vm_with_graphics(json!({ "TYPE": "SDL", "PORT": "5907" }));

        let err = proxy.proxy(&vm).await.unwrap_err();
        assert!(err.message.contains("VNC not enabled"));
    }

    #[tokio::test]
    async fn rejects_missing_graphics() {
        let proxy = WebsocketVncProxy::new("proxy.local".to_string(), 29876);
        let vm = json!({ "ID": 7, "TEMPLATE": {} });

        let err = proxy.proxy(&vm).await.unwrap_err();
        assert!(err.message.contains("no graphics definition"));
    }

    #[tokio::test]
    async fn carries_the_vnc_password_through() {
        let proxy = WebsocketVncProxy::new("proxy.local".to_string(), 29876);
        let vm = vm_with_graphics(json!({ "TYPE": "vnc", "PORT": 5907, "PASSWD": "s3cret" }));

        let session = proxy.proxy(&vm).await.unwrap();
        assert_eq!(session.password.as_deref(), Some("s3cret"));
    }
}
