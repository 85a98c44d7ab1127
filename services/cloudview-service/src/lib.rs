// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright 2026 Edgecast Cloud LLC.

//! Cloudview Service Library
//!
//! This library provides the dispatch layer of the Cloudview dashboard
//! backend: routing resource operations onto the cloud manager's RPC
//! backend, accounting aggregation, the image-upload readiness poll, and
//! the VNC proxy seam.

pub mod accounting;
pub mod api;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod upload;
pub mod vnc;
