// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::net::SocketAddr;

use thiserror::Error;

/// Fatal control-plane errors (§7.5): propagated to the caller of
/// `start()` rather than silently degraded.
#[derive(Debug, Error)]
pub enum ControlPlaneError {
    #[error("failed to bind rigctl listener on {addr}: {source}")]
    ListenerBind { addr: SocketAddr, #[source] source: std::io::Error },

    #[error("invalid listen address {host}:{port}: {source}")]
    InvalidListenAddr { host: String, port: u16, #[source] source: std::io::Error },
}
