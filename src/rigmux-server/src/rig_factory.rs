// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::Arc;

use rigmux_backend::{ManagedBackend, TcpBackend};
use rigmux_core::{Backend, BackendKind, DebugRing, RigClient, RigConfig};

/// Build the `Backend` a `RigConfig` describes (§9: "the managed variant
/// contains a TCP backend rather than inheriting").
pub fn build_backend(cfg: &RigConfig) -> Box<dyn Backend> {
    match cfg.backend {
        BackendKind::Tcp => Box::new(TcpBackend::new(cfg.host.clone(), cfg.port)),
        BackendKind::Managed => Box::new(ManagedBackend::new(
            cfg.model_id.clone().unwrap_or_default(),
            cfg.device.clone().unwrap_or_default(),
            cfg.baud,
            cfg.serial_opts.clone(),
            cfg.extra_args.clone(),
        )),
    }
}

pub fn build_client(cfg: RigConfig, debug: Arc<DebugRing>) -> RigClient {
    let backend = build_backend(&cfg);
    RigClient::new(cfg, backend, debug)
}
