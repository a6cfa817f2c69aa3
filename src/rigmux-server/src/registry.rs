// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::Arc;

use tokio::sync::RwLock;

use rigmux_core::RigClient;

/// The current rig list, atomically replaced on reconfiguration (§3, §9:
/// "the server and synchronizer need the rig list but must not own it").
/// Readers clone the `Arc<Vec<_>>` (cheap) and see a consistent snapshot
/// even while a reconfiguration is in flight.
#[derive(Default)]
pub struct RigRegistry {
    inner: RwLock<Arc<Vec<Arc<RigClient>>>>,
}

impl RigRegistry {
    pub fn new() -> Self {
        RigRegistry { inner: RwLock::new(Arc::new(Vec::new())) }
    }

    pub async fn current(&self) -> Arc<Vec<Arc<RigClient>>> {
        self.inner.read().await.clone()
    }

    /// Swap in `new`, returning the previous snapshot so the caller can
    /// drain and close it in the background.
    pub async fn replace(&self, new: Vec<Arc<RigClient>>) -> Arc<Vec<Arc<RigClient>>> {
        let mut guard = self.inner.write().await;
        std::mem::replace(&mut *guard, Arc::new(new))
    }
}
