// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::net::{SocketAddr, ToSocketAddrs};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rigmux_core::{Config, DebugStore};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tracing::info;

use crate::error::ControlPlaneError;
use crate::registry::RigRegistry;
use crate::rig_factory::build_client;
use crate::server::VirtualServer;
use crate::sync::{self, SyncState};

const SERVER_RING_CAPACITY: usize = 400;
const RIG_RING_CAPACITY: usize = 3000;

/// The three control entry points of §6: `apply`, `start`, `stop`. Owns the
/// rig registry, the synchronizer state, and the running tasks; this is the
/// object a binary (or a test) drives.
pub struct ControlPlane {
    registry: Arc<RigRegistry>,
    sync_state: Arc<SyncState>,
    debug: Arc<DebugStore>,
    listen_addr: Mutex<Option<SocketAddr>>,
    running: Mutex<Option<RunningTasks>>,
}

struct RunningTasks {
    shutdown_tx: watch::Sender<bool>,
    server_task: JoinHandle<()>,
    sync_task: JoinHandle<()>,
}

impl ControlPlane {
    pub fn new() -> Self {
        ControlPlane {
            registry: Arc::new(RigRegistry::new()),
            sync_state: Arc::new(SyncState::new(false, 0, 1000)),
            debug: Arc::new(DebugStore::new(0, RIG_RING_CAPACITY, SERVER_RING_CAPACITY)),
            listen_addr: Mutex::new(None),
            running: Mutex::new(None),
        }
    }

    /// Atomically replace the rig list and synchronizer parameters. Old rig
    /// clients are closed after the swap so the new list is visible before
    /// any backend teardown happens. Idempotent for an unchanged config
    /// apart from always resetting `last_broadcast` (§6).
    pub async fn apply(&self, config: Config) -> Result<(), ControlPlaneError> {
        self.debug.ensure_rigs(config.rigs.len());

        let mut new_clients = Vec::with_capacity(config.rigs.len());
        for (index, rig_cfg) in config.rigs.into_iter().enumerate() {
            let ring = self.debug.rig(index).expect("ensure_rigs sized the ring vector");
            new_clients.push(Arc::new(build_client(rig_cfg, ring)));
        }

        let old_clients = self.registry.replace(new_clients).await;
        for rig in old_clients.iter() {
            rig.close().await;
        }

        self.sync_state.enabled.store(config.sync_enabled, Ordering::SeqCst);
        self.sync_state.source_index.store(config.sync_source_index, Ordering::SeqCst);
        self.sync_state.interval_ms.store(config.poll_interval_ms, Ordering::SeqCst);
        self.sync_state.reset_last_broadcast();

        let addr_str = format!("{}:{}", config.rigctl_listen_host, config.rigctl_listen_port);
        let addr = addr_str.to_socket_addrs().map_err(|source| ControlPlaneError::InvalidListenAddr {
            host: config.rigctl_listen_host.clone(),
            port: config.rigctl_listen_port,
            source,
        })?.next().ok_or_else(|| ControlPlaneError::InvalidListenAddr {
            host: config.rigctl_listen_host,
            port: config.rigctl_listen_port,
            source: std::io::Error::new(std::io::ErrorKind::InvalidInput, "no resolved address"),
        })?;
        *self.listen_addr.lock().await = Some(addr);

        Ok(())
    }

    /// Binds the listener (surfacing a bind failure here, synchronously)
    /// and spawns the accept loop and the synchronizer.
    pub async fn start(&self) -> Result<(), ControlPlaneError> {
        let addr = self.listen_addr.lock().await.expect("apply() must run before start()");
        let server = Arc::new(VirtualServer::new(addr, self.registry.clone(), self.sync_state.clone(), self.debug.server.clone()));
        let listener = server.bind().await?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let server_task = tokio::spawn(server.serve(listener, shutdown_rx));
        let sync_task = sync::spawn(self.sync_state.clone(), self.registry.clone());

        *self.running.lock().await = Some(RunningTasks { shutdown_tx, server_task, sync_task });
        info!("control plane started");
        Ok(())
    }

    /// Cancels the synchronizer and the accept loop, then closes every rig
    /// client (which closes backends and terminates managed subprocesses).
    /// Idempotent: calling `stop()` with nothing running is a no-op (§6).
    pub async fn stop(&self) {
        if let Some(tasks) = self.running.lock().await.take() {
            let _ = tasks.shutdown_tx.send(true);
            tasks.sync_task.abort();
            let _ = tasks.server_task.await;
        }

        let rigs = self.registry.current().await;
        for rig in rigs.iter() {
            rig.close().await;
        }
        info!("control plane stopped");
    }

    pub fn debug_store(&self) -> Arc<DebugStore> {
        self.debug.clone()
    }

    pub fn rig_clients(&self) -> &Arc<RigRegistry> {
        &self.registry
    }
}

impl Default for ControlPlane {
    fn default() -> Self {
        ControlPlane::new()
    }
}

