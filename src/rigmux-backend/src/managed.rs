// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::process::Stdio;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::process::{Child, Command};
use tokio::sync::Mutex as TokioMutex;
use tracing::{info, warn};

use rigmux_core::backend::BoxFuture;
use rigmux_core::{Backend, RigStatus, SerialExecutor};

use crate::tcp::TcpBackend;

const SETTLE_DELAY: Duration = Duration::from_millis(500);
const TERMINATE_GRACE: Duration = Duration::from_secs(1);

struct ManagedState {
    child: Child,
    inner: TcpBackend,
}

/// Spawns and supervises a local `rigctld` subprocess bound to an ephemeral
/// port on 127.0.0.1, then delegates every operation to an internal TCP
/// backend pointed at that port (§4.6). The subprocess lifecycle sequence
/// (check exit, respawn, settle) runs through a [`SerialExecutor`] so
/// concurrent callers never race on it.
pub struct ManagedBackend {
    model_id: String,
    device: String,
    baud: Option<u32>,
    serial_opts: Vec<String>,
    extra_args: Vec<String>,
    state: Arc<TokioMutex<Option<ManagedState>>>,
    executor: SerialExecutor,
}

impl ManagedBackend {
    pub fn new(model_id: impl Into<String>, device: impl Into<String>, baud: Option<u32>, serial_opts: Vec<String>, extra_args: Vec<String>) -> Self {
        ManagedBackend {
            model_id: model_id.into(),
            device: device.into(),
            baud,
            serial_opts,
            extra_args,
            state: Arc::new(TokioMutex::new(None)),
            executor: SerialExecutor::new(),
        }
    }

    async fn find_free_port() -> Option<u16> {
        let listener = TcpListener::bind(("127.0.0.1", 0)).await.ok()?;
        listener.local_addr().ok().map(|addr| addr.port())
    }

    /// Ensures a healthy subprocess + inner backend exist, respawning if
    /// the previous one exited. Returns the shared state handle so callers
    /// can lock it once and delegate.
    async fn ensure_ready(&self) -> Arc<TokioMutex<Option<ManagedState>>> {
        let state = self.state.clone();
        let model_id = self.model_id.clone();
        let device = self.device.clone();
        let baud = self.baud;
        let serial_opts = self.serial_opts.clone();
        let extra_args = self.extra_args.clone();

        let _ = self
            .executor
            .run(move || async move {
                let mut guard = state.lock().await;
                let needs_spawn = match guard.as_mut() {
                    Some(s) => matches!(s.child.try_wait(), Ok(Some(_)) | Err(_)),
                    None => true,
                };
                if !needs_spawn {
                    return;
                }
                *guard = None;

                let Some(port) = Self::find_free_port().await else {
                    warn!("managed backend: could not allocate an ephemeral port");
                    return;
                };

                let mut cmd = Command::new("rigctld");
                cmd.arg("-m").arg(&model_id).arg("-r").arg(&device);
                if let Some(baud) = baud {
                    cmd.arg("-s").arg(baud.to_string());
                }
                for tok in &serial_opts {
                    cmd.arg(tok);
                }
                for tok in &extra_args {
                    cmd.arg(tok);
                }
                cmd.arg("-T").arg("127.0.0.1").arg("-t").arg(port.to_string());
                cmd.stdout(Stdio::null()).stderr(Stdio::null());

                match cmd.spawn() {
                    Ok(child) => {
                        info!(model = %model_id, device = %device, port, "spawned managed rigctld");
                        tokio::time::sleep(SETTLE_DELAY).await;
                        *guard = Some(ManagedState { child, inner: TcpBackend::new("127.0.0.1", port) });
                    }
                    Err(e) => warn!(error = %e, "failed to spawn rigctld"),
                }
            })
            .await;

        state
    }
}

impl Backend for ManagedBackend {
    fn get_freq(&self) -> BoxFuture<'_, Option<i64>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.get_freq().await,
                None => None,
            }
        })
    }

    fn set_freq(&self, hz: i64) -> BoxFuture<'_, i32> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.set_freq(hz).await,
                None => -1,
            }
        })
    }

    fn get_mode(&self) -> BoxFuture<'_, Option<(String, i64)>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.get_mode().await,
                None => None,
            }
        })
    }

    fn set_mode(&self, mode: String, passband: Option<i64>) -> BoxFuture<'_, i32> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.set_mode(mode, passband).await,
                None => -1,
            }
        })
    }

    fn get_vfo(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.get_vfo().await,
                None => None,
            }
        })
    }

    fn set_vfo(&self, vfo: String) -> BoxFuture<'_, i32> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.set_vfo(vfo).await,
                None => -1,
            }
        })
    }

    fn get_ptt(&self) -> BoxFuture<'_, Option<i32>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.get_ptt().await,
                None => None,
            }
        })
    }

    fn set_ptt(&self, ptt: i32) -> BoxFuture<'_, i32> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.set_ptt(ptt).await,
                None => -1,
            }
        })
    }

    fn get_powerstat(&self) -> BoxFuture<'_, Option<i32>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.get_powerstat().await,
                None => None,
            }
        })
    }

    fn chk_vfo(&self) -> BoxFuture<'_, Option<i32>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.chk_vfo().await,
                None => None,
            }
        })
    }

    fn dump_state(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.dump_state().await,
                None => Vec::new(),
            }
        })
    }

    fn dump_caps(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.dump_caps().await,
                None => Vec::new(),
            }
        })
    }

    fn status(&self) -> BoxFuture<'_, RigStatus> {
        Box::pin(async move {
            let state = self.ensure_ready().await;
            let guard = state.lock().await;
            match guard.as_ref() {
                Some(s) => s.inner.status().await,
                None => RigStatus::disconnected("managed rigctld not running"),
            }
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            self.executor.close();
            let mut guard = self.state.lock().await;
            if let Some(mut s) = guard.take() {
                s.inner.close().await;
                terminate_child(&mut s.child).await;
            }
        })
    }
}

/// SIGTERM, short grace period, then SIGKILL (§4.6, §9). `tokio::process`
/// has no portable SIGTERM, so Unix sends it directly via `libc::kill`.
#[cfg(unix)]
async fn terminate_child(child: &mut Child) {
    if let Some(pid) = child.id() {
        // SAFETY: `pid` is our own child's PID, obtained from the `Child`
        // handle we still own.
        unsafe {
            libc::kill(pid as i32, libc::SIGTERM);
        }
    }
    if tokio::time::timeout(TERMINATE_GRACE, child.wait()).await.is_err() {
        let _ = child.start_kill();
        let _ = child.wait().await;
    }
}

#[cfg(not(unix))]
async fn terminate_child(child: &mut Child) {
    let _ = child.start_kill();
    let _ = child.wait().await;
}
