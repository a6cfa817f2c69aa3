// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use rigmux_core::{DebugRing, RigClient};
use rigmux_protocol::{parse_request, render_error, render_response, Command, Marker, Outcome};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Mutex};
use tracing::{debug, info, warn};

use crate::error::ControlPlaneError;
use crate::registry::RigRegistry;
use crate::sync::SyncState;

const UNAVAILABLE: i32 = -1;
const UNKNOWN_COMMAND: i32 = -4;

/// The accept loop and per-connection dispatcher of §4.8. Command dispatch
/// is serialized through `dispatch_lock` so concurrent clients never race
/// the shared source rig.
pub struct VirtualServer {
    listen_addr: SocketAddr,
    registry: Arc<RigRegistry>,
    sync_state: Arc<SyncState>,
    dispatch_lock: Mutex<()>,
    debug: Arc<DebugRing>,
}

impl VirtualServer {
    pub fn new(listen_addr: SocketAddr, registry: Arc<RigRegistry>, sync_state: Arc<SyncState>, debug: Arc<DebugRing>) -> Self {
        VirtualServer { listen_addr, registry, sync_state, dispatch_lock: Mutex::new(()), debug }
    }

    /// Binds the listening socket. Split from `serve` so `start()` can
    /// surface a bind failure synchronously to its caller (§6: "fatal"
    /// errors propagate to the caller of `start()`) rather than losing it
    /// inside a spawned task.
    pub async fn bind(&self) -> Result<TcpListener, ControlPlaneError> {
        TcpListener::bind(self.listen_addr)
            .await
            .map_err(|source| ControlPlaneError::ListenerBind { addr: self.listen_addr, source })
    }

    /// Runs the accept loop until `shutdown` fires. Each accepted connection
    /// is handled on its own task; the loop itself never blocks on a client.
    pub async fn serve(self: Arc<Self>, listener: TcpListener, mut shutdown: watch::Receiver<bool>) {
        info!(addr = %self.listen_addr, "virtual rigctl server listening");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, peer)) => {
                            let server = Arc::clone(&self);
                            tokio::spawn(async move { server.handle_connection(stream, peer).await; });
                        }
                        Err(err) => warn!(error = %err, "accept failed"),
                    }
                }
                _ = shutdown.changed() => {
                    info!("virtual rigctl server shutting down");
                    return;
                }
            }
        }
    }

    async fn handle_connection(&self, stream: TcpStream, peer: SocketAddr) {
        debug!(%peer, "client connected");
        let (read_half, mut write_half) = stream.into_split();
        let mut lines = BufReader::new(read_half).lines();

        loop {
            let line = match lines.next_line().await {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(err) => {
                    warn!(%peer, error = %err, "read error");
                    break;
                }
            };

            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if matches!(trimmed, "q" | "Q" | "quit" | "exit") {
                break;
            }

            let response = self.dispatch_line(trimmed).await;
            if write_half.write_all(response.as_bytes()).await.is_err() {
                break;
            }
        }
        debug!(%peer, "client disconnected");
    }

    async fn dispatch_line(&self, line: &str) -> String {
        let request = match parse_request(line) {
            Ok(req) => req,
            Err(_) => return render_error(Marker::Raw, UNKNOWN_COMMAND),
        };
        let marker = Marker::from_request_marker(request.marker);

        let _guard = self.dispatch_lock.lock().await;
        let rigs = self.registry.current().await;
        if rigs.is_empty() {
            return render_error(marker, UNAVAILABLE);
        }
        let source_index = self.sync_state.source_index.load(Ordering::SeqCst).min(rigs.len() - 1);
        let source = &rigs[source_index];

        self.debug.add(
            "dispatch",
            vec![("command".into(), request.command.long_name().into()), ("raw".into(), line.to_string())],
        );

        if request.command.is_set() {
            let code = self.fan_out(source, &rigs, source_index, &request.command).await;
            render_response(&request.command, request.is_raw, marker, &set_outcome(&request.command, code))
        } else {
            match get_outcome(source, &request.command).await {
                Some(outcome) => render_response(&request.command, request.is_raw, marker, &outcome),
                None => render_error(marker, UNAVAILABLE),
            }
        }
    }

    /// §4.8 fan-out policy: always attempt the source; mirror to followers
    /// gated by the sync switch plus each follower's own config. The
    /// returned code reflects the source rig's outcome only.
    async fn fan_out(&self, source: &RigClient, rigs: &[Arc<RigClient>], source_index: usize, command: &Command) -> i32 {
        let source_code = apply_set(source, command).await;

        if self.sync_state.enabled.load(Ordering::SeqCst) {
            for (i, rig) in rigs.iter().enumerate() {
                if i == source_index {
                    continue;
                }
                let cfg = rig.config();
                if !cfg.follow_main || !cfg.enabled {
                    continue;
                }
                let code = apply_set(rig, command).await;
                if code != 0 {
                    warn!(rig = %cfg.name, code, "follower rejected fanned-out command");
                }
            }
        }

        source_code
    }
}

async fn apply_set(rig: &RigClient, command: &Command) -> i32 {
    match command {
        Command::SetFreq(hz) => rig.set_frequency(*hz).await,
        Command::SetMode { mode, passband } => rig.set_mode(mode.clone(), *passband).await,
        Command::SetVfo(vfo) => rig.set_vfo(vfo.clone()).await,
        Command::SetPtt(v) => rig.set_ptt(*v).await,
        other => unreachable!("{other:?} is not a set command"),
    }
}

fn set_outcome(command: &Command, code: i32) -> Outcome {
    match command {
        Command::SetFreq(_) => Outcome::SetFreq { code },
        Command::SetMode { .. } => Outcome::SetMode { code },
        Command::SetVfo(_) => Outcome::SetVfo { code },
        Command::SetPtt(_) => Outcome::SetPtt { code },
        other => unreachable!("{other:?} is not a set command"),
    }
}

async fn get_outcome(source: &RigClient, command: &Command) -> Option<Outcome> {
    match command {
        Command::GetFreq => source.get_freq().await.map(|hz| Outcome::GetFreq { hz }),
        Command::GetMode => source.get_mode().await.map(|(mode, passband)| Outcome::GetMode { mode, passband }),
        Command::GetVfo => source.get_vfo().await.map(|vfo| Outcome::GetVfo { vfo }),
        Command::ChkVfo => source.chk_vfo().await.map(|value| Outcome::ChkVfo { value }),
        Command::GetPtt => Some(Outcome::GetPtt { value: source.get_ptt().await }),
        Command::GetPowerstat => source.get_powerstat().await.map(|value| Outcome::GetPowerstat { value }),
        Command::GetSplitVfo => source.get_vfo().await.map(|tx_vfo| Outcome::GetSplitVfo { split: 0, tx_vfo }),
        Command::DumpState => Some(Outcome::DumpState { lines: source.dump_state().await }),
        Command::DumpCaps => Some(Outcome::DumpCaps { lines: source.dump_caps().await }),
        other => unreachable!("{other:?} is not a get command"),
    }
}
