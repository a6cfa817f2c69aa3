// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, warn};

use rigmux_core::backend::BoxFuture;
use rigmux_core::{Backend, RigStatus};
use rigmux_protocol::UpstreamLines;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(1500);
const OP_TIMEOUT: Duration = Duration::from_millis(1500);
const DUMP_TIMEOUT: Duration = Duration::from_secs(5);

/// Talks to an external rigctld over a long-lived, lazily (re)opened TCP
/// connection (§4.5). Every command is issued with a leading `\` so long
/// names work uniformly regardless of whether a single-letter short code
/// exists for it.
pub struct TcpBackend {
    host: String,
    port: u16,
    conn: Mutex<Option<BufStream<TcpStream>>>,
    /// Latched false on the first observed ERP downgrade; never re-probed
    /// for the lifetime of this instance (§4.5, §9).
    erp_supported: AtomicBool,
}

impl TcpBackend {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        TcpBackend { host: host.into(), port, conn: Mutex::new(None), erp_supported: AtomicBool::new(true) }
    }

    async fn ensure_connected(&self, guard: &mut Option<BufStream<TcpStream>>) -> bool {
        if guard.is_some() {
            return true;
        }
        match timeout(CONNECT_TIMEOUT, TcpStream::connect((self.host.as_str(), self.port))).await {
            Ok(Ok(stream)) => {
                *guard = Some(BufStream::new(stream));
                true
            }
            Ok(Err(e)) => {
                warn!(host = %self.host, port = self.port, error = %e, "rigctld connect failed");
                false
            }
            Err(_) => {
                warn!(host = %self.host, port = self.port, "rigctld connect timed out");
                false
            }
        }
    }

    /// Write `line`, read response lines until a terminal `RPRT <code>` or
    /// an inter-line timeout, and return what was accumulated. `None` means
    /// a hard failure (connect refused, EOF before any data, or the
    /// connection was closed mid-write) — the caller treats this as an
    /// absent value and the socket is dropped so the next call reconnects.
    async fn send_line(
        &self,
        guard: &mut Option<BufStream<TcpStream>>,
        line: &str,
        read_timeout: Duration,
    ) -> Option<(Vec<String>, i32)> {
        if !self.ensure_connected(guard).await {
            return None;
        }
        let stream = guard.as_mut().expect("just ensured connected");

        if stream.write_all(line.as_bytes()).await.is_err() || stream.write_all(b"\n").await.is_err() || stream.flush().await.is_err() {
            *guard = None;
            return None;
        }

        let mut lines = Vec::new();
        let mut code: i32 = -1;
        let mut got_any = false;

        loop {
            let mut buf = String::new();
            match timeout(read_timeout, stream.read_line(&mut buf)).await {
                Ok(Ok(0)) => {
                    *guard = None;
                    if !got_any {
                        return None;
                    }
                    break;
                }
                Ok(Ok(_)) => {
                    got_any = true;
                    let trimmed = buf.trim_end_matches(['\r', '\n']);
                    if let Some(rest) = trimmed.strip_prefix("RPRT ") {
                        if let Ok(c) = rest.trim().parse::<i32>() {
                            code = c;
                        }
                        break;
                    }
                    lines.push(trimmed.to_string());
                }
                Ok(Err(_)) => {
                    *guard = None;
                    break;
                }
                Err(_) => break, // inter-line timeout; keep what we have
            }
        }

        if code == -1 && got_any {
            code = 0;
        }
        Some((lines, code))
    }

    /// ERP negotiation (§4.5, §9): try `+\name ...` first; on a non-zero
    /// code, retry raw (`\name ...`). If raw succeeds where ERP did not,
    /// latch `erp_supported=false` for the rest of this instance's life.
    async fn send(&self, name: &str, args: &str, read_timeout: Duration) -> Option<(Vec<String>, i32)> {
        let body = format!("\\{name}{args}");
        let mut guard = self.conn.lock().await;

        if !self.erp_supported.load(Ordering::SeqCst) {
            return self.send_line(&mut guard, &body, read_timeout).await;
        }

        let erp_line = format!("+{body}");
        let erp_result = self.send_line(&mut guard, &erp_line, read_timeout).await;
        match erp_result {
            Some((_, 0)) => erp_result,
            Some((erp_lines, erp_code)) => match self.send_line(&mut guard, &body, read_timeout).await {
                Some((raw_lines, raw_code)) => {
                    if raw_code == 0 {
                        debug!(host = %self.host, port = self.port, command = name, "ERP unsupported, latching raw form");
                        self.erp_supported.store(false, Ordering::SeqCst);
                    }
                    Some((raw_lines, raw_code))
                }
                None => Some((erp_lines, erp_code)),
            },
            None => None,
        }
    }

    /// `chk_vfo` always goes out raw, bypassing ERP negotiation entirely —
    /// some rigctld builds answer `+\chk_vfo` incorrectly (§4.1).
    async fn send_chk_vfo_raw(&self) -> Option<(Vec<String>, i32)> {
        let mut guard = self.conn.lock().await;
        self.send_line(&mut guard, "\\chk_vfo", OP_TIMEOUT).await
    }
}

impl Backend for TcpBackend {
    fn get_freq(&self) -> BoxFuture<'_, Option<i64>> {
        Box::pin(async move {
            let (lines, _) = self.send("get_freq", "", OP_TIMEOUT).await?;
            UpstreamLines::parse(&lines).field("Frequency", 0)?.parse().ok()
        })
    }

    fn set_freq(&self, hz: i64) -> BoxFuture<'_, i32> {
        Box::pin(async move { self.send("set_freq", &format!(" {hz}"), OP_TIMEOUT).await.map(|(_, c)| c).unwrap_or(-1) })
    }

    fn get_mode(&self) -> BoxFuture<'_, Option<(String, i64)>> {
        Box::pin(async move {
            let (lines, _) = self.send("get_mode", "", OP_TIMEOUT).await?;
            let parsed = UpstreamLines::parse(&lines);
            let mode = parsed.field("Mode", 0)?.to_string();
            let passband = parsed.field("Passband", 1).and_then(|v| v.parse().ok()).unwrap_or(0);
            Some((mode, passband))
        })
    }

    fn set_mode(&self, mode: String, passband: Option<i64>) -> BoxFuture<'_, i32> {
        Box::pin(async move {
            let args = match passband {
                Some(pb) => format!(" {mode} {pb}"),
                None => format!(" {mode}"),
            };
            self.send("set_mode", &args, OP_TIMEOUT).await.map(|(_, c)| c).unwrap_or(-1)
        })
    }

    fn get_vfo(&self) -> BoxFuture<'_, Option<String>> {
        Box::pin(async move {
            let (lines, _) = self.send("get_vfo", "", OP_TIMEOUT).await?;
            UpstreamLines::parse(&lines).field("VFO", 0).map(str::to_string)
        })
    }

    fn set_vfo(&self, vfo: String) -> BoxFuture<'_, i32> {
        Box::pin(async move { self.send("set_vfo", &format!(" {vfo}"), OP_TIMEOUT).await.map(|(_, c)| c).unwrap_or(-1) })
    }

    fn get_ptt(&self) -> BoxFuture<'_, Option<i32>> {
        Box::pin(async move {
            let (lines, _) = self.send("get_ptt", "", OP_TIMEOUT).await?;
            UpstreamLines::parse(&lines).field("PTT", 0)?.parse().ok()
        })
    }

    fn set_ptt(&self, ptt: i32) -> BoxFuture<'_, i32> {
        Box::pin(async move { self.send("set_ptt", &format!(" {ptt}"), OP_TIMEOUT).await.map(|(_, c)| c).unwrap_or(-1) })
    }

    fn get_powerstat(&self) -> BoxFuture<'_, Option<i32>> {
        Box::pin(async move {
            let (lines, _) = self.send("get_powerstat", "", OP_TIMEOUT).await?;
            UpstreamLines::parse(&lines).field("Power Status", 0)?.parse().ok()
        })
    }

    fn chk_vfo(&self) -> BoxFuture<'_, Option<i32>> {
        Box::pin(async move {
            let (lines, code) = self.send_chk_vfo_raw().await?;
            if let Some(first) = lines.first() {
                first.parse().ok()
            } else if code >= 0 {
                Some(code)
            } else {
                None
            }
        })
    }

    fn dump_state(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move { self.send("dump_state", "", DUMP_TIMEOUT).await.map(|(lines, _)| lines).unwrap_or_default() })
    }

    fn dump_caps(&self) -> BoxFuture<'_, Vec<String>> {
        Box::pin(async move { self.send("dump_caps", "", DUMP_TIMEOUT).await.map(|(lines, _)| lines).unwrap_or_default() })
    }

    fn status(&self) -> BoxFuture<'_, RigStatus> {
        Box::pin(async move {
            match self.get_freq().await {
                Some(hz) => {
                    let (mode, passband) = self.get_mode().await.unwrap_or_default();
                    RigStatus { connected: true, frequency_hz: Some(hz), mode: Some(mode).filter(|m| !m.is_empty()), passband: Some(passband), error: None }
                }
                None => RigStatus::disconnected("no response from rigctld"),
            }
        })
    }

    fn close(&self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            let mut guard = self.conn.lock().await;
            *guard = None;
        })
    }
}
