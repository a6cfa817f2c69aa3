// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Mutex;
use tracing::debug;

use crate::backend::Backend;
use crate::caps::{parse_dump_caps, Capabilities};
use crate::config::RigConfig;
use crate::debug::DebugRing;
use crate::status::RigStatus;

struct ClientState {
    last_error: Option<String>,
    caps: Option<Capabilities>,
    caps_detected: bool,
    last_connected: bool,
    status_cache: Option<(RigStatus, Instant)>,
}

/// Wraps one backend, exclusively owned, with the policy layer described in
/// §4.7: band-limit enforcement, a short-lived status cache, and a
/// once-per-connected-interval capability probe.
pub struct RigClient {
    cfg: RigConfig,
    backend: Box<dyn Backend>,
    state: Mutex<ClientState>,
    debug: Arc<DebugRing>,
}

impl RigClient {
    pub fn new(cfg: RigConfig, backend: Box<dyn Backend>, debug: Arc<DebugRing>) -> Self {
        RigClient {
            cfg,
            backend,
            debug,
            state: Mutex::new(ClientState {
                last_error: None,
                caps: None,
                caps_detected: false,
                last_connected: false,
                status_cache: None,
            }),
        }
    }

    pub fn config(&self) -> &RigConfig {
        &self.cfg
    }

    pub async fn last_error(&self) -> Option<String> {
        self.state.lock().await.last_error.clone()
    }

    pub async fn capabilities(&self) -> Option<Capabilities> {
        self.state.lock().await.caps.clone()
    }

    async fn set_last_error(&self, message: impl Into<String>) {
        self.state.lock().await.last_error = Some(message.into());
    }

    /// Memoized for up to `poll_interval_ms` after a successful (connected)
    /// read; failed reads are never cached.
    pub async fn status(&self) -> RigStatus {
        {
            let state = self.state.lock().await;
            if let Some((status, acquired_at)) = &state.status_cache {
                if acquired_at.elapsed() < Duration::from_millis(self.cfg.poll_interval_ms) {
                    return status.clone();
                }
            }
        }

        let status = self.backend.status().await;
        let mut state = self.state.lock().await;
        if status.connected {
            state.status_cache = Some((status.clone(), Instant::now()));
        } else {
            state.status_cache = None;
        }
        status
    }

    /// The set of effective ranges is the enabled presets that carry both
    /// bounds; a bound-less enabled preset, or no presets at all, admits
    /// every frequency (§4.7).
    fn admits_frequency(&self, hz: i64) -> bool {
        let mut has_any_ranges = false;
        for preset in &self.cfg.band_presets {
            if !preset.enabled {
                continue;
            }
            match (preset.lower_hz, preset.upper_hz) {
                (Some(lo), Some(hi)) => {
                    has_any_ranges = true;
                    if lo <= hz && hz <= hi {
                        return true;
                    }
                }
                _ => return true,
            }
        }
        !has_any_ranges
    }

    /// Returns the RPRT-style result code: the band check rejects with `-1`
    /// without calling the backend; otherwise the backend's own code is
    /// returned.
    pub async fn set_frequency(&self, hz: i64) -> i32 {
        if !self.cfg.allow_out_of_band && !self.admits_frequency(hz) {
            self.set_last_error("Frequency out of configured band ranges").await;
            self.debug.add("set_freq_rejected", vec![("hz".into(), hz.to_string())]);
            return -1;
        }
        let code = self.backend.set_freq(hz).await;
        if code != 0 {
            self.set_last_error(format!("set_freq failed: RPRT {code}")).await;
        }
        self.debug.add("set_freq", vec![("hz".into(), hz.to_string()), ("code".into(), code.to_string())]);
        code
    }

    pub async fn set_mode(&self, mode: String, passband: Option<i64>) -> i32 {
        let code = self.backend.set_mode(mode.clone(), passband).await;
        if code != 0 {
            self.set_last_error(format!("set_mode failed: RPRT {code}")).await;
        }
        self.debug.add("set_mode", vec![("mode".into(), mode), ("code".into(), code.to_string())]);
        code
    }

    pub async fn set_vfo(&self, vfo: String) -> i32 {
        let code = self.backend.set_vfo(vfo.clone()).await;
        if code != 0 {
            self.set_last_error(format!("set_vfo failed: RPRT {code}")).await;
        }
        self.debug.add("set_vfo", vec![("vfo".into(), vfo), ("code".into(), code.to_string())]);
        code
    }

    pub async fn set_ptt(&self, ptt: i32) -> i32 {
        let code = self.backend.set_ptt(ptt).await;
        if code != 0 {
            self.set_last_error(format!("set_ptt failed: RPRT {code}")).await;
        }
        self.debug.add("set_ptt", vec![("ptt".into(), ptt.to_string()), ("code".into(), code.to_string())]);
        code
    }

    pub async fn get_freq(&self) -> Option<i64> {
        self.backend.get_freq().await
    }

    pub async fn get_mode(&self) -> Option<(String, i64)> {
        self.backend.get_mode().await
    }

    pub async fn get_vfo(&self) -> Option<String> {
        self.backend.get_vfo().await
    }

    pub async fn get_ptt(&self) -> Option<i32> {
        self.backend.get_ptt().await
    }

    pub async fn get_powerstat(&self) -> Option<i32> {
        self.backend.get_powerstat().await
    }

    pub async fn chk_vfo(&self) -> Option<i32> {
        self.backend.chk_vfo().await
    }

    pub async fn dump_state(&self) -> Vec<String> {
        self.backend.dump_state().await
    }

    pub async fn dump_caps(&self) -> Vec<String> {
        self.backend.dump_caps().await
    }

    /// Called by the synchronizer every tick. `caps_detected` flips true at
    /// most once per connected interval and resets on the first observed
    /// disconnection (§4.7, §8).
    pub async fn check_and_refresh_caps(&self) {
        let current = self.status().await;

        let mut state = self.state.lock().await;
        if state.last_connected && !current.connected {
            state.caps_detected = false;
            state.caps = None;
        }

        let should_probe = current.connected && !state.caps_detected;
        state.last_connected = current.connected;
        drop(state);

        if should_probe {
            let lines = self.backend.dump_caps().await;
            let caps = parse_dump_caps(&lines);
            debug!(rig = %self.cfg.name, modes = ?caps.modes, "refreshed rig capabilities");
            let mut state = self.state.lock().await;
            state.caps = Some(caps);
            // Set even when the probe came back empty — avoid retrying the
            // expensive call every tick.
            state.caps_detected = true;
        }
    }

    pub async fn close(&self) {
        self.backend.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::BoxFuture;
    use crate::config::BandPreset;
    use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};

    struct FakeBackend {
        freq_calls: AtomicUsize,
        last_freq: AtomicI64,
    }

    impl Backend for FakeBackend {
        fn get_freq(&self) -> BoxFuture<'_, Option<i64>> {
            Box::pin(async { Some(self.last_freq.load(Ordering::SeqCst)) })
        }
        fn set_freq(&self, hz: i64) -> BoxFuture<'_, i32> {
            self.freq_calls.fetch_add(1, Ordering::SeqCst);
            self.last_freq.store(hz, Ordering::SeqCst);
            Box::pin(async { 0 })
        }
        fn get_mode(&self) -> BoxFuture<'_, Option<(String, i64)>> {
            Box::pin(async { Some(("USB".to_string(), 2400)) })
        }
        fn set_mode(&self, _mode: String, _passband: Option<i64>) -> BoxFuture<'_, i32> {
            Box::pin(async { 0 })
        }
        fn get_vfo(&self) -> BoxFuture<'_, Option<String>> {
            Box::pin(async { Some("VFOA".to_string()) })
        }
        fn set_vfo(&self, _vfo: String) -> BoxFuture<'_, i32> {
            Box::pin(async { 0 })
        }
        fn get_ptt(&self) -> BoxFuture<'_, Option<i32>> {
            Box::pin(async { Some(0) })
        }
        fn set_ptt(&self, _ptt: i32) -> BoxFuture<'_, i32> {
            Box::pin(async { 0 })
        }
        fn get_powerstat(&self) -> BoxFuture<'_, Option<i32>> {
            Box::pin(async { Some(1) })
        }
        fn chk_vfo(&self) -> BoxFuture<'_, Option<i32>> {
            Box::pin(async { Some(1) })
        }
        fn dump_state(&self) -> BoxFuture<'_, Vec<String>> {
            Box::pin(async { vec![] })
        }
        fn dump_caps(&self) -> BoxFuture<'_, Vec<String>> {
            Box::pin(async { vec!["Can set Frequency: Y".to_string()] })
        }
        fn status(&self) -> BoxFuture<'_, RigStatus> {
            Box::pin(async {
                RigStatus { connected: true, frequency_hz: Some(self.last_freq.load(Ordering::SeqCst)), ..Default::default() }
            })
        }
        fn close(&self) -> BoxFuture<'_, ()> {
            Box::pin(async {})
        }
    }

    fn cfg_with_presets(presets: Vec<BandPreset>) -> RigConfig {
        RigConfig {
            name: "rig0".into(),
            enabled: true,
            poll_interval_ms: 1000,
            backend: crate::config::BackendKind::Tcp,
            host: "127.0.0.1".into(),
            port: 4532,
            model_id: None,
            device: None,
            baud: None,
            serial_opts: vec![],
            extra_args: vec![],
            follow_main: true,
            allow_out_of_band: false,
            band_presets: presets,
            color: None,
            inverted: false,
        }
    }

    #[tokio::test]
    async fn rejects_out_of_band_frequency() {
        let cfg = cfg_with_presets(vec![BandPreset {
            label: "20m".into(),
            center_hz: 14150000,
            enabled: true,
            lower_hz: Some(14000000),
            upper_hz: Some(14350000),
        }]);
        let backend = Box::new(FakeBackend { freq_calls: AtomicUsize::new(0), last_freq: AtomicI64::new(0) });
        let client = RigClient::new(cfg, backend, Arc::new(DebugRing::new(10)));

        let code = client.set_frequency(7074000).await;
        assert_eq!(code, -1);
        assert_eq!(client.last_error().await.unwrap(), "Frequency out of configured band ranges");
    }

    #[tokio::test]
    async fn admits_in_band_frequency() {
        let cfg = cfg_with_presets(vec![BandPreset {
            label: "20m".into(),
            center_hz: 14150000,
            enabled: true,
            lower_hz: Some(14000000),
            upper_hz: Some(14350000),
        }]);
        let backend = Box::new(FakeBackend { freq_calls: AtomicUsize::new(0), last_freq: AtomicI64::new(0) });
        let client = RigClient::new(cfg, backend, Arc::new(DebugRing::new(10)));

        let code = client.set_frequency(14074000).await;
        assert_eq!(code, 0);
    }

    #[tokio::test]
    async fn admits_when_no_bounded_presets_exist() {
        let cfg = cfg_with_presets(vec![]);
        let backend = Box::new(FakeBackend { freq_calls: AtomicUsize::new(0), last_freq: AtomicI64::new(0) });
        let client = RigClient::new(cfg, backend, Arc::new(DebugRing::new(10)));
        assert_eq!(client.set_frequency(1).await, 0);
    }

    #[tokio::test]
    async fn status_is_cached_within_poll_interval() {
        let cfg = cfg_with_presets(vec![]);
        let backend = Arc::new(FakeBackendCounter::default());
        struct Wrapper(Arc<FakeBackendCounter>);
        impl Backend for Wrapper {
            fn get_freq(&self) -> BoxFuture<'_, Option<i64>> {
                Box::pin(async { None })
            }
            fn set_freq(&self, _hz: i64) -> BoxFuture<'_, i32> {
                Box::pin(async { 0 })
            }
            fn get_mode(&self) -> BoxFuture<'_, Option<(String, i64)>> {
                Box::pin(async { None })
            }
            fn set_mode(&self, _mode: String, _passband: Option<i64>) -> BoxFuture<'_, i32> {
                Box::pin(async { 0 })
            }
            fn get_vfo(&self) -> BoxFuture<'_, Option<String>> {
                Box::pin(async { None })
            }
            fn set_vfo(&self, _vfo: String) -> BoxFuture<'_, i32> {
                Box::pin(async { 0 })
            }
            fn get_ptt(&self) -> BoxFuture<'_, Option<i32>> {
                Box::pin(async { None })
            }
            fn set_ptt(&self, _ptt: i32) -> BoxFuture<'_, i32> {
                Box::pin(async { 0 })
            }
            fn get_powerstat(&self) -> BoxFuture<'_, Option<i32>> {
                Box::pin(async { None })
            }
            fn chk_vfo(&self) -> BoxFuture<'_, Option<i32>> {
                Box::pin(async { None })
            }
            fn dump_state(&self) -> BoxFuture<'_, Vec<String>> {
                Box::pin(async { vec![] })
            }
            fn dump_caps(&self) -> BoxFuture<'_, Vec<String>> {
                Box::pin(async { vec![] })
            }
            fn status(&self) -> BoxFuture<'_, RigStatus> {
                self.0.calls.fetch_add(1, Ordering::SeqCst);
                Box::pin(async { RigStatus { connected: true, ..Default::default() } })
            }
            fn close(&self) -> BoxFuture<'_, ()> {
                Box::pin(async {})
            }
        }
        #[derive(Default)]
        struct FakeBackendCounter {
            calls: AtomicUsize,
        }
        let client = RigClient::new(cfg, Box::new(Wrapper(backend.clone())), Arc::new(DebugRing::new(10)));
        client.status().await;
        client.status().await;
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }
}
