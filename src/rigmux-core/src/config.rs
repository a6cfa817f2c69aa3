// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

/// A band-preset record as the core sees it: an opaque `(label, center,
/// [lo,hi], enabled)` tuple. Definitions (the fixed table of amateur
/// bands) are out of scope — this type only carries what `rigmux-core`
/// reads when enforcing band limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BandPreset {
    pub label: String,
    pub center_hz: i64,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub lower_hz: Option<i64>,
    #[serde(default)]
    pub upper_hz: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BackendKind {
    Tcp,
    Managed,
}

/// Per-rig configuration (§3). Immutable for the lifetime of the
/// `RigClient` built from it — reconfiguration replaces the whole client,
/// it never mutates one in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RigConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    pub backend: BackendKind,

    /// TCP backend target.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,

    /// Managed backend parameters.
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default)]
    pub device: Option<String>,
    #[serde(default)]
    pub baud: Option<u32>,
    #[serde(default)]
    pub serial_opts: Vec<String>,
    #[serde(default)]
    pub extra_args: Vec<String>,

    #[serde(default = "default_true")]
    pub follow_main: bool,
    #[serde(default)]
    pub allow_out_of_band: bool,
    #[serde(default)]
    pub band_presets: Vec<BandPreset>,

    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub inverted: bool,
}

/// The validated configuration object the core's three control entry
/// points (`apply`, `start`, `stop`) consume (§6). Everything upstream of
/// this — file layout, YAML, profiles — is an external collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    pub rigs: Vec<RigConfig>,
    #[serde(default)]
    pub sync_enabled: bool,
    #[serde(default)]
    pub sync_source_index: usize,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default = "default_host")]
    pub rigctl_listen_host: String,
    #[serde(default = "default_rigctl_port")]
    pub rigctl_listen_port: u16,
}

fn default_true() -> bool {
    true
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    4532
}

fn default_rigctl_port() -> u16 {
    4534
}
