// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

/// A point-in-time read of a rig, produced by a backend and never mutated
/// by callers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RigStatus {
    pub connected: bool,
    pub frequency_hz: Option<i64>,
    pub mode: Option<String>,
    pub passband: Option<i64>,
    pub error: Option<String>,
}

impl RigStatus {
    pub fn disconnected(error: impl Into<String>) -> Self {
        RigStatus { connected: false, error: Some(error.into()), ..Default::default() }
    }
}
