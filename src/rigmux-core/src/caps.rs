// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use serde::{Deserialize, Serialize};

/// Boolean capability map plus deduplicated mode list, parsed once per
/// connected interval from `dump_caps` output (§4.7).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Capabilities {
    pub freq_get: bool,
    pub freq_set: bool,
    pub mode_get: bool,
    pub mode_set: bool,
    pub vfo_get: bool,
    pub vfo_set: bool,
    pub ptt_get: bool,
    pub ptt_set: bool,
    pub modes: Vec<String>,
}

/// `"Can <X>:"` line prefix -> capability field, mirroring the original
/// system's `cap_map`.
const CAP_MAP: &[(&str, fn(&mut Capabilities, bool))] = &[
    ("Can set Frequency", |c, v| c.freq_set = v),
    ("Can get Frequency", |c, v| c.freq_get = v),
    ("Can set Mode", |c, v| c.mode_set = v),
    ("Can get Mode", |c, v| c.mode_get = v),
    ("Can set VFO", |c, v| c.vfo_set = v),
    ("Can get VFO", |c, v| c.vfo_get = v),
    ("Can set PTT", |c, v| c.ptt_set = v),
    ("Can get PTT", |c, v| c.ptt_get = v),
];

/// A capability value is true when the first non-whitespace character of
/// the value is `Y` or `E` (hamlib's own convention for "yes"/"emulated").
fn parse_bool_flag(value: &str) -> bool {
    matches!(value.trim_start().chars().next(), Some('Y') | Some('E'))
}

fn parse_mode_list(rest: &str) -> Vec<String> {
    let mut seen = Vec::new();
    for tok in rest.split_whitespace() {
        let tok = tok.trim_matches(|c: char| c.is_ascii_punctuation());
        if tok.is_empty() || tok == "None" {
            continue;
        }
        if !seen.iter().any(|m: &String| m == tok) {
            seen.push(tok.to_string());
        }
    }
    seen
}

/// Parse the text of a `dump_caps` response into a capability descriptor.
pub fn parse_dump_caps(lines: &[String]) -> Capabilities {
    let mut caps = Capabilities::default();
    for line in lines {
        if let Some((prefix, rest)) = line.split_once(':') {
            let prefix = prefix.trim();
            if let Some((_, setter)) = CAP_MAP.iter().find(|(name, _)| *name == prefix) {
                setter(&mut caps, parse_bool_flag(rest));
                continue;
            }
            if prefix == "Mode list" {
                caps.modes = parse_mode_list(rest);
            }
        }
    }
    caps
}
