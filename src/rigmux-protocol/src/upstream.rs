// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Decoding responses read back *from* an external rigctld (§4.1,
//! "Decoding backend output"). Different rigctld builds answer in either
//! ERP form (`Key: Value` records) or raw form (bare values, positional),
//! so backends accept both: a key→value map built from any `Key: Value`
//! lines, falling back to positional lookup in the raw line list.

use std::collections::HashMap;

pub struct UpstreamLines<'a> {
    kv: HashMap<String, String>,
    lines: &'a [String],
}

impl<'a> UpstreamLines<'a> {
    pub fn parse(lines: &'a [String]) -> Self {
        let mut kv = HashMap::new();
        for line in lines {
            if let Some((key, value)) = line.split_once(':') {
                kv.insert(key.trim().to_string(), value.trim().to_string());
            }
        }
        UpstreamLines { kv, lines }
    }

    /// Look up `key` in the parsed `Key: Value` map; if absent, fall back
    /// to the `positional`-th raw line (0-indexed).
    pub fn field(&self, key: &str, positional: usize) -> Option<&str> {
        self.kv.get(key).map(|s| s.as_str()).or_else(|| self.lines.get(positional).map(|s| s.as_str()))
    }
}
