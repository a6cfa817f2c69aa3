// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use crate::command::Command;

/// Response framing selected by the request's ERP marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Marker {
    /// No marker: bare value / bare `RPRT <code>`.
    Raw,
    /// `+`: records joined and terminated by `\n`.
    Newline,
    /// Any other punctuation: records joined and terminated by that char.
    Custom(char),
}

impl Marker {
    pub fn from_request_marker(marker: Option<char>) -> Marker {
        match marker {
            None => Marker::Raw,
            Some('+') => Marker::Newline,
            Some(c) => Marker::Custom(c),
        }
    }

    fn separator(self) -> Option<char> {
        match self {
            Marker::Raw => None,
            Marker::Newline => Some('\n'),
            Marker::Custom(c) => Some(c),
        }
    }
}

/// Join ERP records per §4.1/§8: for every marker, the rendered response
/// contains exactly one separator per record, trailing the last one too.
fn join_records(records: &[String], sep: char) -> String {
    let mut out = String::new();
    for rec in records {
        out.push_str(rec);
        out.push(sep);
    }
    out
}

/// The outcome of executing a decoded command, independent of how it will be
/// rendered on the wire.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    GetFreq { hz: i64 },
    SetFreq { code: i32 },
    GetMode { mode: String, passband: i64 },
    SetMode { code: i32 },
    GetVfo { vfo: String },
    SetVfo { code: i32 },
    /// `value` is `None` when the read failed and there is no ERP marker —
    /// rendered as `RPRT -1` per the resolved `get_ptt` ambiguity (§9).
    ChkVfo { value: i32 },
    GetPtt { value: Option<i32> },
    SetPtt { code: i32 },
    GetPowerstat { value: i32 },
    GetSplitVfo { split: i32, tx_vfo: String },
    DumpState { lines: Vec<String> },
    DumpCaps { lines: Vec<String> },
}

/// Render a command outcome for the given command and marker.
pub fn render_response(command: &Command, is_raw_token: bool, marker: Marker, outcome: &Outcome) -> String {
    match (command, outcome) {
        (Command::GetFreq, Outcome::GetFreq { hz }) => match marker {
            Marker::Raw => format!("{hz}\n"),
            _ => render_records(marker, &["get_freq:".to_string(), format!("Frequency: {hz}"), "RPRT 0".to_string()]),
        },
        (Command::SetFreq(hz), Outcome::SetFreq { code }) => match marker {
            Marker::Raw => format!("RPRT {code}\n"),
            _ => render_records(marker, &[format!("set_freq: {hz}"), format!("RPRT {code}")]),
        },
        (Command::GetMode, Outcome::GetMode { mode, passband }) => match marker {
            Marker::Raw => format!("{mode}\n{passband}\n"),
            _ => render_records(
                marker,
                &["get_mode:".to_string(), format!("Mode: {mode}"), format!("Passband: {passband}"), "RPRT 0".to_string()],
            ),
        },
        (Command::SetMode { mode, passband }, Outcome::SetMode { code }) => {
            let arg = match passband {
                Some(pb) => format!("{mode} {pb}"),
                None => mode.clone(),
            };
            match marker {
                Marker::Raw => format!("RPRT {code}\n"),
                _ => render_records(marker, &[format!("set_mode: {arg}"), format!("RPRT {code}")]),
            }
        }
        (Command::GetVfo, Outcome::GetVfo { vfo }) => match marker {
            Marker::Raw => format!("{vfo}\n"),
            _ => render_records(marker, &["get_vfo:".to_string(), format!("VFO: {vfo}"), "RPRT 0".to_string()]),
        },
        (Command::SetVfo(vfo), Outcome::SetVfo { code }) => match marker {
            Marker::Raw => format!("RPRT {code}\n"),
            _ => render_records(marker, &[format!("set_vfo: {vfo}"), format!("RPRT {code}")]),
        },
        (Command::ChkVfo, Outcome::ChkVfo { value }) => {
            // Three distinct renderings per §4.1: bare raw, bare short
            // (no marker, not raw-prefixed), and ERP.
            match marker {
                Marker::Raw if is_raw_token => format!("{value}\n"),
                Marker::Raw => format!("CHKVFO {value}\n"),
                _ => render_records(marker, &["chk_vfo:".to_string(), format!("{value}"), "RPRT 0".to_string()]),
            }
        }
        (Command::GetPtt, Outcome::GetPtt { value }) => match (marker, value) {
            (Marker::Raw, Some(v)) => format!("{v}\n"),
            (Marker::Raw, None) => "RPRT -1\n".to_string(),
            (_, Some(v)) => render_records(marker, &["get_ptt:".to_string(), format!("PTT: {v}"), "RPRT 0".to_string()]),
            (_, None) => render_records(marker, &["RPRT -1".to_string()]),
        },
        (Command::SetPtt(v), Outcome::SetPtt { code }) => match marker {
            Marker::Raw => format!("RPRT {code}\n"),
            _ => render_records(marker, &[format!("set_ptt: {v}"), format!("RPRT {code}")]),
        },
        (Command::GetPowerstat, Outcome::GetPowerstat { value }) => match marker {
            Marker::Raw => format!("{value}\n"),
            _ => render_records(marker, &["get_powerstat:".to_string(), format!("Power Status: {value}"), "RPRT 0".to_string()]),
        },
        (Command::GetSplitVfo, Outcome::GetSplitVfo { split, tx_vfo }) => match marker {
            Marker::Raw => format!("{split}\n{tx_vfo}\n"),
            _ => render_records(
                marker,
                &["get_split_vfo:".to_string(), format!("Split: {split}"), format!("TX VFO: {tx_vfo}"), "RPRT 0".to_string()],
            ),
        },
        (Command::DumpState, Outcome::DumpState { lines }) => render_dump("dump_state", lines, marker),
        (Command::DumpCaps, Outcome::DumpCaps { lines }) => render_dump("dump_caps", lines, marker),
        _ => unreachable!("outcome does not match command"),
    }
}

/// `dump_state`/`dump_caps`: raw form is the bare joined payload (no
/// trailing status — these are query-style commands); ERP form is one
/// record per payload line (see SPEC_FULL.md §4.1 for why — preserves the
/// `\n`-count invariant for multi-line payloads) plus a terminal `RPRT 0`.
fn render_dump(name: &str, lines: &[String], marker: Marker) -> String {
    match marker {
        Marker::Raw => {
            let mut out = lines.join("\n");
            out.push('\n');
            out
        }
        _ => {
            let mut records: Vec<String> = lines.iter().map(|l| format!("{name}: {l}")).collect();
            records.push("RPRT 0".to_string());
            render_records(marker, &records)
        }
    }
}

fn render_records(marker: Marker, records: &[String]) -> String {
    match marker.separator() {
        Some(sep) => join_records(records, sep),
        None => unreachable!("render_records called with Marker::Raw"),
    }
}

/// Render a bare error status: `RPRT <code>` raw, or a single-record ERP
/// form (trivially satisfies the record/separator-count invariant).
pub fn render_error(marker: Marker, code: i32) -> String {
    match marker {
        Marker::Raw => format!("RPRT {code}\n"),
        _ => render_records(marker, &[format!("RPRT {code}")]),
    }
}
