// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use thiserror::Error;

/// A decoded client command, independent of how it arrived on the wire
/// (short letter, long alias, or raw `\name`).
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    GetFreq,
    SetFreq(i64),
    GetMode,
    SetMode { mode: String, passband: Option<i64> },
    GetVfo,
    SetVfo(String),
    ChkVfo,
    GetPtt,
    SetPtt(i32),
    GetPowerstat,
    GetSplitVfo,
    DumpState,
    DumpCaps,
}

impl Command {
    /// Whether this command writes rig state (and therefore participates in
    /// fan-out) rather than only reading it.
    pub fn is_set(&self) -> bool {
        matches!(
            self,
            Command::SetFreq(_) | Command::SetMode { .. } | Command::SetVfo(_) | Command::SetPtt(_)
        )
    }

    /// The canonical long name, used both for alias resolution and for the
    /// `<name>:` prefix on ERP record lines.
    pub fn long_name(&self) -> &'static str {
        match self {
            Command::GetFreq => "get_freq",
            Command::SetFreq(_) => "set_freq",
            Command::GetMode => "get_mode",
            Command::SetMode { .. } => "set_mode",
            Command::GetVfo => "get_vfo",
            Command::SetVfo(_) => "set_vfo",
            Command::ChkVfo => "chk_vfo",
            Command::GetPtt => "get_ptt",
            Command::SetPtt(_) => "set_ptt",
            Command::GetPowerstat => "get_powerstat",
            Command::GetSplitVfo => "get_split_vfo",
            Command::DumpState => "dump_state",
            Command::DumpCaps => "dump_caps",
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum ProtocolError {
    #[error("empty command line")]
    Empty,
    #[error("unknown command {0:?}")]
    Unknown(String),
    #[error("wrong number of arguments for {0}")]
    Arity(&'static str),
    #[error("invalid argument {0:?} for {1}")]
    BadArgument(String, &'static str),
}

/// A command line split into its ERP marker, raw-prefix flag, and decoded
/// command.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedRequest {
    /// The ERP marker character, if the first non-whitespace byte was one.
    pub marker: Option<char>,
    /// Whether the command token itself was written `\name` (raw form).
    pub is_raw: bool,
    pub command: Command,
}

/// Whether `ch` selects Extended Response Protocol for the request it
/// prefixes. `\`, `?`, and `_` are excluded — they are ordinary token
/// characters (raw-prefix marker and hamlib's own wildcard tokens).
fn is_erp_marker(ch: char) -> bool {
    ch.is_ascii_punctuation() && !matches!(ch, '\\' | '?' | '_')
}

/// Parse one client request line (CRLF already trimmed or not — both are
/// accepted).
pub fn parse_request(line: &str) -> Result<ParsedRequest, ProtocolError> {
    let line = line.trim_end_matches(['\r', '\n']);
    let trimmed = line.trim_start();
    let mut chars = trimmed.chars();
    let first = chars.next().ok_or(ProtocolError::Empty)?;

    let (marker, rest) = if is_erp_marker(first) {
        (Some(first), chars.as_str())
    } else {
        (None, trimmed)
    };

    let mut tokens = rest.split_whitespace();
    let head = tokens.next().ok_or(ProtocolError::Empty)?;
    let (is_raw, name) = match head.strip_prefix('\\') {
        Some(n) => (true, n),
        None => (false, head),
    };
    let args: Vec<&str> = tokens.collect();
    let command = resolve_command(name, &args)?;

    Ok(ParsedRequest { marker, is_raw, command })
}

fn parse_i64(s: &str, ctx: &'static str) -> Result<i64, ProtocolError> {
    s.parse::<i64>().map_err(|_| ProtocolError::BadArgument(s.to_string(), ctx))
}

fn parse_i32(s: &str, ctx: &'static str) -> Result<i32, ProtocolError> {
    s.parse::<i32>().map_err(|_| ProtocolError::BadArgument(s.to_string(), ctx))
}

/// Resolve a command token (short letter or long alias) plus its argument
/// tokens into a typed `Command`, validating arity along the way.
fn resolve_command(name: &str, args: &[&str]) -> Result<Command, ProtocolError> {
    match name {
        "f" | "get_freq" => {
            require_arity(args, 0, "get_freq")?;
            Ok(Command::GetFreq)
        }
        "F" | "set_freq" => {
            require_arity(args, 1, "set_freq")?;
            Ok(Command::SetFreq(parse_i64(args[0], "set_freq")?))
        }
        "m" | "get_mode" => {
            require_arity(args, 0, "get_mode")?;
            Ok(Command::GetMode)
        }
        "M" | "set_mode" => {
            if args.is_empty() || args.len() > 2 {
                return Err(ProtocolError::Arity("set_mode"));
            }
            let passband = match args.get(1) {
                Some(pb) => Some(parse_i64(pb, "set_mode")?),
                None => None,
            };
            Ok(Command::SetMode { mode: args[0].to_string(), passband })
        }
        "v" | "get_vfo" => {
            require_arity(args, 0, "get_vfo")?;
            Ok(Command::GetVfo)
        }
        "V" | "set_vfo" => {
            require_arity(args, 1, "set_vfo")?;
            Ok(Command::SetVfo(args[0].to_string()))
        }
        "chk_vfo" => {
            require_arity(args, 0, "chk_vfo")?;
            Ok(Command::ChkVfo)
        }
        "t" | "get_ptt" => {
            require_arity(args, 0, "get_ptt")?;
            Ok(Command::GetPtt)
        }
        "T" | "set_ptt" => {
            require_arity(args, 1, "set_ptt")?;
            Ok(Command::SetPtt(parse_i32(args[0], "set_ptt")?))
        }
        "get_powerstat" => {
            require_arity(args, 0, "get_powerstat")?;
            Ok(Command::GetPowerstat)
        }
        "get_split_vfo" => {
            require_arity(args, 0, "get_split_vfo")?;
            Ok(Command::GetSplitVfo)
        }
        "dump_state" => {
            require_arity(args, 0, "dump_state")?;
            Ok(Command::DumpState)
        }
        "dump_caps" => {
            require_arity(args, 0, "dump_caps")?;
            Ok(Command::DumpCaps)
        }
        other => Err(ProtocolError::Unknown(other.to_string())),
    }
}

fn require_arity(args: &[&str], expected: usize, ctx: &'static str) -> Result<(), ProtocolError> {
    if args.len() == expected {
        Ok(())
    } else {
        Err(ProtocolError::Arity(ctx))
    }
}
