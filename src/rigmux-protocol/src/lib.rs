// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The rigctl line-protocol codec: request parsing, Extended Response
//! Protocol (ERP) marker handling, and response rendering.
//!
//! Requests and responses are plain ASCII lines. This crate never opens a
//! socket or spawns a task — it only turns bytes into typed values and
//! typed values back into bytes.

pub mod command;
pub mod response;
pub mod upstream;

pub use command::{parse_request, Command, ParsedRequest, ProtocolError};
pub use response::{Marker, Outcome, render_error, render_response};
pub use upstream::UpstreamLines;
