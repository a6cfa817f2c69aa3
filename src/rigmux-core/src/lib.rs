// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! Shared data model and per-rig machinery: the backend interface, the rig
//! client that wraps a backend with policy, the debug ring, and the serial
//! executor used by backends that own a non-reentrant resource.

pub mod backend;
pub mod caps;
pub mod client;
pub mod config;
pub mod debug;
pub mod executor;
pub mod status;

pub use backend::{Backend, BoxFuture};
pub use caps::{parse_dump_caps, Capabilities};
pub use client::RigClient;
pub use config::{BackendKind, BandPreset, Config, RigConfig};
pub use debug::{DebugEvent, DebugRing, DebugStore};
pub use executor::{ExecutorError, SerialExecutor};
pub use status::RigStatus;
