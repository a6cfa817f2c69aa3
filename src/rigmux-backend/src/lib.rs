// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The two concrete `Backend` implementations: a long-lived TCP connection
//! to an external rigctld, and a managed local rigctld subprocess that
//! delegates to an inner TCP backend.

pub mod managed;
pub mod tcp;

pub use managed::ManagedBackend;
pub use tcp::TcpBackend;
