// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

use std::future::Future;
use std::pin::Pin;

use crate::status::RigStatus;

/// A boxed, type-erased future, used so `Backend` can be called through a
/// trait object. No `async_trait` — the method signatures box the future by
/// hand, matching how rig-control traits in this codebase have always done
/// it.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// The uniform set of operations every rig backend exposes (§4.4).
///
/// Hard I/O failures never propagate as an `Err` through these methods —
/// they resolve into the same "value absent" shape a well-behaved rig
/// would use when it simply doesn't know the answer yet, and are also
/// reflected in the next [`Backend::status`] call via `connected=false`.
pub trait Backend: Send + Sync {
    fn get_freq(&self) -> BoxFuture<'_, Option<i64>>;
    fn set_freq(&self, hz: i64) -> BoxFuture<'_, i32>;
    fn get_mode(&self) -> BoxFuture<'_, Option<(String, i64)>>;
    fn set_mode(&self, mode: String, passband: Option<i64>) -> BoxFuture<'_, i32>;
    fn get_vfo(&self) -> BoxFuture<'_, Option<String>>;
    fn set_vfo(&self, vfo: String) -> BoxFuture<'_, i32>;
    fn get_ptt(&self) -> BoxFuture<'_, Option<i32>>;
    fn set_ptt(&self, ptt: i32) -> BoxFuture<'_, i32>;
    fn get_powerstat(&self) -> BoxFuture<'_, Option<i32>>;
    /// Always issued raw (no ERP negotiation) — see SPEC_FULL.md §4.1.
    fn chk_vfo(&self) -> BoxFuture<'_, Option<i32>>;
    fn dump_state(&self) -> BoxFuture<'_, Vec<String>>;
    fn dump_caps(&self) -> BoxFuture<'_, Vec<String>>;
    fn status(&self) -> BoxFuture<'_, RigStatus>;
    /// Idempotent; releases all owned resources (sockets, subprocess
    /// handles).
    fn close(&self) -> BoxFuture<'_, ()>;
}
