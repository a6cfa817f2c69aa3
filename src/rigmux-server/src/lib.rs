// SPDX-FileCopyrightText: 2026 Stan Grams <sjg@haxx.space>
//
// SPDX-License-Identifier: BSD-2-Clause

//! The virtual rigctl server binary's guts: configuration loading, the
//! control plane that wires the rig registry, synchronizer, and TCP server
//! together, and the three objects it exposes for `rigmuxd`'s `main`.

pub mod config;
pub mod control_plane;
pub mod error;
pub mod logging;
pub mod registry;
pub mod rig_factory;
pub mod server;
pub mod sync;

pub use control_plane::ControlPlane;
pub use error::ControlPlaneError;
