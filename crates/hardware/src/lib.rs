//! Tube coprocessor interface emulation for the BBC Micro.
//!
//! This crate implements the host/parasite communication hardware with the following:
//! 1. **ULA:** Four-channel register file with FIFO, latches, shift buffers and interrupt derivation.
//! 2. **Coprocessors:** CPU-type catalog, capability traits and per-family interrupt wiring.
//! 3. **Configuration:** Tube sections, built-in defaults and selection.
//! 4. **Simulation:** Boot-ROM loading and the session that ties a ULA to an attached CPU.
//! 5. **Speed and state:** Parasite clock multiplier and the persisted ULA layouts.

/// Error taxonomy shared by every module.
pub mod common;
/// Tube configuration (defaults, sections, resolved tube list).
pub mod config;
/// Coprocessor catalog and capability traits.
pub mod coprocessor;
/// Boot-ROM loader and tube session.
pub mod sim;
/// Speed presets and the parasite clock.
pub mod speed;
/// Persisted ULA state layouts.
pub mod state;
/// Tube ULA register file.
pub mod ula;

/// Resolved tube list; build with `TubeConfigs::load` or `TubeConfigs::builtin`.
pub use crate::config::{TubeConfigs, TubeSettings};
/// Capability set of a parasite CPU emulator.
pub use crate::coprocessor::{Coprocessor, CpuCatalog, CpuModel};
/// Session owning the ULA and the attached coprocessor.
pub use crate::sim::{BootRomLoader, TubeSession};
/// Tube ULA state machine.
pub use crate::ula::TubeUla;
