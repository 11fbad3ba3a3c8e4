//! Session plumbing.
//!
//! Provides boot-ROM loading and the session that attaches a coprocessor to
//! the ULA and forwards its interrupts.

/// Boot-ROM resolution and reading.
pub mod loader;
/// ULA plus attached coprocessor.
pub mod session;

pub use loader::BootRomLoader;
pub use session::{IDLE_BUS, TubeSession};
