//! Parasite CPU types and the capabilities the Tube core uses.

/// CPU types, families and the per-session catalog.
pub mod catalog;
/// Emulator capability traits.
pub mod traits;

pub use catalog::{CpuCatalog, CpuFactory, CpuFamily, CpuModel, find_cpu_type};
pub use traits::{Coprocessor, CpuDebug};
