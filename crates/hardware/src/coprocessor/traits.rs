//! Capability set a CPU emulator presents to the Tube core.
//!
//! The Tube core never executes parasite instructions itself. It starts the
//! emulator with a boot image, resets it when the host releases the reset
//! line, and hands its debugger to the front end unchanged.

use crate::common::CoprocessorError;

/// A parasite CPU emulator.
pub trait Coprocessor {
    /// Starts the emulator, with the boot ROM image when the configuration names one.
    ///
    /// # Errors
    ///
    /// Returns [`CoprocessorError`] if the emulator cannot run with this image.
    fn init(&mut self, boot_rom: Option<Vec<u8>>) -> Result<(), CoprocessorError>;

    /// Resets the CPU.
    fn reset(&mut self);

    /// Returns the emulator's debugger, if it has one.
    fn debugger(&mut self) -> Option<&mut dyn CpuDebug> {
        None
    }
}

/// Register and memory introspection of a parasite CPU.
///
/// Opaque to the Tube core; passed through to the debugger front end.
pub trait CpuDebug {
    /// Name the debugger shows for this CPU.
    fn cpu_name(&self) -> &str;

    /// Names of the registers, in the order [`CpuDebug::register`] indexes them.
    fn register_names(&self) -> &[&'static str];

    /// Reads a register.
    fn register(&self, index: usize) -> u32;

    /// Writes a register.
    fn set_register(&mut self, index: usize, value: u32);

    /// Reads a byte of parasite memory.
    fn read_memory(&mut self, addr: u32) -> u8;

    /// Writes a byte of parasite memory.
    fn write_memory(&mut self, addr: u32, value: u8);
}
