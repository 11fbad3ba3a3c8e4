//! Control-register and channel-status flag sets.
//!
//! Both registers are exposed to software as raw bytes, so both flag sets retain
//! bits that have no named meaning. Status bytes in particular carry a fixed
//! idle pattern in their low bits after reset, and that pattern is visible to
//! software reading the status addresses.

use bitflags::bitflags;

bitflags! {
    /// Tube control register, written by the host through the channel 1 status address.
    ///
    /// Only the low six bits are held in the register. `SET` selects whether a
    /// write ORs the low bits in or clears them. `CLEAR_ALL` is a trigger seen
    /// only in the written byte and is never held.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Control: u8 {
        /// Q: host IRQ from channel 4.
        const HOST_IRQ_R4 = 0x01;
        /// I: parasite IRQ from channel 1.
        const PARASITE_IRQ_R1 = 0x02;
        /// J: parasite IRQ from channel 4.
        const PARASITE_IRQ_R4 = 0x04;
        /// M: parasite NMI from channel 3.
        const PARASITE_NMI_R3 = 0x08;
        /// V: two-byte operation of channel 3.
        const TWO_BYTE_R3 = 0x10;
        /// P: hold the parasite in reset.
        const PARASITE_RESET = 0x20;
        /// T: clear all Tube registers (soft reset).
        const CLEAR_ALL = 0x40;
        /// S: set (rather than clear) the flags in the mask.
        const SET = 0x80;
    }
}

impl Control {
    /// Bits that a control write can set or clear.
    pub const WRITABLE: Self = Self::from_bits_retain(0x3F);

    /// Returns the control bits of a raw control-register write.
    pub const fn mask_of(value: u8) -> Self {
        Self::from_bits_retain(value & Self::WRITABLE.bits())
    }

    /// Returns the active width of channel 3 in bytes.
    pub const fn r3_width(self) -> usize {
        if self.contains(Self::TWO_BYTE_R3) { 2 } else { 1 }
    }
}

bitflags! {
    /// Status byte of one side of one channel.
    ///
    /// Bit 7 reports unread data for this side, bit 6 reports room for this side
    /// to write. The remaining bits are retained as-is.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Status: u8 {
        /// Room available for this side to write.
        const SPACE = 0x40;
        /// Unread data available for this side to read.
        const DATA = 0x80;
        /// Both data and space available.
        const BOTH = 0xC0;
    }
}

impl Status {
    /// Creates a status byte from raw register bits, keeping every bit.
    pub const fn raw(bits: u8) -> Self {
        Self::from_bits_retain(bits)
    }

    /// Returns true if this side has unread data.
    pub const fn data_available(self) -> bool {
        self.contains(Self::DATA)
    }

    /// Returns true if this side has room to write.
    pub const fn space_available(self) -> bool {
        self.contains(Self::SPACE)
    }
}

/// Power-on host status bytes, channels 1 to 4.
pub const HOST_STATUS_RESET: [Status; 4] = [
    Status::SPACE,
    Status::SPACE,
    Status::BOTH,
    Status::SPACE,
];

/// Power-on parasite status bytes, channels 1 to 4.
pub const PARASITE_STATUS_RESET: [Status; 4] = [
    Status::SPACE,
    Status::raw(0x7F),
    Status::raw(0x3F),
    Status::raw(0x7F),
];
