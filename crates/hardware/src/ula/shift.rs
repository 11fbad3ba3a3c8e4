//! Channel 3 shift buffer.
//!
//! Channel 3 models a 16-bit register transferred a byte at a time. Each
//! direction holds up to two bytes; the control register's two-byte flag sets
//! how many bytes make the buffer full. Reads take the first byte and shift
//! the second one down.

use crate::common::StateError;

/// Maximum number of bytes a shift buffer can hold.
pub const SHIFT_CAPACITY: usize = 2;

/// One- or two-byte ordered buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ShiftBuffer {
    bytes: [u8; SHIFT_CAPACITY],
    len: usize,
}

impl ShiftBuffer {
    /// Creates an empty buffer.
    pub const fn new() -> Self {
        Self {
            bytes: [0; SHIFT_CAPACITY],
            len: 0,
        }
    }

    /// Creates a buffer holding a single zero byte, the idle state of the
    /// parasite-to-host direction after reset.
    pub const fn primed() -> Self {
        Self {
            bytes: [0; SHIFT_CAPACITY],
            len: 1,
        }
    }

    /// Returns the number of buffered bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.len
    }

    /// Returns true if no bytes are buffered.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Appends a byte unless `width` bytes are already buffered.
    ///
    /// Returns `false` when the byte was dropped.
    pub fn push(&mut self, byte: u8, width: usize) -> bool {
        if self.len >= width.min(SHIFT_CAPACITY) {
            return false;
        }
        self.bytes[self.len] = byte;
        self.len += 1;
        true
    }

    /// Removes the first byte, shifting the second one down.
    pub fn pop(&mut self) -> Option<u8> {
        if self.len == 0 {
            return None;
        }
        let byte = self.bytes[0];
        self.bytes[0] = self.bytes[1];
        self.len -= 1;
        Some(byte)
    }

    /// Returns the raw storage and occupancy.
    pub const fn parts(&self) -> ([u8; SHIFT_CAPACITY], usize) {
        (self.bytes, self.len)
    }

    /// Rebuilds a buffer from persisted parts.
    pub fn from_parts(
        bytes: [u8; SHIFT_CAPACITY],
        len: usize,
        field: &'static str,
    ) -> Result<Self, StateError> {
        if len > SHIFT_CAPACITY {
            return Err(StateError::FieldRange {
                field,
                value: len as i64,
            });
        }
        Ok(Self { bytes, len })
    }
}
