//! Fixed-capacity byte FIFO for the parasite-to-host direction of channel 1.
//!
//! A circular buffer with explicit head, tail and count, matching the three
//! counters the hardware state persists. Pushing into a full FIFO drops the
//! byte and leaves the buffer untouched.

use crate::common::StateError;

/// Capacity of the channel 1 parasite-to-host FIFO.
pub const R1_FIFO_SIZE: usize = 24;

/// Bounded circular byte buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ByteFifo<const N: usize> {
    /// Backing storage; slots outside `head..head+count` hold stale bytes.
    slots: [u8; N],
    /// Index of the oldest byte.
    head: usize,
    /// Index where the next byte will be stored.
    tail: usize,
    /// Number of unread bytes.
    count: usize,
}

impl<const N: usize> Default for ByteFifo<N> {
    fn default() -> Self {
        Self::new()
    }
}

impl<const N: usize> ByteFifo<N> {
    /// Creates an empty FIFO.
    pub const fn new() -> Self {
        Self {
            slots: [0; N],
            head: 0,
            tail: 0,
            count: 0,
        }
    }

    /// Returns the FIFO capacity.
    #[inline]
    pub const fn capacity(&self) -> usize {
        N
    }

    /// Returns the number of unread bytes.
    #[inline]
    pub const fn len(&self) -> usize {
        self.count
    }

    /// Returns true if no bytes are waiting.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Returns true if a push would overrun.
    #[inline]
    pub const fn is_full(&self) -> bool {
        self.count == N
    }

    /// Appends a byte. Returns `false` and drops the byte if the FIFO is full.
    pub fn push(&mut self, byte: u8) -> bool {
        if self.is_full() {
            return false;
        }
        self.slots[self.tail] = byte;
        self.tail = (self.tail + 1) % N;
        self.count += 1;
        true
    }

    /// Removes and returns the oldest byte.
    pub fn pop(&mut self) -> Option<u8> {
        if self.is_empty() {
            return None;
        }
        let byte = self.slots[self.head];
        self.head = (self.head + 1) % N;
        self.count -= 1;
        Some(byte)
    }

    /// Discards all unread bytes and rewinds both indices.
    pub const fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.count = 0;
    }

    /// Returns the raw storage, head, tail and count.
    pub const fn parts(&self) -> (&[u8; N], usize, usize, usize) {
        (&self.slots, self.head, self.tail, self.count)
    }

    /// Rebuilds a FIFO from persisted parts.
    ///
    /// The indices must lie inside the buffer and the tail must sit `count`
    /// slots after the head.
    pub fn from_parts(
        slots: [u8; N],
        head: usize,
        tail: usize,
        count: usize,
    ) -> Result<Self, StateError> {
        if head >= N {
            return Err(StateError::FieldRange {
                field: "ph1head",
                value: head as i64,
            });
        }
        if tail >= N {
            return Err(StateError::FieldRange {
                field: "ph1tail",
                value: tail as i64,
            });
        }
        if count > N {
            return Err(StateError::FieldRange {
                field: "ph1count",
                value: count as i64,
            });
        }
        if (head + count) % N != tail {
            return Err(StateError::FifoInconsistent { head, tail, count });
        }
        Ok(Self {
            slots,
            head,
            tail,
            count,
        })
    }
}
