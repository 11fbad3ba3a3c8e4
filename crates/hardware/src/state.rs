//! Persisted ULA state.
//!
//! Two on-disk layouts exist. The current one starts with a version byte of
//! `2`, then the ROM overlay flag, then a 68-byte register block. The legacy
//! one has no version byte: its first byte is the ROM overlay flag, and the
//! 64-byte register block that follows stops before the two fallback latches.
//!
//! Layout of the register block (all counters are 32-bit little-endian):
//!
//! | Offset | Field                                   |
//! |--------|-----------------------------------------|
//! | 0      | `ph1[24]`                               |
//! | 24     | `ph2`, `ph3[2]`, `ph4`                  |
//! | 28     | `hp1`, `hp2`, `hp3[2]`, `hp4`           |
//! | 33     | `hstat[4]`, `pstat[4]`, `r1stat`        |
//! | 42     | padding                                 |
//! | 44     | `ph1tail`, `ph1head`, `ph1count`        |
//! | 56     | `ph3pos`, `hp3pos`                      |
//! | 64     | `hpl`, `phl`, padding (current only)    |

use std::io::{Read, Write};

use tracing::debug;

use crate::common::StateError;
use crate::ula::fifo::R1_FIFO_SIZE;

/// Version byte of the current layout.
pub const STATE_VERSION: u8 = 2;

/// Size of the current register block, excluding the two header bytes.
pub const CURRENT_BLOCK_LEN: usize = 68;

/// Size of the legacy register block, excluding the overlay byte.
pub const LEGACY_BLOCK_LEN: usize = 64;

/// Offset of the first 32-bit counter in either block.
const COUNTERS_OFFSET: usize = 44;

/// Offset of the fallback latches in the current block.
const LATCHES_OFFSET: usize = 64;

/// Register file in its persisted shape.
///
/// Field names follow the persisted layout: `ph` is parasite-to-host, `hp` is
/// host-to-parasite, and `r1stat` is the control register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UlaRegisters {
    /// Channel 1 FIFO storage.
    pub ph1: [u8; R1_FIFO_SIZE],
    /// Channel 2 parasite-to-host latch.
    pub ph2: u8,
    /// Channel 3 parasite-to-host shift buffer.
    pub ph3: [u8; 2],
    /// Channel 4 parasite-to-host latch.
    pub ph4: u8,
    /// Channel 1 host-to-parasite latch.
    pub hp1: u8,
    /// Channel 2 host-to-parasite latch.
    pub hp2: u8,
    /// Channel 3 host-to-parasite shift buffer.
    pub hp3: [u8; 2],
    /// Channel 4 host-to-parasite latch.
    pub hp4: u8,
    /// Host-side status bytes.
    pub hstat: [u8; 4],
    /// Parasite-side status bytes.
    pub pstat: [u8; 4],
    /// Control register.
    pub r1stat: u8,
    /// Channel 1 FIFO write index.
    pub ph1_tail: u32,
    /// Channel 1 FIFO read index.
    pub ph1_head: u32,
    /// Channel 1 FIFO occupancy.
    pub ph1_count: u32,
    /// Channel 3 parasite-to-host occupancy.
    pub ph3_pos: u32,
    /// Channel 3 host-to-parasite occupancy.
    pub hp3_pos: u32,
    /// Fallback latches as (host-written, parasite-written); absent in the legacy layout.
    pub latches: Option<(u8, u8)>,
}

/// Which layout a persisted state was read from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateLayout {
    /// Version 2 layout.
    Current,
    /// Untagged layout written before the fallback latches were persisted.
    Legacy,
}

/// Decoded ULA state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PersistedUla {
    /// Layout the state was read from.
    pub layout: StateLayout,
    /// 6502 boot-ROM overlay flag.
    pub rom_overlay: bool,
    /// Register file.
    pub registers: UlaRegisters,
}

/// Writes ULA state in the current layout.
///
/// # Errors
///
/// Returns any error from the underlying writer. A register file without
/// fallback latches is written with both latches zero.
pub fn write_state<W: Write>(
    writer: &mut W,
    rom_overlay: bool,
    regs: &UlaRegisters,
) -> std::io::Result<()> {
    let mut block = [0u8; CURRENT_BLOCK_LEN];
    block[..R1_FIFO_SIZE].copy_from_slice(&regs.ph1);
    block[24] = regs.ph2;
    block[25..27].copy_from_slice(&regs.ph3);
    block[27] = regs.ph4;
    block[28] = regs.hp1;
    block[29] = regs.hp2;
    block[30..32].copy_from_slice(&regs.hp3);
    block[32] = regs.hp4;
    block[33..37].copy_from_slice(&regs.hstat);
    block[37..41].copy_from_slice(&regs.pstat);
    block[41] = regs.r1stat;

    let counters = [
        regs.ph1_tail,
        regs.ph1_head,
        regs.ph1_count,
        regs.ph3_pos,
        regs.hp3_pos,
    ];
    for (i, value) in counters.into_iter().enumerate() {
        let at = COUNTERS_OFFSET + i * 4;
        block[at..at + 4].copy_from_slice(&(value as i32).to_le_bytes());
    }

    let (hpl, phl) = regs.latches.unwrap_or_default();
    block[LATCHES_OFFSET] = hpl;
    block[LATCHES_OFFSET + 1] = phl;

    writer.write_all(&[STATE_VERSION, u8::from(rom_overlay)])?;
    writer.write_all(&block)
}

/// Reads ULA state in either layout.
///
/// A first byte of [`STATE_VERSION`] selects the current layout; any other
/// value is taken as the overlay flag of a legacy record.
///
/// # Errors
///
/// Returns [`StateError::Io`] if the stream ends before the block does and
/// [`StateError::FieldRange`] if a counter is negative.
pub fn read_state<R: Read>(reader: &mut R) -> Result<PersistedUla, StateError> {
    let mut tag = [0u8; 1];
    reader.read_exact(&mut tag)?;

    if tag[0] == STATE_VERSION {
        debug!("tube: loading new tube ULA structure");
        let mut overlay = [0u8; 1];
        reader.read_exact(&mut overlay)?;
        let mut block = [0u8; CURRENT_BLOCK_LEN];
        reader.read_exact(&mut block)?;
        let mut registers = decode_common(&block)?;
        registers.latches = Some((block[LATCHES_OFFSET], block[LATCHES_OFFSET + 1]));
        Ok(PersistedUla {
            layout: StateLayout::Current,
            rom_overlay: overlay[0] != 0,
            registers,
        })
    } else {
        debug!("tube: loading old tube ULA structure");
        let mut block = [0u8; LEGACY_BLOCK_LEN];
        reader.read_exact(&mut block)?;
        Ok(PersistedUla {
            layout: StateLayout::Legacy,
            rom_overlay: tag[0] != 0,
            registers: decode_common(&block)?,
        })
    }
}

/// Decodes the fields shared by both layouts.
fn decode_common(block: &[u8]) -> Result<UlaRegisters, StateError> {
    let mut ph1 = [0u8; R1_FIFO_SIZE];
    ph1.copy_from_slice(&block[..R1_FIFO_SIZE]);
    Ok(UlaRegisters {
        ph1,
        ph2: block[24],
        ph3: [block[25], block[26]],
        ph4: block[27],
        hp1: block[28],
        hp2: block[29],
        hp3: [block[30], block[31]],
        hp4: block[32],
        hstat: [block[33], block[34], block[35], block[36]],
        pstat: [block[37], block[38], block[39], block[40]],
        r1stat: block[41],
        ph1_tail: counter(block, 0, "ph1tail")?,
        ph1_head: counter(block, 1, "ph1head")?,
        ph1_count: counter(block, 2, "ph1count")?,
        ph3_pos: counter(block, 3, "ph3pos")?,
        hp3_pos: counter(block, 4, "hp3pos")?,
        latches: None,
    })
}

/// Reads the `index`th signed 32-bit counter and rejects negative values.
fn counter(block: &[u8], index: usize, field: &'static str) -> Result<u32, StateError> {
    let at = COUNTERS_OFFSET + index * 4;
    let raw = i32::from_le_bytes([block[at], block[at + 1], block[at + 2], block[at + 3]]);
    u32::try_from(raw).map_err(|_| StateError::FieldRange {
        field,
        value: i64::from(raw),
    })
}
