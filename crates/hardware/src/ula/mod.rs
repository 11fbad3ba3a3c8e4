//! Tube ULA register file.
//!
//! The Tube ULA joins the host and the parasite through four channels, each a
//! status/data register pair seen from both sides. It provides:
//! 1. **Channel 1:** 24-byte FIFO parasite-to-host, single latch host-to-parasite.
//! 2. **Channels 2 and 4:** Single latch in each direction.
//! 3. **Channel 3:** One- or two-byte shift buffer in each direction.
//! 4. **Control:** The host-written control register (interrupt enables, resets, channel 3 width).
//! 5. **Interrupts:** Host IRQ, parasite IRQ and parasite NMI, recomputed after every access.
//!
//! # Register Map
//!
//! The low three address bits select the register on both sides:
//!
//! * `0`: Channel 1 status (host writes here to update the control register)
//! * `1`: Channel 1 data
//! * `2`: Channel 2 status
//! * `3`: Channel 2 data
//! * `4`: Channel 3 status
//! * `5`: Channel 3 data
//! * `6`: Channel 4 status
//! * `7`: Channel 4 data
//!
//! Data reads from an empty FIFO or shift buffer return the last byte written
//! by the other side, whatever channel it went to.

/// Channel 1 FIFO.
pub mod fifo;
/// Control-register and status flag sets.
pub mod flags;
/// Interrupt line derivation and the edge sink.
pub mod interrupts;
/// Channel 3 shift buffer.
pub mod shift;

use std::io::{Read, Write};

use tracing::{debug, trace};

use crate::common::StateError;
use crate::state::{self, StateLayout, UlaRegisters};

use fifo::{ByteFifo, R1_FIFO_SIZE};
use flags::{Control, HOST_STATUS_RESET, PARASITE_STATUS_RESET, Status};
use interrupts::InterruptLines;
use shift::ShiftBuffer;

pub use interrupts::{InterruptDelivery, InterruptLine, InterruptSink, NullSink};

/// Channel 1 status / control register.
const REG_R1_STATUS: u32 = 0;
/// Channel 1 data.
const REG_R1_DATA: u32 = 1;
/// Channel 2 status.
const REG_R2_STATUS: u32 = 2;
/// Channel 2 data.
const REG_R2_DATA: u32 = 3;
/// Channel 3 status.
const REG_R3_STATUS: u32 = 4;
/// Channel 3 data.
const REG_R3_DATA: u32 = 5;
/// Channel 4 status.
const REG_R4_STATUS: u32 = 6;
/// Channel 4 data.
const REG_R4_DATA: u32 = 7;

/// Status array index of each channel.
const R1: usize = 0;
const R2: usize = 1;
const R3: usize = 2;
const R4: usize = 3;

/// Side effect of a host write that the owner of the parasite must carry out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use]
pub enum WriteOutcome {
    /// Nothing beyond the register update.
    Done,
    /// The host released the parasite reset line; the parasite CPU must reset.
    ResetParasite,
}

/// Tube ULA state machine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeUla {
    /// Channel 1, parasite to host.
    ph1: ByteFifo<R1_FIFO_SIZE>,
    /// Channel 2, parasite to host.
    ph2: u8,
    /// Channel 3, parasite to host.
    ph3: ShiftBuffer,
    /// Channel 4, parasite to host.
    ph4: u8,
    /// Channel 1, host to parasite.
    hp1: u8,
    /// Channel 2, host to parasite.
    hp2: u8,
    /// Channel 3, host to parasite.
    hp3: ShiftBuffer,
    /// Channel 4, host to parasite.
    hp4: u8,
    /// Host-side status bytes, channels 1 to 4.
    host_status: [Status; 4],
    /// Parasite-side status bytes, channels 1 to 4.
    parasite_status: [Status; 4],
    /// Control register (six bits).
    control: Control,
    /// Last byte written by the host, returned by empty parasite reads.
    host_latch: u8,
    /// Last byte written by the parasite, returned by empty host reads.
    parasite_latch: u8,
    /// 6502 coprocessor boot ROM paged into the parasite memory map.
    rom_overlay: bool,
    /// Interrupt lines as of the last access.
    lines: InterruptLines,
}

impl Default for TubeUla {
    fn default() -> Self {
        Self::new()
    }
}

impl TubeUla {
    /// Creates a ULA in its power-on state.
    pub fn new() -> Self {
        Self {
            ph1: ByteFifo::new(),
            ph2: 0,
            ph3: ShiftBuffer::primed(),
            ph4: 0,
            hp1: 0,
            hp2: 0,
            hp3: ShiftBuffer::new(),
            hp4: 0,
            host_status: HOST_STATUS_RESET,
            parasite_status: PARASITE_STATUS_RESET,
            control: Control::empty(),
            host_latch: 0,
            parasite_latch: 0,
            rom_overlay: false,
            lines: InterruptLines::IDLE,
        }
    }

    /// Hard reset: clears every buffer and status byte and the control register.
    pub fn reset(&mut self) {
        self.reset_channels();
        self.control = Control::empty();
        let _ = self.update_interrupts();
    }

    /// Soft reset: clears buffers and status bytes, leaving the control register alone.
    fn reset_channels(&mut self) {
        self.ph1.clear();
        self.ph3 = ShiftBuffer::primed();
        self.hp3 = ShiftBuffer::new();
        self.host_status = HOST_STATUS_RESET;
        self.parasite_status = PARASITE_STATUS_RESET;
    }

    /// Returns the control register.
    pub const fn control(&self) -> Control {
        self.control
    }

    /// Returns the interrupt lines as of the last access.
    pub const fn lines(&self) -> InterruptLines {
        self.lines
    }

    /// Returns the host-side status byte of a channel (1 to 4).
    pub const fn host_status(&self, channel: usize) -> Status {
        self.host_status[channel.wrapping_sub(1) & 3]
    }

    /// Returns the parasite-side status byte of a channel (1 to 4).
    pub const fn parasite_status(&self, channel: usize) -> Status {
        self.parasite_status[channel.wrapping_sub(1) & 3]
    }

    /// Returns the number of bytes waiting in the channel 1 FIFO.
    pub const fn r1_fifo_len(&self) -> usize {
        self.ph1.len()
    }

    /// Returns the occupancy of the channel 3 buffers as (parasite-to-host, host-to-parasite).
    pub const fn r3_occupancy(&self) -> (usize, usize) {
        (self.ph3.len(), self.hp3.len())
    }

    /// Returns true while the 6502 coprocessor's boot ROM is paged in.
    pub const fn rom_overlay(&self) -> bool {
        self.rom_overlay
    }

    /// Pages the 6502 coprocessor's boot ROM in or out.
    pub const fn set_rom_overlay(&mut self, active: bool) {
        self.rom_overlay = active;
    }

    /// Recomputes the interrupt lines from the current register state.
    pub fn update_interrupts(&mut self) -> InterruptLines {
        self.lines = InterruptLines::derive(self.control, &self.host_status, &self.parasite_status);
        self.lines
    }

    /// Host read of a Tube register.
    pub fn host_read(&mut self, addr: u16) -> u8 {
        let value = match u32::from(addr) & 7 {
            REG_R1_STATUS => {
                (self.host_status[R1] & Status::BOTH).bits() | self.control.bits()
            }
            REG_R1_DATA => {
                if let Some(byte) = self.ph1.pop() {
                    if self.ph1.is_empty() {
                        self.host_status[R1].remove(Status::DATA);
                    }
                    self.parasite_status[R1].insert(Status::SPACE);
                    trace!("tube: host read R1={byte:02X} from FIFO");
                    byte
                } else {
                    trace!("tube: host read R1={:02X} from latch", self.parasite_latch);
                    self.parasite_latch
                }
            }
            REG_R2_STATUS => self.host_status[R2].bits(),
            REG_R2_DATA => self.host_take_latch(R2, self.ph2),
            REG_R3_STATUS => self.host_status[R3].bits(),
            REG_R3_DATA => {
                if let Some(byte) = self.ph3.pop() {
                    if self.ph3.is_empty() {
                        self.host_status[R3].remove(Status::DATA);
                        self.parasite_status[R3].insert(Status::BOTH);
                    }
                    trace!("tube: host read R3={byte:02X} from FIFO");
                    byte
                } else {
                    trace!("tube: host read R3={:02X} from latch", self.parasite_latch);
                    self.parasite_latch
                }
            }
            REG_R4_STATUS => self.host_status[R4].bits(),
            _ => self.host_take_latch(R4, self.ph4),
        };
        let _ = self.update_interrupts();
        value
    }

    /// Host read of a channel 2 or 4 data latch.
    fn host_take_latch(&mut self, channel: usize, byte: u8) -> u8 {
        trace!("tube: host read R{}={byte:02X}", channel + 1);
        self.host_status[channel].remove(Status::DATA);
        self.parasite_status[channel].insert(Status::SPACE);
        byte
    }

    /// Host write of a Tube register.
    ///
    /// The register update and interrupt recomputation are complete before this
    /// returns, so a parasite reset requested by the write sees settled state.
    pub fn host_write(&mut self, addr: u16, value: u8) -> WriteOutcome {
        self.host_latch = value;
        let mut outcome = WriteOutcome::Done;

        match u32::from(addr) & 7 {
            REG_R1_STATUS => outcome = self.write_control(value),
            REG_R1_DATA => {
                trace!("tube: host write R1={value:02X}");
                self.hp1 = value;
                self.host_fill_latch(R1);
            }
            REG_R2_DATA => {
                trace!("tube: host write R2={value:02X}");
                self.hp2 = value;
                self.host_fill_latch(R2);
            }
            REG_R3_DATA => {
                let width = self.control.r3_width();
                if self.hp3.push(value, width) {
                    trace!("tube: host write R3={value:02X} (successful)");
                    if self.hp3.len() >= width {
                        self.parasite_status[R3].insert(Status::DATA);
                        self.host_status[R3].remove(Status::SPACE);
                    }
                } else {
                    debug!("tube: host write R3={value:02X} (overrun)");
                }
            }
            REG_R4_DATA => {
                trace!("tube: host write R4={value:02X}");
                self.hp4 = value;
                self.host_fill_latch(R4);
            }
            _ => {}
        }
        let _ = self.update_interrupts();
        outcome
    }

    /// Host write into a channel 1, 2 or 4 latch.
    fn host_fill_latch(&mut self, channel: usize) {
        self.parasite_status[channel].insert(Status::DATA);
        self.host_status[channel].remove(Status::SPACE);
    }

    /// Applies a host write to the control register.
    fn write_control(&mut self, value: u8) -> WriteOutcome {
        let mask = Control::mask_of(value);
        let mut outcome = WriteOutcome::Done;

        let written = Control::from_bits_retain(value);
        if written.contains(Control::SET) {
            // T is never held, so every set-mode write carrying it is a fresh trigger.
            if written.contains(Control::CLEAR_ALL) {
                debug!("tube: soft reset via control register");
                self.reset_channels();
            }
            self.control.insert(mask);
        } else {
            if mask.contains(Control::PARASITE_RESET)
                && self.control.contains(Control::PARASITE_RESET)
            {
                outcome = WriteOutcome::ResetParasite;
            }
            self.control.remove(mask);
        }
        debug!("tube: host write S1={value:02X}->{:02X}", self.control.bits());
        self.host_status[R1] =
            Status::raw((self.host_status[R1] & Status::BOTH).bits() | mask.bits());
        outcome
    }

    /// Parasite read of a Tube register.
    pub fn parasite_read(&mut self, addr: u32) -> u8 {
        let value = match addr & 7 {
            REG_R1_STATUS => {
                self.rom_overlay = false;
                self.parasite_status[R1].bits() | self.control.bits()
            }
            REG_R1_DATA => self.parasite_take_latch(R1, self.hp1),
            REG_R2_STATUS => self.parasite_status[R2].bits(),
            REG_R2_DATA => self.parasite_take_latch(R2, self.hp2),
            REG_R3_STATUS => self.parasite_status[R3].bits(),
            REG_R3_DATA => {
                if let Some(byte) = self.hp3.pop() {
                    trace!("tube: parasite read R3={byte:02X} from FIFO");
                    if self.hp3.is_empty() {
                        self.host_status[R3].insert(Status::SPACE);
                        self.parasite_status[R3].remove(Status::DATA);
                    }
                    byte
                } else {
                    trace!("tube: parasite read R3={:02X} from latch", self.host_latch);
                    self.host_latch
                }
            }
            REG_R4_STATUS => self.parasite_status[R4].bits(),
            _ => self.parasite_take_latch(R4, self.hp4),
        };
        let _ = self.update_interrupts();
        value
    }

    /// Parasite read of a channel 1, 2 or 4 latch.
    fn parasite_take_latch(&mut self, channel: usize, byte: u8) -> u8 {
        trace!("tube: parasite read R{}={byte:02X}", channel + 1);
        self.parasite_status[channel].remove(Status::DATA);
        self.host_status[channel].insert(Status::SPACE);
        byte
    }

    /// Parasite write of a Tube register.
    pub fn parasite_write(&mut self, addr: u32, value: u8) {
        self.parasite_latch = value;

        match addr & 7 {
            REG_R1_DATA => {
                if self.ph1.push(value) {
                    trace!("tube: parasite write R1={value:02X} (successful)");
                    self.host_status[R1].insert(Status::DATA);
                    if self.ph1.is_full() {
                        self.parasite_status[R1].remove(Status::SPACE);
                    }
                } else {
                    debug!("tube: parasite write R1={value:02X} (overrun)");
                }
            }
            REG_R2_DATA => {
                trace!("tube: parasite write R2={value:02X}");
                self.ph2 = value;
                self.parasite_fill_latch(R2);
            }
            REG_R3_DATA => {
                let width = self.control.r3_width();
                if self.ph3.push(value, width) {
                    trace!("tube: parasite write R3={value:02X} (successful)");
                    if self.ph3.len() >= width {
                        self.host_status[R3].insert(Status::DATA);
                        self.parasite_status[R3].remove(Status::BOTH);
                    }
                } else {
                    debug!("tube: parasite write R3={value:02X} (overrun)");
                }
            }
            REG_R4_DATA => {
                trace!("tube: parasite write R4={value:02X}");
                self.ph4 = value;
                self.parasite_fill_latch(R4);
            }
            _ => {}
        }
        let _ = self.update_interrupts();
    }

    /// Parasite write into a channel 2 or 4 latch.
    fn parasite_fill_latch(&mut self, channel: usize) {
        self.host_status[channel].insert(Status::DATA);
        self.parasite_status[channel].remove(Status::SPACE);
    }

    /// Captures the register file in its persisted form.
    pub fn registers(&self) -> UlaRegisters {
        let (ph1, ph1_head, ph1_tail, ph1_count) = self.ph1.parts();
        let (ph3, ph3_pos) = self.ph3.parts();
        let (hp3, hp3_pos) = self.hp3.parts();
        UlaRegisters {
            ph1: *ph1,
            ph2: self.ph2,
            ph3,
            ph4: self.ph4,
            hp1: self.hp1,
            hp2: self.hp2,
            hp3,
            hp4: self.hp4,
            hstat: self.host_status.map(|status| status.bits()),
            pstat: self.parasite_status.map(|status| status.bits()),
            r1stat: self.control.bits(),
            ph1_tail: ph1_tail as u32,
            ph1_head: ph1_head as u32,
            ph1_count: ph1_count as u32,
            ph3_pos: ph3_pos as u32,
            hp3_pos: hp3_pos as u32,
            latches: Some((self.host_latch, self.parasite_latch)),
        }
    }

    /// Replaces the register file with persisted state and recomputes the interrupt lines.
    ///
    /// When the persisted form carries no fallback latches the live latches are kept.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] and changes nothing if a FIFO index, the FIFO
    /// count or a shift-buffer position is out of range.
    pub fn restore(&mut self, regs: &UlaRegisters) -> Result<InterruptLines, StateError> {
        let ph1 = ByteFifo::from_parts(
            regs.ph1,
            regs.ph1_head as usize,
            regs.ph1_tail as usize,
            regs.ph1_count as usize,
        )?;
        let ph3 = ShiftBuffer::from_parts(regs.ph3, regs.ph3_pos as usize, "ph3pos")?;
        let hp3 = ShiftBuffer::from_parts(regs.hp3, regs.hp3_pos as usize, "hp3pos")?;

        self.ph1 = ph1;
        self.ph2 = regs.ph2;
        self.ph3 = ph3;
        self.ph4 = regs.ph4;
        self.hp1 = regs.hp1;
        self.hp2 = regs.hp2;
        self.hp3 = hp3;
        self.hp4 = regs.hp4;
        self.host_status = regs.hstat.map(Status::raw);
        self.parasite_status = regs.pstat.map(Status::raw);
        self.control = Control::mask_of(regs.r1stat);
        if let Some((host_latch, parasite_latch)) = regs.latches {
            self.host_latch = host_latch;
            self.parasite_latch = parasite_latch;
        }
        Ok(self.update_interrupts())
    }

    /// Writes the register file and the ROM overlay flag in the current layout.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn save_state<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        state::write_state(writer, self.rom_overlay, &self.registers())
    }

    /// Replaces the register file and the ROM overlay flag with persisted state.
    ///
    /// Interrupt lines are recomputed once afterwards. On error the live state
    /// is left untouched.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the stream is truncated or holds counters the
    /// register file cannot represent.
    pub fn load_state<R: Read>(&mut self, reader: &mut R) -> Result<StateLayout, StateError> {
        let persisted = state::read_state(reader)?;
        let _ = self.restore(&persisted.registers)?;
        self.rom_overlay = persisted.rom_overlay;
        Ok(persisted.layout)
    }
}
