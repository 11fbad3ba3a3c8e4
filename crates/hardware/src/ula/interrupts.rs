//! Interrupt lines derived from ULA state, and the sink that receives their edges.
//!
//! The ULA recomputes its three output lines after every register access. Only
//! changes of level are forwarded to the CPUs; a line that stays asserted is
//! not delivered again.

use crate::ula::flags::{Control, Status};

/// Snapshot of the three ULA interrupt outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InterruptLines {
    /// IRQ to the host, from channel 4.
    pub host_irq: bool,
    /// IRQ to the parasite, from channels 1 and 4.
    pub parasite_irq: bool,
    /// NMI to the parasite, from channel 3.
    pub parasite_nmi: bool,
}

impl InterruptLines {
    /// All lines released.
    pub const IDLE: Self = Self {
        host_irq: false,
        parasite_irq: false,
        parasite_nmi: false,
    };

    /// Derives the line levels from the control register and the status bytes.
    ///
    /// `host` and `parasite` are the per-channel status bytes, channel 1 first.
    pub const fn derive(control: Control, host: &[Status; 4], parasite: &[Status; 4]) -> Self {
        Self {
            host_irq: control.contains(Control::HOST_IRQ_R4) && host[3].data_available(),
            parasite_irq: (control.contains(Control::PARASITE_IRQ_R1)
                && parasite[0].data_available())
                || (control.contains(Control::PARASITE_IRQ_R4) && parasite[3].data_available()),
            parasite_nmi: control.contains(Control::PARASITE_NMI_R3)
                && parasite[2].data_available(),
        }
    }

    /// Returns the lines whose level differs from `previous`, with their new level.
    pub fn edges_since(self, previous: Self) -> impl Iterator<Item = (InterruptLine, bool)> {
        [
            (InterruptLine::HostIrq, previous.host_irq, self.host_irq),
            (InterruptLine::ParasiteIrq, previous.parasite_irq, self.parasite_irq),
            (InterruptLine::ParasiteNmi, previous.parasite_nmi, self.parasite_nmi),
        ]
        .into_iter()
        .filter(|(_, was, now)| was != now)
        .map(|(line, _, now)| (line, now))
    }
}

/// One of the three ULA interrupt outputs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptLine {
    /// Host IRQ.
    HostIrq,
    /// Parasite IRQ.
    ParasiteIrq,
    /// Parasite NMI.
    ParasiteNmi,
}

/// How a parasite interrupt reaches a particular CPU family.
///
/// The encoding belongs to the CPU emulator; the ULA only carries it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterruptDelivery {
    /// A plain level-sensitive input pin.
    Level,
    /// A vectored interrupt at a processor priority.
    Vectored {
        /// Interrupt vector address.
        vector: u16,
        /// Processor priority of the request.
        priority: u8,
    },
    /// An autovectored interrupt at a priority level.
    Autovector {
        /// Interrupt priority level.
        level: u8,
    },
    /// One bit of a combined interrupt-state word that is updated as a whole.
    Combined {
        /// Bit for this line within the word.
        mask: u8,
    },
    /// A numbered interrupt input.
    Numbered(u8),
}

/// Receiver of interrupt edges from the ULA.
///
/// Each method is called only when its line changes level.
pub trait InterruptSink {
    /// Host IRQ changed level.
    fn set_host_irq(&mut self, asserted: bool);
    /// Parasite IRQ changed level.
    fn set_parasite_irq(&mut self, delivery: InterruptDelivery, asserted: bool);
    /// Parasite NMI changed level.
    fn set_parasite_nmi(&mut self, delivery: InterruptDelivery, asserted: bool);
}

/// Sink that discards every edge.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl InterruptSink for NullSink {
    fn set_host_irq(&mut self, _asserted: bool) {}
    fn set_parasite_irq(&mut self, _delivery: InterruptDelivery, _asserted: bool) {}
    fn set_parasite_nmi(&mut self, _delivery: InterruptDelivery, _asserted: bool) {}
}
