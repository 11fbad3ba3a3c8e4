//! Coprocessor catalog.
//!
//! Maps the CPU-type names used in tube configurations to [`CpuModel`]s and
//! builds emulators for them. It provides:
//! 1. **Lookup:** Exact, case-sensitive name resolution.
//! 2. **Families:** Variants of one CPU that share an emulator and an interrupt wiring.
//! 3. **Construction:** Emulators created through an embedder-supplied factory.

use std::fmt;

use crate::coprocessor::traits::Coprocessor;
use crate::ula::InterruptDelivery;

/// A CPU type that can be attached through the Tube.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CpuModel {
    /// MOS 6502.
    Mos6502,
    /// ARM evaluation system.
    Arm,
    /// ARM2.
    Arm2,
    /// Zilog Z80.
    Z80,
    /// Intel 80186.
    X80186,
    /// WDC 65816.
    W65816,
    /// National Semiconductor 32016.
    Ns32016,
    /// Motorola 6809.
    Mc6809,
    /// DEC PDP-11.
    Pdp11,
    /// Accelerated 6502.
    Mos6502Turbo,
    /// Motorola 68000.
    Mc68000,
    /// 65816 with the Dossy ROM.
    W65816Dossy,
    /// Sprow ARM7TDMI.
    SprowArm,
}

impl CpuModel {
    /// Every CPU type, in catalog order.
    pub const ALL: [Self; 13] = [
        Self::Mos6502,
        Self::Arm,
        Self::Arm2,
        Self::Z80,
        Self::X80186,
        Self::W65816,
        Self::Ns32016,
        Self::Mc6809,
        Self::Pdp11,
        Self::Mos6502Turbo,
        Self::Mc68000,
        Self::W65816Dossy,
        Self::SprowArm,
    ];

    /// Returns the name configurations use for this CPU type.
    pub const fn name(self) -> &'static str {
        match self {
            Self::Mos6502 => "6502",
            Self::Arm => "ARM",
            Self::Arm2 => "ARM2",
            Self::Z80 => "Z80",
            Self::X80186 => "80186",
            Self::W65816 => "65816",
            Self::Ns32016 => "32016",
            Self::Mc6809 => "6809",
            Self::Pdp11 => "PDP11",
            Self::Mos6502Turbo => "6502 Turbo",
            Self::Mc68000 => "68000",
            Self::W65816Dossy => "65816Dossy",
            Self::SprowArm => "Sprow ARM",
        }
    }

    /// Returns the family this CPU type belongs to.
    pub const fn family(self) -> CpuFamily {
        match self {
            Self::Mos6502 | Self::Mos6502Turbo => CpuFamily::Mos6502,
            Self::Arm | Self::Arm2 => CpuFamily::Arm,
            Self::Z80 => CpuFamily::Z80,
            Self::X80186 => CpuFamily::X86,
            Self::W65816 | Self::W65816Dossy => CpuFamily::W65816,
            Self::Ns32016 => CpuFamily::Ns32016,
            Self::Mc6809 => CpuFamily::Mc6809,
            Self::Pdp11 => CpuFamily::Pdp11,
            Self::Mc68000 => CpuFamily::Mc68000,
            Self::SprowArm => CpuFamily::SprowArm,
        }
    }

    /// Resolves a configuration name. Matching is exact.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|model| model.name() == name)
    }
}

impl fmt::Display for CpuModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Resolves a CPU-type name to a catalog entry.
pub fn find_cpu_type(name: &str) -> Option<CpuModel> {
    CpuModel::from_name(name)
}

/// CPU families, grouping the types that share an emulator core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CpuFamily {
    /// 6502 and its accelerated variant.
    Mos6502,
    /// ARM evaluation system and ARM2.
    Arm,
    /// Z80.
    Z80,
    /// 80186.
    X86,
    /// 65816 and the Dossy variant.
    W65816,
    /// 32016.
    Ns32016,
    /// 6809.
    Mc6809,
    /// PDP-11.
    Pdp11,
    /// 68000.
    Mc68000,
    /// Sprow ARM.
    SprowArm,
}

impl CpuFamily {
    /// How the parasite IRQ line reaches this family.
    pub const fn irq_delivery(self) -> InterruptDelivery {
        match self {
            Self::Pdp11 => InterruptDelivery::Vectored {
                vector: 0x84,
                priority: 6,
            },
            Self::Mc68000 => InterruptDelivery::Autovector { level: 2 },
            Self::Mc6809 => InterruptDelivery::Combined { mask: 0x01 },
            Self::SprowArm => InterruptDelivery::Numbered(1),
            _ => InterruptDelivery::Level,
        }
    }

    /// How the parasite NMI line reaches this family.
    pub const fn nmi_delivery(self) -> InterruptDelivery {
        match self {
            Self::Pdp11 => InterruptDelivery::Vectored {
                vector: 0x80,
                priority: 7,
            },
            Self::Mc68000 => InterruptDelivery::Autovector { level: 5 },
            Self::Mc6809 => InterruptDelivery::Combined { mask: 0x02 },
            Self::SprowArm => InterruptDelivery::Numbered(2),
            _ => InterruptDelivery::Level,
        }
    }

    /// Returns true if the family pages its boot ROM over low memory until
    /// the first read of parasite status register 1.
    pub const fn has_rom_overlay(self) -> bool {
        matches!(self, Self::Mos6502)
    }
}

/// Builds the emulator for a CPU type.
pub type CpuFactory = dyn Fn(CpuModel) -> Box<dyn Coprocessor>;

/// Catalog of attachable CPU types for one session.
pub struct CpuCatalog {
    factory: Box<CpuFactory>,
}

impl fmt::Debug for CpuCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CpuCatalog")
            .field("types", &CpuModel::ALL.len())
            .finish_non_exhaustive()
    }
}

impl CpuCatalog {
    /// Creates the standard catalog, building emulators with `factory`.
    pub fn standard(factory: impl Fn(CpuModel) -> Box<dyn Coprocessor> + 'static) -> Self {
        Self {
            factory: Box::new(factory),
        }
    }

    /// Resolves a CPU-type name.
    pub fn find(&self, name: &str) -> Option<CpuModel> {
        find_cpu_type(name)
    }

    /// Returns the CPU types in catalog order.
    pub fn models(&self) -> impl Iterator<Item = CpuModel> {
        CpuModel::ALL.into_iter()
    }

    /// Builds a fresh emulator for `model`.
    pub fn create(&self, model: CpuModel) -> Box<dyn Coprocessor> {
        (self.factory)(model)
    }
}
