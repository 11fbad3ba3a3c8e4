//! Tube session.
//!
//! A session owns the ULA and at most one attached coprocessor. It provides:
//! 1. **Attach:** Select a tube, load its boot ROM, start its CPU, set its speed and reset the ULA.
//! 2. **Access:** Host and parasite register accesses, with interrupt edges forwarded to the sink.
//! 3. **Reset:** Machine reset and the parasite reset requested through the control register.
//! 4. **State:** Save and restore of the ULA together with the ROM overlay flag.
//!
//! With no coprocessor attached the Tube is absent from the host bus: reads
//! return [`IDLE_BUS`] and writes are ignored.

use std::fmt;
use std::io::{Read, Write};

use tracing::{debug, error, info, warn};

use crate::common::{AttachError, ConfigError, LoadError, StateError};
use crate::config::{TubeConfig, TubeConfigs};
use crate::coprocessor::{Coprocessor, CpuCatalog, CpuDebug, CpuModel};
use crate::sim::loader::BootRomLoader;
use crate::speed::TubeClock;
use crate::state::StateLayout;
use crate::ula::interrupts::InterruptLines;
use crate::ula::{InterruptLine, InterruptSink, NullSink, TubeUla, WriteOutcome};

/// Value read from any Tube address when no coprocessor is attached.
pub const IDLE_BUS: u8 = 0xFE;

/// The coprocessor currently attached to a session.
struct AttachedTube {
    index: usize,
    config: TubeConfig,
    model: CpuModel,
    cpu: Box<dyn Coprocessor>,
}

/// Tube ULA plus the attached coprocessor and its speed.
pub struct TubeSession {
    ula: TubeUla,
    attached: Option<AttachedTube>,
    clock: TubeClock,
    sink: Box<dyn InterruptSink>,
    /// Lines as last forwarded to the sink.
    delivered: InterruptLines,
}

impl fmt::Debug for TubeSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TubeSession")
            .field("ula", &self.ula)
            .field("tube", &self.attached.as_ref().map(|t| t.config.name.as_str()))
            .field("clock", &self.clock)
            .field("delivered", &self.delivered)
            .finish_non_exhaustive()
    }
}

impl Default for TubeSession {
    fn default() -> Self {
        Self::new(Box::new(NullSink))
    }
}

impl TubeSession {
    /// Creates a session with no coprocessor attached, forwarding interrupts to `sink`.
    pub fn new(sink: Box<dyn InterruptSink>) -> Self {
        Self {
            ula: TubeUla::new(),
            attached: None,
            clock: TubeClock::default(),
            sink,
            delivered: InterruptLines::IDLE,
        }
    }

    /// Attaches the tube at `selection`, or detaches for `None`.
    ///
    /// Any coprocessor already attached is detached first. On failure the
    /// session is left with no coprocessor attached and the failure is logged.
    ///
    /// # Errors
    ///
    /// Returns [`AttachError::Config`] for a selection that is out of range
    /// or has no CPU type, and [`AttachError::Load`] if the boot ROM cannot be
    /// loaded or the CPU refuses it.
    pub fn attach(
        &mut self,
        selection: Option<usize>,
        configs: &TubeConfigs,
        catalog: &CpuCatalog,
        loader: &BootRomLoader,
    ) -> Result<(), AttachError> {
        self.detach();
        let Some(index) = selection else {
            debug!("model: no tube selected");
            return Ok(());
        };

        let (config, model) = match configs.select(index) {
            Ok(config) => match config.cpu {
                Some(model) => (config.clone(), model),
                None => return Err(Self::report_config(ConfigError::Unusable(config.name.clone()))),
            },
            Err(err) => return Err(Self::report_config(err)),
        };

        let image = loader
            .load_boot_image(&config)
            .map_err(Self::report_load)?;
        let mut cpu = catalog.create(model);
        cpu.init(image)
            .map_err(|source| LoadError::Init {
                tube: config.name.clone(),
                source,
            })
            .map_err(Self::report_load)?;

        self.clock.set_base(config.speed_multiplier);
        let paged = model.family().has_rom_overlay();
        info!("model: attached tube #{index} {} ({model})", config.name);
        self.attached = Some(AttachedTube {
            index,
            config,
            model,
            cpu,
        });
        self.ula.reset();
        // A freshly started 6502 comes out of reset with its boot ROM paged in.
        self.ula.set_rom_overlay(paged);
        self.forward_edges();
        Ok(())
    }

    fn report_config(err: ConfigError) -> AttachError {
        warn!("model: {err}");
        AttachError::Config(err)
    }

    fn report_load(err: LoadError) -> AttachError {
        error!("model: {err}");
        AttachError::Load(err)
    }

    /// Drops the attached coprocessor, releasing any interrupt lines it holds.
    pub fn detach(&mut self) {
        if self.attached.is_none() {
            return;
        }
        self.forward(InterruptLines::IDLE);
        if let Some(tube) = self.attached.take() {
            debug!("model: detached tube {}", tube.config.name);
        }
    }

    /// Returns true if a coprocessor is attached.
    pub const fn is_attached(&self) -> bool {
        self.attached.is_some()
    }

    /// Returns the index of the attached tube.
    pub fn attached_index(&self) -> Option<usize> {
        self.attached.as_ref().map(|tube| tube.index)
    }

    /// Returns the configuration of the attached tube.
    pub fn attached_config(&self) -> Option<&TubeConfig> {
        self.attached.as_ref().map(|tube| &tube.config)
    }

    /// Returns the CPU type of the attached tube.
    pub fn attached_model(&self) -> Option<CpuModel> {
        self.attached.as_ref().map(|tube| tube.model)
    }

    /// Returns the ULA.
    pub const fn ula(&self) -> &TubeUla {
        &self.ula
    }

    /// Returns the attached CPU's debugger.
    pub fn debugger(&mut self) -> Option<&mut dyn CpuDebug> {
        self.attached.as_mut()?.cpu.debugger()
    }

    /// Machine reset: resets the attached CPU, then hard-resets the ULA.
    pub fn reset(&mut self) {
        self.reset_parasite();
        self.ula.reset();
        self.forward_edges();
    }

    /// Resets the attached CPU. The 6502 family pages its boot ROM back in.
    fn reset_parasite(&mut self) {
        if let Some(tube) = self.attached.as_mut() {
            tube.cpu.reset();
            if tube.model.family().has_rom_overlay() {
                self.ula.set_rom_overlay(true);
            }
        }
    }

    /// Host read of a Tube register.
    pub fn host_read(&mut self, addr: u16) -> u8 {
        if self.attached.is_none() {
            return IDLE_BUS;
        }
        let value = self.ula.host_read(addr);
        self.forward_edges();
        value
    }

    /// Host write of a Tube register.
    ///
    /// A write that releases the parasite reset line resets the attached CPU
    /// after the register update and its interrupt edges are complete.
    pub fn host_write(&mut self, addr: u16, value: u8) {
        if self.attached.is_none() {
            return;
        }
        let outcome = self.ula.host_write(addr, value);
        self.forward_edges();
        if outcome == WriteOutcome::ResetParasite {
            debug!("tube: parasite reset released");
            self.reset_parasite();
        }
    }

    /// Parasite read of a Tube register.
    pub fn parasite_read(&mut self, addr: u32) -> u8 {
        if self.attached.is_none() {
            return IDLE_BUS;
        }
        let value = self.ula.parasite_read(addr);
        self.forward_edges();
        value
    }

    /// Parasite write of a Tube register.
    pub fn parasite_write(&mut self, addr: u32, value: u8) {
        if self.attached.is_none() {
            return;
        }
        self.ula.parasite_write(addr, value);
        self.forward_edges();
    }

    /// Returns true while the 6502 coprocessor's boot ROM is paged in.
    pub const fn rom_overlay(&self) -> bool {
        self.ula.rom_overlay()
    }

    /// Pages the 6502 coprocessor's boot ROM in or out.
    pub const fn set_rom_overlay(&mut self, active: bool) {
        self.ula.set_rom_overlay(active);
    }

    /// Selects a runtime speed preset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSpeedPreset`] for an index past the preset table.
    pub fn set_speed_preset(&mut self, preset: usize) -> Result<(), ConfigError> {
        self.clock.set_preset(preset)
    }

    /// Returns the effective parasite speed multiplier.
    pub const fn multiplier(&self) -> f64 {
        self.clock.multiplier()
    }

    /// Returns the parasite cycles due for `host_cycles` host cycles, or zero with no coprocessor.
    pub fn parasite_cycles(&mut self, host_cycles: u32) -> u64 {
        if self.attached.is_none() {
            return 0;
        }
        self.clock.parasite_cycles(host_cycles)
    }

    /// Writes the ULA state in the current layout.
    ///
    /// # Errors
    ///
    /// Returns any error from the underlying writer.
    pub fn save_state<W: Write>(&self, writer: &mut W) -> std::io::Result<()> {
        self.ula.save_state(writer)
    }

    /// Replaces the ULA state with persisted state and forwards the resulting interrupt edges.
    ///
    /// # Errors
    ///
    /// Returns [`StateError`] if the state cannot be decoded; the live state is kept.
    pub fn load_state<R: Read>(&mut self, reader: &mut R) -> Result<StateLayout, StateError> {
        let layout = self.ula.load_state(reader)?;
        self.forward_edges();
        Ok(layout)
    }

    /// Forwards changes of the ULA's interrupt lines to the sink.
    fn forward_edges(&mut self) {
        if self.attached.is_some() {
            self.forward(self.ula.lines());
        }
    }

    fn forward(&mut self, lines: InterruptLines) {
        let Some(family) = self.attached.as_ref().map(|tube| tube.model.family()) else {
            return;
        };
        for (line, asserted) in lines.edges_since(self.delivered) {
            let state = if asserted { "asserted" } else { "de-asserted" };
            match line {
                InterruptLine::HostIrq => {
                    debug!("tube: host IRQ {state}");
                    self.sink.set_host_irq(asserted);
                }
                InterruptLine::ParasiteIrq => {
                    debug!("tube: parasite IRQ {state}");
                    self.sink.set_parasite_irq(family.irq_delivery(), asserted);
                }
                InterruptLine::ParasiteNmi => {
                    debug!("tube: parasite NMI {state}");
                    self.sink.set_parasite_nmi(family.nmi_delivery(), asserted);
                }
            }
        }
        self.delivered = lines;
    }
}
