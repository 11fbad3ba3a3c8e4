//! Coprocessor speed.
//!
//! The effective multiplier is the runtime preset times the tube's base
//! multiplier, halved. Both factors count in half-rate units, so a base of 2
//! at the 100% preset runs the parasite one cycle per host cycle.

use crate::common::ConfigError;

/// A runtime speed preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SpeedPreset {
    /// Label shown to the user.
    pub label: &'static str,
    /// Preset multiplier.
    pub multiplier: u32,
}

/// Runtime speed presets, slowest first.
pub const SPEED_PRESETS: [SpeedPreset; 7] = [
    SpeedPreset {
        label: "100%",
        multiplier: 1,
    },
    SpeedPreset {
        label: "200%",
        multiplier: 2,
    },
    SpeedPreset {
        label: "400%",
        multiplier: 4,
    },
    SpeedPreset {
        label: "800%",
        multiplier: 8,
    },
    SpeedPreset {
        label: "1600%",
        multiplier: 16,
    },
    SpeedPreset {
        label: "3200%",
        multiplier: 32,
    },
    SpeedPreset {
        label: "6400%",
        multiplier: 64,
    },
];

/// Returns the parasite cycles to run per host cycle.
pub fn compute_multiplier(preset: u32, base: u32) -> f64 {
    f64::from(preset) * f64::from(base) / 2.0
}

/// Converts host cycles into whole parasite cycles at the effective multiplier.
///
/// Fractional cycles are carried to the next call, so a multiplier of 1.5
/// yields 1, 2, 1, 2... for successive single host cycles.
#[derive(Debug, Clone, PartialEq)]
pub struct TubeClock {
    preset: usize,
    base: u32,
    multiplier: f64,
    credit: f64,
}

impl Default for TubeClock {
    fn default() -> Self {
        Self::new(1)
    }
}

impl TubeClock {
    /// Creates a clock at the slowest preset for a tube with the given base multiplier.
    pub fn new(base: u32) -> Self {
        let mut clock = Self {
            preset: 0,
            base,
            multiplier: 0.0,
            credit: 0.0,
        };
        clock.recompute();
        clock
    }

    /// Returns the selected preset index.
    pub const fn preset(&self) -> usize {
        self.preset
    }

    /// Returns the effective multiplier.
    pub const fn multiplier(&self) -> f64 {
        self.multiplier
    }

    /// Selects a runtime speed preset.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::UnknownSpeedPreset`] past the end of [`SPEED_PRESETS`];
    /// the current preset is kept.
    pub fn set_preset(&mut self, preset: usize) -> Result<(), ConfigError> {
        if preset >= SPEED_PRESETS.len() {
            return Err(ConfigError::UnknownSpeedPreset(preset));
        }
        self.preset = preset;
        self.recompute();
        Ok(())
    }

    /// Sets the base multiplier of the attached tube.
    pub fn set_base(&mut self, base: u32) {
        self.base = base;
        self.recompute();
    }

    fn recompute(&mut self) {
        self.multiplier = compute_multiplier(SPEED_PRESETS[self.preset].multiplier, self.base);
        self.credit = 0.0;
    }

    /// Returns the parasite cycles due for `host_cycles` host cycles.
    pub fn parasite_cycles(&mut self, host_cycles: u32) -> u64 {
        self.credit += f64::from(host_cycles) * self.multiplier;
        let whole = self.credit.floor();
        self.credit -= whole;
        whole as u64
    }
}
