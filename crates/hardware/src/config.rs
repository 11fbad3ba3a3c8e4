//! Tube configuration.
//!
//! This module turns configuration input into the list of tubes a session can
//! attach. It provides:
//! 1. **Defaults:** The built-in tube list and search locations.
//! 2. **Sections:** Raw `tube_NN` sections as read from JSON or key/value sources.
//! 3. **Configurations:** The resolved, indexable tube list and its selection rules.
//!
//! Settings are supplied as JSON through [`TubeSettings::from_json`]. A
//! settings document with no tube sections yields the built-in list.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::common::ConfigError;
use crate::coprocessor::{CpuModel, find_cpu_type};

/// Default configuration constants for tubes.
mod defaults {
    /// Directory searched for boot ROMs given by bare name.
    pub const ROM_DIR: &str = "roms/tube";

    /// Base speed multiplier of a section that does not set one.
    pub const TUBE_SPEED: u32 = 1;

    /// CPU type of a section that does not set one.
    pub const TUBE_CPU: &str = "none";

    /// Prefix of tube section names; the rest of the name is the tube index.
    pub const SECTION_PREFIX: &str = "tube_";

    /// Built-in tubes: name, CPU type, ROM size, boot ROM, base speed.
    ///
    /// Order matters. Saved settings refer to tubes by index.
    pub const TUBES: [(&str, &str, usize, &str, u32); 13] = [
        ("6502 Internal", "6502", 0x800, "6502Intern", 4),
        ("ARM", "ARM", 0x4000, "ARMeval_100", 4),
        ("Z80 ROM 1.21", "Z80", 0x1000, "Z80_121", 6),
        ("80186", "80186", 0x4000, "BIOS", 8),
        ("65816", "65816", 0x8000, "ReCo6502ROM_816", 16),
        ("32016", "32016", 0, "", 8),
        ("6502 External", "6502", 0x800, "6502Tube", 3),
        ("6809", "6809", 0x800, "6809Tube", 3),
        ("Z80 ROM 2.00", "Z80", 0x1000, "Z80_200", 6),
        ("PDP11", "PDP11", 0x800, "PDP11Tube", 2),
        ("6502 Turbo", "6502 Turbo", 0x800, "6502Turbo", 4),
        ("65816Dossy", "65816Dossy", 0x8000, "Dossy_816", 16),
        ("Sprow ARM", "Sprow ARM", 0x80000, "Sprow_ARM", 4),
    ];
}

/// A ROM size as written in configuration: a hex string or a plain number.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HexSize {
    /// Numeric value, taken as-is.
    Number(u64),
    /// Hexadecimal text, with or without a `0x` prefix.
    Text(String),
}

impl HexSize {
    /// Creates the textual form used when writing sections back out.
    pub fn from_size(size: usize) -> Self {
        Self::Text(format!("{size:X}"))
    }

    /// Returns the size in bytes, or `None` if the text is not hexadecimal.
    pub fn value(&self) -> Option<usize> {
        match self {
            Self::Number(n) => usize::try_from(*n).ok(),
            Self::Text(text) => {
                let text = text.trim();
                let digits = text
                    .strip_prefix("0x")
                    .or_else(|| text.strip_prefix("0X"))
                    .unwrap_or(text);
                usize::from_str_radix(digits, 16).ok()
            }
        }
    }
}

/// One tube section as read from configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeSection {
    /// Display name; defaults to the section name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// CPU type name.
    #[serde(default = "TubeSection::default_cpu")]
    pub cpu: String,

    /// Expected boot-ROM size; absent or zero means the file length.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub romsize: Option<HexSize>,

    /// Boot-ROM name or path; absent or empty means no boot ROM.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bootrom: Option<String>,

    /// Base speed multiplier.
    #[serde(default = "TubeSection::default_speed")]
    pub speed: u32,
}

impl TubeSection {
    fn default_cpu() -> String {
        defaults::TUBE_CPU.to_string()
    }

    fn default_speed() -> u32 {
        defaults::TUBE_SPEED
    }

    /// Builds a section from raw key/value pairs, as read from an ini-style file.
    ///
    /// Recognised keys are `name`, `cpu`, `romsize`, `bootrom` and `speed`;
    /// other keys are ignored.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidRomSize`] or [`ConfigError::InvalidSpeed`]
    /// if those values do not parse.
    pub fn from_pairs<K, V>(
        section: &str,
        pairs: impl IntoIterator<Item = (K, V)>,
    ) -> Result<Self, ConfigError>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut out = Self::default();
        for (key, value) in pairs {
            let value = value.as_ref();
            match key.as_ref() {
                "name" => out.name = Some(value.to_string()),
                "cpu" => out.cpu = value.to_string(),
                "romsize" => {
                    let size = HexSize::Text(value.to_string());
                    if size.value().is_none() {
                        return Err(ConfigError::InvalidRomSize {
                            tube: section.to_string(),
                            value: value.to_string(),
                        });
                    }
                    out.romsize = Some(size);
                }
                "bootrom" => out.bootrom = Some(value.to_string()),
                "speed" => {
                    out.speed =
                        value
                            .trim()
                            .parse()
                            .map_err(|_| ConfigError::InvalidSpeed {
                                tube: section.to_string(),
                                value: value.to_string(),
                            })?;
                }
                other => debug!("model: ignoring key {other} in section {section}"),
            }
        }
        Ok(out)
    }
}

impl Default for TubeSection {
    fn default() -> Self {
        Self {
            name: None,
            cpu: Self::default_cpu(),
            romsize: None,
            bootrom: None,
            speed: Self::default_speed(),
        }
    }
}

/// Tube sections, either keyed by `tube_NN` section name or listed in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TubeSections {
    /// Sections keyed by `tube_NN`.
    Numbered(BTreeMap<String, TubeSection>),
    /// Sections in index order.
    Listed(Vec<TubeSection>),
}

impl Default for TubeSections {
    fn default() -> Self {
        Self::Numbered(BTreeMap::new())
    }
}

impl TubeSections {
    /// Returns true if no sections are present.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Numbered(map) => map.is_empty(),
            Self::Listed(list) => list.is_empty(),
        }
    }
}

/// A tube chosen by position in the list or by display name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TubeRef {
    /// Position in the tube list.
    Index(usize),
    /// Display name; `"none"` selects no tube.
    Name(String),
}

/// Tube settings document.
///
/// # Examples
///
/// ```
/// use tubesim_core::config::TubeSettings;
///
/// let json = r#"{ "tubes": { "tube_00": { "name": "Z80", "cpu": "Z80", "romsize": "1000", "bootrom": "Z80_200", "speed": 6 } } }"#;
/// let settings = TubeSettings::from_json(json).unwrap_or_default();
/// assert!(!settings.tubes.is_empty());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TubeSettings {
    /// Tube sections; empty means the built-in list.
    #[serde(default)]
    pub tubes: TubeSections,

    /// Directories searched for boot ROMs given by bare name.
    #[serde(default = "TubeSettings::default_rom_dirs", alias = "rom_dir")]
    pub rom_dirs: Vec<PathBuf>,

    /// Index of the runtime speed preset.
    #[serde(default)]
    pub speed: usize,

    /// Selected tube, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tube: Option<TubeRef>,
}

impl TubeSettings {
    fn default_rom_dirs() -> Vec<PathBuf> {
        vec![PathBuf::from(defaults::ROM_DIR)]
    }

    /// Parses settings from JSON.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] if the document is not valid settings JSON.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

impl Default for TubeSettings {
    fn default() -> Self {
        Self {
            tubes: TubeSections::default(),
            rom_dirs: Self::default_rom_dirs(),
            speed: 0,
            tube: None,
        }
    }
}

/// A resolved tube configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeConfig {
    /// Display name.
    pub name: String,
    /// CPU type; `None` if the configured name did not resolve or the slot is empty.
    pub cpu: Option<CpuModel>,
    /// Expected boot-ROM size in bytes; zero means the file length.
    pub rom_size: usize,
    /// Boot-ROM name or path; empty means none.
    pub boot_rom: String,
    /// Base speed multiplier.
    pub speed_multiplier: u32,
}

impl TubeConfig {
    /// Creates an empty slot, left by a gap in section numbering.
    fn empty() -> Self {
        Self {
            name: String::new(),
            cpu: None,
            rom_size: 0,
            boot_rom: String::new(),
            speed_multiplier: defaults::TUBE_SPEED,
        }
    }

    /// Returns true if the tube needs a boot ROM to start.
    pub fn needs_boot_rom(&self) -> bool {
        !self.boot_rom.is_empty()
    }

    /// Returns true if the tube can be attached.
    pub const fn is_usable(&self) -> bool {
        self.cpu.is_some()
    }

    /// Resolves a section into a configuration.
    ///
    /// An unknown CPU type is logged and leaves the configuration unusable.
    fn from_section(section_name: &str, section: &TubeSection) -> Result<Self, ConfigError> {
        let name = section
            .name
            .clone()
            .unwrap_or_else(|| section_name.to_string());
        let cpu = find_cpu_type(&section.cpu);
        if cpu.is_none() {
            warn!(
                "model: {}",
                ConfigError::UnknownCpu {
                    tube: name.clone(),
                    cpu: section.cpu.clone(),
                }
            );
        }
        let rom_size = match &section.romsize {
            None => 0,
            Some(size) => size.value().ok_or_else(|| ConfigError::InvalidRomSize {
                tube: name.clone(),
                value: match size {
                    HexSize::Number(n) => n.to_string(),
                    HexSize::Text(text) => text.clone(),
                },
            })?,
        };
        Ok(Self {
            name,
            cpu,
            rom_size,
            boot_rom: section.bootrom.clone().unwrap_or_default(),
            speed_multiplier: section.speed,
        })
    }

    /// Writes the configuration back out as a section.
    fn to_section(&self) -> TubeSection {
        TubeSection {
            name: Some(self.name.clone()),
            cpu: self
                .cpu
                .map_or_else(TubeSection::default_cpu, |cpu| cpu.name().to_string()),
            romsize: (self.rom_size != 0).then(|| HexSize::from_size(self.rom_size)),
            bootrom: self.needs_boot_rom().then(|| self.boot_rom.clone()),
            speed: self.speed_multiplier,
        }
    }
}

/// The tube list of a session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TubeConfigs {
    tubes: Vec<TubeConfig>,
}

impl Default for TubeConfigs {
    fn default() -> Self {
        Self::builtin()
    }
}

impl TubeConfigs {
    /// Returns the built-in tube list.
    pub fn builtin() -> Self {
        let tubes = defaults::TUBES
            .iter()
            .map(|&(name, cpu, rom_size, boot_rom, speed)| TubeConfig {
                name: name.to_string(),
                cpu: find_cpu_type(cpu),
                rom_size,
                boot_rom: boot_rom.to_string(),
                speed_multiplier: speed,
            })
            .collect();
        Self { tubes }
    }

    /// Builds the tube list from settings.
    ///
    /// Without any tube sections this is the built-in list. Numbered sections
    /// land at their index; numbers skipped between them leave empty slots.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a section name is not `tube_NN` or a value
    /// does not parse. Unknown CPU types are not errors.
    pub fn load(settings: &TubeSettings) -> Result<Self, ConfigError> {
        if settings.tubes.is_empty() {
            debug!("model: no tube sections, using built-in tubes");
            return Ok(Self::builtin());
        }
        let tubes = match &settings.tubes {
            TubeSections::Listed(list) => list
                .iter()
                .enumerate()
                .map(|(i, section)| TubeConfig::from_section(&section_name(i), section))
                .collect::<Result<Vec<_>, _>>()?,
            TubeSections::Numbered(map) => {
                let mut numbered = Vec::with_capacity(map.len());
                for (key, section) in map {
                    let index = section_index(key)?;
                    debug!("model: found tube#{index:02}");
                    numbered.push((index, TubeConfig::from_section(key, section)?));
                }
                let count = numbered.iter().map(|(i, _)| i + 1).max().unwrap_or(0);
                let mut tubes = vec![TubeConfig::empty(); count];
                for (index, config) in numbered {
                    tubes[index] = config;
                }
                tubes
            }
        };
        Ok(Self { tubes })
    }

    /// Returns the number of tube slots.
    pub fn len(&self) -> usize {
        self.tubes.len()
    }

    /// Returns true if there are no tube slots.
    pub fn is_empty(&self) -> bool {
        self.tubes.is_empty()
    }

    /// Returns the tube at `index`.
    pub fn get(&self, index: usize) -> Option<&TubeConfig> {
        self.tubes.get(index)
    }

    /// Iterates over the tube slots in index order.
    pub fn iter(&self) -> impl Iterator<Item = &TubeConfig> {
        self.tubes.iter()
    }

    /// Selects a tube by index.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::SelectionOutOfRange`] past the end of the list and
    /// [`ConfigError::Unusable`] for a slot without a resolvable CPU type.
    pub fn select(&self, index: usize) -> Result<&TubeConfig, ConfigError> {
        let config = self
            .tubes
            .get(index)
            .ok_or(ConfigError::SelectionOutOfRange {
                index,
                count: self.tubes.len(),
            })?;
        if config.is_usable() {
            Ok(config)
        } else {
            Err(ConfigError::Unusable(config.name.clone()))
        }
    }

    /// Finds a tube by display name.
    ///
    /// `"none"` selects no tube. An unknown name is logged and also selects no tube.
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        if name == "none" {
            return None;
        }
        let found = self.index_of(name);
        if found.is_none() {
            warn!("model: {}", ConfigError::UnknownTube(name.to_string()));
        }
        found
    }

    /// Returns the index of the tube with this display name.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.tubes.iter().position(|tube| tube.name == name)
    }

    /// Resolves user input naming a tube.
    ///
    /// Display names win over indices, so numeric names such as `6809` resolve
    /// to their tube; anything else that parses as a number is an index.
    pub fn lookup(&self, text: &str) -> Option<usize> {
        self.index_of(text).or_else(|| text.parse().ok())
    }

    /// Resolves a tube reference to an index, without checking it is in range.
    pub fn resolve(&self, tube: &TubeRef) -> Option<usize> {
        match tube {
            TubeRef::Index(index) => Some(*index),
            TubeRef::Name(name) => self.find_by_name(name),
        }
    }

    /// Writes the list back out as numbered sections.
    ///
    /// ROM size is written in hex and omitted when zero; the boot ROM is
    /// omitted when empty.
    pub fn to_sections(&self) -> BTreeMap<String, TubeSection> {
        self.tubes
            .iter()
            .enumerate()
            .map(|(i, tube)| (section_name(i), tube.to_section()))
            .collect()
    }
}

impl<'a> IntoIterator for &'a TubeConfigs {
    type Item = &'a TubeConfig;
    type IntoIter = std::slice::Iter<'a, TubeConfig>;

    fn into_iter(self) -> Self::IntoIter {
        self.tubes.iter()
    }
}

/// Returns the section name for a tube index.
fn section_name(index: usize) -> String {
    format!("{}{index:02}", defaults::SECTION_PREFIX)
}

/// Parses the tube index out of a `tube_NN` section name.
fn section_index(section: &str) -> Result<usize, ConfigError> {
    section
        .strip_prefix(defaults::SECTION_PREFIX)
        .and_then(|digits| digits.parse().ok())
        .ok_or_else(|| ConfigError::InvalidSection(section.to_string()))
}
