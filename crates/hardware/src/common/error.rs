//! Error types for configuration, boot-ROM loading, coprocessor start-up, and state restore.
//!
//! This module defines every failure the Tube core can report. It provides:
//! 1. **Configuration errors:** Unresolvable CPU types, malformed section values, bad selections.
//! 2. **Load errors:** Boot ROM missing, unreadable, short, or rejected by the coprocessor.
//! 3. **State errors:** Truncated or out-of-range persisted ULA state.
//!
//! None of these abort a session. The session logs them, detaches the coprocessor
//! where appropriate, and hands the error back to the caller for reporting.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while turning configuration input into tube configurations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A tube section names a CPU type that is not in the catalog.
    #[error("invalid tube CPU name '{cpu}' in tube '{tube}'")]
    UnknownCpu {
        /// Display name of the offending tube.
        tube: String,
        /// CPU type name as written in the configuration.
        cpu: String,
    },

    /// A `romsize` value is not a hexadecimal number.
    #[error("invalid hex romsize '{value}' in tube '{tube}'")]
    InvalidRomSize {
        /// Display name of the offending tube.
        tube: String,
        /// Raw value as written in the configuration.
        value: String,
    },

    /// A `speed` value is not a decimal integer.
    #[error("invalid speed '{value}' in tube '{tube}'")]
    InvalidSpeed {
        /// Display name of the offending tube.
        tube: String,
        /// Raw value as written in the configuration.
        value: String,
    },

    /// A section name does not follow the `tube_NN` pattern.
    #[error("invalid tube section name '{0}'")]
    InvalidSection(String),

    /// A tube was selected by a name that no configuration carries.
    #[error("invalid tube name '{0}', no tube will be used")]
    UnknownTube(String),

    /// A tube was selected by an index past the end of the configuration list.
    #[error("no tube #{index} ({count} configured), running with no tube instead")]
    SelectionOutOfRange {
        /// Requested index.
        index: usize,
        /// Number of configured tubes.
        count: usize,
    },

    /// A speed preset index past the end of the preset table.
    #[error("no speed preset #{0}")]
    UnknownSpeedPreset(usize),

    /// The selected configuration has no resolvable CPU type.
    #[error("tube '{0}' has no usable CPU type")]
    Unusable(String),

    /// The settings document could not be parsed.
    #[error("unable to parse tube settings: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors raised while locating and reading a boot ROM or starting the coprocessor with it.
#[derive(Debug, Error)]
pub enum LoadError {
    /// A bare boot-ROM name was not found in any search directory.
    #[error("boot rom {rom} for tube {tube} not found")]
    NotFound {
        /// Display name of the tube being attached.
        tube: String,
        /// Boot-ROM identifier as configured.
        rom: String,
    },

    /// The resolved boot-ROM file could not be opened.
    #[error("unable to open boot rom {} for tube {tube}: {source}", .path.display())]
    Open {
        /// Display name of the tube being attached.
        tube: String,
        /// Path that was opened.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The boot-ROM file was opened but reading it failed.
    #[error("error reading boot rom {} for tube {tube}: {source}", .path.display())]
    Read {
        /// Display name of the tube being attached.
        tube: String,
        /// Path that was read.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: io::Error,
    },

    /// The boot-ROM file holds fewer bytes than the configured ROM size.
    #[error("boot rom {} for tube {tube} is {actual:#X} bytes, expected {expected:#X}", .path.display())]
    ShortRead {
        /// Display name of the tube being attached.
        tube: String,
        /// Path that was read.
        path: PathBuf,
        /// Configured ROM size.
        expected: usize,
        /// Bytes actually present.
        actual: usize,
    },

    /// The coprocessor refused the boot image.
    #[error("coprocessor for tube {tube} failed to initialise: {source}")]
    Init {
        /// Display name of the tube being attached.
        tube: String,
        /// Failure reported by the CPU emulator.
        #[source]
        source: CoprocessorError,
    },
}

/// Failure reported by a CPU emulator's initializer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct CoprocessorError(pub String);

impl CoprocessorError {
    /// Creates an error carrying the given message.
    pub fn new(message: impl Into<String>) -> Self {
        Self(message.into())
    }
}

/// Errors raised while decoding persisted ULA state.
#[derive(Debug, Error)]
pub enum StateError {
    /// The stream ended early or could not be read.
    #[error("tube ULA state truncated: {0}")]
    Io(#[from] io::Error),

    /// A persisted counter holds a value the live state cannot represent.
    #[error("tube ULA state field {field} out of range: {value}")]
    FieldRange {
        /// Field name in the persisted layout.
        field: &'static str,
        /// Value found in the stream.
        value: i64,
    },

    /// The persisted FIFO head, tail and count disagree with each other.
    #[error("tube ULA state FIFO inconsistent: head {head}, tail {tail}, count {count}")]
    FifoInconsistent {
        /// Persisted head index.
        head: usize,
        /// Persisted tail index.
        tail: usize,
        /// Persisted entry count.
        count: usize,
    },
}

/// Failure to attach a coprocessor for the session.
#[derive(Debug, Error)]
pub enum AttachError {
    /// The selection or the selected configuration is unusable.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The boot ROM or the coprocessor initializer failed.
    #[error(transparent)]
    Load(#[from] LoadError),
}
