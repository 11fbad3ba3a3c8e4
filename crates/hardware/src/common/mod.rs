//! Common types shared across the Tube core.
//!
//! This module provides the error taxonomy used by configuration, boot-ROM
//! loading, coprocessor attachment and state restore.

/// Error types for configuration, loading, attachment and state restore.
pub mod error;

pub use error::{AttachError, ConfigError, CoprocessorError, LoadError, StateError};
