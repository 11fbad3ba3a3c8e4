//! Boot-ROM loader.
//!
//! This module turns a tube's boot-ROM identifier into bytes. It performs:
//! 1. **Resolution:** Bare names are searched for as `<name>.rom` in the ROM directories; anything with a path component is opened as given.
//! 2. **Sizing:** A configured ROM size of zero takes the file length.
//! 3. **Reading:** Files shorter than the configured size are rejected; longer ones are cut to it.
//!
//! The loader only reports failures. Logging them and detaching the coprocessor
//! is the session's job.

use std::fs::{self, File};
use std::io::Read;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

use crate::common::LoadError;
use crate::config::{TubeConfig, TubeSettings};

/// Extension of boot-ROM files found by search.
pub const BOOT_ROM_EXTENSION: &str = "rom";

/// Locates and reads boot ROMs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootRomLoader {
    search_dirs: Vec<PathBuf>,
}

impl BootRomLoader {
    /// Creates a loader searching the given directories in order.
    pub fn new(search_dirs: impl IntoIterator<Item = impl Into<PathBuf>>) -> Self {
        Self {
            search_dirs: search_dirs.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a loader searching the directories named in settings.
    pub fn from_settings(settings: &TubeSettings) -> Self {
        Self::new(settings.rom_dirs.iter().cloned())
    }

    /// Returns the search directories.
    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Resolves a tube's boot-ROM identifier to a file path.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if a bare name matches no file in any
    /// search directory. Direct paths are not checked here.
    pub fn resolve(&self, tube: &TubeConfig) -> Result<PathBuf, LoadError> {
        let rom = tube.boot_rom.as_str();
        if !is_bare_name(rom) {
            debug!("model: will load absolute path tube ROM {rom}");
            return Ok(PathBuf::from(rom));
        }
        let found = self
            .search_dirs
            .iter()
            .find_map(|dir| find_in_dir(dir, rom))
            .ok_or_else(|| LoadError::NotFound {
                tube: tube.name.clone(),
                rom: rom.to_string(),
            })?;
        debug!("model: will load searched tube ROM {}", found.display());
        Ok(found)
    }

    /// Reads a tube's boot ROM.
    ///
    /// Returns `Ok(None)` for tubes that need no boot ROM.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError`] if the ROM cannot be found, opened or read, or if
    /// the file holds fewer bytes than the configured ROM size.
    pub fn load_boot_image(&self, tube: &TubeConfig) -> Result<Option<Vec<u8>>, LoadError> {
        if !tube.needs_boot_rom() {
            return Ok(None);
        }
        let path = self.resolve(tube)?;
        let file = File::open(&path).map_err(|source| LoadError::Open {
            tube: tube.name.clone(),
            path: path.clone(),
            source,
        })?;
        debug!("model: rom_size={:X}", tube.rom_size);

        let limit = if tube.rom_size == 0 {
            u64::MAX
        } else {
            tube.rom_size as u64
        };
        let mut image = Vec::new();
        let _ = file.take(limit).read_to_end(&mut image).map_err(|source| LoadError::Read {
            tube: tube.name.clone(),
            path: path.clone(),
            source,
        })?;

        if tube.rom_size == 0 {
            debug!("model: rom_size from file={:X}", image.len());
        } else if image.len() < tube.rom_size {
            return Err(LoadError::ShortRead {
                tube: tube.name.clone(),
                path,
                expected: tube.rom_size,
                actual: image.len(),
            });
        }
        Ok(Some(image))
    }
}

/// Returns true if `rom` is a plain file stem with no directory part.
fn is_bare_name(rom: &str) -> bool {
    let mut components = Path::new(rom).components();
    matches!(
        (components.next(), components.next()),
        (Some(Component::Normal(_)), None)
    )
}

/// Looks for `<stem>.rom` in `dir`, trying the exact name first and then
/// ignoring ASCII case.
fn find_in_dir(dir: &Path, stem: &str) -> Option<PathBuf> {
    let exact = dir.join(format!("{stem}.{BOOT_ROM_EXTENSION}"));
    if exact.is_file() {
        return Some(exact);
    }
    fs::read_dir(dir)
        .ok()?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .find(|path| {
            path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(BOOT_ROM_EXTENSION))
                && path
                    .file_stem()
                    .and_then(|s| s.to_str())
                    .is_some_and(|s| s.eq_ignore_ascii_case(stem))
        })
}
