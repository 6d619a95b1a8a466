//! Links the plugin source tree into KiCad's per-user plugin directory.

use crate::utils::error::{ExportError, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub const PLUGIN_DIR_NAME: &str = "netlist_kicad_plugin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Replaced {
    Symlink,
    File,
    Directory,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkOutcome {
    pub source: PathBuf,
    pub target: PathBuf,
    pub replaced: Option<Replaced>,
}

/// KiCad's per-user plugin folder for `kicad_version`, `None` without a home directory.
pub fn default_plugin_target(kicad_version: &str) -> Option<PathBuf> {
    let home = dirs::home_dir()?;
    let base = if cfg!(any(target_os = "macos", target_os = "windows")) {
        home.join("Documents").join("KiCad")
    } else {
        home.join(".local").join("share").join("kicad")
    };
    Some(
        base.join(kicad_version)
            .join("scripting")
            .join("plugins")
            .join(PLUGIN_DIR_NAME),
    )
}

/// Removes whatever sits at `target` and recreates it as a symlink to `source`.
///
/// Running it again yields the same link. Stops at the first filesystem error.
pub fn link_plugin(source: &Path, target: &Path) -> Result<LinkOutcome> {
    if !source.is_dir() {
        return Err(ExportError::install(format!(
            "Plugin source is not a directory: {}",
            source.display()
        )));
    }
    let source = fs::canonicalize(source)?;

    let replaced = match fs::symlink_metadata(target) {
        Ok(meta) if meta.file_type().is_symlink() => {
            remove_symlink(target)?;
            Some(Replaced::Symlink)
        }
        Ok(meta) if meta.is_dir() => {
            let target_real = fs::canonicalize(target)?;
            if source.starts_with(&target_real) {
                return Err(ExportError::install(format!(
                    "Refusing to replace {}: it contains the plugin source",
                    target.display()
                )));
            }
            fs::remove_dir_all(target)?;
            Some(Replaced::Directory)
        }
        Ok(_) => {
            fs::remove_file(target)?;
            Some(Replaced::File)
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => None,
        Err(e) => return Err(e.into()),
    };

    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent)?;
    }
    create_dir_symlink(&source, target)?;

    tracing::info!("🔗 Linked {} -> {}", target.display(), source.display());
    if let Some(kind) = replaced {
        tracing::debug!("Replaced existing {:?} at {}", kind, target.display());
    }

    Ok(LinkOutcome {
        source,
        target: target.to_path_buf(),
        replaced,
    })
}

#[cfg(unix)]
fn create_dir_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(source, target)
}

#[cfg(windows)]
fn create_dir_symlink(source: &Path, target: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_dir(source, target)
}

#[cfg(unix)]
fn remove_symlink(target: &Path) -> io::Result<()> {
    fs::remove_file(target)
}

// Directory symlinks on Windows are removed like directories.
#[cfg(windows)]
fn remove_symlink(target: &Path) -> io::Result<()> {
    fs::remove_dir(target).or_else(|_| fs::remove_file(target))
}
