#[cfg(feature = "cli")]
pub mod args;
pub mod cli;
pub mod toml_config;

use crate::core::installer::default_plugin_target;
use crate::core::library::default_skip_prefixes;
use crate::core::ConfigProvider;
use crate::domain::model::DEFAULT_EXTERNAL_DIR;
use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{resolve_board_path, resolve_export_path};
use std::path::{Path, PathBuf};
use toml_config::{validate_external_dir, FileConfig};

pub const DEFAULT_KICAD_VERSION: &str = "9.0";
pub const DEFAULT_PLUGIN_SOURCE: &str = "plugin";

/// Command-line values for an export; `None` falls back to the config file.
#[derive(Debug, Clone, Default)]
pub struct ExportOverrides {
    pub output_dir: Option<PathBuf>,
    pub filename: Option<String>,
    pub force: bool,
    pub excludes: Vec<String>,
    pub no_footprints: bool,
}

/// Fully resolved settings for one export.
#[derive(Debug, Clone)]
pub struct ExportSettings {
    pub board_path: PathBuf,
    pub output_path: PathBuf,
    pub external_dir: String,
    pub skip_prefixes: Vec<String>,
    pub include_footprints: bool,
    pub excludes: Vec<String>,
}

impl ExportSettings {
    /// Validates the board and destination the way the export dialog did:
    /// existing folder, non-empty filename with `.zip`, no silent overwrite.
    pub fn resolve(board: &Path, overrides: &ExportOverrides, file: &FileConfig) -> Result<Self> {
        let board_path = resolve_board_path(board)?;
        let project_dir = board_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let project_name = board_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        let output_dir = overrides
            .output_dir
            .clone()
            .or_else(|| file.export.output_dir.clone())
            .unwrap_or(project_dir);
        let filename = overrides
            .filename
            .clone()
            .or_else(|| file.export.filename.clone())
            .unwrap_or_else(|| format!("{}.zip", project_name));
        let overwrite = overrides.force || file.export.overwrite.unwrap_or(false);
        let output_path = resolve_export_path(&output_dir, &filename, overwrite)?;

        let external_dir = file
            .export
            .external_dir
            .clone()
            .unwrap_or_else(|| DEFAULT_EXTERNAL_DIR.to_string());
        validate_external_dir(&external_dir)?;

        let mut excludes = overrides.excludes.clone();
        excludes.extend(file.export.exclude.iter().cloned());

        Ok(Self {
            board_path,
            output_path,
            external_dir,
            skip_prefixes: skip_prefixes(file),
            include_footprints: !overrides.no_footprints
                && file.export.include_footprints.unwrap_or(true),
            excludes,
        })
    }
}

impl ConfigProvider for ExportSettings {
    fn board_path(&self) -> &Path {
        &self.board_path
    }

    fn output_path(&self) -> &Path {
        &self.output_path
    }

    fn external_dir(&self) -> &str {
        &self.external_dir
    }

    fn skip_prefixes(&self) -> &[String] {
        &self.skip_prefixes
    }

    fn include_footprints(&self) -> bool {
        self.include_footprints
    }

    fn excludes(&self) -> &[String] {
        &self.excludes
    }
}

pub fn skip_prefixes(file: &FileConfig) -> Vec<String> {
    file.libraries
        .skip_prefixes
        .clone()
        .unwrap_or_else(default_skip_prefixes)
}

#[derive(Debug, Clone, Default)]
pub struct LinkOverrides {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub kicad_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSettings {
    pub source: PathBuf,
    pub target: PathBuf,
}

impl LinkSettings {
    pub fn resolve(overrides: &LinkOverrides, file: &FileConfig) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let source = overrides
            .source
            .clone()
            .or_else(|| file.link.source.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_PLUGIN_SOURCE));
        let source = if source.is_absolute() {
            source
        } else {
            cwd.join(source)
        };

        let target = match overrides.target.clone().or_else(|| file.link.target.clone()) {
            Some(target) => target,
            None => {
                let version = overrides
                    .kicad_version
                    .as_deref()
                    .or(file.link.kicad_version.as_deref())
                    .unwrap_or(DEFAULT_KICAD_VERSION);
                default_plugin_target(version).ok_or_else(|| {
                    ExportError::config("Could not determine home directory; pass --target")
                })?
            }
        };

        Ok(Self { source, target })
    }
}
