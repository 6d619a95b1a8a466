use crate::utils::error::{ExportError, Result};
use std::path::{Path, PathBuf};

pub const BOARD_EXTENSION: &str = "kicad_pcb";
pub const PROJECT_EXTENSION: &str = "kicad_pro";

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.is_empty() {
        return Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path cannot be empty".to_string(),
        });
    }

    if path.contains('\0') {
        return Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.to_string(),
            reason: "Path contains null bytes".to_string(),
        });
    }

    Ok(())
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: value.to_string(),
            reason: "Value cannot be empty or whitespace-only".to_string(),
        });
    }
    Ok(())
}

pub fn validate_file_extension(
    field_name: &str,
    path: &Path,
    allowed_extensions: &[&str],
) -> Result<()> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some(extension) if allowed_extensions.contains(&extension) => Ok(()),
        Some(extension) => Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.display().to_string(),
            reason: format!(
                "Unsupported file extension: {}. Allowed extensions: {}",
                extension,
                allowed_extensions.join(", ")
            ),
        }),
        None => Err(ExportError::InvalidConfigValueError {
            field: field_name.to_string(),
            value: path.display().to_string(),
            reason: "File has no extension or invalid filename".to_string(),
        }),
    }
}

/// The export folder must be given and must already exist.
pub fn validate_export_dir(dir: &Path) -> Result<()> {
    if dir.as_os_str().is_empty() {
        return Err(ExportError::validation("Please select an export folder."));
    }
    if !dir.is_dir() {
        return Err(ExportError::validation(format!(
            "Selected folder does not exist: {}",
            dir.display()
        )));
    }
    Ok(())
}

/// Trims the name and appends `.zip` unless it already ends with it (any case).
pub fn normalize_zip_filename(filename: &str) -> Result<String> {
    let filename = filename.trim();
    if filename.is_empty() {
        return Err(ExportError::validation("Please enter a filename."));
    }
    if filename.contains('/') || filename.contains('\\') {
        return Err(ExportError::validation(format!(
            "Filename must not contain path separators: {}",
            filename
        )));
    }

    if filename.to_lowercase().ends_with(".zip") {
        Ok(filename.to_string())
    } else {
        Ok(format!("{}.zip", filename))
    }
}

/// Joins folder and filename after validating both. An existing file is only
/// accepted when `overwrite` is set.
pub fn resolve_export_path(dir: &Path, filename: &str, overwrite: bool) -> Result<PathBuf> {
    validate_export_dir(dir)?;
    let filename = normalize_zip_filename(filename)?;
    let export_path = dir.join(&filename);

    if export_path.exists() && !overwrite {
        return Err(ExportError::validation(format!(
            "File '{}' already exists. Pass --force to overwrite it.",
            filename
        )));
    }

    Ok(export_path)
}

/// Maps the user's input onto a saved board file.
///
/// Accepts a `.kicad_pcb` path directly, a `.kicad_pro` path (its sibling
/// board), or a directory holding exactly one `.kicad_pro`.
pub fn resolve_board_path(input: &Path) -> Result<PathBuf> {
    validate_path("board", &input.to_string_lossy())?;

    let candidate = if input.is_dir() {
        let projects: Vec<PathBuf> = std::fs::read_dir(input)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.extension().and_then(|e| e.to_str()) == Some(PROJECT_EXTENSION))
            .collect();
        match projects.as_slice() {
            [single] => single.with_extension(BOARD_EXTENSION),
            [] => {
                return Err(ExportError::validation(format!(
                    "No .kicad_pro file found in {}",
                    input.display()
                )))
            }
            _ => {
                return Err(ExportError::validation(format!(
                    "Several .kicad_pro files found in {}; pass the board file instead",
                    input.display()
                )))
            }
        }
    } else {
        validate_file_extension("board", input, &[BOARD_EXTENSION, PROJECT_EXTENSION])?;
        input.with_extension(BOARD_EXTENSION)
    };

    if !candidate.is_file() {
        return Err(ExportError::validation(format!(
            "Please save the board first before exporting ({} not found).",
            candidate.display()
        )));
    }

    Ok(candidate)
}
