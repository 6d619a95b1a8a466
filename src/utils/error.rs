use thiserror::Error;

use crate::kicad::sexpr::ParseError;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Zip operation failed: {0}")]
    ZipError(#[from] zip::result::ZipError),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("S-expression parse error: {0}")]
    ParseError(#[from] ParseError),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Configuration error: {message}")]
    ConfigError { message: String },

    #[error("Invalid value for {field}: {value} ({reason})")]
    InvalidConfigValueError {
        field: String,
        value: String,
        reason: String,
    },

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Install error: {message}")]
    InstallError { message: String },

    #[error("No files found to export")]
    NothingToExport,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Io,
    Archive,
    Parsing,
    Configuration,
    Validation,
    Install,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    Medium,
    High,
    Critical,
}

impl ExportError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::ConfigError {
            message: message.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
        }
    }

    pub fn install(message: impl Into<String>) -> Self {
        Self::InstallError {
            message: message.into(),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::ZipError(_) | Self::NothingToExport => ErrorCategory::Archive,
            Self::IoError(_) => ErrorCategory::Io,
            Self::ParseError(_) | Self::SerializationError(_) | Self::TomlError(_) => {
                ErrorCategory::Parsing
            }
            Self::ConfigError { .. } | Self::InvalidConfigValueError { .. } => {
                ErrorCategory::Configuration
            }
            Self::ValidationError { .. } => ErrorCategory::Validation,
            Self::InstallError { .. } => ErrorCategory::Install,
        }
    }

    pub fn severity(&self) -> ErrorSeverity {
        match self {
            Self::NothingToExport => ErrorSeverity::Medium,
            Self::ValidationError { .. }
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. }
            | Self::TomlError(_)
            | Self::ParseError(_) => ErrorSeverity::High,
            Self::ZipError(_) | Self::SerializationError(_) => ErrorSeverity::High,
            Self::IoError(_) | Self::InstallError { .. } => ErrorSeverity::Critical,
        }
    }

    pub fn user_friendly_message(&self) -> String {
        match self {
            Self::IoError(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                format!("Permission denied: {}", e)
            }
            Self::IoError(e) => format!("File system error: {}", e),
            Self::ZipError(e) => format!("Error creating zip file: {}", e),
            Self::ParseError(e) => format!("Could not read KiCad file: {}", e),
            Self::SerializationError(e) => format!("Could not write report: {}", e),
            Self::TomlError(e) => format!("Invalid configuration file: {}", e),
            Self::ConfigError { message } | Self::ValidationError { message } => message.clone(),
            Self::InvalidConfigValueError {
                field,
                value,
                reason,
            } => format!("'{}' is not a valid {}: {}", value, field, reason),
            Self::InstallError { message } => format!("Plugin link failed: {}", message),
            Self::NothingToExport => "No files found to export.".to_string(),
        }
    }

    pub fn recovery_suggestion(&self) -> &'static str {
        match self {
            Self::IoError(e) if e.kind() == std::io::ErrorKind::PermissionDenied => {
                "Check file permissions on the destination"
            }
            Self::IoError(_) => "Check that the paths exist and are readable",
            Self::ZipError(_) => "Make sure the destination folder is writable and has free space",
            Self::ParseError(_) => "Open and re-save the file in KiCad to repair it",
            Self::SerializationError(_) => "Choose a different report path",
            Self::TomlError(_)
            | Self::ConfigError { .. }
            | Self::InvalidConfigValueError { .. } => {
                "Fix the configuration file or command-line flags"
            }
            Self::ValidationError { .. } => "Adjust the export folder or filename",
            Self::InstallError { .. } => "Check the plugin source directory and the target path",
            Self::NothingToExport => "Save the board and schematic in KiCad before exporting",
        }
    }
}

pub type Result<T> = std::result::Result<T, ExportError>;
