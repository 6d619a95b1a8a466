use crate::utils::error::{ExportError, Result};
use crate::utils::validation::{self, Validate};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Looked up in the working directory when no `--config` is given.
pub const DEFAULT_CONFIG_FILE: &str = "kicad-zip.toml";

static ENV_VAR_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("env var pattern is valid")
});

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub export: ExportSection,
    pub libraries: LibrariesSection,
    pub link: LinkSection,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportSection {
    pub output_dir: Option<PathBuf>,
    pub filename: Option<String>,
    pub external_dir: Option<String>,
    pub overwrite: Option<bool>,
    pub include_footprints: Option<bool>,
    pub exclude: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LibrariesSection {
    pub skip_prefixes: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkSection {
    pub source: Option<PathBuf>,
    pub target: Option<PathBuf>,
    pub kicad_version: Option<String>,
}

impl FileConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path).map_err(ExportError::IoError)?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// An explicit path must exist; otherwise [`DEFAULT_CONFIG_FILE`] is used
    /// when present and defaults apply when it is not.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        match explicit {
            Some(path) => {
                if !path.is_file() {
                    return Err(ExportError::config(format!(
                        "Config file not found: {}",
                        path.display()
                    )));
                }
                tracing::debug!("Loading configuration from {}", path.display());
                Self::from_file(path)
            }
            None => {
                let path = Path::new(DEFAULT_CONFIG_FILE);
                if path.is_file() {
                    tracing::debug!("Loading configuration from {}", DEFAULT_CONFIG_FILE);
                    Self::from_file(path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// 替換環境變數 (例如 ${HOME})；未設定的變數保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_PATTERN
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .into_owned()
    }
}

impl Validate for FileConfig {
    fn validate(&self) -> Result<()> {
        if let Some(dir) = &self.export.output_dir {
            validation::validate_path("export.output_dir", &dir.to_string_lossy())?;
        }
        if let Some(filename) = &self.export.filename {
            validation::normalize_zip_filename(filename)?;
        }
        if let Some(external_dir) = &self.export.external_dir {
            validate_external_dir(external_dir)?;
        }
        if let Some(prefixes) = &self.libraries.skip_prefixes {
            for prefix in prefixes {
                validation::validate_non_empty_string("libraries.skip_prefixes", prefix)?;
            }
        }
        if let Some(version) = &self.link.kicad_version {
            validation::validate_non_empty_string("link.kicad_version", version)?;
        }
        Ok(())
    }
}

/// The external folder is a relative archive path without `..` segments.
pub fn validate_external_dir(external_dir: &str) -> Result<()> {
    validation::validate_non_empty_string("export.external_dir", external_dir)?;
    let invalid = external_dir.starts_with('/')
        || external_dir.contains('\\')
        || external_dir.split('/').any(|segment| segment == "..");
    if invalid {
        return Err(ExportError::InvalidConfigValueError {
            field: "export.external_dir".to_string(),
            value: external_dir.to_string(),
            reason: "Must be a relative archive folder without '..'".to_string(),
        });
    }
    Ok(())
}
