use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

pub const PROJECT_DIR_VAR: &str = "KIPRJMOD";

/// URIs starting with one of these point into the KiCad installation.
pub const DEFAULT_SKIP_PREFIXES: &[&str] = &["${KICAD"];

static VAR_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("variable pattern is valid"));

/// Turns lib-table URIs into filesystem paths.
#[derive(Debug, Clone)]
pub struct UriResolver {
    project_dir: PathBuf,
    skip_prefixes: Vec<String>,
    overrides: HashMap<String, String>,
}

impl UriResolver {
    pub fn new(project_dir: impl Into<PathBuf>, skip_prefixes: &[String]) -> Self {
        Self {
            project_dir: project_dir.into(),
            skip_prefixes: skip_prefixes.to_vec(),
            overrides: HashMap::new(),
        }
    }

    /// Variable values that take precedence over the process environment.
    pub fn with_var(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.overrides.insert(name.into(), value.into());
        self
    }

    /// `Ok(None)` for system libraries, `Err` with a warning message when a
    /// variable cannot be expanded.
    pub fn resolve(&self, uri: &str) -> Result<Option<PathBuf>, String> {
        if self
            .skip_prefixes
            .iter()
            .any(|prefix| uri.starts_with(prefix.as_str()))
        {
            return Ok(None);
        }

        let mut missing = None;
        let expanded = VAR_PATTERN.replace_all(uri, |caps: &regex::Captures| {
            let name = &caps[1];
            match self.lookup(name) {
                Some(value) => value,
                None => {
                    missing.get_or_insert_with(|| name.to_string());
                    String::new()
                }
            }
        });
        if let Some(name) = missing {
            return Err(format!("Unresolved variable ${{{}}} in library URI: {}", name, uri));
        }

        let path = PathBuf::from(expanded.replace('\\', "/"));
        if path.is_absolute() {
            Ok(Some(path))
        } else {
            Ok(Some(self.project_dir.join(path)))
        }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        if name == PROJECT_DIR_VAR {
            return Some(self.project_dir.to_string_lossy().into_owned());
        }
        self.overrides
            .get(name)
            .cloned()
            .or_else(|| std::env::var(name).ok())
    }
}

pub fn default_skip_prefixes() -> Vec<String> {
    DEFAULT_SKIP_PREFIXES.iter().map(|p| p.to_string()).collect()
}

/// Sheet references are written with whatever separator the author's OS used.
pub fn normalize_separators(reference: &str) -> PathBuf {
    PathBuf::from(reference.replace('\\', "/"))
}

pub fn is_within(path: &Path, root: &Path) -> bool {
    path.starts_with(root)
}
