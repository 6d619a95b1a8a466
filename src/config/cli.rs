use crate::core::Storage;
use crate::utils::error::Result;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// Filesystem storage. Relative paths are taken from `base_path`.
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    fn full_path(&self, path: &Path) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let data = fs::read(self.full_path(path))?;
        Ok(data)
    }

    /// Writes next to the destination first and renames, so a failed write
    /// never leaves a truncated archive behind.
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
        let full_path = self.full_path(path);

        if let Some(parent) = full_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let mut partial_name = full_path.file_name().unwrap_or_default().to_os_string();
        partial_name.push(".partial");
        let partial_path = full_path.with_file_name(partial_name);

        fs::write(&partial_path, data)?;
        if let Err(e) = fs::rename(&partial_path, &full_path) {
            let _ = fs::remove_file(&partial_path);
            return Err(e.into());
        }
        Ok(())
    }

    fn modified(&self, path: &Path) -> Option<SystemTime> {
        fs::metadata(self.full_path(path)).and_then(|m| m.modified()).ok()
    }
}
