use crate::core::collector::{CollectOptions, ProjectCollector};
use crate::core::{ConfigProvider, Pipeline, Storage};
use crate::domain::model::{ArchiveEntry, ArchivePlan, ExportSummary, FileCategory, ProjectClosure};
use crate::utils::error::{ExportError, Result};
use chrono::{Datelike, Timelike};
use std::io::Write;
use std::time::SystemTime;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::CompressionMethod;

/// Collects a board's project closure and writes it as one zip archive.
pub struct ZipExportPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
}

impl<S: Storage, C: ConfigProvider> ZipExportPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Self {
        Self { storage, config }
    }
}

impl<S: Storage, C: ConfigProvider> Pipeline for ZipExportPipeline<S, C> {
    fn collect(&self) -> Result<ProjectClosure> {
        let options = CollectOptions {
            skip_prefixes: self.config.skip_prefixes().to_vec(),
            include_footprints: self.config.include_footprints(),
        };
        let mut collector = ProjectCollector::with_options(self.config.board_path(), options);
        collector.collect_all();
        Ok(collector.into_closure())
    }

    fn plan(&self, closure: ProjectClosure) -> Result<ArchivePlan> {
        let mut entries = Vec::new();
        let mut excluded = Vec::new();

        for (archive_path, entry) in closure.files_for_zip(self.config.external_dir()) {
            if self
                .config
                .excludes()
                .iter()
                .any(|pattern| matches_exclude(pattern, &archive_path))
            {
                tracing::debug!("Excluding {}", archive_path);
                excluded.push(archive_path);
            } else {
                entries.push(entry);
            }
        }

        if entries.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        Ok(ArchivePlan {
            output_path: self.config.output_path().to_path_buf(),
            entries,
            excluded,
            warnings: closure.warnings,
        })
    }

    fn write(&self, plan: ArchivePlan) -> Result<ExportSummary> {
        let mut warnings = plan.warnings.clone();
        let mut written: Vec<&ArchiveEntry> = Vec::with_capacity(plan.entries.len());

        tracing::debug!("Creating ZIP file with {} files", plan.entries.len());

        let zip_data = {
            let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));

            for entry in &plan.entries {
                let data = match self.storage.read_file(&entry.source) {
                    Ok(data) => data,
                    Err(e) => {
                        let message = format!("Could not read {}: {}", entry.source.display(), e);
                        tracing::warn!("{}", message);
                        warnings.push(message);
                        continue;
                    }
                };

                let mut options = SimpleFileOptions::default()
                    .compression_method(CompressionMethod::Deflated)
                    .unix_permissions(0o644);
                if let Some(timestamp) = self
                    .storage
                    .modified(&entry.source)
                    .and_then(zip_timestamp)
                {
                    options = options.last_modified_time(timestamp);
                }

                zip.start_file(entry.archive_path.as_str(), options)?;
                zip.write_all(&data)?;
                written.push(entry);
            }

            let cursor = zip.finish()?;
            cursor.into_inner()
        };

        if written.is_empty() {
            return Err(ExportError::NothingToExport);
        }

        tracing::debug!("Writing ZIP file ({} bytes) to storage", zip_data.len());
        self.storage.write_file(&plan.output_path, &zip_data)?;

        Ok(ExportSummary {
            output_path: plan.output_path.clone(),
            exported_at: chrono::Utc::now(),
            file_count: written.len(),
            external_count: written
                .iter()
                .filter(|e| e.category == FileCategory::ExternalLibraries)
                .count(),
            archive_bytes: zip_data.len() as u64,
            files: written.iter().map(|e| e.archive_path.clone()).collect(),
            warnings,
        })
    }
}

/// Exact archive path, bare file name, `dir/` prefix, or `*.ext` suffix.
pub fn matches_exclude(pattern: &str, archive_path: &str) -> bool {
    if let Some(suffix) = pattern.strip_prefix('*') {
        return !suffix.is_empty() && archive_path.ends_with(suffix);
    }
    if pattern.ends_with('/') {
        return archive_path.starts_with(pattern);
    }
    archive_path == pattern || archive_path.rsplit('/').next() == Some(pattern)
}

/// Zip stores local wall-clock time with two-second precision, 1980..=2107.
fn zip_timestamp(time: SystemTime) -> Option<zip::DateTime> {
    let local: chrono::DateTime<chrono::Local> = time.into();
    zip::DateTime::from_date_and_time(
        u16::try_from(local.year()).ok()?,
        local.month() as u8,
        local.day() as u8,
        local.hour() as u8,
        local.minute() as u8,
        local.second() as u8,
    )
    .ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::model::ExternalFile;
    use std::cell::RefCell;
    use std::collections::HashMap;
    use std::io::Read;
    use std::path::{Path, PathBuf};

    #[derive(Default)]
    struct MockStorage {
        files: RefCell<HashMap<PathBuf, Vec<u8>>>,
    }

    impl MockStorage {
        fn with_file(self, path: &str, data: &str) -> Self {
            self.files
                .borrow_mut()
                .insert(PathBuf::from(path), data.as_bytes().to_vec());
            self
        }

        fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            self.files.borrow().get(Path::new(path)).cloned()
        }
    }

    impl Storage for MockStorage {
        fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
            self.files.borrow().get(path).cloned().ok_or_else(|| {
                ExportError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path.display()),
                ))
            })
        }

        fn write_file(&self, path: &Path, data: &[u8]) -> Result<()> {
            self.files
                .borrow_mut()
                .insert(path.to_path_buf(), data.to_vec());
            Ok(())
        }
    }

    struct MockConfig {
        board_path: PathBuf,
        output_path: PathBuf,
        skip_prefixes: Vec<String>,
        excludes: Vec<String>,
    }

    impl MockConfig {
        fn new() -> Self {
            Self {
                board_path: PathBuf::from("/proj/amp.kicad_pcb"),
                output_path: PathBuf::from("/out/amp.zip"),
                skip_prefixes: vec!["${KICAD".to_string()],
                excludes: vec![],
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn board_path(&self) -> &Path {
            &self.board_path
        }

        fn output_path(&self) -> &Path {
            &self.output_path
        }

        fn external_dir(&self) -> &str {
            "external_libs"
        }

        fn skip_prefixes(&self) -> &[String] {
            &self.skip_prefixes
        }

        fn include_footprints(&self) -> bool {
            true
        }

        fn excludes(&self) -> &[String] {
            &self.excludes
        }
    }

    fn closure() -> ProjectClosure {
        let mut closure = ProjectClosure::new("amp", "/proj");
        closure.files.insert(PathBuf::from("/proj/amp.kicad_pcb"));
        closure.files.insert(PathBuf::from("/proj/amp.kicad_sch"));
        closure.files.insert(PathBuf::from("/proj/notes.bak"));
        closure.external_files.insert(
            PathBuf::from("/libs/parts.kicad_sym"),
            ExternalFile {
                library: "Parts".into(),
                relative_name: "parts.kicad_sym".into(),
            },
        );
        closure.warnings.push("Project file not found: amp.kicad_pro".into());
        closure
    }

    fn storage() -> MockStorage {
        MockStorage::default()
            .with_file("/proj/amp.kicad_pcb", "(kicad_pcb)")
            .with_file("/proj/amp.kicad_sch", "(kicad_sch)")
            .with_file("/proj/notes.bak", "old")
            .with_file("/libs/parts.kicad_sym", "(kicad_symbol_lib)")
    }

    #[test]
    fn test_plan_applies_excludes() {
        let mut config = MockConfig::new();
        config.excludes = vec!["*.bak".to_string()];
        let pipeline = ZipExportPipeline::new(storage(), config);

        let plan = pipeline.plan(closure()).unwrap();
        let paths: Vec<_> = plan.entries.iter().map(|e| e.archive_path.as_str()).collect();
        assert_eq!(
            paths,
            vec!["amp.kicad_pcb", "amp.kicad_sch", "external_libs/parts.kicad_sym"]
        );
        assert_eq!(plan.excluded, vec!["notes.bak".to_string()]);
        assert_eq!(plan.external_count(), 1);
        assert_eq!(plan.warnings.len(), 1);
    }

    #[test]
    fn test_plan_rejects_empty_selection() {
        let mut config = MockConfig::new();
        config.excludes = vec!["amp.kicad_pcb".to_string()];
        let pipeline = ZipExportPipeline::new(MockStorage::default(), config);

        let mut closure = ProjectClosure::new("amp", "/proj");
        closure.files.insert(PathBuf::from("/proj/amp.kicad_pcb"));
        assert!(matches!(
            pipeline.plan(closure),
            Err(ExportError::NothingToExport)
        ));
    }

    #[test]
    fn test_write_builds_archive_in_storage() {
        let pipeline = ZipExportPipeline::new(storage(), MockConfig::new());
        let plan = pipeline.plan(closure()).unwrap();
        let summary = pipeline.write(plan).unwrap();

        assert_eq!(summary.file_count, 4);
        assert_eq!(summary.external_count, 1);
        assert_eq!(summary.output_path, PathBuf::from("/out/amp.zip"));

        let zip_bytes = pipeline.storage.get_file("/out/amp.zip").unwrap();
        assert_eq!(summary.archive_bytes, zip_bytes.len() as u64);
        let mut archive = zip::ZipArchive::new(std::io::Cursor::new(zip_bytes)).unwrap();
        assert_eq!(archive.len(), 4);

        let mut symbols = archive.by_name("external_libs/parts.kicad_sym").unwrap();
        assert_eq!(symbols.compression(), CompressionMethod::Deflated);
        let mut content = String::new();
        symbols.read_to_string(&mut content).unwrap();
        assert_eq!(content, "(kicad_symbol_lib)");
    }

    #[test]
    fn test_unreadable_file_becomes_warning() {
        let storage = MockStorage::default().with_file("/proj/amp.kicad_pcb", "(kicad_pcb)");
        let pipeline = ZipExportPipeline::new(storage, MockConfig::new());
        let plan = pipeline.plan(closure()).unwrap();
        let summary = pipeline.write(plan).unwrap();

        assert_eq!(summary.files, vec!["amp.kicad_pcb".to_string()]);
        assert_eq!(summary.warnings.len(), 4);
        assert!(summary.warnings[1].starts_with("Could not read"));
    }

    #[test]
    fn test_matches_exclude_patterns() {
        assert!(matches_exclude("notes.bak", "docs/notes.bak"));
        assert!(matches_exclude("docs/notes.bak", "docs/notes.bak"));
        assert!(matches_exclude("docs/", "docs/notes.bak"));
        assert!(matches_exclude("*.bak", "docs/notes.bak"));
        assert!(!matches_exclude("*", "docs/notes.bak"));
        assert!(!matches_exclude("notes", "docs/notes.bak"));
        assert!(!matches_exclude("ext/", "external_libs/a.kicad_sym"));
    }

    #[test]
    fn test_zip_timestamp_range() {
        assert!(zip_timestamp(SystemTime::now()).is_some());
        assert!(zip_timestamp(SystemTime::UNIX_EPOCH).is_none());
    }

    #[test]
    fn test_category_counts_ignore_external_sheets() {
        let mut closure = closure();
        closure.external_files.insert(
            PathBuf::from("/shared/power.kicad_sch"),
            ExternalFile {
                library: "sheets".into(),
                relative_name: "power.kicad_sch".into(),
            },
        );
        let pipeline = ZipExportPipeline::new(storage(), MockConfig::new());
        let plan = pipeline.plan(closure).unwrap();
        let sheet = plan
            .entries
            .iter()
            .find(|e| e.archive_path == "external_libs/power.kicad_sch")
            .unwrap();
        assert_eq!(sheet.category, FileCategory::SchematicFiles);
        assert_eq!(plan.external_count(), 1);
    }
}
