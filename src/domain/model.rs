use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::{Path, PathBuf};

pub const DEFAULT_EXTERNAL_DIR: &str = "external_libs";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum FileCategory {
    ProjectFiles,
    SchematicFiles,
    LibraryTables,
    ProjectLibraries,
    ExternalLibraries,
}

impl FileCategory {
    pub fn label(self) -> &'static str {
        match self {
            FileCategory::ProjectFiles => "Project Files",
            FileCategory::SchematicFiles => "Schematic Files",
            FileCategory::LibraryTables => "Library Tables",
            FileCategory::ProjectLibraries => "Project Libraries",
            FileCategory::ExternalLibraries => "External Libraries",
        }
    }

    /// Category of a file living inside the project root.
    pub fn for_project_file(path: &Path) -> Self {
        let extension = path.extension().and_then(|e| e.to_str());
        let file_name = path.file_name().and_then(|n| n.to_str());
        match (extension, file_name) {
            (Some("kicad_pcb" | "kicad_pro"), _) => FileCategory::ProjectFiles,
            (Some("kicad_sch"), _) => FileCategory::SchematicFiles,
            (_, Some("sym-lib-table" | "fp-lib-table")) => FileCategory::LibraryTables,
            _ => FileCategory::ProjectLibraries,
        }
    }
}

/// A library file found outside the project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalFile {
    /// Library nickname from the lib table.
    pub library: String,
    /// Path inside the archive's external folder, before collision handling:
    /// the file name, or `<name>.pretty/<file>` for footprint libraries.
    pub relative_name: String,
}

impl ExternalFile {
    /// Out-of-root subsheets stay schematics; everything else is a library.
    pub fn category(&self) -> FileCategory {
        if self.relative_name.ends_with(".kicad_sch") {
            FileCategory::SchematicFiles
        } else {
            FileCategory::ExternalLibraries
        }
    }
}

/// Everything discovered for one project during one invocation.
#[derive(Debug, Clone, Default)]
pub struct ProjectClosure {
    pub project_name: String,
    pub project_dir: PathBuf,
    pub files: BTreeSet<PathBuf>,
    pub external_files: BTreeMap<PathBuf, ExternalFile>,
    pub warnings: Vec<String>,
}

impl ProjectClosure {
    pub fn new(project_name: impl Into<String>, project_dir: impl Into<PathBuf>) -> Self {
        Self {
            project_name: project_name.into(),
            project_dir: project_dir.into(),
            ..Default::default()
        }
    }

    pub fn file_count(&self) -> usize {
        self.files.len() + self.external_files.len()
    }

    /// Archive path for every file, keyed by archive path.
    ///
    /// Project files keep their path relative to the project root. External
    /// files go under `external_dir`. A top-level name there belongs to one
    /// source: a project file already at that path, or one library file or
    /// directory. Later claimants are prefixed with their nickname.
    pub fn files_for_zip(&self, external_dir: &str) -> BTreeMap<String, ArchiveEntry> {
        let external_dir = external_dir.trim_end_matches('/');
        let mut result = BTreeMap::new();
        let mut claimed: HashMap<String, Option<&Path>> = HashMap::new();

        for path in &self.files {
            let archive_path = match path.strip_prefix(&self.project_dir) {
                Ok(relative) => to_archive_path(relative),
                Err(_) => file_name_of(path),
            };
            if let Some(top) = archive_path
                .strip_prefix(external_dir)
                .and_then(|rest| rest.strip_prefix('/'))
                .and_then(|rest| rest.split('/').next())
            {
                claimed.insert(top.to_string(), None);
            }
            result.insert(
                archive_path.clone(),
                ArchiveEntry {
                    archive_path,
                    source: path.clone(),
                    category: FileCategory::for_project_file(path),
                },
            );
        }

        for (path, external) in &self.external_files {
            let (top, rest) = match external.relative_name.split_once('/') {
                Some((top, rest)) => (top, Some(rest)),
                None => (external.relative_name.as_str(), None),
            };
            let root = source_root(path, &external.relative_name);
            let top = claim_name(&mut claimed, top, &external.library, root);
            let relative = match rest {
                Some(rest) => format!("{}/{}", top, rest),
                None => top,
            };
            let archive_path = format!("{}/{}", external_dir, relative);
            result.insert(
                archive_path.clone(),
                ArchiveEntry {
                    archive_path,
                    source: path.clone(),
                    category: external.category(),
                },
            );
        }

        debug_assert_eq!(result.len(), self.file_count(), "archive paths must be unique");
        result
    }

    /// Archive paths grouped by category, sorted, with empty categories dropped.
    pub fn files_by_category(&self, external_dir: &str) -> Vec<(FileCategory, Vec<String>)> {
        let mut grouped: BTreeMap<FileCategory, Vec<String>> = BTreeMap::new();
        for (archive_path, entry) in self.files_for_zip(external_dir) {
            grouped.entry(entry.category).or_default().push(archive_path);
        }
        grouped.into_iter().collect()
    }
}

/// The file or directory an external entry was collected from: the file
/// itself, or the library directory for `<dir>/<file>` names.
fn source_root<'a>(path: &'a Path, relative_name: &str) -> &'a Path {
    let depth = relative_name.matches('/').count();
    path.ancestors().nth(depth).unwrap_or(path)
}

fn claim_name<'a>(
    claimed: &mut HashMap<String, Option<&'a Path>>,
    name: &str,
    library: &str,
    root: &'a Path,
) -> String {
    let mut candidate = name.to_string();
    let mut counter = 1;
    loop {
        match claimed.get(&candidate) {
            Some(Some(owner)) if *owner == root => return candidate,
            Some(_) => {
                candidate = if counter == 1 {
                    format!("{}_{}", library, name)
                } else {
                    format!("{}_{}_{}", library, counter, name)
                };
                counter += 1;
            }
            None => {
                claimed.insert(candidate.clone(), Some(root));
                return candidate;
            }
        }
    }
}

pub fn to_archive_path(relative: &Path) -> String {
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArchiveEntry {
    pub archive_path: String,
    pub source: PathBuf,
    pub category: FileCategory,
}

/// What will be written, in archive-path order.
#[derive(Debug, Clone)]
pub struct ArchivePlan {
    pub output_path: PathBuf,
    pub entries: Vec<ArchiveEntry>,
    pub excluded: Vec<String>,
    pub warnings: Vec<String>,
}

impl ArchivePlan {
    pub fn external_count(&self) -> usize {
        self.entries
            .iter()
            .filter(|e| e.category == FileCategory::ExternalLibraries)
            .count()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportSummary {
    pub output_path: PathBuf,
    pub exported_at: chrono::DateTime<chrono::Utc>,
    pub file_count: usize,
    pub external_count: usize,
    pub archive_bytes: u64,
    pub files: Vec<String>,
    pub warnings: Vec<String>,
}

impl ExportSummary {
    /// The completion message shown after an export.
    pub fn message(&self) -> String {
        let mut message = String::from("Project exported successfully!\n\n");
        message.push_str(&format!("Location: {}\n", self.output_path.display()));
        message.push_str(&format!("Files included: {}", self.file_count));
        if self.external_count > 0 {
            message.push_str(&format!("\nExternal libraries: {}", self.external_count));
        }

        if !self.warnings.is_empty() {
            message.push_str(&format!("\n\nWarnings: {}", self.warnings.len()));
            for warning in self.warnings.iter().take(3) {
                message.push_str(&format!("\n  - {}", warning));
            }
            if self.warnings.len() > 3 {
                message.push_str(&format!("\n  ... and {} more", self.warnings.len() - 3));
            }
        }

        message
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn closure() -> ProjectClosure {
        let mut closure = ProjectClosure::new("amp", "/proj");
        closure.files.insert(PathBuf::from("/proj/amp.kicad_pcb"));
        closure.files.insert(PathBuf::from("/proj/amp.kicad_pro"));
        closure.files.insert(PathBuf::from("/proj/amp.kicad_sch"));
        closure.files.insert(PathBuf::from("/proj/sheets/power.kicad_sch"));
        closure.files.insert(PathBuf::from("/proj/sym-lib-table"));
        closure
    }

    #[test]
    fn test_project_files_keep_relative_paths() {
        let files = closure().files_for_zip(DEFAULT_EXTERNAL_DIR);
        let names: Vec<_> = files.keys().cloned().collect();
        assert_eq!(
            names,
            vec![
                "amp.kicad_pcb",
                "amp.kicad_pro",
                "amp.kicad_sch",
                "sheets/power.kicad_sch",
                "sym-lib-table"
            ]
        );
        assert_eq!(files["sym-lib-table"].category, FileCategory::LibraryTables);
    }

    #[test]
    fn test_external_name_collisions_get_library_prefix() {
        let mut closure = closure();
        closure.external_files.insert(
            PathBuf::from("/a/parts.kicad_sym"),
            ExternalFile {
                library: "Alpha".into(),
                relative_name: "parts.kicad_sym".into(),
            },
        );
        closure.external_files.insert(
            PathBuf::from("/b/parts.kicad_sym"),
            ExternalFile {
                library: "Beta".into(),
                relative_name: "parts.kicad_sym".into(),
            },
        );
        closure.external_files.insert(
            PathBuf::from("/c/conn.pretty/usb.kicad_mod"),
            ExternalFile {
                library: "Conn".into(),
                relative_name: "conn.pretty/usb.kicad_mod".into(),
            },
        );
        closure.external_files.insert(
            PathBuf::from("/c/conn.pretty/jack.kicad_mod"),
            ExternalFile {
                library: "Conn".into(),
                relative_name: "conn.pretty/jack.kicad_mod".into(),
            },
        );

        let files = closure.files_for_zip("external_libs");
        assert!(files.contains_key("external_libs/parts.kicad_sym"));
        assert!(files.contains_key("external_libs/Beta_parts.kicad_sym"));
        assert!(files.contains_key("external_libs/conn.pretty/usb.kicad_mod"));
        assert!(files.contains_key("external_libs/conn.pretty/jack.kicad_mod"));
        assert_eq!(files.len(), 9);
    }

    fn external(library: &str, relative_name: &str) -> ExternalFile {
        ExternalFile {
            library: library.into(),
            relative_name: relative_name.into(),
        }
    }

    #[test]
    fn test_same_named_sheets_outside_root_are_all_kept() {
        let mut closure = closure();
        closure.external_files.insert(
            PathBuf::from("/a/power.kicad_sch"),
            external("sheets", "power.kicad_sch"),
        );
        closure.external_files.insert(
            PathBuf::from("/b/power.kicad_sch"),
            external("sheets", "power.kicad_sch"),
        );
        closure.external_files.insert(
            PathBuf::from("/c/power.kicad_sch"),
            external("sheets", "power.kicad_sch"),
        );

        let files = closure.files_for_zip(DEFAULT_EXTERNAL_DIR);
        assert_eq!(files.len(), closure.file_count());
        assert_eq!(
            files["external_libs/power.kicad_sch"].source,
            PathBuf::from("/a/power.kicad_sch")
        );
        assert_eq!(
            files["external_libs/sheets_power.kicad_sch"].source,
            PathBuf::from("/b/power.kicad_sch")
        );
        assert_eq!(
            files["external_libs/sheets_2_power.kicad_sch"].source,
            PathBuf::from("/c/power.kicad_sch")
        );
    }

    #[test]
    fn test_project_files_under_external_dir_are_not_overwritten() {
        let mut closure = closure();
        closure
            .files
            .insert(PathBuf::from("/proj/external_libs/parts.kicad_sym"));
        closure
            .files
            .insert(PathBuf::from("/proj/external_libs/conn.pretty/usb.kicad_mod"));
        closure.external_files.insert(
            PathBuf::from("/shared/parts.kicad_sym"),
            external("Shared", "parts.kicad_sym"),
        );
        closure.external_files.insert(
            PathBuf::from("/shared/conn.pretty/usb.kicad_mod"),
            external("Conn", "conn.pretty/usb.kicad_mod"),
        );

        let files = closure.files_for_zip(DEFAULT_EXTERNAL_DIR);
        assert_eq!(files.len(), closure.file_count());
        assert_eq!(
            files["external_libs/parts.kicad_sym"].source,
            PathBuf::from("/proj/external_libs/parts.kicad_sym")
        );
        assert_eq!(
            files["external_libs/Shared_parts.kicad_sym"].source,
            PathBuf::from("/shared/parts.kicad_sym")
        );
        assert_eq!(
            files["external_libs/Conn_conn.pretty/usb.kicad_mod"].source,
            PathBuf::from("/shared/conn.pretty/usb.kicad_mod")
        );
    }

    #[test]
    fn test_files_by_category_lists_every_external_file() {
        let mut closure = closure();
        closure.external_files.insert(
            PathBuf::from("/a/parts.kicad_sym"),
            external("Alpha", "parts.kicad_sym"),
        );
        closure.external_files.insert(
            PathBuf::from("/b/parts.kicad_sym"),
            external("Beta", "parts.kicad_sym"),
        );

        let groups = closure.files_by_category(DEFAULT_EXTERNAL_DIR);
        let (category, names) = groups.last().unwrap();
        assert_eq!(*category, FileCategory::ExternalLibraries);
        assert_eq!(
            names,
            &vec![
                "external_libs/Beta_parts.kicad_sym".to_string(),
                "external_libs/parts.kicad_sym".to_string()
            ]
        );
        let listed: usize = groups.iter().map(|(_, names)| names.len()).sum();
        assert_eq!(listed, closure.files_for_zip(DEFAULT_EXTERNAL_DIR).len());
    }

    #[test]
    fn test_files_by_category_drops_empty_groups() {
        let groups = closure().files_by_category(DEFAULT_EXTERNAL_DIR);
        let labels: Vec<_> = groups.iter().map(|(c, _)| c.label()).collect();
        assert_eq!(labels, vec!["Project Files", "Schematic Files", "Library Tables"]);
        assert_eq!(
            groups[1].1,
            vec!["amp.kicad_sch".to_string(), "sheets/power.kicad_sch".to_string()]
        );
    }

    #[test]
    fn test_summary_message_truncates_warnings() {
        let summary = ExportSummary {
            output_path: PathBuf::from("/out/amp.zip"),
            exported_at: chrono::Utc::now(),
            file_count: 4,
            external_count: 1,
            archive_bytes: 100,
            files: vec![],
            warnings: (1..=5).map(|i| format!("w{}", i)).collect(),
        };
        let message = summary.message();
        assert!(message.contains("Files included: 4"));
        assert!(message.contains("External libraries: 1"));
        assert!(message.contains("Warnings: 5"));
        assert!(message.contains("  - w3"));
        assert!(!message.contains("  - w4"));
        assert!(message.ends_with("... and 2 more"));
    }
}
