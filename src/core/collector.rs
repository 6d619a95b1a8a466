use crate::core::library::{default_skip_prefixes, is_within, normalize_separators, UriResolver};
use crate::domain::model::{to_archive_path, ExternalFile, ProjectClosure};
use crate::kicad::{sexpr, LibTable, LibTableKind, SExpr};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// Property naming a subsheet's file. Older files spell it with a space.
const SHEET_FILE_PROPERTIES: &[&str] = &["Sheetfile", "Sheet file"];

/// Library name used for subsheets that live outside the project root.
const EXTERNAL_SHEET_LIBRARY: &str = "sheets";

#[derive(Debug, Clone)]
pub struct CollectOptions {
    pub skip_prefixes: Vec<String>,
    pub include_footprints: bool,
}

impl Default for CollectOptions {
    fn default() -> Self {
        Self {
            skip_prefixes: default_skip_prefixes(),
            include_footprints: true,
        }
    }
}

/// Gathers every file a board's project needs: core files, the schematic
/// hierarchy and the libraries named by the project lib tables.
///
/// Problems with individual files never abort collection; they are recorded
/// as warnings on the resulting [`ProjectClosure`].
pub struct ProjectCollector {
    board_path: PathBuf,
    resolver: UriResolver,
    options: CollectOptions,
    closure: ProjectClosure,
}

impl ProjectCollector {
    pub fn new(board_path: impl AsRef<Path>) -> Self {
        Self::with_options(board_path, CollectOptions::default())
    }

    pub fn with_options(board_path: impl AsRef<Path>, options: CollectOptions) -> Self {
        let board_path = canonical(board_path.as_ref());
        let project_dir = board_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();
        let project_name = board_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();

        Self {
            resolver: UriResolver::new(&project_dir, &options.skip_prefixes),
            closure: ProjectClosure::new(project_name, project_dir),
            board_path,
            options,
        }
    }

    pub fn project_dir(&self) -> &Path {
        &self.closure.project_dir
    }

    pub fn project_name(&self) -> &str {
        &self.closure.project_name
    }

    pub fn into_closure(self) -> ProjectClosure {
        self.closure
    }

    pub fn collect_all(&mut self) -> &ProjectClosure {
        self.collect_core_files();
        self.collect_schematic_hierarchy();
        self.collect_libraries(LibTableKind::Symbol);
        if self.options.include_footprints {
            self.collect_libraries(LibTableKind::Footprint);
        }

        tracing::debug!(
            "Collected {} project files, {} external files, {} warnings",
            self.closure.files.len(),
            self.closure.external_files.len(),
            self.closure.warnings.len()
        );
        &self.closure
    }

    fn warn(&mut self, message: String) {
        tracing::warn!("{}", message);
        self.closure.warnings.push(message);
    }

    fn sibling(&self, extension: &str) -> PathBuf {
        self.project_dir()
            .join(format!("{}.{}", self.project_name(), extension))
    }

    fn collect_core_files(&mut self) {
        if self.board_path.is_file() {
            self.closure.files.insert(self.board_path.clone());
        }

        for (extension, label) in [("kicad_pro", "Project"), ("kicad_sch", "Schematic")] {
            let path = self.sibling(extension);
            if path.is_file() {
                self.closure.files.insert(canonical(&path));
            } else {
                self.warn(format!("{} file not found: {}", label, display_name(&path)));
            }
        }

        for kind in [LibTableKind::Symbol, LibTableKind::Footprint] {
            if kind == LibTableKind::Footprint && !self.options.include_footprints {
                continue;
            }
            let path = self.project_dir().join(kind.file_name());
            if path.is_file() {
                self.closure.files.insert(canonical(&path));
            }
        }
    }

    fn collect_schematic_hierarchy(&mut self) {
        let root = self.sibling("kicad_sch");
        if !root.is_file() {
            return;
        }

        let mut visited: HashSet<PathBuf> = HashSet::new();
        let mut pending = vec![canonical(&root)];

        while let Some(schematic) = pending.pop() {
            if !visited.insert(schematic.clone()) {
                continue;
            }

            let tree = match read_tree(&schematic) {
                Ok(tree) => tree,
                Err(e) => {
                    self.warn(format!("Error parsing {}: {}", display_name(&schematic), e));
                    continue;
                }
            };

            let base_dir = schematic.parent().map(Path::to_path_buf).unwrap_or_default();
            let mut children = Vec::new();
            for sheet in tree.find_all("sheet") {
                let Some(sheet_file) = SHEET_FILE_PROPERTIES
                    .iter()
                    .find_map(|name| sheet.property(name))
                else {
                    continue;
                };

                let sheet_path = base_dir.join(normalize_separators(sheet_file));
                if !sheet_path.is_file() {
                    self.warn(format!("Subsheet not found: {}", sheet_file));
                    continue;
                }

                let resolved = canonical(&sheet_path);
                self.add_schematic(&resolved);
                if !visited.contains(&resolved) {
                    children.push(resolved);
                }
            }

            // Reversed so sheets are walked in document order.
            pending.extend(children.into_iter().rev());
        }
    }

    fn add_schematic(&mut self, path: &Path) {
        if is_within(path, self.project_dir()) {
            self.closure.files.insert(path.to_path_buf());
        } else {
            tracing::debug!("Subsheet outside project root: {}", path.display());
            self.closure
                .external_files
                .entry(path.to_path_buf())
                .or_insert_with(|| ExternalFile {
                    library: EXTERNAL_SHEET_LIBRARY.to_string(),
                    relative_name: display_name(path),
                });
        }
    }

    fn collect_libraries(&mut self, kind: LibTableKind) {
        let table = match LibTable::load(kind, self.project_dir()) {
            Ok(Some(table)) => table,
            Ok(None) => return,
            Err(e) => {
                self.warn(format!("Error parsing {}: {}", kind.file_name(), e));
                return;
            }
        };

        for entry in table.entries {
            let path = match self.resolver.resolve(&entry.uri) {
                Ok(Some(path)) => path,
                Ok(None) => {
                    tracing::debug!("Skipping system library {}", entry.uri);
                    continue;
                }
                Err(message) => {
                    self.warn(message);
                    continue;
                }
            };

            if !path.exists() {
                self.warn(format!("Library not found: {}", entry.uri));
                continue;
            }

            let resolved = canonical(&path);
            let nickname = entry.name.unwrap_or_else(|| display_name(&resolved));
            if resolved.is_dir() {
                self.add_library_dir(&resolved, &nickname);
            } else {
                let relative_name = display_name(&resolved);
                self.add_library_file(resolved, &nickname, relative_name);
            }
        }
    }

    fn add_library_dir(&mut self, dir: &Path, nickname: &str) {
        let dir_name = display_name(dir);
        let files: Vec<PathBuf> = WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .collect();

        if files.is_empty() {
            self.warn(format!("Library is empty: {}", nickname));
        }

        for file in files {
            let relative = file.strip_prefix(dir).unwrap_or(file.as_path());
            let relative_name = format!("{}/{}", dir_name, to_archive_path(relative));
            self.add_library_file(file.clone(), nickname, relative_name);
        }
    }

    fn add_library_file(&mut self, path: PathBuf, nickname: &str, relative_name: String) {
        if is_within(&path, self.project_dir()) {
            self.closure.files.insert(path);
        } else {
            self.closure
                .external_files
                .entry(path)
                .or_insert_with(|| ExternalFile {
                    library: nickname.to_string(),
                    relative_name,
                });
        }
    }
}

fn read_tree(path: &Path) -> crate::Result<SExpr> {
    let text = std::fs::read_to_string(path)?;
    Ok(sexpr::parse(&text)?)
}

fn canonical(path: &Path) -> PathBuf {
    std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn sheet(file: &str) -> String {
        format!(
            r#"  (sheet (at 10 10) (size 20 20)
    (property "Sheetname" "{0}" (at 10 9 0))
    (property "Sheetfile" "{0}" (at 10 31 0))
  )
"#,
            file
        )
    }

    fn schematic(sheets: &[&str]) -> String {
        let body: String = sheets.iter().map(|s| sheet(s)).collect();
        format!("(kicad_sch (version 20231120) (generator \"eeschema\")\n{})\n", body)
    }

    fn project(dir: &Path, root_sheets: &[&str]) -> PathBuf {
        fs::write(dir.join("amp.kicad_pcb"), "(kicad_pcb (version 20240108))").unwrap();
        fs::write(dir.join("amp.kicad_pro"), "{}").unwrap();
        fs::write(dir.join("amp.kicad_sch"), schematic(root_sheets)).unwrap();
        dir.join("amp.kicad_pcb")
    }

    #[test]
    fn test_core_files_and_missing_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let board = temp_dir.path().join("amp.kicad_pcb");
        fs::write(&board, "(kicad_pcb)").unwrap();

        let mut collector = ProjectCollector::new(&board);
        let closure = collector.collect_all();

        assert_eq!(closure.files.len(), 1);
        assert_eq!(
            closure.warnings,
            vec![
                "Project file not found: amp.kicad_pro".to_string(),
                "Schematic file not found: amp.kicad_sch".to_string()
            ]
        );
    }

    #[test]
    fn test_hierarchy_deduplicates_shared_sheets() {
        let temp_dir = TempDir::new().unwrap();
        let board = project(temp_dir.path(), &["left.kicad_sch", "right.kicad_sch"]);
        fs::write(temp_dir.path().join("left.kicad_sch"), schematic(&["leaf.kicad_sch"])).unwrap();
        fs::write(temp_dir.path().join("right.kicad_sch"), schematic(&["leaf.kicad_sch"])).unwrap();
        fs::write(temp_dir.path().join("leaf.kicad_sch"), schematic(&[])).unwrap();

        let mut collector = ProjectCollector::new(&board);
        let closure = collector.collect_all();

        let names: Vec<_> = closure.files_for_zip("external_libs").into_keys().collect();
        assert_eq!(
            names,
            vec![
                "amp.kicad_pcb",
                "amp.kicad_pro",
                "amp.kicad_sch",
                "leaf.kicad_sch",
                "left.kicad_sch",
                "right.kicad_sch"
            ]
        );
        assert!(closure.warnings.is_empty());
    }

    #[test]
    fn test_cyclic_sheets_terminate() {
        let temp_dir = TempDir::new().unwrap();
        let board = project(temp_dir.path(), &["a.kicad_sch"]);
        fs::write(temp_dir.path().join("a.kicad_sch"), schematic(&["b.kicad_sch"])).unwrap();
        fs::write(temp_dir.path().join("b.kicad_sch"), schematic(&["a.kicad_sch", "amp.kicad_sch"]))
            .unwrap();

        let mut collector = ProjectCollector::new(&board);
        let closure = collector.collect_all();
        assert_eq!(closure.files.len(), 5);
    }

    #[test]
    fn test_missing_and_broken_sheets_become_warnings() {
        let temp_dir = TempDir::new().unwrap();
        let board = project(temp_dir.path(), &["gone.kicad_sch", "bad.kicad_sch"]);
        fs::write(temp_dir.path().join("bad.kicad_sch"), "(kicad_sch (sheet").unwrap();

        let mut collector = ProjectCollector::new(&board);
        let closure = collector.collect_all();

        assert!(closure.files.iter().any(|p| p.ends_with("bad.kicad_sch")));
        assert_eq!(closure.warnings.len(), 2);
        assert_eq!(closure.warnings[0], "Subsheet not found: gone.kicad_sch");
        assert!(closure.warnings[1].starts_with("Error parsing bad.kicad_sch"));
    }

    #[test]
    fn test_legacy_sheet_file_property() {
        let temp_dir = TempDir::new().unwrap();
        let board = project(temp_dir.path(), &[]);
        fs::write(
            temp_dir.path().join("amp.kicad_sch"),
            r#"(kicad_sch (sheet (property "Sheet file" "old.kicad_sch")))"#,
        )
        .unwrap();
        fs::write(temp_dir.path().join("old.kicad_sch"), "(kicad_sch)").unwrap();

        let mut collector = ProjectCollector::new(&board);
        let closure = collector.collect_all();
        assert!(closure.files.iter().any(|p| p.ends_with("old.kicad_sch")));
    }

    #[test]
    fn test_footprint_libraries_can_be_disabled() {
        let temp_dir = TempDir::new().unwrap();
        let board = project(temp_dir.path(), &[]);
        let pretty = temp_dir.path().join("parts.pretty");
        fs::create_dir(&pretty).unwrap();
        fs::write(pretty.join("r0603.kicad_mod"), "(footprint \"R0603\")").unwrap();
        fs::write(
            temp_dir.path().join("fp-lib-table"),
            r#"(fp_lib_table (lib (name "parts")(type "KiCad")(uri "${KIPRJMOD}/parts.pretty")))"#,
        )
        .unwrap();

        let mut enabled = ProjectCollector::new(&board);
        let files = enabled.collect_all().files_for_zip("external_libs");
        assert!(files.contains_key("parts.pretty/r0603.kicad_mod"));
        assert!(files.contains_key("fp-lib-table"));

        let options = CollectOptions {
            include_footprints: false,
            ..CollectOptions::default()
        };
        let mut disabled = ProjectCollector::with_options(&board, options);
        let files = disabled.collect_all().files_for_zip("external_libs");
        assert!(!files.contains_key("parts.pretty/r0603.kicad_mod"));
        assert!(!files.contains_key("fp-lib-table"));
    }
}
