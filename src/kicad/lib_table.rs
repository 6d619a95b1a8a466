use crate::kicad::sexpr::{self, ParseError};
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LibTableKind {
    Symbol,
    Footprint,
}

impl LibTableKind {
    pub fn file_name(self) -> &'static str {
        match self {
            LibTableKind::Symbol => "sym-lib-table",
            LibTableKind::Footprint => "fp-lib-table",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibTableEntry {
    pub name: Option<String>,
    pub uri: String,
}

/// The `(lib ...)` rows of a project library table.
#[derive(Debug, Clone)]
pub struct LibTable {
    pub entries: Vec<LibTableEntry>,
}

impl LibTable {
    /// Rows without a `uri` are dropped.
    pub fn parse(text: &str) -> Result<Self, ParseError> {
        let tree = sexpr::parse(text)?;
        let entries = tree
            .find_all("lib")
            .into_iter()
            .filter_map(|lib| {
                let uri = lib.value_of("uri")?;
                Some(LibTableEntry {
                    name: lib.value_of("name").map(str::to_string),
                    uri: uri.to_string(),
                })
            })
            .collect();
        Ok(Self { entries })
    }

    /// Reads the table of `kind` from `project_dir`, `None` when the project has none.
    pub fn load(kind: LibTableKind, project_dir: &Path) -> crate::Result<Option<Self>> {
        let path = project_dir.join(kind.file_name());
        if !path.is_file() {
            return Ok(None);
        }
        let text = std::fs::read_to_string(&path)?;
        Ok(Some(Self::parse(&text)?))
    }
}
