//! Readers for the KiCad S-expression file formats.

pub mod lib_table;
pub mod sexpr;

pub use lib_table::{LibTable, LibTableEntry, LibTableKind};
pub use sexpr::{parse, ParseError, SExpr};
