pub mod collector;
pub mod engine;
pub mod installer;
pub mod library;
pub mod pipeline;

pub use crate::domain::model::{ArchiveEntry, ArchivePlan, ExportSummary, ProjectClosure};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Storage};
pub use crate::utils::error::Result;
