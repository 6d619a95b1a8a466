pub mod config;
pub mod core;
pub mod domain;
pub mod kicad;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::args::CliConfig;

pub use config::{cli::LocalStorage, ExportSettings, LinkSettings};
pub use core::{
    collector::ProjectCollector, engine::ExportEngine, installer::link_plugin,
    pipeline::ZipExportPipeline,
};
pub use utils::error::{ExportError, Result};
