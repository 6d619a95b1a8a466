use crate::config::{ExportOverrides, LinkOverrides};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "kicad-zip")]
#[command(about = "Collect a KiCad project into a zip archive for upload to netlist.io")]
pub struct CliConfig {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub json_logs: bool,

    /// Path to a TOML configuration file (defaults to ./kicad-zip.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Write the project closure of a board into a zip archive
    Export(ExportArgs),
    /// Show the files an export would include, grouped by category
    List(ListArgs),
    /// Symlink the plugin source tree into KiCad's plugin directory
    Link(LinkArgs),
}

#[derive(Debug, Clone, Args)]
pub struct ExportArgs {
    /// Board file (.kicad_pcb), project file (.kicad_pro) or project directory
    pub board: PathBuf,

    /// Folder to write the archive into (defaults to the project folder)
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Archive file name; `.zip` is appended when missing
    #[arg(short, long)]
    pub filename: Option<String>,

    /// Overwrite an existing archive
    #[arg(long)]
    pub force: bool,

    /// Leave out entries by archive path, file name, `dir/` prefix or `*.ext`
    #[arg(long = "exclude", value_name = "PATTERN")]
    pub excludes: Vec<String>,

    /// Skip footprint libraries from fp-lib-table
    #[arg(long)]
    pub no_footprints: bool,

    /// Show what would be archived without writing anything
    #[arg(long)]
    pub dry_run: bool,

    /// Also write a JSON report of the export
    #[arg(long, value_name = "FILE")]
    pub report: Option<PathBuf>,
}

impl ExportArgs {
    pub fn overrides(&self) -> ExportOverrides {
        ExportOverrides {
            output_dir: self.output_dir.clone(),
            filename: self.filename.clone(),
            force: self.force,
            excludes: self.excludes.clone(),
            no_footprints: self.no_footprints,
        }
    }
}

#[derive(Debug, Clone, Args)]
pub struct ListArgs {
    /// Board file (.kicad_pcb), project file (.kicad_pro) or project directory
    pub board: PathBuf,

    /// Print the listing as JSON
    #[arg(long)]
    pub json: bool,

    /// Skip footprint libraries from fp-lib-table
    #[arg(long)]
    pub no_footprints: bool,
}

#[derive(Debug, Clone, Args)]
pub struct LinkArgs {
    /// Plugin source directory (defaults to ./plugin)
    #[arg(long)]
    pub source: Option<PathBuf>,

    /// Link location (defaults to KiCad's per-user plugin directory)
    #[arg(long)]
    pub target: Option<PathBuf>,

    /// KiCad version used to build the default target
    #[arg(long)]
    pub kicad_version: Option<String>,
}

impl LinkArgs {
    pub fn overrides(&self) -> LinkOverrides {
        LinkOverrides {
            source: self.source.clone(),
            target: self.target.clone(),
            kicad_version: self.kicad_version.clone(),
        }
    }
}
