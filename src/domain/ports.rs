use crate::domain::model::{ArchivePlan, ExportSummary, ProjectClosure};
use crate::utils::error::Result;
use std::path::Path;
use std::time::SystemTime;

pub trait Storage {
    fn read_file(&self, path: &Path) -> Result<Vec<u8>>;
    fn write_file(&self, path: &Path, data: &[u8]) -> Result<()>;

    fn modified(&self, _path: &Path) -> Option<SystemTime> {
        None
    }
}

pub trait ConfigProvider {
    fn board_path(&self) -> &Path;
    fn output_path(&self) -> &Path;
    fn external_dir(&self) -> &str;
    fn skip_prefixes(&self) -> &[String];
    fn include_footprints(&self) -> bool;
    fn excludes(&self) -> &[String];
}

pub trait Pipeline {
    fn collect(&self) -> Result<ProjectClosure>;
    fn plan(&self, closure: ProjectClosure) -> Result<ArchivePlan>;
    fn write(&self, plan: ArchivePlan) -> Result<ExportSummary>;
}
