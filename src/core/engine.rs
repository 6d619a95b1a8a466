use crate::core::Pipeline;
use crate::domain::model::{ArchivePlan, ExportSummary};
use crate::utils::error::Result;

/// Drives a [`Pipeline`] through collect, plan and write.
pub struct ExportEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> ExportEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    /// Collect and plan only; nothing is written.
    pub fn preview(&self) -> Result<ArchivePlan> {
        tracing::info!("Collecting project files...");
        let closure = self.pipeline.collect()?;
        tracing::info!(
            "Found {} files in {}",
            closure.file_count(),
            closure.project_dir.display()
        );

        let plan = self.pipeline.plan(closure)?;
        tracing::info!(
            "Planned {} archive entries ({} excluded)",
            plan.entries.len(),
            plan.excluded.len()
        );
        Ok(plan)
    }

    pub fn run(&self) -> Result<ExportSummary> {
        let plan = self.preview()?;

        tracing::info!("Writing {}...", plan.output_path.display());
        let summary = self.pipeline.write(plan)?;
        tracing::info!(
            "📁 Wrote {} files ({} bytes) to {}",
            summary.file_count,
            summary.archive_bytes,
            summary.output_path.display()
        );

        Ok(summary)
    }
}
