use crate::core::{AuditReport, Pipeline};
use crate::utils::error::Result;
use std::time::Instant;

#[derive(Debug, Clone)]
pub struct AuditOutcome {
    pub report: AuditReport,
    pub written: Vec<String>,
}

pub struct AuditEngine<P: Pipeline> {
    pipeline: P,
}

impl<P: Pipeline> AuditEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self { pipeline }
    }

    pub async fn run(&self) -> Result<AuditOutcome> {
        let started = Instant::now();
        tracing::info!("🚀 Starting manifest audit");

        // Extract
        let manifest = self.pipeline.extract().await?;
        tracing::info!(
            "📄 Parsed {} lines ({} requirements)",
            manifest.lines.len(),
            manifest.requirements().count()
        );

        // Transform
        let report = self.pipeline.transform(manifest).await?;
        tracing::info!(
            "🔍 Found {} errors, {} warnings, {} notes",
            report.summary.errors,
            report.summary.warnings,
            report.summary.infos
        );

        // Load
        let written = self.pipeline.load(&report).await?;
        for path in &written {
            tracing::info!("📁 Report saved to: {}", path);
        }

        tracing::info!("✅ Audit finished in {:?}", started.elapsed());
        Ok(AuditOutcome { report, written })
    }
}
