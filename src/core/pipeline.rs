use crate::core::checker::{Checker, RuleSet};
use crate::core::imports::{cross_reference, ImportScanner};
use crate::core::index::{resolve_requirements, PypiIndex};
use crate::core::parser::parse_manifest;
use crate::core::report::ReportFormat;
use crate::core::stdlib::StdlibCatalog;
use crate::core::{AuditReport, ConfigProvider, Manifest, PackageIndex, Pipeline, Storage};
use crate::domain::model::{Diagnostic, Severity, Summary};
use crate::utils::error::{AuditError, Result};
use chrono::Utc;
use std::path::Path;
use std::sync::Arc;

pub struct AuditPipeline<S: Storage, C: ConfigProvider> {
    storage: S,
    config: C,
    checker: Checker,
    index: Option<Arc<dyn PackageIndex>>,
}

impl<S: Storage, C: ConfigProvider> AuditPipeline<S, C> {
    pub fn new(storage: S, config: C) -> Result<Self> {
        let catalog = StdlibCatalog::with_overrides(
            config.extra_stdlib_modules(),
            config.allowed_stdlib_modules(),
        );
        let checker = Checker::new(RuleSet::from_config(&config), catalog);

        let index: Option<Arc<dyn PackageIndex>> = match config.index_url() {
            Some(url) => Some(Arc::new(PypiIndex::new(url, config.index_timeout_seconds())?)),
            None => None,
        };

        Ok(Self {
            storage,
            config,
            checker,
            index,
        })
    }

    /// Replaces the package index client, e.g. with an offline mirror.
    pub fn with_index(mut self, index: Arc<dyn PackageIndex>) -> Self {
        self.index = Some(index);
        self
    }

    pub fn checker(&self) -> &Checker {
        &self.checker
    }

    fn build_report(&self, manifest: &Manifest, mut diagnostics: Vec<Diagnostic>) -> AuditReport {
        // 沒有行號的（例如 import 檢查）排在最後
        diagnostics.sort_by_key(|d| d.line.unwrap_or(usize::MAX));

        let count = |severity: Severity| diagnostics.iter().filter(|d| d.severity == severity).count();
        let catalog = self.checker.catalog();

        let summary = Summary {
            lines: manifest.lines.len(),
            requirements: manifest.requirements().count(),
            disabled: manifest.disabled().count(),
            errors: count(Severity::Error),
            warnings: count(Severity::Warning),
            infos: count(Severity::Info),
        };

        AuditReport {
            manifest_path: self.config.manifest_path().to_string(),
            generated_at: Utc::now(),
            summary,
            declared: manifest.declared_names(),
            install_set: manifest
                .install_set(catalog, false)
                .iter()
                .map(|r| r.to_string())
                .collect(),
            stdlib_overlap: manifest.stdlib_overlap(catalog),
            diagnostics,
        }
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider> Pipeline for AuditPipeline<S, C> {
    async fn extract(&self) -> Result<Manifest> {
        let path = self.config.manifest_path();
        tracing::debug!("Reading manifest: {}", path);

        let bytes = self.storage.read_file(path).await?;
        let content = String::from_utf8(bytes).map_err(|e| AuditError::ProcessingError {
            message: format!("Manifest '{}' is not valid UTF-8: {}", path, e),
        })?;

        let manifest = parse_manifest(&content);
        tracing::debug!(
            "Parsed {} lines, {} active requirements",
            manifest.lines.len(),
            manifest.requirements().count()
        );
        Ok(manifest)
    }

    async fn transform(&self, manifest: Manifest) -> Result<AuditReport> {
        let mut diagnostics = self.checker.check(&manifest);

        if let Some(dir) = self.config.source_dir() {
            tracing::info!("🔎 Cross-checking imports under {}", dir);
            let scanner = ImportScanner::new(dir);
            // 走訪目錄與讀檔都是阻塞 I/O
            let imports = tokio::task::spawn_blocking(move || scanner.scan())
                .await
                .map_err(|e| AuditError::ProcessingError {
                    message: format!("import scan task failed: {}", e),
                })??;
            diagnostics.extend(cross_reference(
                &manifest,
                &imports,
                self.checker.catalog(),
                self.config.import_aliases(),
                self.checker.rules(),
            ));
        }

        if let Some(index) = &self.index {
            tracing::info!("🌐 Resolving requirements on the package index");
            diagnostics.extend(
                resolve_requirements(
                    Arc::clone(index),
                    &manifest,
                    self.checker.catalog(),
                    self.checker.rules(),
                    self.config.concurrent_requests(),
                )
                .await,
            );
        }

        Ok(self.build_report(&manifest, diagnostics))
    }

    async fn load(&self, report: &AuditReport) -> Result<Vec<String>> {
        let Some(output_path) = self.config.output_path() else {
            return Ok(Vec::new());
        };

        let mut written = Vec::new();
        for format in self.config.output_formats() {
            let format = ReportFormat::parse(format)?;
            let rendered = format.render(report)?;
            let path = Path::new(output_path).join(format.file_name());
            let path = path.to_string_lossy().to_string();

            self.storage.write_file(&path, rendered.as_bytes()).await?;
            tracing::debug!("Wrote {} bytes to {}", rendered.len(), path);
            written.push(path);
        }

        Ok(written)
    }
}
