use crate::domain::model::{AuditReport, Manifest, Rule, Severity};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::collections::HashMap;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn manifest_path(&self) -> &str;
    fn output_path(&self) -> Option<&str>;
    fn output_formats(&self) -> &[String];
    /// `None` 表示此規則關閉
    fn rule_level(&self, rule: Rule) -> Option<Severity>;
    fn extra_stdlib_modules(&self) -> &[String];
    fn allowed_stdlib_modules(&self) -> &[String];
    fn source_dir(&self) -> Option<&str>;
    fn import_aliases(&self) -> &HashMap<String, String>;
    /// 只有啟用索引檢查時才會回傳 URL
    fn index_url(&self) -> Option<&str>;
    fn index_timeout_seconds(&self) -> u64;
    fn concurrent_requests(&self) -> usize;
}

#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// `Ok(false)` only when the index positively reports the project as missing.
    async fn project_exists(&self, name: &str) -> Result<bool>;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<Manifest>;
    async fn transform(&self, manifest: Manifest) -> Result<AuditReport>;
    async fn load(&self, report: &AuditReport) -> Result<Vec<String>>;
}
