use crate::domain::ports::Storage;
use crate::utils::error::Result;
use std::path::{Path, PathBuf};

/// 本機檔案系統，相對路徑以 `base_path` 為基準
#[derive(Debug, Clone)]
pub struct LocalStorage {
    base_path: PathBuf,
}

impl LocalStorage {
    pub fn new<P: AsRef<Path>>(base_path: P) -> Self {
        Self {
            base_path: base_path.as_ref().to_path_buf(),
        }
    }

    fn resolve(&self, path: &str) -> PathBuf {
        self.base_path.join(path)
    }
}

impl Default for LocalStorage {
    fn default() -> Self {
        Self::new(".")
    }
}

impl Storage for LocalStorage {
    async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
        let data = tokio::fs::read(self.resolve(path)).await?;
        Ok(data)
    }

    async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
        let full_path = self.resolve(path);

        if let Some(parent) = full_path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        tokio::fs::write(full_path, data).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parent_dirs_and_reads_back() {
        let dir = tempfile::TempDir::new().unwrap();
        let storage = LocalStorage::new(dir.path());

        storage
            .write_file("nested/out/report.txt", b"ok")
            .await
            .unwrap();
        assert_eq!(storage.read_file("nested/out/report.txt").await.unwrap(), b"ok");
        assert!(storage.read_file("missing.txt").await.is_err());
    }
}
