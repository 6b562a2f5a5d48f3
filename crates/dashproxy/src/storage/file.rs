use super::Storage;
use crate::error::ProxyResult;
use bytes::Bytes;
use std::path::PathBuf;

/// Mirrors files below a directory on disk.
pub struct FileStorage {
    output_dir: PathBuf,
}

impl FileStorage {
    pub fn new(output_dir: PathBuf) -> Self {
        Self { output_dir }
    }

    fn file_path(&self, path: &str) -> PathBuf {
        path.split('/')
            .filter(|component| !component.is_empty())
            .fold(self.output_dir.clone(), |dir, component| dir.join(component))
    }
}

impl Storage for FileStorage {
    async fn exists(&self, path: &str) -> bool {
        tokio::fs::metadata(self.file_path(path))
            .await
            .map(|m| m.is_file())
            .unwrap_or_default()
    }

    async fn write(&self, path: &str, data: Bytes) -> ProxyResult<()> {
        let path = self.file_path(path);
        if let Some(parent) = path.parent() {
            // Succeeds when the directory already exists, including when a concurrent
            // writer created it first
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, data).await?;
        Ok(())
    }

    fn location_hint(&self) -> Option<String> {
        Some(self.output_dir.display().to_string())
    }
}
