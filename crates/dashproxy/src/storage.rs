pub mod file;
pub mod memory;

use crate::error::ProxyResult;
use bytes::Bytes;
use std::{future::Future, path::PathBuf};

/// Destination of mirrored files, addressed by `/`-separated paths relative to its root.
pub trait Storage: Send + Sync + 'static {
    /// Whether a file already exists at `path`.
    fn exists(&self, path: &str) -> impl Future<Output = bool> + Send;

    /// Write `data` to `path`, replacing any existing file and creating parent
    /// directories as needed.
    fn write(&self, path: &str, data: Bytes) -> impl Future<Output = ProxyResult<()>> + Send;

    /// Hint a location for the mirrored files.
    fn location_hint(&self) -> Option<String> {
        None
    }
}

pub enum ProxyStorage {
    Memory(memory::MemoryStorage),
    File(file::FileStorage),
}

impl ProxyStorage {
    pub fn memory() -> Self {
        Self::Memory(memory::MemoryStorage::new())
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self::File(file::FileStorage::new(path.into()))
    }
}

impl Storage for ProxyStorage {
    async fn exists(&self, path: &str) -> bool {
        match self {
            ProxyStorage::Memory(storage) => storage.exists(path).await,
            ProxyStorage::File(storage) => storage.exists(path).await,
        }
    }

    async fn write(&self, path: &str, data: Bytes) -> ProxyResult<()> {
        match self {
            ProxyStorage::Memory(storage) => storage.write(path, data).await,
            ProxyStorage::File(storage) => storage.write(path, data).await,
        }
    }

    fn location_hint(&self) -> Option<String> {
        match self {
            ProxyStorage::Memory(storage) => storage.location_hint(),
            ProxyStorage::File(storage) => storage.location_hint(),
        }
    }
}
