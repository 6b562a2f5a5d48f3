use super::Storage;
use crate::error::ProxyResult;
use bytes::Bytes;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};

/// Keeps mirrored files in memory. Clones share the same files.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    files: Arc<Mutex<HashMap<String, Bytes>>>,
    /// Every write in order, including overwrites
    writes: Arc<Mutex<Vec<String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, path: &str) -> Option<Bytes> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// Paths of all stored files, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut paths: Vec<_> = self.files.lock().unwrap().keys().cloned().collect();
        paths.sort();
        paths
    }

    /// Number of writes issued for `path`.
    pub fn write_count(&self, path: &str) -> usize {
        self.writes
            .lock()
            .unwrap()
            .iter()
            .filter(|written| written.as_str() == path)
            .count()
    }

    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl Storage for MemoryStorage {
    async fn exists(&self, path: &str) -> bool {
        self.files.lock().unwrap().contains_key(path)
    }

    async fn write(&self, path: &str, data: Bytes) -> ProxyResult<()> {
        self.files.lock().unwrap().insert(path.to_string(), data);
        self.writes.lock().unwrap().push(path.to_string());
        Ok(())
    }
}
