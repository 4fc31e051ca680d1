use crate::error::{Result, StorageError};
use crate::ports::{BatchOperation, KeyValueStore, ScanResult};
use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// File-backed key-value store.
///
/// Keeps the whole map in memory and rewrites a binary snapshot
/// (`[key_len:u32][key][value_len:u32][value]...`) through a temp file and
/// rename after every mutation, so a crash leaves either the old or the new
/// file on disk. One rewrite per batch keeps a block commit to one fsync.
pub struct FileBackedKVStore {
    data: BTreeMap<Vec<u8>, Vec<u8>>,
    path: PathBuf,
}

impl FileBackedKVStore {
    /// Open (or create) a store at the given path.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::File::open(&path) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)
                    .map_err(|e| StorageError::Io(e.to_string()))?;
                let data = Self::decode(&bytes)?;
                info!("[lc-01] Loaded {} keys from {}", data.len(), path.display());
                data
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("[lc-01] No existing storage file at {}", path.display());
                BTreeMap::new()
            }
            Err(e) => return Err(StorageError::Io(e.to_string())),
        };

        Ok(Self { data, path })
    }

    fn decode(bytes: &[u8]) -> Result<BTreeMap<Vec<u8>, Vec<u8>>> {
        let mut data = BTreeMap::new();
        let mut cursor = 0;

        let read_chunk = |cursor: &mut usize| -> Result<Vec<u8>> {
            let len_end = *cursor + 4;
            let len_bytes: [u8; 4] = bytes
                .get(*cursor..len_end)
                .and_then(|s| s.try_into().ok())
                .ok_or_else(|| StorageError::Corruption("truncated length".into()))?;
            let len = u32::from_le_bytes(len_bytes) as usize;
            let chunk = bytes
                .get(len_end..len_end + len)
                .ok_or_else(|| StorageError::Corruption("truncated entry".into()))?;
            *cursor = len_end + len;
            Ok(chunk.to_vec())
        };

        while cursor < bytes.len() {
            let key = read_chunk(&mut cursor)?;
            let value = read_chunk(&mut cursor)?;
            data.insert(key, value);
        }

        Ok(data)
    }

    fn save_to_file(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| StorageError::Io(e.to_string()))?;
        }

        let mut bytes = Vec::new();
        for (key, value) in &self.data {
            bytes.extend_from_slice(&(key.len() as u32).to_le_bytes());
            bytes.extend_from_slice(key);
            bytes.extend_from_slice(&(value.len() as u32).to_le_bytes());
            bytes.extend_from_slice(value);
        }

        let temp_path = self.path.with_extension("tmp");
        let mut file =
            std::fs::File::create(&temp_path).map_err(|e| StorageError::Io(e.to_string()))?;
        file.write_all(&bytes)
            .map_err(|e| StorageError::Io(e.to_string()))?;
        file.sync_all().map_err(|e| StorageError::Io(e.to_string()))?;
        std::fs::rename(&temp_path, &self.path).map_err(|e| StorageError::Io(e.to_string()))?;

        debug!("[lc-01] Persisted {} keys to {}", self.data.len(), self.path.display());
        Ok(())
    }
}

impl KeyValueStore for FileBackedKVStore {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.data.get(key).cloned())
    }

    fn put(&mut self, key: &[u8], value: &[u8]) -> Result<()> {
        self.data.insert(key.to_vec(), value.to_vec());
        self.save_to_file()
    }

    fn delete(&mut self, key: &[u8]) -> Result<()> {
        self.data.remove(key);
        self.save_to_file()
    }

    fn atomic_batch_write(&mut self, operations: Vec<BatchOperation>) -> Result<()> {
        let mut next = self.data.clone();
        for op in operations {
            match op {
                BatchOperation::Put { key, value } => {
                    next.insert(key, value);
                }
                BatchOperation::Delete { key } => {
                    next.remove(&key);
                }
            }
        }
        let previous = std::mem::replace(&mut self.data, next);
        if let Err(e) = self.save_to_file() {
            self.data = previous;
            return Err(e);
        }
        Ok(())
    }

    fn exists(&self, key: &[u8]) -> Result<bool> {
        Ok(self.data.contains_key(key))
    }

    fn prefix_scan(&self, prefix: &[u8]) -> Result<ScanResult> {
        Ok(self
            .data
            .range(prefix.to_vec()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
