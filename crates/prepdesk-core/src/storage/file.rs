use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::StorageError;

use super::KeyValueStore;

/// Extension for value files. Stored values are JSON documents or bare flags.
const VALUE_EXTENSION: &str = "json";

/// Suffix for in-flight writes, renamed over the real file on completion
const TEMP_SUFFIX: &str = "tmp";

/// Key-value store keeping one file per key in a directory
#[derive(Debug, Clone)]
pub struct FileStore {
    data_dir: PathBuf,
}

impl FileStore {
    /// Open the store, creating the directory if needed
    pub async fn open(data_dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let data_dir = data_dir.into();
        tokio::fs::create_dir_all(&data_dir)
            .await
            .map_err(|source| StorageError::CreateDir {
                path: data_dir.clone(),
                source,
            })?;
        debug!(dir = %data_dir.display(), "File store opened");
        Ok(Self { data_dir })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    fn value_path(&self, key: &str) -> PathBuf {
        self.data_dir
            .join(format!("{}.{}", encode_key(key), VALUE_EXTENSION))
    }
}

/// Percent-encode a key into a file name.
/// Alphanumerics, `_` and `-` pass through so common keys stay readable.
fn encode_key(key: &str) -> String {
    let mut encoded = String::with_capacity(key.len());
    for byte in key.bytes() {
        if byte.is_ascii_alphanumeric() || byte == b'_' || byte == b'-' {
            encoded.push(byte as char);
        } else {
            encoded.push_str(&format!("%{:02X}", byte));
        }
    }
    encoded
}

impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.value_path(key)).await {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.value_path(key);
        let temp_path = path.with_extension(format!("{}.{}", VALUE_EXTENSION, TEMP_SUFFIX));

        tokio::fs::write(&temp_path, value)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        tokio::fs::rename(&temp_path, &path)
            .await
            .map_err(|e| StorageError::io(key, e))?;
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<(), StorageError> {
        match tokio::fs::remove_file(self.value_path(key)).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StorageError::io(key, e)),
        }
    }

    async fn multi_set(&self, pairs: &[(&str, String)]) -> Result<(), StorageError> {
        for (key, value) in pairs {
            self.set(key, value).await?;
        }
        Ok(())
    }

    async fn multi_remove(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut first_error = None;
        for key in keys {
            if let Err(e) = self.remove(key).await {
                debug!(key, error = %e, "Failed to remove key");
                first_error.get_or_insert(e);
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}
