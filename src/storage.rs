//! Persistence for client-side state which should survive a restart.

use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::{Arc, Mutex},
};

/// A tiny key-value store.
///
/// Multi-key operations must be applied as a unit so related values (e.g. a
/// token and the user it belongs to) can't be observed half-written.
pub trait Storage: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set_many(&self, entries: &[(&str, &str)]) -> Result<(), StorageError>;
    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("Unable to access {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        error: std::io::Error,
    },
    #[error("The stored data is corrupted")]
    Corrupted(#[from] serde_json::Error),
}

/// Keeps everything in memory. Clones share the same entries.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<BTreeMap<String, String>>>,
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        Ok(entries.get(key).cloned())
    }

    fn set_many(&self, new: &[(&str, &str)]) -> Result<(), StorageError> {
        let mut entries =
            self.entries.lock().unwrap_or_else(|e| e.into_inner());

        for (key, value) in new {
            entries.insert(key.to_string(), value.to_string());
        }

        Ok(())
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        let mut entries =
            self.entries.lock().unwrap_or_else(|e| e.into_inner());

        for key in keys {
            entries.remove(*key);
        }

        Ok(())
    }
}

/// Stores entries as a flat JSON object on disk.
///
/// Every call reads or rewrites the whole file synchronously while holding a
/// lock, so it blocks the calling thread (including a tokio worker) until the
/// disk is done. The document only ever holds a couple of short keys.
#[derive(Debug)]
pub struct FileStorage {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStorage {
    pub fn new<P: Into<PathBuf>>(path: P) -> Self {
        FileStorage {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path { &self.path }

    fn read(&self) -> Result<BTreeMap<String, String>, StorageError> {
        match fs::read_to_string(&self.path) {
            Ok(text) if text.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(text) => serde_json::from_str(&text).map_err(Into::into),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(error) => Err(self.io_error(error)),
        }
    }

    fn write(
        &self,
        entries: &BTreeMap<String, String>,
    ) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }

        let text = serde_json::to_string_pretty(entries)?;

        // replace the file in one step so readers never see half a document
        let temp = self.path.with_extension("tmp");
        fs::write(&temp, text).map_err(|e| self.io_error(e))?;
        fs::rename(&temp, &self.path).map_err(|e| self.io_error(e))?;

        log::trace!("Wrote {} entries to {}", entries.len(), self.path.display());

        Ok(())
    }

    fn modify<F>(&self, change: F) -> Result<(), StorageError>
    where
        F: FnOnce(&mut BTreeMap<String, String>),
    {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());

        let mut entries = self.read()?;
        change(&mut entries);
        self.write(&entries)
    }

    fn io_error(&self, error: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            error,
        }
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let _guard = self.lock.lock().unwrap_or_else(|e| e.into_inner());
        Ok(self.read()?.remove(key))
    }

    fn set_many(&self, new: &[(&str, &str)]) -> Result<(), StorageError> {
        self.modify(|entries| {
            for (key, value) in new {
                entries.insert(key.to_string(), value.to_string());
            }
        })
    }

    fn remove_many(&self, keys: &[&str]) -> Result<(), StorageError> {
        self.modify(|entries| {
            for key in keys {
                entries.remove(*key);
            }
        })
    }
}
