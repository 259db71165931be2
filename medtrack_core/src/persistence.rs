//! Durable storage for the store snapshot.
//!
//! The whole state lives in one JSON document. The file backend reads under
//! a shared lock and writes a locked temp file that is renamed over the
//! target, so a reader never observes a half-written snapshot.

use crate::store::StoreSnapshot;
use crate::{Error, Result};
use fs2::FileExt;
use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tempfile::NamedTempFile;

/// Backend the store persists every snapshot to
pub trait SnapshotStore {
    /// Load the last saved snapshot, or `None` if nothing usable is stored
    fn load(&self) -> Result<Option<StoreSnapshot>>;

    fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()>;
}

/// JSON file backend with file locking
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Backend for `<data_dir>/<store_name>.json`
    pub fn in_dir(data_dir: &Path, store_name: &str) -> Self {
        Self::new(data_dir.join(format!("{}.json", store_name)))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn parent_dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}

impl SnapshotStore for JsonFileStore {
    /// Returns `None` if the file doesn't exist.
    /// If the file is unreadable or corrupted, logs a warning and returns `None`.
    fn load(&self) -> Result<Option<StoreSnapshot>> {
        let path = &self.path;
        if !path.exists() {
            tracing::info!("No state file at {:?}, starting empty", path);
            return Ok(None);
        }

        let file = match File::open(path) {
            Ok(f) => f,
            Err(e) => {
                tracing::warn!("Unable to open state file {:?}: {}. Starting empty.", path, e);
                return Ok(None);
            }
        };

        if let Err(e) = file.lock_shared() {
            tracing::warn!("Unable to lock state file {:?}: {}. Starting empty.", path, e);
            return Ok(None);
        }

        let mut contents = String::new();
        let mut reader = std::io::BufReader::new(&file);
        if let Err(e) = reader.read_to_string(&mut contents) {
            let _ = file.unlock();
            tracing::warn!("Failed to read state file {:?}: {}. Starting empty.", path, e);
            return Ok(None);
        }

        file.unlock()?;

        match serde_json::from_str::<StoreSnapshot>(&contents) {
            Ok(snapshot) => {
                tracing::debug!("Loaded state from {:?}", path);
                Ok(Some(snapshot))
            }
            Err(e) => {
                tracing::warn!("Failed to parse state file {:?}: {}. Starting empty.", path, e);
                Ok(None)
            }
        }
    }

    fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        let dir = self.parent_dir();
        std::fs::create_dir_all(dir)?;

        let temp = NamedTempFile::new_in(dir)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(snapshot)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        temp.persist(&self.path)
            .map_err(|e| Error::State(format!("Failed to replace {:?}: {}", self.path, e.error)))?;

        tracing::debug!("Saved state to {:?}", self.path);
        Ok(())
    }
}

/// In-memory backend; clones share the same slot
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    slot: Rc<RefCell<Option<StoreSnapshot>>>,
    saves: Rc<RefCell<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing snapshot, as if it had been saved earlier
    pub fn with_snapshot(snapshot: StoreSnapshot) -> Self {
        let store = Self::default();
        *store.slot.borrow_mut() = Some(snapshot);
        store
    }

    pub fn last_saved(&self) -> Option<StoreSnapshot> {
        self.slot.borrow().clone()
    }

    /// Number of successful saves
    pub fn save_count(&self) -> usize {
        *self.saves.borrow()
    }
}

impl SnapshotStore for MemoryStore {
    fn load(&self) -> Result<Option<StoreSnapshot>> {
        Ok(self.slot.borrow().clone())
    }

    fn save(&mut self, snapshot: &StoreSnapshot) -> Result<()> {
        *self.slot.borrow_mut() = Some(snapshot.clone());
        *self.saves.borrow_mut() += 1;
        Ok(())
    }
}
