// LogDepot - app/registry.rs
//
// Corpus registry: the durable record of every ingested top-level file.
//
// Design:
//   - Entries live in a `parking_lot::RwLock<Vec<Arc<StoredFile>>>`. Readers
//     clone a snapshot of the `Arc`s and release the lock before doing any
//     work, so queries never observe a half-written entry.
//   - Appends are serialised by a separate writer mutex that owns the id
//     counter and the on-disk journal. The entry is written and synced to the
//     journal first; the read lock is only taken for the final push, so
//     readers never wait on disk I/O. A failed write leaves the registry
//     unchanged.
//   - The journal holds one JSON line per entry, so an append costs the same
//     no matter how many files are already registered.
//   - Names are not unique; two uploads with the same name are two entries.
//   - An unreadable journal is moved aside before a fresh one is started.

use crate::core::filter::FileFilter;
use crate::core::model::{NewStoredFile, StoredFile};
use crate::platform::journal::Journal;
use crate::util::constants::REGISTRY_VERSION;
use crate::util::error::RegistryError;
use parking_lot::{Mutex, RwLock};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Append-side state. Held only by writers.
#[derive(Debug)]
struct Writer {
    next_id: u64,
    journal: Option<Journal>,
}

/// Shared, append-only registry of stored files.
#[derive(Debug)]
pub struct CorpusRegistry {
    files: RwLock<Vec<Arc<StoredFile>>>,
    writer: Mutex<Writer>,
    persist_path: Option<PathBuf>,
}

impl CorpusRegistry {
    /// A registry that lives only in memory.
    pub fn in_memory() -> Self {
        Self {
            files: RwLock::new(Vec::new()),
            writer: Mutex::new(Writer {
                next_id: 1,
                journal: None,
            }),
            persist_path: None,
        }
    }

    /// Open the registry journal at `path`, creating it if missing. Every
    /// subsequent append is recorded there.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, RegistryError> {
        let path = path.into();
        let opened = Journal::open::<StoredFile>(&path, REGISTRY_VERSION)?;

        if let Some(ref backup) = opened.quarantined {
            tracing::warn!(
                path = %path.display(),
                backup = %backup.display(),
                "Registry journal was unreadable; kept a copy and started empty"
            );
        }

        let next_id = opened.records.iter().map(|f| f.id).max().unwrap_or(0) + 1;
        tracing::info!(
            path = %path.display(),
            files = opened.records.len(),
            next_id,
            "Registry restored"
        );

        Ok(Self {
            files: RwLock::new(opened.records.into_iter().map(Arc::new).collect()),
            writer: Mutex::new(Writer {
                next_id,
                journal: Some(opened.journal),
            }),
            persist_path: Some(path),
        })
    }

    pub fn persist_path(&self) -> Option<&Path> {
        self.persist_path.as_deref()
    }

    /// Register a new file and return the stored entry.
    pub fn append(&self, new: NewStoredFile) -> Result<Arc<StoredFile>, RegistryError> {
        let mut writer = self.writer.lock();

        let file = StoredFile {
            id: writer.next_id,
            name: new.name,
            path: new.path,
            file_type: new.file_type,
            ingested_at: new.ingested_at,
        };

        if let Some(ref mut journal) = writer.journal {
            journal.append(&file)?;
        }
        writer.next_id += 1;

        let file = Arc::new(file);
        self.files.write().push(Arc::clone(&file));

        tracing::info!(
            id = file.id,
            name = %file.name,
            file_type = %file.file_type,
            "File registered"
        );
        Ok(file)
    }

    /// All entries matching every predicate of `filter`, in registration order.
    pub fn find(&self, filter: &FileFilter) -> Vec<Arc<StoredFile>> {
        self.files
            .read()
            .iter()
            .filter(|f| filter.matches(f))
            .cloned()
            .collect()
    }

    /// Every entry, in registration order.
    pub fn all(&self) -> Vec<Arc<StoredFile>> {
        self.files.read().clone()
    }

    pub fn get(&self, id: u64) -> Option<Arc<StoredFile>> {
        self.files.read().iter().find(|f| f.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
