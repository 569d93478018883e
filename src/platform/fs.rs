// LogDepot - platform/fs.rs
//
// Filesystem helpers shared by the app layer: retrying file opens, atomic
// JSON snapshots, and moving unreadable state files aside.

use crate::util::constants;
use crate::util::error::PersistError;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::ffi::OsString;
use std::fs::File;
use std::io::{self, BufReader};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Open `path` for buffered reading, retrying transient I/O errors with
/// capped backoff. Permanent errors are returned immediately.
pub fn open_with_retry(path: &Path) -> io::Result<BufReader<File>> {
    open_with_retry_using(path, |p: &Path| File::open(p))
}

fn open_with_retry_using<F>(path: &Path, mut open: F) -> io::Result<BufReader<File>>
where
    F: FnMut(&Path) -> io::Result<File>,
{
    let mut last_err: Option<io::Error> = None;

    for attempt in 0..constants::MAX_OPEN_RETRIES {
        match open(path) {
            Ok(file) => return Ok(BufReader::new(file)),
            Err(e) if is_transient_error(&e) => {
                tracing::debug!(
                    file = %path.display(),
                    attempt = attempt + 1,
                    error = %e,
                    "Transient I/O error"
                );
                // No pause after the final attempt.
                if attempt + 1 < constants::MAX_OPEN_RETRIES {
                    std::thread::sleep(Duration::from_millis(
                        constants::OPEN_RETRY_DELAYS_MS[attempt as usize],
                    ));
                }
                last_err = Some(e);
            }
            Err(e) => return Err(e),
        }
    }

    Err(last_err.unwrap_or_else(|| io::Error::other("Unknown open error")))
}

/// Returns true for transient I/O errors that are worth retrying.
fn is_transient_error(e: &io::Error) -> bool {
    matches!(
        e.kind(),
        io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted | io::ErrorKind::TimedOut
    )
}

/// Save `data` as pretty JSON to `path` atomically (write temp → rename).
///
/// Creates parent directories as needed. A crash between write and rename
/// loses the new snapshot but never corrupts the previous one.
pub fn save_json_atomic<T: Serialize>(data: &T, path: &Path) -> Result<(), PersistError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|source| PersistError::Io {
            path: parent.to_path_buf(),
            operation: "create directory for",
            source,
        })?;
    }

    let json = serde_json::to_string_pretty(data).map_err(|source| PersistError::Serialize {
        path: path.to_path_buf(),
        source,
    })?;

    write_atomic(path, json.as_bytes())?;
    tracing::debug!(path = %path.display(), "Snapshot saved");
    Ok(())
}

/// Replace `path` with `bytes` via a sibling temp file and a rename.
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), PersistError> {
    let mut tmp_name: OsString = path.as_os_str().to_os_string();
    tmp_name.push(".tmp");
    let tmp = PathBuf::from(tmp_name);

    std::fs::write(&tmp, bytes).map_err(|source| PersistError::Io {
        path: tmp.clone(),
        operation: "write",
        source,
    })?;

    std::fs::rename(&tmp, path).map_err(|source| {
        let _ = std::fs::remove_file(&tmp);
        PersistError::Io {
            path: path.to_path_buf(),
            operation: "finalise",
            source,
        }
    })
}

/// Outcome of reading a JSON snapshot.
#[derive(Debug)]
pub enum Snapshot<T> {
    /// No file at the path.
    Missing,
    Loaded(T),
    /// The file exists but does not decode.
    Malformed(serde_json::Error),
}

/// Load a JSON snapshot from `path`.
///
/// Read failures other than "not found" are errors: the file may still hold
/// good data, so the caller must not start fresh over it.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<Snapshot<T>, PersistError> {
    let content = match std::fs::read(path) {
        Ok(content) => content,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Snapshot::Missing),
        Err(source) => {
            return Err(PersistError::Io {
                path: path.to_path_buf(),
                operation: "read",
                source,
            })
        }
    };

    Ok(match serde_json::from_slice(&content) {
        Ok(value) => Snapshot::Loaded(value),
        Err(e) => Snapshot::Malformed(e),
    })
}

/// Move an unusable state file out of the way so a fresh one can be
/// written without destroying it. Returns the new location,
/// `<name>.corrupt-<UTC timestamp>`.
pub fn quarantine(path: &Path) -> Result<PathBuf, PersistError> {
    let mut name: OsString = path.as_os_str().to_os_string();
    name.push(".corrupt-");
    name.push(chrono::Utc::now().format("%Y%m%dT%H%M%S%3f").to_string());
    let backup = PathBuf::from(name);

    std::fs::rename(path, &backup).map_err(|source| PersistError::Io {
        path: path.to_path_buf(),
        operation: "move aside",
        source,
    })?;

    tracing::warn!(
        path = %path.display(),
        backup = %backup.display(),
        "Unreadable state file moved aside; starting fresh"
    );
    Ok(backup)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::io::Read;
    use tempfile::TempDir;

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct Names {
        version: u32,
        names: Vec<String>,
    }

    #[test]
    fn test_open_with_retry_reads_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let mut content = String::new();
        open_with_retry(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!(content, "hello");
    }

    #[test]
    fn test_open_with_retry_missing_file_is_permanent() {
        let dir = TempDir::new().unwrap();
        let err = open_with_retry(&dir.path().join("missing.txt")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
    }

    #[test]
    fn test_snapshot_save_and_load() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snap.json");
        let snap = Names {
            version: 1,
            names: vec!["a".to_string(), "b".to_string()],
        };
        save_json_atomic(&snap, &path).unwrap();
        match load_json::<Names>(&path).unwrap() {
            Snapshot::Loaded(loaded) => assert_eq!(loaded, snap),
            other => panic!("expected a loaded snapshot, got {other:?}"),
        }
        assert!(!dir.path().join("nested").join("snap.json.tmp").exists());
    }

    #[test]
    fn test_load_json_distinguishes_missing_and_malformed() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("snap.json");
        std::fs::write(&path, b"not valid json {{{{").unwrap();
        assert!(matches!(
            load_json::<Names>(&path).unwrap(),
            Snapshot::Malformed(_)
        ));
        assert!(matches!(
            load_json::<Names>(&dir.path().join("absent.json")).unwrap(),
            Snapshot::Missing
        ));
    }

    #[test]
    fn test_quarantine_keeps_the_original_bytes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        std::fs::write(&path, b"{\"version\": 1, \"us").unwrap();

        let backup = quarantine(&path).unwrap();
        assert!(!path.exists());
        assert_eq!(std::fs::read(&backup).unwrap(), b"{\"version\": 1, \"us");
        let backup_name = backup.file_name().unwrap().to_str().unwrap();
        assert!(backup_name.starts_with("users.json.corrupt-"));
    }

    #[test]
    fn test_open_with_retry_gives_up_without_trailing_pause() {
        let dir = TempDir::new().unwrap();
        let mut calls = 0;
        let started = std::time::Instant::now();
        let err = open_with_retry_using(&dir.path().join("busy.txt"), |_| {
            calls += 1;
            Err(io::Error::new(io::ErrorKind::WouldBlock, "busy"))
        })
        .unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::WouldBlock);
        assert_eq!(calls, constants::MAX_OPEN_RETRIES);
        let paused: u64 = constants::OPEN_RETRY_DELAYS_MS
            [..constants::MAX_OPEN_RETRIES as usize - 1]
            .iter()
            .sum();
        let last = constants::OPEN_RETRY_DELAYS_MS[constants::MAX_OPEN_RETRIES as usize - 1];
        assert!(started.elapsed() < Duration::from_millis(paused + last));
    }
}
