// LogDepot - platform/journal.rs
//
// Append-only JSON-lines journal.
//
// Layout: the first line is a header `{"version": N}`, every following line
// is one record. An append writes a single line and syncs it, so its cost
// does not depend on how many records came before.
//
// Recovery on open:
//   - missing file: a new journal with just the header is created.
//   - last line without its newline: the torn append is truncated away and
//     every earlier record is kept.
//   - anything else unreadable (bad header, wrong version, a bad line in the
//     middle): the file is moved aside with `quarantine` and a fresh journal
//     is started. Nothing is ever overwritten in place.

use crate::platform::fs::{quarantine, write_atomic};
use crate::util::error::PersistError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

#[derive(Serialize, Deserialize)]
struct Header {
    version: u32,
}

/// An open journal, positioned for appends.
#[derive(Debug)]
pub struct Journal {
    path: PathBuf,
    file: File,
    len: u64,
}

/// Result of opening a journal.
#[derive(Debug)]
pub struct Opened<T> {
    pub journal: Journal,
    pub records: Vec<T>,
    /// Where an unreadable previous file was moved, if one was.
    pub quarantined: Option<PathBuf>,
}

/// Why an existing journal could not be used as-is.
enum Damage {
    /// Header missing, undecodable, or from another version.
    Header(String),
    /// A record before the last line does not decode.
    Record { line: usize, reason: String },
}

/// Decoded journal content.
struct Parsed<T> {
    records: Vec<T>,
    /// Byte length of the intact prefix (shorter than the file when the
    /// last append was torn).
    intact_len: usize,
}

impl Journal {
    /// Open (creating or recovering as needed) the journal at `path`.
    pub fn open<T: DeserializeOwned>(path: &Path, version: u32) -> Result<Opened<T>, PersistError> {
        let bytes = match std::fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Ok(Opened {
                    journal: Self::create(path, version)?,
                    records: Vec::new(),
                    quarantined: None,
                });
            }
            Err(source) => {
                return Err(PersistError::Io {
                    path: path.to_path_buf(),
                    operation: "read",
                    source,
                })
            }
        };

        match parse::<T>(&bytes, version) {
            Ok(parsed) => {
                if parsed.intact_len < bytes.len() {
                    tracing::warn!(
                        path = %path.display(),
                        dropped_bytes = bytes.len() - parsed.intact_len,
                        "Journal ends in a torn append; truncating it"
                    );
                }
                let journal = Self::append_to(path, parsed.intact_len as u64)?;
                Ok(Opened {
                    journal,
                    records: parsed.records,
                    quarantined: None,
                })
            }
            Err(damage) => {
                match damage {
                    Damage::Header(reason) => tracing::warn!(
                        path = %path.display(),
                        reason = %reason,
                        "Journal header unusable"
                    ),
                    Damage::Record { line, reason } => tracing::warn!(
                        path = %path.display(),
                        line,
                        reason = %reason,
                        "Journal record unusable"
                    ),
                }
                let backup = quarantine(path)?;
                Ok(Opened {
                    journal: Self::create(path, version)?,
                    records: Vec::new(),
                    quarantined: Some(backup),
                })
            }
        }
    }

    /// Append one record as a single synced line.
    ///
    /// On failure the file is cut back to its previous length, so a failed
    /// append never leaves a partial line behind.
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<(), PersistError> {
        let mut line = serde_json::to_vec(record).map_err(|source| PersistError::Serialize {
            path: self.path.clone(),
            source,
        })?;
        line.push(b'\n');

        let written = self
            .file
            .write_all(&line)
            .and_then(|()| self.file.sync_data());
        if let Err(source) = written {
            let _ = self.file.set_len(self.len);
            return Err(PersistError::Io {
                path: self.path.clone(),
                operation: "append to",
                source,
            });
        }

        self.len += line.len() as u64;
        Ok(())
    }

    fn create(path: &Path, version: u32) -> Result<Self, PersistError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| PersistError::Io {
                path: parent.to_path_buf(),
                operation: "create directory for",
                source,
            })?;
        }
        let mut header = serde_json::to_vec(&Header { version }).map_err(|source| {
            PersistError::Serialize {
                path: path.to_path_buf(),
                source,
            }
        })?;
        header.push(b'\n');
        write_atomic(path, &header)?;
        tracing::debug!(path = %path.display(), version, "Journal created");
        Self::append_to(path, header.len() as u64)
    }

    /// Open for appending after cutting the file to `len` bytes.
    fn append_to(path: &Path, len: u64) -> Result<Self, PersistError> {
        let io_err = |operation: &'static str, source: io::Error| PersistError::Io {
            path: path.to_path_buf(),
            operation,
            source,
        };
        let file = OpenOptions::new()
            .append(true)
            .open(path)
            .map_err(|e| io_err("open", e))?;
        let current = file.metadata().map_err(|e| io_err("inspect", e))?.len();
        if current != len {
            file.set_len(len).map_err(|e| io_err("truncate", e))?;
        }
        Ok(Self {
            path: path.to_path_buf(),
            file,
            len,
        })
    }
}

fn parse<T: DeserializeOwned>(bytes: &[u8], version: u32) -> Result<Parsed<T>, Damage> {
    let mut lines = bytes.split_inclusive(|&b| b == b'\n');

    let header_line = lines
        .next()
        .ok_or_else(|| Damage::Header("file is empty".to_string()))?;
    let header: Header = serde_json::from_slice(trim_newline(header_line))
        .map_err(|e| Damage::Header(e.to_string()))?;
    if header.version != version {
        return Err(Damage::Header(format!(
            "version {} (expected {version})",
            header.version
        )));
    }

    let mut records = Vec::new();
    let mut offset = header_line.len();
    for (index, line) in lines.enumerate() {
        // A final line without its newline was never acknowledged.
        if !line.ends_with(b"\n") {
            break;
        }
        let body = trim_newline(line);
        if !body.iter().all(u8::is_ascii_whitespace) {
            let record = serde_json::from_slice::<T>(body).map_err(|e| Damage::Record {
                line: index + 2,
                reason: e.to_string(),
            })?;
            records.push(record);
        }
        offset += line.len();
    }

    Ok(Parsed {
        records,
        intact_len: offset,
    })
}

fn trim_newline(line: &[u8]) -> &[u8] {
    let line = line.strip_suffix(b"\n").unwrap_or(line);
    line.strip_suffix(b"\r").unwrap_or(line)
}
