// LogDepot - core/model.rs
//
// Core data model types. Pure data definitions with no I/O and no
// server dependencies.
//
// These types are the shared vocabulary across all layers.

use crate::util::constants;
use crate::util::error::ParseError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::Arc;

// =============================================================================
// File kind
// =============================================================================

/// Content category of a registered file, derived from its extension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    /// Plain text log content (`txt`, `log`). The only kind scanned by queries.
    Plain,
    /// ZIP archive.
    ArchiveZip,
    /// RAR archive.
    ArchiveRar,
    /// Anything else.
    Other,
}

impl FileKind {
    /// Classify a lowercased file type (extension without the dot).
    pub fn from_file_type(file_type: &str) -> Self {
        let lower = file_type.to_ascii_lowercase();
        if constants::PLAIN_TEXT_TYPES.contains(&lower.as_str()) {
            return Self::Plain;
        }
        match lower.as_str() {
            "zip" => Self::ArchiveZip,
            "rar" => Self::ArchiveRar,
            _ => Self::Other,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, Self::ArchiveZip | Self::ArchiveRar)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Plain => "plain",
            Self::ArchiveZip => "archive-zip",
            Self::ArchiveRar => "archive-rar",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

// =============================================================================
// Stored file (registry entry)
// =============================================================================

/// A registered, on-disk artifact. One per top-level upload.
///
/// Immutable once appended to the registry; shared as `Arc<StoredFile>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredFile {
    /// Unique, monotonically assigned ID (starts at 1).
    pub id: u64,

    /// Sanitised filename as stored.
    pub name: String,

    /// Location in the content store.
    pub path: PathBuf,

    /// Lowercased extension of `name` (e.g. "txt", "zip").
    pub file_type: String,

    /// Ingestion instant (UTC).
    pub ingested_at: DateTime<Utc>,
}

impl StoredFile {
    pub fn kind(&self) -> FileKind {
        FileKind::from_file_type(&self.file_type)
    }
}

/// Registry input: everything except the ID, which the registry assigns.
#[derive(Debug, Clone)]
pub struct NewStoredFile {
    pub name: String,
    pub path: PathBuf,
    pub file_type: String,
    pub ingested_at: DateTime<Utc>,
}

impl NewStoredFile {
    /// Describe a file ingested right now; `file_type` is taken from the
    /// extension of `name`.
    pub fn now(name: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        let name = name.into();
        let file_type = file_type_of(&name);
        Self {
            name,
            path: path.into(),
            file_type,
            ingested_at: Utc::now(),
        }
    }

    /// Override the ingestion instant.
    pub fn ingested_at(mut self, at: DateTime<Utc>) -> Self {
        self.ingested_at = at;
        self
    }
}

/// Lowercased text after the last `.` of `name`, or empty when there is none.
pub fn file_type_of(name: &str) -> String {
    name.rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .unwrap_or_default()
}

// =============================================================================
// Log line (ephemeral query output)
// =============================================================================

/// A single log line produced by streaming a stored file.
///
/// Never persisted; recomputed on every query.
#[derive(Debug, Clone, PartialEq)]
pub struct LogLine {
    /// Leading timestamp for structured lines; `None` for unstructured ones.
    pub timestamp: Option<DateTime<Utc>>,

    /// Message after the timestamp, or the trimmed raw line when unstructured.
    pub message: String,

    /// 1-based line number in the source file.
    pub line_number: u64,

    /// Registry entry the line was read from.
    pub source: Arc<StoredFile>,
}

impl LogLine {
    pub fn is_structured(&self) -> bool {
        self.timestamp.is_some()
    }
}

// =============================================================================
// Scan diagnostics (tolerant reader side channel)
// =============================================================================

/// A file that contributed nothing because it could not be opened.
#[derive(Debug)]
pub struct SkippedFile {
    pub file_id: u64,
    pub path: PathBuf,
    pub error: ParseError,
}

/// Per-file diagnostics collected while streaming lines.
#[derive(Debug, Default)]
pub struct FileDiagnostics {
    /// Lines read from the file (matched or not).
    pub lines_read: u64,

    /// Lines that contained invalid UTF-8 and were decoded lossily.
    pub lossy_lines: u64,

    /// Dropped lines and mid-file read failures (capped).
    pub errors: Vec<ParseError>,

    /// Errors beyond the cap, counted but not kept.
    pub suppressed_errors: u64,
}

/// Aggregate diagnostics for one query across all candidate files.
#[derive(Debug, Default)]
pub struct ScanDiagnostics {
    pub files_scanned: usize,
    pub lines_read: u64,
    pub lossy_lines: u64,
    pub skipped_files: Vec<SkippedFile>,
    pub skipped_lines: Vec<ParseError>,
    pub suppressed_errors: u64,
}

impl ScanDiagnostics {
    /// Fold one file's diagnostics into the aggregate, honouring `max_errors`.
    pub fn absorb(&mut self, file: FileDiagnostics, max_errors: usize) {
        self.files_scanned += 1;
        self.lines_read += file.lines_read;
        self.lossy_lines += file.lossy_lines;
        self.suppressed_errors += file.suppressed_errors;
        for err in file.errors {
            if self.skipped_lines.len() < max_errors {
                self.skipped_lines.push(err);
            } else {
                self.suppressed_errors += 1;
            }
        }
    }

    pub fn is_clean(&self) -> bool {
        self.skipped_files.is_empty()
            && self.skipped_lines.is_empty()
            && self.lossy_lines == 0
            && self.suppressed_errors == 0
    }
}

// =============================================================================
// Output records (shared by the HTTP surface and the CLI)
// =============================================================================

/// JSON shape of a registry entry in `/files` responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FileRecord {
    pub id: u64,
    pub filename: String,
    pub file_path: String,
    pub uploaded_at: String,
}

impl From<&StoredFile> for FileRecord {
    fn from(file: &StoredFile) -> Self {
        Self {
            id: file.id,
            filename: file.name.clone(),
            file_path: file.path.display().to_string(),
            uploaded_at: file
                .ingested_at
                .format(constants::REGISTRY_TIMESTAMP_FORMAT)
                .to_string(),
        }
    }
}

/// JSON shape of a log line in `/logs` responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogRecord {
    pub timestamp: String,
    pub message: String,
    pub filename: String,
}

impl From<&LogLine> for LogRecord {
    fn from(line: &LogLine) -> Self {
        Self {
            timestamp: line.timestamp.map_or_else(
                || constants::MISSING_TIMESTAMP.to_string(),
                |ts| ts.format(constants::LINE_TIMESTAMP_FORMAT).to_string(),
            ),
            message: line.message.clone(),
            filename: line.source.name.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn stored(name: &str) -> StoredFile {
        StoredFile {
            id: 7,
            name: name.to_string(),
            path: PathBuf::from("uploads").join(name),
            file_type: file_type_of(name),
            ingested_at: Utc.with_ymd_and_hms(2024, 3, 16, 8, 5, 9).unwrap(),
        }
    }

    #[test]
    fn test_file_kind_from_type() {
        assert_eq!(FileKind::from_file_type("txt"), FileKind::Plain);
        assert_eq!(FileKind::from_file_type("LOG"), FileKind::Plain);
        assert_eq!(FileKind::from_file_type("zip"), FileKind::ArchiveZip);
        assert_eq!(FileKind::from_file_type("rar"), FileKind::ArchiveRar);
        assert_eq!(FileKind::from_file_type("exe"), FileKind::Other);
        assert_eq!(FileKind::from_file_type(""), FileKind::Other);
    }

    #[test]
    fn test_file_type_of_uses_last_extension() {
        assert_eq!(file_type_of("app.2024.TXT"), "txt");
        assert_eq!(file_type_of("bundle.tar.zip"), "zip");
        assert_eq!(file_type_of("README"), "");
    }

    #[test]
    fn test_file_record_shape() {
        let record = FileRecord::from(&stored("app.txt"));
        assert_eq!(record.id, 7);
        assert_eq!(record.filename, "app.txt");
        assert_eq!(record.uploaded_at, "2024-03-16 08:05:09");
    }

    #[test]
    fn test_log_record_unstructured_uses_placeholder() {
        let line = LogLine {
            timestamp: None,
            message: "something went wrong".to_string(),
            line_number: 3,
            source: Arc::new(stored("app.txt")),
        };
        let record = LogRecord::from(&line);
        assert_eq!(record.timestamp, "N/A");
        assert_eq!(record.filename, "app.txt");
    }

    #[test]
    fn test_log_record_structured_formats_timestamp() {
        let line = LogLine {
            timestamp: Some(Utc.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap()),
            message: "boot ok".to_string(),
            line_number: 1,
            source: Arc::new(stored("app.txt")),
        };
        assert_eq!(LogRecord::from(&line).timestamp, "2024-03-16 10:00:00");
    }

    #[test]
    fn test_diagnostics_absorb_caps_errors() {
        let mut agg = ScanDiagnostics::default();
        let file = FileDiagnostics {
            lines_read: 10,
            lossy_lines: 1,
            errors: vec![
                ParseError::TimestampParse {
                    file: PathBuf::from("a.txt"),
                    line_number: 1,
                    raw_timestamp: "2024-13-01 00:00:00".to_string(),
                    format: constants::LINE_TIMESTAMP_FORMAT,
                },
                ParseError::TimestampParse {
                    file: PathBuf::from("a.txt"),
                    line_number: 2,
                    raw_timestamp: "2024-02-30 00:00:00".to_string(),
                    format: constants::LINE_TIMESTAMP_FORMAT,
                },
            ],
            suppressed_errors: 0,
        };
        agg.absorb(file, 1);
        assert_eq!(agg.files_scanned, 1);
        assert_eq!(agg.lines_read, 10);
        assert_eq!(agg.skipped_lines.len(), 1);
        assert_eq!(agg.suppressed_errors, 1);
        assert!(!agg.is_clean());
    }
}
