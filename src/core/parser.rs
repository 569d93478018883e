// LogDepot - core/parser.rs
//
// Tolerant, stream-oriented log line parsing.
// Core layer: accepts `BufRead` implementors, never touches the filesystem.
//
// Every line is classified as *structured* (exact `YYYY-MM-DD HH:MM:SS`
// prefix followed by a space and a message) or *unstructured*. Structured
// lines are always yielded; unstructured lines are only yielded when a
// keyword is active and occurs in the raw line.
//
// Bytes are decoded lossily, so invalid UTF-8 never fails a file. Dropped
// lines and read failures are recorded in `FileDiagnostics` rather than
// printed.

use crate::core::filter::Keyword;
use crate::core::model::{FileDiagnostics, LogLine, StoredFile};
use crate::util::constants;
use crate::util::error::ParseError;
use crate::util::logging::preview;
use chrono::{DateTime, NaiveDateTime, Timelike, Utc};
use regex::Regex;
use std::borrow::Cow;
use std::io::BufRead;
use std::sync::{Arc, OnceLock};

/// The single compiled structured-line pattern, shared by all parsers.
fn line_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // Literal pattern; covered by the unit tests below.
        Regex::new(r"^([0-9]{4}-[0-9]{2}-[0-9]{2} [0-9]{2}:[0-9]{2}:[0-9]{2}) (.+)$")
            .expect("line_pattern: invalid regex")
    })
}

/// Classification of a single decoded line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape<'a> {
    Structured {
        raw_timestamp: &'a str,
        message: &'a str,
    },
    Unstructured,
}

/// Classify `line` (without its line terminator).
pub fn classify(line: &str) -> LineShape<'_> {
    match line_pattern().captures(line) {
        Some(caps) => match (caps.get(1), caps.get(2)) {
            (Some(ts), Some(msg)) => LineShape::Structured {
                raw_timestamp: ts.as_str(),
                message: msg.as_str(),
            },
            _ => LineShape::Unstructured,
        },
        None => LineShape::Unstructured,
    }
}

/// Parse a structured-line timestamp as a UTC instant.
///
/// Seconds run 00-59. chrono accepts `:60` as a leap second; such lines are
/// treated like any other impossible timestamp.
pub fn parse_line_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(raw, constants::LINE_TIMESTAMP_FORMAT)
        .ok()
        .filter(|ndt| ndt.nanosecond() < 1_000_000_000)
        .map(|ndt| ndt.and_utc())
}

/// Configuration for parsing operations.
#[derive(Debug, Clone)]
pub struct ParseConfig {
    /// Per-file cap on recorded diagnostics.
    pub max_parse_errors_per_file: usize,
}

impl Default for ParseConfig {
    fn default() -> Self {
        Self {
            max_parse_errors_per_file: constants::MAX_PARSE_ERRORS_PER_FILE,
        }
    }
}

/// Entry point for turning a byte stream into `LogLine`s.
///
/// Stateless apart from its configuration; safe to share across threads.
#[derive(Debug, Clone, Default)]
pub struct LogLineParser {
    config: ParseConfig,
}

impl LogLineParser {
    pub fn new(config: ParseConfig) -> Self {
        Self { config }
    }

    /// Stream `reader` as log lines attributed to `source`.
    ///
    /// The returned iterator is lazy and finite. Each call starts a fresh
    /// sequence over whatever `reader` yields; callers re-open the file to
    /// restart.
    pub fn parse_reader<R: BufRead>(
        &self,
        reader: R,
        source: Arc<StoredFile>,
        keyword: Option<Keyword>,
    ) -> LogLines<R> {
        LogLines {
            reader,
            source,
            keyword,
            max_errors: self.config.max_parse_errors_per_file,
            buf: Vec::new(),
            line_number: 0,
            finished: false,
            diagnostics: FileDiagnostics::default(),
        }
    }
}

/// Lazy iterator of log lines from one stream.
///
/// Call `into_diagnostics` after iteration to collect the side channel.
#[derive(Debug)]
pub struct LogLines<R> {
    reader: R,
    source: Arc<StoredFile>,
    keyword: Option<Keyword>,
    max_errors: usize,
    buf: Vec<u8>,
    line_number: u64,
    finished: bool,
    diagnostics: FileDiagnostics,
}

impl<R> LogLines<R> {
    pub fn into_diagnostics(self) -> FileDiagnostics {
        self.diagnostics
    }

    fn record(&mut self, err: ParseError) {
        if self.diagnostics.errors.len() < self.max_errors {
            self.diagnostics.errors.push(err);
        } else {
            self.diagnostics.suppressed_errors += 1;
        }
    }
}

/// Strip one trailing `\n` or `\r\n`.
fn strip_terminator(bytes: &[u8]) -> &[u8] {
    let bytes = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    bytes.strip_suffix(b"\r").unwrap_or(bytes)
}

impl<R: BufRead> Iterator for LogLines<R> {
    type Item = LogLine;

    fn next(&mut self) -> Option<LogLine> {
        while !self.finished {
            self.buf.clear();
            match self.reader.read_until(b'\n', &mut self.buf) {
                Ok(0) => {
                    self.finished = true;
                }
                Ok(_) => {
                    self.line_number += 1;
                    self.diagnostics.lines_read += 1;

                    let decoded = String::from_utf8_lossy(strip_terminator(&self.buf));
                    if let Cow::Owned(_) = decoded {
                        self.diagnostics.lossy_lines += 1;
                    }
                    let line = decoded.into_owned();

                    if let Some(entry) = self.emit(&line) {
                        return Some(entry);
                    }
                }
                Err(e) if e.kind() == std::io::ErrorKind::Interrupted => {}
                Err(e) => {
                    tracing::warn!(
                        file = %self.source.path.display(),
                        line = self.line_number + 1,
                        error = %e,
                        "Read failed mid-file; keeping lines read so far"
                    );
                    let err = ParseError::Io {
                        file: self.source.path.clone(),
                        source: e,
                    };
                    self.record(err);
                    self.finished = true;
                }
            }
        }
        None
    }
}

impl<R> LogLines<R> {
    /// Apply the classification rules to one decoded line.
    fn emit(&mut self, line: &str) -> Option<LogLine> {
        match classify(line) {
            LineShape::Structured {
                raw_timestamp,
                message,
            } => match parse_line_timestamp(raw_timestamp) {
                Some(ts) => Some(LogLine {
                    timestamp: Some(ts),
                    message: message.to_string(),
                    line_number: self.line_number,
                    source: Arc::clone(&self.source),
                }),
                None => {
                    tracing::trace!(
                        file = %self.source.path.display(),
                        line = self.line_number,
                        text = preview(line),
                        "Dropping line with impossible timestamp"
                    );
                    let err = ParseError::TimestampParse {
                        file: self.source.path.clone(),
                        line_number: self.line_number,
                        raw_timestamp: raw_timestamp.to_string(),
                        format: constants::LINE_TIMESTAMP_FORMAT,
                    };
                    self.record(err);
                    None
                }
            },
            LineShape::Unstructured => {
                let keyword = self.keyword.as_ref()?;
                if !keyword.occurs_in(line) {
                    return None;
                }
                Some(LogLine {
                    timestamp: None,
                    message: line.trim().to_string(),
                    line_number: self.line_number,
                    source: Arc::clone(&self.source),
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::io::Cursor;
    use std::path::PathBuf;

    fn source() -> Arc<StoredFile> {
        Arc::new(StoredFile {
            id: 1,
            name: "app.txt".to_string(),
            path: PathBuf::from("uploads/app.txt"),
            file_type: "txt".to_string(),
            ingested_at: Utc.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap(),
        })
    }

    fn parse(content: &[u8], keyword: Option<&str>) -> (Vec<LogLine>, FileDiagnostics) {
        let parser = LogLineParser::default();
        let mut lines = parser.parse_reader(
            Cursor::new(content.to_vec()),
            source(),
            keyword.and_then(Keyword::new),
        );
        let collected: Vec<_> = lines.by_ref().collect();
        (collected, lines.into_diagnostics())
    }

    #[test]
    fn test_classify_structured_line() {
        assert_eq!(
            classify("2024-03-16 10:00:00 boot ok"),
            LineShape::Structured {
                raw_timestamp: "2024-03-16 10:00:00",
                message: "boot ok",
            }
        );
    }

    #[test]
    fn test_classify_rejects_variants() {
        // ISO 'T' separator, missing seconds, and missing message are all
        // outside the exact format.
        assert_eq!(classify("2024-03-16T10:00:00 boot"), LineShape::Unstructured);
        assert_eq!(classify("2024-03-16 10:00 boot"), LineShape::Unstructured);
        assert_eq!(classify("2024-03-16 10:00:00 "), LineShape::Unstructured);
        assert_eq!(classify("2024-03-16 10:00:00"), LineShape::Unstructured);
        assert_eq!(classify(" 2024-03-16 10:00:00 x"), LineShape::Unstructured);
        // Non-ASCII digits never count as a timestamp.
        assert_eq!(
            classify("٢٠٢٤-03-16 10:00:00 boot"),
            LineShape::Unstructured
        );
    }

    #[test]
    fn test_structured_lines_always_emitted() {
        let (lines, diag) = parse(
            b"2024-03-16 10:00:00 boot ok\n2024-03-11 09:00:00 disk check\n",
            None,
        );
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].message, "boot ok");
        assert_eq!(
            lines[0].timestamp,
            Some(Utc.with_ymd_and_hms(2024, 3, 16, 10, 0, 0).unwrap())
        );
        assert_eq!(lines[1].line_number, 2);
        assert!(diag.errors.is_empty());
        assert_eq!(diag.lines_read, 2);
    }

    #[test]
    fn test_unstructured_dropped_without_keyword() {
        let (lines, _) = parse(b"something went wrong\n", None);
        assert!(lines.is_empty());
    }

    #[test]
    fn test_unstructured_emitted_on_keyword_match() {
        let (lines, _) = parse(b"  something went WRONG  \nall fine\n", Some("wrong"));
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "something went WRONG");
        assert!(lines[0].timestamp.is_none());
        assert_eq!(lines[0].line_number, 1);
    }

    #[test]
    fn test_crlf_terminators_are_stripped() {
        let (lines, _) = parse(b"2024-03-16 10:00:00 boot ok\r\nnext\r\n", None);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "boot ok");
    }

    #[test]
    fn test_last_line_without_newline() {
        let (lines, _) = parse(b"2024-03-16 10:00:00 tail line", None);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "tail line");
    }

    #[test]
    fn test_impossible_timestamp_fails_only_the_line() {
        let (lines, diag) = parse(
            b"2024-13-40 10:00:00 bogus\n2024-03-16 10:00:00 boot ok\n",
            None,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "boot ok");
        assert_eq!(diag.errors.len(), 1);
        assert!(matches!(
            diag.errors[0],
            ParseError::TimestampParse { line_number: 1, .. }
        ));
    }

    #[test]
    fn test_leap_second_is_an_impossible_timestamp() {
        assert!(parse_line_timestamp("2016-12-31 23:59:60").is_none());
        assert!(parse_line_timestamp("2016-12-31 23:59:59").is_some());

        let (lines, diag) = parse(
            b"2016-12-31 23:59:60 leap\n2017-01-01 00:00:00 new year\n",
            None,
        );
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].message, "new year");
        assert!(matches!(
            diag.errors[0],
            ParseError::TimestampParse { line_number: 1, .. }
        ));
    }

    #[test]
    fn test_invalid_utf8_is_decoded_lossily() {
        let mut content = b"2024-03-16 10:00:00 bad \xff\xfe byte\n".to_vec();
        content.extend_from_slice(b"2024-03-16 10:00:01 clean\n");
        let (lines, diag) = parse(&content, None);
        assert_eq!(lines.len(), 2);
        assert!(lines[0].message.contains('\u{FFFD}'));
        assert_eq!(diag.lossy_lines, 1);
    }

    #[test]
    fn test_empty_input_yields_nothing() {
        let (lines, diag) = parse(b"", Some("x"));
        assert!(lines.is_empty());
        assert_eq!(diag.lines_read, 0);
    }

    #[test]
    fn test_error_cap_counts_suppressed() {
        let parser = LogLineParser::new(ParseConfig {
            max_parse_errors_per_file: 1,
        });
        let content = b"2024-13-01 00:00:00 a\n2024-14-01 00:00:00 b\n".to_vec();
        let mut lines = parser.parse_reader(Cursor::new(content), source(), None);
        assert_eq!(lines.by_ref().count(), 0);
        let diag = lines.into_diagnostics();
        assert_eq!(diag.errors.len(), 1);
        assert_eq!(diag.suppressed_errors, 1);
    }

    /// Reader that fails after yielding its first chunk.
    struct FailingReader {
        served: bool,
    }

    impl std::io::Read for FailingReader {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            if self.served {
                return Err(std::io::Error::other("device gone"));
            }
            self.served = true;
            let data = b"2024-03-16 10:00:00 first\n";
            buf[..data.len()].copy_from_slice(data);
            Ok(data.len())
        }
    }

    #[test]
    fn test_read_failure_keeps_partial_results() {
        let parser = LogLineParser::default();
        let reader = std::io::BufReader::new(FailingReader { served: false });
        let mut lines = parser.parse_reader(reader, source(), None);
        let collected: Vec<_> = lines.by_ref().collect();
        assert_eq!(collected.len(), 1);
        let diag = lines.into_diagnostics();
        assert!(matches!(diag.errors.last(), Some(ParseError::Io { .. })));
    }

    proptest::proptest! {
        /// Re-parsing the same structured-only content yields the same sequence.
        #[test]
        fn prop_structured_parse_is_idempotent(
            entries in proptest::collection::vec(
                (2000u32..2100, 1u32..=12, 1u32..=28, 0u32..24, 0u32..60, 0u32..60, "[a-zA-Z0-9 ]{1,40}"),
                0..40,
            )
        ) {
            let mut content = String::new();
            for (y, mo, d, h, mi, s, msg) in &entries {
                content.push_str(&format!("{y:04}-{mo:02}-{d:02} {h:02}:{mi:02}:{s:02} x{msg}\n"));
            }
            let (first, _) = parse(content.as_bytes(), None);
            let (second, _) = parse(content.as_bytes(), None);
            proptest::prop_assert_eq!(first.len(), entries.len());
            proptest::prop_assert_eq!(first, second);
        }
    }
}
