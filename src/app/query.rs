// LogDepot - app/query.rs
//
// Query evaluation: registry lookup, per-file streaming, merge.
//
//   1. Candidates are the registry entries matching the query's file filter
//      whose kind is plain text. Archives are never scanned, even when one of
//      their extracted members would match.
//   2. Each candidate is opened with its own handle and streamed through the
//      shared `LogLineParser`. Files are scanned in parallel on the rayon
//      pool; results are concatenated in candidate order, then line order.
//   3. A file that cannot be opened contributes zero lines and is reported
//      in `ScanDiagnostics::skipped_files`. The query itself never fails
//      once its parameters are valid.

use crate::app::registry::CorpusRegistry;
use crate::core::filter::{LogQuery, LogQueryParams};
use crate::core::model::{
    FileDiagnostics, FileKind, LogLine, LogRecord, ScanDiagnostics, SkippedFile, StoredFile,
};
use crate::core::parser::LogLineParser;
use crate::platform::fs::open_with_retry;
use crate::util::constants;
use crate::util::error::{ParseError, QueryError};
use rayon::prelude::*;
use std::sync::Arc;
use std::time::Instant;

/// Result of one query: matching lines plus the tolerant reader's report.
#[derive(Debug, Default)]
pub struct QueryOutcome {
    pub lines: Vec<LogLine>,
    pub diagnostics: ScanDiagnostics,
}

impl QueryOutcome {
    /// Output records in result order.
    pub fn records(&self) -> Vec<LogRecord> {
        self.lines.iter().map(LogRecord::from).collect()
    }
}

/// Outcome of scanning a single candidate file.
enum FileScan {
    Scanned {
        lines: Vec<LogLine>,
        diagnostics: FileDiagnostics,
    },
    Skipped(SkippedFile),
}

/// Answers log queries over the files in a `CorpusRegistry`.
pub struct QueryEngine<'a> {
    registry: &'a CorpusRegistry,
    parser: &'a LogLineParser,
    max_total_errors: usize,
}

impl<'a> QueryEngine<'a> {
    pub fn new(registry: &'a CorpusRegistry, parser: &'a LogLineParser) -> Self {
        Self {
            registry,
            parser,
            max_total_errors: constants::MAX_TOTAL_PARSE_ERRORS,
        }
    }

    /// Validate raw parameters, then run the query.
    pub fn run_params(&self, params: &LogQueryParams) -> Result<QueryOutcome, QueryError> {
        let query = LogQuery::from_params(params)?;
        Ok(self.run(&query))
    }

    /// Files that `query` will scan, in registration order.
    pub fn candidates(&self, query: &LogQuery) -> Vec<Arc<StoredFile>> {
        self.registry
            .find(&query.files)
            .into_iter()
            .filter(|f| f.kind() == FileKind::Plain)
            .collect()
    }

    /// Evaluate an already validated query.
    pub fn run(&self, query: &LogQuery) -> QueryOutcome {
        let started = Instant::now();
        let candidates = self.candidates(query);

        tracing::debug!(
            candidates = candidates.len(),
            window = query.window.is_some(),
            keyword = query.keyword.is_some(),
            "Query started"
        );

        // `collect` on an indexed parallel iterator preserves input order.
        let scans: Vec<FileScan> = candidates
            .par_iter()
            .map(|file| self.scan_file(file, query))
            .collect();

        let mut outcome = QueryOutcome::default();
        for scan in scans {
            match scan {
                FileScan::Scanned { lines, diagnostics } => {
                    outcome.lines.extend(lines);
                    outcome
                        .diagnostics
                        .absorb(diagnostics, self.max_total_errors);
                }
                FileScan::Skipped(skipped) => {
                    tracing::warn!(
                        file_id = skipped.file_id,
                        file = %skipped.path.display(),
                        error = %skipped.error,
                        "Skipping unreadable log file"
                    );
                    outcome.diagnostics.skipped_files.push(skipped);
                }
            }
        }

        let diag = &outcome.diagnostics;
        if !diag.skipped_lines.is_empty() || diag.suppressed_errors > 0 {
            tracing::warn!(
                skipped_lines = diag.skipped_lines.len(),
                suppressed = diag.suppressed_errors,
                "Some log lines could not be parsed"
            );
        }
        tracing::info!(
            files = diag.files_scanned,
            skipped_files = diag.skipped_files.len(),
            lines_read = diag.lines_read,
            matched = outcome.lines.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Query complete"
        );

        outcome
    }

    fn scan_file(&self, file: &Arc<StoredFile>, query: &LogQuery) -> FileScan {
        let reader = match open_with_retry(&file.path) {
            Ok(r) => r,
            Err(source) => {
                return FileScan::Skipped(SkippedFile {
                    file_id: file.id,
                    path: file.path.clone(),
                    error: ParseError::Io {
                        file: file.path.clone(),
                        source,
                    },
                })
            }
        };

        let mut stream = self
            .parser
            .parse_reader(reader, Arc::clone(file), query.keyword.clone());

        // Unstructured lines only come out of the parser when the keyword
        // already matched them; the window does not apply to them.
        let lines: Vec<LogLine> = stream
            .by_ref()
            .filter(|line| match line.timestamp {
                Some(ts) => query.accepts_structured(ts, &line.message),
                None => true,
            })
            .collect();

        tracing::trace!(
            file = %file.path.display(),
            matched = lines.len(),
            "File scanned"
        );

        FileScan::Scanned {
            lines,
            diagnostics: stream.into_diagnostics(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::model::NewStoredFile;
    use crate::platform::store::ContentStore;
    use tempfile::TempDir;

    const APP_LOG: &str = "\
2024-03-11 08:00:00 old entry
2024-03-16 10:00:00 boot ok
something went wrong
2024-03-17 12:30:00 Disk WRONG size
";

    struct Fixture {
        _dir: TempDir,
        store: ContentStore,
        registry: CorpusRegistry,
        parser: LogLineParser,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let store = ContentStore::open(dir.path().join("uploads")).unwrap();
            Self {
                _dir: dir,
                store,
                registry: CorpusRegistry::in_memory(),
                parser: LogLineParser::default(),
            }
        }

        fn add(&self, name: &str, content: &str) {
            let path = self.store.save(name, content.as_bytes()).unwrap();
            self.registry.append(NewStoredFile::now(name, path)).unwrap();
        }

        fn query(&self, start: &str, end: &str, keyword: &str) -> QueryOutcome {
            let params = LogQueryParams {
                start_date: Some(start.to_string()),
                end_date: Some(end.to_string()),
                keyword: Some(keyword.to_string()),
                ..Default::default()
            };
            QueryEngine::new(&self.registry, &self.parser)
                .run_params(&params)
                .unwrap()
        }
    }

    fn messages(outcome: &QueryOutcome) -> Vec<&str> {
        outcome.lines.iter().map(|l| l.message.as_str()).collect()
    }

    #[test]
    fn test_window_selects_structured_lines() {
        let fx = Fixture::new();
        fx.add("app.txt", APP_LOG);
        let outcome = fx.query("2024-03-15", "2024-03-18", "");
        assert_eq!(messages(&outcome), vec!["boot ok", "Disk WRONG size"]);
        assert!(outcome.diagnostics.is_clean());
    }

    #[test]
    fn test_unstructured_lines_need_keyword() {
        let fx = Fixture::new();
        fx.add("app.txt", APP_LOG);

        let without = fx.query("", "", "");
        assert!(!messages(&without).contains(&"something went wrong"));

        let with = fx.query("", "", "wrong");
        assert_eq!(
            messages(&with),
            vec!["something went wrong", "Disk WRONG size"]
        );
        let records = with.records();
        assert_eq!(records[0].timestamp, "N/A");
        assert_eq!(records[1].timestamp, "2024-03-17 12:30:00");
    }

    #[test]
    fn test_inverted_window_empties_structured_results_only() {
        let fx = Fixture::new();
        fx.add("app.txt", APP_LOG);
        let outcome = fx.query("2024-03-18", "2024-03-15", "wrong");
        assert_eq!(messages(&outcome), vec!["something went wrong"]);
        assert!(outcome.lines.iter().all(|l| !l.is_structured()));
    }

    #[test]
    fn test_archives_and_other_kinds_are_not_scanned() {
        let fx = Fixture::new();
        fx.add("app.txt", APP_LOG);
        fx.add("bundle.zip", "2024-03-16 10:00:00 inside zip bytes");
        fx.add("logs.rar", "2024-03-16 10:00:00 inside rar bytes");
        fx.add("service.log", "2024-03-16 11:00:00 from .log file\n");

        let outcome = fx.query("", "", "");
        assert_eq!(outcome.diagnostics.files_scanned, 2);
        assert!(outcome
            .lines
            .iter()
            .all(|l| l.source.kind() == FileKind::Plain));
        assert!(messages(&outcome).contains(&"from .log file"));
    }

    #[test]
    fn test_results_follow_registration_order() {
        let fx = Fixture::new();
        fx.add("b.txt", "2024-03-16 10:00:00 from b\n");
        fx.add("a.txt", "2024-03-15 10:00:00 from a\n");
        let outcome = fx.query("", "", "");
        assert_eq!(messages(&outcome), vec!["from b", "from a"]);
    }

    #[test]
    fn test_file_filter_narrows_candidates() {
        let fx = Fixture::new();
        fx.add("web.txt", "2024-03-16 10:00:00 web up\n");
        fx.add("db.txt", "2024-03-16 10:00:00 db up\n");
        let params = LogQueryParams {
            filename: Some("WEB".to_string()),
            ..Default::default()
        };
        let outcome = QueryEngine::new(&fx.registry, &fx.parser)
            .run_params(&params)
            .unwrap();
        assert_eq!(messages(&outcome), vec!["web up"]);
    }

    #[test]
    fn test_missing_file_is_skipped_not_fatal() {
        let fx = Fixture::new();
        fx.add("gone.txt", "2024-03-16 10:00:00 never read\n");
        fx.add("app.txt", APP_LOG);
        std::fs::remove_file(fx.store.path_for("gone.txt")).unwrap();

        let outcome = fx.query("", "", "");
        assert_eq!(outcome.diagnostics.skipped_files.len(), 1);
        assert_eq!(outcome.diagnostics.skipped_files[0].file_id, 1);
        assert_eq!(outcome.lines.len(), 3);
    }

    #[test]
    fn test_bad_timestamp_drops_line_and_is_reported() {
        let fx = Fixture::new();
        fx.add(
            "app.txt",
            "2024-13-01 00:00:00 impossible month\n2024-03-16 10:00:00 fine\n",
        );
        let outcome = fx.query("", "", "");
        assert_eq!(messages(&outcome), vec!["fine"]);
        assert_eq!(outcome.diagnostics.skipped_lines.len(), 1);
    }

    #[test]
    fn test_repeated_queries_are_identical() {
        let fx = Fixture::new();
        fx.add("app.txt", APP_LOG);
        let first = fx.query("2024-03-01", "2024-03-31", "");
        let second = fx.query("2024-03-01", "2024-03-31", "");
        assert_eq!(first.lines, second.lines);
    }

    #[test]
    fn test_invalid_window_aborts_query() {
        let fx = Fixture::new();
        fx.add("app.txt", APP_LOG);
        let params = LogQueryParams {
            start_date: Some("2024-03-15".to_string()),
            end_date: Some("tomorrow".to_string()),
            ..Default::default()
        };
        let err = QueryEngine::new(&fx.registry, &fx.parser)
            .run_params(&params)
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid date format. Use YYYY-MM-DD");
    }
}
