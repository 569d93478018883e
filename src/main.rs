// LogDepot - main.rs
//
// Application entry point. Handles:
// 1. CLI argument parsing
// 2. config.toml loading and environment overrides
// 3. Logging initialisation (debug mode support)
// 4. Dispatch to the HTTP service or a local operator command

use clap::{Parser, Subcommand};
use logdepot::app::context::AppContext;
use logdepot::app::ingest::ingest;
use logdepot::core::filter::{FileFilter, LogQueryParams};
use logdepot::core::model::FileRecord;
use logdepot::platform::config::{self, AppConfig, PlatformPaths};
use logdepot::server;
use logdepot::util::constants;
use logdepot::util::error::{ConfigError, LogDepotError};
use logdepot::util::logging;
use serde::Serialize;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// LogDepot - log archive ingestion and search service.
///
/// Upload plain-text logs or zip/rar archives, then search the collected
/// lines by date range and keyword.
#[derive(Parser, Debug)]
#[command(name = "logdepot", version, about)]
struct Cli {
    /// Path to config.toml (defaults to the platform config directory).
    #[arg(short = 'c', long = "config", global = true)]
    config: Option<PathBuf>,

    /// Data directory (content store, registry, users).
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    /// Enable debug logging (equivalent to RUST_LOG=debug).
    #[arg(short = 'd', long = "debug", global = true)]
    debug: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service.
    Serve {
        /// Listen address, e.g. 0.0.0.0:5000.
        #[arg(short = 'b', long = "bind")]
        bind: Option<String>,
    },

    /// Ingest local files exactly as if they had been uploaded.
    Ingest {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// List registered files as JSON.
    Files {
        #[arg(long)]
        filename: Option<String>,
        #[arg(long = "file-type")]
        file_type: Option<String>,
        /// Ingestion date (YYYY-MM-DD, UTC).
        #[arg(long)]
        date: Option<String>,
    },

    /// Search log lines.
    Logs {
        /// Window start (YYYY-MM-DD); only used together with --end-date.
        #[arg(long = "start-date")]
        start_date: Option<String>,
        /// Window end (YYYY-MM-DD); only used together with --start-date.
        #[arg(long = "end-date")]
        end_date: Option<String>,
        #[arg(short = 'k', long)]
        keyword: Option<String>,
        #[arg(long)]
        filename: Option<String>,
        #[arg(long = "file-type")]
        file_type: Option<String>,
        #[arg(long)]
        date: Option<String>,
        /// Print JSON records instead of text lines.
        #[arg(long)]
        json: bool,
    },
}

fn main() {
    let cli = Cli::parse();

    let paths = PlatformPaths::resolve();
    let config_path = cli.config.clone().unwrap_or_else(|| paths.config_file());
    let (mut config, mut warnings) = config::load_config(&config_path);
    config::apply_secret_override(
        &mut config,
        std::env::var(constants::JWT_SECRET_ENV).ok(),
        &mut warnings,
    );

    logging::init(cli.debug, config.log_level.as_deref());

    tracing::info!(
        version = constants::APP_VERSION,
        debug = cli.debug,
        config = %config_path.display(),
        "LogDepot starting"
    );
    for warning in &warnings {
        tracing::warn!(warning = %warning, "Config warning");
    }

    if let Err(e) = run(cli, config, paths) {
        tracing::error!(error = %e, "LogDepot failed");
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run(cli: Cli, config: AppConfig, paths: PlatformPaths) -> Result<(), LogDepotError> {
    configure_worker_pool(config.worker_threads);

    // Data directory: CLI override > config > platform default
    let data_dir = cli
        .data_dir
        .or_else(|| config.data_dir.clone())
        .unwrap_or(paths.data_dir);

    match cli.command {
        Command::Serve { bind } => {
            let bind = bind.unwrap_or_else(|| config.bind.clone());
            let addr: SocketAddr = bind.parse().map_err(|_| {
                LogDepotError::Config(ConfigError::ValueOutOfRange {
                    field: "bind".to_string(),
                    value: bind.clone(),
                    expected: "a socket address such as 127.0.0.1:5000".to_string(),
                })
            })?;

            let ctx = Arc::new(AppContext::open(&data_dir, config)?);
            let runtime = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .map_err(|source| LogDepotError::Io {
                    path: data_dir.clone(),
                    operation: "start async runtime for",
                    source,
                })?;
            runtime.block_on(server::serve(ctx, addr))
        }

        Command::Ingest { files } => {
            let ctx = AppContext::open(&data_dir, config)?;
            ingest_local(&ctx, &files)
        }

        Command::Files {
            filename,
            file_type,
            date,
        } => {
            let ctx = AppContext::open(&data_dir, config)?;
            let filter =
                FileFilter::from_params(filename.as_deref(), file_type.as_deref(), date.as_deref())?;
            let records: Vec<FileRecord> = ctx
                .registry
                .find(&filter)
                .iter()
                .map(|f| FileRecord::from(f.as_ref()))
                .collect();
            print_json(&records)
        }

        Command::Logs {
            start_date,
            end_date,
            keyword,
            filename,
            file_type,
            date,
            json,
        } => {
            let ctx = AppContext::open(&data_dir, config)?;
            let params = LogQueryParams {
                start_date,
                end_date,
                keyword,
                filename,
                file_type,
                date,
            };
            let outcome = ctx.query_engine().run_params(&params)?;
            let records = outcome.records();

            if json {
                print_json(&records)?;
            } else {
                for r in &records {
                    println!("{}  [{}]  {}", r.timestamp, r.filename, r.message);
                }
            }

            let diag = &outcome.diagnostics;
            if !diag.is_clean() {
                eprintln!(
                    "note: {} file(s) skipped, {} line(s) dropped, {} line(s) decoded lossily",
                    diag.skipped_files.len(),
                    diag.skipped_lines.len() as u64 + diag.suppressed_errors,
                    diag.lossy_lines,
                );
            }
            Ok(())
        }
    }
}

/// Ingest each local file; keeps going after a failure and reports the
/// first one at the end.
fn ingest_local(ctx: &AppContext, files: &[PathBuf]) -> Result<(), LogDepotError> {
    let mut first_error: Option<LogDepotError> = None;

    for path in files {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();

        let result = std::fs::read(path)
            .map_err(|source| LogDepotError::Io {
                path: path.clone(),
                operation: "read",
                source,
            })
            .and_then(|bytes| ingest(ctx, name, &bytes).map_err(LogDepotError::from));

        match result {
            Ok(report) => {
                println!("{}", report.message());
                if let Some(e) = report.extraction_error() {
                    eprintln!("  warning: archive not expanded: {e}");
                } else if !report.extracted().is_empty() {
                    println!("  extracted {} member(s)", report.extracted().len());
                }
            }
            Err(e) => {
                eprintln!("{}: {e}", path.display());
                first_error.get_or_insert(e);
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), LogDepotError> {
    let stdout = std::io::stdout();
    serde_json::to_writer_pretty(stdout.lock(), value).map_err(|e| LogDepotError::Io {
        path: Path::new("<stdout>").to_path_buf(),
        operation: "write",
        source: e.into(),
    })?;
    println!();
    Ok(())
}

/// Size the global rayon pool used for parallel file scans. 0 = one thread
/// per core.
fn configure_worker_pool(threads: usize) {
    if threads == 0 {
        return;
    }
    match rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
    {
        Ok(()) => tracing::debug!(threads, "Query worker pool configured"),
        Err(e) => tracing::warn!(error = %e, "Cannot configure query worker pool; using defaults"),
    }
}
