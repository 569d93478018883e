// LogDepot - util/constants.rs
//
// Single source of truth for all named constants, limits, and defaults.
// Every configurable value has a default and a hard range here.

// =============================================================================
// Application metadata
// =============================================================================

/// Application display name.
pub const APP_NAME: &str = "LogDepot";

/// Application identifier used for config/data directories.
pub const APP_ID: &str = "LogDepot";

/// Current application version.
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

// =============================================================================
// Upload / ingestion
// =============================================================================

/// File extensions accepted by the upload endpoint (compared lowercased).
pub const ALLOWED_EXTENSIONS: &[&str] = &["txt", "zip", "rar"];

/// File types whose content is scanned by log queries.
pub const PLAIN_TEXT_TYPES: &[&str] = &["txt", "log"];

/// Name of the multipart field carrying the uploaded file.
pub const UPLOAD_FIELD_NAME: &str = "file";

/// Default maximum request body size for uploads.
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024; // 64 MB

/// Smallest accepted `max_upload_bytes` setting.
pub const MIN_MAX_UPLOAD_BYTES: usize = 1024;

/// Hard upper bound on `max_upload_bytes` (prevents configuration mistakes).
pub const ABSOLUTE_MAX_UPLOAD_BYTES: usize = 4 * 1024 * 1024 * 1024; // 4 GB

// =============================================================================
// Archive extraction limits
// =============================================================================

/// Archive members larger than this (uncompressed) are skipped.
pub const MAX_ARCHIVE_MEMBER_SIZE: u64 = 512 * 1024 * 1024; // 512 MB

/// Maximum number of members extracted from a single archive.
pub const MAX_ARCHIVE_MEMBERS: usize = 10_000;

/// Maximum directory depth walked inside an extracted RAR staging directory.
pub const MAX_STAGING_DEPTH: usize = 32;

/// External decoder used for RAR archives.
pub const RAR_DECODER: &str = "unrar";

/// Prefix of per-extraction staging directories inside the content store.
pub const STAGING_DIR_PREFIX: &str = ".staging-";

// =============================================================================
// Parsing
// =============================================================================

/// Timestamp format of structured log lines.
pub const LINE_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Date format accepted by query parameters.
pub const QUERY_DATE_FORMAT: &str = "%Y-%m-%d";

/// Display format for registry timestamps (`uploaded_at`).
pub const REGISTRY_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Placeholder timestamp for unstructured log lines in query output.
pub const MISSING_TIMESTAMP: &str = "N/A";

/// Maximum number of per-line parse diagnostics kept per file.
pub const MAX_PARSE_ERRORS_PER_FILE: usize = 1_000;

/// Maximum number of skipped-line diagnostics kept across one query.
pub const MAX_TOTAL_PARSE_ERRORS: usize = 10_000;

/// Default number of worker threads for parallel file scanning.
/// 0 means auto-detect (use available CPU cores).
pub const DEFAULT_WORKER_THREADS: usize = 0;

/// Hard upper bound on configured worker threads.
pub const MAX_WORKER_THREADS: usize = 256;

/// Retry limits for transient I/O errors when opening log files.
pub const MAX_OPEN_RETRIES: u32 = 3;
pub const OPEN_RETRY_DELAYS_MS: [u64; 3] = [50, 100, 200];

// =============================================================================
// Authentication
// =============================================================================

/// Default access token lifetime in minutes.
pub const DEFAULT_TOKEN_TTL_MINUTES: i64 = 15;

/// Minimum configurable token lifetime in minutes.
pub const MIN_TOKEN_TTL_MINUTES: i64 = 1;

/// Maximum configurable token lifetime in minutes (one week).
pub const MAX_TOKEN_TTL_MINUTES: i64 = 7 * 24 * 60;

/// Minimum HS256 secret length in bytes.
pub const MIN_JWT_SECRET_BYTES: usize = 32;

/// Default JWT issuer claim.
pub const DEFAULT_JWT_ISSUER: &str = "logdepot";

/// Environment variable that overrides the configured JWT secret.
pub const JWT_SECRET_ENV: &str = "LOGDEPOT_JWT_SECRET";

/// Maximum accepted username length.
pub const MAX_USERNAME_LEN: usize = 100;

// =============================================================================
// Server
// =============================================================================

/// Default listen address.
pub const DEFAULT_BIND_ADDRESS: &str = "127.0.0.1:5000";

// =============================================================================
// Logging
// =============================================================================

/// Default log level.
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Maximum length of a log line included in debug output.
pub const DEBUG_MAX_LINE_PREVIEW: usize = 200;

// =============================================================================
// Persistence / configuration
// =============================================================================

/// Configuration file name.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Registry persistence file name (stored in the data directory).
pub const REGISTRY_FILE_NAME: &str = "registry.jsonl";

/// User store persistence file name (stored in the data directory).
pub const USERS_FILE_NAME: &str = "users.json";

/// Content store subdirectory name.
pub const UPLOADS_DIR_NAME: &str = "uploads";

/// Registry on-disk schema version.
pub const REGISTRY_VERSION: u32 = 1;

/// User store on-disk schema version.
pub const USERS_VERSION: u32 = 2;
