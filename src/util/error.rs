// LogDepot - util/error.rs
//
// Typed error hierarchy with context-preserving error chains.
// No string-based error propagation: every variant carries the data needed
// to render an actionable message, and `source()` exposes the causal chain.

use std::fmt;
use std::io;
use std::path::PathBuf;

/// Top-level error type for all LogDepot operations.
/// Errors are categorised by the subsystem that produced them.
#[derive(Debug)]
pub enum LogDepotError {
    /// Upload validation or storage failed.
    Ingest(IngestError),

    /// Corpus registry lookup or persistence failed.
    Registry(RegistryError),

    /// Log query parameters were rejected.
    Query(QueryError),

    /// Authentication or credential handling failed.
    Auth(AuthError),

    /// Configuration loading or validation failed.
    Config(ConfigError),

    /// I/O error with path context.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for LogDepotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ingest(e) => write!(f, "Ingest error: {e}"),
            Self::Registry(e) => write!(f, "Registry error: {e}"),
            Self::Query(e) => write!(f, "Query error: {e}"),
            Self::Auth(e) => write!(f, "Authentication error: {e}"),
            Self::Config(e) => write!(f, "Configuration error: {e}"),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for LogDepotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Ingest(e) => Some(e),
            Self::Registry(e) => Some(e),
            Self::Query(e) => Some(e),
            Self::Auth(e) => Some(e),
            Self::Config(e) => Some(e),
            Self::Io { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Persistence errors (shared by the registry and the user store)
// ---------------------------------------------------------------------------

/// Errors writing or reading a JSON snapshot file.
#[derive(Debug)]
pub enum PersistError {
    /// The snapshot could not be written or renamed into place.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },

    /// The snapshot could not be serialised.
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

impl fmt::Display for PersistError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "cannot {operation} snapshot '{}': {source}",
                path.display()
            ),
            Self::Serialize { path, source } => {
                write!(f, "cannot serialise snapshot '{}': {source}", path.display())
            }
        }
    }
}

impl std::error::Error for PersistError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::Serialize { source, .. } => Some(source),
        }
    }
}

// ---------------------------------------------------------------------------
// Ingest errors
// ---------------------------------------------------------------------------

/// Errors related to accepting an uploaded file.
///
/// Everything except `Store` and `Registry` is a caller mistake (HTTP 400).
#[derive(Debug)]
pub enum IngestError {
    /// The request carried no file part.
    MissingFile,

    /// The file part had an empty filename.
    EmptyFilename,

    /// The filename extension is not one of the accepted kinds.
    DisallowedExtension { filename: String },

    /// Sanitising the filename left nothing usable.
    UnsafeFilename { filename: String },

    /// Writing the file into the content store failed.
    Store { path: PathBuf, source: io::Error },

    /// Registering the stored file failed.
    Registry(RegistryError),
}

impl IngestError {
    /// True when the error was caused by the request rather than the server.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::MissingFile
                | Self::EmptyFilename
                | Self::DisallowedExtension { .. }
                | Self::UnsafeFilename { .. }
        )
    }
}

impl fmt::Display for IngestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingFile => write!(f, "no file was provided"),
            Self::EmptyFilename => write!(f, "the uploaded file has no name"),
            Self::DisallowedExtension { filename } => write!(
                f,
                "'{filename}' is not an accepted file type (expected .txt, .zip or .rar)"
            ),
            Self::UnsafeFilename { filename } => {
                write!(f, "'{filename}' does not yield a safe stored filename")
            }
            Self::Store { path, source } => {
                write!(f, "cannot store upload at '{}': {source}", path.display())
            }
            Self::Registry(e) => write!(f, "cannot register upload: {e}"),
        }
    }
}

impl std::error::Error for IngestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Store { source, .. } => Some(source),
            Self::Registry(e) => Some(e),
            _ => None,
        }
    }
}

impl From<IngestError> for LogDepotError {
    fn from(e: IngestError) -> Self {
        Self::Ingest(e)
    }
}

// ---------------------------------------------------------------------------
// Extraction errors
// ---------------------------------------------------------------------------

/// Errors related to expanding an uploaded archive.
///
/// Always non-fatal for the upload: the caller logs them and still registers
/// the original file.
#[derive(Debug)]
pub enum ExtractionError {
    /// The archive is corrupt or uses an unsupported feature.
    Corrupt {
        path: PathBuf,
        source: zip::result::ZipError,
    },

    /// The external decoder could not be started (usually not installed).
    DecoderUnavailable {
        decoder: &'static str,
        source: io::Error,
    },

    /// The external decoder ran but reported failure.
    DecoderFailed {
        path: PathBuf,
        decoder: &'static str,
        status: String,
        stderr: String,
    },

    /// The archive holds more members than the extraction limit.
    TooManyMembers { path: PathBuf, max: usize },

    /// I/O error while writing or promoting extracted members.
    Io {
        path: PathBuf,
        operation: &'static str,
        source: io::Error,
    },
}

impl fmt::Display for ExtractionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Corrupt { path, source } => {
                write!(f, "cannot read archive '{}': {source}", path.display())
            }
            Self::DecoderUnavailable { decoder, source } => {
                write!(f, "archive decoder '{decoder}' is not available: {source}")
            }
            Self::DecoderFailed {
                path,
                decoder,
                status,
                stderr,
            } => write!(
                f,
                "'{decoder}' failed on '{}' ({status}): {stderr}",
                path.display()
            ),
            Self::TooManyMembers { path, max } => write!(
                f,
                "archive '{}' has more than {max} members; extraction stopped",
                path.display()
            ),
            Self::Io {
                path,
                operation,
                source,
            } => write!(
                f,
                "I/O error during {operation} on '{}': {source}",
                path.display()
            ),
        }
    }
}

impl std::error::Error for ExtractionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Corrupt { source, .. } => Some(source),
            Self::DecoderUnavailable { source, .. } => Some(source),
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Registry errors
// ---------------------------------------------------------------------------

/// Errors related to the corpus registry.
#[derive(Debug)]
pub enum RegistryError {
    /// A lookup filter value could not be parsed.
    InvalidFilter {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// The registry snapshot could not be persisted.
    Persist(PersistError),
}

impl fmt::Display for RegistryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFilter {
                field, expected, ..
            } => write!(f, "Invalid {field} format. Use {expected}"),
            Self::Persist(e) => write!(f, "registry persistence failed: {e}"),
        }
    }
}

impl std::error::Error for RegistryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Persist(e) => Some(e),
            Self::InvalidFilter { .. } => None,
        }
    }
}

impl From<PersistError> for RegistryError {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}

impl From<RegistryError> for LogDepotError {
    fn from(e: RegistryError) -> Self {
        Self::Registry(e)
    }
}

// ---------------------------------------------------------------------------
// Query errors
// ---------------------------------------------------------------------------

/// Errors related to log query parameters. Any of these aborts the query.
#[derive(Debug)]
pub enum QueryError {
    /// A time-window bound could not be parsed as a calendar date.
    InvalidDate {
        field: &'static str,
        value: String,
        expected: &'static str,
    },

    /// A source-file filter was rejected.
    Filter(RegistryError),
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidDate { expected, .. } => {
                write!(f, "Invalid date format. Use {expected}")
            }
            Self::Filter(e) => write!(f, "{e}"),
        }
    }
}

impl std::error::Error for QueryError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Filter(e) => Some(e),
            Self::InvalidDate { .. } => None,
        }
    }
}

impl From<RegistryError> for QueryError {
    fn from(e: RegistryError) -> Self {
        Self::Filter(e)
    }
}

impl From<QueryError> for LogDepotError {
    fn from(e: QueryError) -> Self {
        Self::Query(e)
    }
}

// ---------------------------------------------------------------------------
// Parse errors
// ---------------------------------------------------------------------------

/// Per-line and per-file parse diagnostics.
///
/// Never fatal: a failing line is dropped, a failing file contributes the
/// lines read before the failure.
#[derive(Debug)]
pub enum ParseError {
    /// A line matched the structured pattern but its timestamp is not a real
    /// calendar instant (e.g. month 13).
    TimestampParse {
        file: PathBuf,
        line_number: u64,
        raw_timestamp: String,
        format: &'static str,
    },

    /// I/O error while opening or reading a log file.
    Io { file: PathBuf, source: io::Error },
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TimestampParse {
                file,
                line_number,
                raw_timestamp,
                format,
            } => write!(
                f,
                "'{}' line {line_number}: cannot parse timestamp \
                 '{raw_timestamp}' with format '{format}'",
                file.display()
            ),
            Self::Io { file, source } => {
                write!(f, "'{}': I/O error: {source}", file.display())
            }
        }
    }
}

impl std::error::Error for ParseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            Self::TimestampParse { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Auth errors
// ---------------------------------------------------------------------------

/// Errors related to identity tokens and the credential store.
#[derive(Debug)]
pub enum AuthError {
    /// No bearer token was presented.
    MissingToken,

    /// The token is malformed, badly signed, or carries invalid claims.
    InvalidToken {
        source: jsonwebtoken::errors::Error,
    },

    /// The token's `exp` claim is in the past.
    TokenExpired,

    /// A token could not be signed.
    Signing {
        source: jsonwebtoken::errors::Error,
    },

    /// The configured signing secret is too short.
    WeakSecret { length: usize, min_length: usize },

    /// Registration attempted with a username that already exists.
    UsernameTaken { username: String },

    /// Username/password pair did not match.
    InvalidCredentials,

    /// Registration input is malformed (empty or oversized fields).
    InvalidInput { reason: String },

    /// The password could not be hashed.
    PasswordHash { source: argon2::password_hash::Error },

    /// The credential store could not be persisted.
    Persist(PersistError),
}

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingToken => write!(f, "Missing Authorization Header"),
            Self::InvalidToken { source } => write!(f, "Invalid token: {source}"),
            Self::TokenExpired => write!(f, "Token has expired"),
            Self::Signing { source } => write!(f, "cannot sign token: {source}"),
            Self::WeakSecret { length, min_length } => write!(
                f,
                "signing secret is {length} bytes, at least {min_length} are required"
            ),
            Self::UsernameTaken { .. } => write!(f, "Username already exists"),
            Self::InvalidCredentials => write!(f, "Invalid credentials"),
            Self::InvalidInput { reason } => write!(f, "{reason}"),
            Self::PasswordHash { source } => write!(f, "cannot hash password: {source}"),
            Self::Persist(e) => write!(f, "credential store persistence failed: {e}"),
        }
    }
}

impl std::error::Error for AuthError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::InvalidToken { source } => Some(source),
            Self::Signing { source } => Some(source),
            Self::PasswordHash { source } => Some(source),
            Self::Persist(e) => Some(e),
            _ => None,
        }
    }
}

impl From<PersistError> for AuthError {
    fn from(e: PersistError) -> Self {
        Self::Persist(e)
    }
}

impl From<AuthError> for LogDepotError {
    fn from(e: AuthError) -> Self {
        Self::Auth(e)
    }
}

// ---------------------------------------------------------------------------
// Config errors
// ---------------------------------------------------------------------------

/// Errors related to configuration loading.
#[derive(Debug)]
pub enum ConfigError {
    /// A config value is out of the allowed range.
    ValueOutOfRange {
        field: String,
        value: String,
        expected: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ValueOutOfRange {
                field,
                value,
                expected,
            } => write!(
                f,
                "Config '{field}' = '{value}' is out of range. Expected: {expected}"
            ),
        }
    }
}

impl std::error::Error for ConfigError {}

impl From<ConfigError> for LogDepotError {
    fn from(e: ConfigError) -> Self {
        Self::Config(e)
    }
}
