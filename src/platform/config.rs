// LogDepot - platform/config.rs
//
// Platform-specific data directory resolution and config.toml loading with
// startup validation.
//
// Uses the `directories` crate for XDG (Linux), AppData (Windows),
// Library (macOS) compliance.

use crate::util::constants;
use directories::ProjectDirs;
use std::path::{Path, PathBuf};

/// Resolved platform paths for LogDepot data and configuration.
#[derive(Debug, Clone)]
pub struct PlatformPaths {
    /// Configuration directory (e.g. ~/.config/logdepot/)
    pub config_dir: PathBuf,

    /// Data directory holding the content store, registry and user store.
    pub data_dir: PathBuf,
}

impl PlatformPaths {
    /// Resolve platform-appropriate paths.
    ///
    /// Falls back to the current directory if platform dirs cannot be
    /// determined.
    pub fn resolve() -> Self {
        if let Some(proj_dirs) = ProjectDirs::from("", "", constants::APP_ID) {
            let config_dir = proj_dirs.config_dir().to_path_buf();
            let data_dir = proj_dirs.data_dir().to_path_buf();

            tracing::debug!(
                config = %config_dir.display(),
                data = %data_dir.display(),
                "Platform paths resolved"
            );

            Self {
                config_dir,
                data_dir,
            }
        } else {
            tracing::warn!("Could not determine platform directories, using current directory");
            let fallback = PathBuf::from(".");
            Self {
                config_dir: fallback.clone(),
                data_dir: fallback,
            }
        }
    }

    /// Default location of config.toml.
    pub fn config_file(&self) -> PathBuf {
        self.config_dir.join(constants::CONFIG_FILE_NAME)
    }
}

// =============================================================================
// config.toml loading and validation
// =============================================================================

/// Raw deserialisable shape of config.toml.
///
/// Unknown keys are silently ignored for forward compatibility.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct RawConfig {
    /// `[server]` section.
    pub server: ServerSection,
    /// `[storage]` section.
    pub storage: StorageSection,
    /// `[auth]` section.
    pub auth: AuthSection,
    /// `[query]` section.
    pub query: QuerySection,
    /// `[logging]` section.
    pub logging: LoggingSection,
}

/// `[server]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Listen address, e.g. "0.0.0.0:5000".
    pub bind: Option<String>,
    /// Maximum upload request body in bytes.
    pub max_upload_bytes: Option<usize>,
}

/// `[storage]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// Data directory (content store, registry, users).
    pub data_dir: Option<String>,
}

/// `[auth]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct AuthSection {
    /// HS256 signing secret (at least 32 bytes).
    pub jwt_secret: Option<String>,
    /// Access token lifetime in minutes.
    pub token_ttl_minutes: Option<i64>,
    /// Issuer claim.
    pub issuer: Option<String>,
}

/// `[query]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct QuerySection {
    /// Worker threads for parallel file scanning (0 = auto).
    pub worker_threads: Option<usize>,
}

/// `[logging]` config section.
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub level: Option<String>,
}

/// Validated application configuration derived from `config.toml`.
///
/// Invalid values produce actionable warnings and fall back to defaults.
#[derive(Clone)]
pub struct AppConfig {
    // -- Server --
    pub bind: String,
    pub max_upload_bytes: usize,

    // -- Storage --
    /// `None` means "use the platform data directory".
    pub data_dir: Option<PathBuf>,

    // -- Auth --
    /// `None` means "generate a per-process secret".
    pub jwt_secret: Option<String>,
    pub token_ttl_minutes: i64,
    pub jwt_issuer: String,

    // -- Query --
    pub worker_threads: usize,

    // -- Logging --
    pub log_level: Option<String>,
}

// Hand-written so the signing secret never reaches a log line.
impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind", &self.bind)
            .field("max_upload_bytes", &self.max_upload_bytes)
            .field("data_dir", &self.data_dir)
            .field("jwt_secret", &self.jwt_secret.as_ref().map(|_| "<redacted>"))
            .field("token_ttl_minutes", &self.token_ttl_minutes)
            .field("jwt_issuer", &self.jwt_issuer)
            .field("worker_threads", &self.worker_threads)
            .field("log_level", &self.log_level)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            bind: constants::DEFAULT_BIND_ADDRESS.to_string(),
            max_upload_bytes: constants::DEFAULT_MAX_UPLOAD_BYTES,
            data_dir: None,
            jwt_secret: None,
            token_ttl_minutes: constants::DEFAULT_TOKEN_TTL_MINUTES,
            jwt_issuer: constants::DEFAULT_JWT_ISSUER.to_string(),
            worker_threads: constants::DEFAULT_WORKER_THREADS,
            log_level: None,
        }
    }
}

/// Load and validate `config.toml` at `config_path`.
///
/// Returns `AppConfig` with validated values and a list of non-fatal warnings.
/// A missing file yields defaults with no warnings (first run). An
/// unparseable file yields defaults plus a warning; the service still starts.
pub fn load_config(config_path: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    if !config_path.exists() {
        tracing::debug!(path = %config_path.display(), "No config.toml found; using defaults");
        return (AppConfig::default(), warnings);
    }

    let content = match std::fs::read_to_string(config_path) {
        Ok(c) => c,
        Err(e) => {
            let msg = format!(
                "Could not read config file '{}': {e}. Using defaults.",
                config_path.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    let (config, parse_warnings) = parse_config(&content, config_path);
    warnings.extend(parse_warnings);
    (config, warnings)
}

/// Validate config.toml `content`. `origin` is only used in messages.
pub fn parse_config(content: &str, origin: &Path) -> (AppConfig, Vec<String>) {
    let mut warnings: Vec<String> = Vec::new();

    let raw: RawConfig = match toml::from_str(content) {
        Ok(r) => r,
        Err(e) => {
            let msg = format!(
                "Failed to parse config file '{}': {e}. Using defaults.",
                origin.display()
            );
            tracing::warn!("{}", msg);
            warnings.push(msg);
            return (AppConfig::default(), warnings);
        }
    };

    tracing::info!(path = %origin.display(), "Loaded config.toml");

    let mut config = AppConfig::default();

    // -- Server: bind --
    if let Some(ref bind) = raw.server.bind {
        if bind.parse::<std::net::SocketAddr>().is_ok() {
            config.bind = bind.clone();
        } else {
            warnings.push(format!(
                "[server] bind = \"{bind}\" is not a socket address. Using default ({}).",
                constants::DEFAULT_BIND_ADDRESS,
            ));
        }
    }

    // -- Server: max_upload_bytes --
    if let Some(bytes) = raw.server.max_upload_bytes {
        if (constants::MIN_MAX_UPLOAD_BYTES..=constants::ABSOLUTE_MAX_UPLOAD_BYTES)
            .contains(&bytes)
        {
            config.max_upload_bytes = bytes;
        } else {
            warnings.push(format!(
                "[server] max_upload_bytes = {bytes} is out of range ({}-{}). Using default ({}).",
                constants::MIN_MAX_UPLOAD_BYTES,
                constants::ABSOLUTE_MAX_UPLOAD_BYTES,
                constants::DEFAULT_MAX_UPLOAD_BYTES,
            ));
        }
    }

    // -- Storage: data_dir --
    if let Some(ref dir) = raw.storage.data_dir {
        if !dir.is_empty() {
            config.data_dir = Some(PathBuf::from(dir));
        }
    }

    // -- Auth: jwt_secret --
    if let Some(ref secret) = raw.auth.jwt_secret {
        if secret.len() >= constants::MIN_JWT_SECRET_BYTES {
            config.jwt_secret = Some(secret.clone());
        } else {
            warnings.push(format!(
                "[auth] jwt_secret is {} bytes; at least {} are required. \
                 A random per-process secret will be used.",
                secret.len(),
                constants::MIN_JWT_SECRET_BYTES,
            ));
        }
    }

    // -- Auth: token_ttl_minutes --
    if let Some(ttl) = raw.auth.token_ttl_minutes {
        if (constants::MIN_TOKEN_TTL_MINUTES..=constants::MAX_TOKEN_TTL_MINUTES).contains(&ttl) {
            config.token_ttl_minutes = ttl;
        } else {
            warnings.push(format!(
                "[auth] token_ttl_minutes = {ttl} is out of range ({}-{}). Using default ({}).",
                constants::MIN_TOKEN_TTL_MINUTES,
                constants::MAX_TOKEN_TTL_MINUTES,
                constants::DEFAULT_TOKEN_TTL_MINUTES,
            ));
        }
    }

    // -- Auth: issuer --
    if let Some(ref issuer) = raw.auth.issuer {
        if !issuer.trim().is_empty() {
            config.jwt_issuer = issuer.trim().to_string();
        }
    }

    // -- Query: worker_threads --
    if let Some(threads) = raw.query.worker_threads {
        if threads <= constants::MAX_WORKER_THREADS {
            config.worker_threads = threads;
        } else {
            warnings.push(format!(
                "[query] worker_threads = {threads} is out of range (0-{}). Using default (auto).",
                constants::MAX_WORKER_THREADS,
            ));
        }
    }

    // -- Logging: level --
    if let Some(ref level) = raw.logging.level {
        let valid = ["error", "warn", "info", "debug", "trace"];
        if valid.contains(&level.to_lowercase().as_str()) {
            config.log_level = Some(level.to_lowercase());
        } else {
            warnings.push(format!(
                "[logging] level = \"{level}\" is not recognised. \
                 Valid values: error, warn, info, debug, trace. Using default (info).",
            ));
        }
    }

    if !warnings.is_empty() {
        tracing::warn!(
            count = warnings.len(),
            "Config validation produced warnings"
        );
    }

    (config, warnings)
}

/// Apply a signing secret taken from the environment (`LOGDEPOT_JWT_SECRET`).
///
/// `env_value` is passed in rather than read here so the rule is testable.
pub fn apply_secret_override(
    config: &mut AppConfig,
    env_value: Option<String>,
    warnings: &mut Vec<String>,
) {
    let Some(secret) = env_value else {
        return;
    };
    if secret.len() >= constants::MIN_JWT_SECRET_BYTES {
        config.jwt_secret = Some(secret);
    } else {
        warnings.push(format!(
            "{} is {} bytes; at least {} are required. Ignoring it.",
            constants::JWT_SECRET_ENV,
            secret.len(),
            constants::MIN_JWT_SECRET_BYTES,
        ));
    }
}
