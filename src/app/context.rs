// LogDepot - app/context.rs
//
// Explicit application context: every long-lived collaborator the HTTP
// handlers and CLI commands need, built once at startup from the validated
// configuration and a data directory. Nothing here is global.
//
// Data directory layout:
//   <data_dir>/uploads/        content store (flat)
//   <data_dir>/registry.jsonl  corpus registry journal
//   <data_dir>/users.json      credential store snapshot

use crate::app::archive::ArchiveExpander;
use crate::app::auth::AccessGate;
use crate::app::query::QueryEngine;
use crate::app::registry::CorpusRegistry;
use crate::app::users::UserStore;
use crate::core::parser::LogLineParser;
use crate::platform::config::AppConfig;
use crate::platform::store::ContentStore;
use crate::util::constants;
use crate::util::error::LogDepotError;
use std::path::{Path, PathBuf};

/// Shared state for one LogDepot instance.
#[derive(Debug)]
pub struct AppContext {
    pub config: AppConfig,
    pub data_dir: PathBuf,
    pub store: ContentStore,
    pub expander: ArchiveExpander,
    pub registry: CorpusRegistry,
    pub users: UserStore,
    pub gate: AccessGate,
    pub parser: LogLineParser,
}

impl AppContext {
    /// Open (creating if needed) the instance rooted at `data_dir`.
    pub fn open(data_dir: &Path, config: AppConfig) -> Result<Self, LogDepotError> {
        let uploads = data_dir.join(constants::UPLOADS_DIR_NAME);
        let store = ContentStore::open(&uploads).map_err(|source| LogDepotError::Io {
            path: uploads.clone(),
            operation: "create content store",
            source,
        })?;

        let registry = CorpusRegistry::open(data_dir.join(constants::REGISTRY_FILE_NAME))?;
        let users = UserStore::open(data_dir.join(constants::USERS_FILE_NAME))?;

        let gate = match config.jwt_secret {
            Some(ref secret) => AccessGate::new(
                secret.as_bytes(),
                config.jwt_issuer.clone(),
                config.token_ttl_minutes,
            )?,
            None => {
                tracing::warn!(
                    env = constants::JWT_SECRET_ENV,
                    "No signing secret configured; using a per-process secret. \
                     Issued tokens will not survive a restart."
                );
                AccessGate::ephemeral(config.jwt_issuer.clone(), config.token_ttl_minutes)
            }
        };

        tracing::info!(
            data_dir = %data_dir.display(),
            files = registry.len(),
            users = users.len(),
            "Application context ready"
        );

        Ok(Self {
            expander: ArchiveExpander::new(store.clone()),
            config,
            data_dir: data_dir.to_path_buf(),
            store,
            registry,
            users,
            gate,
            parser: LogLineParser::default(),
        })
    }

    /// Query engine over this instance's registry.
    pub fn query_engine(&self) -> QueryEngine<'_> {
        QueryEngine::new(&self.registry, &self.parser)
    }
}
