// LogDepot - app/ingest.rs
//
// Upload pipeline: validate -> sanitise -> store -> expand -> register.
//
// Validation failures leave no trace (nothing stored, nothing registered).
// Extraction is best-effort: a corrupt archive or a missing decoder is
// logged and reported in the `IngestReport`, and the archive itself is still
// registered.

use crate::app::context::AppContext;
use crate::core::model::{file_type_of, FileKind, NewStoredFile, StoredFile};
use crate::platform::store::sanitize_filename;
use crate::util::constants;
use crate::util::error::{ExtractionError, IngestError};
use std::path::PathBuf;
use std::sync::Arc;

/// What happened to one accepted upload.
#[derive(Debug)]
pub struct IngestReport {
    /// The registry entry created for the upload.
    pub file: Arc<StoredFile>,

    /// Archive expansion outcome; `None` for non-archives.
    pub extraction: Option<Result<Vec<PathBuf>, ExtractionError>>,
}

impl IngestReport {
    /// Client-facing confirmation message.
    pub fn message(&self) -> String {
        format!("File {} uploaded successfully!", self.file.name)
    }

    /// Paths of extracted archive members (empty when nothing was extracted).
    pub fn extracted(&self) -> &[PathBuf] {
        match self.extraction {
            Some(Ok(ref members)) => members,
            _ => &[],
        }
    }

    pub fn extraction_error(&self) -> Option<&ExtractionError> {
        match self.extraction {
            Some(Err(ref e)) => Some(e),
            _ => None,
        }
    }
}

/// Check a client-supplied filename and return the name it will be stored
/// under.
///
/// The extension test is case-insensitive and runs on the original name.
/// The sanitised name must keep the same extension.
pub fn validate_filename(original: &str) -> Result<String, IngestError> {
    if original.is_empty() {
        return Err(IngestError::EmptyFilename);
    }

    let extension = file_type_of(original);
    if !constants::ALLOWED_EXTENSIONS.contains(&extension.as_str()) {
        return Err(IngestError::DisallowedExtension {
            filename: original.to_string(),
        });
    }

    let sanitized = sanitize_filename(original);
    if sanitized.is_empty() || file_type_of(&sanitized) != extension {
        return Err(IngestError::UnsafeFilename {
            filename: original.to_string(),
        });
    }
    Ok(sanitized)
}

/// Accept one uploaded file.
pub fn ingest(
    ctx: &AppContext,
    original_name: &str,
    bytes: &[u8],
) -> Result<IngestReport, IngestError> {
    let name = match validate_filename(original_name) {
        Ok(name) => name,
        Err(e) => {
            tracing::info!(filename = original_name, error = %e, "Upload rejected");
            return Err(e);
        }
    };

    let path = ctx
        .store
        .save(&name, bytes)
        .map_err(|source| IngestError::Store {
            path: ctx.store.path_for(&name),
            source,
        })?;

    let kind = FileKind::from_file_type(&file_type_of(&name));
    let extraction = kind.is_archive().then(|| {
        let result = ctx.expander.expand(&path, kind);
        if let Err(ref e) = result {
            tracing::warn!(
                file = %path.display(),
                kind = %kind,
                error = %e,
                "Archive extraction failed; registering the archive anyway"
            );
        }
        result
    });

    let file = ctx
        .registry
        .append(NewStoredFile::now(name, path))
        .map_err(IngestError::Registry)?;

    tracing::info!(
        id = file.id,
        name = %file.name,
        bytes = bytes.len(),
        extracted = extraction
            .as_ref()
            .and_then(|r| r.as_ref().ok())
            .map_or(0, Vec::len),
        "Upload accepted"
    );

    Ok(IngestReport { file, extraction })
}
