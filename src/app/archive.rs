// LogDepot - app/archive.rs
//
// Best-effort archive expansion into the flat content store.
//
//   - zip archives are decoded in-process with the `zip` crate.
//   - rar archives are handed to the external `unrar` decoder, which writes
//     into a staging directory inside the store; the staged tree is then
//     walked and every regular file is promoted into the store root.
//
// Members are flattened to their final path component and sanitised; a
// member whose name collides with an existing stored file replaces it.
// Every failure is returned as `ExtractionError` and is never fatal to the
// upload that triggered it.

use crate::core::model::FileKind;
use crate::platform::store::{sanitize_filename, ContentStore};
use crate::util::constants;
use crate::util::error::ExtractionError;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Upper bounds applied while expanding one archive.
#[derive(Debug, Clone)]
pub struct ExtractionLimits {
    /// Members larger than this (uncompressed) are skipped.
    pub max_member_size: u64,
    /// Archives with more members than this are rejected.
    pub max_members: usize,
}

impl Default for ExtractionLimits {
    fn default() -> Self {
        Self {
            max_member_size: constants::MAX_ARCHIVE_MEMBER_SIZE,
            max_members: constants::MAX_ARCHIVE_MEMBERS,
        }
    }
}

/// Expands uploaded archives into a `ContentStore`.
#[derive(Debug, Clone)]
pub struct ArchiveExpander {
    store: ContentStore,
    limits: ExtractionLimits,
    rar_decoder: &'static str,
}

impl ArchiveExpander {
    pub fn new(store: ContentStore) -> Self {
        Self {
            store,
            limits: ExtractionLimits::default(),
            rar_decoder: constants::RAR_DECODER,
        }
    }

    pub fn with_limits(mut self, limits: ExtractionLimits) -> Self {
        self.limits = limits;
        self
    }

    /// Use a different external rar decoder executable.
    pub fn with_rar_decoder(mut self, decoder: &'static str) -> Self {
        self.rar_decoder = decoder;
        self
    }

    /// Expand the stored file at `path` according to its `kind`.
    ///
    /// Returns the store paths of every extracted member. Kinds that are not
    /// archives are a no-op: the original file is its own sole member.
    pub fn expand(&self, path: &Path, kind: FileKind) -> Result<Vec<PathBuf>, ExtractionError> {
        let members = match kind {
            FileKind::ArchiveZip => self.expand_zip(path)?,
            FileKind::ArchiveRar => self.expand_rar(path)?,
            FileKind::Plain | FileKind::Other => return Ok(vec![path.to_path_buf()]),
        };

        tracing::info!(
            archive = %path.display(),
            kind = %kind,
            members = members.len(),
            "Archive expanded"
        );
        Ok(members)
    }

    fn expand_zip(&self, archive_path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let file = File::open(archive_path).map_err(|source| ExtractionError::Io {
            path: archive_path.to_path_buf(),
            operation: "open",
            source,
        })?;
        let mut archive =
            zip::ZipArchive::new(BufReader::new(file)).map_err(|source| {
                ExtractionError::Corrupt {
                    path: archive_path.to_path_buf(),
                    source,
                }
            })?;

        if archive.len() > self.limits.max_members {
            return Err(ExtractionError::TooManyMembers {
                path: archive_path.to_path_buf(),
                max: self.limits.max_members,
            });
        }

        let mut extracted = Vec::new();
        for index in 0..archive.len() {
            let mut member = archive
                .by_index(index)
                .map_err(|source| ExtractionError::Corrupt {
                    path: archive_path.to_path_buf(),
                    source,
                })?;

            if member.is_dir() {
                continue;
            }

            // `enclosed_name` rejects absolute and `..`-escaping names.
            let Some(enclosed) = member.enclosed_name() else {
                tracing::warn!(
                    archive = %archive_path.display(),
                    member = member.name(),
                    "Skipping archive member with unsafe path"
                );
                continue;
            };
            let Some(name) = flat_member_name(&enclosed) else {
                tracing::debug!(member = member.name(), "Skipping member with no usable name");
                continue;
            };

            if member.size() > self.limits.max_member_size {
                tracing::warn!(
                    archive = %archive_path.display(),
                    member = %name,
                    size = member.size(),
                    limit = self.limits.max_member_size,
                    "Skipping oversized archive member"
                );
                continue;
            }

            let dest = self.store.path_for(&name);
            if dest == archive_path {
                tracing::warn!(member = %name, "Archive member would replace its own archive; skipped");
                continue;
            }

            let mut out = File::create(&dest).map_err(|source| ExtractionError::Io {
                path: dest.clone(),
                operation: "create",
                source,
            })?;
            // The declared size can lie; cap what is actually decompressed.
            let mut limited = (&mut member).take(self.limits.max_member_size + 1);
            let written = io::copy(&mut limited, &mut out).map_err(|source| {
                let _ = std::fs::remove_file(&dest);
                ExtractionError::Io {
                    path: dest.clone(),
                    operation: "extract",
                    source,
                }
            })?;

            if written > self.limits.max_member_size {
                drop(out);
                let _ = std::fs::remove_file(&dest);
                tracing::warn!(
                    archive = %archive_path.display(),
                    member = %name,
                    "Archive member exceeded size limit while decompressing; removed"
                );
                continue;
            }

            tracing::debug!(member = %name, bytes = written, "Extracted zip member");
            extracted.push(dest);
        }

        Ok(extracted)
    }

    fn expand_rar(&self, archive_path: &Path) -> Result<Vec<PathBuf>, ExtractionError> {
        let staging = self.store.staging_dir().map_err(|source| ExtractionError::Io {
            path: self.store.root().to_path_buf(),
            operation: "create staging directory in",
            source,
        })?;

        // unrar treats a destination ending in a separator as a directory.
        let mut destination = staging.path().as_os_str().to_os_string();
        destination.push(std::path::MAIN_SEPARATOR_STR);

        let output = Command::new(self.rar_decoder)
            .arg("x")
            .arg("-o+")
            .arg("-y")
            .arg(archive_path)
            .arg(&destination)
            .stdin(Stdio::null())
            .output()
            .map_err(|source| ExtractionError::DecoderUnavailable {
                decoder: self.rar_decoder,
                source,
            })?;

        if !output.status.success() {
            return Err(ExtractionError::DecoderFailed {
                path: archive_path.to_path_buf(),
                decoder: self.rar_decoder,
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        // Collect first so promotion does not race the directory iterator.
        let entries: Vec<walkdir::DirEntry> = walkdir::WalkDir::new(staging.path())
            .max_depth(constants::MAX_STAGING_DEPTH)
            .follow_links(false)
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    tracing::warn!(error = %e, "Cannot access staged archive entry");
                    None
                }
            })
            .filter(|e| e.file_type().is_file())
            .collect();

        if entries.len() > self.limits.max_members {
            return Err(ExtractionError::TooManyMembers {
                path: archive_path.to_path_buf(),
                max: self.limits.max_members,
            });
        }

        let mut extracted = Vec::with_capacity(entries.len());
        for entry in entries {
            let Some(name) = flat_member_name(entry.path()) else {
                continue;
            };

            let size = entry.metadata().map(|m| m.len()).unwrap_or(0);
            if size > self.limits.max_member_size {
                tracing::warn!(
                    archive = %archive_path.display(),
                    member = %name,
                    size,
                    "Skipping oversized archive member"
                );
                continue;
            }

            if self.store.path_for(&name) == archive_path {
                tracing::warn!(member = %name, "Archive member would replace its own archive; skipped");
                continue;
            }

            let dest = self
                .store
                .promote(entry.path(), &name)
                .map_err(|source| ExtractionError::Io {
                    path: entry.path().to_path_buf(),
                    operation: "promote",
                    source,
                })?;
            tracing::debug!(member = %name, "Promoted rar member");
            extracted.push(dest);
        }

        // `staging` drops here and removes whatever was left behind.
        Ok(extracted)
    }
}

/// Final component of `member`, sanitised; `None` if nothing usable remains.
fn flat_member_name(member: &Path) -> Option<String> {
    let raw = member.file_name()?.to_str()?;
    let name = sanitize_filename(raw);
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;
    use zip::write::SimpleFileOptions;

    fn write_zip(path: &Path, members: &[(&str, &[u8])]) {
        let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
        for (name, content) in members {
            writer
                .start_file(*name, SimpleFileOptions::default())
                .unwrap();
            writer.write_all(content).unwrap();
        }
        writer.finish().unwrap();
    }

    fn setup() -> (TempDir, ContentStore) {
        let dir = TempDir::new().unwrap();
        let store = ContentStore::open(dir.path().join("uploads")).unwrap();
        (dir, store)
    }

    #[test]
    fn test_plain_kind_is_noop() {
        let (_dir, store) = setup();
        let path = store.save("app.txt", b"2024-03-16 10:00:00 boot ok\n").unwrap();
        let expander = ArchiveExpander::new(store);
        let members = expander.expand(&path, FileKind::Plain).unwrap();
        assert_eq!(members, vec![path]);
    }

    #[test]
    fn test_zip_members_are_flattened_into_store() {
        let (_dir, store) = setup();
        let archive = store.path_for("bundle.zip");
        write_zip(
            &archive,
            &[
                ("logs/app.txt", b"2024-03-16 10:00:00 boot ok\n"),
                ("logs/deep/db server.log", b"db up\n"),
            ],
        );

        let expander = ArchiveExpander::new(store.clone());
        let mut members = expander.expand(&archive, FileKind::ArchiveZip).unwrap();
        members.sort();

        assert_eq!(
            members,
            vec![store.path_for("app.txt"), store.path_for("db_server.log")]
        );
        assert_eq!(
            std::fs::read_to_string(store.path_for("app.txt")).unwrap(),
            "2024-03-16 10:00:00 boot ok\n"
        );
        assert!(!store.root().join("logs").exists());
    }

    #[test]
    fn test_zip_member_overwrites_existing_file() {
        let (_dir, store) = setup();
        store.save("app.txt", b"old").unwrap();
        let archive = store.path_for("bundle.zip");
        write_zip(&archive, &[("app.txt", b"new")]);

        ArchiveExpander::new(store.clone())
            .expand(&archive, FileKind::ArchiveZip)
            .unwrap();
        assert_eq!(std::fs::read_to_string(store.path_for("app.txt")).unwrap(), "new");
    }

    #[test]
    fn test_corrupt_zip_is_reported() {
        let (_dir, store) = setup();
        let archive = store.save("broken.zip", b"this is not a zip file").unwrap();
        let err = ArchiveExpander::new(store)
            .expand(&archive, FileKind::ArchiveZip)
            .unwrap_err();
        assert!(matches!(err, ExtractionError::Corrupt { .. }), "got {err:?}");
    }

    #[test]
    fn test_oversized_member_is_skipped() {
        let (_dir, store) = setup();
        let archive = store.path_for("bundle.zip");
        write_zip(&archive, &[("big.txt", b"0123456789"), ("small.txt", b"ok")]);

        let expander = ArchiveExpander::new(store.clone()).with_limits(ExtractionLimits {
            max_member_size: 4,
            max_members: 10,
        });
        let members = expander.expand(&archive, FileKind::ArchiveZip).unwrap();
        assert_eq!(members, vec![store.path_for("small.txt")]);
        assert!(!store.path_for("big.txt").exists());
    }

    #[test]
    fn test_too_many_members_is_rejected() {
        let (_dir, store) = setup();
        let archive = store.path_for("bundle.zip");
        write_zip(&archive, &[("a.txt", b"a"), ("b.txt", b"b")]);

        let expander = ArchiveExpander::new(store).with_limits(ExtractionLimits {
            max_member_size: 1024,
            max_members: 1,
        });
        let err = expander.expand(&archive, FileKind::ArchiveZip).unwrap_err();
        assert!(matches!(err, ExtractionError::TooManyMembers { max: 1, .. }));
    }

    #[test]
    fn test_missing_rar_decoder_is_reported() {
        let (_dir, store) = setup();
        let archive = store.save("logs.rar", b"Rar!\x1a\x07\x00").unwrap();
        let expander =
            ArchiveExpander::new(store.clone()).with_rar_decoder("logdepot-no-such-unrar");
        let err = expander.expand(&archive, FileKind::ArchiveRar).unwrap_err();
        assert!(
            matches!(err, ExtractionError::DecoderUnavailable { .. }),
            "got {err:?}"
        );
        // The staging directory is cleaned up on failure.
        let leftovers: Vec<_> = std::fs::read_dir(store.root())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.file_name()
                    .to_string_lossy()
                    .starts_with(constants::STAGING_DIR_PREFIX)
            })
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_flat_member_name() {
        assert_eq!(
            flat_member_name(Path::new("a/b/c.log")),
            Some("c.log".to_string())
        );
        assert_eq!(flat_member_name(Path::new("a/...")), None);
    }
}
