// LogDepot - platform/store.rs
//
// Flat content store: one directory holding uploaded files and extracted
// archive members side by side. Names are sanitised before they touch the
// filesystem; an existing file with the same name is overwritten.

use crate::util::constants;
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Latin letters with diacritics, by code point range, and the ASCII letter
/// left once the marks are stripped. Case follows the original character.
/// Letters that have no decomposition (`ß`, `æ`, `ø`, `ł`, ...) are absent.
const DIACRITIC_BASES: &[(u32, u32, char)] = &[
    (0xC0, 0xC5, 'a'),
    (0xC7, 0xC7, 'c'),
    (0xC8, 0xCB, 'e'),
    (0xCC, 0xCF, 'i'),
    (0xD1, 0xD1, 'n'),
    (0xD2, 0xD6, 'o'),
    (0xD9, 0xDC, 'u'),
    (0xDD, 0xDD, 'y'),
    (0xE0, 0xE5, 'a'),
    (0xE7, 0xE7, 'c'),
    (0xE8, 0xEB, 'e'),
    (0xEC, 0xEF, 'i'),
    (0xF1, 0xF1, 'n'),
    (0xF2, 0xF6, 'o'),
    (0xF9, 0xFC, 'u'),
    (0xFD, 0xFD, 'y'),
    (0xFF, 0xFF, 'y'),
    (0x100, 0x105, 'a'),
    (0x106, 0x10D, 'c'),
    (0x10E, 0x10F, 'd'),
    (0x112, 0x11B, 'e'),
    (0x11C, 0x123, 'g'),
    (0x124, 0x125, 'h'),
    (0x128, 0x130, 'i'),
    (0x134, 0x135, 'j'),
    (0x136, 0x137, 'k'),
    (0x139, 0x13E, 'l'),
    (0x143, 0x148, 'n'),
    (0x14C, 0x151, 'o'),
    (0x154, 0x159, 'r'),
    (0x15A, 0x161, 's'),
    (0x162, 0x165, 't'),
    (0x168, 0x173, 'u'),
    (0x174, 0x175, 'w'),
    (0x176, 0x178, 'y'),
    (0x179, 0x17E, 'z'),
];

/// ASCII form of `c`, if it has one.
fn fold_to_ascii(c: char) -> Option<char> {
    if c.is_ascii() {
        return Some(c);
    }
    let code = u32::from(c);
    DIACRITIC_BASES
        .iter()
        .find(|&&(start, end, _)| (start..=end).contains(&code))
        .map(|&(_, _, base)| {
            if c.is_uppercase() {
                base.to_ascii_uppercase()
            } else {
                base
            }
        })
}

/// Reduce an arbitrary client-supplied filename to a safe flat name.
///
/// Accented Latin letters lose their accents (`é` -> `e`), other non-ASCII
/// characters are dropped, path separators and whitespace become `_`,
/// anything outside `[A-Za-z0-9_.-]` is removed, and leading/trailing `.`
/// and `_` are stripped. The result never contains a path component and may
/// be empty.
pub fn sanitize_filename(raw: &str) -> String {
    let spaced: String = raw
        .chars()
        .map(|c| if c == '/' || c == '\\' { ' ' } else { c })
        .collect();
    let joined = spaced.split_whitespace().collect::<Vec<_>>().join("_");
    let kept: String = joined
        .chars()
        .filter_map(fold_to_ascii)
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
        .collect();
    kept.trim_matches(|c| c == '.' || c == '_').to_string()
}

/// Handle to the on-disk content store.
#[derive(Debug, Clone)]
pub struct ContentStore {
    root: PathBuf,
}

impl ContentStore {
    /// Open (creating if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> io::Result<Self> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        tracing::debug!(root = %root.display(), "Content store ready");
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path a sanitised `name` maps to. `name` must already be sanitised.
    pub fn path_for(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Write `bytes` under the already-sanitised `name`, replacing any
    /// existing file of that name.
    pub fn save(&self, name: &str, bytes: &[u8]) -> io::Result<PathBuf> {
        let path = self.path_for(name);
        std::fs::write(&path, bytes)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored file");
        Ok(path)
    }

    /// Move a file from anywhere on the same filesystem into the store.
    ///
    /// Falls back to copy + remove when a rename is not possible.
    pub fn promote(&self, from: &Path, name: &str) -> io::Result<PathBuf> {
        let dest = self.path_for(name);
        if std::fs::rename(from, &dest).is_err() {
            std::fs::copy(from, &dest)?;
            let _ = std::fs::remove_file(from);
        }
        Ok(dest)
    }

    /// Create a scratch directory inside the store for archive extraction.
    /// Removed when the returned guard drops.
    pub fn staging_dir(&self) -> io::Result<TempDir> {
        tempfile::Builder::new()
            .prefix(constants::STAGING_DIR_PREFIX)
            .tempdir_in(&self.root)
    }
}
