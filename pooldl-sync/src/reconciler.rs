//! Quarantine of local files that no longer belong to the pool.
//!
//! Stale files are never deleted. They are moved into `deleted/` under their
//! content hash so a user can recover them.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use pooldl_core::marker::MARKER_FILE;

use crate::error::{io_err, SyncError};
use crate::hash;

/// Quarantine subdirectory name.
pub const DELETED_DIR: &str = "deleted";

/// Move every regular file in `download_dir` whose name is not in
/// `expected` into `deleted/{md5}.{ext}`. Returns the number moved.
///
/// The marker file and subdirectories are left alone. Entries are visited
/// in name order so collision suffixes are deterministic. A file that
/// cannot be hashed or moved is logged and left in place; the rest are
/// still processed.
pub fn reconcile(download_dir: &Path, expected: &BTreeSet<String>) -> usize {
    let stale = match stale_files(download_dir, expected) {
        Ok(stale) => stale,
        Err(e) => {
            tracing::warn!("cannot scan for stale files: {e}");
            return 0;
        }
    };
    if stale.is_empty() {
        return 0;
    }

    let deleted_dir = download_dir.join(DELETED_DIR);
    if let Err(e) = std::fs::create_dir_all(&deleted_dir) {
        tracing::warn!(
            "cannot create {}: {e}; {} stale file(s) left in place",
            deleted_dir.display(),
            stale.len()
        );
        return 0;
    }

    let mut moved = 0;
    for (name, path) in stale {
        match quarantine(&path, &deleted_dir, &name) {
            Ok(target) => {
                tracing::info!("moved {name} to {}", target.display());
                moved += 1;
            }
            Err(e) => tracing::warn!("cannot quarantine {name}: {e}"),
        }
    }
    moved
}

/// Regular files of `dir` that are neither expected nor the marker, sorted
/// by name.
fn stale_files(
    dir: &Path,
    expected: &BTreeSet<String>,
) -> Result<Vec<(String, PathBuf)>, SyncError> {
    let entries = std::fs::read_dir(dir).map_err(|e| io_err(dir, e))?;
    let mut stale = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| io_err(dir, e))?;
        let file_type = entry.file_type().map_err(|e| io_err(entry.path(), e))?;
        if !file_type.is_file() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == MARKER_FILE || expected.contains(&name) {
            continue;
        }
        stale.push((name, entry.path()));
    }
    stale.sort();
    Ok(stale)
}

fn quarantine(path: &Path, deleted_dir: &Path, name: &str) -> Result<PathBuf, SyncError> {
    let md5 = hash::md5_file(path).map_err(|e| io_err(path, e))?;
    let target = quarantine_path(deleted_dir, &md5, extension_of(name));
    std::fs::rename(path, &target).map_err(|e| io_err(path, e))?;
    Ok(target)
}

/// Extension after the last dot, if any.
fn extension_of(name: &str) -> Option<&str> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .filter(|e| !e.is_empty())
}

/// First free `{md5}.{ext}`, `{md5}_1.{ext}`, `{md5}_2.{ext}`, ... in `dir`.
fn quarantine_path(dir: &Path, md5: &str, ext: Option<&str>) -> PathBuf {
    let name = |suffix: String| match ext {
        Some(ext) => format!("{md5}{suffix}.{ext}"),
        None => format!("{md5}{suffix}"),
    };
    let mut candidate = dir.join(name(String::new()));
    let mut n = 1u32;
    while candidate.exists() {
        candidate = dir.join(name(format!("_{n}")));
        n += 1;
    }
    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn expected(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn stale_file_moves_to_deleted_under_its_hash() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("001_aaa.png"), b"a").unwrap();
        fs::write(dir.path().join("002_bbb.png"), b"b").unwrap();
        fs::write(dir.path().join("003_ccc.png"), b"c").unwrap();

        let moved = reconcile(dir.path(), &expected(&["001_aaa.png", "003_ccc.png"]));

        assert_eq!(moved, 1);
        assert!(dir.path().join("001_aaa.png").exists());
        assert!(dir.path().join("003_ccc.png").exists());
        assert!(!dir.path().join("002_bbb.png").exists());
        let target = dir.path().join(DELETED_DIR).join(format!("{}.png", hash::md5_hex(b"b")));
        assert_eq!(fs::read(target).unwrap(), b"b");
    }

    #[test]
    fn nothing_stale_creates_no_deleted_dir() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("001_aaa.png"), b"a").unwrap();
        fs::write(dir.path().join(MARKER_FILE), "ID=1\n").unwrap();

        assert_eq!(reconcile(dir.path(), &expected(&["001_aaa.png"])), 0);
        assert!(!dir.path().join(DELETED_DIR).exists());
        assert!(dir.path().join(MARKER_FILE).exists());
    }

    #[test]
    fn subdirectories_are_ignored() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("extras")).unwrap();
        fs::write(dir.path().join("extras/keep.png"), b"k").unwrap();

        assert_eq!(reconcile(dir.path(), &BTreeSet::new()), 0);
        assert!(dir.path().join("extras/keep.png").exists());
    }

    #[test]
    fn identical_content_gets_numbered_suffixes() {
        let dir = TempDir::new().unwrap();
        for name in ["a.png", "b.png", "c.png"] {
            fs::write(dir.path().join(name), b"same").unwrap();
        }

        assert_eq!(reconcile(dir.path(), &BTreeSet::new()), 3);

        let md5 = hash::md5_hex(b"same");
        let deleted = dir.path().join(DELETED_DIR);
        assert!(deleted.join(format!("{md5}.png")).exists());
        assert!(deleted.join(format!("{md5}_1.png")).exists());
        assert!(deleted.join(format!("{md5}_2.png")).exists());
    }

    #[test]
    fn file_without_extension_keeps_bare_hash() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("README"), b"r").unwrap();

        assert_eq!(reconcile(dir.path(), &BTreeSet::new()), 1);
        assert!(dir.path().join(DELETED_DIR).join(hash::md5_hex(b"r")).exists());
    }

    #[test]
    fn leftover_partial_download_is_quarantined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("001_aaa.png.part"), b"half").unwrap();

        assert_eq!(reconcile(dir.path(), &expected(&["001_aaa.png"])), 1);
        let target = dir.path().join(DELETED_DIR).join(format!("{}.part", hash::md5_hex(b"half")));
        assert!(target.exists());
    }

    #[test]
    fn existing_quarantine_entry_is_not_overwritten() {
        let dir = TempDir::new().unwrap();
        let md5 = hash::md5_hex(b"x");
        fs::create_dir_all(dir.path().join(DELETED_DIR)).unwrap();
        fs::write(dir.path().join(DELETED_DIR).join(format!("{md5}.jpg")), b"older").unwrap();
        fs::write(dir.path().join("009_x.jpg"), b"x").unwrap();

        reconcile(dir.path(), &BTreeSet::new());

        let deleted = dir.path().join(DELETED_DIR);
        assert_eq!(fs::read(deleted.join(format!("{md5}.jpg"))).unwrap(), b"older");
        assert_eq!(fs::read(deleted.join(format!("{md5}_1.jpg"))).unwrap(), b"x");
    }

    #[test]
    fn blocked_deleted_dir_leaves_files_and_reports_zero() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(DELETED_DIR), b"not a directory").unwrap();
        fs::write(dir.path().join("002_bbb.png"), b"b").unwrap();

        assert_eq!(reconcile(dir.path(), &BTreeSet::new()), 0);
        assert!(dir.path().join("002_bbb.png").exists());
    }

    #[test]
    fn missing_directory_reports_zero() {
        let dir = TempDir::new().unwrap();
        assert_eq!(reconcile(&dir.path().join("gone"), &BTreeSet::new()), 0);
    }
}
