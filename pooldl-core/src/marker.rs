//! The `.poolinfo` marker stored in every synced pool directory.
//!
//! Plain `key=value` lines, minimally `ID=<pool id>`. Written once, when a
//! pool is first synced by id; read back when a run is pointed at the
//! directory instead. Writes use the `.tmp` + rename pattern.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::error::{io_err, CoreError};
use crate::types::PoolId;

/// File name of the marker inside a pool directory.
pub const MARKER_FILE: &str = ".poolinfo";

const ID_KEY: &str = "ID";

/// `<dir>/.poolinfo` (pure, no I/O).
pub fn marker_path_at(dir: &Path) -> PathBuf {
    dir.join(MARKER_FILE)
}

/// Parse `key=value` lines. Blank lines and `;`/`#` comments are ignored,
/// values may be wrapped in double quotes.
pub fn parse(contents: &str) -> BTreeMap<String, String> {
    contents
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with(';') && !l.starts_with('#'))
        .filter_map(|l| l.split_once('='))
        .map(|(k, v)| {
            let v = v.trim();
            let v = v
                .strip_prefix('"')
                .and_then(|v| v.strip_suffix('"'))
                .unwrap_or(v);
            (k.trim().to_string(), v.to_string())
        })
        .collect()
}

/// Read the pool id recorded in `<dir>/.poolinfo`.
///
/// Returns [`CoreError::MarkerNotFound`] if the file is absent and
/// [`CoreError::MarkerMissingId`] if it has no parseable `ID=` line.
pub fn read_pool_id_at(dir: &Path) -> Result<PoolId, CoreError> {
    let path = marker_path_at(dir);
    let contents = match std::fs::read_to_string(&path) {
        Ok(c) => c,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(CoreError::MarkerNotFound { path });
        }
        Err(e) => return Err(io_err(&path, e)),
    };
    parse(&contents)
        .get(ID_KEY)
        .and_then(|v| v.parse::<PoolId>().ok())
        .filter(|id| id.0 != 0)
        .ok_or(CoreError::MarkerMissingId { path })
}

/// Write `<dir>/.poolinfo` with `ID=<id>` unless it already exists.
///
/// Returns `true` when the marker was created.
pub fn write_if_absent_at(dir: &Path, id: PoolId) -> Result<bool, CoreError> {
    let path = marker_path_at(dir);
    if path.exists() {
        return Ok(false);
    }
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, format!("{ID_KEY}={id}\n")).map_err(|e| io_err(&tmp, e))?;
    if let Err(e) = std::fs::rename(&tmp, &path) {
        let _ = std::fs::remove_file(&tmp);
        return Err(io_err(&path, e));
    }
    tracing::debug!("wrote marker: {}", path.display());
    Ok(true)
}
