//! Interpreting what the user typed (or passed on the command line).
//!
//! Accepted forms:
//!
//! ```text
//! 1234                              bare pool id
//! https://e621.net/pools/1234       pool URL
//! https://e621.net/pool/show/1234   legacy pool URL
//! ./My Pool                         directory holding a .poolinfo marker
//! ```

use std::path::{Path, PathBuf};

use crate::error::CoreError;
use crate::marker;
use crate::types::PoolId;

/// URL path segments that precede a pool id.
const POOL_URL_MARKERS: &[&str] = &["/pools/", "/pool/show/"];

/// What a run should synchronize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PoolTarget {
    /// Sync by id into `<cwd>/<pool name>/`.
    Id(PoolId),
    /// Re-sync a previously synced directory; the id comes from its marker.
    Directory(PathBuf),
}

impl PoolTarget {
    /// Parse raw user input. Does not touch the marker file yet.
    pub fn parse(input: &str) -> Result<Self, CoreError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(CoreError::InvalidInput("no pool given".to_string()));
        }

        if let Ok(id) = input.parse::<PoolId>() {
            return Ok(Self::Id(id));
        }

        if let Some(rest) = POOL_URL_MARKERS
            .iter()
            .find_map(|m| input.find(m).map(|at| &input[at + m.len()..]))
        {
            let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
            let terminated = rest[digits.len()..]
                .chars()
                .next()
                .map_or(true, |c| matches!(c, '/' | '?' | '#'));
            if !digits.is_empty() && terminated {
                if let Ok(id) = digits.parse::<PoolId>() {
                    return Ok(Self::Id(id));
                }
            }
            return Err(CoreError::InvalidInput(format!(
                "cannot find a pool id in '{input}'"
            )));
        }

        let path = Path::new(input);
        if path.is_dir() {
            return Ok(Self::Directory(path.to_path_buf()));
        }

        Err(CoreError::InvalidInput(format!(
            "'{input}' is neither a pool id, a pool URL nor a directory"
        )))
    }

    /// Resolve the pool id, reading the marker for [`PoolTarget::Directory`].
    pub fn pool_id(&self) -> Result<PoolId, CoreError> {
        match self {
            Self::Id(id) => Ok(*id),
            Self::Directory(dir) => marker::read_pool_id_at(dir),
        }
    }
}
