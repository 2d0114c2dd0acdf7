//! Domain types for pool synchronization.
//!
//! Identifiers are numeric newtypes; wire-format concerns (the API's JSON
//! shapes) live in `pooldl-sync` and are normalized into these types before
//! any sync logic sees them.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Newtypes
// ---------------------------------------------------------------------------

/// Identifier of a remote pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PoolId(pub u64);

impl fmt::Display for PoolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PoolId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl FromStr for PoolId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.trim().parse().map(Self)
    }
}

/// Identifier of a single post. Unique within a pool's post list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PostId(pub u64);

impl fmt::Display for PostId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl From<u64> for PostId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

// ---------------------------------------------------------------------------
// Domain structs
// ---------------------------------------------------------------------------

/// A pool as returned by the lookup endpoint, normalized.
///
/// `post_ids` order is authoritative: it defines the 1-based numbering of
/// the files written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSummary {
    pub id: PoolId,
    pub name: String,
    pub post_ids: Vec<PostId>,
    pub image_count: u64,
}

/// A resolved post. Immutable once resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostRecord {
    pub id: PostId,
    pub file_url: Option<String>,
    pub md5: Option<String>,
    pub extension: Option<String>,
}

impl PostRecord {
    /// The downloadable file of this post, if the record carries both a
    /// URL and a content hash.
    pub fn file(&self) -> Option<PostFile<'_>> {
        let url = self.file_url.as_deref().filter(|u| !u.is_empty())?;
        let md5 = self.md5.as_deref().filter(|m| !m.is_empty())?;
        let extension = self.extension.as_deref().unwrap_or_default();
        Some(PostFile {
            url,
            md5,
            extension,
        })
    }
}

/// Borrowed view of a post's file metadata.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PostFile<'a> {
    pub url: &'a str,
    pub md5: &'a str,
    pub extension: &'a str,
}

impl PostFile<'_> {
    /// On-disk name (`{index:03}_{md5}.{ext}`) for the post at 1-based
    /// position `index` in the pool.
    pub fn file_name(&self, index: usize) -> String {
        numbered_file_name(index, self.md5, self.extension)
    }
}

/// Build the canonical local file name for a pool entry.
pub fn numbered_file_name(index: usize, md5: &str, extension: &str) -> String {
    if extension.is_empty() {
        format!("{index:03}_{md5}")
    } else {
        format!("{index:03}_{md5}.{extension}")
    }
}

/// Turn a pool name into a directory name.
///
/// Drops every character outside `[A-Za-z0-9_]`, turns underscores into
/// spaces and collapses runs of whitespace. Returns `None` when nothing
/// usable remains.
pub fn sanitize_pool_name(name: &str) -> Option<String> {
    let kept: String = name
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '_')
        .map(|c| if c == '_' { ' ' } else { c })
        .collect();
    let collapsed = kept.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        None
    } else {
        Some(collapsed)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
