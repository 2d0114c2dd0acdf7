//! Hash-gated download of a pool's files.
//!
//! ## Per-post protocol
//!
//! 1. Resolve the post (cache first). Missing / fileless posts are skipped
//!    but still consume their index.
//! 2. Derive the target name `{index:03}_{md5}.{ext}`.
//! 3. Hash the file on disk, if any, and compare with the post's MD5.
//! 4. On mismatch or absence, download and write to `<name>.part`.
//! 5. Rename to the final name.
//! 6. Record the name in the expected set, whatever happened in 3–5.
//!
//! Download and write failures are per-post outcomes, never errors. Only
//! API-level failures abort the pass.

use std::collections::BTreeSet;
use std::io;
use std::path::{Path, PathBuf};

use pooldl_core::{PoolSummary, PostId};

use crate::client::{Fetch, ProgressSink};
use crate::error::SyncError;
use crate::hash;
use crate::rate_limit::Clock;
use crate::report::Reporter;
use crate::resolver::{PostResolver, Resolution};

/// Suffix of in-flight downloads.
pub const PARTIAL_SUFFIX: &str = ".part";

// ---------------------------------------------------------------------------
// Outcomes
// ---------------------------------------------------------------------------

/// What happened to one post of the pool.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostOutcome {
    /// The post no longer exists upstream.
    Missing { index: usize, post_id: PostId },
    /// The post exists but exposes no file; authentication might be required.
    Fileless { index: usize, post_id: PostId },
    /// The file was absent or stale and has been downloaded.
    Downloaded {
        index: usize,
        post_id: PostId,
        file_name: String,
    },
    /// The file on disk already matches the post's hash.
    Unchanged {
        index: usize,
        post_id: PostId,
        file_name: String,
    },
    /// Downloading or writing the file failed.
    Failed {
        index: usize,
        post_id: PostId,
        file_name: String,
        reason: String,
    },
}

impl PostOutcome {
    pub fn index(&self) -> usize {
        match self {
            Self::Missing { index, .. }
            | Self::Fileless { index, .. }
            | Self::Downloaded { index, .. }
            | Self::Unchanged { index, .. }
            | Self::Failed { index, .. } => *index,
        }
    }

    /// The target file name, for posts that resolved to a file.
    pub fn file_name(&self) -> Option<&str> {
        match self {
            Self::Missing { .. } | Self::Fileless { .. } => None,
            Self::Downloaded { file_name, .. }
            | Self::Unchanged { file_name, .. }
            | Self::Failed { file_name, .. } => Some(file_name),
        }
    }
}

/// Result of one synchronization pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncResult {
    pub downloaded: usize,
    pub failed: usize,
    pub outcomes: Vec<PostOutcome>,
    /// File names that correctly represent the pool after this pass.
    pub expected_files: BTreeSet<String>,
}

impl SyncResult {
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PostOutcome::Missing { .. } | PostOutcome::Fileless { .. }))
            .count()
    }

    pub fn unchanged(&self) -> usize {
        self.outcomes
            .iter()
            .filter(|o| matches!(o, PostOutcome::Unchanged { .. }))
            .count()
    }

    fn push(&mut self, outcome: PostOutcome) {
        match &outcome {
            PostOutcome::Downloaded { .. } => self.downloaded += 1,
            PostOutcome::Failed { .. } => self.failed += 1,
            _ => {}
        }
        if let Some(name) = outcome.file_name() {
            self.expected_files.insert(name.to_string());
        }
        self.outcomes.push(outcome);
    }
}

// ---------------------------------------------------------------------------
// sync_pool
// ---------------------------------------------------------------------------

/// Bridges client byte progress to [`Reporter::download_progress`].
struct ReporterProgress<'a, R: Reporter + ?Sized> {
    reporter: &'a mut R,
    index: usize,
}

impl<R: Reporter + ?Sized> ProgressSink for ReporterProgress<'_, R> {
    fn report(&mut self, total: u64, transferred: u64) -> io::Result<()> {
        self.reporter.download_progress(self.index, total, transferred)
    }
}

/// `true` when `path` is absent or its content does not hash to `md5`.
fn needs_download(path: &Path, md5: &str) -> bool {
    if !path.exists() {
        return true;
    }
    match hash::file_matches(path, md5) {
        Ok(matches) => !matches,
        Err(e) => {
            tracing::warn!("cannot hash {}: {e}; downloading again", path.display());
            true
        }
    }
}

/// Write `bytes` to `<path>.part`, then rename over `path`.
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = PathBuf::from(format!("{}{PARTIAL_SUFFIX}", path.display()));
    write_atomic_with_tmp(path, bytes, &tmp)
}

fn write_atomic_with_tmp(path: &Path, bytes: &[u8], tmp: &Path) -> io::Result<()> {
    std::fs::write(tmp, bytes)?;
    if let Err(e) = std::fs::rename(tmp, path) {
        let _ = std::fs::remove_file(tmp);
        return Err(e);
    }
    Ok(())
}

/// Synchronize every post of `pool` into `download_dir`, in pool order.
///
/// `download_dir` must exist. Returns counts, per-post outcomes and the
/// expected-file set for the reconciler.
pub fn sync_pool<F, C>(
    resolver: &mut PostResolver<F, C>,
    pool: &PoolSummary,
    download_dir: &Path,
    reporter: &mut dyn Reporter,
) -> Result<SyncResult, SyncError>
where
    F: Fetch,
    C: Clock,
{
    let total = pool.post_ids.len();
    let mut result = SyncResult::default();

    for (i, post_id) in pool.post_ids.iter().copied().enumerate() {
        let index = i + 1;
        reporter.post_started(index, total, post_id);

        let outcome = match resolver.resolve_post(post_id)? {
            Resolution::Missing => {
                tracing::info!("#{index} post {post_id}: does not exist");
                PostOutcome::Missing { index, post_id }
            }
            Resolution::Fileless => {
                tracing::info!("#{index} post {post_id}: no file url");
                PostOutcome::Fileless { index, post_id }
            }
            Resolution::Found(record) => {
                // `Found` records always carry a file.
                let Some(file) = record.file() else {
                    let outcome = PostOutcome::Fileless { index, post_id };
                    reporter.post_finished(&outcome);
                    result.push(outcome);
                    continue;
                };
                let file_name = file.file_name(index);
                let path = download_dir.join(&file_name);

                if !needs_download(&path, file.md5) {
                    tracing::debug!("unchanged: {}", path.display());
                    PostOutcome::Unchanged {
                        index,
                        post_id,
                        file_name,
                    }
                } else {
                    reporter.download_started(index, post_id);
                    let mut progress = ReporterProgress {
                        reporter: &mut *reporter,
                        index,
                    };
                    let sink: &mut dyn ProgressSink = &mut progress;
                    let fetched = resolver.client_mut().download(file.url, Some(sink));

                    match fetched.map_err(|e| e.to_string()).and_then(|bytes| {
                        let actual = hash::md5_hex(&bytes);
                        if !actual.eq_ignore_ascii_case(file.md5) {
                            tracing::warn!(
                                "post {post_id}: downloaded content hashes to {actual}, expected {}",
                                file.md5
                            );
                        }
                        write_atomic(&path, &bytes).map_err(|e| format!("{}: {e}", path.display()))
                    }) {
                        Ok(()) => {
                            tracing::info!("wrote: {}", path.display());
                            PostOutcome::Downloaded {
                                index,
                                post_id,
                                file_name,
                            }
                        }
                        Err(reason) => {
                            tracing::warn!("#{index} post {post_id}: download failed: {reason}");
                            PostOutcome::Failed {
                                index,
                                post_id,
                                file_name,
                                reason,
                            }
                        }
                    }
                }
            }
        };

        reporter.post_finished(&outcome);
        result.push(outcome);
    }

    Ok(result)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
