//! One synchronization run, from user input to reconciled directory.
//!
//! ```text
//! Init -> PoolResolved -> [Prefetching] -> Synchronizing -> Reconciling -> Done
//!   \-> NotFound (clean exit)
//! ```
//!
//! Fatal errors (invalid input, invalid API payloads, failed API calls)
//! abort the run at whatever phase they occur.

use std::fmt;
use std::path::{Path, PathBuf};

use pooldl_core::{marker, types::sanitize_pool_name, Config, PoolId, PoolSummary, PoolTarget};

use crate::api::Endpoints;
use crate::client::{Fetch, HttpFetcher, RemoteClient};
use crate::error::{io_err, SyncError};
use crate::rate_limit::Clock;
use crate::reconciler;
use crate::report::Reporter;
use crate::resolver::PostResolver;
use crate::synchronizer;

/// Phase of a run, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Init,
    PoolResolved,
    Prefetching,
    Synchronizing,
    Reconciling,
    Done,
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::PoolResolved => "pool-resolved",
            Self::Prefetching => "prefetching",
            Self::Synchronizing => "synchronizing",
            Self::Reconciling => "reconciling",
            Self::Done => "done",
        };
        f.write_str(s)
    }
}

/// Inputs of a run.
#[derive(Debug, Clone)]
pub struct RunOptions {
    pub target: PoolTarget,
    /// Parent of new pool directories when the target is an id.
    pub work_dir: PathBuf,
    pub prefetch: bool,
}

/// Counts reported at the end of a successful run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunSummary {
    pub pool: PoolSummary,
    pub download_dir: PathBuf,
    pub downloaded: usize,
    pub failed: usize,
    pub removed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// The pool does not exist or has no posts. Nothing was touched.
    NotFound { pool_id: PoolId },
    Synced(RunSummary),
}

/// Directory a pool is synchronized into.
///
/// A directory target is used as is. For an id target the directory is
/// `work_dir/<sanitized name>`, or `work_dir/<id>` when nothing of the
/// name survives sanitizing; it is created and receives a marker.
pub fn prepare_download_dir(
    target: &PoolTarget,
    work_dir: &Path,
    pool: &PoolSummary,
) -> Result<PathBuf, SyncError> {
    let dir = match target {
        PoolTarget::Directory(dir) => return Ok(dir.clone()),
        PoolTarget::Id(_) => {
            let name = sanitize_pool_name(&pool.name).unwrap_or_else(|| pool.id.to_string());
            work_dir.join(name)
        }
    };
    std::fs::create_dir_all(&dir).map_err(|e| io_err(&dir, e))?;
    if marker::write_if_absent_at(&dir, pool.id)? {
        tracing::info!("wrote marker in {}", dir.display());
    }
    Ok(dir)
}

/// Run one synchronization pass with an existing resolver.
pub fn run<F, C>(
    resolver: &mut PostResolver<F, C>,
    options: &RunOptions,
    reporter: &mut dyn Reporter,
) -> Result<RunOutcome, SyncError>
where
    F: Fetch,
    C: Clock,
{
    reporter.phase(RunPhase::Init);
    let pool_id = options.target.pool_id()?;
    tracing::debug!("run: pool {pool_id}, prefetch={}", options.prefetch);

    let Some(pool) = resolver.resolve_pool(pool_id)? else {
        reporter.pool_not_found(pool_id);
        return Ok(RunOutcome::NotFound { pool_id });
    };

    let download_dir = prepare_download_dir(&options.target, &options.work_dir, &pool)?;
    reporter.phase(RunPhase::PoolResolved);
    reporter.pool_resolved(&pool, &download_dir);

    if options.prefetch {
        reporter.phase(RunPhase::Prefetching);
        let cached = resolver.prefetch_all(&pool.post_ids, |page, pages| {
            reporter.prefetch_page(page, pages);
        })?;
        tracing::debug!("prefetched {cached} posts");
    }

    reporter.phase(RunPhase::Synchronizing);
    let synced = synchronizer::sync_pool(resolver, &pool, &download_dir, reporter)?;

    reporter.phase(RunPhase::Reconciling);
    let removed = reconciler::reconcile(&download_dir, &synced.expected_files);

    reporter.phase(RunPhase::Done);
    tracing::info!(
        "pool {pool_id}: downloaded {}, failed {}, removed {removed}",
        synced.downloaded,
        synced.failed
    );
    Ok(RunOutcome::Synced(RunSummary {
        pool,
        download_dir,
        downloaded: synced.downloaded,
        failed: synced.failed,
        removed,
    }))
}

/// Run one pass against the configured API over HTTP.
pub fn run_with_config(
    config: &Config,
    options: &RunOptions,
    reporter: &mut dyn Reporter,
) -> Result<RunOutcome, SyncError> {
    // Bad input must fail before the HTTP stack is even built.
    options.target.pool_id()?;

    let fetcher = HttpFetcher::from_config(config)?;
    let mut resolver = PostResolver::new(RemoteClient::new(fetcher), Endpoints::new(&config.api_url));
    run(&mut resolver, options, reporter)
}
