//! Progress hooks for a sync run.
//!
//! The library never prints. The CLI implements [`Reporter`] to render
//! console output; tests either ignore events ([`NoopReporter`]) or record
//! them.

use std::io;
use std::path::Path;

use pooldl_core::{PoolId, PoolSummary, PostId};

use crate::pipeline::RunPhase;
use crate::synchronizer::PostOutcome;

/// Observer of a run. Every hook has a no-op default.
pub trait Reporter {
    fn phase(&mut self, _phase: RunPhase) {}

    fn pool_not_found(&mut self, _pool_id: PoolId) {}

    fn pool_resolved(&mut self, _pool: &PoolSummary, _download_dir: &Path) {}

    /// Before each batch lookup (1-based `page` of `pages`).
    fn prefetch_page(&mut self, _page: usize, _pages: usize) {}

    /// Before post `index` (1-based, of `total`) is resolved.
    fn post_started(&mut self, _index: usize, _total: usize, _post_id: PostId) {}

    fn download_started(&mut self, _index: usize, _post_id: PostId) {}

    /// Byte progress of the current download. Errors are ignored by the
    /// transfer.
    fn download_progress(&mut self, _index: usize, _total: u64, _transferred: u64) -> io::Result<()> {
        Ok(())
    }

    fn post_finished(&mut self, _outcome: &PostOutcome) {}
}

/// Ignores every event.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopReporter;

impl Reporter for NoopReporter {}
