//! # pooldl-sync
//!
//! Pool synchronization: API access, post resolution, hash-gated downloads
//! and quarantine of stale files.
//!
//! Call [`run_with_config`] for a complete pass over HTTP, or build a
//! [`PostResolver`] around any [`Fetch`] implementation and call
//! [`pipeline::run`].

pub mod api;
pub mod client;
pub mod error;
pub mod hash;
pub mod pipeline;
pub mod rate_limit;
pub mod reconciler;
pub mod report;
pub mod resolver;
pub mod synchronizer;

pub use api::Endpoints;
pub use client::{Fetch, HttpFetcher, ProgressSink, RemoteClient};
pub use error::{FetchError, SyncError};
pub use pipeline::{run, run_with_config, RunOptions, RunOutcome, RunPhase, RunSummary};
pub use rate_limit::{Clock, RateLimiter, SystemClock};
pub use reconciler::reconcile;
pub use report::{NoopReporter, Reporter};
pub use resolver::{PostResolver, Resolution, PREFETCH_LIMIT};
pub use synchronizer::{sync_pool, PostOutcome, SyncResult};
