//! Error types for pooldl-sync.

use std::path::PathBuf;

use thiserror::Error;

use pooldl_core::CoreError;

/// A single HTTP transfer failed.
///
/// For API calls the caller turns this into a fatal [`SyncError::Fetch`];
/// for file downloads it is recorded per post and the run continues.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The server answered with a non-success status.
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Timeout, DNS failure, refused connection and the like.
    #[error("transport error for {url}: {message}")]
    Transport { url: String, message: String },

    /// The connection broke while the body was being read.
    #[error("I/O error reading {url}: {source}")]
    Body {
        url: String,
        #[source]
        source: std::io::Error,
    },

    /// The TLS connector could not be built.
    #[error("TLS setup failed: {0}")]
    Tls(#[from] native_tls::Error),
}

/// All fatal errors of a sync run.
///
/// Per-post problems (missing post, fileless post, failed download) are not
/// errors; they are reported as `PostOutcome`s.
#[derive(Debug, Error)]
pub enum SyncError {
    /// An API response was not structured data of the expected shape.
    #[error("empty or invalid result from the API ({url}): {reason}")]
    EmptyUpstream { url: String, reason: String },

    /// An API request could not be completed.
    #[error("API request failed: {0}")]
    Fetch(#[from] FetchError),

    /// More ids than one batch lookup accepts. Indicates a chunking bug.
    #[error("prefetch batch of {len} ids exceeds the limit of {max}")]
    PrefetchOverflow { len: usize, max: usize },

    /// An I/O error, with annotated path for context.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input, marker or config error from pooldl-core.
    #[error(transparent)]
    Core(#[from] CoreError),
}

/// Convenience constructor for [`SyncError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> SyncError {
    SyncError::Io {
        path: path.into(),
        source,
    }
}

/// Convenience constructor for [`SyncError::EmptyUpstream`].
pub(crate) fn upstream_err(url: &str, reason: impl std::fmt::Display) -> SyncError {
    SyncError::EmptyUpstream {
        url: url.to_string(),
        reason: reason.to_string(),
    }
}
