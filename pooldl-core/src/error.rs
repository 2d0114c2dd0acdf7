//! Error types for pooldl-core.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised while interpreting user input, the `.poolinfo` marker or
/// the configuration file. All of them are fatal and happen before any
/// network activity.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The pool identifier supplied by the user is unusable.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A directory was given but it holds no `.poolinfo` marker.
    #[error("provided directory does not contain pool info file: {path}")]
    MarkerNotFound { path: PathBuf },

    /// The marker exists but carries no usable `ID=` line.
    #[error("info file does not contain pool ID: {path}")]
    MarkerMissingId { path: PathBuf },

    /// Underlying I/O failure, with the offending path.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Config file parse error, with path and serde_yaml's line context.
    #[error("failed to parse config at {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// `dirs::home_dir()` returned `None`.
    #[error("cannot determine home directory; set $HOME or equivalent")]
    HomeNotFound,
}

/// Convenience constructor for [`CoreError::Io`].
pub(crate) fn io_err(path: impl Into<PathBuf>, source: std::io::Error) -> CoreError {
    CoreError::Io {
        path: path.into(),
        source,
    }
}
