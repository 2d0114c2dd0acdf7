//! pooldl core library: domain types, user input, the `.poolinfo` marker
//! and configuration.
//!
//! - [`types`]: identifiers, pool and post records, file naming
//! - [`input`]: [`PoolTarget`] parsing
//! - [`marker`]: `.poolinfo` read / write
//! - [`config`]: [`Config`] load / save
//! - [`error`]: [`CoreError`]

pub mod config;
pub mod error;
pub mod input;
pub mod marker;
pub mod types;

pub use config::{Config, Credentials};
pub use error::CoreError;
pub use input::PoolTarget;
pub use types::{PoolId, PoolSummary, PostFile, PostId, PostRecord};
