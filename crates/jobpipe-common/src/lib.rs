//! Jobpipe Common Library
//!
//! Shared building blocks for the jobpipe workspace members.
//!
//! - **Error Handling**: [`JobpipeError`] and the crate-wide [`Result`] alias
//! - **Content Hashing**: stable digests of posting descriptions used for dedup
//! - **Logging**: environment-driven `tracing` subscriber setup
//!
//! # Example
//!
//! ```no_run
//! use jobpipe_common::content_hash::description_hash;
//! use jobpipe_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     init_logging(&LogConfig::from_env()?)?;
//!     let hash = description_hash("Graduate analyst, Mumbai");
//!     tracing::info!(?hash, "hashed description");
//!     Ok(())
//! }
//! ```

#![deny(clippy::unwrap_used, clippy::expect_used)]

pub mod content_hash;
pub mod error;
pub mod logging;

pub use error::{JobpipeError, Result};
