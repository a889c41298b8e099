//! Tally Common Library
#![deny(clippy::unwrap_used, clippy::expect_used)]
//!
//! Shared error handling, logging initialisation and hashing helpers for the
//! Tally workspace.
//!
//! # Overview
//!
//! - **Error Handling**: [`TallyError`] and the [`Result`] alias
//! - **Logging**: [`logging::LogConfig`] and [`logging::init_logging`]
//! - **Integrity**: SHA-256 digests used to make persisted records tamper-evident
//!
//! # Example
//!
//! ```no_run
//! use tally_common::logging::{init_logging, LogConfig};
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = LogConfig::from_env()?;
//!     init_logging(&config)?;
//!     tracing::info!("ready");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod integrity;
pub mod logging;

pub use error::{Result, TallyError};
