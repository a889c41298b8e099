//! Tally Server Library
//!
//! HTTP service for personal expense tracking, built around a request-scoped
//! observability pipeline.
//!
//! # Overview
//!
//! - **Correlation**: every request carries a correlation ID, taken from
//!   `X-Correlation-ID` or minted, echoed back and stamped on every span,
//!   audit record and security event
//! - **Audit trail**: masked before/after snapshots of every soft delete and
//!   restore, with an integrity hash per record
//! - **Security log**: login outcomes, token issuance and access denials
//! - **Dynamic queries**: filter, sort and paginate any entity listing
//! - **Metrics**: per-operation duration and outcome counters in Prometheus
//!   format at `/metrics`
//!
//! # Architecture
//!
//! ## CQRS Pattern
//!
//! - **Commands** (write operations): soft delete, restore, login
//! - **Queries** (read operations): entity listings, audit and security
//!   event queries, exports
//!
//! Both go through the [`cqrs::Dispatcher`], which times the operations that
//! opt in through [`cqrs::Trackable`].
//!
//! ## Best-effort writes
//!
//! Audit and security writes never fail the request that triggered them.
//! They report a [`best_effort::BestEffort`] instead of an error.
//!
//! ## Framework Stack
//!
//! - **Axum**: web framework
//! - **SQLx**: PostgreSQL persistence and migrations
//! - **Tower**: middleware and service abstractions
//! - **Prometheus**: operation metrics
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tally_server::{
//!     api, audit::SensitiveFieldMasker, config::Config, features::FeatureState,
//!     metrics::OperationMetrics, store::Stores,
//! };
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load()?;
//!     let metrics = Arc::new(OperationMetrics::new()?);
//!     let state = FeatureState::new(Stores::in_memory(), SensitiveFieldMasker::default(), metrics);
//!     let app = api::create_router(state, &config.cors, None);
//!     let listener = tokio::net::TcpListener::bind("127.0.0.1:8000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod audit;
pub mod best_effort;
pub mod config;
pub mod correlation;
pub mod cqrs;
pub mod db;
pub mod error;
pub mod export;
pub mod features;
pub mod identity;
pub mod lifecycle;
pub mod metrics;
pub mod middleware;
pub mod models;
pub mod query;
pub mod retention;
pub mod security;
pub mod store;

// Re-export commonly used types
pub use best_effort::BestEffort;
pub use correlation::RequestContext;
pub use error::{ApiResult, AppError};
