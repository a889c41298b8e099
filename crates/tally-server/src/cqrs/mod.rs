//! Operation dispatch
//!
//! Use cases are plain structs implementing [`Operation`]. Commands change
//! state and queries read it; both go through the [`Dispatcher`], which
//! times the ones that opt in via [`Trackable`] and counts their failures.

pub mod middleware;

pub use middleware::{Command, Dispatcher, MetricsDecorator, Operation, Query, Trackable};
