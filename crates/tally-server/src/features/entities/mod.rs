//! Soft-deletable entity slices
//!
//! Categories, budgets and expenses share one set of generic operations and
//! routes. What differs per entity (its filter parameters, metric names and
//! which lifecycle in [`FeatureState`] serves it) is captured by
//! [`EntityResource`].

pub mod commands;
pub mod queries;
pub mod resources;
pub mod routes;

pub use commands::{DeleteEntityCommand, RestoreEntityCommand};
pub use queries::ListEntitiesQuery;
pub use resources::{BudgetFilterParams, CategoryFilterParams, ExpenseFilterParams};
pub use routes::entity_routes;

use super::FeatureState;
use crate::error::AppError;
use crate::lifecycle::SoftDeleteLifecycle;
use crate::models::SoftDeletable;
use crate::query::{Filter, Sortable};
use serde::de::DeserializeOwned;

/// Metric labels for an entity's operations
#[derive(Debug, Clone, Copy)]
pub struct OperationNames {
    pub list: &'static str,
    pub list_deleted: &'static str,
    pub delete: &'static str,
    pub restore: &'static str,
}

/// An entity exposed through the generic list/delete/restore routes
pub trait EntityResource: SoftDeletable + Sortable + std::fmt::Debug {
    /// Filter parameters accepted on list routes
    type Params: DeserializeOwned + std::fmt::Debug + Send + 'static;

    const OPERATIONS: OperationNames;

    fn lifecycle(state: &FeatureState) -> &SoftDeleteLifecycle<Self>;

    /// Validate the parameters and turn them into a filter
    fn filter(params: Self::Params) -> Result<Filter<Self>, AppError>;
}
