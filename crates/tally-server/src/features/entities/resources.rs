//! Per-entity filters and wiring

use super::{EntityResource, OperationNames};
use crate::error::AppError;
use crate::features::FeatureState;
use crate::lifecycle::SoftDeleteLifecycle;
use crate::models::{Budget, Category, Expense};
use crate::query::Filter;
use chrono::NaiveDate;
use serde::Deserialize;
use uuid::Uuid;

fn check_bounds<T: PartialOrd + std::fmt::Display>(
    name: &str,
    min: Option<T>,
    max: Option<T>,
) -> Result<(), AppError> {
    if let (Some(min), Some(max)) = (&min, &max) {
        if min > max {
            return Err(AppError::Validation(format!(
                "min{} ({}) cannot be greater than max{} ({})",
                name, min, name, max
            )));
        }
    }
    Ok(())
}

// ============================================================================
// Expenses
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseFilterParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,
    pub category_id: Option<Uuid>,
}

impl EntityResource for Expense {
    type Params = ExpenseFilterParams;

    const OPERATIONS: OperationNames = OperationNames {
        list: "ListExpenses",
        list_deleted: "ListDeletedExpenses",
        delete: "DeleteExpense",
        restore: "RestoreExpense",
    };

    fn lifecycle(state: &FeatureState) -> &SoftDeleteLifecycle<Self> {
        &state.expenses
    }

    fn filter(params: Self::Params) -> Result<Filter<Self>, AppError> {
        check_bounds("Amount", params.min_amount, params.max_amount)?;
        check_bounds("Date", params.start_date, params.end_date)?;

        Ok(Filter::new()
            .range(params.start_date, params.end_date, |e: &Expense| e.spent_on)
            .range(params.min_amount, params.max_amount, |e: &Expense| e.amount)
            .eq(params.category_id, |e: &Expense| e.category_id))
    }
}

// ============================================================================
// Budgets
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetFilterParams {
    /// Budgets that end on or after this date
    pub start_date: Option<NaiveDate>,
    /// Budgets that start on or before this date
    pub end_date: Option<NaiveDate>,
    pub min_amount: Option<i64>,
    pub max_amount: Option<i64>,
    pub category_id: Option<Uuid>,
}

impl EntityResource for Budget {
    type Params = BudgetFilterParams;

    const OPERATIONS: OperationNames = OperationNames {
        list: "ListBudgets",
        list_deleted: "ListDeletedBudgets",
        delete: "DeleteBudget",
        restore: "RestoreBudget",
    };

    fn lifecycle(state: &FeatureState) -> &SoftDeleteLifecycle<Self> {
        &state.budgets
    }

    fn filter(params: Self::Params) -> Result<Filter<Self>, AppError> {
        check_bounds("Amount", params.min_amount, params.max_amount)?;
        check_bounds("Date", params.start_date, params.end_date)?;

        // A budget matches when its period overlaps the requested window
        Ok(Filter::new()
            .range(params.start_date, None, |b: &Budget| b.end_date)
            .range(None, params.end_date, |b: &Budget| b.start_date)
            .range(params.min_amount, params.max_amount, |b: &Budget| b.limit_amount)
            .eq(params.category_id, |b: &Budget| b.category_id))
    }
}

// ============================================================================
// Categories
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryFilterParams {
    pub is_system: Option<bool>,
    /// Only categories owned by this user
    pub user_id: Option<Uuid>,
}

impl EntityResource for Category {
    type Params = CategoryFilterParams;

    const OPERATIONS: OperationNames = OperationNames {
        list: "ListCategories",
        list_deleted: "ListDeletedCategories",
        delete: "DeleteCategory",
        restore: "RestoreCategory",
    };

    fn lifecycle(state: &FeatureState) -> &SoftDeleteLifecycle<Self> {
        &state.categories
    }

    fn filter(params: Self::Params) -> Result<Filter<Self>, AppError> {
        Ok(Filter::new()
            .eq(params.is_system, |c: &Category| c.is_system)
            .eq(params.user_id.map(Some), |c: &Category| c.user_id))
    }
}
