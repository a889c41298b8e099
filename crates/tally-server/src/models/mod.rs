//! Domain models
//!
//! Categories, budgets and expenses are owner-scoped and soft-deletable: a
//! delete flips [`SoftDeleteState`] instead of removing the row, and only the
//! owning user can bring the row back.

use crate::query::{SortRegistry, Sortable};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use std::sync::OnceLock;
use uuid::Uuid;

/// Kinds of entity that appear in the audit trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityName {
    Category,
    Budget,
    Expense,
    User,
}

impl EntityName {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Category => "Category",
            Self::Budget => "Budget",
            Self::Expense => "Expense",
            Self::User => "User",
        }
    }
}

impl std::fmt::Display for EntityName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for EntityName {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "category" => Ok(Self::Category),
            "budget" => Ok(Self::Budget),
            "expense" => Ok(Self::Expense),
            "user" => Ok(Self::User),
            other => Err(format!("Unknown entity name '{}'", other)),
        }
    }
}

/// Deletion marker shared by every soft-deletable entity
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SoftDeleteState {
    pub is_deleted: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub deleted_by: Option<Uuid>,
}

impl SoftDeleteState {
    pub fn mark_deleted(&mut self, actor: Uuid, at: DateTime<Utc>) {
        self.is_deleted = true;
        self.deleted_at = Some(at);
        self.deleted_by = Some(actor);
    }

    /// Clears all three fields together
    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Which side of the soft-delete boundary a read targets
///
/// The two scopes never overlap: an entity is visible through exactly one of
/// them at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Normal reads: not deleted, owned by the caller (or shared/system-owned)
    Active,
    /// Deleted rows owned by the caller
    Deleted,
}

impl Scope {
    pub fn admits<E: SoftDeletable>(&self, entity: &E, user_id: Uuid) -> bool {
        match self {
            Scope::Active => {
                !entity.deletion().is_deleted
                    && entity.owner_id().map_or(true, |owner| owner == user_id)
            },
            Scope::Deleted => {
                entity.deletion().is_deleted && entity.owner_id() == Some(user_id)
            },
        }
    }
}

/// An owner-scoped entity whose delete is reversible
pub trait SoftDeletable: Clone + Serialize + Send + Sync + 'static {
    const ENTITY: EntityName;

    fn id(&self) -> Uuid;

    /// Owning user; `None` for shared system rows nobody may delete
    fn owner_id(&self) -> Option<Uuid>;

    fn deletion(&self) -> &SoftDeleteState;

    fn deletion_mut(&mut self) -> &mut SoftDeleteState;
}

/// Expense category; system categories have no owner
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub name: String,
    pub is_system: bool,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub deletion: SoftDeleteState,
}

impl Category {
    pub fn new(user_id: Option<Uuid>, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            name: name.into(),
            is_system: user_id.is_none(),
            created_at: Utc::now(),
            deletion: SoftDeleteState::default(),
        }
    }
}

/// Spending limit for a category over a date range
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Budget {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    /// Limit in minor currency units
    pub limit_amount: i64,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub deletion: SoftDeleteState,
}

/// A single spend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub user_id: Uuid,
    pub category_id: Uuid,
    pub description: String,
    /// Amount in minor currency units
    pub amount: i64,
    pub spent_on: NaiveDate,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    #[sqlx(flatten)]
    pub deletion: SoftDeleteState,
}

impl Expense {
    pub fn new(
        user_id: Uuid,
        category_id: Uuid,
        description: impl Into<String>,
        amount: i64,
        spent_on: NaiveDate,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            category_id,
            description: description.into(),
            amount,
            spent_on,
            created_at: Utc::now(),
            deletion: SoftDeleteState::default(),
        }
    }
}

impl SoftDeletable for Category {
    const ENTITY: EntityName = EntityName::Category;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Option<Uuid> {
        self.user_id
    }

    fn deletion(&self) -> &SoftDeleteState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.deletion
    }
}

impl SoftDeletable for Budget {
    const ENTITY: EntityName = EntityName::Budget;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Option<Uuid> {
        Some(self.user_id)
    }

    fn deletion(&self) -> &SoftDeleteState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.deletion
    }
}

impl SoftDeletable for Expense {
    const ENTITY: EntityName = EntityName::Expense;

    fn id(&self) -> Uuid {
        self.id
    }

    fn owner_id(&self) -> Option<Uuid> {
        Some(self.user_id)
    }

    fn deletion(&self) -> &SoftDeleteState {
        &self.deletion
    }

    fn deletion_mut(&mut self) -> &mut SoftDeleteState {
        &mut self.deletion
    }
}

// ============================================================================
// Sort registries
// ============================================================================

// Text keys sort case-folded in byte order on both backends
const CASE_FOLDED_NAME: &str = "lower(name) COLLATE \"C\"";
const CASE_FOLDED_DESCRIPTION: &str = "lower(description) COLLATE \"C\"";

impl Sortable for Category {
    fn sort_registry() -> &'static SortRegistry<Self> {
        static REGISTRY: OnceLock<SortRegistry<Category>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            SortRegistry::new()
                .field("name", CASE_FOLDED_NAME, |c: &Category| c.name.to_lowercase().into())
                .field("isSystem", "is_system", |c: &Category| c.is_system.into())
                .field("createdAt", "created_at", |c: &Category| c.created_at.into())
        })
    }
}

impl Sortable for Budget {
    fn sort_registry() -> &'static SortRegistry<Self> {
        static REGISTRY: OnceLock<SortRegistry<Budget>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            SortRegistry::new()
                .field("name", CASE_FOLDED_NAME, |b: &Budget| b.name.to_lowercase().into())
                .field("limitAmount", "limit_amount", |b: &Budget| b.limit_amount.into())
                .field("startDate", "start_date", |b: &Budget| b.start_date.into())
                .field("endDate", "end_date", |b: &Budget| b.end_date.into())
                .field("createdAt", "created_at", |b: &Budget| b.created_at.into())
        })
    }
}

impl Sortable for Expense {
    fn sort_registry() -> &'static SortRegistry<Self> {
        static REGISTRY: OnceLock<SortRegistry<Expense>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            SortRegistry::new()
                .field("amount", "amount", |e: &Expense| e.amount.into())
                .field("description", CASE_FOLDED_DESCRIPTION, |e: &Expense| {
                    e.description.to_lowercase().into()
                })
                .field("spentOn", "spent_on", |e: &Expense| e.spent_on.into())
                .field("createdAt", "created_at", |e: &Expense| e.created_at.into())
                .field("deletedAt", "deleted_at", |e: &Expense| e.deletion.deleted_at.into())
        })
    }
}
