//! Audit data models

use crate::correlation::RequestContext;
use crate::models::EntityName;
use crate::query::{DayRange, Filter, SortRegistry, Sortable};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tally_common::integrity::{verify_digest, FieldDigest};
use tally_common::TallyError;
use uuid::Uuid;

/// State change recorded in the trail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AuditAction {
    Created,
    Updated,
    Deleted,
    Restored,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "Created",
            Self::Updated => "Updated",
            Self::Deleted => "Deleted",
            Self::Restored => "Restored",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "created" => Ok(Self::Created),
            "updated" => Ok(Self::Updated),
            "deleted" => Ok(Self::Deleted),
            "restored" => Ok(Self::Restored),
            other => Err(format!("Unknown audit action '{}'", other)),
        }
    }
}

/// Immutable record of one state change
///
/// Snapshots are stored as masked JSON text. `integrity_hash` covers every
/// other field, so any later edit to a persisted row is detectable with
/// [`AuditRecord::verify_integrity`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub id: Uuid,
    pub entity_name: EntityName,
    pub entity_id: Uuid,
    pub action: AuditAction,
    pub old_values: Option<String>,
    pub new_values: Option<String>,
    pub user_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub correlation_id: String,
    pub http_method: Option<String>,
    pub request_path: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
    pub integrity_hash: String,
}

impl AuditRecord {
    /// Digest over the canonical fields, excluding the stored hash itself
    pub fn compute_integrity_hash(&self) -> String {
        FieldDigest::new()
            .field(self.id.to_string())
            .field(self.entity_name.as_str())
            .field(self.entity_id.to_string())
            .field(self.action.as_str())
            .optional(self.old_values.as_deref())
            .optional(self.new_values.as_deref())
            .optional(self.user_id.map(|id| id.to_string()))
            .field(self.created_at.timestamp_micros().to_string())
            .field(&self.correlation_id)
            .optional(self.http_method.as_deref())
            .optional(self.request_path.as_deref())
            .optional(self.client_ip.as_deref())
            .optional(self.user_agent.as_deref())
            .finish()
    }

    pub fn verify_integrity(&self) -> tally_common::Result<()> {
        verify_digest(&self.integrity_hash, &self.compute_integrity_hash())
    }

    pub(crate) fn stamp_context(&mut self, context: &RequestContext) {
        self.correlation_id = context.correlation_id.clone();
        self.http_method = context.http_method.clone();
        self.request_path = context.request_path.clone();
        self.client_ip = context.client_ip.clone();
        self.user_agent = context.user_agent.clone();
    }
}

impl Sortable for AuditRecord {
    fn sort_registry() -> &'static SortRegistry<Self> {
        static REGISTRY: OnceLock<SortRegistry<AuditRecord>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            SortRegistry::new()
                .field("createdAt", "created_at", |r: &AuditRecord| r.created_at.into())
                .field("entityName", "entity_name", |r: &AuditRecord| {
                    r.entity_name.as_str().into()
                })
                .field("action", "action", |r: &AuditRecord| r.action.as_str().into())
                .field("userId", "user_id", |r: &AuditRecord| r.user_id.into())
        })
    }
}

// ============================================================================
// Query parameters
// ============================================================================

/// Raw audit filters from the query string
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditQueryParams {
    pub entity_name: Option<String>,
    pub entity_id: Option<Uuid>,
    pub action: Option<String>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Validated audit filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuditQuery {
    pub entity_name: Option<EntityName>,
    pub entity_id: Option<Uuid>,
    pub action: Option<AuditAction>,
    pub user_id: Option<Uuid>,
    pub range: DayRange,
}

impl AuditQuery {
    /// Timeline of a single entity
    pub fn for_entity(entity_name: EntityName, entity_id: Uuid) -> Self {
        Self {
            entity_name: Some(entity_name),
            entity_id: Some(entity_id),
            ..Default::default()
        }
    }

    /// In-memory equivalent of the SQL WHERE clause
    pub fn to_filter(&self) -> Filter<AuditRecord> {
        let range = self.range;
        Filter::new()
            .eq(self.entity_name, |r: &AuditRecord| r.entity_name)
            .eq(self.entity_id, |r: &AuditRecord| r.entity_id)
            .eq(self.action, |r: &AuditRecord| r.action)
            .eq(self.user_id.map(Some), |r: &AuditRecord| r.user_id)
            .with(move |r: &AuditRecord| range.contains(r.created_at))
    }
}

impl TryFrom<AuditQueryParams> for AuditQuery {
    type Error = TallyError;

    fn try_from(params: AuditQueryParams) -> Result<Self, Self::Error> {
        let entity_name = non_blank(params.entity_name)
            .map(|name| name.parse::<EntityName>())
            .transpose()
            .map_err(TallyError::parse)?;
        let action = non_blank(params.action)
            .map(|action| action.parse::<AuditAction>())
            .transpose()
            .map_err(TallyError::parse)?;

        Ok(Self {
            entity_name,
            entity_id: params.entity_id,
            action,
            user_id: params.user_id,
            range: DayRange::new(params.start_date, params.end_date)?,
        })
    }
}

pub(crate) fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
