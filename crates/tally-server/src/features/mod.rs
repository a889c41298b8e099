//! Feature modules implementing the Tally API
//!
//! Each feature is a vertical slice: its operations (commands and queries)
//! plus the axum routes that dispatch them.
//!
//! # Features
//!
//! - **entities**: filtered, sorted and paged listings of categories, budgets
//!   and expenses, plus soft delete and restore
//! - **audit_logs**: audit trail queries, per-entity timelines and exports
//! - **security_events**: security event queries
//! - **auth**: login, recorded in the security event log

pub mod audit_logs;
pub mod auth;
pub mod entities;
pub mod security_events;
pub mod shared;

use crate::audit::{AuditRecordFactory, AuditTrail, SensitiveFieldMasker};
use crate::cqrs::Dispatcher;
use crate::export::ExportRenderer;
use crate::identity::IdentityProvider;
use crate::lifecycle::SoftDeleteLifecycle;
use crate::metrics::OperationMetrics;
use crate::models::{Budget, Category, Expense};
use crate::security::SecurityEventRecorder;
use crate::store::Stores;
use axum::Router;
use std::sync::Arc;

pub use shared::auth::{CurrentUser, USER_ID_HEADER};

/// Shared state for all feature routes
#[derive(Clone)]
pub struct FeatureState {
    pub dispatcher: Dispatcher,
    pub audit: AuditTrail,
    pub security: SecurityEventRecorder,
    pub categories: SoftDeleteLifecycle<Category>,
    pub budgets: SoftDeleteLifecycle<Budget>,
    pub expenses: SoftDeleteLifecycle<Expense>,
    pub identity: Option<Arc<dyn IdentityProvider>>,
    pub exporter: Option<Arc<dyn ExportRenderer>>,
}

impl FeatureState {
    pub fn new(stores: Stores, masker: SensitiveFieldMasker, metrics: Arc<OperationMetrics>) -> Self {
        let audit = AuditTrail::new(stores.audit, AuditRecordFactory::new(masker));

        Self {
            dispatcher: Dispatcher::new(metrics),
            security: SecurityEventRecorder::new(stores.security),
            categories: SoftDeleteLifecycle::new(stores.categories, audit.clone()),
            budgets: SoftDeleteLifecycle::new(stores.budgets, audit.clone()),
            expenses: SoftDeleteLifecycle::new(stores.expenses, audit.clone()),
            audit,
            identity: None,
            exporter: None,
        }
    }

    pub fn with_identity(mut self, identity: Arc<dyn IdentityProvider>) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_exporter(mut self, exporter: Arc<dyn ExportRenderer>) -> Self {
        self.exporter = Some(exporter);
        self
    }
}

/// Creates the API router with all feature routes mounted
///
/// - `/expenses`, `/budgets`, `/categories` - entity listings and lifecycle
/// - `/audit-logs` - audit trail; `/audit-logs/export` only with a renderer
/// - `/security-events` - security event log
/// - `/auth` - login, only with an identity provider
pub fn router(state: FeatureState) -> Router<()> {
    let router = Router::new()
        .nest("/expenses", entities::entity_routes::<Expense>())
        .nest("/budgets", entities::entity_routes::<Budget>())
        .nest("/categories", entities::entity_routes::<Category>())
        .nest(
            "/audit-logs",
            audit_logs::audit_log_routes(state.exporter.is_some()),
        )
        .nest("/security-events", security_events::security_event_routes());

    let router = if state.identity.is_some() {
        router.nest("/auth", auth::auth_routes())
    } else {
        tracing::info!("No identity provider configured, login routes not mounted");
        router
    };

    router.with_state(state)
}
