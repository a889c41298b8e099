//! Shared harness for router-level integration tests
//!
//! Builds the full application router over in-memory stores, with handles to
//! the concrete stores so tests can seed rows, inspect what was written and
//! simulate outages.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Method, Request, Response, StatusCode},
    Router,
};
use chrono::{Duration, NaiveDate, Utc};
use serde_json::Value;
use std::sync::Arc;
use tally_common::TallyError;
use tally_server::{
    api,
    audit::{AuditRecord, SensitiveFieldMasker},
    config::CorsConfig,
    correlation::CORRELATION_HEADER,
    export::{ExportFormat, ExportRenderer, RenderedExport},
    features::{FeatureState, USER_ID_HEADER},
    identity::{AuthenticatedUser, IdentityError, IdentityProvider, IssuedToken},
    metrics::OperationMetrics,
    models::{Budget, Category, Expense},
    store::{MemoryAuditStore, MemoryEntityStore, MemorySecurityEventStore, Stores},
};
use tower::ServiceExt;
use uuid::Uuid;

pub const TEST_EMAIL: &str = "ana@example.com";
pub const TEST_PASSWORD: &str = "correct horse";

pub struct TestApp {
    pub router: Router,
    pub audit: Arc<MemoryAuditStore>,
    pub security: Arc<MemorySecurityEventStore>,
    pub categories: Arc<MemoryEntityStore<Category>>,
    pub budgets: Arc<MemoryEntityStore<Budget>>,
    pub expenses: Arc<MemoryEntityStore<Expense>>,
    pub metrics: Arc<OperationMetrics>,
    pub user: Uuid,
}

impl TestApp {
    /// Full application with a fixed identity provider and a line renderer
    pub fn new() -> Self {
        Self::build(true)
    }

    /// Application as the binary starts it: no identity provider or renderer
    pub fn without_integrations() -> Self {
        Self::build(false)
    }

    fn build(integrations: bool) -> Self {
        let audit = Arc::new(MemoryAuditStore::new());
        let security = Arc::new(MemorySecurityEventStore::new());
        let categories = Arc::new(MemoryEntityStore::<Category>::new());
        let budgets = Arc::new(MemoryEntityStore::<Budget>::new());
        let expenses = Arc::new(MemoryEntityStore::<Expense>::new());
        let metrics = Arc::new(OperationMetrics::new().unwrap());
        let user = Uuid::new_v4();

        let stores = Stores {
            audit: audit.clone(),
            security: security.clone(),
            categories: categories.clone(),
            budgets: budgets.clone(),
            expenses: expenses.clone(),
        };
        let mut state = FeatureState::new(stores, SensitiveFieldMasker::default(), metrics.clone());
        if integrations {
            state = state
                .with_identity(Arc::new(FixedIdentity { user }))
                .with_exporter(Arc::new(LineRenderer));
        }
        let cors = CorsConfig {
            allowed_origins: vec!["http://localhost:3000".to_string()],
            allow_credentials: true,
        };

        Self {
            router: api::create_router(state, &cors, None),
            audit,
            security,
            categories,
            budgets,
            expenses,
            metrics,
            user,
        }
    }

    /// Insert `count` expenses for the test user, amounts 1..=count,
    /// one per day starting 2024-01-01
    pub async fn seed_expenses(&self, count: i64) -> Vec<Expense> {
        let category = Uuid::new_v4();
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let mut rows = Vec::new();
        for n in 1..=count {
            let expense = Expense::new(
                self.user,
                category,
                format!("expense {}", n),
                n,
                start + Duration::days(n - 1),
            );
            self.expenses.insert(expense.clone()).await;
            rows.push(expense);
        }
        rows
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    /// Send a request as the test user and decode the JSON body
    pub async fn call(&self, method: Method, uri: &str) -> (StatusCode, Value) {
        self.call_as(self.user, method, uri).await
    }

    pub async fn call_as(&self, user: Uuid, method: Method, uri: &str) -> (StatusCode, Value) {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, user.to_string())
            .body(Body::empty())
            .unwrap();
        let response = self.send(request).await;
        let status = response.status();
        (status, json_body(response).await)
    }
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn json_body(response: Response<Body>) -> Value {
    let bytes = body_bytes(response).await;
    if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    }
}

pub fn request_with_correlation(method: Method, uri: &str, user: Uuid, correlation: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_ID_HEADER, user.to_string())
        .header(CORRELATION_HEADER, correlation)
        .body(Body::empty())
        .unwrap()
}

/// Accepts exactly one email/password pair
pub struct FixedIdentity {
    pub user: Uuid,
}

#[async_trait]
impl IdentityProvider for FixedIdentity {
    async fn authenticate(
        &self,
        email: &str,
        password: &str,
    ) -> Result<AuthenticatedUser, IdentityError> {
        if email == TEST_EMAIL && password == TEST_PASSWORD {
            Ok(AuthenticatedUser {
                id: self.user,
                email: email.to_string(),
            })
        } else {
            Err(IdentityError::InvalidCredentials)
        }
    }

    async fn issue_token(&self, user: &AuthenticatedUser) -> Result<IssuedToken, IdentityError> {
        Ok(IssuedToken {
            access_token: format!("token-for-{}", user.id),
            token_type: "Bearer".to_string(),
            expires_at: Utc::now() + Duration::hours(1),
        })
    }
}

/// Renders one line per record: `entity_name,entity_id,action`
pub struct LineRenderer;

impl ExportRenderer for LineRenderer {
    fn render(
        &self,
        format: ExportFormat,
        records: &[AuditRecord],
    ) -> Result<RenderedExport, TallyError> {
        let body: String = records
            .iter()
            .map(|r| format!("{},{},{}\n", r.entity_name, r.entity_id, r.action))
            .collect();
        Ok(RenderedExport {
            bytes: body.into_bytes(),
            file_name: format!("audit-logs.{}", format.as_str()),
        })
    }
}
