//! Security event models

use crate::audit::models::non_blank;
use crate::correlation::RequestContext;
use crate::query::{DayRange, Filter, SortRegistry, Sortable};
use chrono::{DateTime, NaiveDate, SubsecRound, Utc};
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use tally_common::TallyError;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityEventType {
    LoginSuccess,
    LoginFailed,
    AccessDenied,
    TokenIssued,
    Logout,
}

impl SecurityEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "LoginSuccess",
            Self::LoginFailed => "LoginFailed",
            Self::AccessDenied => "AccessDenied",
            Self::TokenIssued => "TokenIssued",
            Self::Logout => "Logout",
        }
    }
}

impl std::fmt::Display for SecurityEventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecurityEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "loginsuccess" => Ok(Self::LoginSuccess),
            "loginfailed" => Ok(Self::LoginFailed),
            "accessdenied" => Ok(Self::AccessDenied),
            "tokenissued" => Ok(Self::TokenIssued),
            "logout" => Ok(Self::Logout),
            other => Err(format!("Unknown security event type '{}'", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SecurityOutcome {
    Success,
    Failed,
    Denied,
}

impl SecurityOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "Success",
            Self::Failed => "Failed",
            Self::Denied => "Denied",
        }
    }
}

impl std::fmt::Display for SecurityOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SecurityOutcome {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "failed" => Ok(Self::Failed),
            "denied" => Ok(Self::Denied),
            other => Err(format!("Unknown security outcome '{}'", other)),
        }
    }
}

/// One authentication or authorization outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecurityEvent {
    pub id: Uuid,
    pub event_type: SecurityEventType,
    pub user_id: Option<Uuid>,
    pub user_email: Option<String>,
    pub outcome: SecurityOutcome,
    pub detail: Option<String>,
    pub timestamp: DateTime<Utc>,
    pub correlation_id: String,
    pub http_method: Option<String>,
    pub request_path: Option<String>,
    pub client_ip: Option<String>,
    pub user_agent: Option<String>,
}

impl SecurityEvent {
    pub fn new(
        event_type: SecurityEventType,
        outcome: SecurityOutcome,
        context: &RequestContext,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            user_id: None,
            user_email: None,
            outcome,
            detail: None,
            timestamp: Utc::now().trunc_subsecs(6),
            correlation_id: context.correlation_id.clone(),
            http_method: context.http_method.clone(),
            request_path: context.request_path.clone(),
            client_ip: context.client_ip.clone(),
            user_agent: context.user_agent.clone(),
        }
    }

    pub fn with_user(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.user_email = Some(email.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl Sortable for SecurityEvent {
    fn sort_registry() -> &'static SortRegistry<Self> {
        static REGISTRY: OnceLock<SortRegistry<SecurityEvent>> = OnceLock::new();
        REGISTRY.get_or_init(|| {
            SortRegistry::new()
                .field("timestamp", "timestamp", |e: &SecurityEvent| e.timestamp.into())
                .field("eventType", "event_type", |e: &SecurityEvent| {
                    e.event_type.as_str().into()
                })
                .field("outcome", "outcome", |e: &SecurityEvent| e.outcome.as_str().into())
                .field("userEmail", "user_email", |e: &SecurityEvent| {
                    e.user_email.as_deref().into()
                })
        })
    }
}

// ============================================================================
// Query parameters
// ============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityEventQueryParams {
    pub event_type: Option<String>,
    pub outcome: Option<String>,
    pub user_id: Option<Uuid>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SecurityEventQuery {
    pub event_type: Option<SecurityEventType>,
    pub outcome: Option<SecurityOutcome>,
    pub user_id: Option<Uuid>,
    pub range: DayRange,
}

impl SecurityEventQuery {
    pub fn to_filter(&self) -> Filter<SecurityEvent> {
        let range = self.range;
        Filter::new()
            .eq(self.event_type, |e: &SecurityEvent| e.event_type)
            .eq(self.outcome, |e: &SecurityEvent| e.outcome)
            .eq(self.user_id.map(Some), |e: &SecurityEvent| e.user_id)
            .with(move |e: &SecurityEvent| range.contains(e.timestamp))
    }
}

impl TryFrom<SecurityEventQueryParams> for SecurityEventQuery {
    type Error = TallyError;

    fn try_from(params: SecurityEventQueryParams) -> Result<Self, Self::Error> {
        let event_type = non_blank(params.event_type)
            .map(|t| t.parse::<SecurityEventType>())
            .transpose()
            .map_err(TallyError::parse)?;
        let outcome = non_blank(params.outcome)
            .map(|o| o.parse::<SecurityOutcome>())
            .transpose()
            .map_err(TallyError::parse)?;

        Ok(Self {
            event_type,
            outcome,
            user_id: params.user_id,
            range: DayRange::new(params.start_date, params.end_date)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_copies_context() {
        let context = RequestContext {
            correlation_id: "c-1".into(),
            http_method: Some("POST".into()),
            request_path: Some("/api/v1/auth/login".into()),
            client_ip: None,
            user_agent: Some("test".into()),
        };
        let event = SecurityEvent::new(SecurityEventType::LoginFailed, SecurityOutcome::Failed, &context)
            .with_email("a@b.c")
            .with_detail("invalid credentials");

        assert_eq!(event.correlation_id, "c-1");
        assert_eq!(event.request_path.as_deref(), Some("/api/v1/auth/login"));
        assert_eq!(event.user_email.as_deref(), Some("a@b.c"));
        assert!(event.user_id.is_none());
    }

    #[test]
    fn test_parse_event_type_and_outcome() {
        assert_eq!(
            "accessDenied".parse::<SecurityEventType>().unwrap(),
            SecurityEventType::AccessDenied
        );
        assert_eq!("DENIED".parse::<SecurityOutcome>().unwrap(), SecurityOutcome::Denied);
        assert!("Blocked".parse::<SecurityOutcome>().is_err());
    }

    #[test]
    fn test_filter_by_outcome() {
        let context = RequestContext::new("c");
        let events = vec![
            SecurityEvent::new(SecurityEventType::LoginSuccess, SecurityOutcome::Success, &context),
            SecurityEvent::new(SecurityEventType::LoginFailed, SecurityOutcome::Failed, &context),
        ];
        let query = SecurityEventQuery::try_from(SecurityEventQueryParams {
            outcome: Some("failed".into()),
            ..Default::default()
        })
        .unwrap();

        let matched = query.to_filter().apply(events);
        assert_eq!(matched.len(), 1);
        assert_eq!(matched[0].event_type, SecurityEventType::LoginFailed);
    }
}
