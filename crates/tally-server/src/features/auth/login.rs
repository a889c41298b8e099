//! Login command
//!
//! Events are written independently and in call order: `LoginFailed` on a
//! rejected attempt, `LoginSuccess` followed by `TokenIssued` otherwise. A
//! security log outage never changes the outcome of the login itself.

use crate::api::response::ApiResponse;
use crate::correlation::{RequestCancellation, RequestContext};
use crate::cqrs::{Command, Operation, Trackable};
use crate::error::{ApiResult, AppError};
use crate::features::FeatureState;
use crate::identity::{AuthenticatedUser, IdentityError, IdentityProvider};
use crate::security::{SecurityEvent, SecurityEventRecorder, SecurityEventType, SecurityOutcome};
use axum::{extract::State, routing::post, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Deserialize)]
pub struct LoginCommand {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCommand")
            .field("email", &self.email)
            .field("password", &"***")
            .finish()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub user_id: Uuid,
    pub email: String,
    pub access_token: String,
    pub token_type: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, thiserror::Error)]
pub enum LoginError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    Rejected(IdentityError),

    #[error("Identity operation failed: {0}")]
    Identity(IdentityError),
}

impl From<LoginError> for AppError {
    fn from(err: LoginError) -> Self {
        match err {
            LoginError::Validation(msg) => AppError::Validation(msg),
            LoginError::Rejected(e) => AppError::Unauthorized(e.to_string()),
            LoginError::Identity(e) => AppError::IdentityOperation(e.to_string()),
        }
    }
}

impl Trackable for LoginCommand {
    fn operation_name(&self) -> &'static str {
        "Login"
    }
}

impl Operation for LoginCommand {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl Command for LoginCommand {}

impl LoginCommand {
    pub fn validate(&self) -> Result<(), LoginError> {
        let email = self.email.trim();
        if email.is_empty() || !email.contains('@') {
            return Err(LoginError::Validation("A valid email is required".to_string()));
        }
        if self.password.is_empty() {
            return Err(LoginError::Validation("Password is required".to_string()));
        }
        Ok(())
    }
}

#[tracing::instrument(skip(identity, recorder, context), fields(email = %command.email))]
pub async fn handle(
    identity: &dyn IdentityProvider,
    recorder: &SecurityEventRecorder,
    command: &LoginCommand,
    context: &RequestContext,
) -> Result<LoginResponse, LoginError> {
    command.validate()?;
    let email = command.email.trim();

    let user = match identity.authenticate(email, &command.password).await {
        Ok(user) => user,
        Err(err) => {
            let event =
                SecurityEvent::new(SecurityEventType::LoginFailed, SecurityOutcome::Failed, context)
                    .with_email(email)
                    .with_detail(err.to_string());
            recorder.record(event).await;

            tracing::warn!(error = %err, "Login rejected");
            return Err(match err {
                IdentityError::Unavailable(_) => LoginError::Identity(err),
                _ => LoginError::Rejected(err),
            });
        },
    };

    let success = user_event(SecurityEventType::LoginSuccess, SecurityOutcome::Success, &user, context);
    recorder.record(success).await;

    let token = match identity.issue_token(&user).await {
        Ok(token) => token,
        Err(err) => {
            let event =
                user_event(SecurityEventType::TokenIssued, SecurityOutcome::Failed, &user, context)
                    .with_detail(err.to_string());
            recorder.record(event).await;
            return Err(LoginError::Identity(err));
        },
    };

    let issued = user_event(SecurityEventType::TokenIssued, SecurityOutcome::Success, &user, context);
    recorder.record(issued).await;
    tracing::info!(user_id = %user.id, "Login succeeded");

    Ok(LoginResponse {
        user_id: user.id,
        email: user.email,
        access_token: token.access_token,
        token_type: token.token_type,
        expires_at: token.expires_at,
    })
}

fn user_event(
    event_type: SecurityEventType,
    outcome: SecurityOutcome,
    user: &AuthenticatedUser,
    context: &RequestContext,
) -> SecurityEvent {
    SecurityEvent::new(event_type, outcome, context)
        .with_user(user.id)
        .with_email(user.email.clone())
}

// ============================================================================
// Routes
// ============================================================================

pub fn auth_routes() -> Router<FeatureState> {
    Router::new().route("/login", post(login))
}

/// Log in with email and password
///
/// # Response
///
/// - `200 OK` - token issued
/// - `400 Bad Request` - malformed email or empty password
/// - `401 Unauthorized` - credentials rejected
/// - `500 Internal Server Error` - identity provider failure
async fn login(
    State(state): State<FeatureState>,
    context: RequestContext,
    cancellation: RequestCancellation,
    Json(command): Json<LoginCommand>,
) -> ApiResult<ApiResponse<LoginResponse>> {
    let identity = state
        .identity
        .clone()
        .ok_or_else(|| AppError::Internal("No identity provider configured".to_string()))?;
    let work = async {
        handle(identity.as_ref(), &state.security, &command, &context)
            .await
            .map_err(AppError::from)
    };

    state
        .dispatcher
        .send(&command, cancellation.token(), work)
        .await
        .map(ApiResponse::success)
}
