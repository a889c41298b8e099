//! Entity API routes
//!
//! Mounted once per entity kind:
//!
//! - `GET /api/v1/{kind}` - active rows, filtered, sorted and paged
//! - `GET /api/v1/{kind}/deleted` - the caller's deleted rows
//! - `DELETE /api/v1/{kind}/:id` - soft delete
//! - `POST /api/v1/{kind}/:id/restore` - restore

use super::{
    commands::{self, DeleteEntityCommand, RestoreEntityCommand},
    queries::{self, ListEntitiesQuery},
    EntityResource,
};
use crate::api::response::ApiResponse;
use crate::correlation::{RequestCancellation, RequestContext};
use crate::error::ApiResult;
use crate::features::{CurrentUser, FeatureState};
use crate::models::Scope;
use crate::query::{PageRequest, PageResult};
use axum::{
    extract::{Path, Query, State},
    routing::{delete, get, post},
    Router,
};
use uuid::Uuid;

// ============================================================================
// Router Configuration
// ============================================================================

pub fn entity_routes<E: EntityResource>() -> Router<FeatureState> {
    Router::new()
        .route("/", get(list_active::<E>))
        .route("/deleted", get(list_deleted::<E>))
        .route("/:id", delete(delete_entity::<E>))
        .route("/:id/restore", post(restore_entity::<E>))
}

// ============================================================================
// Query Handlers (Read Operations)
// ============================================================================

/// List active rows
///
/// # Query Parameters
///
/// - `page`, `pageSize`, `sortBy`, `sortDesc`
/// - entity filters, e.g. `startDate`, `endDate`, `minAmount`, `maxAmount`,
///   `categoryId`
///
/// # Response
///
/// - `200 OK` - one page of rows
/// - `400 Bad Request` - malformed filter
/// - `401 Unauthorized` - missing `x-user-id`
async fn list_active<E: EntityResource>(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    cancellation: RequestCancellation,
    Query(page): Query<PageRequest>,
    Query(params): Query<E::Params>,
) -> ApiResult<ApiResponse<PageResult<E>>> {
    list_scoped(state, user_id, Scope::Active, cancellation, page, params).await
}

/// List the caller's deleted rows
///
/// Accepts the same parameters as the active listing.
async fn list_deleted<E: EntityResource>(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    cancellation: RequestCancellation,
    Query(page): Query<PageRequest>,
    Query(params): Query<E::Params>,
) -> ApiResult<ApiResponse<PageResult<E>>> {
    list_scoped(state, user_id, Scope::Deleted, cancellation, page, params).await
}

async fn list_scoped<E: EntityResource>(
    state: FeatureState,
    user_id: Uuid,
    scope: Scope,
    cancellation: RequestCancellation,
    page: PageRequest,
    params: E::Params,
) -> ApiResult<ApiResponse<PageResult<E>>> {
    let filter = E::filter(params)?;
    let query = ListEntitiesQuery::<E>::new(user_id, scope, page);

    state
        .dispatcher
        .query(&query, cancellation.token(), queries::handle(&state, &query, &filter))
        .await
        .map(ApiResponse::success)
}

// ============================================================================
// Command Handlers (Write Operations)
// ============================================================================

/// Soft-delete a row owned by the caller
///
/// # Response
///
/// - `200 OK` - the row as it is now, with `is_deleted: true`
/// - `403 Forbidden` - the caller does not own the row
/// - `404 Not Found` - unknown id, or already deleted
#[tracing::instrument(skip(state, context, cancellation), fields(entity = %E::ENTITY))]
async fn delete_entity<E: EntityResource>(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    context: RequestContext,
    cancellation: RequestCancellation,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<E>> {
    let command = DeleteEntityCommand::<E>::new(id, user_id);

    state
        .dispatcher
        .send(
            &command,
            cancellation.token(),
            commands::handle_delete(&state, &command, &context),
        )
        .await
        .map(ApiResponse::success)
}

/// Restore a deleted row owned by the caller
///
/// # Response
///
/// - `200 OK` - the restored row
/// - `403 Forbidden` - the caller does not own the row
/// - `404 Not Found` - unknown id, or not deleted
#[tracing::instrument(skip(state, context, cancellation), fields(entity = %E::ENTITY))]
async fn restore_entity<E: EntityResource>(
    State(state): State<FeatureState>,
    CurrentUser(user_id): CurrentUser,
    context: RequestContext,
    cancellation: RequestCancellation,
    Path(id): Path<Uuid>,
) -> ApiResult<ApiResponse<E>> {
    let command = RestoreEntityCommand::<E>::new(id, user_id);

    state
        .dispatcher
        .send(
            &command,
            cancellation.token(),
            commands::handle_restore(&state, &command, &context),
        )
        .await
        .map(ApiResponse::success)
}
