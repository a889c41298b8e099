//! Entity listings

use super::EntityResource;
use crate::cqrs::{Operation, Query, Trackable};
use crate::error::AppError;
use crate::features::FeatureState;
use crate::models::Scope;
use crate::query::{self, Filter, PageRequest, PageResult};
use std::marker::PhantomData;
use uuid::Uuid;

/// List one side of the soft-delete boundary for the acting user
#[derive(Debug)]
pub struct ListEntitiesQuery<E> {
    pub user_id: Uuid,
    pub scope: Scope,
    pub page: PageRequest,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityResource> ListEntitiesQuery<E> {
    pub fn new(user_id: Uuid, scope: Scope, page: PageRequest) -> Self {
        Self {
            user_id,
            scope,
            page,
            _entity: PhantomData,
        }
    }
}

impl<E: EntityResource> Trackable for ListEntitiesQuery<E> {
    fn operation_name(&self) -> &'static str {
        match self.scope {
            Scope::Active => E::OPERATIONS.list,
            Scope::Deleted => E::OPERATIONS.list_deleted,
        }
    }
}

impl<E: EntityResource> Operation for ListEntitiesQuery<E> {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl<E: EntityResource> Query for ListEntitiesQuery<E> {}

#[tracing::instrument(skip(state, filter), fields(entity = %E::ENTITY))]
pub async fn handle<E: EntityResource>(
    state: &FeatureState,
    query: &ListEntitiesQuery<E>,
    filter: &Filter<E>,
) -> Result<PageResult<E>, AppError> {
    let rows = E::lifecycle(state).list(query.user_id, query.scope).await?;
    let page = query::run(rows, filter, &query.page);

    tracing::debug!(
        total = page.total_count,
        returned = page.items.len(),
        "Listed entities"
    );
    Ok(page)
}
