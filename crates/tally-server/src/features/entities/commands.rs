//! Soft delete and restore

use super::EntityResource;
use crate::correlation::RequestContext;
use crate::cqrs::{Command, Operation, Trackable};
use crate::error::AppError;
use crate::features::FeatureState;
use crate::lifecycle::LifecycleError;
use crate::security::{SecurityEvent, SecurityEventType, SecurityOutcome};
use std::marker::PhantomData;
use uuid::Uuid;

#[derive(Debug)]
pub struct DeleteEntityCommand<E> {
    pub id: Uuid,
    pub user_id: Uuid,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityResource> DeleteEntityCommand<E> {
    pub fn new(id: Uuid, user_id: Uuid) -> Self {
        Self {
            id,
            user_id,
            _entity: PhantomData,
        }
    }
}

impl<E: EntityResource> Trackable for DeleteEntityCommand<E> {
    fn operation_name(&self) -> &'static str {
        E::OPERATIONS.delete
    }
}

impl<E: EntityResource> Operation for DeleteEntityCommand<E> {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl<E: EntityResource> Command for DeleteEntityCommand<E> {}

#[derive(Debug)]
pub struct RestoreEntityCommand<E> {
    pub id: Uuid,
    pub user_id: Uuid,
    _entity: PhantomData<fn() -> E>,
}

impl<E: EntityResource> RestoreEntityCommand<E> {
    pub fn new(id: Uuid, user_id: Uuid) -> Self {
        Self {
            id,
            user_id,
            _entity: PhantomData,
        }
    }
}

impl<E: EntityResource> Trackable for RestoreEntityCommand<E> {
    fn operation_name(&self) -> &'static str {
        E::OPERATIONS.restore
    }
}

impl<E: EntityResource> Operation for RestoreEntityCommand<E> {
    fn as_trackable(&self) -> Option<&dyn Trackable> {
        Some(self)
    }
}

impl<E: EntityResource> Command for RestoreEntityCommand<E> {}

/// Record a failed ownership check in the security log
async fn record_denial<E: EntityResource>(
    state: &FeatureState,
    user_id: Uuid,
    id: Uuid,
    action: &str,
    context: &RequestContext,
) {
    let event = SecurityEvent::new(SecurityEventType::AccessDenied, SecurityOutcome::Denied, context)
        .with_user(user_id)
        .with_detail(format!("{} {} {}", action, E::ENTITY, id));
    let _ = state.security.record(event).await;
}

pub async fn handle_delete<E: EntityResource>(
    state: &FeatureState,
    command: &DeleteEntityCommand<E>,
    context: &RequestContext,
) -> Result<E, AppError> {
    match E::lifecycle(state)
        .delete(command.id, command.user_id, context)
        .await
    {
        Ok(entity) => Ok(entity),
        Err(err @ LifecycleError::Forbidden { .. }) => {
            record_denial::<E>(state, command.user_id, command.id, "delete", context).await;
            Err(err.into())
        },
        Err(err) => Err(err.into()),
    }
}

pub async fn handle_restore<E: EntityResource>(
    state: &FeatureState,
    command: &RestoreEntityCommand<E>,
    context: &RequestContext,
) -> Result<E, AppError> {
    match E::lifecycle(state)
        .restore(command.id, command.user_id, context)
        .await
    {
        Ok(entity) => Ok(entity),
        Err(err @ LifecycleError::Forbidden { .. }) => {
            record_denial::<E>(state, command.user_id, command.id, "restore", context).await;
            Err(err.into())
        },
        Err(err) => Err(err.into()),
    }
}
