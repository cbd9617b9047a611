pub mod courses;
pub mod errors;
pub mod lessons;
pub mod payments;
pub mod subscriptions;
pub mod tokens;
pub mod users;

use lms_core::domain::value_objects::access_policy::{Action, Actor, ResourceKind, is_allowed};
use tracing::warn;
use uuid::Uuid;

use errors::{UseCaseError, UseCaseResult};

pub(crate) fn authorize(
    actor: &Actor,
    kind: ResourceKind,
    action: Action,
    owner_id: Uuid,
) -> UseCaseResult<()> {
    if is_allowed(actor, kind, action, owner_id) {
        return Ok(());
    }

    warn!(
        user_id = %actor.user_id,
        role = %actor.role,
        resource = ?kind,
        action = ?action,
        %owner_id,
        "access_policy: request denied"
    );
    Err(UseCaseError::Forbidden)
}
