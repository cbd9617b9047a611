use std::sync::Arc;

use lms_core::domain::{
    entities::subscriptions::InsertSubscriptionEntity,
    repositories::{courses::CourseRepository, subscriptions::SubscriptionRepository},
    value_objects::{
        access_policy::Actor,
        subscriptions::{SubscriptionMessageDto, ToggleOutcome, ToggleSubscriptionModel},
    },
};
use tracing::{error, info};

use crate::usecases::errors::{REQUIRED_FIELD, UseCaseError, UseCaseResult};

pub struct SubscriptionUseCase<S, C>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    subscription_repo: Arc<S>,
    course_repo: Arc<C>,
}

impl<S, C> SubscriptionUseCase<S, C>
where
    S: SubscriptionRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    pub fn new(subscription_repo: Arc<S>, course_repo: Arc<C>) -> Self {
        Self {
            subscription_repo,
            course_repo,
        }
    }

    /// Subscribes the actor to the course, or unsubscribes them if they
    /// already are.
    pub async fn toggle(
        &self,
        actor: Actor,
        model: ToggleSubscriptionModel,
    ) -> UseCaseResult<SubscriptionMessageDto> {
        let user_id = actor.user_id;
        let Some(course_id) = model.course_id else {
            return Err(UseCaseError::field("course_id", REQUIRED_FIELD));
        };

        let course = self.course_repo.find_by_id(course_id).await.map_err(|err| {
            error!(%user_id, %course_id, db_error = ?err, "subscriptions: failed to load course");
            UseCaseError::Internal(err)
        })?;
        if course.is_none() {
            return Err(UseCaseError::NotFound("course"));
        }

        let existing = self
            .subscription_repo
            .find(user_id, course_id)
            .await
            .map_err(|err| {
                error!(
                    %user_id,
                    %course_id,
                    db_error = ?err,
                    "subscriptions: failed to look up subscription"
                );
                UseCaseError::Internal(err)
            })?;

        let outcome = match existing {
            Some(_) => {
                self.subscription_repo
                    .unsubscribe(user_id, course_id)
                    .await
                    .map_err(|err| {
                        error!(
                            %user_id,
                            %course_id,
                            db_error = ?err,
                            "subscriptions: failed to unsubscribe"
                        );
                        UseCaseError::Internal(err)
                    })?;
                ToggleOutcome::Removed
            }
            None => {
                self.subscription_repo
                    .subscribe(InsertSubscriptionEntity { user_id, course_id })
                    .await
                    .map_err(|err| {
                        error!(
                            %user_id,
                            %course_id,
                            db_error = ?err,
                            "subscriptions: failed to subscribe"
                        );
                        UseCaseError::Internal(err)
                    })?;
                ToggleOutcome::Added
            }
        };

        info!(%user_id, %course_id, outcome = outcome.as_str(), "subscriptions: toggled");
        Ok(outcome.into())
    }
}
