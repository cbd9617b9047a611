use std::sync::Arc;

use lms_core::{
    domain::{
        repositories::{courses::CourseRepository, subscriptions::SubscriptionRepository},
        value_objects::{
            access_policy::{Action, Actor, ResourceKind, list_scope},
            courses::{CourseDto, CourseModel},
        },
    },
    notifications::{MailSender, OutgoingEmail},
};
use tracing::{debug, error, info};
use uuid::Uuid;
use validator::Validate;

use crate::usecases::{
    authorize,
    errors::{UseCaseError, UseCaseResult},
};

pub struct CourseUseCase<C, S, M>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    course_repo: Arc<C>,
    subscription_repo: Arc<S>,
    mailer: Option<Arc<M>>,
}

impl<C, S, M> CourseUseCase<C, S, M>
where
    C: CourseRepository + Send + Sync + 'static,
    S: SubscriptionRepository + Send + Sync + 'static,
    M: MailSender + Send + Sync + 'static,
{
    pub fn new(course_repo: Arc<C>, subscription_repo: Arc<S>, mailer: Option<Arc<M>>) -> Self {
        Self {
            course_repo,
            subscription_repo,
            mailer,
        }
    }

    pub async fn list(&self, actor: Actor) -> UseCaseResult<Vec<CourseDto>> {
        let scope = list_scope(&actor, ResourceKind::Course);

        let courses = self
            .course_repo
            .list(scope.owner_filter())
            .await
            .map_err(|err| {
                error!(user_id = %actor.user_id, db_error = ?err, "courses: failed to list");
                UseCaseError::Internal(err)
            })?;

        Ok(courses.into_iter().map(CourseDto::from).collect())
    }

    pub async fn create(&self, actor: Actor, model: CourseModel) -> UseCaseResult<CourseDto> {
        authorize(&actor, ResourceKind::Course, Action::Create, actor.user_id)?;
        UseCaseError::require(&model.missing_required())?;
        model.validate()?;

        let course = self
            .course_repo
            .create(model.to_insert_entity(actor.user_id))
            .await
            .map_err(|err| {
                error!(user_id = %actor.user_id, db_error = ?err, "courses: failed to create");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, course_id = %course.id, "courses: created");
        Ok(course.into())
    }

    pub async fn retrieve(&self, actor: Actor, course_id: Uuid) -> UseCaseResult<CourseDto> {
        let course = self.load(course_id).await?;
        authorize(&actor, ResourceKind::Course, Action::Retrieve, course.owner)?;

        Ok(course)
    }

    /// `partial = false` is a full replacement and needs every required field.
    pub async fn update(
        &self,
        actor: Actor,
        course_id: Uuid,
        model: CourseModel,
        partial: bool,
    ) -> UseCaseResult<CourseDto> {
        let current = self.load(course_id).await?;
        authorize(&actor, ResourceKind::Course, Action::Update, current.owner)?;

        if !partial {
            UseCaseError::require(&model.missing_required())?;
        }
        model.validate()?;

        let changes = model.to_update_entity();
        if changes.is_empty() {
            return Ok(current);
        }

        let course = self
            .course_repo
            .update(course_id, changes)
            .await
            .map_err(|err| {
                error!(%course_id, db_error = ?err, "courses: failed to update");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, %course_id, "courses: updated");
        Ok(course.into())
    }

    pub async fn delete(&self, actor: Actor, course_id: Uuid) -> UseCaseResult<()> {
        let current = self.load(course_id).await?;
        authorize(&actor, ResourceKind::Course, Action::Delete, current.owner)?;

        self.course_repo
            .delete_cascade(course_id)
            .await
            .map_err(|err| {
                error!(%course_id, db_error = ?err, "courses: failed to delete");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, %course_id, "courses: deleted");
        Ok(())
    }

    /// Emails every subscriber that the course changed. Failures are logged
    /// only; callers run this detached from the request.
    pub async fn notify_subscribers(&self, course: CourseDto) {
        let Some(mailer) = self.mailer.as_ref() else {
            debug!(course_id = %course.id, "courses: mailer disabled, skipping update email");
            return;
        };

        let recipients = match self.subscription_repo.list_subscriber_emails(course.id).await {
            Ok(recipients) => recipients,
            Err(err) => {
                error!(
                    course_id = %course.id,
                    db_error = ?err,
                    "courses: failed to load subscribers"
                );
                return;
            }
        };

        if recipients.is_empty() {
            debug!(course_id = %course.id, "courses: no subscribers to notify");
            return;
        }

        let count = recipients.len();
        let email = OutgoingEmail {
            to: recipients,
            subject: format!("Course Updated: {}", course.title),
            text: format!(
                "The course '{}' has been updated. Check out the new content!",
                course.title
            ),
        };

        match mailer.send(email).await {
            Ok(()) => info!(
                course_id = %course.id,
                recipients = count,
                "courses: update email sent"
            ),
            Err(err) => error!(
                course_id = %course.id,
                error = ?err,
                "courses: update email failed"
            ),
        }
    }

    async fn load(&self, course_id: Uuid) -> UseCaseResult<CourseDto> {
        self.course_repo
            .find_by_id(course_id)
            .await
            .map_err(|err| {
                error!(%course_id, db_error = ?err, "courses: failed to load");
                UseCaseError::Internal(err)
            })?
            .map(CourseDto::from)
            .ok_or(UseCaseError::NotFound("course"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use lms_core::{
        domain::{
            entities::courses::CourseEntity,
            repositories::{
                courses::MockCourseRepository, subscriptions::MockSubscriptionRepository,
            },
            value_objects::{access_policy::ListScope, enums::user_roles::UserRole},
        },
        notifications::MockMailSender,
    };
    use mockall::predicate::eq;

    fn sample_course(owner_id: Uuid) -> CourseEntity {
        let now = Utc::now();
        CourseEntity {
            id: Uuid::new_v4(),
            title: "Rust for Pythonistas".to_string(),
            description: "Ownership, borrowing and more".to_string(),
            preview: None,
            owner_id,
            created_at: now,
            updated_at: now,
        }
    }

    fn usecase(
        course_repo: MockCourseRepository,
        subscription_repo: MockSubscriptionRepository,
        mailer: Option<MockMailSender>,
    ) -> CourseUseCase<MockCourseRepository, MockSubscriptionRepository, MockMailSender> {
        CourseUseCase::new(
            Arc::new(course_repo),
            Arc::new(subscription_repo),
            mailer.map(Arc::new),
        )
    }

    fn expect_find(repo: &mut MockCourseRepository, course: &CourseEntity) {
        let found = course.clone();
        repo.expect_find_by_id()
            .with(eq(course.id))
            .returning(move |_| Ok(Some(found.clone())));
    }

    fn title_patch() -> CourseModel {
        CourseModel {
            title: Some("Renamed".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn stranger_cannot_update_or_delete() {
        let course = sample_course(Uuid::new_v4());
        let stranger = Actor::new(Uuid::new_v4(), UserRole::User);

        let mut course_repo = MockCourseRepository::new();
        expect_find(&mut course_repo, &course);
        course_repo.expect_update().never();
        course_repo.expect_delete_cascade().never();

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);

        let update = usecase.update(stranger, course.id, title_patch(), true).await;
        assert!(matches!(update, Err(UseCaseError::Forbidden)));

        let delete = usecase.delete(stranger, course.id).await;
        assert!(matches!(delete, Err(UseCaseError::Forbidden)));
    }

    #[tokio::test]
    async fn moderator_updates_but_cannot_delete() {
        let course = sample_course(Uuid::new_v4());
        let moderator = Actor::new(Uuid::new_v4(), UserRole::Moderator);

        let mut course_repo = MockCourseRepository::new();
        expect_find(&mut course_repo, &course);
        let updated = CourseEntity {
            title: "Renamed".to_string(),
            ..course.clone()
        };
        course_repo
            .expect_update()
            .withf(|_, changes| changes.title.as_deref() == Some("Renamed"))
            .times(1)
            .returning(move |_, _| Ok(updated.clone()));
        course_repo.expect_delete_cascade().never();

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);

        let dto = usecase
            .update(moderator, course.id, title_patch(), true)
            .await
            .unwrap();
        assert_eq!(dto.title, "Renamed");
        assert_eq!(dto.owner, course.owner_id);

        let delete = usecase.delete(moderator, course.id).await;
        assert!(matches!(delete, Err(UseCaseError::Forbidden)));
    }

    #[tokio::test]
    async fn owner_deletes_with_cascade() {
        let owner = Actor::new(Uuid::new_v4(), UserRole::User);
        let course = sample_course(owner.user_id);

        let mut course_repo = MockCourseRepository::new();
        expect_find(&mut course_repo, &course);
        course_repo
            .expect_delete_cascade()
            .with(eq(course.id))
            .times(1)
            .returning(|_| Ok(()));

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);

        assert!(usecase.delete(owner, course.id).await.is_ok());
    }

    #[tokio::test]
    async fn moderators_cannot_create() {
        let moderator = Actor::new(Uuid::new_v4(), UserRole::Moderator);
        let mut course_repo = MockCourseRepository::new();
        course_repo.expect_create().never();

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);
        let model = CourseModel {
            title: Some("t".to_string()),
            description: Some("d".to_string()),
            preview: None,
        };

        let result = usecase.create(moderator, model).await;
        assert!(matches!(result, Err(UseCaseError::Forbidden)));
    }

    #[tokio::test]
    async fn create_stamps_owner_and_requires_fields() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let owner_id = actor.user_id;

        let mut course_repo = MockCourseRepository::new();
        course_repo
            .expect_create()
            .withf(move |entity| entity.owner_id == owner_id && entity.title == "Rust")
            .times(1)
            .returning(move |entity| {
                let mut course = sample_course(entity.owner_id);
                course.title = entity.title;
                Ok(course)
            });

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);

        let missing = usecase
            .create(
                actor,
                CourseModel {
                    title: Some("Rust".to_string()),
                    ..Default::default()
                },
            )
            .await;
        match missing {
            Err(UseCaseError::Validation(errors)) => assert!(errors.contains_key("description")),
            other => panic!("unexpected result: {other:?}"),
        }

        let created = usecase
            .create(
                actor,
                CourseModel {
                    title: Some("Rust".to_string()),
                    description: Some("Systems programming".to_string()),
                    preview: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(created.owner, owner_id);
    }

    #[tokio::test]
    async fn unknown_course_is_not_found() {
        let mut course_repo = MockCourseRepository::new();
        course_repo.expect_find_by_id().returning(|_| Ok(None));

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);
        let actor = Actor::new(Uuid::new_v4(), UserRole::Moderator);

        let result = usecase.retrieve(actor, Uuid::new_v4()).await;
        assert!(matches!(result, Err(UseCaseError::NotFound("course"))));
    }

    #[tokio::test]
    async fn list_is_scoped_to_owner_for_regular_users() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut course_repo = MockCourseRepository::new();
        course_repo
            .expect_list()
            .with(eq(ListScope::OwnedBy(actor.user_id).owner_filter()))
            .times(1)
            .returning(move |owner| Ok(vec![sample_course(owner.unwrap_or_default())]));

        let usecase = usecase(course_repo, MockSubscriptionRepository::new(), None);

        let courses = usecase.list(actor).await.unwrap();
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].owner, actor.user_id);
    }

    #[tokio::test]
    async fn notify_emails_every_subscriber() {
        let course: CourseDto = sample_course(Uuid::new_v4()).into();
        let course_id = course.id;

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_list_subscriber_emails()
            .with(eq(course_id))
            .returning(|_| Ok(vec!["a@example.com".to_string(), "b@example.com".to_string()]));

        let mut mailer = MockMailSender::new();
        mailer
            .expect_send()
            .withf(|email| {
                email.to.len() == 2 && email.subject == "Course Updated: Rust for Pythonistas"
            })
            .times(1)
            .returning(|_| Ok(()));

        let usecase = usecase(MockCourseRepository::new(), subscription_repo, Some(mailer));
        usecase.notify_subscribers(course).await;
    }

    #[tokio::test]
    async fn notify_is_silent_without_subscribers() {
        let course: CourseDto = sample_course(Uuid::new_v4()).into();

        let mut subscription_repo = MockSubscriptionRepository::new();
        subscription_repo
            .expect_list_subscriber_emails()
            .returning(|_| Ok(vec![]));
        let mut mailer = MockMailSender::new();
        mailer.expect_send().never();

        let usecase = usecase(MockCourseRepository::new(), subscription_repo, Some(mailer));
        usecase.notify_subscribers(course).await;
    }
}
