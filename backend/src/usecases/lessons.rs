use std::sync::Arc;

use lms_core::domain::{
    repositories::{courses::CourseRepository, lessons::LessonRepository},
    value_objects::{
        access_policy::{Action, Actor, ResourceKind, list_scope},
        lessons::{LessonDto, LessonModel},
    },
};
use tracing::{error, info};
use uuid::Uuid;

use crate::usecases::{
    authorize,
    errors::{UseCaseError, UseCaseResult},
};

pub struct LessonUseCase<L, C>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    lesson_repo: Arc<L>,
    course_repo: Arc<C>,
}

impl<L, C> LessonUseCase<L, C>
where
    L: LessonRepository + Send + Sync + 'static,
    C: CourseRepository + Send + Sync + 'static,
{
    pub fn new(lesson_repo: Arc<L>, course_repo: Arc<C>) -> Self {
        Self {
            lesson_repo,
            course_repo,
        }
    }

    pub async fn list(&self, actor: Actor) -> UseCaseResult<Vec<LessonDto>> {
        let scope = list_scope(&actor, ResourceKind::Lesson);

        let lessons = self
            .lesson_repo
            .list(scope.owner_filter())
            .await
            .map_err(|err| {
                error!(user_id = %actor.user_id, db_error = ?err, "lessons: failed to list");
                UseCaseError::Internal(err)
            })?;

        Ok(lessons.into_iter().map(LessonDto::from).collect())
    }

    pub async fn create(&self, actor: Actor, model: LessonModel) -> UseCaseResult<LessonDto> {
        authorize(&actor, ResourceKind::Lesson, Action::Create, actor.user_id)?;
        UseCaseError::require(&model.missing_required())?;
        model.validate_fields()?;

        let course_id = model.course.ok_or(UseCaseError::NotFound("course"))?;
        let course = self.course_repo.find_by_id(course_id).await.map_err(|err| {
            error!(%course_id, db_error = ?err, "lessons: failed to load parent course");
            UseCaseError::Internal(err)
        })?;
        if course.is_none() {
            return Err(UseCaseError::field(
                "course",
                format!("Invalid pk \"{course_id}\" - object does not exist."),
            ));
        }

        let lesson = self
            .lesson_repo
            .create(model.to_insert_entity(course_id, actor.user_id))
            .await
            .map_err(|err| {
                error!(
                    user_id = %actor.user_id,
                    %course_id,
                    db_error = ?err,
                    "lessons: failed to create"
                );
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, lesson_id = %lesson.id, %course_id, "lessons: created");
        Ok(lesson.into())
    }

    pub async fn retrieve(&self, actor: Actor, lesson_id: Uuid) -> UseCaseResult<LessonDto> {
        let lesson = self.load(lesson_id).await?;
        authorize(&actor, ResourceKind::Lesson, Action::Retrieve, lesson.owner)?;

        Ok(lesson)
    }

    pub async fn update(
        &self,
        actor: Actor,
        lesson_id: Uuid,
        model: LessonModel,
        partial: bool,
    ) -> UseCaseResult<LessonDto> {
        let current = self.load(lesson_id).await?;
        authorize(&actor, ResourceKind::Lesson, Action::Update, current.owner)?;

        if !partial && model.title.is_none() {
            UseCaseError::require(&["title"])?;
        }
        if model.course.is_some_and(|course_id| course_id != current.course) {
            return Err(UseCaseError::field(
                "course",
                "A lesson cannot be moved to another course.",
            ));
        }
        model.validate_fields()?;

        let changes = model.to_update_entity();
        if changes.is_empty() {
            return Ok(current);
        }

        let lesson = self
            .lesson_repo
            .update(lesson_id, changes)
            .await
            .map_err(|err| {
                error!(%lesson_id, db_error = ?err, "lessons: failed to update");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, %lesson_id, "lessons: updated");
        Ok(lesson.into())
    }

    pub async fn delete(&self, actor: Actor, lesson_id: Uuid) -> UseCaseResult<()> {
        let current = self.load(lesson_id).await?;
        authorize(&actor, ResourceKind::Lesson, Action::Delete, current.owner)?;

        self.lesson_repo
            .delete_detaching_payments(lesson_id)
            .await
            .map_err(|err| {
                error!(%lesson_id, db_error = ?err, "lessons: failed to delete");
                UseCaseError::Internal(err)
            })?;

        info!(user_id = %actor.user_id, %lesson_id, "lessons: deleted");
        Ok(())
    }

    async fn load(&self, lesson_id: Uuid) -> UseCaseResult<LessonDto> {
        self.lesson_repo
            .find_by_id(lesson_id)
            .await
            .map_err(|err| {
                error!(%lesson_id, db_error = ?err, "lessons: failed to load");
                UseCaseError::Internal(err)
            })?
            .map(LessonDto::from)
            .ok_or(UseCaseError::NotFound("lesson"))
    }
}
