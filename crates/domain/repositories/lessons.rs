use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::lessons::{InsertLessonEntity, LessonEntity, UpdateLessonEntity};

#[automock]
#[async_trait]
pub trait LessonRepository {
    async fn create(&self, insert_lesson_entity: InsertLessonEntity) -> Result<LessonEntity>;
    async fn find_by_id(&self, lesson_id: Uuid) -> Result<Option<LessonEntity>>;
    async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<LessonEntity>>;
    async fn update(
        &self,
        lesson_id: Uuid,
        update_lesson_entity: UpdateLessonEntity,
    ) -> Result<LessonEntity>;
    /// Payments pointing at the lesson keep their row with `lesson_id` cleared.
    async fn delete_detaching_payments(&self, lesson_id: Uuid) -> Result<()>;
}
