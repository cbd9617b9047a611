use anyhow::Result;
use async_trait::async_trait;
use mockall::automock;
use uuid::Uuid;

use crate::domain::entities::courses::{CourseEntity, InsertCourseEntity, UpdateCourseEntity};

#[automock]
#[async_trait]
pub trait CourseRepository {
    async fn create(&self, insert_course_entity: InsertCourseEntity) -> Result<CourseEntity>;
    async fn find_by_id(&self, course_id: Uuid) -> Result<Option<CourseEntity>>;
    /// `owner_id = None` lists every course.
    async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<CourseEntity>>;
    async fn update(
        &self,
        course_id: Uuid,
        update_course_entity: UpdateCourseEntity,
    ) -> Result<CourseEntity>;
    async fn delete_cascade(&self, course_id: Uuid) -> Result<()>;
}
