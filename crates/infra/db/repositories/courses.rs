use anyhow::Result;
use async_trait::async_trait;
use diesel::{PgConnection, QueryResult, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{courses, lessons, payments, subscriptions},
    },
};
use domain::{
    entities::courses::{CourseEntity, InsertCourseEntity, UpdateCourseEntity},
    repositories::courses::CourseRepository,
};

pub struct CoursePostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl CoursePostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

/// Deletes the given courses with every payment, subscription and lesson
/// hanging off them. Callers run it inside a transaction.
pub(crate) fn delete_course_tree(conn: &mut PgConnection, course_ids: &[Uuid]) -> QueryResult<()> {
    if course_ids.is_empty() {
        return Ok(());
    }

    let lesson_ids = lessons::table
        .filter(lessons::course_id.eq_any(course_ids))
        .select(lessons::id)
        .load::<Uuid>(conn)?;

    diesel::delete(payments::table.filter(payments::course_id.eq_any(course_ids))).execute(conn)?;
    if !lesson_ids.is_empty() {
        diesel::delete(payments::table.filter(payments::lesson_id.eq_any(&lesson_ids)))
            .execute(conn)?;
    }
    diesel::delete(subscriptions::table.filter(subscriptions::course_id.eq_any(course_ids)))
        .execute(conn)?;
    diesel::delete(lessons::table.filter(lessons::course_id.eq_any(course_ids))).execute(conn)?;
    diesel::delete(courses::table.filter(courses::id.eq_any(course_ids))).execute(conn)?;

    Ok(())
}

#[async_trait]
impl CourseRepository for CoursePostgres {
    async fn create(&self, insert_course_entity: InsertCourseEntity) -> Result<CourseEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(courses::table)
            .values(&insert_course_entity)
            .returning(CourseEntity::as_returning())
            .get_result::<CourseEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, course_id: Uuid) -> Result<Option<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = courses::table
            .find(course_id)
            .select(CourseEntity::as_select())
            .first::<CourseEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<CourseEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = courses::table
            .select(CourseEntity::as_select())
            .order(courses::created_at.asc())
            .into_boxed();

        if let Some(owner_id) = owner_id {
            query = query.filter(courses::owner_id.eq(owner_id));
        }

        let results = query.load::<CourseEntity>(&mut conn)?;

        Ok(results)
    }

    async fn update(
        &self,
        course_id: Uuid,
        update_course_entity: UpdateCourseEntity,
    ) -> Result<CourseEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(courses::table.find(course_id))
            .set(&update_course_entity)
            .returning(CourseEntity::as_returning())
            .get_result::<CourseEntity>(&mut conn)?;

        Ok(result)
    }

    async fn delete_cascade(&self, course_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|tx| {
            delete_course_tree(tx, &[course_id])
        })?;

        Ok(())
    }
}
