use anyhow::Result;
use async_trait::async_trait;
use chrono::Utc;
use diesel::{insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::postgres::{
        postgres_connection::PgPoolSquad,
        schema::{lessons, payments},
    },
};
use domain::{
    entities::lessons::{InsertLessonEntity, LessonEntity, UpdateLessonEntity},
    repositories::lessons::LessonRepository,
};

pub struct LessonPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl LessonPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl LessonRepository for LessonPostgres {
    async fn create(&self, insert_lesson_entity: InsertLessonEntity) -> Result<LessonEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(lessons::table)
            .values(&insert_lesson_entity)
            .returning(LessonEntity::as_returning())
            .get_result::<LessonEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, lesson_id: Uuid) -> Result<Option<LessonEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = lessons::table
            .find(lesson_id)
            .select(LessonEntity::as_select())
            .first::<LessonEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn list(&self, owner_id: Option<Uuid>) -> Result<Vec<LessonEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = lessons::table
            .select(LessonEntity::as_select())
            .order(lessons::created_at.asc())
            .into_boxed();

        if let Some(owner_id) = owner_id {
            query = query.filter(lessons::owner_id.eq(owner_id));
        }

        let results = query.load::<LessonEntity>(&mut conn)?;

        Ok(results)
    }

    async fn update(
        &self,
        lesson_id: Uuid,
        update_lesson_entity: UpdateLessonEntity,
    ) -> Result<LessonEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(lessons::table.find(lesson_id))
            .set(&update_lesson_entity)
            .returning(LessonEntity::as_returning())
            .get_result::<LessonEntity>(&mut conn)?;

        Ok(result)
    }

    async fn delete_detaching_payments(&self, lesson_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|tx| {
            update(payments::table.filter(payments::lesson_id.eq(lesson_id)))
                .set((
                    payments::lesson_id.eq::<Option<Uuid>>(None),
                    payments::updated_at.eq(Utc::now()),
                ))
                .execute(tx)?;

            diesel::delete(lessons::table.find(lesson_id)).execute(tx)?;

            Ok(())
        })?;

        Ok(())
    }
}
