use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::{RunQueryDsl, insert_into, prelude::*, update};
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    domain,
    infra::db::{
        postgres::{
            postgres_connection::PgPoolSquad,
            schema::{courses, lessons, payments, subscriptions, users},
        },
        repositories::courses::delete_course_tree,
    },
};
use domain::{
    entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity},
    repositories::users::UserRepository,
};

pub struct UserPostgres {
    db_pool: Arc<PgPoolSquad>,
}

impl UserPostgres {
    pub fn new(db_pool: Arc<PgPoolSquad>) -> Self {
        Self { db_pool }
    }
}

#[async_trait]
impl UserRepository for UserPostgres {
    async fn create(&self, insert_user_entity: InsertUserEntity) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = insert_into(users::table)
            .values(&insert_user_entity)
            .returning(UserEntity::as_returning())
            .get_result::<UserEntity>(&mut conn)?;

        Ok(result)
    }

    async fn find_by_id(&self, user_id: Uuid) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .find(user_id)
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn find_by_username(&self, username: String) -> Result<Option<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = users::table
            .filter(users::username.eq(username))
            .select(UserEntity::as_select())
            .first::<UserEntity>(&mut conn)
            .optional()?;

        Ok(result)
    }

    async fn username_taken(&self, username: String, exclude: Option<Uuid>) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = users::table
            .filter(users::username.eq(username))
            .select(users::id)
            .into_boxed();
        if let Some(user_id) = exclude {
            query = query.filter(users::id.ne(user_id));
        }

        let found = query.first::<Uuid>(&mut conn).optional()?;

        Ok(found.is_some())
    }

    async fn email_taken(&self, email: String, exclude: Option<Uuid>) -> Result<bool> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let mut query = users::table
            .filter(users::email.eq(email.to_lowercase()))
            .select(users::id)
            .into_boxed();
        if let Some(user_id) = exclude {
            query = query.filter(users::id.ne(user_id));
        }

        let found = query.first::<Uuid>(&mut conn).optional()?;

        Ok(found.is_some())
    }

    async fn list(&self) -> Result<Vec<UserEntity>> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let results = users::table
            .select(UserEntity::as_select())
            .order(users::created_at.asc())
            .load::<UserEntity>(&mut conn)?;

        Ok(results)
    }

    async fn update(
        &self,
        user_id: Uuid,
        update_user_entity: UpdateUserEntity,
    ) -> Result<UserEntity> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let result = update(users::table.find(user_id))
            .set(&update_user_entity)
            .returning(UserEntity::as_returning())
            .get_result::<UserEntity>(&mut conn)?;

        Ok(result)
    }

    async fn touch_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        update(users::table.find(user_id))
            .set(users::last_login.eq(Some(at)))
            .execute(&mut conn)?;

        Ok(())
    }

    async fn delete_cascade(&self, user_id: Uuid) -> Result<()> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        conn.transaction::<(), diesel::result::Error, _>(|tx| {
            diesel::delete(payments::table.filter(payments::user_id.eq(user_id))).execute(tx)?;
            diesel::delete(subscriptions::table.filter(subscriptions::user_id.eq(user_id)))
                .execute(tx)?;

            let owned_courses = courses::table
                .filter(courses::owner_id.eq(user_id))
                .select(courses::id)
                .load::<Uuid>(tx)?;
            delete_course_tree(tx, &owned_courses)?;

            // Lessons the user wrote inside someone else's course.
            let owned_lessons = lessons::table
                .filter(lessons::owner_id.eq(user_id))
                .select(lessons::id)
                .load::<Uuid>(tx)?;
            if !owned_lessons.is_empty() {
                update(payments::table.filter(payments::lesson_id.eq_any(&owned_lessons)))
                    .set((
                        payments::lesson_id.eq::<Option<Uuid>>(None),
                        payments::updated_at.eq(Utc::now()),
                    ))
                    .execute(tx)?;
                diesel::delete(lessons::table.filter(lessons::id.eq_any(&owned_lessons)))
                    .execute(tx)?;
            }

            diesel::delete(users::table.find(user_id)).execute(tx)?;

            Ok(())
        })?;

        Ok(())
    }

    async fn deactivate_inactive_since(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let mut conn = Arc::clone(&self.db_pool).get()?;

        let deactivated = update(
            users::table
                .filter(users::is_active.eq(true))
                .filter(users::last_login.lt(cutoff)),
        )
        .set((users::is_active.eq(false), users::updated_at.eq(Utc::now())))
        .execute(&mut conn)?;

        Ok(deactivated)
    }
}
