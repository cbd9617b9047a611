use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::lessons;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = lessons)]
pub struct LessonEntity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    pub video_link: Option<String>,
    pub course_id: Uuid,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = lessons)]
pub struct InsertLessonEntity {
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    pub video_link: Option<String>,
    pub course_id: Uuid,
    pub owner_id: Uuid,
}

#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = lessons)]
pub struct UpdateLessonEntity {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preview: Option<Option<String>>,
    pub video_link: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateLessonEntity {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.preview.is_none()
            && self.video_link.is_none()
    }
}
