use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::courses;

#[derive(Debug, Clone, PartialEq, Identifiable, Selectable, Queryable)]
#[diesel(table_name = courses)]
pub struct CourseEntity {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Insertable)]
#[diesel(table_name = courses)]
pub struct InsertCourseEntity {
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    pub owner_id: Uuid,
}

// No owner_id: ownership is fixed at creation.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = courses)]
pub struct UpdateCourseEntity {
    pub title: Option<String>,
    pub description: Option<String>,
    pub preview: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateCourseEntity {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.description.is_none() && self.preview.is_none()
    }
}
