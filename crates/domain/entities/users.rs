use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use crate::infra::db::postgres::schema::users;

#[derive(Debug, Clone, Identifiable, Selectable, Queryable)]
#[diesel(table_name = users)]
pub struct UserEntity {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
    pub is_moderator: bool,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct InsertUserEntity {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
    pub is_moderator: bool,
    pub is_active: bool,
}

/// `None` leaves a column untouched, `Some(None)` clears a nullable column.
#[derive(Debug, Clone, Default, PartialEq, AsChangeset)]
#[diesel(table_name = users)]
pub struct UpdateUserEntity {
    pub username: Option<String>,
    pub email: Option<String>,
    pub password_hash: Option<String>,
    pub phone: Option<Option<String>>,
    pub city: Option<Option<String>>,
    pub avatar: Option<Option<String>>,
    pub updated_at: Option<DateTime<Utc>>,
}

impl UpdateUserEntity {
    pub fn is_empty(&self) -> bool {
        self.username.is_none()
            && self.email.is_none()
            && self.password_hash.is_none()
            && self.phone.is_none()
            && self.city.is_none()
            && self.avatar.is_none()
    }
}
