use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::{
    entities::users::{InsertUserEntity, UpdateUserEntity, UserEntity},
    value_objects::enums::user_roles::UserRole,
};

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RegisterUserModel {
    #[validate(length(min = 1, max = 150))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8))]
    pub password: String,
    #[validate(length(max = 35))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    pub avatar: Option<String>,
}

impl RegisterUserModel {
    pub fn to_entity(&self, password_hash: String) -> InsertUserEntity {
        InsertUserEntity {
            username: self.username.trim().to_string(),
            email: self.email.trim().to_lowercase(),
            password_hash,
            phone: self.phone.clone(),
            city: self.city.clone(),
            avatar: self.avatar.clone(),
            is_moderator: false,
            is_active: true,
        }
    }
}

/// Body of `PUT`/`PATCH /users/{id}`. `is_moderator` is not accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct UpdateUserModel {
    #[validate(length(min = 1, max = 150))]
    pub username: Option<String>,
    #[validate(email)]
    pub email: Option<String>,
    #[validate(length(min = 8))]
    pub password: Option<String>,
    #[validate(length(max = 35))]
    pub phone: Option<String>,
    #[validate(length(max = 100))]
    pub city: Option<String>,
    pub avatar: Option<String>,
}

impl UpdateUserModel {
    /// Fields a full replacement must carry.
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.username.is_none() {
            missing.push("username");
        }
        if self.email.is_none() {
            missing.push("email");
        }
        missing
    }

    pub fn to_entity(&self, password_hash: Option<String>) -> UpdateUserEntity {
        UpdateUserEntity {
            username: self.username.as_ref().map(|v| v.trim().to_string()),
            email: self.email.as_ref().map(|v| v.trim().to_lowercase()),
            password_hash,
            phone: self.phone.clone().map(blank_to_none),
            city: self.city.clone().map(blank_to_none),
            avatar: self.avatar.clone().map(blank_to_none),
            updated_at: Some(Utc::now()),
        }
    }
}

fn blank_to_none(value: String) -> Option<String> {
    if value.trim().is_empty() {
        None
    } else {
        Some(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserDto {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub phone: Option<String>,
    pub city: Option<String>,
    pub avatar: Option<String>,
    pub role: UserRole,
    pub is_active: bool,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<UserEntity> for UserDto {
    fn from(entity: UserEntity) -> Self {
        Self {
            id: entity.id,
            username: entity.username,
            email: entity.email,
            phone: entity.phone,
            city: entity.city,
            avatar: entity.avatar,
            role: UserRole::from_moderator_flag(entity.is_moderator),
            is_active: entity.is_active,
            last_login: entity.last_login,
            created_at: entity.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct TokenObtainModel {
    #[validate(length(min = 1))]
    pub username: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenRefreshModel {
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TokenPairDto {
    pub access: String,
    pub refresh: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AccessTokenDto {
    pub access: String,
}
