use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::entities::courses::{CourseEntity, InsertCourseEntity, UpdateCourseEntity};

/// Body of course create/update requests. Every field is optional at the
/// type level so `PATCH` can reuse it; `missing_required` enforces the
/// create/`PUT` shape.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct CourseModel {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    #[validate(length(min = 1))]
    pub description: Option<String>,
    pub preview: Option<String>,
}

impl CourseModel {
    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.description.is_none() {
            missing.push("description");
        }
        missing
    }

    pub fn to_insert_entity(&self, owner_id: Uuid) -> InsertCourseEntity {
        InsertCourseEntity {
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            preview: self.preview.clone().filter(|p| !p.is_empty()),
            owner_id,
        }
    }

    pub fn to_update_entity(&self) -> UpdateCourseEntity {
        UpdateCourseEntity {
            title: self.title.clone(),
            description: self.description.clone(),
            preview: self
                .preview
                .clone()
                .map(|p| if p.is_empty() { None } else { Some(p) }),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CourseDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<CourseEntity> for CourseDto {
    fn from(entity: CourseEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            preview: entity.preview,
            owner: entity.owner_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
