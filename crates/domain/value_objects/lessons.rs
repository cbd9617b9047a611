use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::domain::{
    entities::lessons::{InsertLessonEntity, LessonEntity, UpdateLessonEntity},
    value_objects::video_links::{normalize_video_link, validate_video_link},
};

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct LessonModel {
    #[validate(length(min = 1, max = 255))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub preview: Option<String>,
    pub video_link: Option<String>,
    /// Parent course id. Fixed once the lesson exists.
    pub course: Option<Uuid>,
}

impl LessonModel {
    /// Field rules plus the video host allow-list.
    pub fn validate_fields(&self) -> Result<(), ValidationErrors> {
        let mut errors = match self.validate() {
            Ok(()) => ValidationErrors::new(),
            Err(errors) => errors,
        };

        if let Some(link) = self.video_link.as_deref() {
            if let Err(error) = validate_video_link(link.trim()) {
                errors.add("video_link", error);
            }
        }

        if errors.is_empty() { Ok(()) } else { Err(errors) }
    }

    pub fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.title.is_none() {
            missing.push("title");
        }
        if self.course.is_none() {
            missing.push("course");
        }
        missing
    }

    pub fn to_insert_entity(&self, course_id: Uuid, owner_id: Uuid) -> InsertLessonEntity {
        InsertLessonEntity {
            title: self.title.clone().unwrap_or_default(),
            description: self.description.clone().unwrap_or_default(),
            preview: self.preview.clone().filter(|p| !p.is_empty()),
            video_link: normalize_video_link(self.video_link.clone()),
            course_id,
            owner_id,
        }
    }

    pub fn to_update_entity(&self) -> UpdateLessonEntity {
        UpdateLessonEntity {
            title: self.title.clone(),
            description: self.description.clone(),
            preview: self
                .preview
                .clone()
                .map(|p| if p.is_empty() { None } else { Some(p) }),
            video_link: self
                .video_link
                .clone()
                .map(|link| normalize_video_link(Some(link))),
            updated_at: Some(Utc::now()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LessonDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub preview: Option<String>,
    pub video_link: Option<String>,
    pub course: Uuid,
    pub owner: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<LessonEntity> for LessonDto {
    fn from(entity: LessonEntity) -> Self {
        Self {
            id: entity.id,
            title: entity.title,
            description: entity.description,
            preview: entity.preview,
            video_link: entity.video_link,
            course: entity.course_id,
            owner: entity.owner_id,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn model(link: Option<&str>) -> LessonModel {
        LessonModel {
            title: Some("Ownership".to_string()),
            description: None,
            preview: None,
            video_link: link.map(str::to_string),
            course: Some(Uuid::new_v4()),
        }
    }

    #[test]
    fn foreign_video_host_is_a_field_error() {
        let errors = model(Some("https://example.com/video"))
            .validate_fields()
            .unwrap_err();
        assert!(errors.field_errors().contains_key("video_link"));
    }

    #[test]
    fn youtube_and_empty_links_pass() {
        assert!(model(Some("https://www.youtube.com/watch?v=1")).validate_fields().is_ok());
        assert!(model(Some("")).validate_fields().is_ok());
        assert!(model(None).validate_fields().is_ok());
    }

    #[test]
    fn empty_link_is_stored_as_null() {
        let lesson = model(Some("")).to_insert_entity(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(lesson.video_link, None);

        let changes = model(Some("")).to_update_entity();
        assert_eq!(changes.video_link, Some(None));
    }

    #[test]
    fn create_requires_title_and_course() {
        assert_eq!(
            LessonModel::default().missing_required(),
            vec!["title", "course"]
        );
    }
}
