use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToggleSubscriptionModel {
    pub course_id: Option<Uuid>,
}

/// Result of flipping a (user, course) subscription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ToggleOutcome {
    Added,
    Removed,
}

impl ToggleOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ToggleOutcome::Added => "added",
            ToggleOutcome::Removed => "removed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SubscriptionMessageDto {
    pub message: ToggleOutcome,
}

impl From<ToggleOutcome> for SubscriptionMessageDto {
    fn from(outcome: ToggleOutcome) -> Self {
        Self { message: outcome }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_serializes_as_plain_word() {
        let body =
            serde_json::to_value(SubscriptionMessageDto::from(ToggleOutcome::Removed)).unwrap();
        assert_eq!(body, serde_json::json!({ "message": "removed" }));
    }
}
