use std::{borrow::Cow, sync::LazyLock};

use regex::Regex;
use validator::ValidationError;

pub const VIDEO_LINK_ERROR: &str =
    "Links to third-party resources are not allowed. Only YouTube links (youtube.com or youtu.be) are accepted.";

static VIDEO_LINK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://)?(www\.)?(youtube\.com|youtu\.be)/.+$")
        .expect("video link pattern compiles")
});

/// Checks a lesson video link against the youtube.com / youtu.be allow-list.
///
/// Surrounding whitespace is ignored and an empty link is valid. This is a
/// string check only; nothing is fetched.
pub fn is_allowed_video_link(raw: &str) -> bool {
    let link = raw.trim();
    link.is_empty() || VIDEO_LINK_RE.is_match(link)
}

/// `validator` hook for the `video_link` field of lesson payloads.
pub fn validate_video_link(value: &str) -> Result<(), ValidationError> {
    if is_allowed_video_link(value) {
        return Ok(());
    }

    let mut error = ValidationError::new("video_link_host");
    error.message = Some(Cow::Borrowed(VIDEO_LINK_ERROR));
    Err(error)
}

/// Blank links are stored as NULL.
pub fn normalize_video_link(value: Option<String>) -> Option<String> {
    value
        .map(|link| link.trim().to_string())
        .filter(|link| !link.is_empty())
}
