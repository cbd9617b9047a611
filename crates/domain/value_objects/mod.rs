pub mod access_policy;
pub mod courses;
pub mod enums;
pub mod lessons;
pub mod money;
pub mod payments;
pub mod subscriptions;
pub mod users;
pub mod video_links;
