pub mod courses;
pub mod lessons;
pub mod payments;
pub mod subscriptions;
pub mod users;
