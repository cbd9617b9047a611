pub mod user_deactivation;
