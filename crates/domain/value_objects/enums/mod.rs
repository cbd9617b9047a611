pub mod payment_methods;
pub mod payment_statuses;
pub mod sort_order;
pub mod user_roles;
