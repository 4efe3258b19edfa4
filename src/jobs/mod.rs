pub mod notification_cleanup;
pub mod scheduler;
