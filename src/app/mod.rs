pub mod errands;
pub mod notifications;
pub mod stakeholders;
