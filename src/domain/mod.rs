pub mod errand;
pub mod notification;
pub mod scope;
pub mod stakeholder;
