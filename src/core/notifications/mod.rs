// Core notifications module - preference-filtered delivery and the
// read-side operations.

pub mod notification_models;
pub mod notification_service;

pub use notification_models::*;
pub use notification_service::*;
