// Core moderation module - resource/version status machines, the
// moderation coordinators, and post-commit fan-out.

pub mod fanout;
pub mod moderation_models;
pub mod moderation_service;
pub mod slug;
pub mod status_machine;

pub use fanout::*;
pub use moderation_models::*;
pub use moderation_service::*;
pub use status_machine::*;
