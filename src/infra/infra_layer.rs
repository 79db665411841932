// The infra module contains implementations of core traits.
// Each feature implementation goes in its own submodule.

#[path = "catalog/mod.rs"]
pub mod catalog;

#[path = "directory/mod.rs"]
pub mod directory;

#[path = "notifications/mod.rs"]
pub mod notifications;
