pub mod sqlite_notification_store;

pub use sqlite_notification_store::*;
