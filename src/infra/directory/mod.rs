pub mod sqlite_directory_store;

pub use sqlite_directory_store::*;
