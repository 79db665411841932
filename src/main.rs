// This is the entry point of the moderation CLI.
//
// **Architecture Overview:**
// - `core/` = Business logic (transport-agnostic)
// - `infra/` = Implementations of core traits (SQLite stores)
// - `cli/` = Command-line adapters (parsing, role checks, rendering)
//
// This file's job is to:
// 1. Load configuration
// 2. Initialize services (dependency injection)
// 3. Dispatch the command

// These attrs point each module declaration at a more descriptive root file
// so we don't end up with half a dozen mod.rs files that all look the same.
#[path = "cli/cli_layer.rs"]
mod cli;
#[path = "core/core_layer.rs"]
mod core;
#[path = "infra/infra_layer.rs"]
mod infra;

use crate::cli::Data;
use crate::core::moderation::{ModerationFanout, ModerationService};
use crate::core::notifications::NotificationService;
use crate::infra::catalog::SqliteCatalogStore;
use crate::infra::directory::SqliteDirectoryStore;
use crate::infra::notifications::SqliteNotificationStore;
use std::sync::Arc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging so we can see what's happening
    tracing_subscriber::fmt::init();

    // Load environment variables from a .env file (if it exists)
    dotenv::dotenv().ok();

    // Keep the runtime database in a dedicated folder so the repo root
    // stays tidy.
    let data_dir = std::env::var("DATA_DIR").unwrap_or_else(|_| "data".to_string());
    std::fs::create_dir_all(&data_dir)?;
    let db_path = format!("{}/modmarket.db", data_dir);

    // ========================================================================
    // DEPENDENCY INJECTION
    // ========================================================================
    // Create our services with their dependencies.
    // This is the "composition root" where we wire everything together.

    let pool = sqlx::sqlite::SqlitePoolOptions::new()
        .connect(&format!("sqlite://{}?mode=rwc", db_path))
        .await?;

    let catalog = SqliteCatalogStore::new(pool.clone());
    catalog.migrate().await?;
    let notification_store = SqliteNotificationStore::new(pool.clone());
    notification_store.migrate().await?;
    let directory = SqliteDirectoryStore::new(pool.clone());
    directory.migrate().await?;

    let notifications = Arc::new(NotificationService::new(notification_store, directory));
    let fanout = Arc::new(ModerationFanout::new(Arc::clone(&notifications)));
    let moderation = Arc::new(ModerationService::new(catalog, fanout));

    let data = Data {
        moderation,
        notifications,
        directory: Arc::new(SqliteDirectoryStore::new(pool)),
    };

    let args: Vec<String> = std::env::args().skip(1).collect();
    cli::run(&data, args).await
}
