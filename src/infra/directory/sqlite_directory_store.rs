// SQLite-backed user directory: accounts, roles, preference switches,
// teams, and follow edges.
//
// Tables:
// - users: Account row with role and the six preference columns
// - teams: Team row with its owner edge
// - follows: follower_id -> followed_id edges

use crate::core::moderation::UserRole;
use crate::core::notifications::{NotificationPreferences, NotifyError, UserDirectory};
use async_trait::async_trait;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteDirectoryStore {
    pool: Pool<Sqlite>,
}

fn storage_err(e: impl std::fmt::Display) -> NotifyError {
    NotifyError::Storage(e.to_string())
}

impl SqliteDirectoryStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), NotifyError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                username TEXT NOT NULL UNIQUE,
                role TEXT NOT NULL DEFAULT 'USER',
                pref_liked_project_updates INTEGER NOT NULL DEFAULT 1,
                pref_new_creator_uploads INTEGER NOT NULL DEFAULT 1,
                pref_new_followers INTEGER NOT NULL DEFAULT 1,
                pref_version_status INTEGER NOT NULL DEFAULT 1,
                pref_collection_additions INTEGER NOT NULL DEFAULT 1,
                pref_showcase_interactions INTEGER NOT NULL DEFAULT 1
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS teams (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                owner_user_id INTEGER NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS follows (
                follower_id INTEGER NOT NULL,
                followed_id INTEGER NOT NULL,
                PRIMARY KEY (follower_id, followed_id)
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    // ------------------------------------------------------------------
    // Admin helpers used by the CLI to seed accounts and edges. These are
    // inherent methods, not part of the UserDirectory port.
    // ------------------------------------------------------------------

    pub async fn create_user(&self, username: &str, role: UserRole) -> Result<u64, NotifyError> {
        let result = sqlx::query("INSERT INTO users (username, role) VALUES (?, ?)")
            .bind(username)
            .bind(role.to_string())
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.last_insert_rowid() as u64)
    }

    pub async fn create_team(&self, name: &str, owner_user_id: u64) -> Result<u64, NotifyError> {
        let result = sqlx::query("INSERT INTO teams (name, owner_user_id) VALUES (?, ?)")
            .bind(name)
            .bind(owner_user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.last_insert_rowid() as u64)
    }

    pub async fn add_follow(&self, follower_id: u64, followed_id: u64) -> Result<(), NotifyError> {
        sqlx::query("INSERT OR IGNORE INTO follows (follower_id, followed_id) VALUES (?, ?)")
            .bind(follower_id as i64)
            .bind(followed_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(())
    }
}

#[async_trait]
impl UserDirectory for SqliteDirectoryStore {
    async fn preferences(
        &self,
        user_id: u64,
    ) -> Result<Option<NotificationPreferences>, NotifyError> {
        let row = sqlx::query(
            r#"
            SELECT pref_liked_project_updates, pref_new_creator_uploads, pref_new_followers,
                   pref_version_status, pref_collection_additions, pref_showcase_interactions
            FROM users WHERE id = ?
            "#,
        )
        .bind(user_id as i64)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(row.map(|row| NotificationPreferences {
            liked_project_updates: row.get::<i64, _>("pref_liked_project_updates") != 0,
            new_creator_uploads: row.get::<i64, _>("pref_new_creator_uploads") != 0,
            new_followers: row.get::<i64, _>("pref_new_followers") != 0,
            version_status: row.get::<i64, _>("pref_version_status") != 0,
            collection_additions: row.get::<i64, _>("pref_collection_additions") != 0,
            showcase_interactions: row.get::<i64, _>("pref_showcase_interactions") != 0,
        }))
    }

    async fn set_preferences(
        &self,
        user_id: u64,
        prefs: NotificationPreferences,
    ) -> Result<(), NotifyError> {
        let result = sqlx::query(
            r#"
            UPDATE users SET
                pref_liked_project_updates = ?,
                pref_new_creator_uploads = ?,
                pref_new_followers = ?,
                pref_version_status = ?,
                pref_collection_additions = ?,
                pref_showcase_interactions = ?
            WHERE id = ?
            "#,
        )
        .bind(prefs.liked_project_updates as i64)
        .bind(prefs.new_creator_uploads as i64)
        .bind(prefs.new_followers as i64)
        .bind(prefs.version_status as i64)
        .bind(prefs.collection_additions as i64)
        .bind(prefs.showcase_interactions as i64)
        .bind(user_id as i64)
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        if result.rows_affected() == 0 {
            return Err(NotifyError::NotFound);
        }
        Ok(())
    }

    async fn team_owner(&self, team_id: u64) -> Result<Option<u64>, NotifyError> {
        let row = sqlx::query("SELECT owner_user_id FROM teams WHERE id = ?")
            .bind(team_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.map(|row| row.get::<i64, _>("owner_user_id") as u64))
    }

    async fn followers_of(&self, user_id: u64) -> Result<Vec<u64>, NotifyError> {
        let rows = sqlx::query("SELECT follower_id FROM follows WHERE followed_id = ?")
            .bind(user_id as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(rows
            .iter()
            .map(|row| row.get::<i64, _>("follower_id") as u64)
            .collect())
    }

    async fn role_of(&self, user_id: u64) -> Result<Option<UserRole>, NotifyError> {
        let row = sqlx::query("SELECT role FROM users WHERE id = ?")
            .bind(user_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.map(|row| {
            row.get::<String, _>("role")
                .parse::<UserRole>()
                .map_err(storage_err)
        })
        .transpose()
    }
}
