// SQLite-backed notification store.
//
// Tables:
// - notifications: One row per delivered notification, JSON payload inline

use crate::core::notifications::{
    NewNotification, Notification, NotificationFilter, NotificationKind, NotificationStore,
    NotifyError,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteNotificationStore {
    pool: Pool<Sqlite>,
}

fn storage_err(e: impl std::fmt::Display) -> NotifyError {
    NotifyError::Storage(e.to_string())
}

fn notification_from_row(row: &SqliteRow) -> Result<Notification, NotifyError> {
    let kind: String = row.get("kind");
    let kind: NotificationKind = kind.parse().map_err(storage_err)?;
    let payload: String = row.get("payload");
    let payload = serde_json::from_str(&payload).map_err(storage_err)?;
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now());

    Ok(Notification {
        id: row.get::<i64, _>("id") as u64,
        user_id: row.get::<i64, _>("user_id") as u64,
        kind,
        title: row.get("title"),
        message: row.get("message"),
        payload,
        read: row.get::<i64, _>("read") != 0,
        created_at,
    })
}

impl SqliteNotificationStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), NotifyError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS notifications (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                user_id INTEGER NOT NULL,
                kind TEXT NOT NULL,
                title TEXT NOT NULL,
                message TEXT NOT NULL,
                payload TEXT NOT NULL DEFAULT 'null',
                read INTEGER NOT NULL DEFAULT 0,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_notifications_user
                ON notifications(user_id, read);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

#[async_trait]
impl NotificationStore for SqliteNotificationStore {
    async fn insert(&self, new: NewNotification) -> Result<Notification, NotifyError> {
        let payload = serde_json::to_string(&new.payload).map_err(storage_err)?;
        let result = sqlx::query(
            r#"
            INSERT INTO notifications (user_id, kind, title, message, payload, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(new.user_id as i64)
        .bind(new.kind.to_string())
        .bind(&new.title)
        .bind(&new.message)
        .bind(&payload)
        .bind(new.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(Notification {
            id: result.last_insert_rowid() as u64,
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            payload: new.payload,
            read: false,
            created_at: new.created_at,
        })
    }

    async fn list_for_user(
        &self,
        user_id: u64,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, NotifyError> {
        let mut sql = String::from("SELECT * FROM notifications WHERE user_id = ?");
        if filter.kind.is_some() {
            sql.push_str(" AND kind = ?");
        }
        if filter.read.is_some() {
            sql.push_str(" AND read = ?");
        }
        sql.push_str(" ORDER BY id DESC");
        if filter.limit.is_some() {
            sql.push_str(" LIMIT ?");
        }

        let mut query = sqlx::query(&sql).bind(user_id as i64);
        if let Some(kind) = filter.kind {
            query = query.bind(kind.to_string());
        }
        if let Some(read) = filter.read {
            query = query.bind(read as i64);
        }
        if let Some(limit) = filter.limit {
            query = query.bind(limit as i64);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(storage_err)?;
        rows.iter().map(notification_from_row).collect()
    }

    async fn unread_count(&self, user_id: u64) -> Result<u64, NotifyError> {
        let row = sqlx::query(
            "SELECT COUNT(*) AS n FROM notifications WHERE user_id = ? AND read = 0",
        )
        .bind(user_id as i64)
        .fetch_one(&self.pool)
        .await
        .map_err(storage_err)?;
        Ok(row.get::<i64, _>("n") as u64)
    }

    async fn mark_read(
        &self,
        notification_id: u64,
        user_id: u64,
    ) -> Result<Notification, NotifyError> {
        // The ownership check is part of the UPDATE itself.
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE id = ? AND user_id = ?")
            .bind(notification_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(NotifyError::NotFound);
        }

        let row = sqlx::query("SELECT * FROM notifications WHERE id = ?")
            .bind(notification_id as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;
        notification_from_row(&row)
    }

    async fn mark_all_read(&self, user_id: u64) -> Result<u64, NotifyError> {
        let result = sqlx::query("UPDATE notifications SET read = 1 WHERE user_id = ? AND read = 0")
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, notification_id: u64, user_id: u64) -> Result<(), NotifyError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = ? AND user_id = ?")
            .bind(notification_id as i64)
            .bind(user_id as i64)
            .execute(&self.pool)
            .await
            .map_err(storage_err)?;
        if result.rows_affected() == 0 {
            return Err(NotifyError::NotFound);
        }
        Ok(())
    }
}
