// SQLite-backed catalog store for resources, versions, and the status
// history.
//
// Tables:
// - resources: One row per resource, current status inline
// - resource_versions: Release artifacts, one row per submitted version
// - resource_status_history: Append-only audit trail
//
// Every `apply_*` method runs in a single transaction and re-checks its
// preconditions against the row state read inside that transaction, so two
// raced moderation calls cannot both commit.

use crate::core::moderation::{
    validate_transition, CatalogStore, ModerationError, NewResource, NewVersion, Resource,
    ResourceModerationUpdate, ResourceOwner, ResourceStatus, ResourceVersion,
    StatusHistoryRecord, VersionApproval, VersionRejection, VersionStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Pool, Row, Sqlite};

pub struct SqliteCatalogStore {
    pool: Pool<Sqlite>,
}

fn storage_err(e: impl std::fmt::Display) -> ModerationError {
    ModerationError::Storage(e.to_string())
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn parse_opt_timestamp(raw: Option<String>) -> Option<DateTime<Utc>> {
    raw.as_deref().map(parse_timestamp)
}

fn resource_from_row(row: &SqliteRow) -> Result<Resource, ModerationError> {
    let status: String = row.get("status");
    let status: ResourceStatus = status.parse().map_err(storage_err)?;

    let owner_user_id: Option<i64> = row.get("owner_user_id");
    let owner_team_id: Option<i64> = row.get("owner_team_id");
    let owner = match (owner_user_id, owner_team_id) {
        (Some(user_id), None) => ResourceOwner::User(user_id as u64),
        (None, Some(team_id)) => ResourceOwner::Team(team_id as u64),
        _ => {
            return Err(ModerationError::Storage(format!(
                "resource {} owner columns are inconsistent",
                row.get::<i64, _>("id")
            )))
        }
    };

    let created_at: String = row.get("created_at");

    Ok(Resource {
        id: row.get::<i64, _>("id") as u64,
        name: row.get("name"),
        slug: row.get("slug"),
        status,
        owner,
        moderated_by: row.get::<Option<i64>, _>("moderated_by").map(|v| v as u64),
        moderated_at: parse_opt_timestamp(row.get("moderated_at")),
        rejection_reason: row.get("rejection_reason"),
        moderation_notes: row.get("moderation_notes"),
        latest_version_id: row
            .get::<Option<i64>, _>("latest_version_id")
            .map(|v| v as u64),
        published_at: parse_opt_timestamp(row.get("published_at")),
        created_at: parse_timestamp(&created_at),
    })
}

fn version_from_row(row: &SqliteRow) -> Result<ResourceVersion, ModerationError> {
    let status: String = row.get("status");
    let status: VersionStatus = status.parse().map_err(storage_err)?;
    let created_at: String = row.get("created_at");

    Ok(ResourceVersion {
        id: row.get::<i64, _>("id") as u64,
        resource_id: row.get::<i64, _>("resource_id") as u64,
        version_number: row.get("version_number"),
        status,
        rejection_reason: row.get("rejection_reason"),
        published_at: parse_opt_timestamp(row.get("published_at")),
        created_at: parse_timestamp(&created_at),
    })
}

fn history_from_row(row: &SqliteRow) -> Result<StatusHistoryRecord, ModerationError> {
    let from_status: String = row.get("from_status");
    let to_status: String = row.get("to_status");
    let changed_at: String = row.get("changed_at");

    Ok(StatusHistoryRecord {
        id: row.get::<i64, _>("id") as u64,
        resource_id: row.get::<i64, _>("resource_id") as u64,
        from_status: from_status.parse().map_err(storage_err)?,
        to_status: to_status.parse().map_err(storage_err)?,
        reason: row.get("reason"),
        changed_by: row.get::<i64, _>("changed_by") as u64,
        changed_at: parse_timestamp(&changed_at),
    })
}

impl SqliteCatalogStore {
    pub fn new(pool: Pool<Sqlite>) -> Self {
        Self { pool }
    }

    /// Run database migrations to create required tables.
    pub async fn migrate(&self) -> Result<(), ModerationError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resources (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                name TEXT NOT NULL,
                slug TEXT NOT NULL UNIQUE,
                status TEXT NOT NULL,
                owner_user_id INTEGER,
                owner_team_id INTEGER,
                moderated_by INTEGER,
                moderated_at TEXT,
                rejection_reason TEXT,
                moderation_notes TEXT,
                latest_version_id INTEGER,
                published_at TEXT,
                created_at TEXT NOT NULL
            );
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resource_versions (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL,
                version_number TEXT NOT NULL,
                status TEXT NOT NULL,
                rejection_reason TEXT,
                published_at TEXT,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_resource_versions_resource
                ON resource_versions(resource_id, status);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS resource_status_history (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                resource_id INTEGER NOT NULL,
                from_status TEXT NOT NULL,
                to_status TEXT NOT NULL,
                reason TEXT,
                changed_by INTEGER NOT NULL,
                changed_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_status_history_resource
                ON resource_status_history(resource_id, id);
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }
}

async fn append_history(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    resource_id: u64,
    from: ResourceStatus,
    to: ResourceStatus,
    reason: Option<&str>,
    changed_by: u64,
    changed_at: DateTime<Utc>,
) -> Result<(), ModerationError> {
    sqlx::query(
        r#"
        INSERT INTO resource_status_history
            (resource_id, from_status, to_status, reason, changed_by, changed_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(resource_id as i64)
    .bind(from.to_string())
    .bind(to.to_string())
    .bind(reason)
    .bind(changed_by as i64)
    .bind(changed_at.to_rfc3339())
    .execute(&mut **tx)
    .await
    .map_err(storage_err)?;
    Ok(())
}

async fn fetch_resource(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    resource_id: u64,
) -> Result<Option<Resource>, ModerationError> {
    let row = sqlx::query("SELECT * FROM resources WHERE id = ?")
        .bind(resource_id as i64)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage_err)?;
    row.as_ref().map(resource_from_row).transpose()
}

async fn fetch_version(
    tx: &mut sqlx::Transaction<'_, Sqlite>,
    version_id: u64,
) -> Result<Option<ResourceVersion>, ModerationError> {
    let row = sqlx::query("SELECT * FROM resource_versions WHERE id = ?")
        .bind(version_id as i64)
        .fetch_optional(&mut **tx)
        .await
        .map_err(storage_err)?;
    row.as_ref().map(version_from_row).transpose()
}

#[async_trait]
impl CatalogStore for SqliteCatalogStore {
    async fn get_resource(&self, resource_id: u64) -> Result<Option<Resource>, ModerationError> {
        let row = sqlx::query("SELECT * FROM resources WHERE id = ?")
            .bind(resource_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(resource_from_row).transpose()
    }

    async fn get_version(
        &self,
        version_id: u64,
    ) -> Result<Option<ResourceVersion>, ModerationError> {
        let row = sqlx::query("SELECT * FROM resource_versions WHERE id = ?")
            .bind(version_id as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        row.as_ref().map(version_from_row).transpose()
    }

    async fn slug_in_use(&self, slug: &str) -> Result<bool, ModerationError> {
        let row = sqlx::query("SELECT 1 FROM resources WHERE slug = ?")
            .bind(slug)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;
        Ok(row.is_some())
    }

    async fn insert_resource(&self, new: NewResource) -> Result<Resource, ModerationError> {
        let (owner_user_id, owner_team_id) = match new.owner {
            ResourceOwner::User(id) => (Some(id as i64), None),
            ResourceOwner::Team(id) => (None, Some(id as i64)),
        };

        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let result = sqlx::query(
            r#"
            INSERT INTO resources (name, slug, status, owner_user_id, owner_team_id, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&new.name)
        .bind(&new.slug)
        .bind(ResourceStatus::Draft.to_string())
        .bind(owner_user_id)
        .bind(owner_team_id)
        .bind(new.created_at.to_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;
        let id = result.last_insert_rowid() as u64;

        // Seed record so the audit trail covers the resource's whole life.
        append_history(
            &mut tx,
            id,
            ResourceStatus::Draft,
            ResourceStatus::Draft,
            Some("Resource created"),
            new.created_by,
            new.created_at,
        )
        .await?;

        tx.commit().await.map_err(storage_err)?;

        Ok(Resource {
            id,
            name: new.name,
            slug: new.slug,
            status: ResourceStatus::Draft,
            owner: new.owner,
            moderated_by: None,
            moderated_at: None,
            rejection_reason: None,
            moderation_notes: None,
            latest_version_id: None,
            published_at: None,
            created_at: new.created_at,
        })
    }

    async fn insert_version(&self, new: NewVersion) -> Result<ResourceVersion, ModerationError> {
        let result = sqlx::query(
            r#"
            INSERT INTO resource_versions (resource_id, version_number, status, created_at)
            VALUES (?, ?, ?, ?)
            "#,
        )
        .bind(new.resource_id as i64)
        .bind(&new.version_number)
        .bind(VersionStatus::Pending.to_string())
        .bind(new.created_at.to_rfc3339())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(ResourceVersion {
            id: result.last_insert_rowid() as u64,
            resource_id: new.resource_id,
            version_number: new.version_number,
            status: VersionStatus::Pending,
            rejection_reason: None,
            published_at: None,
            created_at: new.created_at,
        })
    }

    async fn apply_moderation(
        &self,
        update: ResourceModerationUpdate,
    ) -> Result<Resource, ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let resource = fetch_resource(&mut tx, update.resource_id)
            .await?
            .ok_or(ModerationError::NotFound("Resource"))?;

        // Re-validate against the row state inside the transaction.
        validate_transition(resource.status, update.new_status)?;
        if update.new_status.requires_reason() && update.reason.is_none() {
            return Err(ModerationError::ReasonRequired);
        }

        let rejection_reason = if update.new_status.requires_reason() {
            update.reason.clone()
        } else {
            None
        };
        let moderation_notes = update.notes.clone().or(resource.moderation_notes.clone());
        let published_at = if update.new_status == ResourceStatus::Approved {
            resource.published_at.or(Some(update.moderated_at))
        } else {
            resource.published_at
        };

        sqlx::query(
            r#"
            UPDATE resources SET
                status = ?,
                moderated_by = ?,
                moderated_at = ?,
                rejection_reason = ?,
                moderation_notes = ?,
                published_at = ?
            WHERE id = ?
            "#,
        )
        .bind(update.new_status.to_string())
        .bind(update.moderator_id as i64)
        .bind(update.moderated_at.to_rfc3339())
        .bind(&rejection_reason)
        .bind(&moderation_notes)
        .bind(published_at.map(|t| t.to_rfc3339()))
        .bind(update.resource_id as i64)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?;

        append_history(
            &mut tx,
            update.resource_id,
            resource.status,
            update.new_status,
            update.reason.as_deref(),
            update.moderator_id,
            update.moderated_at,
        )
        .await?;

        tx.commit().await.map_err(storage_err)?;

        Ok(Resource {
            status: update.new_status,
            moderated_by: Some(update.moderator_id),
            moderated_at: Some(update.moderated_at),
            rejection_reason,
            moderation_notes,
            published_at,
            ..resource
        })
    }

    async fn apply_version_approval(
        &self,
        version_id: u64,
        actor_id: u64,
        approved_at: DateTime<Utc>,
    ) -> Result<VersionApproval, ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let mut version = fetch_version(&mut tx, version_id)
            .await?
            .ok_or(ModerationError::NotFound("Version"))?;
        if version.status != VersionStatus::Pending {
            return Err(ModerationError::NotPending);
        }
        let mut resource = fetch_resource(&mut tx, version.resource_id)
            .await?
            .ok_or(ModerationError::NotFound("Resource"))?;

        // The sibling count and the conditional resource update must see the
        // same snapshot, which is why they share this transaction.
        let approved_siblings: i64 = sqlx::query(
            "SELECT COUNT(*) AS n FROM resource_versions WHERE resource_id = ? AND status = ?",
        )
        .bind(resource.id as i64)
        .bind(VersionStatus::Approved.to_string())
        .fetch_one(&mut *tx)
        .await
        .map_err(storage_err)?
        .get("n");
        let first_version = approved_siblings == 0;

        sqlx::query("UPDATE resource_versions SET status = ?, published_at = ? WHERE id = ?")
            .bind(VersionStatus::Approved.to_string())
            .bind(approved_at.to_rfc3339())
            .bind(version.id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        version.status = VersionStatus::Approved;
        version.published_at = Some(approved_at);

        let from = resource.status;
        if first_version && resource.status == ResourceStatus::Pending {
            // First approved version publishes the resource itself.
            resource.status = ResourceStatus::Approved;
        }
        resource.latest_version_id = Some(version.id);

        sqlx::query("UPDATE resources SET status = ?, latest_version_id = ? WHERE id = ?")
            .bind(resource.status.to_string())
            .bind(version.id as i64)
            .bind(resource.id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;

        append_history(
            &mut tx,
            resource.id,
            from,
            resource.status,
            Some(&format!("Version {} approved", version.version_number)),
            actor_id,
            approved_at,
        )
        .await?;

        tx.commit().await.map_err(storage_err)?;

        Ok(VersionApproval {
            resource,
            version,
            first_version,
        })
    }

    async fn apply_version_rejection(
        &self,
        version_id: u64,
        actor_id: u64,
        reason: &str,
        rejected_at: DateTime<Utc>,
    ) -> Result<VersionRejection, ModerationError> {
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let mut version = fetch_version(&mut tx, version_id)
            .await?
            .ok_or(ModerationError::NotFound("Version"))?;
        if version.status != VersionStatus::Pending {
            return Err(ModerationError::NotPending);
        }
        let resource = fetch_resource(&mut tx, version.resource_id)
            .await?
            .ok_or(ModerationError::NotFound("Resource"))?;

        sqlx::query("UPDATE resource_versions SET status = ?, rejection_reason = ? WHERE id = ?")
            .bind(VersionStatus::Rejected.to_string())
            .bind(reason)
            .bind(version.id as i64)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        version.status = VersionStatus::Rejected;
        version.rejection_reason = Some(reason.to_string());

        // The resource keeps its current status; the audit trail still
        // records the decision.
        append_history(
            &mut tx,
            resource.id,
            resource.status,
            resource.status,
            Some(&format!(
                "Version {} rejected: {}",
                version.version_number, reason
            )),
            actor_id,
            rejected_at,
        )
        .await?;

        tx.commit().await.map_err(storage_err)?;

        Ok(VersionRejection { resource, version })
    }

    async fn history_for_resource(
        &self,
        resource_id: u64,
    ) -> Result<Vec<StatusHistoryRecord>, ModerationError> {
        let rows = sqlx::query(
            r#"
            SELECT * FROM resource_status_history
            WHERE resource_id = ?
            ORDER BY changed_at DESC, id DESC
            "#,
        )
        .bind(resource_id as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(storage_err)?;

        rows.iter().map(history_from_row).collect()
    }
}
