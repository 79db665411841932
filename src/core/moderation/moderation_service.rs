// Moderation coordinators - core business logic for resource and version
// moderation.
//
// This service handles:
// - Resource creation (slug dedup + seeded audit trail)
// - The resource moderation state machine (approve/reject/suspend/archive)
// - Version approval with the first-publish cascade
// - The append-only status history
//
// NO storage dependencies here - just pure domain logic over the
// CatalogStore port. Notification fan-out runs post-commit on a spawned
// task and can never fail or delay a committed decision.

use super::fanout::ModerationFanout;
use super::moderation_models::{
    ModerationError, NewResource, NewVersion, Resource, ResourceModerationOutcome,
    ResourceModerationUpdate, ResourceOwner, ResourceStatus, ResourceVersion,
    StatusHistoryRecord, VersionApproval, VersionModerationOutcome, VersionRejection,
    VersionStatus,
};
use super::slug;
use super::status_machine::validate_transition;
use crate::core::notifications::{NotificationStore, UserDirectory};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

// ============================================================================
// STORAGE TRAIT (PORT)
// ============================================================================

/// Persistence for resources, versions, and the status history.
///
/// Every `apply_*` method is a single all-or-nothing transaction, and
/// implementations must re-check the preconditions (transition legality,
/// version pendingness, sibling counts) against the row state they read
/// inside that transaction, so two raced calls cannot both commit.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn get_resource(&self, resource_id: u64) -> Result<Option<Resource>, ModerationError>;

    async fn get_version(
        &self,
        version_id: u64,
    ) -> Result<Option<ResourceVersion>, ModerationError>;

    async fn slug_in_use(&self, slug: &str) -> Result<bool, ModerationError>;

    /// Insert a Draft resource and its seed history record atomically.
    async fn insert_resource(&self, new: NewResource) -> Result<Resource, ModerationError>;

    /// Insert a Pending version for an existing resource.
    async fn insert_version(&self, new: NewVersion) -> Result<ResourceVersion, ModerationError>;

    /// Apply a validated moderation decision: status + moderator metadata +
    /// rejection-reason handling + notes merge + history append, atomically.
    async fn apply_moderation(
        &self,
        update: ResourceModerationUpdate,
    ) -> Result<Resource, ModerationError>;

    /// Approve a pending version. The approved-sibling count and the
    /// conditional resource update happen inside the same transaction.
    async fn apply_version_approval(
        &self,
        version_id: u64,
        actor_id: u64,
        approved_at: DateTime<Utc>,
    ) -> Result<VersionApproval, ModerationError>;

    /// Reject a pending version, storing the reason on the version. The
    /// parent resource's status is never changed.
    async fn apply_version_rejection(
        &self,
        version_id: u64,
        actor_id: u64,
        reason: &str,
        rejected_at: DateTime<Utc>,
    ) -> Result<VersionRejection, ModerationError>;

    /// History records for a resource, newest first.
    async fn history_for_resource(
        &self,
        resource_id: u64,
    ) -> Result<Vec<StatusHistoryRecord>, ModerationError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct ModerationService<C, S, D>
where
    C: CatalogStore,
    S: NotificationStore,
    D: UserDirectory,
{
    catalog: C,
    fanout: Arc<ModerationFanout<S, D>>,
}

fn non_empty(reason: Option<&str>) -> Option<String> {
    reason
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .map(str::to_string)
}

impl<C, S, D> ModerationService<C, S, D>
where
    C: CatalogStore,
    S: NotificationStore + 'static,
    D: UserDirectory + 'static,
{
    pub fn new(catalog: C, fanout: Arc<ModerationFanout<S, D>>) -> Self {
        Self { catalog, fanout }
    }

    /// Create a Draft resource owned by a user or a team. The slug is
    /// derived from the name and deduplicated with a numeric suffix; the
    /// audit trail is seeded with a Draft -> Draft record.
    pub async fn create_resource(
        &self,
        actor_id: u64,
        name: &str,
        owner: ResourceOwner,
    ) -> Result<Resource, ModerationError> {
        let base = slug::slugify(name);
        let mut candidate = base.clone();
        let mut attempt = 0;
        while self.catalog.slug_in_use(&candidate).await? {
            attempt += 1;
            candidate = slug::with_suffix(&base, attempt);
        }

        self.catalog
            .insert_resource(NewResource {
                name: name.to_string(),
                slug: candidate,
                owner,
                created_by: actor_id,
                created_at: Utc::now(),
            })
            .await
    }

    /// Submit a new Pending version for an existing resource. This is also
    /// the resubmission path after a rejection.
    pub async fn submit_version(
        &self,
        resource_id: u64,
        version_number: &str,
    ) -> Result<ResourceVersion, ModerationError> {
        if self.catalog.get_resource(resource_id).await?.is_none() {
            return Err(ModerationError::NotFound("Resource"));
        }

        self.catalog
            .insert_version(NewVersion {
                resource_id,
                version_number: version_number.to_string(),
                created_at: Utc::now(),
            })
            .await
    }

    /// Drive the resource state machine directly. The caller has already
    /// authorized the actor; transition legality is still re-validated here
    /// because this coordinator owns that invariant.
    pub async fn moderate_resource(
        &self,
        actor_id: u64,
        resource_id: u64,
        new_status: ResourceStatus,
        reason: Option<&str>,
        notes: Option<&str>,
    ) -> Result<ResourceModerationOutcome, ModerationError> {
        let resource = self
            .catalog
            .get_resource(resource_id)
            .await?
            .ok_or(ModerationError::NotFound("Resource"))?;

        validate_transition(resource.status, new_status)?;

        let reason = non_empty(reason);
        if new_status.requires_reason() && reason.is_none() {
            return Err(ModerationError::ReasonRequired);
        }

        let updated = self
            .catalog
            .apply_moderation(ResourceModerationUpdate {
                resource_id,
                new_status,
                reason,
                notes: notes.map(str::to_string),
                moderator_id: actor_id,
                moderated_at: Utc::now(),
            })
            .await?;

        tracing::info!(
            resource_id,
            actor = actor_id,
            from = %resource.status,
            to = %new_status,
            "resource moderated"
        );

        Ok(ResourceModerationOutcome {
            message: format!("Resource {} successfully", new_status.action_message()),
            resource: updated,
        })
    }

    /// Approve a pending version. If it is the resource's first approved
    /// version and the resource is still Pending, the resource is published
    /// in the same transaction. Fan-out (owner + followers) runs after
    /// commit on a spawned task.
    pub async fn approve_version(
        &self,
        actor_id: u64,
        version_id: u64,
    ) -> Result<VersionModerationOutcome, ModerationError> {
        let version = self
            .catalog
            .get_version(version_id)
            .await?
            .ok_or(ModerationError::NotFound("Version"))?;
        if version.status != VersionStatus::Pending {
            return Err(ModerationError::NotPending);
        }

        let approval = self
            .catalog
            .apply_version_approval(version_id, actor_id, Utc::now())
            .await?;

        tracing::info!(
            version_id,
            resource_id = approval.resource.id,
            actor = actor_id,
            first_version = approval.first_version,
            "version approved"
        );

        let fanout = Arc::clone(&self.fanout);
        let resource = approval.resource.clone();
        let approved = approval.version.clone();
        tokio::spawn(async move {
            fanout.version_approved(resource, approved).await;
        });

        let message = if approval.first_version {
            "Version approved and resource published"
        } else {
            "Version approved"
        };

        Ok(VersionModerationOutcome {
            message: message.to_string(),
            version: approval.version,
        })
    }

    /// Reject a pending version. The parent resource's status is left
    /// untouched even when this was its only pending version - the resource
    /// waits in Pending for a corrected resubmission.
    pub async fn reject_version(
        &self,
        actor_id: u64,
        version_id: u64,
        reason: &str,
    ) -> Result<VersionModerationOutcome, ModerationError> {
        let reason = non_empty(Some(reason)).ok_or(ModerationError::ReasonRequired)?;

        let version = self
            .catalog
            .get_version(version_id)
            .await?
            .ok_or(ModerationError::NotFound("Version"))?;
        if version.status != VersionStatus::Pending {
            return Err(ModerationError::NotPending);
        }

        let rejection = self
            .catalog
            .apply_version_rejection(version_id, actor_id, &reason, Utc::now())
            .await?;

        tracing::info!(
            version_id,
            resource_id = rejection.resource.id,
            actor = actor_id,
            "version rejected"
        );

        let fanout = Arc::clone(&self.fanout);
        let resource = rejection.resource.clone();
        let rejected = rejection.version.clone();
        tokio::spawn(async move {
            fanout.version_rejected(resource, rejected, reason).await;
        });

        Ok(VersionModerationOutcome {
            message: "Version rejected".to_string(),
            version: rejection.version,
        })
    }

    /// Full audit trail for a resource, newest first.
    pub async fn moderation_history(
        &self,
        resource_id: u64,
    ) -> Result<Vec<StatusHistoryRecord>, ModerationError> {
        if self.catalog.get_resource(resource_id).await?.is_none() {
            return Err(ModerationError::NotFound("Resource"));
        }
        self.catalog.history_for_resource(resource_id).await
    }

    pub async fn get_resource(&self, resource_id: u64) -> Result<Resource, ModerationError> {
        self.catalog
            .get_resource(resource_id)
            .await?
            .ok_or(ModerationError::NotFound("Resource"))
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::notifications::notification_service::testing::{
        MockDirectory, MockNotificationStore,
    };
    use crate::core::notifications::NotificationService;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Inner {
        resources: HashMap<u64, Resource>,
        versions: HashMap<u64, ResourceVersion>,
        history: Vec<StatusHistoryRecord>,
        next_id: u64,
    }

    /// In-memory catalog for testing. Mirrors the SQLite store's semantics,
    /// including the in-transaction re-validation.
    struct MockCatalogStore {
        inner: Mutex<Inner>,
    }

    impl MockCatalogStore {
        fn new() -> Self {
            Self {
                inner: Mutex::new(Inner {
                    next_id: 1,
                    ..Default::default()
                }),
            }
        }

        fn history_len(&self) -> usize {
            self.inner.lock().unwrap().history.len()
        }
    }

    fn alloc_id(inner: &mut Inner) -> u64 {
        let id = inner.next_id;
        inner.next_id += 1;
        id
    }

    fn push_history(
        inner: &mut Inner,
        resource_id: u64,
        from: ResourceStatus,
        to: ResourceStatus,
        reason: Option<String>,
        changed_by: u64,
        changed_at: DateTime<Utc>,
    ) {
        let id = alloc_id(inner);
        inner.history.push(StatusHistoryRecord {
            id,
            resource_id,
            from_status: from,
            to_status: to,
            reason,
            changed_by,
            changed_at,
        });
    }

    #[async_trait]
    impl CatalogStore for MockCatalogStore {
        async fn get_resource(
            &self,
            resource_id: u64,
        ) -> Result<Option<Resource>, ModerationError> {
            Ok(self.inner.lock().unwrap().resources.get(&resource_id).cloned())
        }

        async fn get_version(
            &self,
            version_id: u64,
        ) -> Result<Option<ResourceVersion>, ModerationError> {
            Ok(self.inner.lock().unwrap().versions.get(&version_id).cloned())
        }

        async fn slug_in_use(&self, slug: &str) -> Result<bool, ModerationError> {
            Ok(self
                .inner
                .lock()
                .unwrap()
                .resources
                .values()
                .any(|r| r.slug == slug))
        }

        async fn insert_resource(&self, new: NewResource) -> Result<Resource, ModerationError> {
            let mut inner = self.inner.lock().unwrap();
            let id = alloc_id(&mut inner);
            let resource = Resource {
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
            };
            inner.resources.insert(id, resource.clone());
            push_history(
                &mut inner,
                id,
                ResourceStatus::Draft,
                ResourceStatus::Draft,
                Some("Resource created".to_string()),
                new.created_by,
                new.created_at,
            );
            Ok(resource)
        }

        async fn insert_version(
            &self,
            new: NewVersion,
        ) -> Result<ResourceVersion, ModerationError> {
            let mut inner = self.inner.lock().unwrap();
            let id = alloc_id(&mut inner);
            let version = ResourceVersion {
                id,
                resource_id: new.resource_id,
                version_number: new.version_number,
                status: VersionStatus::Pending,
                rejection_reason: None,
                published_at: None,
                created_at: new.created_at,
            };
            inner.versions.insert(id, version.clone());
            Ok(version)
        }

        async fn apply_moderation(
            &self,
            update: ResourceModerationUpdate,
        ) -> Result<Resource, ModerationError> {
            let mut inner = self.inner.lock().unwrap();
            let resource = inner
                .resources
                .get(&update.resource_id)
                .cloned()
                .ok_or(ModerationError::NotFound("Resource"))?;

            validate_transition(resource.status, update.new_status)?;
            if update.new_status.requires_reason() && update.reason.is_none() {
                return Err(ModerationError::ReasonRequired);
            }

            let from = resource.status;
            let mut updated = resource;
            updated.status = update.new_status;
            updated.moderated_by = Some(update.moderator_id);
            updated.moderated_at = Some(update.moderated_at);
            updated.rejection_reason = if update.new_status.requires_reason() {
                update.reason.clone()
            } else {
                None
            };
            updated.moderation_notes = update.notes.clone().or(updated.moderation_notes);
            if update.new_status == ResourceStatus::Approved && updated.published_at.is_none() {
                updated.published_at = Some(update.moderated_at);
            }

            inner.resources.insert(updated.id, updated.clone());
            push_history(
                &mut inner,
                updated.id,
                from,
                update.new_status,
                update.reason,
                update.moderator_id,
                update.moderated_at,
            );
            Ok(updated)
        }

        async fn apply_version_approval(
            &self,
            version_id: u64,
            actor_id: u64,
            approved_at: DateTime<Utc>,
        ) -> Result<VersionApproval, ModerationError> {
            let mut inner = self.inner.lock().unwrap();
            let mut version = inner
                .versions
                .get(&version_id)
                .cloned()
                .ok_or(ModerationError::NotFound("Version"))?;
            if version.status != VersionStatus::Pending {
                return Err(ModerationError::NotPending);
            }
            let mut resource = inner
                .resources
                .get(&version.resource_id)
                .cloned()
                .ok_or(ModerationError::NotFound("Resource"))?;

            let first_version = !inner
                .versions
                .values()
                .any(|v| v.resource_id == resource.id && v.status == VersionStatus::Approved);

            version.status = VersionStatus::Approved;
            version.published_at = Some(approved_at);

            let from = resource.status;
            if first_version && resource.status == ResourceStatus::Pending {
                resource.status = ResourceStatus::Approved;
            }
            resource.latest_version_id = Some(version.id);

            inner.versions.insert(version.id, version.clone());
            inner.resources.insert(resource.id, resource.clone());
            push_history(
                &mut inner,
                resource.id,
                from,
                resource.status,
                Some(format!("Version {} approved", version.version_number)),
                actor_id,
                approved_at,
            );

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
            let mut inner = self.inner.lock().unwrap();
            let mut version = inner
                .versions
                .get(&version_id)
                .cloned()
                .ok_or(ModerationError::NotFound("Version"))?;
            if version.status != VersionStatus::Pending {
                return Err(ModerationError::NotPending);
            }
            let resource = inner
                .resources
                .get(&version.resource_id)
                .cloned()
                .ok_or(ModerationError::NotFound("Resource"))?;

            version.status = VersionStatus::Rejected;
            version.rejection_reason = Some(reason.to_string());
            inner.versions.insert(version.id, version.clone());
            push_history(
                &mut inner,
                resource.id,
                resource.status,
                resource.status,
                Some(format!(
                    "Version {} rejected: {}",
                    version.version_number, reason
                )),
                actor_id,
                rejected_at,
            );

            Ok(VersionRejection { resource, version })
        }

        async fn history_for_resource(
            &self,
            resource_id: u64,
        ) -> Result<Vec<StatusHistoryRecord>, ModerationError> {
            let inner = self.inner.lock().unwrap();
            let mut records: Vec<StatusHistoryRecord> = inner
                .history
                .iter()
                .filter(|h| h.resource_id == resource_id)
                .cloned()
                .collect();
            records.sort_by(|a, b| b.id.cmp(&a.id));
            Ok(records)
        }
    }

    type TestService = ModerationService<MockCatalogStore, MockNotificationStore, MockDirectory>;

    fn service() -> TestService {
        let notifications = Arc::new(NotificationService::new(
            MockNotificationStore::new(),
            MockDirectory::new(),
        ));
        ModerationService::new(
            MockCatalogStore::new(),
            Arc::new(ModerationFanout::new(notifications)),
        )
    }

    const MOD: u64 = 900;

    async fn pending_resource(svc: &TestService) -> Resource {
        let resource = svc
            .create_resource(1, "My Mod", ResourceOwner::User(1))
            .await
            .unwrap();
        svc.moderate_resource(MOD, resource.id, ResourceStatus::Pending, None, None)
            .await
            .unwrap()
            .resource
    }

    #[tokio::test]
    async fn create_resource_seeds_the_audit_trail() {
        let svc = service();
        let resource = svc
            .create_resource(1, "My Mod", ResourceOwner::User(1))
            .await
            .unwrap();

        assert_eq!(resource.status, ResourceStatus::Draft);
        assert_eq!(resource.slug, "my-mod");

        let history = svc.moderation_history(resource.id).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].from_status, ResourceStatus::Draft);
        assert_eq!(history[0].to_status, ResourceStatus::Draft);
        assert_eq!(history[0].reason.as_deref(), Some("Resource created"));
    }

    #[tokio::test]
    async fn slugs_deduplicate_with_numeric_suffixes() {
        let svc = service();
        let first = svc
            .create_resource(1, "My Mod", ResourceOwner::User(1))
            .await
            .unwrap();
        let second = svc
            .create_resource(2, "My Mod", ResourceOwner::User(2))
            .await
            .unwrap();
        let third = svc
            .create_resource(3, "My Mod!", ResourceOwner::User(3))
            .await
            .unwrap();

        assert_eq!(first.slug, "my-mod");
        assert_eq!(second.slug, "my-mod-2");
        assert_eq!(third.slug, "my-mod-3");
    }

    #[tokio::test]
    async fn submit_version_requires_an_existing_resource() {
        let svc = service();
        assert!(matches!(
            svc.submit_version(404, "1.0.0").await,
            Err(ModerationError::NotFound("Resource"))
        ));
    }

    #[tokio::test]
    async fn draft_to_pending_writes_one_history_record() {
        let svc = service();
        let resource = svc
            .create_resource(1, "My Mod", ResourceOwner::User(1))
            .await
            .unwrap();

        let outcome = svc
            .moderate_resource(MOD, resource.id, ResourceStatus::Pending, None, None)
            .await
            .unwrap();
        assert_eq!(outcome.resource.status, ResourceStatus::Pending);
        assert_eq!(outcome.message, "Resource set to pending successfully");

        let history = svc.moderation_history(resource.id).await.unwrap();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].from_status, ResourceStatus::Draft);
        assert_eq!(history[0].to_status, ResourceStatus::Pending);
    }

    #[tokio::test]
    async fn illegal_transition_fails_and_adds_no_history() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        let before = svc.catalog.history_len();

        let err = svc
            .moderate_resource(MOD, resource.id, ResourceStatus::Archived, None, None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ModerationError::InvalidTransition {
                from: ResourceStatus::Pending,
                to: ResourceStatus::Archived,
            }
        ));
        assert_eq!(svc.catalog.history_len(), before);
    }

    #[tokio::test]
    async fn rejection_requires_a_reason() {
        let svc = service();
        let resource = pending_resource(&svc).await;

        for reason in [None, Some(""), Some("   ")] {
            let err = svc
                .moderate_resource(MOD, resource.id, ResourceStatus::Rejected, reason, None)
                .await
                .unwrap_err();
            assert!(matches!(err, ModerationError::ReasonRequired));
        }

        let outcome = svc
            .moderate_resource(
                MOD,
                resource.id,
                ResourceStatus::Rejected,
                Some("incomplete listing"),
                None,
            )
            .await
            .unwrap();
        assert_eq!(
            outcome.resource.rejection_reason.as_deref(),
            Some("incomplete listing")
        );
    }

    #[tokio::test]
    async fn rejection_reason_clears_on_non_reason_statuses() {
        let svc = service();
        let resource = pending_resource(&svc).await;

        svc.moderate_resource(
            MOD,
            resource.id,
            ResourceStatus::Rejected,
            Some("bad metadata"),
            None,
        )
        .await
        .unwrap();

        // Rejected -> Pending clears the stored reason.
        let outcome = svc
            .moderate_resource(MOD, resource.id, ResourceStatus::Pending, None, None)
            .await
            .unwrap();
        assert_eq!(outcome.resource.rejection_reason, None);
    }

    #[tokio::test]
    async fn approval_sets_published_at_exactly_once() {
        let svc = service();
        let resource = pending_resource(&svc).await;

        let approved = svc
            .moderate_resource(MOD, resource.id, ResourceStatus::Approved, None, None)
            .await
            .unwrap()
            .resource;
        let first_published = approved.published_at.unwrap();

        svc.moderate_resource(
            MOD,
            resource.id,
            ResourceStatus::Suspended,
            Some("tos violation"),
            None,
        )
        .await
        .unwrap();
        let re_approved = svc
            .moderate_resource(MOD, resource.id, ResourceStatus::Approved, None, None)
            .await
            .unwrap()
            .resource;

        assert_eq!(re_approved.published_at, Some(first_published));
    }

    #[tokio::test]
    async fn notes_merge_preserves_prior_value_when_absent() {
        let svc = service();
        let resource = pending_resource(&svc).await;

        let with_notes = svc
            .moderate_resource(
                MOD,
                resource.id,
                ResourceStatus::Approved,
                None,
                Some("checked archive contents"),
            )
            .await
            .unwrap()
            .resource;
        assert_eq!(
            with_notes.moderation_notes.as_deref(),
            Some("checked archive contents")
        );

        let suspended = svc
            .moderate_resource(
                MOD,
                resource.id,
                ResourceStatus::Suspended,
                Some("dmca"),
                None,
            )
            .await
            .unwrap()
            .resource;
        assert_eq!(
            suspended.moderation_notes.as_deref(),
            Some("checked archive contents")
        );

        let overridden = svc
            .moderate_resource(
                MOD,
                resource.id,
                ResourceStatus::Approved,
                None,
                Some("dmca withdrawn"),
            )
            .await
            .unwrap()
            .resource;
        assert_eq!(overridden.moderation_notes.as_deref(), Some("dmca withdrawn"));
    }

    #[tokio::test]
    async fn first_version_approval_publishes_the_resource() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        let version = svc.submit_version(resource.id, "1.0.0").await.unwrap();

        let outcome = svc.approve_version(MOD, version.id).await.unwrap();
        assert_eq!(outcome.message, "Version approved and resource published");
        assert_eq!(outcome.version.status, VersionStatus::Approved);
        assert!(outcome.version.published_at.is_some());

        let resource = svc.get_resource(resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Approved);
        assert_eq!(resource.latest_version_id, Some(version.id));
    }

    #[tokio::test]
    async fn second_version_approval_only_advances_latest_version() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        let v1 = svc.submit_version(resource.id, "1.0.0").await.unwrap();
        svc.approve_version(MOD, v1.id).await.unwrap();

        let v2 = svc.submit_version(resource.id, "1.1.0").await.unwrap();
        let outcome = svc.approve_version(MOD, v2.id).await.unwrap();
        assert_eq!(outcome.message, "Version approved");

        let resource = svc.get_resource(resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Approved);
        assert_eq!(resource.latest_version_id, Some(v2.id));
    }

    #[tokio::test]
    async fn approving_a_non_pending_version_fails() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        let version = svc.submit_version(resource.id, "1.0.0").await.unwrap();
        svc.approve_version(MOD, version.id).await.unwrap();

        assert!(matches!(
            svc.approve_version(MOD, version.id).await,
            Err(ModerationError::NotPending)
        ));
        assert!(matches!(
            svc.approve_version(MOD, 404).await,
            Err(ModerationError::NotFound("Version"))
        ));
    }

    #[tokio::test]
    async fn rejecting_the_sole_pending_version_leaves_resource_pending() {
        let svc = service();
        let resource = pending_resource(&svc).await;

        // Reject, resubmit, reject again - the resource stays Pending the
        // whole time, awaiting a corrected resubmission.
        for attempt in 1..=2 {
            let version = svc
                .submit_version(resource.id, &format!("0.{}.0", attempt))
                .await
                .unwrap();
            let outcome = svc
                .reject_version(MOD, version.id, "malware found")
                .await
                .unwrap();
            assert_eq!(outcome.message, "Version rejected");
            assert_eq!(outcome.version.status, VersionStatus::Rejected);
            assert_eq!(
                outcome.version.rejection_reason.as_deref(),
                Some("malware found")
            );

            let resource = svc.get_resource(resource.id).await.unwrap();
            assert_eq!(resource.status, ResourceStatus::Pending);
        }
    }

    #[tokio::test]
    async fn rejecting_a_later_version_leaves_resource_approved() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        let v1 = svc.submit_version(resource.id, "1.0.0").await.unwrap();
        svc.approve_version(MOD, v1.id).await.unwrap();

        let v2 = svc.submit_version(resource.id, "1.1.0").await.unwrap();
        svc.reject_version(MOD, v2.id, "malware found")
            .await
            .unwrap();

        let resource = svc.get_resource(resource.id).await.unwrap();
        assert_eq!(resource.status, ResourceStatus::Approved);
        assert_eq!(resource.latest_version_id, Some(v1.id));
    }

    #[tokio::test]
    async fn reject_version_requires_a_reason() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        let version = svc.submit_version(resource.id, "1.0.0").await.unwrap();

        assert!(matches!(
            svc.reject_version(MOD, version.id, "  ").await,
            Err(ModerationError::ReasonRequired)
        ));
    }

    #[tokio::test]
    async fn history_is_newest_first() {
        let svc = service();
        let resource = pending_resource(&svc).await;
        svc.moderate_resource(MOD, resource.id, ResourceStatus::Approved, None, None)
            .await
            .unwrap();

        let history = svc.moderation_history(resource.id).await.unwrap();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].to_status, ResourceStatus::Approved);
        assert_eq!(history[1].to_status, ResourceStatus::Pending);
        assert_eq!(history[2].to_status, ResourceStatus::Draft);
        assert!(matches!(
            svc.moderation_history(404).await,
            Err(ModerationError::NotFound("Resource"))
        ));
    }
}
