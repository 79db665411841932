// Post-commit notification fan-out for moderation decisions.
//
// Everything here runs AFTER the moderation transaction has committed, on
// a spawned task. Nothing in this file may fail the decision: every error
// is logged and swallowed.

use super::moderation_models::{Resource, ResourceOwner, ResourceVersion};
use crate::core::notifications::{
    NotificationKind, NotificationService, NotificationStore, UserDirectory,
};
use std::sync::Arc;

/// The single user accountable for a resource: the direct owner, or the
/// owning team's owner. `None` means the resource is orphaned (e.g. the
/// team row is gone) and callers must skip notification without failing.
pub async fn resolve_accountable_user<D: UserDirectory>(
    directory: &D,
    resource: &Resource,
) -> Option<u64> {
    match resource.owner {
        ResourceOwner::User(user_id) => Some(user_id),
        ResourceOwner::Team(team_id) => match directory.team_owner(team_id).await {
            Ok(owner) => owner,
            Err(err) => {
                tracing::warn!(
                    resource_id = resource.id,
                    team_id,
                    error = %err,
                    "team owner lookup failed during fan-out"
                );
                None
            }
        },
    }
}

/// Bridges the moderation coordinators to the notification engine.
pub struct ModerationFanout<S: NotificationStore, D: UserDirectory> {
    notifications: Arc<NotificationService<S, D>>,
}

impl<S: NotificationStore, D: UserDirectory> ModerationFanout<S, D> {
    pub fn new(notifications: Arc<NotificationService<S, D>>) -> Self {
        Self { notifications }
    }

    /// Owner gets VERSION_APPROVED, then the owner's followers each get
    /// NEW_CREATOR_UPLOAD. Best effort throughout.
    pub async fn version_approved(&self, resource: Resource, version: ResourceVersion) {
        let directory = self.notifications.directory();
        let Some(owner) = resolve_accountable_user(directory, &resource).await else {
            tracing::debug!(
                resource_id = resource.id,
                "no accountable owner; skipping approval fan-out"
            );
            return;
        };

        let payload = serde_json::json!({
            "resourceId": resource.id,
            "versionId": version.id,
        });

        if let Err(err) = self
            .notifications
            .notify(
                owner,
                NotificationKind::VersionApproved,
                "Version Approved",
                &format!(
                    "Version {} of {} has been approved",
                    version.version_number, resource.name
                ),
                payload.clone(),
            )
            .await
        {
            tracing::warn!(
                owner,
                resource_id = resource.id,
                error = %err,
                "failed to notify owner of version approval"
            );
        }

        match self
            .notifications
            .notify_followers(
                owner,
                NotificationKind::NewCreatorUpload,
                "New Upload",
                &format!(
                    "{} {} is now available",
                    resource.name, version.version_number
                ),
                payload,
            )
            .await
        {
            Ok(delivered) => {
                tracing::debug!(
                    owner,
                    resource_id = resource.id,
                    delivered,
                    "follower fan-out complete"
                );
            }
            Err(err) => {
                tracing::warn!(
                    owner,
                    resource_id = resource.id,
                    error = %err,
                    "follower fan-out failed"
                );
            }
        }
    }

    /// Owner gets a single VERSION_REJECTED with the reason. Followers are
    /// never notified of rejections.
    pub async fn version_rejected(
        &self,
        resource: Resource,
        version: ResourceVersion,
        reason: String,
    ) {
        let directory = self.notifications.directory();
        let Some(owner) = resolve_accountable_user(directory, &resource).await else {
            tracing::debug!(
                resource_id = resource.id,
                "no accountable owner; skipping rejection fan-out"
            );
            return;
        };

        let payload = serde_json::json!({
            "resourceId": resource.id,
            "versionId": version.id,
            "reason": reason,
        });

        if let Err(err) = self
            .notifications
            .notify(
                owner,
                NotificationKind::VersionRejected,
                "Version Rejected",
                &format!(
                    "Version {} of {} was rejected: {}",
                    version.version_number, resource.name, reason
                ),
                payload,
            )
            .await
        {
            tracing::warn!(
                owner,
                resource_id = resource.id,
                error = %err,
                "failed to notify owner of version rejection"
            );
        }
    }
}
