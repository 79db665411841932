// Notification fan-out engine - preference-filtered delivery plus the
// read-side operations (listing, unread counts, read flags, preferences).
//
// NO storage dependencies here - just pure domain logic over the two ports.

use super::notification_models::{
    preference_switch, NewNotification, Notification, NotificationFilter, NotificationKind,
    NotificationPreferences, NotifyError,
};
use crate::core::moderation::UserRole;
use async_trait::async_trait;
use chrono::Utc;

// ============================================================================
// STORAGE TRAITS (PORTS)
// ============================================================================

/// Persistence for notification rows.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert(&self, new: NewNotification) -> Result<Notification, NotifyError>;

    /// Notifications for a user, newest first.
    async fn list_for_user(
        &self,
        user_id: u64,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, NotifyError>;

    async fn unread_count(&self, user_id: u64) -> Result<u64, NotifyError>;

    /// Mark one of the user's notifications read. `NotFound` if it does not
    /// exist or belongs to someone else.
    async fn mark_read(&self, notification_id: u64, user_id: u64)
        -> Result<Notification, NotifyError>;

    /// Mark all of the user's notifications read; returns how many changed.
    async fn mark_all_read(&self, user_id: u64) -> Result<u64, NotifyError>;

    async fn delete(&self, notification_id: u64, user_id: u64) -> Result<(), NotifyError>;
}

/// Read access to users, teams, follow edges, and preference switches.
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// `None` when the user does not exist.
    async fn preferences(
        &self,
        user_id: u64,
    ) -> Result<Option<NotificationPreferences>, NotifyError>;

    async fn set_preferences(
        &self,
        user_id: u64,
        prefs: NotificationPreferences,
    ) -> Result<(), NotifyError>;

    /// The owner edge of a team, if the team exists.
    async fn team_owner(&self, team_id: u64) -> Result<Option<u64>, NotifyError>;

    /// Users with a follow edge targeting `user_id`.
    async fn followers_of(&self, user_id: u64) -> Result<Vec<u64>, NotifyError>;

    async fn role_of(&self, user_id: u64) -> Result<Option<UserRole>, NotifyError>;
}

// ============================================================================
// CORE SERVICE
// ============================================================================

pub struct NotificationService<S: NotificationStore, D: UserDirectory> {
    store: S,
    directory: D,
}

impl<S: NotificationStore, D: UserDirectory> NotificationService<S, D> {
    pub fn new(store: S, directory: D) -> Self {
        Self { store, directory }
    }

    pub fn directory(&self) -> &D {
        &self.directory
    }

    /// Deliver one notification, honoring the recipient's preferences.
    ///
    /// Returns `Ok(None)` without creating anything when the recipient does
    /// not exist or has disabled the kind's switch. Kinds without a switch
    /// deliver unconditionally.
    pub async fn notify(
        &self,
        recipient_id: u64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        payload: serde_json::Value,
    ) -> Result<Option<Notification>, NotifyError> {
        let Some(prefs) = self.directory.preferences(recipient_id).await? else {
            return Ok(None);
        };

        let enabled = match preference_switch(kind) {
            Some(switch) => prefs.is_enabled(switch),
            None => true,
        };
        if !enabled {
            tracing::debug!(
                recipient = recipient_id,
                kind = %kind,
                "notification suppressed by preferences"
            );
            return Ok(None);
        }

        let notification = self
            .store
            .insert(NewNotification {
                user_id: recipient_id,
                kind,
                title: title.to_string(),
                message: message.to_string(),
                payload,
                created_at: Utc::now(),
            })
            .await?;

        Ok(Some(notification))
    }

    /// Deliver to every follower of `creator_id`, at most one notification
    /// each. A failing recipient is logged and skipped; the batch never
    /// aborts. Returns how many notifications were actually created.
    pub async fn notify_followers(
        &self,
        creator_id: u64,
        kind: NotificationKind,
        title: &str,
        message: &str,
        payload: serde_json::Value,
    ) -> Result<usize, NotifyError> {
        let followers = self.directory.followers_of(creator_id).await?;
        let mut delivered = 0;

        for follower in followers {
            match self
                .notify(follower, kind, title, message, payload.clone())
                .await
            {
                Ok(Some(_)) => delivered += 1,
                Ok(None) => {}
                Err(err) => {
                    tracing::warn!(
                        follower,
                        kind = %kind,
                        error = %err,
                        "failed to deliver follower notification"
                    );
                }
            }
        }

        Ok(delivered)
    }

    // ------------------------------------------------------------------
    // Read side
    // ------------------------------------------------------------------

    pub async fn notifications_for(
        &self,
        user_id: u64,
        filter: NotificationFilter,
    ) -> Result<Vec<Notification>, NotifyError> {
        self.store.list_for_user(user_id, filter).await
    }

    pub async fn unread_count(&self, user_id: u64) -> Result<u64, NotifyError> {
        self.store.unread_count(user_id).await
    }

    pub async fn mark_read(
        &self,
        notification_id: u64,
        user_id: u64,
    ) -> Result<Notification, NotifyError> {
        self.store.mark_read(notification_id, user_id).await
    }

    pub async fn mark_all_read(&self, user_id: u64) -> Result<u64, NotifyError> {
        self.store.mark_all_read(user_id).await
    }

    pub async fn delete_notification(
        &self,
        notification_id: u64,
        user_id: u64,
    ) -> Result<(), NotifyError> {
        self.store.delete(notification_id, user_id).await
    }

    // ------------------------------------------------------------------
    // Preferences (mutated only by the owning user; the transport passes
    // the session user's own id here)
    // ------------------------------------------------------------------

    pub async fn preferences(
        &self,
        user_id: u64,
    ) -> Result<Option<NotificationPreferences>, NotifyError> {
        self.directory.preferences(user_id).await
    }

    pub async fn update_preferences(
        &self,
        user_id: u64,
        prefs: NotificationPreferences,
    ) -> Result<NotificationPreferences, NotifyError> {
        if self.directory.preferences(user_id).await?.is_none() {
            return Err(NotifyError::NotFound);
        }
        self.directory.set_preferences(user_id, prefs).await?;
        Ok(prefs)
    }
}

// ============================================================================
// TESTS
// ============================================================================
