// Notification domain models - kinds, preference switches, and the
// compile-time mapping between them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Notification not found")]
    NotFound,

    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// KINDS & PREFERENCES
// ============================================================================

/// Every notification the platform can deliver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    LikedProjectUpdate,
    NewCreatorUpload,
    NewFollower,
    VersionApproved,
    VersionRejected,
    CollectionAddition,
    ShowcaseLike,
    ShowcaseComment,
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            NotificationKind::LikedProjectUpdate => "LIKED_PROJECT_UPDATE",
            NotificationKind::NewCreatorUpload => "NEW_CREATOR_UPLOAD",
            NotificationKind::NewFollower => "NEW_FOLLOWER",
            NotificationKind::VersionApproved => "VERSION_APPROVED",
            NotificationKind::VersionRejected => "VERSION_REJECTED",
            NotificationKind::CollectionAddition => "COLLECTION_ADDITION",
            NotificationKind::ShowcaseLike => "SHOWCASE_LIKE",
            NotificationKind::ShowcaseComment => "SHOWCASE_COMMENT",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for NotificationKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "LIKED_PROJECT_UPDATE" => Ok(NotificationKind::LikedProjectUpdate),
            "NEW_CREATOR_UPLOAD" => Ok(NotificationKind::NewCreatorUpload),
            "NEW_FOLLOWER" => Ok(NotificationKind::NewFollower),
            "VERSION_APPROVED" => Ok(NotificationKind::VersionApproved),
            "VERSION_REJECTED" => Ok(NotificationKind::VersionRejected),
            "COLLECTION_ADDITION" => Ok(NotificationKind::CollectionAddition),
            "SHOWCASE_LIKE" => Ok(NotificationKind::ShowcaseLike),
            "SHOWCASE_COMMENT" => Ok(NotificationKind::ShowcaseComment),
            other => Err(format!("unknown notification kind: {}", other)),
        }
    }
}

/// The six per-user opt-out switches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreferenceSwitch {
    LikedProjectUpdates,
    NewCreatorUploads,
    NewFollowers,
    VersionStatus,
    CollectionAdditions,
    ShowcaseInteractions,
}

/// Which switch gates a kind. Approval and rejection share the single
/// version-status switch; both showcase kinds share showcase-interactions.
///
/// `None` means the kind has no switch and is delivered unconditionally -
/// the fail-open default for kinds added here before a switch exists for
/// them. Every current kind is mapped.
pub fn preference_switch(kind: NotificationKind) -> Option<PreferenceSwitch> {
    match kind {
        NotificationKind::LikedProjectUpdate => Some(PreferenceSwitch::LikedProjectUpdates),
        NotificationKind::NewCreatorUpload => Some(PreferenceSwitch::NewCreatorUploads),
        NotificationKind::NewFollower => Some(PreferenceSwitch::NewFollowers),
        NotificationKind::VersionApproved => Some(PreferenceSwitch::VersionStatus),
        NotificationKind::VersionRejected => Some(PreferenceSwitch::VersionStatus),
        NotificationKind::CollectionAddition => Some(PreferenceSwitch::CollectionAdditions),
        NotificationKind::ShowcaseLike => Some(PreferenceSwitch::ShowcaseInteractions),
        NotificationKind::ShowcaseComment => Some(PreferenceSwitch::ShowcaseInteractions),
    }
}

/// A user's notification preferences. Every switch defaults to enabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationPreferences {
    pub liked_project_updates: bool,
    pub new_creator_uploads: bool,
    pub new_followers: bool,
    pub version_status: bool,
    pub collection_additions: bool,
    pub showcase_interactions: bool,
}

impl Default for NotificationPreferences {
    fn default() -> Self {
        Self {
            liked_project_updates: true,
            new_creator_uploads: true,
            new_followers: true,
            version_status: true,
            collection_additions: true,
            showcase_interactions: true,
        }
    }
}

impl NotificationPreferences {
    pub fn is_enabled(&self, switch: PreferenceSwitch) -> bool {
        match switch {
            PreferenceSwitch::LikedProjectUpdates => self.liked_project_updates,
            PreferenceSwitch::NewCreatorUploads => self.new_creator_uploads,
            PreferenceSwitch::NewFollowers => self.new_followers,
            PreferenceSwitch::VersionStatus => self.version_status,
            PreferenceSwitch::CollectionAdditions => self.collection_additions,
            PreferenceSwitch::ShowcaseInteractions => self.showcase_interactions,
        }
    }

    pub fn set_enabled(&mut self, switch: PreferenceSwitch, enabled: bool) {
        match switch {
            PreferenceSwitch::LikedProjectUpdates => self.liked_project_updates = enabled,
            PreferenceSwitch::NewCreatorUploads => self.new_creator_uploads = enabled,
            PreferenceSwitch::NewFollowers => self.new_followers = enabled,
            PreferenceSwitch::VersionStatus => self.version_status = enabled,
            PreferenceSwitch::CollectionAdditions => self.collection_additions = enabled,
            PreferenceSwitch::ShowcaseInteractions => self.showcase_interactions = enabled,
        }
    }
}

// ============================================================================
// DELIVERY UNITS
// ============================================================================

/// A persisted notification for one recipient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: u64,
    pub user_id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    /// Opaque key-value data for the UI.
    pub payload: serde_json::Value,
    pub read: bool,
    pub created_at: DateTime<Utc>,
}

/// Fields for persisting a new notification.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: u64,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Optional filters for listing a user's notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotificationFilter {
    pub kind: Option<NotificationKind>,
    pub read: Option<bool>,
    pub limit: Option<u32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_KINDS: [NotificationKind; 8] = [
        NotificationKind::LikedProjectUpdate,
        NotificationKind::NewCreatorUpload,
        NotificationKind::NewFollower,
        NotificationKind::VersionApproved,
        NotificationKind::VersionRejected,
        NotificationKind::CollectionAddition,
        NotificationKind::ShowcaseLike,
        NotificationKind::ShowcaseComment,
    ];

    #[test]
    fn kinds_round_trip_through_strings() {
        for kind in ALL_KINDS {
            let parsed: NotificationKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn version_kinds_share_one_switch() {
        assert_eq!(
            preference_switch(NotificationKind::VersionApproved),
            Some(PreferenceSwitch::VersionStatus)
        );
        assert_eq!(
            preference_switch(NotificationKind::VersionRejected),
            Some(PreferenceSwitch::VersionStatus)
        );
    }

    #[test]
    fn showcase_kinds_share_one_switch() {
        assert_eq!(
            preference_switch(NotificationKind::ShowcaseLike),
            Some(PreferenceSwitch::ShowcaseInteractions)
        );
        assert_eq!(
            preference_switch(NotificationKind::ShowcaseComment),
            Some(PreferenceSwitch::ShowcaseInteractions)
        );
    }

    #[test]
    fn defaults_enable_every_switch() {
        let prefs = NotificationPreferences::default();
        for kind in ALL_KINDS {
            let switch = preference_switch(kind).unwrap();
            assert!(prefs.is_enabled(switch), "{} should default on", kind);
        }
    }

    #[test]
    fn set_enabled_flips_only_the_named_switch() {
        let mut prefs = NotificationPreferences::default();
        prefs.set_enabled(PreferenceSwitch::VersionStatus, false);

        assert!(!prefs.is_enabled(PreferenceSwitch::VersionStatus));
        assert!(prefs.is_enabled(PreferenceSwitch::NewCreatorUploads));
        assert!(prefs.is_enabled(PreferenceSwitch::NewFollowers));
    }
}
