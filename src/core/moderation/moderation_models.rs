// Moderation domain models - data structures for the content moderation system.
//
// These are pure domain types with no storage dependencies.
// The infra layer converts these to and from database rows.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// ERRORS
// ============================================================================

#[derive(Debug, Error)]
pub enum ModerationError {
    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Invalid status transition from {from} to {to}")]
    InvalidTransition {
        from: ResourceStatus,
        to: ResourceStatus,
    },

    #[error("Reason is required for rejection or suspension")]
    ReasonRequired,

    #[error("Version is not pending moderation")]
    NotPending,

    #[error("Insufficient permissions. Moderator role or higher required")]
    Forbidden,

    #[error("Storage error: {0}")]
    Storage(String),
}

// ============================================================================
// STATUSES & ROLES
// ============================================================================

/// Lifecycle status of a resource. `Deleted` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ResourceStatus {
    Draft,
    Pending,
    Approved,
    Rejected,
    Suspended,
    Archived,
    Deleted,
}

impl ResourceStatus {
    pub const ALL: [ResourceStatus; 7] = [
        ResourceStatus::Draft,
        ResourceStatus::Pending,
        ResourceStatus::Approved,
        ResourceStatus::Rejected,
        ResourceStatus::Suspended,
        ResourceStatus::Archived,
        ResourceStatus::Deleted,
    ];

    /// True for the statuses that must carry a moderation reason.
    pub fn requires_reason(self) -> bool {
        matches!(self, ResourceStatus::Rejected | ResourceStatus::Suspended)
    }

    /// Past-tense action phrase used in operator-facing messages.
    pub fn action_message(self) -> &'static str {
        match self {
            ResourceStatus::Approved => "approved",
            ResourceStatus::Rejected => "rejected",
            ResourceStatus::Suspended => "suspended",
            ResourceStatus::Archived => "archived",
            ResourceStatus::Deleted => "deleted",
            ResourceStatus::Pending => "set to pending",
            ResourceStatus::Draft => "set to draft",
        }
    }
}

impl std::fmt::Display for ResourceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ResourceStatus::Draft => "DRAFT",
            ResourceStatus::Pending => "PENDING",
            ResourceStatus::Approved => "APPROVED",
            ResourceStatus::Rejected => "REJECTED",
            ResourceStatus::Suspended => "SUSPENDED",
            ResourceStatus::Archived => "ARCHIVED",
            ResourceStatus::Deleted => "DELETED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for ResourceStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "DRAFT" => Ok(ResourceStatus::Draft),
            "PENDING" => Ok(ResourceStatus::Pending),
            "APPROVED" => Ok(ResourceStatus::Approved),
            "REJECTED" => Ok(ResourceStatus::Rejected),
            "SUSPENDED" => Ok(ResourceStatus::Suspended),
            "ARCHIVED" => Ok(ResourceStatus::Archived),
            "DELETED" => Ok(ResourceStatus::Deleted),
            other => Err(format!("unknown resource status: {}", other)),
        }
    }
}

/// Lifecycle status of a version. Versions never reach the resource-only
/// statuses (Draft/Suspended/Archived/Deleted).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VersionStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for VersionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            VersionStatus::Pending => "PENDING",
            VersionStatus::Approved => "APPROVED",
            VersionStatus::Rejected => "REJECTED",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for VersionStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "PENDING" => Ok(VersionStatus::Pending),
            "APPROVED" => Ok(VersionStatus::Approved),
            "REJECTED" => Ok(VersionStatus::Rejected),
            other => Err(format!("unknown version status: {}", other)),
        }
    }
}

/// Platform role attached to a user account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum UserRole {
    User,
    Moderator,
    Admin,
    SuperAdmin,
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            UserRole::User => "USER",
            UserRole::Moderator => "MODERATOR",
            UserRole::Admin => "ADMIN",
            UserRole::SuperAdmin => "SUPER_ADMIN",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for UserRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "MODERATOR" => Ok(UserRole::Moderator),
            "ADMIN" => Ok(UserRole::Admin),
            "SUPER_ADMIN" => Ok(UserRole::SuperAdmin),
            other => Err(format!("unknown user role: {}", other)),
        }
    }
}

/// Transport-boundary guard: coordinators trust the caller's role check,
/// so every transport applies this single guard before invoking them.
pub fn require_moderator(role: UserRole) -> Result<(), ModerationError> {
    match role {
        UserRole::Moderator | UserRole::Admin | UserRole::SuperAdmin => Ok(()),
        UserRole::User => Err(ModerationError::Forbidden),
    }
}

// ============================================================================
// ENTITIES
// ============================================================================

/// Who is accountable for a resource. Exactly one of user or team,
/// enforced by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResourceOwner {
    User(u64),
    Team(u64),
}

/// A published or in-progress piece of shared content.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resource {
    pub id: u64,
    pub name: String,
    pub slug: String,
    pub status: ResourceStatus,
    pub owner: ResourceOwner,
    pub moderated_by: Option<u64>,
    pub moderated_at: Option<DateTime<Utc>>,
    /// Non-null only while status is Rejected or Suspended.
    pub rejection_reason: Option<String>,
    /// Moderator-only notes, never shown to the owner.
    pub moderation_notes: Option<String>,
    pub latest_version_id: Option<u64>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// A release artifact attached to a resource, immutable once approved.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceVersion {
    pub id: u64,
    pub resource_id: u64,
    /// Free-form version label; ordering is creation-time only.
    pub version_number: String,
    pub status: VersionStatus,
    pub rejection_reason: Option<String>,
    /// Set exactly once, at the moment of first approval.
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Append-only audit record. Created inside the same transaction as the
/// transition it records; never updated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusHistoryRecord {
    pub id: u64,
    pub resource_id: u64,
    pub from_status: ResourceStatus,
    pub to_status: ResourceStatus,
    pub reason: Option<String>,
    pub changed_by: u64,
    pub changed_at: DateTime<Utc>,
}

// ============================================================================
// STORE INPUTS & RESULTS
// ============================================================================

/// Fields for inserting a new resource (always starts in Draft).
#[derive(Debug, Clone)]
pub struct NewResource {
    pub name: String,
    pub slug: String,
    pub owner: ResourceOwner,
    pub created_by: u64,
    pub created_at: DateTime<Utc>,
}

/// Fields for inserting a new version (always starts Pending).
#[derive(Debug, Clone)]
pub struct NewVersion {
    pub resource_id: u64,
    pub version_number: String,
    pub created_at: DateTime<Utc>,
}

/// A validated moderation decision, applied atomically by the store.
#[derive(Debug, Clone)]
pub struct ResourceModerationUpdate {
    pub resource_id: u64,
    pub new_status: ResourceStatus,
    pub reason: Option<String>,
    pub notes: Option<String>,
    pub moderator_id: u64,
    pub moderated_at: DateTime<Utc>,
}

/// Committed outcome of a version approval transaction.
#[derive(Debug, Clone)]
pub struct VersionApproval {
    pub resource: Resource,
    pub version: ResourceVersion,
    /// True when this was the resource's first approved version.
    pub first_version: bool,
}

/// Committed outcome of a version rejection transaction.
#[derive(Debug, Clone)]
pub struct VersionRejection {
    pub resource: Resource,
    pub version: ResourceVersion,
}

/// What a resource-level moderation call returns to its transport.
#[derive(Debug, Clone)]
pub struct ResourceModerationOutcome {
    pub message: String,
    pub resource: Resource,
}

/// What a version-level moderation call returns to its transport.
#[derive(Debug, Clone)]
pub struct VersionModerationOutcome {
    pub message: String,
    pub version: ResourceVersion,
}
