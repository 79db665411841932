// Resource status machine - the closed set of legal lifecycle transitions.
//
// This table is consulted before any mutation. It is pure and has no side
// effects, so it can be tested exhaustively without storage. The infra
// layer re-runs it inside each transaction against the row state it read
// there, so a raced caller cannot commit an illegal transition.

use super::moderation_models::{ModerationError, ResourceStatus};

/// Statuses reachable from `from` in a single transition.
pub fn allowed_transitions(from: ResourceStatus) -> &'static [ResourceStatus] {
    use ResourceStatus::*;

    match from {
        Draft => &[Pending, Archived, Deleted],
        Pending => &[Approved, Rejected, Draft],
        Approved => &[Suspended, Archived, Deleted],
        Rejected => &[Pending, Deleted],
        Suspended => &[Approved, Deleted, Archived],
        Archived => &[Approved, Deleted, Draft],
        // Terminal: nothing leaves Deleted.
        Deleted => &[],
    }
}

/// Fails with `InvalidTransition` when `to` is not reachable from `from`.
pub fn validate_transition(
    from: ResourceStatus,
    to: ResourceStatus,
) -> Result<(), ModerationError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(ModerationError::InvalidTransition { from, to })
    }
}
