//! Ownership checks for visitor-owned records
//!
//! Ownership is the only permission rule: a session may mutate a record only
//! if it created it. The check runs inside every mutating operation, not just
//! where controls are rendered. It is a local policy; ids are client-asserted.

use tracing::warn;

use crate::models::SessionId;

/// Actions that need ownership of the target record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OwnedAction {
    EditProfile,
    DeleteMessage,
}

impl OwnedAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            OwnedAction::EditProfile => "edit_profile",
            OwnedAction::DeleteMessage => "delete_message",
        }
    }
}

/// Whether `actor` may mutate a record owned by `owner`
pub fn can_mutate(actor: SessionId, owner: SessionId) -> bool {
    actor == owner
}

/// [`can_mutate`] plus a diagnostic log line on rejection
pub fn authorize(action: OwnedAction, actor: SessionId, owner: SessionId) -> bool {
    let allowed = can_mutate(actor, owner);
    if !allowed {
        warn!(
            action = action.as_str(),
            actor = %actor,
            owner = %owner,
            "Rejected mutation of a record owned by another session"
        );
    }
    allowed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owner_may_mutate() {
        let me = SessionId::new();
        assert!(can_mutate(me, me));
        assert!(authorize(OwnedAction::DeleteMessage, me, me));
    }

    #[test]
    fn test_other_session_may_not_mutate() {
        let me = SessionId::new();
        let other = SessionId::new();
        assert!(!can_mutate(me, other));
        assert!(!authorize(OwnedAction::EditProfile, me, other));
    }
}
