//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use crate::models::{ChatMessage, Member, SessionId, Venue};
use crate::presence::SessionState;

/// At most one member record per session id, and no blank names
pub fn assert_member_list_invariants(members: &[Member]) {
    let mut seen = HashSet::new();
    for member in members {
        debug_assert!(
            seen.insert(member.id),
            "Member list holds session {} more than once",
            member.id
        );
        debug_assert!(
            !member.display_name.trim().is_empty(),
            "Member {} has an empty display name",
            member.id
        );
    }
}

/// A joined session always has a usable name
pub fn assert_session_invariants(state: &SessionState) {
    debug_assert!(
        !state.joined || !state.display_name.trim().is_empty(),
        "Session {} is joined with an empty display name",
        state.id
    );
}

/// The venue bound at bootstrap never changes afterwards
pub fn assert_venue_unchanged(bound: &Venue, current: &Venue) {
    debug_assert!(
        bound == current,
        "Session venue moved from {} to {}",
        bound,
        current
    );
}

/// A freshly built message belongs to its author
pub fn assert_message_owned_by(message: &ChatMessage, author: SessionId) {
    debug_assert!(
        message.owner_id == author,
        "Message {} owned by {} but authored by {}",
        message.id,
        message.owner_id,
        author
    );
}
