//! Identity binding
//!
//! Two identities per visitor: a durable one (display name, consent, venue)
//! kept in a long-lived cookie, and an ephemeral session id created per
//! process. A stored venue always beats the external venue hint.

mod jar;
mod token;

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::clock::Clock;
use crate::error::Result;
use crate::models::{SessionId, Venue};

pub use jar::{FileTokenJar, MemoryTokenJar, TokenJar};
pub use token::{percent_decode, percent_encode, IdentityCookie, COOKIE_NAME};

/// Long-lived, self-asserted visitor identity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DurableIdentity {
    pub display_name: String,
    pub consent_granted: bool,
    pub venue: Venue,
}

/// Result of process start: the locked venue, a fresh session id and the
/// stored identity if there is one
#[derive(Debug, Clone)]
pub struct SessionBootstrap {
    pub venue: Venue,
    pub session_id: SessionId,
    pub identity: Option<DurableIdentity>,
}

impl SessionBootstrap {
    /// Whether the venue came from the stored identity
    pub fn venue_locked(&self) -> bool {
        self.identity.is_some()
    }
}

/// Reads and writes the durable identity
#[derive(Clone)]
pub struct IdentityBinding {
    jar: Arc<dyn TokenJar>,
    clock: Arc<dyn Clock>,
}

impl IdentityBinding {
    pub fn new(jar: Arc<dyn TokenJar>, clock: Arc<dyn Clock>) -> Self {
        Self { jar, clock }
    }

    /// Stored identity, if present, unexpired and decodable
    pub fn load(&self) -> Option<DurableIdentity> {
        let line = match self.jar.load() {
            Ok(Some(line)) => line,
            Ok(None) => return None,
            Err(e) => {
                warn!(error = %e, "Could not read identity token");
                return None;
            }
        };

        let identity = IdentityCookie::parse(&line).and_then(|c| c.identity_at(self.clock.now()));
        if identity.is_none() {
            warn!("Identity token expired or unreadable, ignoring it");
        }
        identity
    }

    pub fn save(&self, identity: &DurableIdentity) -> Result<()> {
        let cookie = IdentityCookie::issue(identity, self.clock.now())?;
        self.jar.store(&cookie.to_line())
    }

    /// Resolve venue and identity for a starting process
    pub fn bootstrap(&self, venue_hint: Option<&str>, default_venue: &Venue) -> SessionBootstrap {
        let identity = self.load();
        let venue = match &identity {
            Some(identity) => identity.venue.clone(),
            None => venue_hint
                .and_then(Venue::parse)
                .unwrap_or_else(|| default_venue.clone()),
        };

        let bootstrap = SessionBootstrap {
            venue,
            session_id: SessionId::new(),
            identity,
        };

        info!(
            venue = %bootstrap.venue,
            session_id = %bootstrap.session_id,
            locked = bootstrap.venue_locked(),
            "Session bootstrapped"
        );

        bootstrap
    }

    /// Record the identity after an explicit, consented join
    pub fn remember(&self, display_name: &str, venue: &Venue) -> Result<DurableIdentity> {
        let identity = DurableIdentity {
            display_name: display_name.to_string(),
            consent_granted: true,
            venue: venue.clone(),
        };
        self.save(&identity)?;
        Ok(identity)
    }

    /// Change the stored name, keeping the stored venue and consent
    pub fn rename(&self, display_name: &str, venue: &Venue) -> Result<DurableIdentity> {
        let identity = match self.load() {
            Some(existing) => DurableIdentity {
                display_name: display_name.to_string(),
                ..existing
            },
            None => DurableIdentity {
                display_name: display_name.to_string(),
                consent_granted: true,
                venue: venue.clone(),
            },
        };
        self.save(&identity)?;
        Ok(identity)
    }
}
