//! Background mirror forwarding
//!
//! Mirror writes can be slow (disk, remote sink). [`MirrorForwarder`] queues
//! them and applies them on a worker task so engine calls never wait on
//! the sink.

use std::sync::Arc;

use pawpark_core::{ChatMessage, Mirror, Profile, SessionId, Venue};
use tokio::sync::mpsc;
use tracing::{debug, warn};
use uuid::Uuid;

enum MirrorOp {
    PutProfile(Venue, SessionId, Profile),
    PutMessage(Venue, ChatMessage),
    RemoveMessage(Venue, Uuid),
}

/// Queues writes for a wrapped mirror
pub struct MirrorForwarder {
    tx: mpsc::UnboundedSender<MirrorOp>,
}

impl MirrorForwarder {
    /// Start the worker. Must be called inside a tokio runtime.
    pub fn spawn(inner: Arc<dyn Mirror>) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(forward_loop(inner, rx));
        Self { tx }
    }

    fn enqueue(&self, op: MirrorOp) -> pawpark_core::Result<()> {
        self.tx
            .send(op)
            .map_err(|_| pawpark_core::Error::Mirror("forwarder stopped".to_string()))
    }
}

impl Mirror for MirrorForwarder {
    fn put_profile(&self, venue: &Venue, id: SessionId, profile: &Profile) -> pawpark_core::Result<()> {
        self.enqueue(MirrorOp::PutProfile(venue.clone(), id, profile.clone()))
    }

    fn put_message(&self, venue: &Venue, message: &ChatMessage) -> pawpark_core::Result<()> {
        self.enqueue(MirrorOp::PutMessage(venue.clone(), message.clone()))
    }

    fn remove_message(&self, venue: &Venue, id: Uuid) -> pawpark_core::Result<()> {
        self.enqueue(MirrorOp::RemoveMessage(venue.clone(), id))
    }
}

async fn forward_loop(inner: Arc<dyn Mirror>, mut rx: mpsc::UnboundedReceiver<MirrorOp>) {
    while let Some(op) = rx.recv().await {
        let result = match &op {
            MirrorOp::PutProfile(venue, id, profile) => inner.put_profile(venue, *id, profile),
            MirrorOp::PutMessage(venue, message) => inner.put_message(venue, message),
            MirrorOp::RemoveMessage(venue, id) => inner.remove_message(venue, *id),
        };
        if let Err(e) = result {
            warn!(error = %e, "Mirror write failed");
        }
    }
    debug!("Mirror forwarder stopped");
}
