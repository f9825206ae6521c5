//! An in-process realization of the broadcast layer on top of actix actors.
//! Peers are addressed by `Recipient<RemoteEnvelope>`.

use std::collections::HashMap;

use actix::prelude::*;
use tracing::trace;

use crate::engine::batch::Envelope;
use crate::ids::ReplicaId;

/// The wire message carrying one broadcast envelope. `rtype = "()"`:
/// broadcast is fire-and-forget.
#[derive(Message, Clone)]
#[rtype(result = "()")]
pub struct RemoteEnvelope(pub Envelope);

/// Fan-out to peers plus delivery to local receivers. One instance per
/// replica; owned by that replica's `ReplicaActor`.
#[derive(Default)]
pub struct ActixBroadcastLayer {
    peers: HashMap<ReplicaId, Recipient<RemoteEnvelope>>,
    receivers: Vec<Recipient<RemoteEnvelope>>,
}

impl ActixBroadcastLayer {
    pub fn new() -> Self {
        ActixBroadcastLayer { peers: HashMap::new(), receivers: Vec::new() }
    }

    /// Wires a peer connection. Cluster membership/discovery is an external
    /// concern; this is simply where a discovered peer's address is recorded.
    pub fn connect(&mut self, peer: ReplicaId, recipient: Recipient<RemoteEnvelope>) {
        self.peers.insert(peer, recipient);
    }

    /// Registers a local receiver of inbound envelopes. The owning
    /// `ReplicaActor` registers its own address here
    /// at startup; additional receivers (e.g. observability) may also
    /// subscribe.
    pub fn register_receiver(&mut self, recipient: Recipient<RemoteEnvelope>) {
        self.receivers.push(recipient);
    }

    /// The current peer set, excluding self.
    pub fn members(&self) -> Vec<ReplicaId> {
        self.peers.keys().copied().collect()
    }

    /// Fire-and-forget: returns immediately after enqueueing into each
    /// peer's mailbox. A peer whose mailbox is gone (closed/dropped) is
    /// silently skipped; best-effort delivery, no retransmission.
    pub fn broadcast(&self, envelope: Envelope) {
        for (peer, recipient) in &self.peers {
            trace!(to = ?peer, key = ?envelope.key, "broadcasting effect");
            let _ = recipient.do_send(RemoteEnvelope(envelope.clone()));
        }
    }

    /// Delivers an envelope that arrived from a peer to every registered
    /// local receiver.
    pub fn deliver_locally(&self, envelope: Envelope) {
        for recipient in &self.receivers {
            let _ = recipient.do_send(RemoteEnvelope(envelope.clone()));
        }
    }
}
