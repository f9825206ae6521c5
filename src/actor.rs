//! The only module that talks to actix, I/O, and the broadcast layer
//! directly. `ReplicaActor` is a single-threaded, message-serialized
//! wrapper around `ReplicaEngine`: every message is handled to completion
//! before the next is dequeued, so the engine never needs its own locking.
//!
//! An actor owning replica state plus a table of peer recipients, using a
//! push-based fire-and-forget broadcast contract rather than a pull-based
//! sync protocol.

use std::collections::HashMap;
use std::io;
use std::time::{Duration, Instant};

use actix::prelude::*;
use tokio::sync::oneshot;
use tracing::{error, info};

use crate::broadcast::actix_layer::{ActixBroadcastLayer, RemoteEnvelope};
use crate::config::ReplicaConfig;
use crate::engine::batch::Update as BatchUpdate;
use crate::engine::waiting::RequestId;
use crate::engine::{GateOutcome, ReadResult, ReadyResult, ReplicaEngine, UpdateResult};
use crate::ids::ReplicaId;
use crate::key::ObjectKey;
use crate::persistence::Persistence;
use crate::vector_clock::VectorClock;

/// How often the actor checks the wait-queue for requests past their
/// causal-timeout deadline.
const OVERDUE_SWEEP_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Message)]
#[rtype(result = "ReadResult")]
pub struct ReadRequest {
    pub keys: Vec<ObjectKey>,
    pub clock: VectorClock<ReplicaId>,
}

#[derive(Message)]
#[rtype(result = "UpdateResult")]
pub struct UpdateRequest {
    pub batch: Vec<BatchUpdate>,
    pub clock: VectorClock<ReplicaId>,
}

/// Wires a peer's address into this replica's broadcast layer. Cluster
/// membership/transport is assumed external; this is where a discovered
/// peer is actually registered.
#[derive(Message)]
#[rtype(result = "()")]
pub struct Connect(pub ReplicaId, pub Recipient<RemoteEnvelope>);

enum PendingReply {
    Read(oneshot::Sender<ReadResult>),
    Update(oneshot::Sender<UpdateResult>),
}

pub struct ReplicaActor {
    engine: ReplicaEngine,
    persistence: Persistence,
    broadcast: ActixBroadcastLayer,
    pending: HashMap<RequestId, PendingReply>,
}

impl ReplicaActor {
    /// Recovers engine state from disk before the actor accepts its first
    /// message.
    pub fn new(id: ReplicaId, config: ReplicaConfig) -> io::Result<Self> {
        let persistence = Persistence::open(&config)?;
        let engine = persistence.recover(id)?.with_causal_timeout(config.causal_timeout);
        Ok(ReplicaActor { engine, persistence, broadcast: ActixBroadcastLayer::new(), pending: HashMap::new() })
    }

    /// Persists and broadcasts a successful local batch, write-ahead of the
    /// reply reaching the client. A no-op on `Err`.
    fn finalize_update(&mut self, result: UpdateResult) -> UpdateResult {
        if let Ok(outcome) = &result {
            if let Err(err) = self.persistence.append(&outcome.log_record) {
                error!(replica = ?self.engine.id(), %err, "failed to append WAL record");
            }
            for envelope in &outcome.envelopes {
                self.broadcast.broadcast(envelope.clone());
            }
            if let Err(err) = self.persistence.maybe_snapshot(&mut self.engine) {
                error!(replica = ?self.engine.id(), %err, "failed to write snapshot");
            }
        }
        result
    }

    fn resolve_ready(&mut self, ready: Vec<(RequestId, ReadyResult)>) {
        for (id, outcome) in ready {
            let Some(pending) = self.pending.remove(&id) else { continue };
            match (pending, outcome) {
                (PendingReply::Read(tx), ReadyResult::Read(result)) => {
                    let _ = tx.send(result);
                }
                (PendingReply::Update(tx), ReadyResult::Update(result)) => {
                    let result = self.finalize_update(result);
                    let _ = tx.send(result);
                }
                // `GateOutcome`/`ReadyResult` are stamped with the same
                // `RequestId` the request was enqueued under, so the kinds
                // always line up; this arm exists only so the match is total.
                _ => {}
            }
        }
    }
}

impl Actor for ReplicaActor {
    type Context = Context<Self>;

    fn started(&mut self, ctx: &mut Self::Context) {
        info!(replica = ?self.engine.id(), clock = %self.engine.clock(), "replica actor starting");
        self.broadcast.register_receiver(ctx.address().recipient());
        ctx.run_interval(OVERDUE_SWEEP_INTERVAL, |actor, _ctx| {
            let overdue = actor.engine.expire_overdue(Instant::now());
            if !overdue.is_empty() {
                actor.resolve_ready(overdue);
            }
        });
    }
}

impl Handler<Connect> for ReplicaActor {
    type Result = ();

    fn handle(&mut self, msg: Connect, _ctx: &mut Self::Context) {
        self.broadcast.connect(msg.0, msg.1);
    }
}

impl Handler<ReadRequest> for ReplicaActor {
    type Result = ResponseFuture<ReadResult>;

    fn handle(&mut self, msg: ReadRequest, _ctx: &mut Self::Context) -> Self::Result {
        match self.engine.read(msg.keys, msg.clock) {
            GateOutcome::Ready(result) => Box::pin(async move { result }),
            GateOutcome::Pending(id) => {
                let (tx, rx) = oneshot::channel();
                self.pending.insert(id, PendingReply::Read(tx));
                Box::pin(async move { rx.await.unwrap_or(Err(crate::error::EngineError::CausalTimeout)) })
            }
        }
    }
}

impl Handler<UpdateRequest> for ReplicaActor {
    type Result = ResponseFuture<UpdateResult>;

    fn handle(&mut self, msg: UpdateRequest, _ctx: &mut Self::Context) -> Self::Result {
        match self.engine.update(msg.batch, msg.clock) {
            GateOutcome::Ready(result) => {
                let result = self.finalize_update(result);
                // The batch just applied advances `local_clock` (merge +
                // increment), which can itself satisfy a request some other
                // client left waiting on a concurrent dependency — rescan.
                let ready = self.engine.drain_ready();
                self.resolve_ready(ready);
                Box::pin(async move { result })
            }
            GateOutcome::Pending(id) => {
                let (tx, rx) = oneshot::channel();
                self.pending.insert(id, PendingReply::Update(tx));
                Box::pin(async move { rx.await.unwrap_or(Err(crate::error::EngineError::CausalTimeout)) })
            }
        }
    }
}

impl Handler<RemoteEnvelope> for ReplicaActor {
    type Result = ();

    fn handle(&mut self, msg: RemoteEnvelope, _ctx: &mut Self::Context) {
        self.engine.apply_remote(msg.0);
        let ready = self.engine.drain_ready();
        self.resolve_ready(ready);
        if let Err(err) = self.persistence.maybe_snapshot(&mut self.engine) {
            error!(replica = ?self.engine.id(), %err, "failed to write snapshot after remote effect");
        }
    }
}
