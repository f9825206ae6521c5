//! Wire/log-level artefacts produced by a local batch.

use serde::{Deserialize, Serialize};

use crate::crdt::{CrdtEffect, CrdtOperation};
use crate::ids::{ReplicaId, SeqNr};
use crate::key::ObjectKey;
use crate::vector_clock::VectorClock;

/// A single client-submitted update: `(key, op[, arg])`.
#[derive(Debug, Clone)]
pub struct Update {
    pub key: ObjectKey,
    pub op: CrdtOperation,
}

impl Update {
    pub fn new(key: ObjectKey, op: CrdtOperation) -> Self {
        Update { key, op }
    }
}

/// One CRDT effect tagged with the key it applies to.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EffectRecord {
    pub key: ObjectKey,
    pub effect: CrdtEffect,
}

/// The broadcast wire envelope: the exact `clock` the engine attached
/// after the batch that produced `effect`, plus `origin`/`origin_seq` so
/// receivers can de-duplicate and order same-origin effects correctly.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope {
    pub key: ObjectKey,
    pub effect: CrdtEffect,
    pub origin: ReplicaId,
    pub origin_seq: SeqNr,
    pub clock: VectorClock<ReplicaId>,
}

/// An operation-log record. Stores the batch's produced *effects*, not its
/// raw ops: replay must reproduce the exact state peers already converged
/// to from the broadcast effects, which is only guaranteed if replay
/// avoids re-minting tokens — re-running `downstream` on replay would mint
/// fresh tokens that never match what was already broadcast to peers
/// before the crash.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogRecord {
    pub sequence: SeqNr,
    pub effects: Vec<EffectRecord>,
    pub clock_after: VectorClock<ReplicaId>,
}

/// What `ReplicaEngine::update` returns on success: the new clock to answer
/// the client with, the envelopes to broadcast, and the record to append to
/// the write-ahead log — all produced synchronously by the pure engine, left
/// for the caller (the actor) to persist and broadcast — the engine stays
/// an explicit value passed through the actor loop rather than a hidden
/// singleton the actor reaches into.
#[derive(Debug, Clone)]
pub struct LocalBatchOutcome {
    pub clock: VectorClock<ReplicaId>,
    pub envelopes: Vec<Envelope>,
    pub log_record: LogRecord,
}
