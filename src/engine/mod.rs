//! The replica engine: owns the object store, the local clock, the
//! wait-queue, and effect de-duplication; mediates every other subsystem.
//!
//! Kept as a plain synchronous value, passed explicitly through the actor
//! loop rather than hidden behind a singleton — `actor.rs` is the only
//! place that talks to actix, I/O, or the broadcast layer. This lets every
//! end-to-end scenario be tested here without spinning up an actor system.

pub mod batch;
pub mod store;
pub mod waiting;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use crate::crdt::CrdtValue;
use crate::engine::batch::{EffectRecord, Envelope, LocalBatchOutcome, LogRecord, Update};
use crate::engine::store::ObjectStore;
use crate::engine::waiting::{ClientRequest, RequestId, WaitQueue, WaitingRequest};
use crate::error::EngineError;
use crate::ids::{ReplicaId, SeqNr};
use crate::key::ObjectKey;
use crate::persistence::snapshot::SnapshotRecord;
use crate::token::TokenMinter;
use crate::vector_clock::VectorClock;

pub use crate::crdt::MintContext;

/// Either the call completed immediately, or it was deferred because its
/// dependency clock is ahead of the replica's local clock.
#[derive(Debug)]
pub enum GateOutcome<T> {
    Ready(T),
    Pending(RequestId),
}

pub type ReadResult = Result<(Vec<(ObjectKey, CrdtValue)>, VectorClock<ReplicaId>), EngineError>;
pub type UpdateResult = Result<LocalBatchOutcome, EngineError>;

/// What a previously-deferred request resolves to once delivered: the
/// wait-queue is rescanned and any now-ready request is delivered.
#[derive(Debug)]
pub enum ReadyResult {
    Read(ReadResult),
    Update(UpdateResult),
}

pub struct ReplicaEngine {
    id: ReplicaId,
    clock: VectorClock<ReplicaId>,
    objects: ObjectStore,
    waiting_requests: WaitQueue,
    /// Always empty under the eager-delivery realization chosen here
    /// (documented below on `apply_remote`); kept as a field so a
    /// strict-delivery variant could be dropped in without changing the
    /// public surface.
    effect_buffer: Vec<Envelope>,
    log_sequence: SeqNr,
    last_snapshot_clock: VectorClock<ReplicaId>,
    /// Highest per-origin effect ordinal applied so far; de-duplicates
    /// redelivered effects.
    observed: HashMap<ReplicaId, SeqNr>,
    minter: TokenMinter,
    /// Monotonic counter stamped on every effect this replica originates,
    /// independent of `log_sequence` (one log record may carry several
    /// effects across different keys).
    effect_seq: SeqNr,
    next_request_id: RequestId,
    causal_timeout: Option<Duration>,
}

impl ReplicaEngine {
    pub fn new(id: ReplicaId) -> Self {
        ReplicaEngine {
            id,
            clock: VectorClock::new(),
            objects: ObjectStore::new(),
            waiting_requests: WaitQueue::new(),
            effect_buffer: Vec::new(),
            log_sequence: 0,
            last_snapshot_clock: VectorClock::new(),
            observed: HashMap::new(),
            minter: TokenMinter::new(),
            effect_seq: 0,
            next_request_id: 0,
            causal_timeout: None,
        }
    }

    pub fn with_causal_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.causal_timeout = timeout;
        self
    }

    pub fn id(&self) -> ReplicaId {
        self.id
    }

    pub fn clock(&self) -> &VectorClock<ReplicaId> {
        &self.clock
    }

    pub fn log_sequence(&self) -> SeqNr {
        self.log_sequence
    }

    // ---- public operations, gated on causal dependencies ----

    pub fn read(&mut self, keys: Vec<ObjectKey>, client_clock: VectorClock<ReplicaId>) -> GateOutcome<ReadResult> {
        if client_clock.compare(&self.clock).is_not_after() {
            GateOutcome::Ready(self.process_read(keys, client_clock))
        } else {
            GateOutcome::Pending(self.enqueue(ClientRequest::Read { keys, clock: client_clock }))
        }
    }

    pub fn update(&mut self, batch: Vec<Update>, client_clock: VectorClock<ReplicaId>) -> GateOutcome<UpdateResult> {
        if client_clock.compare(&self.clock).is_not_after() {
            GateOutcome::Ready(self.process_update(batch, client_clock))
        } else {
            GateOutcome::Pending(self.enqueue(ClientRequest::Update { batch, clock: client_clock }))
        }
    }

    fn enqueue(&mut self, request: ClientRequest) -> RequestId {
        let id = self.next_request_id;
        self.next_request_id += 1;
        let deadline = self.causal_timeout.map(|d| Instant::now() + d);
        trace!(replica = ?self.id, request_id = id, "gating client request on causal dependency");
        self.waiting_requests.push(WaitingRequest { id, request, deadline });
        id
    }

    // ---- executing a local update batch ----

    fn process_read(&mut self, keys: Vec<ObjectKey>, client_clock: VectorClock<ReplicaId>) -> ReadResult {
        let mut values = Vec::with_capacity(keys.len());
        for key in keys {
            let (state, _version) = self.objects.get_or_create_mut(&key);
            values.push((key, state.value()));
        }
        let merged = self.clock.clone().merged(&client_clock);
        Ok((values, merged))
    }

    fn process_update(&mut self, batch: Vec<Update>, client_clock: VectorClock<ReplicaId>) -> UpdateResult {
        // Merge dependencies first, then apply each op in turn, journaling a
        // pre-image per touched key so a rejected op can roll the whole
        // batch back.
        self.clock.merge(&client_clock);

        let mut journal: Vec<(ObjectKey, Option<(crate::crdt::CrdtState, u64)>)> = Vec::new();
        let mut produced: Vec<(ObjectKey, crate::crdt::CrdtEffect)> = Vec::new();

        for update in batch {
            if update.op.type_tag() != update.key.type_tag {
                self.rollback(journal);
                return Err(EngineError::InvalidOp {
                    type_tag: update.key.type_tag,
                    op: format!("{:?}", update.op),
                });
            }

            if !journal.iter().any(|(k, _)| *k == update.key) {
                journal.push((update.key.clone(), self.objects.snapshot_entry(&update.key)));
            }

            let (state, version) = self.objects.get_or_create_mut(&update.key);
            let mut ctx = MintContext { replica: self.id, minter: &mut self.minter };
            match state.downstream(&update.op, &mut ctx) {
                Ok(effect) => {
                    state.apply(&effect);
                    *version += 1;
                    produced.push((update.key, effect));
                }
                Err(reason) => {
                    self.rollback(journal);
                    return Err(EngineError::DownstreamFailed(reason));
                }
            }
        }

        // Batch-granular clock increment, then build the log record.
        self.clock.increment(self.id);
        let clock_after = self.clock.clone();

        self.log_sequence += 1;
        let effects: Vec<EffectRecord> =
            produced.iter().map(|(key, effect)| EffectRecord { key: key.clone(), effect: effect.clone() }).collect();
        let log_record = LogRecord { sequence: self.log_sequence, effects, clock_after: clock_after.clone() };

        // Stamp every effect with `clock_after` and a fresh per-origin
        // ordinal for de-duplication on receivers.
        let origin = self.id;
        let envelopes = produced
            .into_iter()
            .map(|(key, effect)| {
                let origin_seq = self.effect_seq;
                self.effect_seq += 1;
                Envelope { key, effect, origin, origin_seq, clock: clock_after.clone() }
            })
            .collect();

        debug!(replica = ?self.id, sequence = self.log_sequence, clock = %clock_after, "applied local batch");

        Ok(LocalBatchOutcome { clock: clock_after, envelopes, log_record })
    }

    fn rollback(&mut self, journal: Vec<(ObjectKey, Option<(crate::crdt::CrdtState, u64)>)>) {
        for (key, pre_image) in journal {
            self.objects.restore_entry(key, pre_image);
        }
    }

    // ---- receiving a remote effect envelope ----

    /// Applies a remote envelope. Chooses an *eager* realization: deliver on
    /// arrival and rely on the CRDTs' commutativity for convergence, rather
    /// than buffering until strict per-origin/per-position causal delivery
    /// is satisfied. `effect_buffer` therefore stays permanently empty.
    pub fn apply_remote(&mut self, envelope: Envelope) {
        // `observed[origin]` holds the next expected origin-ordinal; the
        // broadcast layer never reorders same-origin effects, so a plain
        // high-water mark (rather than a full seen-set) suffices to detect
        // a redelivered effect.
        let next_expected = self.observed.get(&envelope.origin).copied().unwrap_or(0);
        if envelope.origin_seq < next_expected {
            trace!(replica = ?self.id, origin = ?envelope.origin, origin_seq = envelope.origin_seq, "dropping duplicate effect");
            return;
        }
        self.objects.apply_remote(&envelope.key, &envelope.effect);
        self.observed.insert(envelope.origin, envelope.origin_seq + 1);
        self.clock.merge(&envelope.clock);
        debug!(replica = ?self.id, origin = ?envelope.origin, clock = %self.clock, "applied remote effect");
    }

    // ---- re-scanning the wait queue ----

    /// Delivers every waiting request whose dependency clock is now
    /// satisfied, in FIFO order. Call after any local-clock advancement
    /// (a local batch or a remote effect).
    ///
    /// Re-scans to a fixpoint: delivering a readied `Update` advances the
    /// clock again (merge + increment), which can in turn ready further
    /// requests still sitting in the queue. A single pass against one clock
    /// snapshot would strand those until the next remote effect arrived.
    pub fn drain_ready(&mut self) -> Vec<(RequestId, ReadyResult)> {
        let mut resolved = Vec::new();
        loop {
            let clock = self.clock.clone();
            let ready =
                self.waiting_requests.take_ready(|request| request.dependency_clock().compare(&clock).is_not_after());
            if ready.is_empty() {
                break;
            }
            for entry in ready {
                let result = match entry.request {
                    ClientRequest::Read { keys, clock } => ReadyResult::Read(self.process_read(keys, clock)),
                    ClientRequest::Update { batch, clock } => ReadyResult::Update(self.process_update(batch, clock)),
                };
                resolved.push((entry.id, result));
            }
        }
        resolved
    }

    /// Evicts requests that have waited past their causal-timeout deadline.
    /// No-op when `causal_timeout` is `None`, the default (no timeout).
    pub fn expire_overdue(&mut self, now: Instant) -> Vec<(RequestId, ReadyResult)> {
        self.waiting_requests
            .take_overdue(now)
            .into_iter()
            .map(|entry| {
                let result = match entry.request {
                    ClientRequest::Read { .. } => ReadyResult::Read(Err(EngineError::CausalTimeout)),
                    ClientRequest::Update { .. } => ReadyResult::Update(Err(EngineError::CausalTimeout)),
                };
                (entry.id, result)
            })
            .collect()
    }

    pub fn has_waiting_requests(&self) -> bool {
        !self.waiting_requests.is_empty()
    }

    // ---- persistence hooks ----

    pub fn should_snapshot(&self, interval: u64) -> bool {
        interval > 0 && self.log_sequence > 0 && self.log_sequence % interval == 0
    }

    pub fn snapshot(&mut self) -> SnapshotRecord {
        self.last_snapshot_clock = self.clock.clone();
        SnapshotRecord {
            objects: self.objects.snapshot_map(),
            clock: self.clock.clone(),
            log_sequence: self.log_sequence,
        }
    }

    /// Restores engine state from a snapshot.
    pub fn restore_snapshot(&mut self, snapshot: SnapshotRecord) {
        self.objects.load_map(snapshot.objects);
        self.clock = snapshot.clock.clone();
        self.last_snapshot_clock = snapshot.clock;
        self.log_sequence = snapshot.log_sequence;
    }

    /// Replays one WAL record during recovery: applies the record's effects
    /// without minting, without incrementing the clock beyond a merge, and
    /// without re-broadcasting.
    pub fn replay_log_record(&mut self, record: &LogRecord) {
        if record.sequence <= self.log_sequence {
            return;
        }
        for effect in &record.effects {
            self.objects.apply_remote(&effect.key, &effect.effect);
        }
        self.clock.merge(&record.clock_after);
        self.log_sequence = record.sequence;
    }
}
