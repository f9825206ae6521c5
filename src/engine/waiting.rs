//! Causal gating of client requests. A FIFO of requests deferred because
//! their dependency clock is ahead of the replica's local clock.
//!
//! Modeled as an explicit wait-queue keyed by dependency clock rather than
//! simulated with suspended stack frames. The engine stores raw request
//! parameters here and replays them
//! through the same code path used for an immediately-ready request once
//! `local_clock` advances far enough.

use std::collections::VecDeque;
use std::time::Instant;

use crate::engine::batch::Update;
use crate::ids::ReplicaId;
use crate::key::ObjectKey;
use crate::vector_clock::VectorClock;

pub type RequestId = u64;

#[derive(Debug, Clone)]
pub enum ClientRequest {
    Read { keys: Vec<ObjectKey>, clock: VectorClock<ReplicaId> },
    Update { batch: Vec<Update>, clock: VectorClock<ReplicaId> },
}

impl ClientRequest {
    pub fn dependency_clock(&self) -> &VectorClock<ReplicaId> {
        match self {
            ClientRequest::Read { clock, .. } => clock,
            ClientRequest::Update { clock, .. } => clock,
        }
    }
}

#[derive(Debug)]
pub struct WaitingRequest {
    pub id: RequestId,
    pub request: ClientRequest,
    pub deadline: Option<Instant>,
}

/// FIFO wait queue of requests gated on a causal dependency.
#[derive(Debug, Default)]
pub struct WaitQueue {
    queue: VecDeque<WaitingRequest>,
}

impl WaitQueue {
    pub fn new() -> Self {
        WaitQueue { queue: VecDeque::new() }
    }

    pub fn push(&mut self, entry: WaitingRequest) {
        self.queue.push_back(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Removes and returns, in FIFO order, every entry for which `ready`
    /// returns true, leaving the rest in place.
    pub fn take_ready<F: Fn(&ClientRequest) -> bool>(&mut self, ready: F) -> Vec<WaitingRequest> {
        let mut taken = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.queue.len());
        for entry in self.queue.drain(..) {
            if ready(&entry.request) {
                taken.push(entry);
            } else {
                remaining.push_back(entry);
            }
        }
        self.queue = remaining;
        taken
    }

    /// Removes and returns every entry whose deadline has passed, leaving
    /// the rest in place.
    pub fn take_overdue(&mut self, now: Instant) -> Vec<WaitingRequest> {
        let mut taken = Vec::new();
        let mut remaining = VecDeque::with_capacity(self.queue.len());
        for entry in self.queue.drain(..) {
            match entry.deadline {
                Some(deadline) if deadline <= now => taken.push(entry),
                _ => remaining.push_back(entry),
            }
        }
        self.queue = remaining;
        taken
    }
}
