//! The CRDT type library. Every type here implements the same common
//! behavioural contract: `new`, `value`, `downstream`, `apply`,
//! `equal`, `requires_state_for_downstream`, and — for the state-based
//! counter only — `merge`.
//!
//! The implementing type doubles as its own state: the engine dispatches on
//! `CrdtState`/`Operation`/`Effect` directly, not through a trait object.

pub mod aw_set;
pub mod dispatch;
pub mod ew_flag;
pub mod mv_register;
pub mod pn_counter_op;
pub mod pn_counter_state;
pub mod tp_set;

pub use dispatch::{CrdtEffect, CrdtOperation, CrdtState, CrdtValue};

use crate::ids::ReplicaId;
use crate::token::TokenMinter;

/// Context threaded through `downstream` so a CRDT can mint a fresh token
/// and stamp its own replica id as an effect's origin, without every CRDT
/// owning a minter itself.
pub struct MintContext<'a> {
    pub replica: ReplicaId,
    pub minter: &'a mut TokenMinter,
}

/// A CRDT's `downstream` may reject an operation at its origin. The reason
/// is a human-readable string; the engine wraps it in
/// `EngineError::DownstreamFailed`.
pub type DownstreamError = String;

pub trait Crdt: Clone {
    type Op: Clone;
    type Effect: Clone;
    type Value;

    fn new() -> Self;

    /// Pure function of state.
    fn value(&self) -> Self::Value;

    /// Produce the effect for `op`, or reject it at origin. Never fails once
    /// it has succeeded for a given call.
    fn downstream(&self, op: &Self::Op, ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError>;

    /// Apply a (locally produced or remote) effect. Idempotence against
    /// redelivery is the engine's job (it de-duplicates by origin sequence);
    /// CRDTs are not individually required to tolerate redelivery.
    fn apply(&mut self, effect: &Self::Effect);

    fn equal(&self, other: &Self) -> bool;

    /// Whether producing an effect for `op` needs to read `self` (true) or
    /// can be computed from the operation alone (false). Not consulted by
    /// this engine's dispatch (effects are always produced from the live
    /// object), but exposed for callers that might ship state vs. op over
    /// the wire.
    fn requires_state_for_downstream(op: &Self::Op) -> bool;
}

/// Implemented only by the state-based PN-Counter: CRDTs whose state forms
/// a join semilattice can also converge by merging state directly,
/// interchangeably with applying effects.
pub trait StateMerge: Crdt {
    fn merge(&mut self, other: &Self);
}
