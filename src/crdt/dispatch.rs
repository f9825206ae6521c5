//! The sealed tagged union over the CRDT family. The engine dispatches on
//! the variant directly — there is no runtime class lookup.
//!
//! `CrdtState` is what the engine stores per key; `CrdtOperation` is what a
//! client submits; `CrdtEffect` is what `downstream` produces and what
//! travels over the broadcast layer and the write-ahead log.

use serde::{Deserialize, Serialize};

use crate::crdt::{aw_set, ew_flag, mv_register, pn_counter_op, pn_counter_state, tp_set};
use crate::crdt::{Crdt, DownstreamError, MintContext, StateMerge};
use crate::key::TypeTag;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrdtState {
    PnCounterOp(pn_counter_op::PnCounterOp),
    PnCounterState(pn_counter_state::PnCounterState),
    AwSet(aw_set::AwSet),
    TpSet(tp_set::TpSet),
    MvRegister(mv_register::MvRegister),
    EwFlag(ew_flag::EwFlag),
}

#[derive(Debug, Clone)]
pub enum CrdtOperation {
    PnCounterOp(pn_counter_op::Op),
    PnCounterState(pn_counter_state::Op),
    AwSet(aw_set::Op),
    TpSet(tp_set::Op),
    MvRegister(mv_register::Op),
    EwFlag(ew_flag::Op),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CrdtEffect {
    PnCounterOp(pn_counter_op::Effect),
    PnCounterState(pn_counter_state::Effect),
    AwSet(aw_set::Effect),
    TpSet(tp_set::Effect),
    MvRegister(mv_register::Effect),
    EwFlag(ew_flag::Effect),
}

/// The value returned by a read. The engine itself never inspects this
/// beyond handing it back to clients.
#[derive(Debug, Clone, PartialEq)]
pub enum CrdtValue {
    Int(i64),
    Set(std::collections::BTreeSet<String>),
    Bool(bool),
}

impl CrdtState {
    pub fn new(type_tag: TypeTag) -> Self {
        match type_tag {
            TypeTag::PnCounterOp => CrdtState::PnCounterOp(Crdt::new()),
            TypeTag::PnCounterState => CrdtState::PnCounterState(Crdt::new()),
            TypeTag::AwSet => CrdtState::AwSet(Crdt::new()),
            TypeTag::TpSet => CrdtState::TpSet(Crdt::new()),
            TypeTag::MvRegister => CrdtState::MvRegister(Crdt::new()),
            TypeTag::EwFlag => CrdtState::EwFlag(Crdt::new()),
        }
    }

    pub fn type_tag(&self) -> TypeTag {
        match self {
            CrdtState::PnCounterOp(_) => TypeTag::PnCounterOp,
            CrdtState::PnCounterState(_) => TypeTag::PnCounterState,
            CrdtState::AwSet(_) => TypeTag::AwSet,
            CrdtState::TpSet(_) => TypeTag::TpSet,
            CrdtState::MvRegister(_) => TypeTag::MvRegister,
            CrdtState::EwFlag(_) => TypeTag::EwFlag,
        }
    }

    pub fn value(&self) -> CrdtValue {
        match self {
            CrdtState::PnCounterOp(c) => CrdtValue::Int(c.value()),
            CrdtState::PnCounterState(c) => CrdtValue::Int(c.value()),
            CrdtState::AwSet(c) => CrdtValue::Set(c.value()),
            CrdtState::TpSet(c) => CrdtValue::Set(c.value()),
            CrdtState::MvRegister(c) => CrdtValue::Set(c.value()),
            CrdtState::EwFlag(c) => CrdtValue::Bool(c.value()),
        }
    }

    /// `op`'s type is expected to match `self`'s. A mismatch is a
    /// programmer error surfaced as `invalid-op` by the engine rather than
    /// a panic, since it originates from client input.
    pub fn downstream(&self, op: &CrdtOperation, ctx: &mut MintContext) -> Result<CrdtEffect, DownstreamError> {
        match (self, op) {
            (CrdtState::PnCounterOp(c), CrdtOperation::PnCounterOp(op)) => {
                c.downstream(op, ctx).map(CrdtEffect::PnCounterOp)
            }
            (CrdtState::PnCounterState(c), CrdtOperation::PnCounterState(op)) => {
                c.downstream(op, ctx).map(CrdtEffect::PnCounterState)
            }
            (CrdtState::AwSet(c), CrdtOperation::AwSet(op)) => c.downstream(op, ctx).map(CrdtEffect::AwSet),
            (CrdtState::TpSet(c), CrdtOperation::TpSet(op)) => c.downstream(op, ctx).map(CrdtEffect::TpSet),
            (CrdtState::MvRegister(c), CrdtOperation::MvRegister(op)) => {
                c.downstream(op, ctx).map(CrdtEffect::MvRegister)
            }
            (CrdtState::EwFlag(c), CrdtOperation::EwFlag(op)) => c.downstream(op, ctx).map(CrdtEffect::EwFlag),
            _ => Err("operation does not match the key's registered type".to_string()),
        }
    }

    pub fn apply(&mut self, effect: &CrdtEffect) {
        match (self, effect) {
            (CrdtState::PnCounterOp(c), CrdtEffect::PnCounterOp(e)) => c.apply(e),
            (CrdtState::PnCounterState(c), CrdtEffect::PnCounterState(e)) => c.apply(e),
            (CrdtState::AwSet(c), CrdtEffect::AwSet(e)) => c.apply(e),
            (CrdtState::TpSet(c), CrdtEffect::TpSet(e)) => c.apply(e),
            (CrdtState::MvRegister(c), CrdtEffect::MvRegister(e)) => c.apply(e),
            (CrdtState::EwFlag(c), CrdtEffect::EwFlag(e)) => c.apply(e),
            // This never happens: an effect is only ever produced by
            // `downstream` on a state of the matching variant.
            _ => debug_assert!(false, "effect/state type-tag mismatch"),
        }
    }

    pub fn equal(&self, other: &Self) -> bool {
        match (self, other) {
            (CrdtState::PnCounterOp(a), CrdtState::PnCounterOp(b)) => a.equal(b),
            (CrdtState::PnCounterState(a), CrdtState::PnCounterState(b)) => a.equal(b),
            (CrdtState::AwSet(a), CrdtState::AwSet(b)) => a.equal(b),
            (CrdtState::TpSet(a), CrdtState::TpSet(b)) => a.equal(b),
            (CrdtState::MvRegister(a), CrdtState::MvRegister(b)) => a.equal(b),
            (CrdtState::EwFlag(a), CrdtState::EwFlag(b)) => a.equal(b),
            _ => false,
        }
    }

    /// Merges `other`'s state into `self`, when the underlying CRDT supports
    /// state-based merge (only the state-based PN-Counter).
    pub fn merge(&mut self, other: &Self) {
        if let (CrdtState::PnCounterState(a), CrdtState::PnCounterState(b)) = (self, other) {
            a.merge(b);
        }
    }
}

impl CrdtOperation {
    pub fn type_tag(&self) -> TypeTag {
        match self {
            CrdtOperation::PnCounterOp(_) => TypeTag::PnCounterOp,
            CrdtOperation::PnCounterState(_) => TypeTag::PnCounterState,
            CrdtOperation::AwSet(_) => TypeTag::AwSet,
            CrdtOperation::TpSet(_) => TypeTag::TpSet,
            CrdtOperation::MvRegister(_) => TypeTag::MvRegister,
            CrdtOperation::EwFlag(_) => TypeTag::EwFlag,
        }
    }
}
