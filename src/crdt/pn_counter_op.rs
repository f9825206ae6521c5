//! Operation-based PN-Counter. The simplest CRDT in the library:
//! effects are just signed deltas, applied by integer addition.

use serde::{Deserialize, Serialize};

use crate::crdt::{Crdt, DownstreamError, MintContext};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Increment(u64),
    Decrement(u64),
}

pub type Effect = i64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PnCounterOp {
    value: i64,
}

impl Crdt for PnCounterOp {
    type Op = Op;
    type Effect = Effect;
    type Value = i64;

    fn new() -> Self {
        PnCounterOp { value: 0 }
    }

    fn value(&self) -> Self::Value {
        self.value
    }

    fn downstream(&self, op: &Self::Op, _ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError> {
        Ok(match op {
            Op::Increment(n) => *n as i64,
            Op::Decrement(n) => -(*n as i64),
        })
    }

    fn apply(&mut self, effect: &Self::Effect) {
        self.value += effect;
    }

    fn equal(&self, other: &Self) -> bool {
        self.value == other.value
    }

    fn requires_state_for_downstream(_op: &Self::Op) -> bool {
        false
    }
}
