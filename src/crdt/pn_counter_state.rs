//! State-based PN-Counter. Converges either by applying effects or
//! by merging full state — both are monotone on the per-bucket lattice, so
//! they're interchangeable.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::crdt::{Crdt, DownstreamError, MintContext, StateMerge};
use crate::ids::ReplicaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Increment(u64),
    Decrement(u64),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Increment { origin: ReplicaId, n: u64 },
    Decrement { origin: ReplicaId, n: u64 },
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PnCounterState {
    positive: HashMap<ReplicaId, u64>,
    negative: HashMap<ReplicaId, u64>,
}

impl Crdt for PnCounterState {
    type Op = Op;
    type Effect = Effect;
    type Value = i64;

    fn new() -> Self {
        PnCounterState { positive: HashMap::new(), negative: HashMap::new() }
    }

    fn value(&self) -> Self::Value {
        let pos: u64 = self.positive.values().sum();
        let neg: u64 = self.negative.values().sum();
        pos as i64 - neg as i64
    }

    fn downstream(&self, op: &Self::Op, ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError> {
        match op {
            Op::Increment(0) | Op::Decrement(0) => Err("increment/decrement amount must be >= 1".to_string()),
            Op::Increment(n) => Ok(Effect::Increment { origin: ctx.replica, n: *n }),
            Op::Decrement(n) => Ok(Effect::Decrement { origin: ctx.replica, n: *n }),
        }
    }

    fn apply(&mut self, effect: &Self::Effect) {
        match effect {
            Effect::Increment { origin, n } => {
                *self.positive.entry(*origin).or_insert(0) += n;
            }
            Effect::Decrement { origin, n } => {
                *self.negative.entry(*origin).or_insert(0) += n;
            }
        }
    }

    fn equal(&self, other: &Self) -> bool {
        self.value() == other.value() && self.positive == other.positive && self.negative == other.negative
    }

    fn requires_state_for_downstream(_op: &Self::Op) -> bool {
        false
    }
}

impl StateMerge for PnCounterState {
    fn merge(&mut self, other: &Self) {
        for (id, n) in &other.positive {
            let slot = self.positive.entry(*id).or_insert(0);
            *slot = (*slot).max(*n);
        }
        for (id, n) in &other.negative {
            let slot = self.negative.entry(*id).or_insert(0);
            *slot = (*slot).max(*n);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::token::TokenMinter;

    fn ctx(replica: ReplicaId, minter: &mut TokenMinter) -> MintContext<'_> {
        MintContext { replica, minter }
    }

    #[test]
    fn effects_and_merge_are_interchangeable() {
        let mut minter = TokenMinter::new();
        let a_id = ReplicaId(0);
        let b_id = ReplicaId(1);

        let mut a = PnCounterState::new();
        let effect_a = a.downstream(&Op::Increment(3), &mut ctx(a_id, &mut minter)).unwrap();
        a.apply(&effect_a);

        let mut b = PnCounterState::new();
        let effect_b = b.downstream(&Op::Decrement(1), &mut ctx(b_id, &mut minter)).unwrap();
        b.apply(&effect_b);

        let mut via_effects = PnCounterState::new();
        via_effects.apply(&effect_a);
        via_effects.apply(&effect_b);

        let mut via_merge = a.clone();
        via_merge.merge(&b);

        assert!(via_effects.equal(&via_merge));
        assert_eq!(via_effects.value(), 2);
    }

    #[test]
    fn rejects_zero_amount() {
        let mut minter = TokenMinter::new();
        let c = PnCounterState::new();
        assert!(c.downstream(&Op::Increment(0), &mut ctx(ReplicaId(0), &mut minter)).is_err());
    }
}
