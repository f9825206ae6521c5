//! Multi-value register. Concurrent assigns of different values
//! leave both present; a later assign that has observed all prior versions
//! replaces them.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::crdt::{Crdt, DownstreamError, MintContext};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Assign(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Effect {
    pub value: String,
    pub version: Token,
    pub observed: HashSet<Token>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct MvRegister {
    entries: Vec<(String, HashSet<Token>)>,
}

impl Crdt for MvRegister {
    type Op = Op;
    type Effect = Effect;
    type Value = BTreeSet<String>;

    fn new() -> Self {
        MvRegister { entries: Vec::new() }
    }

    fn value(&self) -> Self::Value {
        self.entries.iter().map(|(v, _)| v.clone()).collect()
    }

    fn downstream(&self, op: &Self::Op, ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError> {
        let Op::Assign(value) = op;
        let version = ctx.minter.mint(ctx.replica);
        let observed = self.entries.iter().flat_map(|(_, versions)| versions.iter().copied()).collect();
        Ok(Effect { value: value.clone(), version, observed })
    }

    fn apply(&mut self, effect: &Self::Effect) {
        let mut surviving: Vec<(String, HashSet<Token>)> = Vec::new();
        for (value, versions) in self.entries.drain(..) {
            if versions.is_subset(&effect.observed) {
                continue;
            }
            let shrunk: HashSet<Token> = versions.difference(&effect.observed).copied().collect();
            surviving.push((value, shrunk));
        }

        if let Some((_, versions)) = surviving.iter_mut().find(|(value, _)| *value == effect.value) {
            versions.insert(effect.version);
        } else {
            surviving.push((effect.value.clone(), HashSet::from([effect.version])));
        }

        self.entries = surviving;
    }

    fn equal(&self, other: &Self) -> bool {
        let normalize = |entries: &Vec<(String, HashSet<Token>)>| {
            let mut sorted: Vec<_> = entries.clone();
            sorted.sort_by(|a, b| a.0.cmp(&b.0));
            sorted
        };
        normalize(&self.entries) == normalize(&other.entries)
    }

    fn requires_state_for_downstream(_op: &Self::Op) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::ReplicaId;
    use crate::token::TokenMinter;

    fn ctx(replica: ReplicaId, minter: &mut TokenMinter) -> MintContext<'_> {
        MintContext { replica, minter }
    }

    #[test]
    fn concurrent_assigns_leave_both_values() {
        let mut minter_a = TokenMinter::new();
        let mut minter_b = TokenMinter::new();

        let reg = MvRegister::new();
        let effect_a = reg.downstream(&Op::Assign("a".into()), &mut ctx(ReplicaId(0), &mut minter_a)).unwrap();
        let effect_b = reg.downstream(&Op::Assign("b".into()), &mut ctx(ReplicaId(1), &mut minter_b)).unwrap();

        let mut replica = reg;
        replica.apply(&effect_a);
        replica.apply(&effect_b);

        assert_eq!(replica.value(), BTreeSet::from(["a".to_string(), "b".to_string()]));
    }

    #[test]
    fn later_assign_that_observed_both_replaces_them() {
        let mut minter = TokenMinter::new();
        let id = ReplicaId(0);

        let mut reg = MvRegister::new();
        let e1 = reg.downstream(&Op::Assign("a".into()), &mut ctx(id, &mut minter)).unwrap();
        reg.apply(&e1);
        let e2 = reg.downstream(&Op::Assign("b".into()), &mut ctx(id, &mut minter)).unwrap();
        reg.apply(&e2);

        assert_eq!(reg.value(), BTreeSet::from(["b".to_string()]));

        let e3 = reg.downstream(&Op::Assign("c".into()), &mut ctx(id, &mut minter)).unwrap();
        reg.apply(&e3);
        assert_eq!(reg.value(), BTreeSet::from(["c".to_string()]));
    }
}
