//! Add-wins (observed-remove) set. A concurrent add and remove of
//! the same element resolves to presence, because the add's token was not
//! in the remove's observed set.

use std::collections::{BTreeSet, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use crate::crdt::{Crdt, DownstreamError, MintContext};
use crate::token::Token;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Add(String),
    AddAll(Vec<String>),
    Remove(String),
    RemoveAll(Vec<String>),
    Reset,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    AddTokens(Vec<(String, Token)>),
    RemoveTokens(Vec<(String, HashSet<Token>)>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AwSet {
    // Per-element bookkeeping of every add/remove token ever observed.
    entries: HashMap<String, (HashSet<Token>, HashSet<Token>)>,
}

impl AwSet {
    fn add_tokens(&self, element: &str) -> HashSet<Token> {
        self.entries.get(element).map(|(add, _)| add.clone()).unwrap_or_default()
    }

    fn entry_mut(&mut self, element: &str) -> &mut (HashSet<Token>, HashSet<Token>) {
        self.entries.entry(element.to_string()).or_default()
    }
}

impl Crdt for AwSet {
    type Op = Op;
    type Effect = Effect;
    type Value = BTreeSet<String>;

    fn new() -> Self {
        AwSet { entries: HashMap::new() }
    }

    fn value(&self) -> Self::Value {
        self.entries
            .iter()
            .filter(|(_, (add, remove))| !add.is_subset(remove))
            .map(|(element, _)| element.clone())
            .collect()
    }

    fn downstream(&self, op: &Self::Op, ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError> {
        match op {
            Op::Add(element) => {
                let token = ctx.minter.mint(ctx.replica);
                Ok(Effect::AddTokens(vec![(element.clone(), token)]))
            }
            Op::AddAll(elements) => {
                let tokens = elements
                    .iter()
                    .map(|e| (e.clone(), ctx.minter.mint(ctx.replica)))
                    .collect();
                Ok(Effect::AddTokens(tokens))
            }
            Op::Remove(element) => {
                Ok(Effect::RemoveTokens(vec![(element.clone(), self.add_tokens(element))]))
            }
            Op::RemoveAll(elements) => {
                let removed = elements.iter().map(|e| (e.clone(), self.add_tokens(e))).collect();
                Ok(Effect::RemoveTokens(removed))
            }
            Op::Reset => {
                let removed = self
                    .entries
                    .iter()
                    .filter(|(_, (add, remove))| !add.is_subset(remove))
                    .map(|(element, (add, _))| (element.clone(), add.clone()))
                    .collect();
                Ok(Effect::RemoveTokens(removed))
            }
        }
    }

    fn apply(&mut self, effect: &Self::Effect) {
        match effect {
            Effect::AddTokens(tokens) => {
                for (element, token) in tokens {
                    self.entry_mut(element).0.insert(*token);
                }
            }
            Effect::RemoveTokens(removed) => {
                for (element, tokens) in removed {
                    self.entry_mut(element).1.extend(tokens.iter().copied());
                }
            }
        }
    }

    fn equal(&self, other: &Self) -> bool {
        self.entries == other.entries
    }

    fn requires_state_for_downstream(op: &Self::Op) -> bool {
        matches!(op, Op::Remove(_) | Op::RemoveAll(_) | Op::Reset)
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
    fn concurrent_add_and_remove_is_add_wins() {
        let mut minter_a = TokenMinter::new();
        let mut minter_b = TokenMinter::new();
        let a_id = ReplicaId(0);
        let b_id = ReplicaId(1);

        // A adds "x" from an empty state.
        let a = AwSet::new();
        let add_effect = a.downstream(&Op::Add("x".into()), &mut ctx(a_id, &mut minter_a)).unwrap();

        // B concurrently removes "x" from an empty state: its observed-set is empty.
        let b = AwSet::new();
        let remove_effect = b.downstream(&Op::Remove("x".into()), &mut ctx(b_id, &mut minter_b)).unwrap();

        // Exchange: apply both effects on both replicas, in either order.
        let mut replica_a = a;
        replica_a.apply(&add_effect);
        replica_a.apply(&remove_effect);

        let mut replica_b = b;
        replica_b.apply(&remove_effect);
        replica_b.apply(&add_effect);

        assert!(replica_a.equal(&replica_b));
        assert_eq!(replica_a.value(), BTreeSet::from(["x".to_string()]));
    }

    #[test]
    fn remove_after_add_is_observed() {
        let mut minter = TokenMinter::new();
        let id = ReplicaId(0);

        let mut set = AwSet::new();
        let add_effect = set.downstream(&Op::Add("x".into()), &mut ctx(id, &mut minter)).unwrap();
        set.apply(&add_effect);

        let remove_effect = set.downstream(&Op::Remove("x".into()), &mut ctx(id, &mut minter)).unwrap();
        set.apply(&remove_effect);

        assert!(set.value().is_empty());
    }
}
