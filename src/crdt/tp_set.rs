//! Two-phase set. Once an element is removed it can never
//! reappear — `add` after `remove` is rejected at origin.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::crdt::{Crdt, DownstreamError, MintContext};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Op {
    Add(String),
    AddAll(Vec<String>),
    Remove(String),
    RemoveAll(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    AddElems(Vec<String>),
    RemoveElems(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct TpSet {
    added: HashSet<String>,
    removed: HashSet<String>,
}

impl Crdt for TpSet {
    type Op = Op;
    type Effect = Effect;
    type Value = BTreeSet<String>;

    fn new() -> Self {
        TpSet { added: HashSet::new(), removed: HashSet::new() }
    }

    fn value(&self) -> Self::Value {
        self.added.difference(&self.removed).cloned().collect()
    }

    fn downstream(&self, op: &Self::Op, _ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError> {
        match op {
            Op::Add(element) => {
                if self.removed.contains(element) {
                    Err(format!("element {element:?} was already removed"))
                } else {
                    Ok(Effect::AddElems(vec![element.clone()]))
                }
            }
            Op::Remove(element) => {
                if !self.added.contains(element) {
                    Err(format!("element {element:?} was never added"))
                } else {
                    Ok(Effect::RemoveElems(vec![element.clone()]))
                }
            }
            Op::AddAll(elements) => {
                let kept = elements.iter().filter(|e| !self.removed.contains(*e)).cloned().collect();
                Ok(Effect::AddElems(kept))
            }
            Op::RemoveAll(elements) => {
                let kept = elements.iter().filter(|e| self.added.contains(*e)).cloned().collect();
                Ok(Effect::RemoveElems(kept))
            }
        }
    }

    fn apply(&mut self, effect: &Self::Effect) {
        match effect {
            Effect::AddElems(elements) => self.added.extend(elements.iter().cloned()),
            Effect::RemoveElems(elements) => self.removed.extend(elements.iter().cloned()),
        }
    }

    fn equal(&self, other: &Self) -> bool {
        self.added == other.added && self.removed == other.removed
    }

    fn requires_state_for_downstream(_op: &Self::Op) -> bool {
        true
    }
}
