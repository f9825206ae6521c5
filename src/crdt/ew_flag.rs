//! Enable-wins flag. Concurrent enable beats concurrent disable,
//! mirroring the add-wins set's observed-remove trick with a single boolean.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

use crate::crdt::{Crdt, DownstreamError, MintContext};
use crate::token::Token;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Op {
    Enable,
    Disable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Enable(Token),
    Disable(HashSet<Token>),
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct EwFlag {
    enable_tokens: HashSet<Token>,
    disable_tokens: HashSet<Token>,
}

impl Crdt for EwFlag {
    type Op = Op;
    type Effect = Effect;
    type Value = bool;

    fn new() -> Self {
        EwFlag { enable_tokens: HashSet::new(), disable_tokens: HashSet::new() }
    }

    fn value(&self) -> Self::Value {
        !self.enable_tokens.is_subset(&self.disable_tokens)
    }

    fn downstream(&self, op: &Self::Op, ctx: &mut MintContext) -> Result<Self::Effect, DownstreamError> {
        match op {
            Op::Enable => Ok(Effect::Enable(ctx.minter.mint(ctx.replica))),
            Op::Disable => Ok(Effect::Disable(self.enable_tokens.clone())),
        }
    }

    fn apply(&mut self, effect: &Self::Effect) {
        match effect {
            Effect::Enable(token) => {
                self.enable_tokens.insert(*token);
            }
            Effect::Disable(tokens) => {
                self.disable_tokens.extend(tokens.iter().copied());
            }
        }
    }

    fn equal(&self, other: &Self) -> bool {
        self.enable_tokens == other.enable_tokens && self.disable_tokens == other.disable_tokens
    }

    fn requires_state_for_downstream(op: &Self::Op) -> bool {
        matches!(op, Op::Disable)
    }
}
