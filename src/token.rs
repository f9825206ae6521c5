//! Token / version minting.
//!
//! Tokens back add-wins set elements, enable-wins flag enables, and
//! multi-value register versions. All three need the same guarantee: unique
//! per mint, never reused. We use `(replica_id, monotonic_counter)` rather
//! than a wall-clock timestamp, per the design note.

use serde::{Deserialize, Serialize};

use crate::ids::ReplicaId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Token {
    pub replica: ReplicaId,
    pub counter: u64,
}

/// Per-replica monotonic counter used to mint fresh tokens. Lives inside the
/// engine (one per replica, never shared), not inside any single CRDT, since
/// several CRDT types mint tokens and freshness must hold across all of them.
#[derive(Debug, Default)]
pub struct TokenMinter {
    next: u64,
}

impl TokenMinter {
    pub fn new() -> Self {
        TokenMinter { next: 0 }
    }

    pub fn mint(&mut self, replica: ReplicaId) -> Token {
        let counter = self.next;
        self.next += 1;
        Token { replica, counter }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mint_produces_distinct_tokens() {
        let mut minter = TokenMinter::new();
        let r = ReplicaId(0);
        let a = minter.mint(r);
        let b = minter.mint(r);
        assert_ne!(a, b);
    }
}
