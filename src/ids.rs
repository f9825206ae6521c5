use std::fmt;

/// A replica's stable identifier. Replica ids are totally ordered so they can
/// be used for tie-breaking (e.g. token minting), but that ordering is never
/// used to define causal order — only the vector clock does that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct ReplicaId(pub u64);

impl fmt::Display for ReplicaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// Monotonically increasing sequence number, used both for the WAL's
/// per-batch sequence and for per-origin effect ordinals.
pub type SeqNr = u64;
