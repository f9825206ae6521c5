//! The causal broadcast layer: fan-out of effects to peers, with metadata
//! sufficient for causal ordering. Transport and peer discovery are
//! external collaborators — this module only defines the contract and an
//! in-process actix-backed realization of it (`actix_layer`).

pub mod actix_layer;

use crate::ids::ReplicaId;

/// The external membership collaborator: the broadcast layer performs no
/// discovery logic of its own beyond what this reports.
pub trait Membership: Send + Sync {
    fn other_members(&self) -> Vec<ReplicaId>;
}

/// A membership list fixed at construction time, e.g. parsed from a
/// peer-discovery environment variable holding comma-separated replica
/// identifiers. Cluster membership itself is assumed to be externally
/// managed; this is the simplest thing that satisfies the `Membership`
/// contract.
pub struct StaticMembership {
    members: Vec<ReplicaId>,
}

impl StaticMembership {
    pub fn new(members: Vec<ReplicaId>) -> Self {
        StaticMembership { members }
    }

    pub fn from_env_value(value: &str) -> Self {
        let members = value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse::<u64>().ok())
            .map(ReplicaId)
            .collect();
        StaticMembership::new(members)
    }
}

impl Membership for StaticMembership {
    fn other_members(&self) -> Vec<ReplicaId> {
        self.members.clone()
    }
}
