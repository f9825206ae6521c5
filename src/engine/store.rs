//! The per-replica object map.

use std::collections::HashMap;

use crate::crdt::{CrdtEffect, CrdtState};
use crate::key::ObjectKey;

#[derive(Debug, Clone, Default)]
pub struct ObjectStore {
    map: HashMap<ObjectKey, (CrdtState, u64)>,
}

impl ObjectStore {
    pub fn new() -> Self {
        ObjectStore { map: HashMap::new() }
    }

    /// Objects are born lazily at first touch with the type's `new()` state.
    pub fn get_or_create_mut(&mut self, key: &ObjectKey) -> &mut (CrdtState, u64) {
        self.map.entry(key.clone()).or_insert_with(|| (CrdtState::new(key.type_tag), 0))
    }

    pub fn get(&self, key: &ObjectKey) -> Option<&(CrdtState, u64)> {
        self.map.get(key)
    }

    pub fn snapshot_entry(&self, key: &ObjectKey) -> Option<(CrdtState, u64)> {
        self.map.get(key).cloned()
    }

    /// Used to roll a key back to its pre-batch image on a batch-atomicity
    /// abort: `None` means the key did not exist before the batch and
    /// should be dropped.
    pub fn restore_entry(&mut self, key: ObjectKey, value: Option<(CrdtState, u64)>) {
        match value {
            Some(v) => {
                self.map.insert(key, v);
            }
            None => {
                self.map.remove(&key);
            }
        }
    }

    pub fn apply_remote(&mut self, key: &ObjectKey, effect: &CrdtEffect) {
        let entry = self.map.entry(key.clone()).or_insert_with(|| (CrdtState::new(key.type_tag), 0));
        entry.0.apply(effect);
        entry.1 += 1;
    }

    pub fn snapshot_map(&self) -> HashMap<ObjectKey, (CrdtState, u64)> {
        self.map.clone()
    }

    pub fn load_map(&mut self, map: HashMap<ObjectKey, (CrdtState, u64)>) {
        self.map = map;
    }
}
