//! The snapshot record: a single overwriting record containing
//! `objects`, `local_clock`, `log_sequence`.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::crdt::CrdtState;
use crate::ids::{ReplicaId, SeqNr};
use crate::key::ObjectKey;
use crate::vector_clock::VectorClock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotRecord {
    pub objects: HashMap<ObjectKey, (CrdtState, u64)>,
    pub clock: VectorClock<ReplicaId>,
    pub log_sequence: SeqNr,
}

/// Owns the single `snapshot` file in the replica's data directory.
pub struct SnapshotStore {
    path: PathBuf,
}

impl SnapshotStore {
    pub fn new(data_dir: &Path) -> Self {
        SnapshotStore { path: data_dir.join("snapshot") }
    }

    /// Overwrites the snapshot file atomically: write to a temp file, then
    /// rename over the old one, so a crash mid-write never leaves a
    /// half-written snapshot in place.
    pub fn save(&self, record: &SnapshotRecord) -> io::Result<()> {
        let bytes = bincode::serialize(record).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, bytes)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    pub fn load(&self) -> io::Result<Option<SnapshotRecord>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let bytes = fs::read(&self.path)?;
        let record = bincode::deserialize(&bytes).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        Ok(Some(record))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crdt::CrdtState;
    use crate::key::TypeTag;

    #[test]
    fn round_trips_through_a_real_directory() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());

        let mut objects = HashMap::new();
        objects.insert(ObjectKey::new("ns", TypeTag::PnCounterOp, "c"), (CrdtState::new(TypeTag::PnCounterOp), 3));
        let mut clock = VectorClock::new();
        clock.increment(ReplicaId(0));

        let record = SnapshotRecord { objects, clock, log_sequence: 7 };
        store.save(&record).unwrap();

        let loaded = store.load().unwrap().expect("snapshot should exist");
        assert_eq!(loaded.log_sequence, 7);
        assert_eq!(loaded.clock, record.clock);
    }

    #[test]
    fn load_returns_none_when_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = SnapshotStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
    }
}
