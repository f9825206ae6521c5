//! The persistence layer: write-ahead log plus periodic snapshots,
//! enabling crash recovery by snapshot load + log replay.

pub mod snapshot;
pub mod wal;

use std::io;
use std::path::Path;

use tracing::info;

use crate::config::ReplicaConfig;
use crate::engine::batch::LogRecord;
use crate::engine::ReplicaEngine;
use crate::ids::ReplicaId;
use crate::persistence::snapshot::SnapshotStore;
use crate::persistence::wal::Wal;

pub struct Persistence {
    wal: Wal,
    snapshots: SnapshotStore,
    snapshot_interval: u64,
}

impl Persistence {
    pub fn open(config: &ReplicaConfig) -> io::Result<Self> {
        let wal = Wal::open(&config.data_dir, config.wal_segment_max_bytes, config.wal_retention_segments)?;
        let snapshots = SnapshotStore::new(&config.data_dir);
        Ok(Persistence { wal, snapshots, snapshot_interval: config.snapshot_interval })
    }

    /// Appends a batch's log record, write-ahead of broadcast.
    pub fn append(&mut self, record: &LogRecord) -> io::Result<()> {
        self.wal.append(record)
    }

    /// Writes a snapshot and prunes WAL segments it now fully covers.
    pub fn snapshot(&mut self, engine: &mut ReplicaEngine) -> io::Result<()> {
        let record = engine.snapshot();
        self.snapshots.save(&record)?;
        self.wal.prune(record.log_sequence)?;
        Ok(())
    }

    pub fn maybe_snapshot(&mut self, engine: &mut ReplicaEngine) -> io::Result<bool> {
        if engine.should_snapshot(self.snapshot_interval) {
            self.snapshot(engine)?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    /// Recovery on start-up: load the snapshot if one exists, then replay
    /// every log record past its `log_sequence`.
    pub fn recover(&self, replica_id: ReplicaId) -> io::Result<ReplicaEngine> {
        let mut engine = ReplicaEngine::new(replica_id);

        if let Some(snapshot) = self.snapshots.load()? {
            info!(replica = ?replica_id, log_sequence = snapshot.log_sequence, "loaded snapshot");
            engine.restore_snapshot(snapshot);
        }

        let mut records = self.wal.read_all()?;
        records.sort_by_key(|r| r.sequence);
        let mut replayed = 0u64;
        for record in &records {
            if record.sequence > engine.log_sequence() {
                engine.replay_log_record(record);
                replayed += 1;
            }
        }
        info!(replica = ?replica_id, replayed, log_sequence = engine.log_sequence(), "recovery complete");

        Ok(engine)
    }
}

pub fn data_dir_for(base: &Path, replica_id: ReplicaId) -> std::path::PathBuf {
    base.join(format!("replica-{}", replica_id.0))
}
