//! Configuration consumed by the persistence and broadcast layers. Parsing
//! this from CLI flags, environment variables, or a config file is an
//! out-of-scope shell's job; this struct is just the stable surface an
//! embedder constructs and passes in.

use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct ReplicaConfig {
    pub data_dir: PathBuf,
    /// Snapshot every N batches (default 100).
    pub snapshot_interval: u64,
    pub wal_segment_max_bytes: u64,
    pub wal_retention_segments: usize,
    /// A maximum wait after which a queued request fails with a
    /// causal-timeout. `None` means no timeout, matching the source
    /// system's own default.
    pub causal_timeout: Option<Duration>,
}

impl ReplicaConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        ReplicaConfig {
            data_dir: data_dir.into(),
            snapshot_interval: 100,
            wal_segment_max_bytes: 16 * 1024 * 1024,
            wal_retention_segments: 8,
            causal_timeout: None,
        }
    }

    pub fn with_snapshot_interval(mut self, interval: u64) -> Self {
        self.snapshot_interval = interval;
        self
    }

    pub fn with_causal_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.causal_timeout = timeout;
        self
    }
}
