//! The operation log: append-only, wrap-around
//! multi-file structure with bounded maximum size. Each segment is a flat
//! sequence of length-prefixed, bincode-encoded `LogRecord`s; a truncated
//! trailing record (a crash mid-write) is detected and the segment's tail
//! is repaired by truncating the file back to the last complete record.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::engine::batch::LogRecord;
use crate::ids::SeqNr;

const LENGTH_PREFIX_BYTES: usize = 4;

pub struct Wal {
    dir: PathBuf,
    segment_max_bytes: u64,
    retention_segments: usize,
    current_file: File,
    current_path: PathBuf,
    current_size: u64,
}

impl Wal {
    /// Opens (or creates) the WAL directory, repairing the newest segment's
    /// tail if it was truncated mid-write.
    pub fn open(dir: &Path, segment_max_bytes: u64, retention_segments: usize) -> io::Result<Self> {
        fs::create_dir_all(dir)?;
        let mut segments = Self::list_segments(dir)?;

        let current_path = match segments.last() {
            Some(path) => path.clone(),
            None => {
                let path = Self::segment_path(dir, 1);
                File::create(&path)?;
                segments.push(path.clone());
                path
            }
        };

        Self::repair_tail(&current_path)?;
        let current_file = OpenOptions::new().append(true).read(true).open(&current_path)?;
        let current_size = current_file.metadata()?.len();

        Ok(Wal { dir: dir.to_path_buf(), segment_max_bytes, retention_segments, current_file, current_path, current_size })
    }

    fn segment_path(dir: &Path, index: u64) -> PathBuf {
        dir.join(format!("wal-{index:020}.log"))
    }

    fn segment_index(path: &Path) -> Option<u64> {
        path.file_stem()?.to_str()?.strip_prefix("wal-")?.parse().ok()
    }

    fn list_segments(dir: &Path) -> io::Result<Vec<PathBuf>> {
        let mut segments: Vec<PathBuf> = fs::read_dir(dir)?
            .filter_map(|entry| entry.ok())
            .map(|entry| entry.path())
            .filter(|path| Self::segment_index(path).is_some())
            .collect();
        segments.sort();
        Ok(segments)
    }

    /// Reads length-prefixed records from the front of the file; if a
    /// trailing record is incomplete (a crash mid-write), truncates the
    /// file to the last complete record's end.
    fn repair_tail(path: &Path) -> io::Result<()> {
        let mut file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        let mut buf = vec![0u8; len as usize];
        file.read_exact(&mut buf)?;

        let mut offset = 0usize;
        let mut last_good = 0usize;
        while offset + LENGTH_PREFIX_BYTES <= buf.len() {
            let record_len = u32::from_le_bytes(buf[offset..offset + LENGTH_PREFIX_BYTES].try_into().unwrap()) as usize;
            let record_start = offset + LENGTH_PREFIX_BYTES;
            if record_start + record_len > buf.len() {
                break;
            }
            offset = record_start + record_len;
            last_good = offset;
        }

        if last_good != buf.len() {
            warn!(path = %path.display(), kept = last_good, discarded = buf.len() - last_good, "repairing truncated WAL tail");
            file.set_len(last_good as u64)?;
            file.seek(SeekFrom::Start(last_good as u64))?;
        }
        Ok(())
    }

    /// Appends a record, durably enough to precede broadcast (write-ahead
    /// ordering). Rotates to a new segment if this write would
    /// exceed `segment_max_bytes`.
    pub fn append(&mut self, record: &LogRecord) -> io::Result<()> {
        let bytes = bincode::serialize(record).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        let framed_len = LENGTH_PREFIX_BYTES as u64 + bytes.len() as u64;

        if self.current_size > 0 && self.current_size + framed_len > self.segment_max_bytes {
            self.rotate()?;
        }

        self.current_file.write_all(&(bytes.len() as u32).to_le_bytes())?;
        self.current_file.write_all(&bytes)?;
        self.current_file.sync_data()?;
        self.current_size += framed_len;
        Ok(())
    }

    fn rotate(&mut self) -> io::Result<()> {
        let next_index = Self::segment_index(&self.current_path).unwrap_or(0) + 1;
        let next_path = Self::segment_path(&self.dir, next_index);
        let file = File::create(&next_path)?;
        self.current_file = OpenOptions::new().append(true).read(true).open(&next_path)?;
        self.current_path = next_path;
        self.current_size = 0;
        drop(file);
        Ok(())
    }

    /// Reads every record across every segment, in order. Used on recovery;
    /// for a long-lived replica this would be bounded by
    /// scanning only segments not yet covered by the snapshot, but
    /// recovery only runs once at startup so a full scan is acceptable here.
    pub fn read_all(&self) -> io::Result<Vec<LogRecord>> {
        let mut records = Vec::new();
        for segment in Self::list_segments(&self.dir)? {
            let mut bytes = Vec::new();
            File::open(&segment)?.read_to_end(&mut bytes)?;
            let mut offset = 0usize;
            while offset + LENGTH_PREFIX_BYTES <= bytes.len() {
                let record_len =
                    u32::from_le_bytes(bytes[offset..offset + LENGTH_PREFIX_BYTES].try_into().unwrap()) as usize;
                let start = offset + LENGTH_PREFIX_BYTES;
                if start + record_len > bytes.len() {
                    break;
                }
                let record: LogRecord = bincode::deserialize(&bytes[start..start + record_len])
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
                records.push(record);
                offset = start + record_len;
            }
        }
        Ok(records)
    }

    /// Recycles segments that are entirely covered by a durable snapshot,
    /// keeping at least
    /// `retention_segments` of the newest segments regardless.
    pub fn prune(&mut self, covered_through: SeqNr) -> io::Result<()> {
        let segments = Self::list_segments(&self.dir)?;
        if segments.len() <= self.retention_segments.max(1) {
            return Ok(());
        }

        let keep_from = segments.len().saturating_sub(self.retention_segments.max(1));
        for segment in &segments[..keep_from] {
            if segment == &self.current_path {
                continue;
            }
            if Self::segment_max_sequence(segment)? <= covered_through {
                fs::remove_file(segment)?;
            }
        }
        Ok(())
    }

    fn segment_max_sequence(path: &Path) -> io::Result<SeqNr> {
        let mut bytes = Vec::new();
        File::open(path)?.read_to_end(&mut bytes)?;
        let mut offset = 0usize;
        let mut max_seq = 0;
        while offset + LENGTH_PREFIX_BYTES <= bytes.len() {
            let record_len = u32::from_le_bytes(bytes[offset..offset + LENGTH_PREFIX_BYTES].try_into().unwrap()) as usize;
            let start = offset + LENGTH_PREFIX_BYTES;
            if start + record_len > bytes.len() {
                break;
            }
            if let Ok(record) = bincode::deserialize::<LogRecord>(&bytes[start..start + record_len]) {
                max_seq = max_seq.max(record.sequence);
            }
            offset = start + record_len;
        }
        Ok(max_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::batch::EffectRecord;
    use crate::vector_clock::VectorClock;

    fn record(sequence: SeqNr) -> LogRecord {
        LogRecord { sequence, effects: Vec::<EffectRecord>::new(), clock_after: VectorClock::new() }
    }

    #[test]
    fn appended_records_are_read_back_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let mut wal = Wal::open(dir.path(), 1 << 20, 4).unwrap();

        wal.append(&record(1)).unwrap();
        wal.append(&record(2)).unwrap();
        wal.append(&record(3)).unwrap();

        let read_back = wal.read_all().unwrap();
        let sequences: Vec<SeqNr> = read_back.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![1, 2, 3]);
    }

    #[test]
    fn repairs_truncated_tail_on_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut wal = Wal::open(dir.path(), 1 << 20, 4).unwrap();
            wal.append(&record(1)).unwrap();
            wal.append(&record(2)).unwrap();
        }

        // Simulate a crash mid-write: truncate off the tail of the last record.
        let segment = Wal::list_segments(dir.path()).unwrap().into_iter().next().unwrap();
        let full_len = fs::metadata(&segment).unwrap().len();
        let file = OpenOptions::new().write(true).open(&segment).unwrap();
        file.set_len(full_len - 2).unwrap();

        let wal = Wal::open(dir.path(), 1 << 20, 4).unwrap();
        let records = wal.read_all().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].sequence, 1);
    }

    #[test]
    fn rotates_once_segment_size_is_exceeded() {
        let dir = tempfile::tempdir().unwrap();
        let mut wal = Wal::open(dir.path(), 40, 10).unwrap();
        for i in 1..=10 {
            wal.append(&record(i)).unwrap();
        }
        let segments = Wal::list_segments(dir.path()).unwrap();
        assert!(segments.len() > 1);
        let records = wal.read_all().unwrap();
        assert_eq!(records.len(), 10);
    }
}
