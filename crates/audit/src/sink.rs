use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::entry::AuditLogEntry;
use crate::error::AuditError;

const GENESIS: &str = "genesis";

/// Durable mirror for appended entries, called in append order.
pub trait AuditSink: Send + Sync {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError>;
}

impl<S: AuditSink + ?Sized> AuditSink for Arc<S> {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        (**self).append(entry)
    }
}

#[derive(Serialize, Deserialize)]
struct ChainedLine {
    entry_hash: String,
    prev_hash: String,
    #[serde(flatten)]
    entry: AuditLogEntry,
}

/// A writer that can force its contents to durable storage.
trait SyncWrite: Write {
    fn sync(&mut self) -> std::io::Result<()>;
}

impl SyncWrite for File {
    fn sync(&mut self) -> std::io::Result<()> {
        self.sync_all()
    }
}

struct ChainState<W = File> {
    file: W,
    last_hash: String,
}

impl<W: SyncWrite> ChainState<W> {
    /// `last_hash` advances once the line is written, even if the sync
    /// then fails, so the next line still links to it.
    fn append(&mut self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        let entry_hash = ChainedFileSink::hash(&self.last_hash, entry)?;
        let line = ChainedLine {
            entry_hash: entry_hash.clone(),
            prev_hash: self.last_hash.clone(),
            entry: entry.clone(),
        };

        let json = serde_json::to_string(&line)?;
        writeln!(self.file, "{}", json)?;
        self.last_hash = entry_hash;

        self.file.sync()?;
        Ok(())
    }
}

/// JSON-lines file where every line carries the SHA-256 of its predecessor.
pub struct ChainedFileSink {
    log_path: PathBuf,
    state: Mutex<ChainState>,
}

impl ChainedFileSink {
    /// Opens or creates the log, verifying any existing chain first.
    pub fn open<P: AsRef<Path>>(log_path: P) -> Result<Self, AuditError> {
        let log_path = log_path.as_ref().to_path_buf();

        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let last_hash = match Self::read_chain(&log_path)?.last() {
            Some(line) => line.entry_hash.clone(),
            None => GENESIS.to_string(),
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_path)?;

        Ok(Self {
            log_path,
            state: Mutex::new(ChainState { file, last_hash }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.log_path
    }

    pub fn verify_integrity(&self) -> Result<(), AuditError> {
        Self::read_chain(&self.log_path)?;
        Ok(())
    }

    /// Entries currently on disk, after verifying the chain.
    pub fn entries(&self) -> Result<Vec<AuditLogEntry>, AuditError> {
        Ok(Self::read_chain(&self.log_path)?
            .into_iter()
            .map(|line| line.entry)
            .collect())
    }

    fn hash(prev_hash: &str, entry: &AuditLogEntry) -> Result<String, AuditError> {
        let entry_json = serde_json::to_string(entry)?;
        let mut hasher = Sha256::new();
        hasher.update(prev_hash);
        hasher.update(&entry_json);
        Ok(format!("{:x}", hasher.finalize()))
    }

    fn read_chain(log_path: &Path) -> Result<Vec<ChainedLine>, AuditError> {
        if !log_path.exists() {
            return Ok(Vec::new());
        }

        Self::verify_lines(BufReader::new(File::open(log_path)?))
    }

    fn verify_lines<R: BufRead>(reader: R) -> Result<Vec<ChainedLine>, AuditError> {
        let mut prev_hash = GENESIS.to_string();
        let mut lines = Vec::new();

        for (index, line) in reader.lines().enumerate() {
            let line_num = index + 1;
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }

            let chained: ChainedLine = serde_json::from_str(&line).map_err(|e| {
                AuditError::IntegrityViolation(format!("Line {}: Invalid JSON: {}", line_num, e))
            })?;

            if chained.prev_hash != prev_hash {
                return Err(AuditError::IntegrityViolation(format!(
                    "Line {}: Hash chain broken. Expected prev_hash '{}', got '{}'",
                    line_num, prev_hash, chained.prev_hash
                )));
            }

            let computed = Self::hash(&prev_hash, &chained.entry)?;
            if computed != chained.entry_hash {
                return Err(AuditError::IntegrityViolation(format!(
                    "Line {}: Hash mismatch. Expected '{}', got '{}'",
                    line_num, computed, chained.entry_hash
                )));
            }

            prev_hash = chained.entry_hash.clone();
            lines.push(chained);
        }

        Ok(lines)
    }
}

impl AuditSink for ChainedFileSink {
    fn append(&self, entry: &AuditLogEntry) -> Result<(), AuditError> {
        self.state.lock().append(entry)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::AuditStatus;
    use std::io;

    /// Accepts every write; fails every sync while `fail_sync` is set.
    #[derive(Default)]
    struct FlakyDisk {
        written: Vec<u8>,
        fail_sync: bool,
    }

    impl Write for FlakyDisk {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.written.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SyncWrite for FlakyDisk {
        fn sync(&mut self) -> io::Result<()> {
            if self.fail_sync {
                return Err(io::Error::new(io::ErrorKind::Other, "fsync failed"));
            }
            Ok(())
        }
    }

    fn create_entry(action: &str) -> AuditLogEntry {
        AuditLogEntry {
            user_id: "user_demo".to_string(),
            action: action.to_string(),
            action_type: "file".to_string(),
            status: AuditStatus::Success,
            reason: None,
            parameters: None,
            result: None,
            timestamp: hypr_guard_core::timestamp::now(),
        }
    }

    #[test]
    fn test_failed_sync_keeps_chain_linked() {
        let mut state = ChainState {
            file: FlakyDisk {
                fail_sync: true,
                ..FlakyDisk::default()
            },
            last_hash: GENESIS.to_string(),
        };

        let err = state.append(&create_entry("read")).unwrap_err();
        assert!(matches!(err, AuditError::Io(_)));
        assert_ne!(state.last_hash, GENESIS);

        state.file.fail_sync = false;
        state.append(&create_entry("write")).unwrap();

        let lines = ChainedFileSink::verify_lines(state.file.written.as_slice()).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].prev_hash, lines[0].entry_hash);
        assert_eq!(lines[1].entry_hash, state.last_hash);
    }
}
