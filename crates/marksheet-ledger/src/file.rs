//! File-backed ledger: in-memory state plus an append-only write log.
//!
//! On-disk frame format:
//! ```text
//! [4 bytes: payload length (little-endian u32)]
//! [4 bytes: CRC32 of payload (little-endian u32)]
//! [N bytes: payload (bincode-serialized LogRecord)]
//! ```
//!
//! Every write appends one frame before it becomes visible. Opening the
//! ledger replays the log front-to-back; frames that fail the CRC check are
//! skipped, and a torn tail stops replay.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, RwLock};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{LedgerError, LedgerResult};
use crate::iter::{IteratorTracker, SnapshotIterator};
use crate::state::LedgerState;
use crate::traits::{Ledger, RangeIterator, Version, VersionedValue};

/// Header size: 4 bytes length + 4 bytes CRC.
const HEADER_SIZE: usize = 8;

/// Flush/sync strategy for the write log.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncMode {
    /// `fsync` after every write.
    EveryWrite,
    /// Flush to the OS page cache only.
    #[default]
    OsDefault,
}

/// One logged write.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
struct LogRecord {
    key: String,
    value: Vec<u8>,
    version: Version,
}

struct LogWriter {
    /// `None` once the log could not be restored to a frame boundary after
    /// a failed append. Writes are refused until [`FileLedger::compact`]
    /// rewrites the log.
    writer: Option<BufWriter<File>>,
    /// Length of the log up to the last complete frame.
    offset: u64,
}

impl LogWriter {
    fn writer(&mut self) -> LedgerResult<&mut BufWriter<File>> {
        self.writer.as_mut().ok_or_else(|| {
            LedgerError::Unavailable("ledger log is unusable after a failed write".into())
        })
    }

    /// Drop whatever a failed append left behind: bytes still buffered and
    /// any partial frame already on disk.
    fn rollback(&mut self) -> io::Result<()> {
        if let Some(stale) = self.writer.take() {
            let (file, _discarded) = stale.into_parts();
            file.set_len(self.offset)?;
            self.writer = Some(BufWriter::new(file));
        }
        Ok(())
    }
}

/// Ledger persisted to a single append-only log file.
pub struct FileLedger {
    path: PathBuf,
    state: RwLock<LedgerState>,
    log: Mutex<LogWriter>,
    sync_mode: SyncMode,
    iterators: IteratorTracker,
    #[cfg(test)]
    flush_fault: std::sync::atomic::AtomicBool,
}

impl FileLedger {
    /// Open (or create) the ledger at `path` with [`SyncMode::OsDefault`].
    pub fn open(path: impl AsRef<Path>) -> LedgerResult<Self> {
        Self::open_with(path, SyncMode::default())
    }

    /// Open (or create) the ledger at `path`, replaying any existing log.
    pub fn open_with(path: impl AsRef<Path>, sync_mode: SyncMode) -> LedgerResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&path)?;

        let (state, valid_len) = replay(&path)?;
        let file_len = file.metadata()?.len();
        if valid_len < file_len {
            // Drop the torn tail so new frames are not appended after garbage.
            warn!(valid_len, file_len, "truncating torn ledger log tail");
            file.set_len(valid_len)?;
        }

        info!(
            path = %path.display(),
            keys = state.len(),
            last_version = state.last_version(),
            "ledger opened"
        );

        Ok(Self {
            path,
            state: RwLock::new(state),
            log: Mutex::new(LogWriter {
                writer: Some(BufWriter::new(file)),
                offset: valid_len,
            }),
            sync_mode,
            iterators: IteratorTracker::new(),
            #[cfg(test)]
            flush_fault: std::sync::atomic::AtomicBool::new(false),
        })
    }

    /// Path to the log file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current size of the log in bytes.
    pub fn log_size(&self) -> LedgerResult<u64> {
        let log = self.log.lock().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(log.offset)
    }

    /// Number of keys currently stored.
    pub fn len(&self) -> usize {
        match self.state.read() {
            Ok(state) => state.len(),
            Err(_) => {
                warn!(path = %self.path.display(), "ledger state lock poisoned; reporting no keys");
                0
            }
        }
    }

    /// Returns `true` if no key has been written.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Number of range iterators opened and not yet closed.
    pub fn open_iterators(&self) -> usize {
        self.iterators.open_count()
    }

    /// Rewrite the log so it holds exactly one frame per live key.
    ///
    /// The new log is written to a temporary file next to the old one and
    /// renamed over it. Returns the number of bytes reclaimed. Also makes a
    /// log that was left unusable by a failed append writable again.
    pub fn compact(&self) -> LedgerResult<u64> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        let mut log = self.log.lock().map_err(|_| LedgerError::LockPoisoned)?;
        if let Some(writer) = log.writer.as_mut() {
            writer.flush()?;
        }
        let before = log.offset;

        let dir = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        let mut after = 0u64;
        {
            let mut writer = BufWriter::new(tmp.as_file_mut());
            for (key, entry) in state.iter() {
                let record = LogRecord {
                    key: key.clone(),
                    value: entry.value.clone(),
                    version: entry.version,
                };
                after += write_frame(&mut writer, &record)?;
            }
            writer.flush()?;
        }
        tmp.as_file().sync_all()?;

        // Open the append handle before the rename so a failure leaves the
        // old log and its writer in place.
        let file = OpenOptions::new().read(true).append(true).open(tmp.path())?;
        tmp.persist(&self.path).map_err(|e| LedgerError::Io(e.error))?;

        log.writer = Some(BufWriter::new(file));
        log.offset = after;

        let reclaimed = before.saturating_sub(after);
        info!(before, after, reclaimed, "ledger log compacted");
        Ok(reclaimed)
    }

    /// Append one frame. On failure the log is cut back to `offset`, so a
    /// rejected write never reaches the file.
    fn append(&self, record: &LogRecord) -> LedgerResult<()> {
        let mut log = self.log.lock().map_err(|_| LedgerError::LockPoisoned)?;
        let offset = log.offset;
        let result = log.writer().and_then(|writer| self.write_synced(writer, record));
        match result {
            Ok(written) => {
                log.offset += written;
                debug!(offset, len = written, key = %record.key, "ledger log append");
                Ok(())
            }
            Err(LedgerError::Unavailable(msg)) => Err(LedgerError::Unavailable(msg)),
            Err(e) => {
                warn!(offset, key = %record.key, error = %e, "ledger log append failed; rolling back");
                if let Err(rollback) = log.rollback() {
                    error!(offset, error = %rollback, "ledger log rollback failed; refusing further writes");
                    log.writer = None;
                }
                Err(e)
            }
        }
    }

    fn write_synced(&self, writer: &mut BufWriter<File>, record: &LogRecord) -> LedgerResult<u64> {
        let written = write_frame(writer, record)?;
        self.injected_flush_failure()?;
        writer.flush()?;
        if self.sync_mode == SyncMode::EveryWrite {
            writer.get_ref().sync_all()?;
        }
        Ok(written)
    }

    fn write(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<Option<Version>>,
    ) -> LedgerResult<Version> {
        // The state lock is held across the append so log order matches
        // version order.
        let mut state = self.state.write().map_err(|_| LedgerError::LockPoisoned)?;
        if let Some(expected) = expected {
            state.check_version(key, expected)?;
        }
        let record = LogRecord {
            key: key.to_string(),
            value: value.to_vec(),
            version: state.next_version(),
        };
        self.append(&record)?;
        state.apply(&record.key, record.value, record.version);
        Ok(record.version)
    }
}

#[cfg(test)]
impl FileLedger {
    /// Make the next append fail after its frame is written but before the
    /// flush.
    fn fail_next_flush(&self) {
        self.flush_fault
            .store(true, std::sync::atomic::Ordering::SeqCst);
    }

    fn injected_flush_failure(&self) -> io::Result<()> {
        if self
            .flush_fault
            .swap(false, std::sync::atomic::Ordering::SeqCst)
        {
            return Err(io::Error::new(io::ErrorKind::Other, "injected flush failure"));
        }
        Ok(())
    }
}

#[cfg(not(test))]
impl FileLedger {
    #[inline]
    fn injected_flush_failure(&self) -> io::Result<()> {
        Ok(())
    }
}

impl Ledger for FileLedger {
    fn put(&self, key: &str, value: &[u8]) -> LedgerResult<Version> {
        self.write(key, value, None)
    }

    fn get_versioned(&self, key: &str) -> LedgerResult<Option<VersionedValue>> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        Ok(state.get(key).cloned())
    }

    fn put_if_version(
        &self,
        key: &str,
        value: &[u8],
        expected: Option<Version>,
    ) -> LedgerResult<Version> {
        self.write(key, value, Some(expected))
    }

    fn range_scan(&self, start: &str, end: &str) -> LedgerResult<Box<dyn RangeIterator>> {
        let state = self.state.read().map_err(|_| LedgerError::LockPoisoned)?;
        let entries = state.range(start, end)?;
        debug!(start, end, count = entries.len(), "ledger range scan");
        Ok(Box::new(SnapshotIterator::new(
            entries,
            self.iterators.clone(),
        )))
    }
}

impl std::fmt::Debug for FileLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileLedger")
            .field("path", &self.path)
            .field("key_count", &self.len())
            .field("sync_mode", &self.sync_mode)
            .finish()
    }
}

/// Serialize `record` and write one framed entry. Returns the bytes written.
fn write_frame(writer: &mut impl Write, record: &LogRecord) -> LedgerResult<u64> {
    let payload =
        bincode::serialize(record).map_err(|e| LedgerError::Serialization(e.to_string()))?;
    let length = u32::try_from(payload.len())
        .map_err(|_| LedgerError::Serialization("log record exceeds 4 GiB".into()))?;
    let crc = crc32fast::hash(&payload);

    writer.write_all(&length.to_le_bytes())?;
    writer.write_all(&crc.to_le_bytes())?;
    writer.write_all(&payload)?;
    Ok(HEADER_SIZE as u64 + payload.len() as u64)
}

/// Rebuild state from the log at `path`.
///
/// Returns the state and the length of the valid prefix of the file.
fn replay(path: &Path) -> LedgerResult<(LedgerState, u64)> {
    let mut reader = BufReader::new(File::open(path)?);
    let file_len = reader.get_ref().metadata()?.len();
    let mut state = LedgerState::new();
    let mut offset: u64 = 0;
    let mut applied = 0usize;

    while offset + HEADER_SIZE as u64 <= file_len {
        let mut header = [0u8; HEADER_SIZE];
        match reader.read_exact(&mut header) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => break,
            Err(e) => return Err(e.into()),
        }

        let length = u32::from_le_bytes([header[0], header[1], header[2], header[3]]);
        let expected_crc = u32::from_le_bytes([header[4], header[5], header[6], header[7]]);

        if length == 0 || offset + HEADER_SIZE as u64 + u64::from(length) > file_len {
            warn!(offset, length, file_len, "invalid log frame length; stopping replay");
            break;
        }

        let mut payload = vec![0u8; length as usize];
        match reader.read_exact(&mut payload) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                warn!(offset, "truncated log frame; stopping replay");
                break;
            }
            Err(e) => return Err(e.into()),
        }
        let frame_end = offset + HEADER_SIZE as u64 + u64::from(length);

        let actual_crc = crc32fast::hash(&payload);
        if actual_crc != expected_crc {
            warn!(
                offset,
                expected = expected_crc,
                actual = actual_crc,
                "CRC mismatch; skipping log frame"
            );
            offset = frame_end;
            continue;
        }

        match bincode::deserialize::<LogRecord>(&payload) {
            Ok(record) => {
                state.apply(&record.key, record.value, record.version);
                applied += 1;
            }
            Err(e) => {
                warn!(offset, error = %e, "undecodable log frame; skipping");
            }
        }
        offset = frame_end;
    }

    debug!(applied, valid_len = offset, "ledger replay complete");
    Ok((state, offset))
}
