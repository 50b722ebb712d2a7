// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Durable queue for scans that could not be delivered immediately.
//!
//! Uses JSONL format for durability - each scan is written as a single line
//! and fsynced immediately. The queue is bounded: when full, the oldest scan
//! is evicted before the new one is written. Lines that fail to parse are
//! skipped and counted, never fatal to the records around them.
//!
//! Every file access holds the shared [`StorageMedium`] guard for exactly
//! the duration of the I/O.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufRead, BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use scan_core::ScanEvent;

use crate::config::{StorageConfig, MAX_QUEUE_FILE_BYTES, MAX_QUEUE_SIZE};
use crate::storage::StorageMedium;

/// Longest slice of a corrupt line echoed into the logs.
const PREVIEW_LEN: usize = 120;

/// Error type for queue operations.
#[derive(Debug, thiserror::Error)]
pub enum QueueError {
    /// Open, write, fsync or rename failed.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Capacity limits for a [`DurableQueue`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueueOptions {
    /// Maximum number of records kept.
    pub capacity: usize,
    /// Files larger than this are discarded on open.
    pub max_file_bytes: u64,
}

impl Default for QueueOptions {
    fn default() -> Self {
        QueueOptions {
            capacity: MAX_QUEUE_SIZE,
            max_file_bytes: MAX_QUEUE_FILE_BYTES,
        }
    }
}

impl From<&StorageConfig> for QueueOptions {
    fn from(config: &StorageConfig) -> Self {
        QueueOptions {
            capacity: config.max_queue_size,
            max_file_bytes: config.max_file_bytes,
        }
    }
}

/// What [`DurableQueue::open`] found on disk.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenReport {
    /// Valid records found.
    pub records: usize,
    /// Lines that failed to parse.
    pub corrupt_lines: usize,
    /// The file exceeded `max_file_bytes` and was discarded.
    pub recovered_oversized: bool,
    /// Oldest records evicted because the file held more than `capacity`.
    pub trimmed: usize,
}

/// Result of a successful append.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Appended {
    /// At least one old record was evicted to make room.
    pub evicted: bool,
    /// Queue length after the append.
    pub len: usize,
}

/// Bounded, append-only queue of scans persisted as JSONL.
///
/// Safe to share between the capture path and the sync worker: the storage
/// guard serializes file access and the counters are atomic.
#[derive(Debug)]
pub struct DurableQueue {
    /// Path to the queue file.
    path: PathBuf,
    /// Sibling file used while rewriting.
    tmp_path: PathBuf,
    medium: StorageMedium,
    options: QueueOptions,
    /// Cached record count, kept exact under the storage guard.
    len: AtomicUsize,
    evicted: AtomicU64,
    corrupt: AtomicU64,
    /// Corrupt lines still in the file that `corrupt` already includes.
    corrupt_seen: AtomicUsize,
    open_report: OpenReport,
}

/// Records read from the queue file.
#[derive(Default)]
struct Scan {
    records: Vec<ScanEvent>,
    corrupt: usize,
}

impl DurableQueue {
    /// Open the queue at the given path, rebuilding the cached count.
    ///
    /// The file is not created until the first append. A file larger than
    /// `max_file_bytes` is assumed to be the result of interrupted writes and
    /// is deleted. A file holding more records than `capacity` (left by a
    /// larger configured capacity) is trimmed from the head.
    pub fn open(path: &Path, medium: StorageMedium, options: QueueOptions) -> QueueResult<Self> {
        let tmp_path = path.with_extension("tmp");
        let mut report = OpenReport::default();

        let guard_medium = medium.clone();
        let _guard = guard_medium.lock("queue.open");

        remove_if_exists(&tmp_path)?;

        match fs::metadata(path) {
            Ok(meta) if meta.len() > options.max_file_bytes => {
                tracing::warn!(
                    path = %path.display(),
                    size = meta.len(),
                    limit = options.max_file_bytes,
                    "queue file oversized, discarding as corrupt"
                );
                fs::remove_file(path)?;
                report.recovered_oversized = true;
            }
            Ok(_) => {
                let scan = scan_file(path, None, |line, err| {
                    tracing::warn!(line = %preview(line), error = %err, "corrupt queue record");
                })?;
                report.records = scan.records.len();
                report.corrupt_lines = scan.corrupt;
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let mut queue = DurableQueue {
            path: path.to_path_buf(),
            tmp_path,
            medium,
            options,
            len: AtomicUsize::new(report.records),
            evicted: AtomicU64::new(0),
            corrupt: AtomicU64::new(report.corrupt_lines as u64),
            corrupt_seen: AtomicUsize::new(report.corrupt_lines),
            open_report: report,
        };

        let excess = report.records.saturating_sub(options.capacity);
        if excess > 0 {
            let trimmed = queue.remove_front_locked(excess)?;
            queue.evicted.fetch_add(trimmed as u64, Ordering::Relaxed);
            queue.open_report.trimmed = trimmed;
            tracing::warn!(
                trimmed,
                capacity = options.capacity,
                "queue held more records than its capacity, evicted oldest"
            );
        }

        tracing::info!(
            path = %path.display(),
            records = queue.len(),
            corrupt = report.corrupt_lines,
            "queue opened"
        );

        Ok(queue)
    }

    /// Append a scan, evicting the oldest record first if the queue is full.
    ///
    /// The record is fsynced before this returns.
    pub fn append(&self, event: &ScanEvent) -> QueueResult<Appended> {
        let json = serde_json::to_string(event)?;
        let _guard = self.medium.lock("queue.append");

        let mut evicted = false;
        let excess = (self.len.load(Ordering::Acquire) + 1).saturating_sub(self.options.capacity);
        if excess > 0 {
            let removed = self.remove_front_locked(excess)?;
            if removed > 0 {
                evicted = true;
                self.evicted.fetch_add(removed as u64, Ordering::Relaxed);
                tracing::warn!(
                    removed,
                    capacity = self.options.capacity,
                    "queue full, evicted oldest scan"
                );
            }
        }

        let mut file = OpenOptions::new()
            .create(true)
            .read(true)
            .append(true)
            .open(&self.path)?;

        // An interrupted write can leave a fragment without a newline.
        let lead = if has_torn_tail(&mut file)? { "\n" } else { "" };
        file.write_all(format!("{lead}{json}\n").as_bytes())?;
        file.sync_all()?;

        let len = self.len.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(token = event.token_id(), len, "scan queued");

        Ok(Appended { evicted, len })
    }

    /// Read up to `max` records from the head without removing them.
    ///
    /// Corrupt lines are skipped. Each one is counted once, however many
    /// times it is read.
    pub fn read_batch(&self, max: usize) -> QueueResult<Vec<ScanEvent>> {
        if max == 0 {
            return Ok(Vec::new());
        }

        let _guard = self.medium.lock("queue.read_batch");
        let scan = scan_file(&self.path, Some(max), |line, err| {
            tracing::debug!(line = %preview(line), error = %err, "skipping corrupt queue record");
        })?;
        self.note_corrupt(scan.corrupt);
        Ok(scan.records)
    }

    /// Remove the first `count` records.
    ///
    /// Rewrites the remaining records, or deletes the file when `count`
    /// covers the whole queue. Corrupt lines are dropped by the rewrite.
    /// Returns the number of records removed.
    pub fn remove_front(&self, count: usize) -> QueueResult<usize> {
        if count == 0 {
            return Ok(0);
        }
        let _guard = self.medium.lock("queue.remove_front");
        self.remove_front_locked(count)
    }

    /// Delete every queued record.
    pub fn clear(&self) -> QueueResult<()> {
        let _guard = self.medium.lock("queue.clear");
        remove_if_exists(&self.path)?;
        remove_if_exists(&self.tmp_path)?;
        self.len.store(0, Ordering::Release);
        self.corrupt_seen.store(0, Ordering::Release);
        Ok(())
    }

    /// Get the number of queued records.
    pub fn len(&self) -> usize {
        self.len.load(Ordering::Acquire)
    }

    /// Check if the queue is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn capacity(&self) -> usize {
        self.options.capacity
    }

    /// Records evicted by overflow since open.
    pub fn evicted(&self) -> u64 {
        self.evicted.load(Ordering::Relaxed)
    }

    /// Distinct corrupt lines found in the file since open.
    pub fn corrupt_skipped(&self) -> u64 {
        self.corrupt.load(Ordering::Relaxed)
    }

    pub fn open_report(&self) -> OpenReport {
        self.open_report
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove a batch that the orchestrator acknowledged.
    ///
    /// Only removes records that are still at the head: any prefix of
    /// `batch` evicted while the upload was in flight is skipped, so a
    /// scan that was never sent cannot be removed in its place. Returns
    /// the number of records removed.
    pub fn remove_delivered(&self, batch: &[ScanEvent]) -> QueueResult<usize> {
        if batch.is_empty() {
            return Ok(0);
        }
        let _guard = self.medium.lock("queue.remove_delivered");
        let records = self.read_all_locked()?;

        let count = delivered_prefix(batch, &records);
        if count < batch.len() {
            tracing::debug!(
                batch = batch.len(),
                present = count,
                "part of the delivered batch already left the queue"
            );
        }
        self.truncate_front_locked(records, count)
    }

    /// Caller must hold the storage guard.
    fn remove_front_locked(&self, count: usize) -> QueueResult<usize> {
        let records = self.read_all_locked()?;
        self.truncate_front_locked(records, count)
    }

    fn read_all_locked(&self) -> QueueResult<Vec<ScanEvent>> {
        let scan = scan_file(&self.path, None, |line, _| {
            tracing::debug!(line = %preview(line), "dropping corrupt line during rewrite");
        })?;
        self.note_corrupt(scan.corrupt);
        Ok(scan.records)
    }

    /// Count corrupt lines not counted before.
    ///
    /// `seen` is how many corrupt lines a scan from the head met. Corrupt
    /// lines keep their order until a rewrite drops them all and new ones
    /// only appear at the tail, so the first `corrupt_seen` of them are
    /// already counted. Caller must hold the storage guard.
    fn note_corrupt(&self, seen: usize) {
        let counted = self.corrupt_seen.fetch_max(seen, Ordering::AcqRel);
        if seen > counted {
            let fresh = seen - counted;
            self.corrupt.fetch_add(fresh as u64, Ordering::Relaxed);
            tracing::warn!(fresh, "corrupt queue records skipped");
        }
    }

    /// Drop the first `count` of `records` and persist the rest.
    fn truncate_front_locked(&self, records: Vec<ScanEvent>, count: usize) -> QueueResult<usize> {
        let total = records.len();

        if count >= total {
            remove_if_exists(&self.path)?;
            self.len.store(0, Ordering::Release);
            self.corrupt_seen.store(0, Ordering::Release);
            return Ok(total);
        }
        if count == 0 {
            return Ok(0);
        }

        let remaining = &records[count..];
        {
            let mut writer = BufWriter::new(File::create(&self.tmp_path)?);
            for record in remaining {
                serde_json::to_writer(&mut writer, record)?;
                writer.write_all(b"\n")?;
            }
            writer.flush()?;
            writer.get_ref().sync_all()?;
        }
        fs::rename(&self.tmp_path, &self.path)?;

        self.len.store(remaining.len(), Ordering::Release);
        self.corrupt_seen.store(0, Ordering::Release);
        Ok(count)
    }
}

/// Length of the longest suffix of `batch` that `records` starts with.
fn delivered_prefix(batch: &[ScanEvent], records: &[ScanEvent]) -> usize {
    (0..batch.len())
        .map(|skip| &batch[skip..])
        .find(|rest| records.starts_with(rest))
        .map_or(0, <[ScanEvent]>::len)
}

/// Parse records from the queue file, stopping after `limit` valid ones.
///
/// A missing file reads as empty. Lines are split on raw bytes so that
/// invalid UTF-8 is treated as a corrupt record rather than an I/O error.
fn scan_file(
    path: &Path,
    limit: Option<usize>,
    mut on_corrupt: impl FnMut(&[u8], &serde_json::Error),
) -> io::Result<Scan> {
    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Scan::default()),
        Err(e) => return Err(e),
    };

    let mut scan = Scan::default();
    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        let line = line.trim_ascii();
        if line.is_empty() {
            continue;
        }

        match serde_json::from_slice::<ScanEvent>(line) {
            Ok(record) => {
                scan.records.push(record);
                if limit.is_some_and(|max| scan.records.len() >= max) {
                    break;
                }
            }
            Err(err) => {
                scan.corrupt += 1;
                on_corrupt(line, &err);
            }
        }
    }

    Ok(scan)
}

/// Returns true if the file is non-empty and does not end in a newline.
fn has_torn_tail(file: &mut File) -> io::Result<bool> {
    if file.metadata()?.len() == 0 {
        return Ok(false);
    }
    let mut last = [0u8; 1];
    file.seek(SeekFrom::End(-1))?;
    file.read_exact(&mut last)?;
    Ok(last[0] != b'\n')
}

fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

fn preview(line: &[u8]) -> String {
    let text = String::from_utf8_lossy(line);
    if text.chars().count() > PREVIEW_LEN {
        let cut: String = text.chars().take(PREVIEW_LEN).collect();
        format!("{cut}...")
    } else {
        text.into_owned()
    }
}
