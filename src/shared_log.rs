//! The single lock domain around the ring.
//!
//! Every read copies bytes out while the lock is held, and evicted storage
//! is dropped under the same lock, so no caller ever holds a reference into
//! ring storage. Nothing in here performs I/O.

use crate::error::LogError;
use crate::models::Entry;
use crate::util::RingLog;
use log::trace;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Point-in-time counters for the shared log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LogStats {
    pub entries:    usize,
    pub live_bytes: usize,
    pub capacity:   usize,
    pub appended:   u64,
    pub evicted:    u64,
}

#[derive(Debug)]
struct Inner {
    ring:     RingLog<Entry>,
    appended: u64,
    evicted:  u64,
}

#[derive(Debug)]
pub struct SharedLog {
    inner: Mutex<Inner>,
}

impl SharedLog {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        Self {
            inner: Mutex::new(Inner { ring: RingLog::new(capacity), appended: 0, evicted: 0 }),
        }
    }

    /// A panic elsewhere cannot leave `Inner` half-updated: every mutation
    /// under the lock is a slot swap plus counter bumps. Poison is cleared.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Commits one complete record. `line` must end with `\n`.
    pub fn append_line(&self, line: Vec<u8>) -> Result<(), LogError> {
        if line.last() != Some(&b'\n') {
            return Err(LogError::invalid("record is not newline-terminated"));
        }
        let entry = Entry::new(line);
        let mut inner = self.lock();
        if let Some(old) = inner.ring.append(entry) {
            inner.evicted += 1;
            trace!("evicted {} byte entry", old.len());
        }
        inner.appended += 1;
        Ok(())
    }

    /// Copies up to `max_bytes` starting at `flat_offset`, never crossing
    /// into the next entry. An empty result means there is no more data.
    pub fn read_at(&self, flat_offset: usize, max_bytes: usize) -> Result<Vec<u8>, LogError> {
        let inner = self.lock();
        let (entry, local) = match inner.ring.find_by_flat_offset(flat_offset) {
            Ok(found) => found,
            Err(LogError::OutOfRange { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };
        let available = &entry.as_bytes()[local..];
        let n = available.len().min(max_bytes);
        Ok(Entry::copy_from(&available[..n])?.into_bytes())
    }

    /// Every live entry concatenated oldest to newest.
    pub fn read_all(&self) -> Result<Vec<u8>, LogError> {
        let inner = self.lock();
        let total = inner.ring.total_live_bytes();
        let mut out = Vec::new();
        out.try_reserve_exact(total)
            .map_err(|_| LogError::ResourceExhausted { requested: total })?;
        for entry in inner.ring.iter() {
            out.extend_from_slice(entry.as_bytes());
        }
        Ok(out)
    }

    /// Flat offset of byte `local_offset` in the live entry at `entry_index`
    /// (0 = oldest).
    pub fn seek_to_entry(&self, entry_index: usize, local_offset: usize) -> Result<usize, LogError> {
        self.lock().ring.flat_offset_of(entry_index, local_offset)
    }

    pub fn total_live_bytes(&self) -> Result<usize, LogError> {
        Ok(self.lock().ring.total_live_bytes())
    }

    /// Releases every entry. Returns how many were dropped.
    pub fn reset(&self) -> Result<usize, LogError> {
        Ok(self.lock().ring.clear())
    }

    pub fn stats(&self) -> Result<LogStats, LogError> {
        let inner = self.lock();
        Ok(LogStats {
            entries:    inner.ring.len(),
            live_bytes: inner.ring.total_live_bytes(),
            capacity:   inner.ring.capacity(),
            appended:   inner.appended,
            evicted:    inner.evicted,
        })
    }
}
