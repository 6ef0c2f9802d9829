use crate::error::LogError;

/// Fixed-capacity ring of variable-length entries. The oldest entry is
/// evicted when full.
///
/// The ring never allocates or frees entry storage itself: entries arrive
/// owned, and evicted entries are handed back to the caller. No locking is
/// done here; callers serialize access.
#[derive(Debug)]
pub struct RingLog<E> {
    slots:       Vec<Option<E>>,
    write_index: usize,
    read_index:  usize,
    full:        bool,
}

impl<E> RingLog<E> {
    /// # Panics
    /// If `capacity` is zero.
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        Self {
            slots:       (0..capacity).map(|_| None).collect(),
            write_index: 0,
            read_index:  0,
            full:        false,
        }
    }

    pub fn capacity(&self) -> usize { self.slots.len() }
    pub fn is_full(&self) -> bool { self.full }
    pub fn is_empty(&self) -> bool { !self.full && self.write_index == self.read_index }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        if self.full {
            self.capacity()
        } else {
            (self.write_index + self.capacity() - self.read_index) % self.capacity()
        }
    }

    /// Stores `entry` at the write index. When the ring is full the oldest
    /// entry is removed first and returned.
    pub fn append(&mut self, entry: E) -> Option<E> {
        let cap = self.capacity();
        let evicted = if self.full {
            let oldest = self.slots[self.read_index].take();
            self.read_index = (self.read_index + 1) % cap;
            oldest
        } else {
            None
        };
        self.slots[self.write_index] = Some(entry);
        self.write_index = (self.write_index + 1) % cap;
        self.full = self.write_index == self.read_index;
        evicted
    }

    /// Live entry at `position` in oldest-to-newest order.
    pub fn get(&self, position: usize) -> Option<&E> {
        if position >= self.len() {
            return None;
        }
        self.slots[(self.read_index + position) % self.capacity()].as_ref()
    }

    /// Live entries, oldest first. Visits at most `capacity` slots.
    pub fn iter(&self) -> impl Iterator<Item = &E> + '_ {
        (0..self.len()).filter_map(move |i| self.get(i))
    }

    /// Drops every live entry and returns to the empty state. Returns how
    /// many entries were released.
    pub fn clear(&mut self) -> usize {
        let released = self.len();
        for slot in &mut self.slots {
            *slot = None;
        }
        self.write_index = 0;
        self.read_index = 0;
        self.full = false;
        released
    }
}

// ── Offset translation ────────────────────────────────────────────────

impl<E: AsRef<[u8]>> RingLog<E> {
    pub fn total_live_bytes(&self) -> usize {
        self.iter().map(|e| e.as_ref().len()).sum()
    }

    /// Maps a flat offset to `(entry, offset within entry)`.
    ///
    /// Entry ranges are half-open, so an offset equal to the bytes before an
    /// entry lands on that entry at local offset 0. Zero-length entries never
    /// match.
    pub fn find_by_flat_offset(&self, offset: usize) -> Result<(&E, usize), LogError> {
        let mut cumulative = 0;
        for entry in self.iter() {
            let size = entry.as_ref().len();
            if offset < cumulative + size {
                return Ok((entry, offset - cumulative));
            }
            cumulative += size;
        }
        Err(LogError::OutOfRange { offset, total: cumulative })
    }

    /// Direct addressing: `local` bytes into the live entry at `position`.
    pub fn find_by_index_offset(&self, position: usize, local: usize) -> Result<&E, LogError> {
        let entry = self.get(position).ok_or_else(|| {
            LogError::invalid(format!(
                "entry {} is not live ({} entries held)", position, self.len()
            ))
        })?;
        let size = entry.as_ref().len();
        if local >= size {
            return Err(LogError::invalid(format!(
                "offset {} is past the end of entry {} ({} bytes)", local, position, size
            )));
        }
        Ok(entry)
    }

    /// Flat offset of byte `local` within the live entry at `position`.
    pub fn flat_offset_of(&self, position: usize, local: usize) -> Result<usize, LogError> {
        self.find_by_index_offset(position, local)?;
        let before: usize = self.iter().take(position).map(|e| e.as_ref().len()).sum();
        Ok(before + local)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ring_of(cap: usize, items: &[&str]) -> RingLog<Vec<u8>> {
        let mut ring = RingLog::new(cap);
        for s in items {
            ring.append(s.as_bytes().to_vec());
        }
        ring
    }

    fn contents(ring: &RingLog<Vec<u8>>) -> Vec<String> {
        ring.iter().map(|e| String::from_utf8_lossy(e).into_owned()).collect()
    }

    #[test]
    fn empty_ring() {
        let ring: RingLog<Vec<u8>> = RingLog::new(4);
        assert!(ring.is_empty());
        assert!(!ring.is_full());
        assert_eq!(ring.len(), 0);
        assert_eq!(ring.total_live_bytes(), 0);
        assert!(matches!(ring.find_by_flat_offset(0), Err(LogError::OutOfRange { .. })));
        assert!(matches!(ring.find_by_index_offset(0, 0), Err(LogError::InvalidArgument(_))));
    }

    #[test]
    #[should_panic]
    fn zero_capacity_panics() {
        let _ring: RingLog<Vec<u8>> = RingLog::new(0);
    }

    #[test]
    fn overwrites_oldest_when_full() {
        let mut ring = ring_of(3, &["aaa\n", "bbb\n", "ccc\n"]);
        assert!(ring.is_full());
        let evicted = ring.append(b"ddd\n".to_vec());
        assert_eq!(evicted.as_deref(), Some(&b"aaa\n"[..]));
        assert_eq!(contents(&ring), ["bbb\n", "ccc\n", "ddd\n"]);
        assert!(ring.is_full());
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn flat_offset_scenario() {
        let ring = ring_of(3, &["aaa\n", "bbb\n", "ccc\n", "ddd\n"]);
        let (entry, local) = ring.find_by_flat_offset(4).unwrap();
        assert_eq!(entry.as_slice(), b"ccc\n");
        assert_eq!(local, 0);

        let (entry, local) = ring.find_by_flat_offset(11).unwrap();
        assert_eq!(entry.as_slice(), b"ddd\n");
        assert_eq!(local, 3);

        assert!(matches!(
            ring.find_by_flat_offset(12),
            Err(LogError::OutOfRange { offset: 12, total: 12 })
        ));
    }

    #[test]
    fn evicted_entry_unreachable_by_any_offset() {
        let ring = ring_of(3, &["first\n", "b\n", "c\n", "d\n"]);
        for off in 0..ring.total_live_bytes() {
            let (entry, _) = ring.find_by_flat_offset(off).unwrap();
            assert_ne!(entry.as_slice(), b"first\n");
        }
    }

    #[test]
    fn eviction_ordering_keeps_newest() {
        let n = 5;
        let items: Vec<String> = (1..=n + 2).map(|i| format!("e{}\n", i)).collect();
        let refs: Vec<&str> = items.iter().map(|s| s.as_str()).collect();
        let ring = ring_of(n, &refs);
        assert_eq!(contents(&ring), &items[2..]);
    }

    #[test]
    fn live_count_never_exceeds_capacity() {
        let mut ring = RingLog::new(4);
        for i in 0..50usize {
            ring.append(vec![b'x'; i % 7]);
            assert!(ring.len() <= 4);
            assert_eq!(ring.len(), (i + 1).min(4));
        }
    }

    #[test]
    fn zero_length_entries_take_a_slot_but_no_offsets() {
        let ring = ring_of(3, &["ab", "", "cd"]);
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.total_live_bytes(), 4);
        let (entry, local) = ring.find_by_flat_offset(2).unwrap();
        assert_eq!(entry.as_slice(), b"cd");
        assert_eq!(local, 0);
        assert!(ring.find_by_index_offset(1, 0).is_err());

        // An empty entry still evicts.
        let ring = ring_of(2, &["ab", "cd", ""]);
        assert_eq!(contents(&ring), ["cd", ""]);
    }

    #[test]
    fn total_bytes_matches_walk() {
        let ring = ring_of(4, &["one\n", "three\n", "", "fives\n", "x\n", "yy\n"]);
        let walked: usize = ring.iter().map(|e| e.len()).sum();
        assert_eq!(ring.total_live_bytes(), walked);
    }

    #[test]
    fn index_offset_round_trip() {
        let ring = ring_of(3, &["aaa\n", "bb\n", "c\n", "dddd\n"]);
        for pos in 0..ring.len() {
            let size = ring.get(pos).unwrap().len();
            for local in 0..size {
                let flat = ring.flat_offset_of(pos, local).unwrap();
                let (entry, found_local) = ring.find_by_flat_offset(flat).unwrap();
                assert_eq!(entry, ring.get(pos).unwrap());
                assert_eq!(found_local, local);
            }
        }
    }

    #[test]
    fn index_offset_validation() {
        let ring = ring_of(3, &["aaa\n", "bb\n"]);
        assert_eq!(ring.flat_offset_of(1, 2).unwrap(), 6);
        assert!(matches!(ring.flat_offset_of(1, 3), Err(LogError::InvalidArgument(_))));
        assert!(matches!(ring.flat_offset_of(2, 0), Err(LogError::InvalidArgument(_))));
    }

    #[test]
    fn clear_resets_state() {
        let mut ring = ring_of(2, &["a\n", "b\n", "c\n"]);
        assert_eq!(ring.clear(), 2);
        assert!(ring.is_empty());
        assert_eq!(ring.total_live_bytes(), 0);
        assert!(ring.find_by_index_offset(0, 0).is_err());
        ring.append(b"z\n".to_vec());
        assert_eq!(contents(&ring), ["z\n"]);
    }

    #[test]
    fn full_ring_walk_terminates() {
        let ring = ring_of(3, &["a", "b", "c", "d", "e", "f", "g"]);
        assert_eq!(ring.iter().count(), 3);
        assert!(ring.find_by_flat_offset(100).is_err());
    }
}
