//! The Buffered Store: an in-memory write-buffer overlay on a [`KvEngine`]
//! with read-your-writes semantics, range tombstones, and atomic commit
//! (`spec.md` §4.3).

use std::collections::BTreeMap;

use tracing::{debug, trace};

use crate::engine::KvEngine;
use crate::error::{EngineError, Error, Result};

#[derive(Debug, Clone)]
enum PendingEntry {
    Write(Vec<u8>),
    Tombstone,
}

/// A write-buffer overlay over a [`KvEngine`].
///
/// State is exactly `spec.md` §4.3's `pending: key -> (value | tombstone)`
/// plus a small ordered collection of range-tombstone intervals. There is
/// one `BufferedStore` per open [`crate::Db`]; [`crate::Transaction`] is a
/// scope around it, not a second buffer — this store enforces single-writer
/// semantics the same way, by being the sole owner of `pending`.
pub struct BufferedStore<E> {
    engine: E,
    pending: BTreeMap<Vec<u8>, PendingEntry>,
    /// Sorted, non-overlapping half-open `[lo, hi)` intervals.
    range_tombstones: Vec<(Vec<u8>, Vec<u8>)>,
    /// Set once a `Corruption` error is observed; every subsequent mutating
    /// call is refused until an explicit repair (`spec.md` §7 — not part of
    /// this crate) clears it.
    corrupted: bool,
}

impl<E: KvEngine> BufferedStore<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            pending: BTreeMap::new(),
            range_tombstones: Vec::new(),
            corrupted: false,
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.corrupted
    }

    pub fn mark_corrupted(&mut self) {
        self.corrupted = true;
    }

    fn check_writable(&self) -> Result<()> {
        if self.corrupted {
            Err(Error::ReadOnlyAfterCorruption)
        } else {
            Ok(())
        }
    }

    /// Returns the covering tombstone range for `key`, if any.
    fn covered_by_tombstone(&self, key: &[u8]) -> bool {
        covers(&self.range_tombstones, key)
    }

    pub fn read(&self, key: &[u8]) -> Result<Option<Vec<u8>>> {
        if let Some(entry) = self.pending.get(key) {
            return Ok(match entry {
                PendingEntry::Write(v) => Some(v.clone()),
                PendingEntry::Tombstone => None,
            });
        }
        if self.covered_by_tombstone(key) {
            return Ok(None);
        }
        self.engine.get(key).map_err(Error::Engine)
    }

    pub fn write(&mut self, key: Vec<u8>, value: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        trace!(key = ?String::from_utf8_lossy(&key), "buffer write");
        self.pending.insert(key, PendingEntry::Write(value));
        Ok(())
    }

    pub fn erase(&mut self, key: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        trace!(key = ?String::from_utf8_lossy(&key), "buffer erase");
        self.pending.insert(key, PendingEntry::Tombstone);
        Ok(())
    }

    /// Shadows every key in `[lo, hi)` until commit — both those already
    /// committed in the engine and any pending entries recorded so far.
    /// A write landing inside this range afterwards still wins (it is
    /// recorded as its own pending entry, consulted before the tombstone
    /// list in both [`Self::read`] and [`Self::scan`]).
    pub fn erase_range(&mut self, lo: Vec<u8>, hi: Vec<u8>) -> Result<()> {
        self.check_writable()?;
        trace!(
            lo = ?String::from_utf8_lossy(&lo),
            hi = ?String::from_utf8_lossy(&hi),
            "buffer erase_range"
        );
        self.pending
            .retain(|k, _| !(k.as_slice() >= lo.as_slice() && k.as_slice() < hi.as_slice()));
        insert_tombstone(&mut self.range_tombstones, lo, hi);
        Ok(())
    }

    /// Merge-iterates the engine's range with pending writes/tombstones,
    /// yielding a single ascending, duplicate-free sequence. This is a
    /// snapshot at call time (`spec.md` §5): the whole `[lo, hi)` span is
    /// merged into an owned map up front, so the returned iterator holds no
    /// borrow of `self` and a caller can keep consuming it across many
    /// decoding steps without re-running the merge for each one.
    pub fn scan(
        &self,
        lo: Vec<u8>,
        hi: Vec<u8>,
    ) -> Result<Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>>>> {
        let mut merged: BTreeMap<Vec<u8>, Vec<u8>> = BTreeMap::new();
        for item in self.engine.range(&lo, &hi).map_err(Error::Engine)? {
            let (key, value) = item.map_err(Error::Engine)?;
            if !self.covered_by_tombstone(&key) {
                merged.insert(key, value);
            }
        }
        for (key, entry) in self.pending.range(lo..hi) {
            match entry {
                PendingEntry::Write(value) => {
                    merged.insert(key.clone(), value.clone());
                }
                PendingEntry::Tombstone => {
                    merged.remove(key);
                }
            }
        }
        Ok(Box::new(merged.into_iter().map(Ok)))
    }

    /// Flushes every pending write and tombstone (including range
    /// tombstones, expanded against the engine's current contents) into the
    /// engine in ascending key order, then calls the engine's commit.
    pub fn commit(&mut self) -> Result<()> {
        self.check_writable()?;
        debug!(
            writes = self.pending.len(),
            tombstone_ranges = self.range_tombstones.len(),
            "buffer commit"
        );
        for (lo, hi) in std::mem::take(&mut self.range_tombstones) {
            let keys: Vec<Vec<u8>> = self
                .engine
                .range(&lo, &hi)
                .map_err(Error::Engine)?
                .map(|item| item.map(|(k, _)| k))
                .collect::<std::result::Result<_, EngineError>>()
                .map_err(Error::Engine)?;
            for key in keys {
                self.engine.delete(&key).map_err(Error::Engine)?;
            }
        }
        for (key, entry) in std::mem::take(&mut self.pending) {
            match entry {
                PendingEntry::Write(value) => self.engine.put(&key, &value).map_err(Error::Engine)?,
                PendingEntry::Tombstone => self.engine.delete(&key).map_err(Error::Engine)?,
            }
        }
        self.engine.commit().map_err(Error::Engine)
    }

    /// Discards all pending state; no engine call is required since nothing
    /// was ever written to it.
    pub fn abort(&mut self) {
        debug!("buffer abort");
        self.pending.clear();
        self.range_tombstones.clear();
        let _ = self.engine.rollback();
    }
}

fn covers(tombstones: &[(Vec<u8>, Vec<u8>)], key: &[u8]) -> bool {
    match tombstones.binary_search_by(|(lo, _)| lo.as_slice().cmp(key)) {
        Ok(_) => true,
        Err(idx) => idx > 0 && {
            let (_, hi) = &tombstones[idx - 1];
            key < hi.as_slice()
        },
    }
}

/// Inserts `[lo, hi)` into a sorted, non-overlapping interval list,
/// coalescing with any interval it touches or overlaps.
fn insert_tombstone(tombstones: &mut Vec<(Vec<u8>, Vec<u8>)>, lo: Vec<u8>, hi: Vec<u8>) {
    let mut merged_lo = lo;
    let mut merged_hi = hi;
    tombstones.retain(|(t_lo, t_hi)| {
        if t_hi.as_slice() < merged_lo.as_slice() || t_lo.as_slice() > merged_hi.as_slice() {
            true
        } else {
            if t_lo < &merged_lo {
                merged_lo = t_lo.clone();
            }
            if t_hi > &merged_hi {
                merged_hi = t_hi.clone();
            }
            false
        }
    });
    let pos = tombstones
        .binary_search_by(|(t_lo, _)| t_lo.cmp(&merged_lo))
        .unwrap_or_else(|idx| idx);
    tombstones.insert(pos, (merged_lo, merged_hi));
}
