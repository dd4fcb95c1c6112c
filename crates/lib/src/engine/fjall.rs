//! A durable [`KvEngine`] over `fjall`, an ordered LSM key-value store.
//!
//! Grounded in the retrieval pack's own fjall-backed store
//! (`pragmaxim-com-blockchain-benches`'s `storages/fjall/src/store.rs`):
//! a single `fjall::Keyspace`/`fjall::Partition` pair, `insert`/`get`/`range`
//! for reads and point writes, and an `fjall::Batch` for atomic multi-key
//! commit. Reads always go straight to the partition — nothing issued via
//! `put`/`delete` here is visible to `get`/`range` until `commit()` calls
//! `Batch::commit`, which matches how this type is used: the only caller is
//! [`crate::buffer::BufferedStore::commit`], which never reads back a key it
//! just wrote via this adapter in the same flush.

use std::path::Path;
use std::sync::Mutex;

use fjall::{Batch, Config, Keyspace, PartitionCreateOptions, PersistMode};
use tracing::debug;

use crate::engine::{KvEngine, RangeItem};
use crate::error::EngineError;

/// Resource knobs for the `fjall` adapter, mirroring the pack's own
/// `FjallOptions` (cache size, journal size, worker counts).
#[derive(Debug, Clone, Copy)]
pub struct FjallOptions {
    pub max_journal_bytes: u64,
    pub max_write_buffer_bytes: u64,
    pub cache_bytes: u64,
}

impl Default for FjallOptions {
    fn default() -> Self {
        Self {
            max_journal_bytes: 256 * 1024 * 1024,
            max_write_buffer_bytes: 64 * 1024 * 1024,
            cache_bytes: 64 * 1024 * 1024,
        }
    }
}

pub struct FjallEngine {
    keyspace: Keyspace,
    partition: fjall::Partition,
    pending: Mutex<Option<Batch>>,
}

impl FjallEngine {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, EngineError> {
        Self::open_with_options(path, FjallOptions::default())
    }

    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: FjallOptions,
    ) -> Result<Self, EngineError> {
        let keyspace = Config::new(path.as_ref())
            .max_journaling_size(options.max_journal_bytes)
            .max_write_buffer_size(options.max_write_buffer_bytes)
            .cache_size(options.cache_bytes)
            .open()?;
        let partition =
            keyspace.open_partition("graph", PartitionCreateOptions::default())?;
        Ok(Self {
            keyspace,
            partition,
            pending: Mutex::new(None),
        })
    }

    fn with_batch<T>(&self, f: impl FnOnce(&mut Batch) -> T) -> T {
        let mut guard = self.pending.lock().unwrap();
        let batch = guard.get_or_insert_with(|| self.keyspace.batch());
        f(batch)
    }
}

impl KvEngine for FjallEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.partition.get(key)?.map(|slice| slice.to_vec()))
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        self.with_batch(|batch| batch.insert(&self.partition, key, value));
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), EngineError> {
        self.with_batch(|batch| batch.remove(&self.partition, key));
        Ok(())
    }

    fn range<'a>(
        &'a self,
        lo: &[u8],
        hi: &[u8],
    ) -> Result<Box<dyn Iterator<Item = RangeItem> + 'a>, EngineError> {
        let iter = self
            .partition
            .range(lo.to_vec()..hi.to_vec())
            .map(|entry| -> RangeItem {
                let (k, v) = entry?;
                Ok((k.to_vec(), v.to_vec()))
            });
        Ok(Box::new(iter))
    }

    fn commit(&self) -> Result<(), EngineError> {
        let batch = self.pending.lock().unwrap().take();
        if let Some(batch) = batch {
            batch.commit()?;
        }
        debug!("fjall engine commit");
        self.keyspace.persist(PersistMode::SyncAll)?;
        Ok(())
    }

    fn rollback(&self) -> Result<(), EngineError> {
        // Dropping the batch without committing discards everything staged
        // in it; nothing durable was ever written.
        self.pending.lock().unwrap().take();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_commit_is_visible_after_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let engine = FjallEngine::open(dir.path()).unwrap();
            engine.put(b".\"x\"=", b"1").unwrap();
            engine.commit().unwrap();
        }
        let engine = FjallEngine::open(dir.path()).unwrap();
        assert_eq!(engine.get(b".\"x\"=").unwrap(), Some(b"1".to_vec()));
    }

    #[test]
    fn rollback_discards_uncommitted_writes() {
        let dir = tempfile::tempdir().unwrap();
        let engine = FjallEngine::open(dir.path()).unwrap();
        engine.put(b".\"x\"=", b"1").unwrap();
        engine.rollback().unwrap();
        assert_eq!(engine.get(b".\"x\"=").unwrap(), None);
    }
}
