//! The KV Engine Adapter contract (`spec.md` §4.1).
//!
//! This is the one external collaborator the core is written against rather
//! than implementing: an ordered byte-string key-value store with
//! transactional commit/rollback and prefix/range scans. The rest of the
//! crate (codec aside, which needs no storage) is written once against
//! [`KvEngine`], the same way `eidetica`'s core is written against
//! `BackendImpl` regardless of which concrete backend is plugged in.

pub mod memory;

#[cfg(feature = "fjall")]
pub mod fjall;

use crate::error::EngineError;

/// A single entry produced by [`KvEngine::range`].
pub type RangeItem = Result<(Vec<u8>, Vec<u8>), EngineError>;

/// An ordered byte-string key-value store with transactional commit.
///
/// Implementations are assumed single-writer (`spec.md` §4.1, §5); the core
/// places no concurrency demands on them beyond that.
pub trait KvEngine: Send + Sync {
    /// Looks up `key`, returning `None` if absent.
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError>;

    /// Upserts `key` to `value`.
    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError>;

    /// Deletes `key`. A no-op if absent.
    fn delete(&self, key: &[u8]) -> Result<(), EngineError>;

    /// Produces entries with `lo <= key < hi` in ascending key order.
    fn range<'a>(
        &'a self,
        lo: &[u8],
        hi: &[u8],
    ) -> Result<Box<dyn Iterator<Item = RangeItem> + 'a>, EngineError>;

    /// Atomically and durably commits every `put`/`delete` issued since the
    /// last `commit`/`rollback`.
    fn commit(&self) -> Result<(), EngineError>;

    /// Discards every `put`/`delete` issued since the last `commit`/
    /// `rollback` without making them visible.
    fn rollback(&self) -> Result<(), EngineError>;
}
