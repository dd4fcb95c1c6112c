//! An in-process ordered key-value engine backed by a `BTreeMap`.
//!
//! Grounded in `eidetica::backend::in_memory::InMemoryBackend`'s
//! lock-guarded map style: suitable for tests, development, and ephemeral
//! stores where persistence is handled externally (or not needed at all).
//! Writes here are immediately visible to readers (there is nothing to
//! durably flush), so `commit`/`rollback` are no-ops — the buffering and
//! abort semantics the spec requires live one layer up, in
//! [`crate::buffer::BufferedStore`].

use std::collections::BTreeMap;
use std::sync::RwLock;

use tracing::trace;

use crate::engine::{KvEngine, RangeItem};
use crate::error::EngineError;

/// An in-memory [`KvEngine`] implementation.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    map: RwLock<BTreeMap<Vec<u8>, Vec<u8>>>,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvEngine for MemoryEngine {
    fn get(&self, key: &[u8]) -> Result<Option<Vec<u8>>, EngineError> {
        Ok(self.map.read().unwrap().get(key).cloned())
    }

    fn put(&self, key: &[u8], value: &[u8]) -> Result<(), EngineError> {
        trace!(key = ?String::from_utf8_lossy(key), "memory engine put");
        self.map.write().unwrap().insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    fn delete(&self, key: &[u8]) -> Result<(), EngineError> {
        trace!(key = ?String::from_utf8_lossy(key), "memory engine delete");
        self.map.write().unwrap().remove(key);
        Ok(())
    }

    fn range<'a>(
        &'a self,
        lo: &[u8],
        hi: &[u8],
    ) -> Result<Box<dyn Iterator<Item = RangeItem> + 'a>, EngineError> {
        let snapshot: Vec<(Vec<u8>, Vec<u8>)> = self
            .map
            .read()
            .unwrap()
            .range(lo.to_vec()..hi.to_vec())
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        Ok(Box::new(snapshot.into_iter().map(Ok)))
    }

    fn commit(&self) -> Result<(), EngineError> {
        Ok(())
    }

    fn rollback(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn range_is_half_open_and_ascending() {
        let engine = MemoryEngine::new();
        for k in [b"a".to_vec(), b"b".to_vec(), b"c".to_vec()] {
            engine.put(&k, b"v").unwrap();
        }
        let got: Vec<_> = engine
            .range(b"a", b"c")
            .unwrap()
            .map(|r| r.unwrap().0)
            .collect();
        assert_eq!(got, vec![b"a".to_vec(), b"b".to_vec()]);
    }

    #[test]
    fn delete_is_a_no_op_when_absent() {
        let engine = MemoryEngine::new();
        assert!(engine.delete(b"missing").is_ok());
    }
}
