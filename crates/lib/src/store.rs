//! The top-level facade: [`Db`] owns a [`BufferedStore`] and hands out
//! [`Transaction`]s; a `Transaction` hands out [`View`]s.
//!
//! Grounded in `eidetica::transaction`'s resource-guard shape: a transaction
//! is consumed by [`Transaction::commit`] and aborts itself on `Drop` if
//! never resolved, the same "you cannot forget to close this" pattern.
//! Unlike `eidetica`, there is exactly one transaction live at a time here
//! (`spec.md` §5: single-writer, no concurrent transactions), so `Db` simply
//! refuses to open a second one rather than queuing or interleaving them.

use std::cell::RefCell;
use std::path::Path;
use std::rc::Rc;

use tracing::{info, warn};

use crate::buffer::BufferedStore;
use crate::engine::memory::MemoryEngine;
#[cfg(feature = "fjall")]
use crate::engine::fjall::{FjallEngine, FjallOptions};
use crate::engine::KvEngine;
use crate::error::{Error, Result};
use crate::path::PathBuf;
use crate::view::{View, ViewKind};

/// Knobs for opening a durable [`Db`], mirroring the underlying engine's
/// resource options.
#[cfg(feature = "fjall")]
#[derive(Debug, Clone, Copy, Default)]
pub struct OpenOptions {
    engine: FjallOptions,
}

#[cfg(feature = "fjall")]
impl OpenOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn max_journal_bytes(mut self, bytes: u64) -> Self {
        self.engine.max_journal_bytes = bytes;
        self
    }

    pub fn max_write_buffer_bytes(mut self, bytes: u64) -> Self {
        self.engine.max_write_buffer_bytes = bytes;
        self
    }

    pub fn cache_bytes(mut self, bytes: u64) -> Self {
        self.engine.cache_bytes = bytes;
        self
    }

    pub fn open(self, path: impl AsRef<Path>) -> Result<Db<FjallEngine>> {
        let engine = FjallEngine::open_with_options(path, self.engine).map_err(Error::Engine)?;
        Ok(Db::from_engine(engine))
    }
}

/// The persistent object-graph store.
///
/// `Db` is single-threaded and single-writer by construction (`spec.md` §5):
/// it is not `Sync`, and [`Self::begin`] refuses to start a second
/// transaction while one is already open.
pub struct Db<E> {
    store: Rc<RefCell<BufferedStore<E>>>,
    busy: RefCell<bool>,
}

impl<E: KvEngine> Db<E> {
    fn from_engine(engine: E) -> Self {
        Self {
            store: Rc::new(RefCell::new(BufferedStore::new(engine))),
            busy: RefCell::new(false),
        }
    }

    /// Starts a new transaction. Fails if one is already open, or if the
    /// store was previously marked corrupted (`spec.md` §7).
    pub fn begin(&self) -> Result<Transaction<'_, E>> {
        if self.store.borrow().is_corrupted() {
            return Err(Error::ReadOnlyAfterCorruption);
        }
        let mut busy = self.busy.borrow_mut();
        if *busy {
            return Err(Error::TransactionInProgress);
        }
        *busy = true;
        info!("transaction begin");
        Ok(Transaction {
            db: self,
            store: self.store.clone(),
            resolved: false,
        })
    }

    /// Runs `body` inside a transaction, committing on `Ok` and aborting on
    /// `Err` or panic — the block-form convenience most callers want instead
    /// of manually pairing `begin`/`commit`.
    pub fn transact<T>(&self, body: impl FnOnce(&Transaction<'_, E>) -> Result<T>) -> Result<T> {
        let txn = self.begin()?;
        match body(&txn) {
            Ok(value) => {
                txn.commit()?;
                Ok(value)
            }
            Err(e) => {
                txn.abort();
                Err(e)
            }
        }
    }

    pub fn is_corrupted(&self) -> bool {
        self.store.borrow().is_corrupted()
    }
}

impl Db<MemoryEngine> {
    /// Opens an ephemeral, in-process store backed by [`MemoryEngine`].
    pub fn open_in_memory() -> Self {
        Self::from_engine(MemoryEngine::new())
    }
}

#[cfg(feature = "fjall")]
impl Db<FjallEngine> {
    /// Opens (or creates) a durable store at `path` with default options.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        OpenOptions::new().open(path)
    }
}

/// A resource-guard handle on the single in-flight write transaction.
///
/// Must be resolved with [`Self::commit`] or [`Self::abort`]; dropping it
/// unresolved aborts automatically and logs a warning, since that always
/// indicates an early return or panic rather than a deliberate abort.
pub struct Transaction<'db, E> {
    db: &'db Db<E>,
    store: Rc<RefCell<BufferedStore<E>>>,
    resolved: bool,
}

impl<'db, E: KvEngine> Transaction<'db, E> {
    /// The object or array at the root of the graph, auto-vivified as an
    /// object on first write if the store is empty (`spec.md` §6).
    pub fn root(&self) -> View<E> {
        View::new(self.store.clone(), PathBuf::root(), ViewKind::Object)
    }

    /// The root, addressed as an array instead of an object. Only one of
    /// the two kinds can actually exist at a time; using the wrong one
    /// surfaces as [`Error::TypeMismatch`] on first access.
    pub fn root_array(&self) -> View<E> {
        View::new(self.store.clone(), PathBuf::root(), ViewKind::Array)
    }

    /// Atomically and durably applies every write made through this
    /// transaction's views.
    pub fn commit(mut self) -> Result<()> {
        let result = self.store.borrow_mut().commit();
        if let Err(e) = &result {
            if e.is_corruption() {
                self.store.borrow_mut().mark_corrupted();
            }
        }
        self.resolved = true;
        info!("transaction commit");
        result
    }

    /// Discards every write made through this transaction's views.
    pub fn abort(mut self) {
        self.store.borrow_mut().abort();
        self.resolved = true;
        info!("transaction abort");
    }
}

impl<'db, E> Drop for Transaction<'db, E> {
    fn drop(&mut self) {
        *self.db.busy.borrow_mut() = false;
        if !self.resolved {
            warn!("transaction dropped without commit or abort; aborting");
        }
    }
}
