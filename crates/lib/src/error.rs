//! Error taxonomy for the store.
//!
//! Every Graph View operation surfaces one of the seven structured kinds
//! below to its caller; none are retried internally (propagation policy,
//! `spec.md` §7). The shape follows `eidetica::store::StoreError`: a single
//! `thiserror` enum with named fields per variant, plus `is_*()` predicates
//! for callers that want to branch on error category without a full match.

use crate::path::PathBuf;
use thiserror::Error;

/// The result type used throughout this crate.
pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// A path step requested by the caller does not exist.
    #[error("missing key: {path} has no child {step:?}")]
    MissingKey { path: PathBuf, step: String },

    /// A container of one kind was required but the stored marker is the
    /// other kind (indexing an object with an integer, appending to an
    /// object, etc).
    #[error("type mismatch at {path}: expected {expected}, found {actual}")]
    TypeMismatch {
        path: PathBuf,
        expected: &'static str,
        actual: &'static str,
    },

    /// An array index was `>= length` on read, or `> length` on write.
    #[error("out of range at {path}: index {index} (length {length})")]
    OutOfRange {
        path: PathBuf,
        index: u64,
        length: u64,
    },

    /// An assigned value fell outside the JSON algebra (e.g. a non-finite
    /// number).
    #[error("invalid value at {path}: {reason}")]
    InvalidValue { path: PathBuf, reason: String },

    /// A view's underlying path was removed by a sibling operation and a
    /// subsequent access was attempted.
    #[error("stale view: {path} no longer exists")]
    StaleView { path: PathBuf },

    /// A stored record failed to decode, a container marker was missing
    /// with orphan descendants present, or a length marker disagreed with
    /// observed children.
    #[error("corruption at {path}: {reason}")]
    Corruption { path: PathBuf, reason: String },

    /// Corruption was previously detected on this store; it is read-only
    /// until an explicit repair is applied (not part of this crate).
    #[error("store is read-only after a prior corruption error")]
    ReadOnlyAfterCorruption,

    /// A second transaction was started while one was already open
    /// (`spec.md` §5: single-writer, one transaction at a time).
    #[error("a transaction is already open on this store")]
    TransactionInProgress,

    /// The underlying KV engine failed.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
}

impl Error {
    pub fn is_missing_key(&self) -> bool {
        matches!(self, Error::MissingKey { .. })
    }

    pub fn is_type_mismatch(&self) -> bool {
        matches!(self, Error::TypeMismatch { .. })
    }

    pub fn is_corruption(&self) -> bool {
        matches!(self, Error::Corruption { .. } | Error::ReadOnlyAfterCorruption)
    }

    pub fn is_stale_view(&self) -> bool {
        matches!(self, Error::StaleView { .. })
    }

    pub fn is_transaction_in_progress(&self) -> bool {
        matches!(self, Error::TransactionInProgress)
    }

    /// The path associated with this error, when it has one.
    pub fn path(&self) -> Option<&PathBuf> {
        match self {
            Error::MissingKey { path, .. }
            | Error::TypeMismatch { path, .. }
            | Error::OutOfRange { path, .. }
            | Error::InvalidValue { path, .. }
            | Error::StaleView { path }
            | Error::Corruption { path, .. } => Some(path),
            Error::ReadOnlyAfterCorruption | Error::TransactionInProgress | Error::Engine(_) => None,
        }
    }
}

/// Errors surfaced by a [`crate::engine::KvEngine`] implementation.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "fjall")]
    #[error("fjall storage error: {0}")]
    Fjall(#[from] fjall::Error),

    #[error("{0}")]
    Other(String),
}
