//! `pathdb` is a single-process, single-writer, persistent JSON object-graph
//! store.
//!
//! A [`Db`] opens a store over a pluggable ordered key-value [`engine`]. Each
//! [`Transaction`] hands out [`View`]s — live object/array proxies rooted at
//! [`Transaction::root`] — through which callers read and write nested JSON
//! data. Every path under the root is addressed by an order-preserving byte
//! encoding (the [`codec`] module) so that a container's entire subtree is
//! always a contiguous key range, letting deletes and scans touch exactly
//! the records they need to.
//!
//! ```
//! use pathdb::Db;
//!
//! let db = Db::open_in_memory();
//! db.transact(|txn| {
//!     let root = txn.root();
//!     root.set("name", "ferris")?;
//!     root.set("tags", Vec::<pathdb::Value>::new())?;
//!     root.get("tags")?.into_view().unwrap().append("rust")?;
//!     Ok(())
//! })?;
//! # Ok::<(), pathdb::Error>(())
//! ```

pub mod buffer;
pub mod codec;
pub mod engine;
pub mod error;
pub mod path;
pub mod store;
pub mod value;
pub mod view;

pub use engine::memory::MemoryEngine;
#[cfg(feature = "fjall")]
pub use engine::fjall::{FjallEngine, FjallOptions};
pub use engine::KvEngine;
pub use error::{Error, Result};
pub use path::{PathBuf, Step};
#[cfg(feature = "fjall")]
pub use store::OpenOptions;
pub use store::{Db, Transaction};
pub use value::Value;
pub use view::{Child, View, ViewKind};
