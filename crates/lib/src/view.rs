//! The Graph View: live object/array proxies over a [`BufferedStore`]
//! (`spec.md` §4.4).
//!
//! A [`View`] is `(store, path, kind)` exactly as `spec.md` §9 describes it:
//! a shared, interior-mutable back-reference plus a path, never an owning
//! snapshot. Construction never reads data; every operation below resolves
//! against the store on demand, the same way `eidetica::store::DocStore`
//! resolves against its `Transaction` on every call rather than caching.

use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

use indexmap::IndexMap;
use tracing::{debug, trace};

use crate::buffer::BufferedStore;
use crate::codec::{self, DirectKind, Kind};
use crate::engine::KvEngine;
use crate::error::{Error, Result};
use crate::path::{PathBuf, Step};
use crate::value::Value;

/// Which kind of container a [`View`] is rooted at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewKind {
    Object,
    Array,
}

impl ViewKind {
    fn name(self) -> &'static str {
        match self {
            ViewKind::Object => "object",
            ViewKind::Array => "array",
        }
    }

    fn other(self) -> ViewKind {
        match self {
            ViewKind::Object => ViewKind::Array,
            ViewKind::Array => ViewKind::Object,
        }
    }

    fn codec_kind(self) -> Kind {
        match self {
            ViewKind::Object => Kind::Object,
            ViewKind::Array => Kind::Array,
        }
    }
}

/// What [`View::get`] and iteration yield for a direct child: either a
/// scalar value, or a live view onto a nested container.
pub enum Child<E> {
    Scalar(Value),
    View(View<E>),
}

impl<E: KvEngine> Child<E> {
    pub fn as_scalar(&self) -> Option<&Value> {
        match self {
            Child::Scalar(v) => Some(v),
            Child::View(_) => None,
        }
    }

    pub fn into_view(self) -> Option<View<E>> {
        match self {
            Child::View(v) => Some(v),
            Child::Scalar(_) => None,
        }
    }

    /// Materializes this child into an owned [`Value`], recursively copying
    /// a nested container's current contents (`spec.md` §9's aliasing note:
    /// a view's contents can always be copied out independent of the live
    /// handle).
    pub fn to_value(self) -> Result<Value> {
        match self {
            Child::Scalar(v) => Ok(v),
            Child::View(view) => view.to_value(),
        }
    }
}

/// A live handle onto an object or array container at a given path.
///
/// Cloning a `View` is cheap (it shares the underlying store via `Rc`) and
/// produces another handle to the *same* live location, not a copy of its
/// contents.
pub struct View<E> {
    pub(crate) inner: Rc<RefCell<BufferedStore<E>>>,
    path: PathBuf,
    kind: ViewKind,
}

impl<E> Clone for View<E> {
    fn clone(&self) -> Self {
        Self {
            inner: self.inner.clone(),
            path: self.path.clone(),
            kind: self.kind,
        }
    }
}

impl<E> fmt::Debug for View<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("View")
            .field("path", &self.path)
            .field("kind", &self.kind.name())
            .finish()
    }
}

impl<E: KvEngine> View<E> {
    pub(crate) fn new(inner: Rc<RefCell<BufferedStore<E>>>, path: PathBuf, kind: ViewKind) -> Self {
        Self { inner, path, kind }
    }

    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    pub fn kind(&self) -> ViewKind {
        self.kind
    }

    fn marker_payload(&self, kind: ViewKind) -> Result<Option<Vec<u8>>> {
        let key = codec::encode(&self.path, kind.codec_kind());
        self.inner.borrow().read(&key)
    }

    /// Checks that this view's container still exists as the kind it was
    /// constructed with. Every read-shaped operation calls this first so
    /// that a container removed by a sibling operation surfaces as a
    /// [`Error::StaleView`] (or, for the root, a "missing root" read)
    /// rather than silently returning empty results.
    fn ensure_live_for_read(&self) -> Result<()> {
        if self.marker_payload(self.kind)?.is_some() {
            return Ok(());
        }
        if self.marker_payload(self.kind.other())?.is_some() {
            return Err(Error::TypeMismatch {
                path: self.path.clone(),
                expected: self.kind.name(),
                actual: self.kind.other().name(),
            });
        }
        if self.path.is_root() {
            Err(Error::MissingKey {
                path: self.path.clone(),
                step: "<root>".to_string(),
            })
        } else {
            Err(Error::StaleView {
                path: self.path.clone(),
            })
        }
    }

    /// Like [`Self::ensure_live_for_read`], but auto-vivifies the root
    /// container on first write (`spec.md` §6: "created on first write if
    /// absent"). Non-root containers are never auto-created here — they
    /// only come into existence as a side effect of [`Self::set`] on their
    /// parent.
    fn ensure_container_for_write(&self) -> Result<()> {
        if self.marker_payload(self.kind)?.is_some() {
            return Ok(());
        }
        if self.marker_payload(self.kind.other())?.is_some() {
            return Err(Error::TypeMismatch {
                path: self.path.clone(),
                expected: self.kind.name(),
                actual: self.kind.other().name(),
            });
        }
        if !self.path.is_root() {
            return Err(Error::StaleView {
                path: self.path.clone(),
            });
        }
        let key = codec::encode(&self.path, self.kind.codec_kind());
        let payload = match self.kind {
            ViewKind::Object => Vec::new(),
            ViewKind::Array => b"0".to_vec(),
        };
        self.inner.borrow_mut().write(key, payload)?;
        trace!(path = %self.path, kind = self.kind.name(), "auto-vivified root container");
        Ok(())
    }

    /// Builds a [`Error::Corruption`] for `reason` at `path` and flips this
    /// store's read-only-after-corruption flag, so every subsequent
    /// mutating call (checked in [`BufferedStore::write`] et al.) is
    /// refused until an external repair clears it.
    fn corrupted(&self, path: PathBuf, reason: impl Into<String>) -> Error {
        self.inner.borrow_mut().mark_corrupted();
        codec::corruption(path, reason)
    }

    fn check_step_kind(&self, step: &Step) -> Result<()> {
        match (self.kind, step) {
            (ViewKind::Object, Step::Key(_)) | (ViewKind::Array, Step::Index(_)) => Ok(()),
            (ViewKind::Object, Step::Index(_)) => Err(Error::TypeMismatch {
                path: self.path.clone(),
                expected: "object key",
                actual: "array index",
            }),
            (ViewKind::Array, Step::Key(_)) => Err(Error::TypeMismatch {
                path: self.path.clone(),
                expected: "array index",
                actual: "object key",
            }),
        }
    }

    fn read_marker(&self, path: &PathBuf, kind: ViewKind) -> Result<Option<Vec<u8>>> {
        let key = codec::encode(path, kind.codec_kind());
        self.inner.borrow().read(&key)
    }

    fn array_length(&self) -> Result<u64> {
        let payload = self
            .marker_payload(ViewKind::Array)?
            .ok_or_else(|| Error::StaleView {
                path: self.path.clone(),
            })?;
        let text = String::from_utf8(payload)
            .map_err(|_| self.corrupted(self.path.clone(), "array length marker is not UTF-8"))?;
        text.parse::<u64>().map_err(|_| {
            self.corrupted(
                self.path.clone(),
                format!("array length marker {text:?} is not a valid integer"),
            )
        })
    }

    fn write_length(&self, new_len: u64) -> Result<()> {
        let key = codec::encode(&self.path, Kind::Array);
        self.inner.borrow_mut().write(key, new_len.to_string().into_bytes())
    }

    /// Removes whatever currently lives at `child_path` — scalar, object
    /// subtree, or array subtree — leaving no record behind. Used both by
    /// [`Self::set`]'s overwrite step and by [`Self::delete`].
    fn clear_child(&self, child_path: &PathBuf) -> Result<()> {
        if self.read_marker(child_path, ViewKind::Object)?.is_some() {
            let (lo, hi) = codec::container_range(child_path, Kind::Object);
            self.inner.borrow_mut().erase_range(lo, hi)?;
        }
        if self.read_marker(child_path, ViewKind::Array)?.is_some() {
            let (lo, hi) = codec::container_range(child_path, Kind::Array);
            self.inner.borrow_mut().erase_range(lo, hi)?;
        }
        let scalar_key = codec::encode(child_path, Kind::Scalar);
        if self.inner.borrow().read(&scalar_key)?.is_some() {
            self.inner.borrow_mut().erase(scalar_key)?;
        }
        Ok(())
    }

    /// Deep-copies `value` into `path`, recursively, per the assignment
    /// protocol's steps 2-4.
    fn deep_assign(&self, path: &PathBuf, value: &Value) -> Result<()> {
        match value {
            Value::Object(map) => {
                let marker = codec::encode(path, Kind::Object);
                self.inner.borrow_mut().write(marker, Vec::new())?;
                for (key, child) in map {
                    self.deep_assign(&path.child(key.clone()), child)?;
                }
            }
            Value::Array(items) => {
                let marker = codec::encode(path, Kind::Array);
                self.inner
                    .borrow_mut()
                    .write(marker, items.len().to_string().into_bytes())?;
                for (i, child) in items.iter().enumerate() {
                    self.deep_assign(&path.child(i as u64), child)?;
                }
            }
            scalar => {
                let key = codec::encode(path, Kind::Scalar);
                self.inner.borrow_mut().write(key, scalar.encode_scalar().into_bytes())?;
            }
        }
        Ok(())
    }

    /// The number of direct children: an `O(1)` marker read for an array,
    /// an `O(children)` scan for an object (`spec.md` §4.4).
    pub fn length(&self) -> Result<u64> {
        self.ensure_live_for_read()?;
        match self.kind {
            ViewKind::Array => self.array_length(),
            ViewKind::Object => {
                let mut count = 0u64;
                for entry in self.iterate()? {
                    entry?;
                    count += 1;
                }
                Ok(count)
            }
        }
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.length()? == 0)
    }

    /// Whether a direct child exists at `step`.
    pub fn contains(&self, step: impl Into<Step>) -> Result<bool> {
        self.ensure_live_for_read()?;
        let step = step.into();
        self.check_step_kind(&step)?;
        match (self.kind, &step) {
            (ViewKind::Array, Step::Index(i)) => Ok(*i < self.array_length()?),
            (ViewKind::Object, Step::Key(_)) => {
                let child = self.path.child(step);
                Ok(self.read_marker(&child, ViewKind::Object)?.is_some()
                    || self.read_marker(&child, ViewKind::Array)?.is_some()
                    || self
                        .inner
                        .borrow()
                        .read(&codec::encode(&child, Kind::Scalar))?
                        .is_some())
            }
            _ => unreachable!("check_step_kind already rejected mismatched steps"),
        }
    }

    /// Reads the child at `step`: a scalar value, or a live view onto a
    /// nested container. Fails with [`Error::MissingKey`] if absent, or
    /// [`Error::OutOfRange`] for an array index `>= length`.
    pub fn get(&self, step: impl Into<Step>) -> Result<Child<E>> {
        self.ensure_live_for_read()?;
        let step = step.into();
        self.check_step_kind(&step)?;
        if let (ViewKind::Array, Step::Index(idx)) = (self.kind, &step) {
            let length = self.array_length()?;
            if *idx >= length {
                return Err(Error::OutOfRange {
                    path: self.path.clone(),
                    index: *idx,
                    length,
                });
            }
        }
        let child_path = self.path.child(step.clone());
        if self.read_marker(&child_path, ViewKind::Object)?.is_some() {
            return Ok(Child::View(View::new(self.inner.clone(), child_path, ViewKind::Object)));
        }
        if self.read_marker(&child_path, ViewKind::Array)?.is_some() {
            return Ok(Child::View(View::new(self.inner.clone(), child_path, ViewKind::Array)));
        }
        let scalar_key = codec::encode(&child_path, Kind::Scalar);
        if let Some(payload) = self.inner.borrow().read(&scalar_key)? {
            let text = String::from_utf8(payload)
                .map_err(|_| self.corrupted(child_path.clone(), "scalar payload is not UTF-8"))?;
            let value = Value::decode_scalar(&text).ok_or_else(|| {
                self.corrupted(child_path.clone(), format!("malformed scalar payload {text:?}"))
            })?;
            return Ok(Child::Scalar(value));
        }
        Err(Error::MissingKey {
            path: self.path.clone(),
            step: step.to_string(),
        })
    }

    /// The assignment protocol (`spec.md` §4.4): overwrites whatever is at
    /// `step` with `value`, deep-copying containers.
    pub fn set(&self, step: impl Into<Step>, value: impl Into<Value>) -> Result<()> {
        self.ensure_container_for_write()?;
        let step = step.into();
        self.check_step_kind(&step)?;

        let mut grows_to = None;
        if let Step::Index(idx) = &step {
            let length = self.array_length()?;
            if *idx > length {
                return Err(Error::OutOfRange {
                    path: self.path.clone(),
                    index: *idx,
                    length,
                });
            }
            if *idx == length {
                grows_to = Some(length + 1);
            }
        }

        let value = value.into();
        if !value.is_valid() {
            return Err(Error::InvalidValue {
                path: self.path.child(step),
                reason: "value contains a non-finite number".to_string(),
            });
        }

        let child_path = self.path.child(step);
        self.clear_child(&child_path)?;
        self.deep_assign(&child_path, &value)?;
        if let Some(new_len) = grows_to {
            self.write_length(new_len)?;
        }
        debug!(path = %child_path, "view set");
        Ok(())
    }

    /// Appends `value` as the new last element of an array view.
    pub fn append(&self, value: impl Into<Value>) -> Result<()> {
        if self.kind != ViewKind::Array {
            return Err(Error::TypeMismatch {
                path: self.path.clone(),
                expected: "array",
                actual: self.kind.name(),
            });
        }
        self.ensure_container_for_write()?;
        let length = self.array_length()?;
        self.set(length, value)
    }

    /// Inserts `value` at `index`, shifting `index..length` up by one
    /// (`spec.md` §4.4's array mutation policy: this rewrites the tail).
    pub fn insert(&self, index: u64, value: impl Into<Value>) -> Result<()> {
        if self.kind != ViewKind::Array {
            return Err(Error::TypeMismatch {
                path: self.path.clone(),
                expected: "array",
                actual: self.kind.name(),
            });
        }
        self.ensure_container_for_write()?;
        let length = self.array_length()?;
        if index > length {
            return Err(Error::OutOfRange {
                path: self.path.clone(),
                index,
                length,
            });
        }
        let value = value.into();
        if !value.is_valid() {
            return Err(Error::InvalidValue {
                path: self.path.child(index),
                reason: "value contains a non-finite number".to_string(),
            });
        }
        self.set(length, Value::Null)?;
        for idx in (index..length).rev() {
            let moved = self.get(idx)?.to_value()?;
            self.set(idx + 1, moved)?;
        }
        self.set(index, value)
    }

    /// Deletes the child at `step`. For an array, shifts `step+1..length`
    /// down by one and shrinks the length marker.
    pub fn delete(&self, step: impl Into<Step>) -> Result<()> {
        self.ensure_live_for_read()?;
        let step = step.into();
        self.check_step_kind(&step)?;
        let child_path = self.path.child(step.clone());
        if !self.contains(step.clone())? {
            return Err(Error::MissingKey {
                path: self.path.clone(),
                step: step.to_string(),
            });
        }
        self.clear_child(&child_path)?;
        if let Step::Index(removed) = step {
            self.shift_tail_after_delete(removed)?;
        }
        debug!(path = %child_path, "view delete");
        Ok(())
    }

    fn shift_tail_after_delete(&self, removed_index: u64) -> Result<()> {
        let length = self.array_length()?;
        for idx in (removed_index + 1)..length {
            let moved = self.get(idx)?.to_value()?;
            self.set(idx - 1, moved)?;
        }
        if length > 0 {
            let top_path = self.path.child(length - 1);
            self.clear_child(&top_path)?;
        }
        self.write_length(length.saturating_sub(1))
    }

    /// Recursively materializes this view's current contents into an owned
    /// [`Value`] (supplemented feature, `SPEC_FULL.md` §9).
    pub fn to_value(&self) -> Result<Value> {
        self.ensure_live_for_read()?;
        match self.kind {
            ViewKind::Object => {
                let mut map = IndexMap::new();
                for entry in self.iterate()? {
                    let (step, child) = entry?;
                    let key = step
                        .as_key()
                        .expect("object iteration always yields key steps")
                        .to_string();
                    map.insert(key, child.to_value()?);
                }
                Ok(Value::Object(map))
            }
            ViewKind::Array => {
                let mut items = Vec::new();
                for entry in self.iterate()? {
                    let (_, child) = entry?;
                    items.push(child.to_value()?);
                }
                Ok(Value::Array(items))
            }
        }
    }

    /// A lazy sequence of `(step, child)` pairs: insertion-independent
    /// codec order for an object, ascending numeric index order for an
    /// array (`spec.md` §4.4).
    pub fn iterate(&self) -> Result<ViewIter<'_, E>> {
        self.ensure_live_for_read()?;
        match self.kind {
            ViewKind::Object => {
                let (lo, hi) = codec::container_range(&self.path, Kind::Object);
                // `lo` is the container's own marker key (the smallest key
                // in the range); start just past it so the first record
                // `next()` sees is the first direct child, not the marker.
                let start = codec::immediate_successor(&lo);
                let scan = self.inner.borrow().scan(start, hi)?;
                Ok(ViewIter::Object(ObjectIter {
                    view: self,
                    scan: scan.peekable(),
                    done: false,
                }))
            }
            ViewKind::Array => Ok(ViewIter::Array(ArrayIter {
                view: self,
                idx: 0,
                length: self.array_length()?,
            })),
        }
    }
}

/// Iterator returned by [`View::iterate`].
pub enum ViewIter<'a, E: KvEngine> {
    Object(ObjectIter<'a, E>),
    Array(ArrayIter<'a, E>),
}

impl<'a, E: KvEngine> Iterator for ViewIter<'a, E> {
    type Item = Result<(Step, Child<E>)>;

    fn next(&mut self) -> Option<Self::Item> {
        match self {
            ViewIter::Object(it) => it.next(),
            ViewIter::Array(it) => it.next(),
        }
    }
}

/// Walks an object's direct children over a single underlying range scan,
/// skipping past a container child's nested descendants (via
/// [`codec::container_range`]'s upper bound) instead of visiting every
/// descendant record, and without re-running the scan per child.
pub struct ObjectIter<'a, E> {
    view: &'a View<E>,
    scan: std::iter::Peekable<Box<dyn Iterator<Item = Result<(Vec<u8>, Vec<u8>)>>>>,
    done: bool,
}

impl<'a, E: KvEngine> ObjectIter<'a, E> {
    /// Discards every remaining record whose key is strictly less than
    /// `hi`, i.e. everything still inside a child container's subtree.
    fn skip_past(&mut self, hi: &[u8]) {
        while matches!(self.scan.peek(), Some(Ok((key, _))) if key.as_slice() < hi) {
            self.scan.next();
        }
    }
}

impl<'a, E: KvEngine> Iterator for ObjectIter<'a, E> {
    type Item = Result<(Step, Child<E>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let (key, payload) = match self.scan.next() {
            None => {
                self.done = true;
                return None;
            }
            Some(Ok(kv)) => kv,
            Some(Err(e)) => {
                self.done = true;
                return Some(Err(e));
            }
        };

        let Some((step, remainder)) = codec::decode_child(&self.view.path, &key) else {
            self.done = true;
            return Some(Err(self
                .view
                .corrupted(self.view.path.clone(), "unparseable record under object")));
        };
        let Step::Key(name) = step else {
            self.done = true;
            return Some(Err(self.view.corrupted(
                self.view.path.clone(),
                "array-shaped step found directly under an object",
            )));
        };
        let child_path = self.view.path.child(name.clone());

        match codec::classify_direct(remainder) {
            Some(DirectKind::Scalar) => {
                let text = match String::from_utf8(payload) {
                    Ok(t) => t,
                    Err(_) => {
                        self.done = true;
                        return Some(Err(self.view.corrupted(child_path, "scalar payload is not UTF-8")));
                    }
                };
                match Value::decode_scalar(&text) {
                    Some(v) => Some(Ok((Step::Key(name), Child::Scalar(v)))),
                    None => {
                        self.done = true;
                        Some(Err(self
                            .view
                            .corrupted(child_path, format!("malformed scalar payload {text:?}"))))
                    }
                }
            }
            Some(DirectKind::Object) => {
                let (_, child_hi) = codec::container_range(&child_path, Kind::Object);
                self.skip_past(&child_hi);
                Some(Ok((
                    Step::Key(name),
                    Child::View(View::new(self.view.inner.clone(), child_path, ViewKind::Object)),
                )))
            }
            Some(DirectKind::Array) => {
                let (_, child_hi) = codec::container_range(&child_path, Kind::Array);
                self.skip_past(&child_hi);
                Some(Ok((
                    Step::Key(name),
                    Child::View(View::new(self.view.inner.clone(), child_path, ViewKind::Array)),
                )))
            }
            None => {
                self.done = true;
                Some(Err(self
                    .view
                    .corrupted(child_path, "orphan descendant record with no container marker")))
            }
        }
    }
}

/// Walks an array's elements by direct index lookup, `0..length`.
pub struct ArrayIter<'a, E> {
    view: &'a View<E>,
    idx: u64,
    length: u64,
}

impl<'a, E: KvEngine> Iterator for ArrayIter<'a, E> {
    type Item = Result<(Step, Child<E>)>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.idx >= self.length {
            return None;
        }
        let idx = self.idx;
        self.idx += 1;
        Some(self.view.get(idx).map(|child| (Step::Index(idx), child)))
    }
}
