//! Raw Objects
//!
//! A [`RawObject`] is the caller-owned composite the reactive core observes.
//! The methods here are the plain, untracked data layer: they read and write
//! storage directly and never notify anyone. Views route through them after
//! doing their tracking and triggering.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;

use super::{PropertyKey, Value};
use crate::error::{ReactivityError, Result};
use crate::graph;

/// Stable identity token for anything the dependency graph can key on.
///
/// Raw objects and value cells each mint one at construction. Registries
/// key on this token instead of on addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for ObjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Runtime shape of a composite. Selects the interception handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Shape {
    /// Named properties, optionally with a prototype.
    Record,
    /// Indexed elements plus `length`.
    Sequence,
    /// Map-like keyed container.
    Collection,
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Shape::Record => "record",
            Shape::Sequence => "sequence",
            Shape::Collection => "collection",
        })
    }
}

/// Largest sequence length. Indices run up to `MAX_LENGTH - 1`.
pub const MAX_LENGTH: usize = u32::MAX as usize;

#[derive(Debug)]
enum Storage {
    /// Records and collections.
    Keyed(IndexMap<PropertyKey, Value>),
    Indexed(Slots),
}

/// Sparse sequence storage. Indices below `len` with no entry are holes.
#[derive(Debug, Default)]
struct Slots {
    values: BTreeMap<usize, Value>,
    len: usize,
}

impl Slots {
    fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(&index)
    }

    fn set(&mut self, index: usize, value: Value) -> Option<Value> {
        self.len = self.len.max(index + 1);
        self.values.insert(index, value)
    }

    /// Drops every element at or past `len`.
    fn resize(&mut self, len: usize) {
        if len < self.len {
            drop(self.values.split_off(&len));
        }
        self.len = len;
    }
}

struct ObjectInner {
    id: ObjectId,
    shape: Shape,
    data: RwLock<Storage>,
    prototype: Option<Value>,
    non_reactive: AtomicBool,
    readonly: AtomicBool,
    framework_internal: AtomicBool,
}

impl Drop for ObjectInner {
    fn drop(&mut self) {
        graph::release_target(self.id);
    }
}

/// A shared handle to a caller-owned composite.
///
/// Cloning the handle shares the same object; the engine never copies
/// object contents.
#[derive(Clone)]
pub struct RawObject(Arc<ObjectInner>);

impl RawObject {
    fn with_storage(shape: Shape, storage: Storage, prototype: Option<Value>) -> Self {
        Self(Arc::new(ObjectInner {
            id: ObjectId::new(),
            shape,
            data: RwLock::new(storage),
            prototype,
            non_reactive: AtomicBool::new(false),
            readonly: AtomicBool::new(false),
            framework_internal: AtomicBool::new(false),
        }))
    }

    /// An empty record.
    pub fn record() -> Self {
        Self::with_storage(Shape::Record, Storage::Keyed(IndexMap::new()), None)
    }

    /// An empty record whose missing properties resolve through `prototype`.
    ///
    /// The prototype may be raw or a view; reads through a view prototype are
    /// tracked on the prototype as well.
    pub fn record_with_prototype(prototype: impl Into<Value>) -> Self {
        Self::with_storage(
            Shape::Record,
            Storage::Keyed(IndexMap::new()),
            Some(prototype.into()),
        )
    }

    /// An empty sequence.
    pub fn sequence() -> Self {
        Self::with_storage(Shape::Sequence, Storage::Indexed(Slots::default()), None)
    }

    /// An empty map-like collection.
    pub fn collection() -> Self {
        Self::with_storage(Shape::Collection, Storage::Keyed(IndexMap::new()), None)
    }

    /// A record populated from key/value pairs.
    pub fn from_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into().normalized(Shape::Record), v.into()))
            .collect();
        Self::with_storage(Shape::Record, Storage::Keyed(map), None)
    }

    /// A sequence populated from values.
    pub fn from_values<V, I>(values: I) -> Self
    where
        V: Into<Value>,
        I: IntoIterator<Item = V>,
    {
        let values: BTreeMap<usize, Value> = values
            .into_iter()
            .map(Into::into)
            .enumerate()
            .collect();
        let len = values.len();
        Self::with_storage(Shape::Sequence, Storage::Indexed(Slots { values, len }), None)
    }

    /// A collection populated from key/value pairs.
    pub fn collection_from_entries<K, V, I>(entries: I) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let map = entries
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::with_storage(Shape::Collection, Storage::Keyed(map), None)
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    pub fn shape(&self) -> Shape {
        self.0.shape
    }

    pub fn prototype(&self) -> Option<&Value> {
        self.0.prototype.as_ref()
    }

    pub fn ptr_eq(&self, other: &RawObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    // ------------------------------------------------------------------------
    // Marks
    // ------------------------------------------------------------------------

    pub(crate) fn mark_non_reactive(&self) {
        self.0.non_reactive.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_marked_non_reactive(&self) -> bool {
        self.0.non_reactive.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_readonly(&self) {
        self.0.readonly.store(true, Ordering::SeqCst);
    }

    pub(crate) fn is_marked_readonly(&self) -> bool {
        self.0.readonly.load(Ordering::SeqCst)
    }

    /// Flag the object as a framework-internal node. Such objects are never
    /// wrapped.
    pub fn mark_framework_internal(&self) {
        self.0.framework_internal.store(true, Ordering::SeqCst);
    }

    pub fn is_framework_internal(&self) -> bool {
        self.0.framework_internal.load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Untracked data access
    // ------------------------------------------------------------------------

    /// Own property value, if present.
    pub fn get_own(&self, key: &PropertyKey) -> Option<Value> {
        let key = key.clone().normalized(self.shape());
        match &*self.0.data.read() {
            Storage::Keyed(map) => map.get(&key).cloned(),
            Storage::Indexed(items) => match key {
                PropertyKey::Index(i) => items.get(i).cloned(),
                key if key.is_length() => Some(Value::Int(items.len as i64)),
                _ => None,
            },
        }
    }

    pub fn has_own(&self, key: &PropertyKey) -> bool {
        let key = key.clone().normalized(self.shape());
        match &*self.0.data.read() {
            Storage::Keyed(map) => map.contains_key(&key),
            Storage::Indexed(items) => match key {
                PropertyKey::Index(i) => items.get(i).is_some(),
                key => key.is_length(),
            },
        }
    }

    /// Value of `key` on this object or its prototype chain, without tracking.
    pub fn lookup(&self, key: &PropertyKey) -> Option<Value> {
        if let Some(value) = self.get_own(key) {
            return Some(value);
        }
        self.raw_prototype().and_then(|proto| proto.lookup(key))
    }

    /// Whether `key` exists on this object or its prototype chain.
    pub fn has_in_chain(&self, key: &PropertyKey) -> bool {
        self.has_own(key)
            || self
                .raw_prototype()
                .is_some_and(|proto| proto.has_in_chain(key))
    }

    fn raw_prototype(&self) -> Option<RawObject> {
        match self.prototype()? {
            Value::Object(raw) => Some(raw.clone()),
            Value::Reactive(view) => Some(view.raw().clone()),
            _ => None,
        }
    }

    /// Store `value` under `key`, returning the previous own value.
    ///
    /// On sequences, writing past the end extends the sequence with holes,
    /// and writing `length` truncates or extends it. Indices at or past
    /// [`MAX_LENGTH`] and lengths above it are rejected.
    pub fn insert(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<Option<Value>> {
        let key = key.into().normalized(self.shape());
        let value = value.into();
        match &mut *self.0.data.write() {
            Storage::Keyed(map) => Ok(map.insert(key, value)),
            Storage::Indexed(items) => match key {
                PropertyKey::Index(i) if i < MAX_LENGTH => Ok(items.set(i, value)),
                key if key.is_length() => {
                    let new_len = match value {
                        Value::Int(n) if (0..=MAX_LENGTH as i64).contains(&n) => n as usize,
                        other => return Err(ReactivityError::InvalidLength(format!("{other:?}"))),
                    };
                    let old_len = items.len;
                    items.resize(new_len);
                    Ok(Some(Value::Int(old_len as i64)))
                }
                key => Err(ReactivityError::InvalidKey {
                    key,
                    shape: Shape::Sequence,
                }),
            },
        }
    }

    /// Remove an own property, returning its value if it existed.
    ///
    /// Removing a sequence element leaves a hole; the length is unchanged.
    pub fn remove(&self, key: &PropertyKey) -> Result<Option<Value>> {
        let key = key.clone().normalized(self.shape());
        match &mut *self.0.data.write() {
            Storage::Keyed(map) => Ok(map.shift_remove(&key)),
            Storage::Indexed(items) => match key {
                PropertyKey::Index(i) => Ok(items.values.remove(&i)),
                key => Err(ReactivityError::InvalidKey {
                    key,
                    shape: Shape::Sequence,
                }),
            },
        }
    }

    /// Own keys in insertion order. Sequences list present indices, then `length`.
    pub fn keys(&self) -> Vec<PropertyKey> {
        match &*self.0.data.read() {
            Storage::Keyed(map) => map.keys().cloned().collect(),
            Storage::Indexed(items) => items
                .values
                .keys()
                .map(|&i| PropertyKey::Index(i))
                .chain(std::iter::once(PropertyKey::length()))
                .collect(),
        }
    }

    /// Entry count for keyed storage, length for sequences.
    pub fn len(&self) -> usize {
        match &*self.0.data.read() {
            Storage::Keyed(map) => map.len(),
            Storage::Indexed(items) => items.len,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry of a collection. Returns whether anything was removed.
    pub fn clear(&self) -> Result<bool> {
        if self.shape() != Shape::Collection {
            return Err(ReactivityError::Unsupported {
                operation: "clear",
                shape: self.shape(),
            });
        }
        let removed = match &mut *self.0.data.write() {
            Storage::Keyed(map) => std::mem::take(map),
            Storage::Indexed(_) => IndexMap::new(),
        };
        Ok(!removed.is_empty())
    }

    /// Build a raw object graph from a JSON literal.
    pub fn from_json(json: serde_json::Value) -> Result<Self> {
        match Value::from(json) {
            Value::Object(raw) => Ok(raw),
            other => Err(ReactivityError::NotComposite(other.type_name())),
        }
    }
}

impl PartialEq for RawObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for RawObject {}

impl fmt::Debug for RawObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RawObject")
            .field("id", &self.id())
            .field("shape", &self.shape())
            .field("len", &self.len())
            .finish()
    }
}
