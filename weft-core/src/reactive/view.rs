//! Reactive Views
//!
//! A [`ReactiveObject`] is the explicit accessor object over a raw object.
//! Every accessor dispatches to the view's handler set, which tracks reads
//! and triggers on writes. Views are created and cached by the registry;
//! there is at most one live view of each kind per raw object.

use std::fmt;
use std::sync::{Arc, Weak};

use super::handlers::{handlers_for, ProxyHandler, WriteOutcome};
use super::registry;
use crate::error::Result;
use crate::value::{ObjectId, PropertyKey, RawObject, Shape, Value};

/// Kind of a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ViewKind {
    Mutable,
    ReadOnly,
}

struct ViewInner {
    raw: RawObject,
    kind: ViewKind,
    handler: &'static dyn ProxyHandler,
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        registry::release_view(self.raw.id(), self.kind);
    }
}

/// A mutable or read-only reactive view over a [`RawObject`].
///
/// Cloning shares the view. Two views are equal only if they are the same
/// view.
#[derive(Clone)]
pub struct ReactiveObject(Arc<ViewInner>);

impl ReactiveObject {
    /// Only the registry creates views.
    pub(crate) fn new(raw: RawObject, kind: ViewKind) -> Self {
        let handler = handlers_for(raw.shape(), kind);
        Self(Arc::new(ViewInner { raw, kind, handler }))
    }

    /// Read a property. Tracked when called inside an effect.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Option<Value> {
        self.0.handler.get(&self.0.raw, &key.into())
    }

    /// Write a property, notifying subscribers if it was added or changed.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> Result<WriteOutcome> {
        self.0
            .handler
            .set(&self.0.raw, key.into(), value.into(), &self.0.raw)
    }

    /// Remove a property, notifying subscribers if it existed.
    pub fn delete(&self, key: impl Into<PropertyKey>) -> Result<WriteOutcome> {
        self.0.handler.delete_property(&self.0.raw, &key.into())
    }

    pub fn has(&self, key: impl Into<PropertyKey>) -> bool {
        self.0.handler.has(&self.0.raw, &key.into())
    }

    /// Own keys. Tracks the structure of the object.
    pub fn keys(&self) -> Vec<PropertyKey> {
        self.0.handler.own_keys(&self.0.raw)
    }

    /// Number of entries, or the length of a sequence. Tracks the structure
    /// of the object.
    pub fn len(&self) -> usize {
        self.0.handler.size(&self.0.raw)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove every entry. Collections only.
    pub fn clear(&self) -> Result<WriteOutcome> {
        self.0.handler.clear(&self.0.raw)
    }

    /// The raw object behind the view.
    pub fn raw(&self) -> &RawObject {
        &self.0.raw
    }

    pub fn kind(&self) -> ViewKind {
        self.0.kind
    }

    pub fn is_readonly(&self) -> bool {
        self.0.kind == ViewKind::ReadOnly
    }

    /// Identity of the raw object behind the view.
    pub fn id(&self) -> ObjectId {
        self.0.raw.id()
    }

    pub fn shape(&self) -> Shape {
        self.0.raw.shape()
    }

    pub fn ptr_eq(&self, other: &ReactiveObject) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn handler(&self) -> &'static dyn ProxyHandler {
        self.0.handler
    }

    pub(crate) fn downgrade(&self) -> WeakView {
        WeakView(Arc::downgrade(&self.0))
    }
}

impl PartialEq for ReactiveObject {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for ReactiveObject {}

impl fmt::Debug for ReactiveObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveObject")
            .field("id", &self.id())
            .field("kind", &self.kind())
            .field("shape", &self.shape())
            .finish()
    }
}

/// Registry-side handle that does not keep a view alive.
#[derive(Clone)]
pub(crate) struct WeakView(Weak<ViewInner>);

impl WeakView {
    pub(crate) fn upgrade(&self) -> Option<ReactiveObject> {
        self.0.upgrade().map(ReactiveObject)
    }

    pub(crate) fn is_dead(&self) -> bool {
        self.0.strong_count() == 0
    }
}
