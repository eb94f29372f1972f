//! Value Cell Implementation
//!
//! A [`Ref`] is a single reactive value. It reuses the track and trigger
//! protocol with the cell itself as the target and the empty key as the only
//! property.
//!
//! # How Cells Work
//!
//! 1. Reading a cell inside an effect subscribes the effect to the cell.
//!
//! 2. Writing a cell always notifies its subscribers, even when the new
//!    value equals the old one.
//!
//! 3. Composite values written into a cell are stored as their mutable view,
//!    so nested reads through the cell are reactive as well.
//!
//! Cells produced by [`to_refs`] hold no value of their own. They read and
//! write one property of an object, and any reactivity comes from that
//! object's view.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::warn;

use super::context::untracked;
use super::operations::{OperationKind, TriggerInfo};
use super::registry::{is_reactive, reactive};
use super::trigger::{track, trigger, Trackable};
use crate::error::Result;
use crate::graph;
use crate::value::{ObjectId, PropertyKey, Shape, Value};

enum Source {
    Owned(RwLock<Value>),
    Property { object: Value, key: PropertyKey },
}

struct RefInner {
    id: ObjectId,
    source: Source,
}

impl Drop for RefInner {
    fn drop(&mut self) {
        graph::release_target(self.id);
    }
}

/// A reactive cell holding one value.
///
/// # Example
///
/// ```rust,ignore
/// let count = Ref::new(0);
///
/// // Read the value
/// let value = count.get();
///
/// // Update the value (notifies subscribers)
/// count.set(5)?;
/// ```
#[derive(Clone)]
pub struct Ref(Arc<RefInner>);

/// Composites are stored as their mutable view.
fn convert(value: Value) -> Value {
    if value.is_composite() {
        reactive(value)
    } else {
        value
    }
}

impl Ref {
    /// Create a cell. Passing a cell returns that cell.
    pub fn new(value: impl Into<Value>) -> Self {
        match value.into() {
            Value::Ref(cell) => cell,
            value => Self(Arc::new(RefInner {
                id: ObjectId::new(),
                source: Source::Owned(RwLock::new(convert(value))),
            })),
        }
    }

    fn property(object: Value, key: PropertyKey) -> Self {
        Self(Arc::new(RefInner {
            id: ObjectId::new(),
            source: Source::Property { object, key },
        }))
    }

    pub fn id(&self) -> ObjectId {
        self.0.id
    }

    /// Read the value, subscribing the running effect.
    pub fn get(&self) -> Value {
        match &self.0.source {
            Source::Owned(value) => {
                track(self, OperationKind::Get, Some(&PropertyKey::empty()));
                value.read().clone()
            }
            Source::Property { object, key } => match object {
                Value::Reactive(view) => view.get(key),
                Value::Object(raw) => raw.get_own(key),
                _ => None,
            }
            .unwrap_or_default(),
        }
    }

    /// Read the value without subscribing.
    pub fn get_untracked(&self) -> Value {
        match &self.0.source {
            Source::Owned(value) => value.read().clone(),
            Source::Property { .. } => untracked(|| self.get()),
        }
    }

    /// Replace the value and notify subscribers.
    pub fn set(&self, value: impl Into<Value>) -> Result<()> {
        match &self.0.source {
            Source::Owned(slot) => {
                let new_value = convert(value.into());
                let old_value = std::mem::replace(&mut *slot.write(), new_value.clone());
                trigger(
                    self,
                    OperationKind::Set,
                    Some(&PropertyKey::empty()),
                    Some(TriggerInfo::new(Some(old_value), Some(new_value))),
                );
                Ok(())
            }
            Source::Property { object, key } => {
                match object {
                    Value::Reactive(view) => {
                        view.set(key, value)?;
                    }
                    Value::Object(raw) => {
                        raw.insert(key, value)?;
                    }
                    _ => {}
                }
                Ok(())
            }
        }
    }

    /// Set the value computed from the current one.
    pub fn update<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&Value) -> Value,
    {
        let new_value = f(&self.get_untracked());
        self.set(new_value)
    }

    pub fn ptr_eq(&self, other: &Ref) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Trackable for Ref {
    fn target_id(&self) -> ObjectId {
        self.id()
    }
}

impl PartialEq for Ref {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Ref {}

impl fmt::Debug for Ref {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Ref");
        s.field("id", &self.id());
        match &self.0.source {
            Source::Owned(value) => s.field("value", &*value.read()),
            Source::Property { key, .. } => s.field("property", key),
        };
        s.finish()
    }
}

/// Whether the value is a cell.
pub fn is_ref(value: &Value) -> bool {
    value.is_ref()
}

/// One cell per own property of `object`, each reading and writing that
/// property.
///
/// Sequences yield their elements only. Anything that is not a composite
/// yields no cells.
pub fn to_refs(object: &Value) -> IndexMap<PropertyKey, Ref> {
    if cfg!(debug_assertions) && !is_reactive(object) {
        warn!("to_refs() expects a reactive object but received a plain one");
    }
    let raw = match object {
        Value::Object(raw) => raw,
        Value::Reactive(view) => view.raw(),
        _ => return IndexMap::new(),
    };
    raw.keys()
        .into_iter()
        .filter(|key| !(raw.shape() == Shape::Sequence && key.is_length()))
        .map(|key| (key.clone(), Ref::property(object.clone(), key)))
        .collect()
}
