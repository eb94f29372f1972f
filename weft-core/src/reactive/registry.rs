//! Identity Registry
//!
//! Maps raw objects to their views and back, and decides what may be
//! wrapped.
//!
//! # How Wrapping Works
//!
//! Each raw object has at most one live mutable view and one live read-only
//! view. The registry holds both weakly, keyed by the raw object's
//! [`ObjectId`]; a view removes its own entry when it is dropped. The way
//! back, view to raw, needs no table since every view holds its raw object.
//!
//! Wrapping a value follows these rules, in order:
//!
//! 1. `reactive` on a read-only view returns it unchanged, and `reactive` on
//!    a raw object marked read-only gives its read-only view. `readonly` on a
//!    mutable view starts from the view's raw object.
//! 2. Non-composite values are returned unchanged, with a warning in debug
//!    builds.
//! 3. Objects marked non-reactive and framework-internal nodes are returned
//!    unchanged.
//! 4. A view that already has the requested kind is returned as is, and a
//!    live cached view is reused.
//! 5. Otherwise a new view is created over the handler set for the object's
//!    shape, and the object gets an empty entry in the dependency graph.

use std::sync::OnceLock;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::{trace, warn};

use super::view::{ReactiveObject, ViewKind, WeakView};
use crate::graph;
use crate::value::{ObjectId, RawObject, Value};

static REACTIVE_VIEWS: OnceLock<DashMap<ObjectId, WeakView>> = OnceLock::new();
static READONLY_VIEWS: OnceLock<DashMap<ObjectId, WeakView>> = OnceLock::new();

fn views(kind: ViewKind) -> &'static DashMap<ObjectId, WeakView> {
    match kind {
        ViewKind::Mutable => REACTIVE_VIEWS.get_or_init(DashMap::new),
        ViewKind::ReadOnly => READONLY_VIEWS.get_or_init(DashMap::new),
    }
}

/// Wrap a composite in its mutable view.
///
/// Anything that cannot be observed is returned unchanged.
pub fn reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    match &value {
        Value::Reactive(view) if view.is_readonly() => return value,
        Value::Object(raw) if raw.is_marked_readonly() => return readonly(value),
        _ => {}
    }
    create_view(value, ViewKind::Mutable)
}

/// Wrap a composite in its read-only view.
pub fn readonly(value: impl Into<Value>) -> Value {
    let value = match value.into() {
        Value::Reactive(view) if !view.is_readonly() => Value::Object(view.raw().clone()),
        value => value,
    };
    create_view(value, ViewKind::ReadOnly)
}

fn create_view(value: Value, kind: ViewKind) -> Value {
    let raw = match &value {
        Value::Object(raw) => raw,
        // Already of the requested kind.
        Value::Reactive(_) => return value,
        other => {
            if cfg!(debug_assertions) {
                warn!(value = ?other, "value cannot be made reactive: {}", other.type_name());
            }
            return value;
        }
    };
    if !can_observe(raw) {
        return value;
    }

    let id = raw.id();
    let cache = views(kind);
    if let Some(view) = cache.get(&id).and_then(|entry| entry.value().upgrade()) {
        return Value::Reactive(view);
    }

    let view = match cache.entry(id) {
        Entry::Occupied(mut entry) => match entry.get().upgrade() {
            Some(view) => view,
            None => {
                let view = ReactiveObject::new(raw.clone(), kind);
                entry.insert(view.downgrade());
                view
            }
        },
        Entry::Vacant(entry) => {
            let view = ReactiveObject::new(raw.clone(), kind);
            entry.insert(view.downgrade());
            view
        }
    };
    graph::ensure_target(id);
    trace!(target_id = %id, ?kind, "view created");
    Value::Reactive(view)
}

/// Whether a raw object may be wrapped.
pub fn can_observe(raw: &RawObject) -> bool {
    !raw.is_marked_non_reactive() && !raw.is_framework_internal()
}

/// Whether the value is a view of either kind.
pub fn is_reactive(value: &Value) -> bool {
    matches!(value, Value::Reactive(_))
}

/// Whether the value is a read-only view.
pub fn is_readonly(value: &Value) -> bool {
    matches!(value, Value::Reactive(view) if view.is_readonly())
}

/// The raw object behind a view; anything else is returned unchanged.
pub fn to_raw(value: Value) -> Value {
    match value {
        Value::Reactive(view) => Value::Object(view.raw().clone()),
        value => value,
    }
}

/// Make future `reactive` calls on this object produce its read-only view.
pub fn mark_readonly(value: impl Into<Value>) -> Value {
    let value = value.into();
    if let Some(raw) = raw_of(&value) {
        raw.mark_readonly();
    }
    value
}

/// Exclude this object from wrapping.
pub fn mark_non_reactive(value: impl Into<Value>) -> Value {
    let value = value.into();
    if let Some(raw) = raw_of(&value) {
        raw.mark_non_reactive();
    }
    value
}

fn raw_of(value: &Value) -> Option<&RawObject> {
    match value {
        Value::Object(raw) => Some(raw),
        Value::Reactive(view) => Some(view.raw()),
        _ => None,
    }
}

/// Wrap a value read through a view with that view's kind.
pub(crate) fn wrap_nested(value: Value, kind: ViewKind) -> Value {
    if !value.is_composite() {
        return value;
    }
    match kind {
        ViewKind::Mutable => reactive(value),
        ViewKind::ReadOnly => readonly(value),
    }
}

/// Drop the cache entry of a view that has just been dropped.
///
/// A view created for the same object in the meantime is kept.
pub(crate) fn release_view(id: ObjectId, kind: ViewKind) {
    let removed = views(kind).remove_if(&id, |_, weak| weak.is_dead());
    drop(removed);
}

/// Whether the registry holds an entry for the object.
#[cfg(test)]
pub(crate) fn cached(id: ObjectId, kind: ViewKind) -> bool {
    views(kind).contains_key(&id)
}
