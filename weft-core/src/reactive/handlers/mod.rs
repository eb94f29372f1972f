//! Interception Handlers
//!
//! Every view dispatches its accessors to a static handler set chosen by the
//! raw object's shape and the view's kind. The handler is where reads are
//! tracked and writes are turned into triggers.
//!
//! | shape                  | mutable                         | read-only                        |
//! |------------------------|---------------------------------|----------------------------------|
//! | record, sequence       | [`MUTABLE_HANDLERS`]            | [`READONLY_HANDLERS`]            |
//! | collection             | [`MUTABLE_COLLECTION_HANDLERS`] | [`READONLY_COLLECTION_HANDLERS`] |
//!
//! Read-only handlers reject writes while the lock is engaged and behave like
//! their mutable counterparts once it is lifted.

mod base;
mod collection;

pub use base::BaseHandlers;
pub use collection::CollectionHandlers;

use tracing::warn;

use super::lock;
use super::view::ViewKind;
use crate::error::{ReactivityError, Result};
use crate::value::{Marker, PropertyKey, RawObject, Shape, Value};

/// Outcome of a write through a view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WriteOutcome {
    /// A new key was stored.
    Added,
    /// An existing key changed value.
    Updated,
    /// The key already held an equal value. Nothing was notified.
    Unchanged,
    /// The stored value is a cell; the write went into the cell.
    Forwarded,
    /// An existing key was removed.
    Deleted,
    /// The key to remove did not exist.
    Absent,
    /// A non-empty collection was emptied.
    Cleared,
    /// The view is read-only and the lock is engaged.
    Rejected,
}

impl WriteOutcome {
    /// Whether the write changed anything observable.
    pub fn is_change(&self) -> bool {
        matches!(
            self,
            WriteOutcome::Added
                | WriteOutcome::Updated
                | WriteOutcome::Forwarded
                | WriteOutcome::Deleted
                | WriteOutcome::Cleared
        )
    }

    pub fn is_rejected(&self) -> bool {
        matches!(self, WriteOutcome::Rejected)
    }
}

/// The interception surface a view dispatches to.
///
/// `target` is always the raw object behind the view. `receiver` is the raw
/// object the write was originally issued on; it differs from `target` only
/// when a write is delegated to a prototype's handler, and in that case the
/// handler stores on `receiver` but does not notify.
pub trait ProxyHandler: Send + Sync {
    fn kind(&self) -> ViewKind;

    fn get(&self, target: &RawObject, key: &PropertyKey) -> Option<Value>;

    fn set(
        &self,
        target: &RawObject,
        key: PropertyKey,
        value: Value,
        receiver: &RawObject,
    ) -> Result<WriteOutcome>;

    fn delete_property(&self, target: &RawObject, key: &PropertyKey) -> Result<WriteOutcome>;

    fn has(&self, target: &RawObject, key: &PropertyKey) -> bool;

    fn own_keys(&self, target: &RawObject) -> Vec<PropertyKey>;

    fn size(&self, target: &RawObject) -> usize {
        super::trigger::track(target, super::OperationKind::Iterate, None);
        target.len()
    }

    fn clear(&self, target: &RawObject) -> Result<WriteOutcome> {
        Err(ReactivityError::Unsupported {
            operation: "clear",
            shape: target.shape(),
        })
    }
}

pub static MUTABLE_HANDLERS: BaseHandlers = BaseHandlers::new(ViewKind::Mutable);
pub static READONLY_HANDLERS: BaseHandlers = BaseHandlers::new(ViewKind::ReadOnly);
pub static MUTABLE_COLLECTION_HANDLERS: CollectionHandlers = CollectionHandlers::new(ViewKind::Mutable);
pub static READONLY_COLLECTION_HANDLERS: CollectionHandlers = CollectionHandlers::new(ViewKind::ReadOnly);

/// Handler set for a shape and view kind.
pub(crate) fn handlers_for(shape: Shape, kind: ViewKind) -> &'static dyn ProxyHandler {
    match (shape, kind) {
        (Shape::Collection, ViewKind::Mutable) => &MUTABLE_COLLECTION_HANDLERS,
        (Shape::Collection, ViewKind::ReadOnly) => &READONLY_COLLECTION_HANDLERS,
        (_, ViewKind::Mutable) => &MUTABLE_HANDLERS,
        (_, ViewKind::ReadOnly) => &READONLY_HANDLERS,
    }
}

/// Untracked answer to an engine-internal marker read.
fn marker_value(target: &RawObject, marker: Marker, kind: ViewKind) -> Value {
    match marker {
        Marker::Raw => Value::Object(target.clone()),
        Marker::IsReactive => Value::Bool(true),
        Marker::IsReadonly => Value::Bool(kind == ViewKind::ReadOnly),
    }
}

/// Whether a write must be rejected, warning if so.
fn reject_readonly_write(kind: ViewKind, operation: &str, target: &RawObject, key: Option<&PropertyKey>) -> bool {
    if kind != ViewKind::ReadOnly || !lock::is_locked() {
        return false;
    }
    if cfg!(debug_assertions) {
        match key {
            Some(key) => warn!(
                target_id = %target.id(),
                %key,
                "{operation} operation on key \"{key}\" failed: target is readonly"
            ),
            None => warn!(target_id = %target.id(), "{operation} operation failed: target is readonly"),
        }
    }
    true
}
