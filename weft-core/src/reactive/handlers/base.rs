//! Handlers for records and sequences.

use super::{marker_value, reject_readonly_write, ProxyHandler, WriteOutcome};
use crate::error::Result;
use crate::reactive::operations::{OperationKind, TriggerInfo};
use crate::reactive::registry::{to_raw, wrap_nested};
use crate::reactive::trigger::{track, trigger};
use crate::reactive::view::ViewKind;
use crate::value::{PropertyKey, RawObject, Value};

/// Interception for records and sequences.
///
/// Reads unwrap value cells and lazily wrap nested composites with the view's
/// kind. Writes store raw values, forward into cells, and honour prototypes.
#[derive(Debug)]
pub struct BaseHandlers {
    kind: ViewKind,
}

impl BaseHandlers {
    pub const fn new(kind: ViewKind) -> Self {
        Self { kind }
    }
}

/// Own value, else the prototype's. A view prototype is read through its
/// own handler, so the read is tracked there too.
fn read_through_chain(target: &RawObject, key: &PropertyKey) -> Option<Value> {
    if let Some(value) = target.get_own(key) {
        return Some(value);
    }
    match target.prototype()? {
        Value::Reactive(proto) => proto.get(key),
        Value::Object(proto) => proto.lookup(key),
        _ => None,
    }
}

fn has_in_chain(target: &RawObject, key: &PropertyKey) -> bool {
    if target.has_own(key) {
        return true;
    }
    match target.prototype() {
        Some(Value::Reactive(proto)) => proto.has(key),
        Some(Value::Object(proto)) => proto.has_in_chain(key),
        _ => false,
    }
}

impl ProxyHandler for BaseHandlers {
    fn kind(&self) -> ViewKind {
        self.kind
    }

    fn get(&self, target: &RawObject, key: &PropertyKey) -> Option<Value> {
        if let Some(marker) = key.marker() {
            return Some(marker_value(target, marker, self.kind));
        }
        let key = key.clone().normalized(target.shape());
        let value = read_through_chain(target, &key);

        if key.is_well_known() {
            return value;
        }
        // The cell tracks itself; the slot holding it is not tracked.
        if let Some(Value::Ref(cell)) = &value {
            return Some(cell.get());
        }
        track(target, OperationKind::Get, Some(&key));
        value.map(|value| wrap_nested(value, self.kind))
    }

    fn set(
        &self,
        target: &RawObject,
        key: PropertyKey,
        value: Value,
        receiver: &RawObject,
    ) -> Result<WriteOutcome> {
        if reject_readonly_write(self.kind, "Set", target, Some(&key)) {
            return Ok(WriteOutcome::Rejected);
        }

        let key = key.normalized(target.shape());
        let value = to_raw(value);
        // Inherited cells are written through, not shadowed.
        let old_value = target.lookup(&key);

        if let Some(Value::Ref(cell)) = &old_value {
            if !value.is_ref() {
                cell.set(value)?;
                return Ok(WriteOutcome::Forwarded);
            }
        }

        let had_key = target.has_own(&key);
        match target.prototype() {
            Some(Value::Reactive(proto)) if !had_key => {
                let delegated = proto
                    .handler()
                    .set(proto.raw(), key.clone(), value.clone(), receiver)?;
                if delegated.is_rejected() {
                    return Ok(delegated);
                }
            }
            _ => {
                receiver.insert(key.clone(), value.clone())?;
            }
        }

        let outcome = if !had_key {
            WriteOutcome::Added
        } else if old_value.as_ref() != Some(&value) {
            WriteOutcome::Updated
        } else {
            WriteOutcome::Unchanged
        };

        // Writes delegated from a child only store; the child notifies.
        if !target.ptr_eq(receiver) {
            return Ok(outcome);
        }
        match outcome {
            WriteOutcome::Added => trigger(
                target,
                OperationKind::Add,
                Some(&key),
                Some(TriggerInfo::new(None, Some(value))),
            ),
            WriteOutcome::Updated => trigger(
                target,
                OperationKind::Set,
                Some(&key),
                Some(TriggerInfo::new(old_value, Some(value))),
            ),
            _ => {}
        }
        Ok(outcome)
    }

    fn delete_property(&self, target: &RawObject, key: &PropertyKey) -> Result<WriteOutcome> {
        if reject_readonly_write(self.kind, "Delete", target, Some(key)) {
            return Ok(WriteOutcome::Rejected);
        }

        let key = key.clone().normalized(target.shape());
        let had_key = target.has_own(&key);
        let old_value = target.remove(&key)?;
        if !had_key {
            return Ok(WriteOutcome::Absent);
        }
        trigger(
            target,
            OperationKind::Delete,
            Some(&key),
            Some(TriggerInfo::new(old_value, None)),
        );
        Ok(WriteOutcome::Deleted)
    }

    fn has(&self, target: &RawObject, key: &PropertyKey) -> bool {
        let key = key.clone().normalized(target.shape());
        let result = has_in_chain(target, &key);
        if !key.is_well_known() {
            track(target, OperationKind::Has, Some(&key));
        }
        result
    }

    fn own_keys(&self, target: &RawObject) -> Vec<PropertyKey> {
        track(target, OperationKind::Iterate, None);
        target.keys()
    }
}
