//! Handlers for map-like collections.
//!
//! Collections have no prototype and never unwrap value cells: a cell stored
//! under a key is returned as the cell itself.

use super::{marker_value, reject_readonly_write, ProxyHandler, WriteOutcome};
use crate::error::Result;
use crate::reactive::operations::{OperationKind, TriggerInfo};
use crate::reactive::registry::{to_raw, wrap_nested};
use crate::reactive::trigger::{track, trigger};
use crate::reactive::view::ViewKind;
use crate::value::{PropertyKey, RawObject, Value};

#[derive(Debug)]
pub struct CollectionHandlers {
    kind: ViewKind,
}

impl CollectionHandlers {
    pub const fn new(kind: ViewKind) -> Self {
        Self { kind }
    }
}

impl ProxyHandler for CollectionHandlers {
    fn kind(&self) -> ViewKind {
        self.kind
    }

    fn get(&self, target: &RawObject, key: &PropertyKey) -> Option<Value> {
        if let Some(marker) = key.marker() {
            return Some(marker_value(target, marker, self.kind));
        }
        let value = target.get_own(key);
        track(target, OperationKind::Get, Some(key));
        value.map(|value| wrap_nested(value, self.kind))
    }

    fn set(
        &self,
        target: &RawObject,
        key: PropertyKey,
        value: Value,
        _receiver: &RawObject,
    ) -> Result<WriteOutcome> {
        if reject_readonly_write(self.kind, "Set", target, Some(&key)) {
            return Ok(WriteOutcome::Rejected);
        }

        let value = to_raw(value);
        let had_key = target.has_own(&key);
        let old_value = target.insert(key.clone(), value.clone())?;

        if !had_key {
            trigger(
                target,
                OperationKind::Add,
                Some(&key),
                Some(TriggerInfo::new(None, Some(value))),
            );
            Ok(WriteOutcome::Added)
        } else if old_value.as_ref() != Some(&value) {
            trigger(
                target,
                OperationKind::Set,
                Some(&key),
                Some(TriggerInfo::new(old_value, Some(value))),
            );
            Ok(WriteOutcome::Updated)
        } else {
            Ok(WriteOutcome::Unchanged)
        }
    }

    fn delete_property(&self, target: &RawObject, key: &PropertyKey) -> Result<WriteOutcome> {
        if reject_readonly_write(self.kind, "Delete", target, Some(key)) {
            return Ok(WriteOutcome::Rejected);
        }

        match target.remove(key)? {
            Some(old_value) => {
                trigger(
                    target,
                    OperationKind::Delete,
                    Some(key),
                    Some(TriggerInfo::new(Some(old_value), None)),
                );
                Ok(WriteOutcome::Deleted)
            }
            None => Ok(WriteOutcome::Absent),
        }
    }

    fn has(&self, target: &RawObject, key: &PropertyKey) -> bool {
        track(target, OperationKind::Has, Some(key));
        target.has_own(key)
    }

    fn own_keys(&self, target: &RawObject) -> Vec<PropertyKey> {
        track(target, OperationKind::Iterate, None);
        target.keys()
    }

    fn clear(&self, target: &RawObject) -> Result<WriteOutcome> {
        if reject_readonly_write(self.kind, "Clear", target, None) {
            return Ok(WriteOutcome::Rejected);
        }

        if target.clear()? {
            trigger(target, OperationKind::Clear, None, None);
            Ok(WriteOutcome::Cleared)
        } else {
            Ok(WriteOutcome::Unchanged)
        }
    }
}
