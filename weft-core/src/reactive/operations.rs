//! Operation kinds and debugger events.

use std::fmt;

use super::effect::ReactiveEffect;
use crate::graph::DepKey;
use crate::value::{ObjectId, Value};

/// Kinds of observed operations.
///
/// `Get`, `Has` and `Iterate` are reads recorded by tracking; the rest are
/// mutations handed to the trigger protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OperationKind {
    Get,
    Has,
    Iterate,
    Set,
    Add,
    Delete,
    Clear,
}

impl OperationKind {
    /// Whether this is a kind `track` records.
    pub fn is_read(&self) -> bool {
        matches!(self, OperationKind::Get | OperationKind::Has | OperationKind::Iterate)
    }

    /// Whether the mutation changes the target's key set.
    pub fn is_structural(&self) -> bool {
        matches!(self, OperationKind::Add | OperationKind::Delete | OperationKind::Clear)
    }
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            OperationKind::Get => "get",
            OperationKind::Has => "has",
            OperationKind::Iterate => "iterate",
            OperationKind::Set => "set",
            OperationKind::Add => "add",
            OperationKind::Delete => "delete",
            OperationKind::Clear => "clear",
        })
    }
}

/// Old and new values attached to a mutation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TriggerInfo {
    pub old_value: Option<Value>,
    pub new_value: Option<Value>,
}

impl TriggerInfo {
    pub fn new(old_value: Option<Value>, new_value: Option<Value>) -> Self {
        Self {
            old_value,
            new_value,
        }
    }
}

/// Payload of the `on_track` and `on_trigger` debug hooks.
#[derive(Clone)]
pub struct DebuggerEvent {
    pub effect: ReactiveEffect,
    pub target: ObjectId,
    pub kind: OperationKind,
    pub key: Option<DepKey>,
    pub info: Option<TriggerInfo>,
}

impl fmt::Debug for DebuggerEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DebuggerEvent")
            .field("effect", &self.effect.id())
            .field("target", &self.target)
            .field("kind", &self.kind)
            .field("key", &self.key)
            .field("info", &self.info)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
