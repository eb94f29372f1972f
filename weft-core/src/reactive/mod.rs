//! Reactive Runtime
//!
//! This module implements the core reactive system: views, effects, value
//! cells and computed values.
//!
//! # Concepts
//!
//! ## Views
//!
//! A view ([`ReactiveObject`]) wraps a raw object. Reading a property through
//! a view inside a running effect subscribes that effect to the property.
//! Writing through a view notifies the subscribers of what changed. Views
//! come in a mutable and a read-only kind; the read-only kind rejects writes
//! while the lock is engaged.
//!
//! ## Effects
//!
//! An effect is a computation that re-runs whenever something it read
//! changes. Its dependencies are discovered by running it, and rediscovered
//! on every run, so branches that stop being read stop notifying it.
//!
//! ## Value Cells
//!
//! A [`Ref`] is a single reactive value, for state that is not a property of
//! some object.
//!
//! ## Computed Values
//!
//! A [`Computed`] caches a derived value and recomputes it only when read
//! after one of its inputs changed.
//!
//! # Implementation Notes
//!
//! The running effect lives on a thread-local stack. Subscriptions live in a
//! process-wide dependency graph keyed by object identity (see
//! [`crate::graph`]). Each mutation is classified (add, update, delete,
//! clear) and the trigger protocol picks the buckets to notify from that
//! classification.

mod cell;
mod computed;
mod context;
mod effect;
pub mod handlers;
mod lock;
mod operations;
mod registry;
mod subscriber;
mod trigger;
mod view;

pub use cell::{is_ref, to_refs, Ref};
pub use computed::Computed;
pub use context::{is_tracking, pause_tracking, resume_tracking, untracked, EffectContext};
pub use effect::{effect, stop, DebuggerHook, EffectFn, EffectOptions, ReactiveEffect, Scheduler, StopHook};
pub use handlers::{ProxyHandler, WriteOutcome};
pub use lock::{is_locked, lock, unlock, with_unlocked};
pub use operations::{DebuggerEvent, OperationKind, TriggerInfo};
pub use registry::{
    can_observe, is_reactive, is_readonly, mark_non_reactive, mark_readonly, reactive, readonly,
    to_raw,
};
pub use subscriber::EffectId;
pub use view::{ReactiveObject, ViewKind};
