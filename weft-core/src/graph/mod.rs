//! Dependency Graph
//!
//! This module implements the mapping that connects observed data to the
//! effects that read it:
//!
//! ```text
//! ObjectId ─▶ DepKey ─▶ Dep (ordered set of effects)
//! ```
//!
//! # Overview
//!
//! - A *target* is anything with an [`ObjectId`](crate::value::ObjectId):
//!   raw objects and value cells.
//! - A [`DepKey`] is either a property key or the structural `Iterate`
//!   sentinel, which stands for "the set of keys changed".
//! - A [`Dep`] is the bucket of effects subscribed to one `(target, key)`
//!   pair. Buckets preserve insertion order, which is the notification order
//!   within a class of effects.
//!
//! The graph is pure bookkeeping. Deciding *which* buckets a mutation
//! invalidates, and running the effects, is the trigger protocol's job
//! (see `reactive::trigger`).
//!
//! # Design Decisions
//!
//! 1. The graph keys on object identity tokens, never on views, so a raw
//!    object and all of its views share subscriptions.
//!
//! 2. Buckets hold effects strongly; effects hold their buckets weakly. When
//!    a target is dropped its buckets go with it, and nothing keeps the
//!    effect alive through a reference cycle.
//!
//! 3. Targets are released from the graph when the raw object or value cell
//!    is dropped, which stands in for weak-keyed association.

mod dep;
mod target_map;

pub use dep::{Dep, DepKey, KeyToDepMap};
pub use target_map::{
    all_buckets, buckets, ensure_target, forget, is_tracked, lookup, record, release_target,
    subscriber_count,
};
