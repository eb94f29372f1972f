//! Weft Core
//!
//! This crate provides a fine-grained dependency-tracking runtime. Given
//! mutable object graphs, it records which effects read which properties and
//! re-runs exactly those effects when the properties they read are mutated.
//! It knows nothing about rendering; it is the reactive layer a UI framework
//! builds its data binding on.
//!
//! It implements:
//!
//! - An explicit value model of records, sequences and collections
//! - An identity registry of mutable and read-only views
//! - Interception of reads and writes through views
//! - A dependency graph of `(object, key) → effects`
//! - Effects, value cells and computed values
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: Raw objects, values and property keys
//! - `graph`: The dependency graph
//! - `reactive`: Views, effects, the trigger protocol, cells and computeds
//! - `error`: Error types
//!
//! # Example
//!
//! ```rust,ignore
//! use weft_core::{effect, reactive, EffectOptions, RawObject};
//!
//! // Wrap a raw object
//! let state = reactive(RawObject::from_entries([("count", 0)]))
//!     .into_reactive()
//!     .unwrap();
//!
//! // Create an effect
//! let reader = state.clone();
//! effect(
//!     move || println!("Count: {:?}", reader.get("count")),
//!     EffectOptions::new(),
//! );
//! // prints: "Count: Some(Int(0))"
//!
//! // Update through the view
//! state.set("count", 1)?;
//! // Effect automatically runs, prints: "Count: Some(Int(1))"
//! ```

pub mod error;
pub mod graph;
pub mod reactive;
pub mod value;

pub use error::{ReactivityError, Result};
pub use reactive::{
    effect, is_locked, is_reactive, is_readonly, is_ref, lock, mark_non_reactive, mark_readonly,
    pause_tracking, reactive, readonly, resume_tracking, stop, to_raw, to_refs, unlock, untracked,
    with_unlocked, Computed, EffectOptions, ReactiveEffect, ReactiveObject, Ref, WriteOutcome,
};
pub use value::{PropertyKey, RawObject, Shape, Symbol, Value};
