//! Track and Trigger
//!
//! `track` records that the running effect read `(target, key)`. `trigger`
//! decides which buckets a mutation invalidates and notifies their effects.
//!
//! # Bucket selection
//!
//! | mutation             | buckets                                   |
//! |----------------------|-------------------------------------------|
//! | `Set`                | the key                                   |
//! | `Add`, `Delete`      | the key, plus the target's iteration key  |
//! | `Clear`              | every bucket of the target                |
//!
//! The iteration key is `length` for sequences and the `Iterate` sentinel for
//! everything else.
//!
//! # Ordering
//!
//! Candidates are de-duplicated, then split into computed and plain effects.
//! Every computed effect is notified before any plain effect, so a plain
//! effect that reads a derived value during its re-run never sees a stale
//! one. Within each group, bucket insertion order is kept.

use indexmap::IndexMap;
use smallvec::SmallVec;
use tracing::trace;

use super::context::{self, EffectContext};
use super::effect::ReactiveEffect;
use super::operations::{DebuggerEvent, OperationKind, TriggerInfo};
use super::subscriber::EffectId;
use crate::graph::{self, DepKey};
use crate::value::{ObjectId, PropertyKey, RawObject, Shape};

/// Something the dependency graph can key on.
pub(crate) trait Trackable {
    fn target_id(&self) -> ObjectId;

    /// Bucket invalidated by structural changes.
    fn iteration_key(&self) -> DepKey {
        DepKey::Iterate
    }
}

impl Trackable for RawObject {
    fn target_id(&self) -> ObjectId {
        self.id()
    }

    fn iteration_key(&self) -> DepKey {
        match self.shape() {
            Shape::Sequence => DepKey::Property(PropertyKey::length()),
            _ => DepKey::Iterate,
        }
    }
}

/// Record a read of `key` on `target` against the running effect.
///
/// `Iterate` reads ignore `key` and use the target's iteration key.
pub(crate) fn track<T: Trackable + ?Sized>(target: &T, kind: OperationKind, key: Option<&PropertyKey>) {
    debug_assert!(kind.is_read(), "`{kind}` is not a read operation");
    if !context::is_tracking() {
        return;
    }
    let Some(effect) = EffectContext::current() else {
        return;
    };

    let dep_key = match (kind, key) {
        (OperationKind::Iterate, _) | (_, None) => target.iteration_key(),
        (_, Some(key)) => DepKey::Property(key.clone()),
    };

    let target_id = target.target_id();
    if graph::record(target_id, dep_key.clone(), &effect) {
        trace!(effect = %effect.id(), target_id = %target_id, key = %dep_key, %kind, "tracked");
        if let Some(on_track) = effect.on_track() {
            on_track(&DebuggerEvent {
                effect: effect.clone(),
                target: target_id,
                kind,
                key: Some(dep_key),
                info: None,
            });
        }
    }
}

/// Notify the effects affected by a mutation of `target`.
pub(crate) fn trigger<T: Trackable + ?Sized>(
    target: &T,
    kind: OperationKind,
    key: Option<&PropertyKey>,
    info: Option<TriggerInfo>,
) {
    let target_id = target.target_id();

    let buckets = if kind == OperationKind::Clear {
        graph::all_buckets(target_id)
    } else {
        let mut keys: SmallVec<[DepKey; 2]> = SmallVec::new();
        if let Some(key) = key {
            keys.push(DepKey::Property(key.clone()));
        }
        if kind.is_structural() {
            keys.push(target.iteration_key());
        }
        graph::buckets(target_id, &keys)
    };

    // Never tracked.
    let Some(buckets) = buckets else {
        return;
    };

    let mut computed_runners: IndexMap<EffectId, ReactiveEffect> = IndexMap::new();
    let mut effects: IndexMap<EffectId, ReactiveEffect> = IndexMap::new();
    for dep in &buckets {
        for effect in dep.snapshot() {
            let group = if effect.is_computed() {
                &mut computed_runners
            } else {
                &mut effects
            };
            group.entry(effect.id()).or_insert(effect);
        }
    }

    if computed_runners.is_empty() && effects.is_empty() {
        return;
    }
    trace!(
        target_id = %target_id,
        %kind,
        computed = computed_runners.len(),
        plain = effects.len(),
        "triggering"
    );

    let key = key.cloned().map(DepKey::Property);
    for effect in computed_runners.values().chain(effects.values()) {
        schedule_run(effect, target_id, kind, key.as_ref(), info.as_ref());
    }
}

fn schedule_run(
    effect: &ReactiveEffect,
    target: ObjectId,
    kind: OperationKind,
    key: Option<&DepKey>,
    info: Option<&TriggerInfo>,
) {
    // Stopped since the snapshot was taken.
    if !effect.is_active() {
        return;
    }
    if let Some(on_trigger) = effect.on_trigger() {
        on_trigger(&DebuggerEvent {
            effect: effect.clone(),
            target,
            kind,
            key: key.cloned(),
            info: info.cloned(),
        });
    }
    match effect.scheduler() {
        Some(scheduler) => scheduler(effect),
        None => effect.run(),
    }
}
