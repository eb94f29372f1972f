//! Integration Tests for the Reactive Runtime
//!
//! These tests verify that views, effects, cells and computeds work together
//! correctly through the public API.

use std::sync::atomic::{AtomicI64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;

use weft_core::reactive::{EffectContext, ViewKind};
use weft_core::{
    effect, is_locked, is_reactive, is_readonly, lock, readonly, reactive, stop, to_raw, to_refs,
    unlock, untracked, with_unlocked, Computed, EffectOptions, PropertyKey, RawObject,
    ReactiveObject, ReactivityError, Ref, Value, WriteOutcome,
};

fn observe(raw: &RawObject) -> ReactiveObject {
    reactive(raw).into_reactive().unwrap()
}

fn int(value: Option<Value>) -> i64 {
    value.and_then(|v| v.as_int()).unwrap_or(0)
}

/// Test the `{count: 0}` scenario end to end.
#[test]
fn count_scenario() {
    let raw = RawObject::from_json(json!({ "count": 0 })).unwrap();
    let view = observe(&raw);

    let total = Arc::new(AtomicI64::new(-1));
    let runs = Arc::new(AtomicUsize::new(0));
    let (total_clone, runs_clone, reader) = (total.clone(), runs.clone(), view.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            total_clone.store(int(reader.get("count")) * 2, Ordering::SeqCst);
        },
        EffectOptions::new(),
    );
    assert_eq!(total.load(Ordering::SeqCst), 0);

    assert_eq!(view.set("count", 5).unwrap(), WriteOutcome::Updated);
    assert_eq!(total.load(Ordering::SeqCst), 10);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    // Same value again: no re-run.
    assert_eq!(view.set("count", 5).unwrap(), WriteOutcome::Unchanged);
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test that a write is visible to the next read, wrapped if composite.
#[test]
fn read_after_write_round_trip() {
    let view = observe(&RawObject::record());
    view.set("n", 3).unwrap();
    assert_eq!(view.get("n"), Some(Value::Int(3)));

    let child = RawObject::from_entries([("x", 1)]);
    view.set("child", &child).unwrap();
    let read = view.get("child").unwrap();
    assert!(is_reactive(&read));
    assert_eq!(to_raw(read), Value::Object(child));
}

/// Test that writing a view stores its raw object.
#[test]
fn writes_store_raw_objects() {
    let parent = RawObject::record();
    let child = RawObject::record();
    observe(&parent).set("child", observe(&child)).unwrap();
    assert_eq!(parent.get_own(&"child".into()), Some(Value::Object(child)));
}

/// Test that an effect re-runs once per distinct write, and only for the key it read.
#[test]
fn tracking_is_per_key() {
    let view = observe(&RawObject::from_entries([("a", 1), ("b", 1)]));
    let runs = Arc::new(AtomicUsize::new(0));
    let (runs_clone, reader) = (runs.clone(), view.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            reader.get("a");
        },
        EffectOptions::new(),
    );

    view.set("a", 2).unwrap();
    view.set("a", 3).unwrap();
    view.set("b", 2).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Test that an effect stops reacting to a branch it no longer reads.
#[test]
fn branch_cleanup() {
    let view = observe(&RawObject::from_entries([
        ("flag", Value::Bool(true)),
        ("b", Value::Int(1)),
        ("c", Value::Int(2)),
    ]));
    let runs = Arc::new(AtomicUsize::new(0));
    let seen = Arc::new(AtomicI64::new(0));
    let (runs_clone, seen_clone, reader) = (runs.clone(), seen.clone(), view.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            let flag = reader.get("flag").and_then(|v| v.as_bool()).unwrap_or(false);
            let value = if flag { reader.get("b") } else { reader.get("c") };
            seen_clone.store(int(value), Ordering::SeqCst);
        },
        EffectOptions::new(),
    );
    assert_eq!(seen.load(Ordering::SeqCst), 1);

    view.set("flag", false).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 2);
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    // `b` is no longer read.
    view.set("b", 10).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    view.set("c", 20).unwrap();
    assert_eq!(seen.load(Ordering::SeqCst), 20);
    assert_eq!(runs.load(Ordering::SeqCst), 3);
}

/// Test that adding or deleting keys re-runs an effect that only enumerated.
#[test]
fn structural_reactivity_on_records() {
    let view = observe(&RawObject::from_entries([("a", 1)]));
    let key_counts = Arc::new(Mutex::new(Vec::new()));
    let (counts_clone, reader) = (key_counts.clone(), view.clone());
    effect(
        move || counts_clone.lock().push(reader.keys().len()),
        EffectOptions::new(),
    );

    view.set("b", 2).unwrap();
    // Updating an existing key does not change the key set.
    view.set("a", 5).unwrap();
    view.delete("a").unwrap();
    // Deleting a missing key notifies nobody.
    assert_eq!(view.delete("zzz").unwrap(), WriteOutcome::Absent);

    assert_eq!(*key_counts.lock(), vec![1, 2, 1]);
}

/// Test that `has` checks are reactive without reading the value.
#[test]
fn membership_is_tracked() {
    let view = observe(&RawObject::record());
    let answers = Arc::new(Mutex::new(Vec::new()));
    let (answers_clone, reader) = (answers.clone(), view.clone());
    effect(
        move || answers_clone.lock().push(reader.has("token")),
        EffectOptions::new(),
    );

    view.set("token", "abc").unwrap();
    view.delete("token").unwrap();
    assert_eq!(*answers.lock(), vec![false, true, false]);
}

/// Test that sequence growth re-runs length readers and enumerators.
#[test]
fn structural_reactivity_on_sequences() {
    let view = observe(&RawObject::from_values([1, 2]));
    let lengths = Arc::new(Mutex::new(Vec::new()));
    let (lengths_clone, reader) = (lengths.clone(), view.clone());
    effect(
        move || lengths_clone.lock().push(reader.len()),
        EffectOptions::new(),
    );

    // Append at the end.
    view.set(2usize, 3).unwrap();
    // Overwrite an element: length readers are unaffected.
    view.set(0usize, 10).unwrap();
    // Truncate through `length`.
    view.set(PropertyKey::length(), 1).unwrap();

    assert_eq!(*lengths.lock(), vec![2, 3, 1]);
    assert!(view.set("color", "red").is_err());
}

/// Test that computed effects run before plain effects.
#[test]
fn computed_effects_run_before_plain_effects() {
    let view = observe(&RawObject::from_entries([("x", 1)]));
    let log = Arc::new(Mutex::new(Vec::new()));
    let derived = Arc::new(AtomicI64::new(0));

    // Plain effect subscribes first.
    let (log_p, derived_p, reader_p) = (log.clone(), derived.clone(), view.clone());
    effect(
        move || {
            let x = int(reader_p.get("x"));
            log_p
                .lock()
                .push(format!("plain x={x} derived={}", derived_p.load(Ordering::SeqCst)));
        },
        EffectOptions::new(),
    );

    let (log_c, derived_c, reader_c) = (log.clone(), derived.clone(), view.clone());
    effect(
        move || {
            let x = int(reader_c.get("x"));
            derived_c.store(x * 100, Ordering::SeqCst);
            log_c.lock().push(format!("computed x={x}"));
        },
        EffectOptions::new().computed(),
    );
    log.lock().clear();

    view.set("x", 2).unwrap();
    assert_eq!(
        *log.lock(),
        vec!["computed x=2".to_string(), "plain x=2 derived=200".to_string()]
    );
}

/// Test that a plain effect reading a computed never sees a stale value.
#[test]
fn computed_values_are_fresh_for_readers() {
    let view = observe(&RawObject::from_entries([("x", 1)]));
    let reader = view.clone();
    let doubled = Computed::new(move || int(reader.get("x")) * 2);

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (seen_clone, doubled_clone, reader) = (seen.clone(), doubled.clone(), view.clone());
    effect(
        move || {
            let x = int(reader.get("x"));
            seen_clone.lock().push((x, doubled_clone.get()));
        },
        EffectOptions::new(),
    );

    view.set("x", 4).unwrap();
    let seen = seen.lock().clone();
    assert_eq!(seen.first(), Some(&(1, 2)));
    // Every observation is consistent.
    assert!(seen.iter().all(|(x, d)| *d == x * 2));
    assert_eq!(seen.last(), Some(&(4, 8)));
}

/// Test that a computed chain invalidates through every level.
#[test]
fn computed_invalidation_chain() {
    let cell = Ref::new(1);
    let source = cell.clone();
    let a = Computed::new(move || int(Some(source.get())) + 1);
    let a_clone = a.clone();
    let b = Computed::new(move || a_clone.get() * 2);

    assert_eq!(b.get(), 4);
    cell.set(5).unwrap();
    assert!(a.is_dirty());
    assert!(b.is_dirty());
    assert_eq!(b.get(), 12);
}

/// Test that read-only views reject writes while locked.
#[test]
fn readonly_enforcement() {
    let raw = RawObject::from_entries([("a", 1)]);
    let ro = readonly(&raw).into_reactive().unwrap();

    let runs = Arc::new(AtomicUsize::new(0));
    let (runs_clone, reader) = (runs.clone(), ro.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            reader.get("a");
        },
        EffectOptions::new(),
    );

    assert_eq!(ro.set("a", 2).unwrap(), WriteOutcome::Rejected);
    assert_eq!(ro.delete("a").unwrap(), WriteOutcome::Rejected);
    assert_eq!(raw.get_own(&"a".into()), Some(Value::Int(1)));
    assert_eq!(runs.load(Ordering::SeqCst), 1);

    // A trusted code path may still write.
    let outcome = with_unlocked(|| ro.set("a", 2)).unwrap();
    assert_eq!(outcome, WriteOutcome::Updated);
    assert_eq!(raw.get_own(&"a".into()), Some(Value::Int(2)));
    assert_eq!(runs.load(Ordering::SeqCst), 2);

    // And the lock is back.
    assert_eq!(ro.set("a", 3).unwrap(), WriteOutcome::Rejected);
}

/// Test that the lock can be released and engaged by hand.
#[test]
fn manual_unlock_and_lock() {
    let raw = RawObject::from_entries([("a", 1)]);
    let ro = readonly(&raw).into_reactive().unwrap();
    assert!(is_locked());

    unlock();
    assert!(!is_locked());
    assert_eq!(ro.set("a", 2).unwrap(), WriteOutcome::Updated);

    lock();
    assert!(is_locked());
    assert_eq!(ro.set("a", 3).unwrap(), WriteOutcome::Rejected);
    assert_eq!(raw.get_own(&"a".into()), Some(Value::Int(2)));
}

/// Test that a cell inherited from a prototype is written through.
#[test]
fn inherited_cells_are_written_through() {
    let cell = Ref::new(1);
    let base = RawObject::from_entries([("n", Value::from(cell.clone()))]);
    let child = RawObject::record_with_prototype(&base);
    let view = observe(&child);

    let seen = Arc::new(AtomicI64::new(0));
    let (seen_clone, reader) = (seen.clone(), cell.clone());
    effect(
        move || seen_clone.store(reader.get().as_int().unwrap_or(0), Ordering::SeqCst),
        EffectOptions::new(),
    );

    assert_eq!(view.set("n", 5).unwrap(), WriteOutcome::Forwarded);
    assert_eq!(cell.get_untracked(), Value::Int(5));
    assert_eq!(seen.load(Ordering::SeqCst), 5);
    assert!(!child.has_own(&"n".into()));
    assert_eq!(int(view.get("n")), 5);
}

/// Test that out-of-range sequence writes fail instead of allocating.
#[test]
fn sequence_limits_are_enforced() {
    let raw = RawObject::from_values([1, 2]);
    let view = observe(&raw);

    assert!(matches!(
        view.set(usize::MAX, 1),
        Err(ReactivityError::InvalidKey { .. })
    ));
    assert!(matches!(
        view.set(PropertyKey::length(), i64::MAX),
        Err(ReactivityError::InvalidLength(_))
    ));
    assert_eq!(view.len(), 2);

    assert_eq!(view.set(4_000_000_000usize, 3).unwrap(), WriteOutcome::Added);
    assert_eq!(int(view.get(PropertyKey::length())), 4_000_000_001);
}

/// Test that nested reads through a read-only view are read-only too.
#[test]
fn readonly_is_deep() {
    let raw = RawObject::from_json(json!({ "inner": { "v": 1 } })).unwrap();
    let ro = readonly(&raw).into_reactive().unwrap();
    let inner = ro.get("inner").unwrap().into_reactive().unwrap();
    assert_eq!(inner.kind(), ViewKind::ReadOnly);
    assert_eq!(inner.set("v", 2).unwrap(), WriteOutcome::Rejected);
}

/// Test that stop is idempotent and silences the effect.
#[test]
fn stop_is_idempotent() {
    let view = observe(&RawObject::from_entries([("a", 1)]));
    let runs = Arc::new(AtomicUsize::new(0));
    let stops = Arc::new(AtomicUsize::new(0));
    let (runs_clone, stops_clone, reader) = (runs.clone(), stops.clone(), view.clone());
    let e = effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            reader.get("a");
        },
        EffectOptions::new().on_stop(move || {
            stops_clone.fetch_add(1, Ordering::SeqCst);
        }),
    );

    stop(&e);
    stop(&e);
    view.set("a", 2).unwrap();

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(stops.load(Ordering::SeqCst), 1);
    assert_eq!(e.dep_count(), 0);
}

/// Test that wrapping is stable in both directions.
#[test]
fn identity_stability() {
    let raw = RawObject::record();
    let view = reactive(&raw);
    assert_eq!(reactive(view.clone()), view);
    assert_eq!(reactive(&raw), view);
    assert_eq!(to_raw(view.clone()), Value::Object(raw.clone()));

    let ro = readonly(&raw);
    assert_ne!(ro, view);
    assert!(is_readonly(&ro));
    assert_eq!(readonly(view.clone()), ro);

    // Nested reads return the same view every time.
    let parent = observe(&RawObject::from_entries([("child", Value::from(&raw))]));
    assert_eq!(parent.get("child"), Some(view));
}

/// Test that clear on a collection re-runs every reader.
#[test]
fn collection_clear() {
    let raw = RawObject::collection_from_entries([("a", 1), ("b", 2)]);
    let map = observe(&raw);
    let log = Arc::new(Mutex::new(Vec::new()));

    let (log_a, reader_a) = (log.clone(), map.clone());
    effect(
        move || log_a.lock().push(("a", reader_a.get("a"))),
        EffectOptions::new(),
    );
    let (log_n, reader_n) = (log.clone(), map.clone());
    effect(
        move || log_n.lock().push(("len", Some(Value::from(reader_n.len() as i64)))),
        EffectOptions::new(),
    );
    log.lock().clear();

    assert_eq!(map.clear().unwrap(), WriteOutcome::Cleared);
    assert_eq!(
        *log.lock(),
        vec![("a", None), ("len", Some(Value::Int(0)))]
    );
    assert!(observe(&RawObject::record()).clear().is_err());
}

/// Test that a write through a prototype lands on the child and notifies
/// only the child's subscribers.
#[test]
fn prototype_write_guard() {
    let proto_raw = RawObject::from_entries([("shared", 1)]);
    let proto = observe(&proto_raw);
    let child_raw = RawObject::record_with_prototype(&proto);
    let child = observe(&child_raw);

    let proto_runs = Arc::new(AtomicUsize::new(0));
    let (runs_clone, reader) = (proto_runs.clone(), proto.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            reader.keys();
        },
        EffectOptions::new(),
    );

    let child_reads = Arc::new(Mutex::new(Vec::new()));
    let (reads_clone, child_reader) = (child_reads.clone(), child.clone());
    effect(
        move || reads_clone.lock().push(int(child_reader.get("own"))),
        EffectOptions::new(),
    );

    // Inherited read.
    assert_eq!(child.get("shared"), Some(Value::Int(1)));

    assert_eq!(child.set("own", 7).unwrap(), WriteOutcome::Added);
    assert_eq!(child_raw.get_own(&"own".into()), Some(Value::Int(7)));
    assert!(!proto_raw.has_own(&"own".into()));
    assert_eq!(proto_runs.load(Ordering::SeqCst), 1);
    assert_eq!(*child_reads.lock(), vec![0, 7]);
}

/// Test that writes into a slot holding a cell go through the cell.
#[test]
fn cell_forwarding() {
    let cell = Ref::new(1);
    let view = observe(&RawObject::from_entries([("n", Value::from(cell.clone()))]));

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (seen_clone, reader) = (seen.clone(), view.clone());
    effect(
        move || seen_clone.lock().push(int(reader.get("n"))),
        EffectOptions::new(),
    );

    assert_eq!(view.set("n", 2).unwrap(), WriteOutcome::Forwarded);
    assert_eq!(cell.get_untracked(), Value::Int(2));
    cell.set(3).unwrap();
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
}

/// Test that per-property cells read and write through the view.
#[test]
fn to_refs_stay_connected() {
    let view_value = reactive(RawObject::from_entries([("x", 1)]));
    let view = view_value.as_reactive().unwrap().clone();
    let refs = to_refs(&view_value);
    let x = refs[&PropertyKey::from("x")].clone();

    let seen = Arc::new(Mutex::new(Vec::new()));
    let (seen_clone, x_clone) = (seen.clone(), x.clone());
    effect(
        move || seen_clone.lock().push(int(Some(x_clone.get()))),
        EffectOptions::new(),
    );

    view.set("x", 2).unwrap();
    x.set(3).unwrap();
    assert_eq!(view.get("x"), Some(Value::Int(3)));
    assert_eq!(*seen.lock(), vec![1, 2, 3]);
}

/// Test that a panicking effect leaves the effect stack usable.
#[test]
fn panicking_effect_does_not_corrupt_the_stack() {
    let view = observe(&RawObject::from_entries([("a", 1)]));
    let reader = view.clone();
    let e = effect(
        move || {
            if int(reader.get("a")) > 1 {
                panic!("effect failed");
            }
        },
        EffectOptions::new(),
    );

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| view.set("a", 2)));
    assert!(result.is_err());
    assert!(!EffectContext::is_active());

    // Unrelated effects still track normally.
    let runs = Arc::new(AtomicUsize::new(0));
    let (runs_clone, reader) = (runs.clone(), view.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            reader.get("b");
        },
        EffectOptions::new(),
    );
    view.set("b", 1).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
    stop(&e);
}

/// Test that a scheduler receives effects instead of them running.
#[test]
fn scheduler_defers_reruns() {
    let view = observe(&RawObject::from_entries([("a", 1)]));
    let queue = Arc::new(Mutex::new(Vec::new()));
    let runs = Arc::new(AtomicUsize::new(0));
    let (queue_clone, runs_clone, reader) = (queue.clone(), runs.clone(), view.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            reader.get("a");
        },
        EffectOptions::new().scheduler(move |e| queue_clone.lock().push(e.clone())),
    );

    view.set("a", 2).unwrap();
    view.set("a", 3).unwrap();
    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(queue.lock().len(), 2);

    let pending = std::mem::take(&mut *queue.lock());
    pending[0].run();
    assert_eq!(runs.load(Ordering::SeqCst), 2);
}

/// Test that an effect writing what it reads does not loop.
#[test]
fn self_triggering_effect_does_not_recurse() {
    let view = observe(&RawObject::from_entries([("n", 0)]));
    let runs = Arc::new(AtomicUsize::new(0));
    let (runs_clone, rw) = (runs.clone(), view.clone());
    effect(
        move || {
            runs_clone.fetch_add(1, Ordering::SeqCst);
            let n = int(rw.get("n"));
            rw.set("n", n + 1).unwrap();
        },
        EffectOptions::new(),
    );

    assert_eq!(runs.load(Ordering::SeqCst), 1);
    assert_eq!(view.get("n"), Some(Value::Int(1)));
}

/// Test that untracked reads subscribe nothing.
#[test]
fn untracked_reads_do_not_subscribe() {
    let view = observe(&RawObject::from_entries([("a", 1)]));
    let reader = view.clone();
    let e = effect(
        move || {
            untracked(|| reader.get("a"));
        },
        EffectOptions::new(),
    );
    assert_eq!(e.dep_count(), 0);
}
