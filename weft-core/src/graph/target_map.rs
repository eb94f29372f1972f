//! The global target map.
//!
//! Maps each target's identity token to its buckets. This is a process-wide
//! singleton; the mutex only protects the map structure itself and is never
//! held while effects run or while anything is dropped.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock, Weak};

use parking_lot::Mutex;

use super::dep::{Dep, DepKey, KeyToDepMap};
use crate::reactive::ReactiveEffect;
use crate::value::ObjectId;

// Targets map to their buckets. A target appears here once it has been
// wrapped or read inside an effect.
static TARGET_MAP: OnceLock<Mutex<HashMap<ObjectId, KeyToDepMap>>> = OnceLock::new();

fn get_target_map() -> &'static Mutex<HashMap<ObjectId, KeyToDepMap>> {
    TARGET_MAP.get_or_init(|| Mutex::new(HashMap::new()))
}

/// Create the (empty) bucket map for a target if it has none yet.
pub fn ensure_target(target: ObjectId) {
    get_target_map().lock().entry(target).or_default();
}

/// Whether the target has a bucket map.
pub fn is_tracked(target: ObjectId) -> bool {
    get_target_map().lock().contains_key(&target)
}

/// Drop every bucket of a target.
///
/// Called when the target itself is dropped.
pub fn release_target(target: ObjectId) {
    let removed = get_target_map().lock().remove(&target);
    // Buckets own effects, and effects own arbitrary closures. Let them go
    // only after the map lock is released.
    drop(removed);
}

/// The bucket for `(target, key)`, if one exists.
pub fn lookup(target: ObjectId, key: &DepKey) -> Option<Arc<Dep>> {
    get_target_map()
        .lock()
        .get(&target)
        .and_then(|deps| deps.get(key))
        .cloned()
}

/// Subscribe `effect` to `(target, key)`, creating the bucket if needed.
///
/// Returns `true` if this is a new subscription.
pub fn record(target: ObjectId, key: DepKey, effect: &ReactiveEffect) -> bool {
    let dep = {
        let mut map = get_target_map().lock();
        map.entry(target)
            .or_default()
            .entry(key)
            .or_insert_with(|| Arc::new(Dep::new()))
            .clone()
    };
    dep.link(effect)
}

/// Remove `effect` from every bucket it belongs to and clear its list.
pub fn forget(effect: &ReactiveEffect) {
    let deps = effect.take_deps();
    let removed: Vec<ReactiveEffect> = deps
        .iter()
        .filter_map(Weak::upgrade)
        .filter_map(|dep| dep.remove(effect.id()))
        .collect();
    drop(removed);
}

/// Buckets of `target` for the given keys, skipping absent ones.
///
/// Returns `None` if the target was never tracked.
pub fn buckets(target: ObjectId, keys: &[DepKey]) -> Option<Vec<Arc<Dep>>> {
    let map = get_target_map().lock();
    let deps = map.get(&target)?;
    Some(keys.iter().filter_map(|key| deps.get(key).cloned()).collect())
}

/// Every bucket of `target`, in creation order.
///
/// Returns `None` if the target was never tracked.
pub fn all_buckets(target: ObjectId) -> Option<Vec<Arc<Dep>>> {
    let map = get_target_map().lock();
    map.get(&target).map(|deps| deps.values().cloned().collect())
}

/// Number of effects subscribed to `(target, key)`.
pub fn subscriber_count(target: ObjectId, key: &DepKey) -> usize {
    lookup(target, key).map_or(0, |dep| dep.len())
}
