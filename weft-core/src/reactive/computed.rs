//! Computed Implementation
//!
//! A Computed is a cached derived value that re-evaluates only when its
//! dependencies change.
//!
//! # How Computeds Work
//!
//! 1. The computed owns a lazy effect flagged as computed. Its action runs
//!    the getter and caches the result.
//!
//! 2. The effect's scheduler does not re-run anything; it only marks the
//!    cached value dirty. Since the trigger protocol notifies computed
//!    effects before plain ones, every computed is dirty by the time a plain
//!    effect re-runs and reads it.
//!
//! 3. On the next `get`, a dirty computed re-runs its effect, which also
//!    refreshes its dependencies.
//!
//! 4. After every `get`, the running effect (if any) is subscribed to every
//!    bucket the computed depends on. A reader of a computed therefore
//!    re-runs whenever the computed's inputs change.
//!
//! # Why This Matters
//!
//! A computed that is never read never recomputes, no matter how often its
//! inputs change.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use tracing::warn;

use super::context::{self, EffectContext};
use super::effect::{effect, stop, EffectOptions, ReactiveEffect};

type Getter<T> = Arc<dyn Fn() -> T + Send + Sync>;
type Setter<T> = Arc<dyn Fn(T) + Send + Sync>;

struct ComputedInner<T> {
    getter: Getter<T>,
    setter: Option<Setter<T>>,
    value: RwLock<Option<T>>,
    dirty: AtomicBool,
    effect: ReactiveEffect,
}

impl<T> Drop for ComputedInner<T> {
    fn drop(&mut self) {
        stop(&self.effect);
    }
}

/// A cached derived value.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(RawObject::from_entries([("count", 1)]));
/// let view = state.as_reactive().cloned().unwrap();
/// let doubled = Computed::new(move || {
///     view.get("count").and_then(|v| v.as_int()).unwrap_or(0) * 2
/// });
///
/// assert_eq!(doubled.get(), 2);
/// ```
pub struct Computed<T>(Arc<ComputedInner<T>>)
where
    T: Clone + Default + Send + Sync + 'static;

/// Re-marks the computed dirty if the getter panics.
struct DirtyGuard<'a> {
    dirty: &'a AtomicBool,
    done: bool,
}

impl Drop for DirtyGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.dirty.store(true, Ordering::SeqCst);
        }
    }
}

impl<T> Computed<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    /// Create a read-only computed. The getter first runs on the first `get`.
    pub fn new<F>(getter: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        Self::build(Arc::new(getter), None)
    }

    /// Create a computed whose `set` calls `setter`.
    pub fn with_setter<F, S>(getter: F, setter: S) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
        S: Fn(T) + Send + Sync + 'static,
    {
        Self::build(Arc::new(getter), Some(Arc::new(setter)))
    }

    fn build(getter: Getter<T>, setter: Option<Setter<T>>) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<ComputedInner<T>>| {
            let for_action = weak.clone();
            let for_scheduler = weak.clone();
            let runner = effect(
                move || {
                    if let Some(inner) = for_action.upgrade() {
                        let value = (inner.getter)();
                        *inner.value.write() = Some(value);
                    }
                },
                EffectOptions::new()
                    .lazy()
                    .computed()
                    .scheduler(move |_| {
                        if let Some(inner) = for_scheduler.upgrade() {
                            inner.dirty.store(true, Ordering::SeqCst);
                        }
                    }),
            );
            ComputedInner {
                getter,
                setter,
                value: RwLock::new(None),
                dirty: AtomicBool::new(true),
                effect: runner,
            }
        });
        Self(inner)
    }

    /// Current value, recomputed first if dirty.
    ///
    /// Inside an effect, also subscribes that effect to the computed's inputs.
    pub fn get(&self) -> T {
        // Clearing first makes a re-entrant read return the cached value
        // instead of recursing.
        if self.0.dirty.swap(false, Ordering::SeqCst) {
            let mut guard = DirtyGuard {
                dirty: &self.0.dirty,
                done: false,
            };
            self.0.effect.run();
            guard.done = true;
        }
        self.track_child_run();
        self.0.value.read().clone().unwrap_or_default()
    }

    /// Link the running effect into every bucket this computed reads.
    fn track_child_run(&self) {
        if !context::is_tracking() {
            return;
        }
        let Some(parent) = EffectContext::current() else {
            return;
        };
        if parent == self.0.effect {
            return;
        }
        for dep in self.0.effect.deps() {
            dep.link(&parent);
        }
    }

    /// Pass `value` to the setter. Without a setter this only warns.
    pub fn set(&self, value: T) {
        match &self.0.setter {
            Some(setter) => setter(value),
            None => {
                if cfg!(debug_assertions) {
                    warn!("write operation failed: computed value is readonly");
                }
            }
        }
    }

    /// The backing effect.
    pub fn effect(&self) -> &ReactiveEffect {
        &self.0.effect
    }

    pub fn is_dirty(&self) -> bool {
        self.0.dirty.load(Ordering::SeqCst)
    }

    pub fn has_setter(&self) -> bool {
        self.0.setter.is_some()
    }

    /// Stop tracking inputs. The cached value stays readable and no longer
    /// updates, except through explicit re-runs of the stopped effect.
    pub fn stop(&self) {
        stop(&self.0.effect);
    }
}

impl<T> Clone for Computed<T>
where
    T: Clone + Default + Send + Sync + 'static,
{
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<T> fmt::Debug for Computed<T>
where
    T: Clone + Default + Send + Sync + fmt::Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("effect", &self.0.effect.id())
            .field("dirty", &self.is_dirty())
            .field("value", &*self.0.value.read())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
