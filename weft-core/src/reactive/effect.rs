//! Effect Implementation
//!
//! An Effect is a re-runnable computation whose dependencies are discovered
//! by running it.
//!
//! # How Effects Work
//!
//! 1. When created (unless lazy), the effect runs its action immediately to
//!    establish initial dependencies.
//!
//! 2. Every tracked read during a run subscribes the effect to the bucket of
//!    the `(target, key)` read.
//!
//! 3. When a mutation hits one of those buckets, the trigger protocol either
//!    runs the effect again or hands it to the effect's scheduler.
//!
//! 4. Before each run the effect forgets all of its previous subscriptions,
//!    so a branch that is no longer read stops notifying it.
//!
//! # Recursion
//!
//! An effect that is already running is never re-entered. If an effect
//! mutates data it also reads, the resulting notification reaches the running
//! effect and is dropped rather than recursing.
//!
//! # Failure
//!
//! If the action panics, the panic propagates to whoever ran the effect. The
//! effect stack guard pops the effect on the way out, so the recursion guard
//! stays correct for later, unrelated effects.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use smallvec::SmallVec;
use tracing::{debug, trace};

use super::context::EffectContext;
use super::operations::DebuggerEvent;
use super::subscriber::EffectId;
use crate::graph::{self, Dep};

/// Callback that takes over re-execution of a triggered effect.
pub type Scheduler = Arc<dyn Fn(&ReactiveEffect) + Send + Sync>;

/// Debug callback fired when a dependency is recorded or a trigger fires.
pub type DebuggerHook = Arc<dyn Fn(&DebuggerEvent) + Send + Sync>;

/// Callback fired once when an effect is stopped.
pub type StopHook = Arc<dyn Fn() + Send + Sync>;

/// The action an effect runs.
///
/// Built from any `Fn()` closure, or from an existing effect, in which case
/// the effect's underlying action is reused instead of wrapping the effect.
#[derive(Clone)]
pub struct EffectFn(Arc<dyn Fn() + Send + Sync>);

impl EffectFn {
    fn call(&self) {
        (self.0)();
    }
}

impl<F> From<F> for EffectFn
where
    F: Fn() + Send + Sync + 'static,
{
    fn from(f: F) -> Self {
        Self(Arc::new(f))
    }
}

impl From<&ReactiveEffect> for EffectFn {
    fn from(effect: &ReactiveEffect) -> Self {
        effect.raw()
    }
}

impl From<ReactiveEffect> for EffectFn {
    fn from(effect: ReactiveEffect) -> Self {
        effect.raw()
    }
}

/// Configuration for [`effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    lazy: bool,
    computed: bool,
    scheduler: Option<Scheduler>,
    on_track: Option<DebuggerHook>,
    on_trigger: Option<DebuggerHook>,
    on_stop: Option<StopHook>,
}

impl EffectOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Do not run the effect on creation.
    pub fn lazy(mut self) -> Self {
        self.lazy = true;
        self
    }

    /// Mark the effect as backing a derived value. Such effects are notified
    /// before plain effects.
    pub fn computed(mut self) -> Self {
        self.computed = true;
        self
    }

    /// Hand triggered runs to `scheduler` instead of running synchronously.
    pub fn scheduler<F>(mut self, scheduler: F) -> Self
    where
        F: Fn(&ReactiveEffect) + Send + Sync + 'static,
    {
        self.scheduler = Some(Arc::new(scheduler));
        self
    }

    pub fn on_track<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebuggerEvent) + Send + Sync + 'static,
    {
        self.on_track = Some(Arc::new(hook));
        self
    }

    pub fn on_trigger<F>(mut self, hook: F) -> Self
    where
        F: Fn(&DebuggerEvent) + Send + Sync + 'static,
    {
        self.on_trigger = Some(Arc::new(hook));
        self
    }

    pub fn on_stop<F>(mut self, hook: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.on_stop = Some(Arc::new(hook));
        self
    }
}

impl fmt::Debug for EffectOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EffectOptions")
            .field("lazy", &self.lazy)
            .field("computed", &self.computed)
            .field("scheduler", &self.scheduler.is_some())
            .field("on_track", &self.on_track.is_some())
            .field("on_trigger", &self.on_trigger.is_some())
            .field("on_stop", &self.on_stop.is_some())
            .finish()
    }
}

struct EffectInner {
    id: EffectId,
    action: EffectFn,
    active: AtomicBool,
    /// Buckets this effect is subscribed to, held weakly.
    deps: Mutex<SmallVec<[Weak<Dep>; 4]>>,
    options: EffectOptions,
    run_count: AtomicUsize,
}

/// A registered, re-runnable computation with tracked dependencies.
///
/// Cloning shares the same effect.
#[derive(Clone)]
pub struct ReactiveEffect(Arc<EffectInner>);

impl ReactiveEffect {
    fn new(action: EffectFn, options: EffectOptions) -> Self {
        Self(Arc::new(EffectInner {
            id: EffectId::new(),
            action,
            active: AtomicBool::new(true),
            deps: Mutex::new(SmallVec::new()),
            options,
            run_count: AtomicUsize::new(0),
        }))
    }

    pub fn id(&self) -> EffectId {
        self.0.id
    }

    pub fn is_active(&self) -> bool {
        self.0.active.load(Ordering::SeqCst)
    }

    pub fn is_computed(&self) -> bool {
        self.0.options.computed
    }

    /// The underlying action.
    pub fn raw(&self) -> EffectFn {
        self.0.action.clone()
    }

    /// Number of times the action has executed.
    pub fn run_count(&self) -> usize {
        self.0.run_count.load(Ordering::SeqCst)
    }

    /// Number of buckets the effect is currently subscribed to.
    pub fn dep_count(&self) -> usize {
        self.0
            .deps
            .lock()
            .iter()
            .filter(|dep| dep.strong_count() > 0)
            .count()
    }

    /// Run the effect.
    ///
    /// A stopped effect runs its action once, untracked. An effect already
    /// on the stack is not re-entered. Otherwise the effect forgets its old
    /// dependencies and runs with fresh tracking.
    ///
    /// Actions return `()`, so a run yields no value. Derived values are
    /// read through [`Computed`](crate::reactive::Computed), or written by
    /// the action into state it captures.
    pub fn run(&self) {
        if !self.is_active() {
            self.execute();
            return;
        }

        if EffectContext::contains(self.id()) {
            trace!(effect = %self.id(), "effect already running, skipping re-entry");
            return;
        }

        graph::forget(self);

        let _ctx = EffectContext::enter(self);
        self.execute();
    }

    fn execute(&self) {
        self.0.run_count.fetch_add(1, Ordering::SeqCst);
        self.0.action.call();
    }

    pub(crate) fn scheduler(&self) -> Option<&Scheduler> {
        self.0.options.scheduler.as_ref()
    }

    pub(crate) fn on_track(&self) -> Option<&DebuggerHook> {
        self.0.options.on_track.as_ref()
    }

    pub(crate) fn on_trigger(&self) -> Option<&DebuggerHook> {
        self.0.options.on_trigger.as_ref()
    }

    pub(crate) fn link_dep(&self, dep: &Arc<Dep>) {
        self.0.deps.lock().push(Arc::downgrade(dep));
    }

    pub(crate) fn take_deps(&self) -> SmallVec<[Weak<Dep>; 4]> {
        std::mem::take(&mut *self.0.deps.lock())
    }

    /// Live buckets the effect is subscribed to.
    pub(crate) fn deps(&self) -> Vec<Arc<Dep>> {
        self.0.deps.lock().iter().filter_map(Weak::upgrade).collect()
    }
}

impl PartialEq for ReactiveEffect {
    fn eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl Eq for ReactiveEffect {}

impl fmt::Debug for ReactiveEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReactiveEffect")
            .field("id", &self.id())
            .field("active", &self.is_active())
            .field("computed", &self.is_computed())
            .field("run_count", &self.run_count())
            .field("dep_count", &self.dep_count())
            .finish()
    }
}

/// Register an effect.
///
/// Unless `options` is lazy, the effect runs once before this returns.
/// Passing an existing effect registers a new effect over its action.
pub fn effect(action: impl Into<EffectFn>, options: EffectOptions) -> ReactiveEffect {
    let lazy = options.lazy;
    let effect = ReactiveEffect::new(action.into(), options);
    if !lazy {
        effect.run();
    }
    effect
}

/// Permanently deactivate an effect.
///
/// Removes it from every bucket and fires its `on_stop` hook. Stopping an
/// already stopped effect does nothing.
pub fn stop(effect: &ReactiveEffect) {
    if !effect.0.active.swap(false, Ordering::SeqCst) {
        return;
    }
    graph::forget(effect);
    if let Some(on_stop) = &effect.0.options.on_stop {
        on_stop();
    }
    debug!(effect = %effect.id(), "effect stopped");
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicI32;

    fn counter() -> (Arc<AtomicI32>, impl Fn() + Send + Sync + 'static) {
        let count = Arc::new(AtomicI32::new(0));
        let count_clone = count.clone();
        (count, move || {
            count_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn effect_runs_on_creation() {
        let (count, action) = counter();
        let e = effect(action, EffectOptions::new());

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(e.run_count(), 1);
        assert!(e.is_active());
    }

    #[test]
    fn lazy_effect_does_not_run_on_creation() {
        let (count, action) = counter();
        let e = effect(action, EffectOptions::new().lazy());

        assert_eq!(count.load(Ordering::SeqCst), 0);

        e.run();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn rewrapping_reuses_the_underlying_action() {
        let (count, action) = counter();
        let first = effect(action, EffectOptions::new());
        let second = effect(&first, EffectOptions::new());

        assert_ne!(first.id(), second.id());
        assert_eq!(count.load(Ordering::SeqCst), 2);
        // The second effect did not run the first effect as its action.
        assert_eq!(first.run_count(), 1);
        assert_eq!(second.run_count(), 1);
    }

    #[test]
    fn stopped_effect_runs_untracked_when_called() {
        let (count, action) = counter();
        let e = effect(action, EffectOptions::new());
        stop(&e);

        e.run();
        assert_eq!(count.load(Ordering::SeqCst), 2);
        assert!(!e.is_active());
        assert!(!EffectContext::is_active());
    }

    #[test]
    fn stop_is_idempotent() {
        let stops = Arc::new(AtomicI32::new(0));
        let stops_clone = stops.clone();
        let e = effect(
            || {},
            EffectOptions::new().on_stop(move || {
                stops_clone.fetch_add(1, Ordering::SeqCst);
            }),
        );

        stop(&e);
        stop(&e);
        assert_eq!(stops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn effect_does_not_reenter_itself() {
        let slot: Arc<Mutex<Option<ReactiveEffect>>> = Arc::new(Mutex::new(None));
        let slot_clone = slot.clone();
        let runs = Arc::new(AtomicI32::new(0));
        let runs_clone = runs.clone();

        let e = effect(
            move || {
                runs_clone.fetch_add(1, Ordering::SeqCst);
                let me = slot_clone.lock().clone();
                if let Some(me) = me {
                    me.run();
                }
            },
            EffectOptions::new().lazy(),
        );
        *slot.lock() = Some(e.clone());

        e.run();
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_effect_unwinds_the_stack() {
        let e = effect(|| panic!("boom"), EffectOptions::new().lazy());

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| e.run()));
        assert!(result.is_err());
        assert!(!EffectContext::is_active());
        assert!(!EffectContext::contains(e.id()));
    }

    #[test]
    fn clones_share_state() {
        let e1 = effect(|| {}, EffectOptions::new());
        let e2 = e1.clone();

        assert_eq!(e1, e2);
        e1.run();
        assert_eq!(e2.run_count(), 2);

        stop(&e1);
        assert!(!e2.is_active());
    }
}
