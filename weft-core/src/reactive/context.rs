//! Effect Context
//!
//! The effect context tracks which effect is currently running. This is what
//! makes dependency tracking automatic: when a view is read, the read is
//! recorded against the effect on top of the stack.
//!
//! # Implementation
//!
//! We use a thread-local stack of running effects. Running an effect pushes
//! it; the returned guard pops it when dropped, so the stack stays balanced
//! even if the effect panics.
//!
//! The stack also provides the recursion guard: an effect that is already on
//! the stack is never entered again.
//!
//! Next to the stack lives the tracking flag. While tracking is paused, reads
//! inside effects record nothing. The flag is a single boolean, not a
//! counter: `pause_tracking` / `resume_tracking` must be paired by the caller.
//! [`untracked`] is the scoped form that restores the previous state.

use std::cell::{Cell, RefCell};

use super::effect::ReactiveEffect;
use super::EffectId;

thread_local! {
    static EFFECT_STACK: RefCell<Vec<ReactiveEffect>> = RefCell::new(Vec::new());
    static SHOULD_TRACK: Cell<bool> = Cell::new(true);
}

/// Guard that pops the effect stack when dropped.
pub struct EffectContext {
    effect_id: EffectId,
}

impl EffectContext {
    /// Push `effect` onto the stack.
    ///
    /// While the returned guard is alive, tracked reads subscribe `effect`.
    pub(crate) fn enter(effect: &ReactiveEffect) -> Self {
        EFFECT_STACK.with(|stack| stack.borrow_mut().push(effect.clone()));
        Self {
            effect_id: effect.id(),
        }
    }

    /// Check if any effect is running.
    pub fn is_active() -> bool {
        EFFECT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// The effect on top of the stack, if any.
    pub fn current() -> Option<ReactiveEffect> {
        EFFECT_STACK.with(|stack| stack.borrow().last().cloned())
    }

    /// Whether the effect is anywhere on the stack.
    pub fn contains(id: EffectId) -> bool {
        EFFECT_STACK.with(|stack| stack.borrow().iter().any(|effect| effect.id() == id))
    }

    /// Number of nested running effects.
    pub fn depth() -> usize {
        EFFECT_STACK.with(|stack| stack.borrow().len())
    }
}

impl Drop for EffectContext {
    fn drop(&mut self) {
        let popped = EFFECT_STACK.with(|stack| stack.borrow_mut().pop());

        // Verify we're popping the right effect.
        if let Some(effect) = &popped {
            debug_assert_eq!(
                effect.id(),
                self.effect_id,
                "EffectContext mismatch: expected {}, got {}",
                self.effect_id,
                effect.id()
            );
        }
    }
}

/// Stop recording dependencies until [`resume_tracking`].
pub fn pause_tracking() {
    SHOULD_TRACK.with(|flag| flag.set(false));
}

/// Resume recording dependencies.
pub fn resume_tracking() {
    SHOULD_TRACK.with(|flag| flag.set(true));
}

/// Whether reads are currently recorded.
pub fn is_tracking() -> bool {
    SHOULD_TRACK.with(Cell::get)
}

struct TrackingGuard {
    previous: bool,
}

impl TrackingGuard {
    fn pause() -> Self {
        let previous = is_tracking();
        pause_tracking();
        Self { previous }
    }
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        SHOULD_TRACK.with(|flag| flag.set(self.previous));
    }
}

/// Run `f` without recording dependencies, restoring the previous tracking
/// state afterwards (also on panic).
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let _guard = TrackingGuard::pause();
    f()
}
