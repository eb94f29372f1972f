//! Dependency buckets.

use std::fmt;
use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::Mutex;

use crate::reactive::{EffectId, ReactiveEffect};
use crate::value::PropertyKey;

/// Key of a bucket within a target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DepKey {
    /// A concrete property.
    Property(PropertyKey),
    /// Structural reads: enumeration and key counts.
    Iterate,
}

impl From<PropertyKey> for DepKey {
    fn from(key: PropertyKey) -> Self {
        DepKey::Property(key)
    }
}

impl fmt::Display for DepKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DepKey::Property(key) => write!(f, "{key}"),
            DepKey::Iterate => f.write_str("<iterate>"),
        }
    }
}

/// Buckets of one target, keyed by [`DepKey`].
pub type KeyToDepMap = IndexMap<DepKey, Arc<Dep>>;

/// Ordered set of effects subscribed to one `(target, key)` pair.
#[derive(Default)]
pub struct Dep {
    subscribers: Mutex<IndexMap<EffectId, ReactiveEffect>>,
}

impl Dep {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe `effect` and link this bucket into its dependency list.
    ///
    /// Returns `false` if the effect was already subscribed.
    pub fn link(self: &Arc<Self>, effect: &ReactiveEffect) -> bool {
        {
            let mut subscribers = self.subscribers.lock();
            if subscribers.contains_key(&effect.id()) {
                return false;
            }
            subscribers.insert(effect.id(), effect.clone());
        }
        effect.link_dep(self);
        true
    }

    /// Unsubscribe an effect. The removed handle is returned so the caller
    /// drops it outside the bucket lock.
    pub(crate) fn remove(&self, id: EffectId) -> Option<ReactiveEffect> {
        self.subscribers.lock().shift_remove(&id)
    }

    pub fn contains(&self, id: EffectId) -> bool {
        self.subscribers.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.subscribers.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Current subscribers in insertion order.
    pub fn snapshot(&self) -> Vec<ReactiveEffect> {
        self.subscribers.lock().values().cloned().collect()
    }
}

impl fmt::Debug for Dep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ids: Vec<EffectId> = self.subscribers.lock().keys().copied().collect();
        f.debug_struct("Dep").field("subscribers", &ids).finish()
    }
}
