//! Instrumented fact storage.
//!
//! An [`ObservationStore`] maps node ids to fact values and remembers which
//! ids were read and which were changed since the last
//! [`reset_observation`](ObservationStore::reset_observation). Engines keep
//! one store per fact kind and reset them before every step, so each snapshot
//! shows exactly what that step touched.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use tacflow_core::NodeId;

/// A fact value tagged with the instrumentation flags of the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Observed<T> {
    pub data: T,
    pub was_looked_at: bool,
    pub was_changed: bool,
}

/// Node id -> value map with read/change tracking.
#[derive(Debug, Clone)]
pub struct ObservationStore<V> {
    values: BTreeMap<NodeId, V>,
    looked_at: BTreeSet<NodeId>,
    changed: BTreeSet<NodeId>,
    equal: fn(&V, &V) -> bool,
}

impl<V: PartialEq> ObservationStore<V> {
    /// A store whose change detection uses `PartialEq`.
    pub fn new(values: BTreeMap<NodeId, V>) -> Self {
        Self::with_equality(values, <V as PartialEq>::eq)
    }
}

impl<V> ObservationStore<V> {
    /// A store with a caller-supplied equality for change detection.
    pub fn with_equality(values: BTreeMap<NodeId, V>, equal: fn(&V, &V) -> bool) -> Self {
        ObservationStore {
            values,
            looked_at: BTreeSet::new(),
            changed: BTreeSet::new(),
            equal,
        }
    }

    /// Returns the value of `id` and marks it as looked at.
    pub fn read(&mut self, id: NodeId) -> Option<&V> {
        self.looked_at.insert(id);
        self.values.get(&id)
    }

    /// Returns the value of `id` without touching the instrumentation.
    pub fn read_raw(&self, id: NodeId) -> Option<&V> {
        self.values.get(&id)
    }

    /// Clears both tracking sets; values are kept.
    pub fn reset_observation(&mut self) {
        self.looked_at.clear();
        self.changed.clear();
    }

    pub fn looked_at(&self) -> &BTreeSet<NodeId> {
        &self.looked_at
    }

    pub fn changed(&self) -> &BTreeSet<NodeId> {
        &self.changed
    }

    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.values.keys().copied()
    }
}

impl<V: Clone + Default> ObservationStore<V> {
    /// Stores `f(old)` for `id` and reports whether the value changed.
    ///
    /// A missing entry is treated as `V::default()`. The new value is stored
    /// even when it compares equal to the old one.
    pub fn replace(&mut self, id: NodeId, f: impl FnOnce(&V) -> V) -> bool {
        let old = self.values.get(&id).cloned().unwrap_or_default();
        let new = f(&old);
        let changed = !(self.equal)(&old, &new);
        if changed {
            self.changed.insert(id);
        }
        self.values.insert(id, new);
        changed
    }
}

impl<V: Clone> ObservationStore<V> {
    /// Deep copy of every value with this step's flags attached.
    pub fn observed(&self) -> BTreeMap<NodeId, Observed<V>> {
        self.values
            .iter()
            .map(|(&id, value)| {
                (
                    id,
                    Observed {
                        data: value.clone(),
                        was_looked_at: self.looked_at.contains(&id),
                        was_changed: self.changed.contains(&id),
                    },
                )
            })
            .collect()
    }

    /// Snapshot of the plain values, without flags.
    pub fn values(&self) -> BTreeMap<NodeId, V> {
        self.values.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> ObservationStore<BTreeSet<String>> {
        let values = [(NodeId(0), BTreeSet::new()), (NodeId(1), BTreeSet::new())]
            .into_iter()
            .collect();
        ObservationStore::new(values)
    }

    fn names(raw: &[&str]) -> BTreeSet<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn read_marks_and_read_raw_does_not() {
        let mut store = store();
        store.read_raw(NodeId(0));
        assert!(store.looked_at().is_empty());
        store.read(NodeId(1));
        assert!(store.looked_at().contains(&NodeId(1)));
    }

    #[test]
    fn replace_tracks_real_changes_only() {
        let mut store = store();
        assert!(store.replace(NodeId(0), |_| names(&["a"])));
        assert!(!store.replace(NodeId(0), |old| old.clone()));
        assert_eq!(store.changed().len(), 1);
        assert_eq!(store.read_raw(NodeId(0)), Some(&names(&["a"])));
    }

    #[test]
    fn reset_keeps_values() {
        let mut store = store();
        store.replace(NodeId(1), |_| names(&["x", "y"]));
        store.read(NodeId(1));
        store.reset_observation();
        assert!(store.changed().is_empty());
        assert!(store.looked_at().is_empty());
        assert_eq!(store.read_raw(NodeId(1)).map(BTreeSet::len), Some(2));
    }

    #[test]
    fn observed_is_a_detached_copy() {
        let mut store = store();
        store.replace(NodeId(0), |_| names(&["a"]));
        let copy = store.observed();
        store.replace(NodeId(0), |_| names(&["b"]));

        assert_eq!(copy[&NodeId(0)].data, names(&["a"]));
        assert!(copy[&NodeId(0)].was_changed);
        assert!(!copy[&NodeId(1)].was_looked_at);
    }

    #[test]
    fn custom_equality_decides_change() {
        let values = [(NodeId(0), 1i64)].into_iter().collect();
        let mut store =
            ObservationStore::with_equality(values, |a: &i64, b: &i64| a.signum() == b.signum());
        assert!(!store.replace(NodeId(0), |_| 7));
        assert!(store.replace(NodeId(0), |_| -7));
    }
}
