//! Per-step snapshots of every node's facts.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use tacflow_core::NodeId;

use super::constants::ConstValue;
use crate::observe::{ObservationStore, Observed};

/// Which per-node fact a value belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactKind {
    Use,
    Def,
    Gen,
    Kill,
    In,
    Out,
}

/// A fact payload: a set of names or a per-variable lattice map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactValue {
    Set(BTreeSet<String>),
    Constants(BTreeMap<String, ConstValue>),
}

impl FactValue {
    pub fn as_set(&self) -> Option<&BTreeSet<String>> {
        match self {
            FactValue::Set(set) => Some(set),
            FactValue::Constants(_) => None,
        }
    }

    pub fn as_constants(&self) -> Option<&BTreeMap<String, ConstValue>> {
        match self {
            FactValue::Constants(map) => Some(map),
            FactValue::Set(_) => None,
        }
    }
}

/// What the step that produced a snapshot did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Initialized,
    InComputed,
    OutComputed,
    Ended,
}

/// Facts of one node, keyed by kind.
pub type NodeFacts = BTreeMap<FactKind, Observed<FactValue>>;

/// A deep copy of all node facts after one engine step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Node recomputed by this step; `None` for initialized/ended.
    pub current_node: Option<NodeId>,
    pub phase: Phase,
    /// 1-based sweep counter; 0 before the first sweep.
    pub sweep: usize,
    pub nodes: BTreeMap<NodeId, NodeFacts>,
}

impl Snapshot {
    pub fn fact(&self, node: NodeId, kind: FactKind) -> Option<&Observed<FactValue>> {
        self.nodes.get(&node)?.get(&kind)
    }

    pub fn set(&self, node: NodeId, kind: FactKind) -> Option<&BTreeSet<String>> {
        self.fact(node, kind)?.data.as_set()
    }

    pub fn constants(&self, node: NodeId, kind: FactKind) -> Option<&BTreeMap<String, ConstValue>> {
        self.fact(node, kind)?.data.as_constants()
    }

    /// Nodes whose `kind` fact was changed by this step.
    pub fn changed(&self, kind: FactKind) -> BTreeSet<NodeId> {
        self.nodes
            .iter()
            .filter(|(_, facts)| facts.get(&kind).is_some_and(|fact| fact.was_changed))
            .map(|(&id, _)| id)
            .collect()
    }
}

/// Copies one store into `facts` under `kind`.
pub(crate) fn record<V: Clone>(
    facts: &mut BTreeMap<NodeId, NodeFacts>,
    kind: FactKind,
    store: &ObservationStore<V>,
    wrap: fn(V) -> FactValue,
) {
    for (id, observed) in store.observed() {
        facts.entry(id).or_default().insert(
            kind,
            Observed {
                data: wrap(observed.data),
                was_looked_at: observed.was_looked_at,
                was_changed: observed.was_changed,
            },
        );
    }
}
