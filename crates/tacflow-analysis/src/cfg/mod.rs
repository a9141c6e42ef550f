//! Control-flow graphs over a verified [`Program`](tacflow_core::Program).
//!
//! Two views share one representation:
//! - [`ControlFlowGraph::per_instruction`]: one data node per instruction.
//! - [`ControlFlowGraph::basic_blocks`]: one data node per basic block, found
//!   with the leader algorithm.
//!
//! Both reserve two fresh ids from the program for the synthetic Entry and
//! Exit nodes. A data node's id is the id of its first instruction. Adjacency
//! lives in a `petgraph` [`DiGraphMap`] keyed directly by [`NodeId`].
//!
//! Back edges are positional, not dominance-based: `from -> to` is a back
//! edge when `to` does not start strictly after `from` in program order.

mod block;
mod instruction;

pub use block::find_leaders;

use std::collections::{BTreeMap, BTreeSet};

use petgraph::graphmap::DiGraphMap;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use tacflow_core::NodeId;

/// Whether data nodes cover single instructions or basic blocks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    Instruction,
    BasicBlock,
}

/// Role of a CFG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    Entry,
    Exit,
    Data,
}

/// A control-flow graph with synthetic Entry and Exit nodes.
#[derive(Debug, Clone)]
pub struct ControlFlowGraph {
    granularity: Granularity,
    entry: NodeId,
    exit: NodeId,
    /// `[entry, data nodes in program order..., exit]`
    nodes: Vec<NodeId>,
    edges: DiGraphMap<NodeId, ()>,
    /// Data node -> instruction ids it covers, in program order.
    covered: BTreeMap<NodeId, Vec<NodeId>>,
    /// Data node -> program position of its first instruction.
    positions: BTreeMap<NodeId, usize>,
}

impl ControlFlowGraph {
    fn empty(granularity: Granularity, entry: NodeId, exit: NodeId) -> Self {
        let mut edges = DiGraphMap::new();
        edges.add_node(entry);
        ControlFlowGraph {
            granularity,
            entry,
            exit,
            nodes: vec![entry],
            edges,
            covered: BTreeMap::new(),
            positions: BTreeMap::new(),
        }
    }

    fn add_data_node(&mut self, id: NodeId, position: usize, instructions: Vec<NodeId>) {
        self.nodes.push(id);
        self.edges.add_node(id);
        self.covered.insert(id, instructions);
        self.positions.insert(id, position);
    }

    fn add_edge(&mut self, from: NodeId, to: NodeId) {
        self.edges.add_edge(from, to, ());
    }

    /// Appends the exit node; must be the last construction step.
    fn close(mut self) -> Self {
        self.nodes.push(self.exit);
        self.edges.add_node(self.exit);
        self
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    pub fn entry(&self) -> NodeId {
        self.entry
    }

    pub fn exit(&self) -> NodeId {
        self.exit
    }

    /// Every node id: Entry first, data nodes in program order, Exit last.
    pub fn nodes(&self) -> &[NodeId] {
        &self.nodes
    }

    /// Data node ids in program order.
    pub fn data_nodes(&self) -> &[NodeId] {
        let end = self.nodes.len().saturating_sub(1);
        &self.nodes[1.min(end)..end]
    }

    pub fn contains(&self, id: NodeId) -> bool {
        self.edges.contains_node(id)
    }

    pub fn is_data_node(&self, id: NodeId) -> bool {
        self.covered.contains_key(&id)
    }

    pub fn node_kind(&self, id: NodeId) -> Option<NodeKind> {
        if id == self.entry {
            Some(NodeKind::Entry)
        } else if id == self.exit {
            Some(NodeKind::Exit)
        } else if self.covered.contains_key(&id) {
            Some(NodeKind::Data)
        } else {
            None
        }
    }

    /// Instruction ids covered by a data node; empty for Entry/Exit.
    pub fn instructions_of(&self, id: NodeId) -> &[NodeId] {
        self.covered.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn successors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.neighbors(id, Direction::Outgoing)
    }

    pub fn predecessors(&self, id: NodeId) -> BTreeSet<NodeId> {
        self.neighbors(id, Direction::Incoming)
    }

    fn neighbors(&self, id: NodeId, direction: Direction) -> BTreeSet<NodeId> {
        if !self.edges.contains_node(id) {
            return BTreeSet::new();
        }
        self.edges.neighbors_directed(id, direction).collect()
    }

    /// Every edge, grouped by source in node order.
    pub fn edges(&self) -> Vec<(NodeId, NodeId)> {
        self.nodes
            .iter()
            .flat_map(|&from| self.successors(from).into_iter().map(move |to| (from, to)))
            .collect()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.edge_count()
    }

    /// Whether `from -> to` points backwards in program order.
    ///
    /// Edges touching Entry or Exit are never back edges. Self-loops are.
    pub fn is_back_edge(&self, from: NodeId, to: NodeId) -> bool {
        match (self.positions.get(&from), self.positions.get(&to)) {
            (Some(from), Some(to)) => to <= from,
            _ => false,
        }
    }
}
