//! Render-ready description of a CFG.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tacflow_core::{CoreError, NodeId, Program};

use crate::cfg::{ControlFlowGraph, Granularity, NodeKind};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionView {
    pub id: NodeId,
    pub text: String,
    /// Extra tag shown next to the instruction, e.g. a definition tag.
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub marker: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeView {
    pub id: NodeId,
    pub kind: NodeKind,
    pub instructions: Vec<InstructionView>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeView {
    pub from: NodeId,
    pub to: NodeId,
    pub is_back_edge: bool,
}

/// Nodes in graph order plus every edge with its back-edge flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GraphView {
    pub granularity: Granularity,
    pub nodes: Vec<NodeView>,
    pub edges: Vec<EdgeView>,
}

impl GraphView {
    pub fn new(
        program: &Program,
        graph: &ControlFlowGraph,
        markers: &BTreeMap<NodeId, String>,
    ) -> Result<Self, CoreError> {
        let mut nodes = Vec::with_capacity(graph.nodes().len());
        for &id in graph.nodes() {
            let kind = graph.node_kind(id).unwrap_or(NodeKind::Data);
            let instructions = graph
                .instructions_of(id)
                .iter()
                .map(|&instruction_id| {
                    let instruction = program
                        .instruction(instruction_id)
                        .ok_or(CoreError::InstructionNotFound { id: instruction_id })?;
                    Ok(InstructionView {
                        id: instruction_id,
                        text: instruction.to_string(),
                        marker: markers.get(&instruction_id).cloned(),
                    })
                })
                .collect::<Result<Vec<_>, CoreError>>()?;
            nodes.push(NodeView {
                id,
                kind,
                instructions,
            });
        }

        let edges = graph
            .edges()
            .into_iter()
            .map(|(from, to)| EdgeView {
                from,
                to,
                is_back_edge: graph.is_back_edge(from, to),
            })
            .collect();

        Ok(GraphView {
            granularity: graph.granularity(),
            nodes,
            edges,
        })
    }

    pub fn node(&self, id: NodeId) -> Option<&NodeView> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn back_edges(&self) -> impl Iterator<Item = &EdgeView> + '_ {
        self.edges.iter().filter(|edge| edge.is_back_edge)
    }
}
