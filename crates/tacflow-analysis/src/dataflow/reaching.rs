//! Reaching definitions (forward, may).
//!
//! Every assigning instruction gets a tag `d1, d2, ...` in program order.

use std::collections::{BTreeMap, BTreeSet};

use tacflow_core::{CoreError, NodeId, Program};

use super::engine::{Analysis, Direction, FixpointEngine};
use super::snapshot::{record, FactKind, FactValue, NodeFacts};
use crate::cfg::ControlFlowGraph;
use crate::observe::ObservationStore;

type Tags = BTreeSet<String>;

/// Instruction id -> definition tag, for every instruction that assigns.
pub fn definition_tags(program: &Program) -> BTreeMap<NodeId, String> {
    program
        .iter()
        .filter(|(_, instruction)| instruction.defined_variable().is_some())
        .enumerate()
        .map(|(i, (id, _))| (id, format!("d{}", i + 1)))
        .collect()
}

#[derive(Debug)]
pub struct ReachingDefinitions {
    graph: ControlFlowGraph,
    tags: BTreeMap<NodeId, String>,
    generated: ObservationStore<Tags>,
    kill: ObservationStore<Tags>,
    reach_in: ObservationStore<Tags>,
    reach_out: ObservationStore<Tags>,
}

impl ReachingDefinitions {
    pub fn new(program: &Program, graph: ControlFlowGraph) -> Result<Self, CoreError> {
        let tags = definition_tags(program);

        let mut writers: BTreeMap<&str, Tags> = BTreeMap::new();
        for (id, instruction) in program.iter() {
            if let (Some(name), Some(tag)) = (instruction.defined_variable(), tags.get(&id)) {
                writers.entry(name).or_default().insert(tag.clone());
            }
        }

        let mut gens = BTreeMap::new();
        let mut kills = BTreeMap::new();
        for &node in graph.nodes() {
            // variable -> tag of its last write in the node
            let mut last_write: BTreeMap<&str, &String> = BTreeMap::new();
            for &id in graph.instructions_of(node) {
                let instruction = program
                    .instruction(id)
                    .ok_or(CoreError::InstructionNotFound { id })?;
                if let (Some(name), Some(tag)) = (instruction.defined_variable(), tags.get(&id)) {
                    last_write.insert(name, tag);
                }
            }

            let generated: Tags = last_write.values().map(|tag| tag.to_string()).collect();
            let kill: Tags = last_write
                .keys()
                .filter_map(|name| writers.get(name))
                .flatten()
                .filter(|tag| !generated.contains(*tag))
                .cloned()
                .collect();
            gens.insert(node, generated);
            kills.insert(node, kill);
        }

        let empty: BTreeMap<NodeId, Tags> =
            graph.nodes().iter().map(|&n| (n, Tags::new())).collect();

        Ok(ReachingDefinitions {
            tags,
            generated: ObservationStore::new(gens),
            kill: ObservationStore::new(kills),
            reach_in: ObservationStore::new(empty.clone()),
            reach_out: ObservationStore::new(empty),
            graph,
        })
    }

    pub fn engine(self) -> FixpointEngine<Self> {
        FixpointEngine::new(self)
    }

    pub fn tags(&self) -> &BTreeMap<NodeId, String> {
        &self.tags
    }
}

impl Analysis for ReachingDefinitions {
    const NAME: &'static str = "reaching-definitions";
    const DIRECTION: Direction = Direction::Forward;

    fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    fn compute_in(&mut self, node: NodeId) -> bool {
        let mut reaching = Tags::new();
        for pred in self.graph.predecessors(node) {
            if let Some(out) = self.reach_out.read(pred) {
                reaching.extend(out.iter().cloned());
            }
        }
        self.reach_in.replace(node, |_| reaching)
    }

    fn compute_out(&mut self, node: NodeId) -> bool {
        let mut out = self.generated.read(node).cloned().unwrap_or_default();
        let kill = self.kill.read(node).cloned().unwrap_or_default();
        if let Some(reaching) = self.reach_in.read(node) {
            out.extend(reaching.difference(&kill).cloned());
        }
        self.reach_out.replace(node, |_| out)
    }

    fn reset_observation(&mut self) {
        self.generated.reset_observation();
        self.kill.reset_observation();
        self.reach_in.reset_observation();
        self.reach_out.reset_observation();
    }

    fn facts(&self) -> BTreeMap<NodeId, NodeFacts> {
        let mut facts = BTreeMap::new();
        record(&mut facts, FactKind::Gen, &self.generated, FactValue::Set);
        record(&mut facts, FactKind::Kill, &self.kill, FactValue::Set);
        record(&mut facts, FactKind::In, &self.reach_in, FactValue::Set);
        record(&mut facts, FactKind::Out, &self.reach_out, FactValue::Set);
        facts
    }
}
