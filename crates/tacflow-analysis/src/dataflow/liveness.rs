//! Live-variable analysis (backward, may).

use std::collections::{BTreeMap, BTreeSet};

use tacflow_core::{CoreError, NodeId, Program};

use super::engine::{Analysis, Direction, FixpointEngine};
use super::snapshot::{record, FactKind, FactValue, NodeFacts};
use crate::cfg::{ControlFlowGraph, Granularity};
use crate::observe::ObservationStore;

type Names = BTreeSet<String>;

/// `use`/`def` of a basic block.
///
/// A variable read before any write in the block is a use; a variable written
/// and not already counted as a use is a def.
pub fn use_def(program: &Program, instructions: &[NodeId]) -> Result<(Names, Names), CoreError> {
    let mut uses = Names::new();
    let mut defs = Names::new();
    for &id in instructions {
        let instruction = program
            .instruction(id)
            .ok_or(CoreError::InstructionNotFound { id })?;
        for name in instruction.used_variables() {
            if !defs.contains(name) {
                uses.insert(name.to_string());
            }
        }
        if let Some(name) = instruction.defined_variable() {
            if !uses.contains(name) {
                defs.insert(name.to_string());
            }
        }
    }
    Ok((uses, defs))
}

/// Liveness over either CFG granularity.
#[derive(Debug)]
pub struct Liveness {
    graph: ControlFlowGraph,
    live_out: Names,
    uses: ObservationStore<Names>,
    defs: ObservationStore<Names>,
    live_in: ObservationStore<Names>,
    live_out_sets: ObservationStore<Names>,
}

impl Liveness {
    /// Prepares the analysis; `live_out` is the boundary at Exit.
    pub fn new(
        program: &Program,
        graph: ControlFlowGraph,
        live_out: BTreeSet<String>,
    ) -> Result<Self, CoreError> {
        let mut uses = BTreeMap::new();
        let mut defs = BTreeMap::new();
        for &node in graph.nodes() {
            let instructions = graph.instructions_of(node);
            let (u, mut d) = use_def(program, instructions)?;
            if graph.granularity() == Granularity::Instruction {
                // a single instruction defines its target even when it also reads it
                d = Names::new();
                for &id in instructions {
                    let instruction = program
                        .instruction(id)
                        .ok_or(CoreError::InstructionNotFound { id })?;
                    d.extend(instruction.defined_variable().map(str::to_string));
                }
            }
            uses.insert(node, u);
            defs.insert(node, d);
        }

        let empty: BTreeMap<NodeId, Names> =
            graph.nodes().iter().map(|&n| (n, Names::new())).collect();
        let mut outs = empty.clone();
        outs.insert(graph.exit(), live_out.clone());

        Ok(Liveness {
            live_out,
            uses: ObservationStore::new(uses),
            defs: ObservationStore::new(defs),
            live_in: ObservationStore::new(empty),
            live_out_sets: ObservationStore::new(outs),
            graph,
        })
    }

    /// Wraps the analysis in a step engine.
    pub fn engine(self) -> FixpointEngine<Self> {
        FixpointEngine::new(self)
    }

    pub fn live_in(&self, node: NodeId) -> Option<&Names> {
        self.live_in.read_raw(node)
    }

    pub fn live_out(&self, node: NodeId) -> Option<&Names> {
        self.live_out_sets.read_raw(node)
    }
}

impl Analysis for Liveness {
    const NAME: &'static str = "liveness";
    const DIRECTION: Direction = Direction::Backward;

    fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    fn compute_out(&mut self, node: NodeId) -> bool {
        let out = if node == self.graph.exit() {
            self.live_out.clone()
        } else {
            let mut out = Names::new();
            for succ in self.graph.successors(node) {
                if let Some(live) = self.live_in.read(succ) {
                    out.extend(live.iter().cloned());
                }
            }
            out
        };
        self.live_out_sets.replace(node, |_| out)
    }

    fn compute_in(&mut self, node: NodeId) -> bool {
        let mut live = self.uses.read(node).cloned().unwrap_or_default();
        let defs = self.defs.read(node).cloned().unwrap_or_default();
        if let Some(out) = self.live_out_sets.read(node) {
            live.extend(out.difference(&defs).cloned());
        }
        self.live_in.replace(node, |_| live)
    }

    fn reset_observation(&mut self) {
        self.uses.reset_observation();
        self.defs.reset_observation();
        self.live_in.reset_observation();
        self.live_out_sets.reset_observation();
    }

    fn facts(&self) -> BTreeMap<NodeId, NodeFacts> {
        let mut facts = BTreeMap::new();
        record(&mut facts, FactKind::Use, &self.uses, FactValue::Set);
        record(&mut facts, FactKind::Def, &self.defs, FactValue::Set);
        record(&mut facts, FactKind::In, &self.live_in, FactValue::Set);
        record(&mut facts, FactKind::Out, &self.live_out_sets, FactValue::Set);
        facts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataflow::snapshot::Phase;
    use tacflow_core::build_program;

    fn names(raw: &[&str]) -> Names {
        raw.iter().map(|s| s.to_string()).collect()
    }

    const LOOP: &str = "i = 0\ns = 0\nL: s = s + i\ni = i + 1\nif i < n goto L\nr = s";

    #[test]
    fn use_before_def_rule() {
        let program = build_program("a = a + 1\nb = a\nc = b * d").unwrap();
        let ids: Vec<NodeId> = program.ids().collect();
        let (uses, defs) = use_def(&program, &ids).unwrap();
        assert_eq!(uses, names(&["a", "d"]));
        assert_eq!(defs, names(&["b", "c"]));
    }

    #[test]
    fn self_assignment_defines_its_target_per_instruction() {
        let mut program = build_program("a = a + 1\nb = a").unwrap();
        let graph = ControlFlowGraph::per_instruction(&mut program).unwrap();
        let last = Liveness::new(&program, graph, names(&["b"]))
            .unwrap()
            .engine()
            .last()
            .unwrap();

        assert_eq!(last.set(NodeId(0), FactKind::Def), Some(&names(&["a"])));
        assert_eq!(last.set(NodeId(0), FactKind::Use), Some(&names(&["a"])));
        assert_eq!(last.set(NodeId(0), FactKind::In), Some(&names(&["a"])));
    }

    #[test]
    fn self_assignment_is_only_a_use_in_a_block() {
        let mut program = build_program("a = a + 1\nb = a").unwrap();
        let graph = ControlFlowGraph::basic_blocks(&mut program).unwrap();
        let first = Liveness::new(&program, graph, names(&["b"]))
            .unwrap()
            .engine()
            .next()
            .unwrap();

        assert_eq!(first.set(NodeId(0), FactKind::Def), Some(&names(&["b"])));
        assert_eq!(first.set(NodeId(0), FactKind::Use), Some(&names(&["a"])));
    }

    #[test]
    fn loop_liveness_on_blocks() {
        let mut program = build_program(LOOP).unwrap();
        let graph = ControlFlowGraph::basic_blocks(&mut program).unwrap();
        let exit = graph.exit();
        let mut engine = Liveness::new(&program, graph, names(&["r"])).unwrap().engine();
        let last = engine.by_ref().last().unwrap();

        assert_eq!(last.phase, Phase::Ended);
        // blocks: 0 = [i = 0, s = 0], 2 = loop body, 5 = [r = s]
        assert_eq!(last.set(NodeId(0), FactKind::In), Some(&names(&["n"])));
        assert_eq!(last.set(NodeId(2), FactKind::In), Some(&names(&["i", "n", "s"])));
        assert_eq!(last.set(NodeId(5), FactKind::In), Some(&names(&["s"])));
        assert_eq!(last.set(exit, FactKind::Out), Some(&names(&["r"])));
        assert!(engine.analysis().live_out(exit).is_some());
        assert!(engine.next().is_none());
    }

    #[test]
    fn steps_alternate_out_then_in_from_exit() {
        let mut program = build_program("a = 1\nb = a").unwrap();
        let graph = ControlFlowGraph::per_instruction(&mut program).unwrap();
        let exit = graph.exit();
        let steps: Vec<_> = Liveness::new(&program, graph, names(&["b"]))
            .unwrap()
            .engine()
            .collect();

        assert_eq!(steps[0].phase, Phase::Initialized);
        assert_eq!(steps[0].sweep, 0);
        assert_eq!(steps[1].current_node, Some(exit));
        assert_eq!(steps[1].phase, Phase::OutComputed);
        assert_eq!(steps[2].phase, Phase::InComputed);
        assert_eq!(steps.last().map(|s| s.phase), Some(Phase::Ended));
        // 4 nodes, two steps each, two sweeps (second confirms the fixed point)
        assert_eq!(steps.len(), 1 + 2 * 4 * 2 + 1);
    }

    #[test]
    fn flags_describe_only_the_current_step() {
        let mut program = build_program("a = 1\nb = a").unwrap();
        let graph = ControlFlowGraph::per_instruction(&mut program).unwrap();
        let steps: Vec<_> = Liveness::new(&program, graph, names(&["b"]))
            .unwrap()
            .engine()
            .collect();

        // in(Exit) computed from use/def/out of Exit
        let step = &steps[2];
        let exit = step.current_node.unwrap();
        assert!(step.fact(exit, FactKind::Out).unwrap().was_looked_at);
        assert!(step.fact(exit, FactKind::In).unwrap().was_changed);
        assert_eq!(step.changed(FactKind::In).len(), 1);
        // the next step starts from clean flags
        assert!(steps[3].changed(FactKind::In).is_empty());
    }
}
