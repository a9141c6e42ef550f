//! Per-instruction CFG construction.

use tacflow_core::{CoreError, Program};

use super::{ControlFlowGraph, Granularity};

impl ControlFlowGraph {
    /// Builds a graph with one data node per instruction.
    ///
    /// Edges follow [`Program::instructions_executed_after`]; Entry points at
    /// the first instruction and the last instruction flows into Exit. An
    /// empty program yields a single `Entry -> Exit` edge.
    pub fn per_instruction(program: &mut Program) -> Result<Self, CoreError> {
        let entry = program.reserve_next_id();
        let exit = program.reserve_next_id();
        let program = &*program;

        let mut cfg = ControlFlowGraph::empty(Granularity::Instruction, entry, exit);
        for (position, id) in program.ids().enumerate() {
            cfg.add_data_node(id, position, vec![id]);
        }
        let mut cfg = cfg.close();

        match (program.first_id(), program.last_id()) {
            (Some(first), Some(last)) => {
                cfg.add_edge(entry, first);
                cfg.add_edge(last, exit);
            }
            _ => cfg.add_edge(entry, exit),
        }

        for id in program.ids() {
            for next in program.instructions_executed_after(id)? {
                cfg.add_edge(id, next);
            }
        }

        tracing::debug!(
            nodes = cfg.nodes().len(),
            edges = cfg.edge_count(),
            "built per-instruction CFG"
        );
        Ok(cfg)
    }
}
