//! Basic-block CFG construction with the leader algorithm.

use std::collections::{BTreeMap, BTreeSet};

use tacflow_core::{CoreError, NodeId, Program};

use super::{ControlFlowGraph, Granularity};

/// Leaders of `program` in program order.
///
/// The first instruction, every jump target, and every instruction directly
/// after a jump start a new block.
pub fn find_leaders(program: &Program) -> Result<Vec<NodeId>, CoreError> {
    let mut leaders = BTreeSet::new();
    if let Some(first) = program.first_id() {
        leaders.insert(first);
    }
    for id in program.ids() {
        let targets = program.explicit_jump_targets(id)?;
        if targets.is_empty() {
            continue;
        }
        leaders.extend(targets);
        if let Some(next) = program.next_in_order(id) {
            leaders.insert(next);
        }
    }

    Ok(program.ids().filter(|id| leaders.contains(id)).collect())
}

impl ControlFlowGraph {
    /// Builds a graph with one data node per basic block.
    ///
    /// A block is named by its leader. The block holding the last
    /// instruction flows into Exit; Entry points at the first block.
    pub fn basic_blocks(program: &mut Program) -> Result<Self, CoreError> {
        let entry = program.reserve_next_id();
        let exit = program.reserve_next_id();
        let program = &*program;

        let leaders = find_leaders(program)?;
        let positions: BTreeMap<NodeId, usize> =
            program.ids().enumerate().map(|(i, id)| (id, i)).collect();

        let mut cfg = ControlFlowGraph::empty(Granularity::BasicBlock, entry, exit);
        let mut block_of: BTreeMap<NodeId, NodeId> = BTreeMap::new();
        for (i, &leader) in leaders.iter().enumerate() {
            let members = program.ids_in_range(leader, leaders.get(i + 1).copied())?;
            for &member in &members {
                block_of.insert(member, leader);
            }
            let position = positions.get(&leader).copied().unwrap_or_default();
            cfg.add_data_node(leader, position, members);
        }
        let mut cfg = cfg.close();

        match leaders.first() {
            Some(&first) => cfg.add_edge(entry, first),
            None => cfg.add_edge(entry, exit),
        }

        let last_instruction = program.last_id();
        for &leader in &leaders {
            let Some(&last) = cfg.instructions_of(leader).last() else {
                continue;
            };
            for next in program.instructions_executed_after(last)? {
                if let Some(&target) = block_of.get(&next) {
                    cfg.add_edge(leader, target);
                }
            }
            if Some(last) == last_instruction {
                cfg.add_edge(leader, exit);
            }
        }

        tracing::debug!(
            blocks = leaders.len(),
            edges = cfg.edge_count(),
            "built basic-block CFG"
        );
        Ok(cfg)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tacflow_core::build_program;

    fn ids(raw: &[u32]) -> Vec<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    fn set(raw: &[u32]) -> BTreeSet<NodeId> {
        raw.iter().copied().map(NodeId).collect()
    }

    #[test]
    fn leaders_of_a_loop() {
        let program =
            build_program("i = 0\nL: i = i + 1\nif i < 3 goto L\ngoto E\nx = 1\nE: y = i").unwrap();
        assert_eq!(find_leaders(&program).unwrap(), ids(&[0, 1, 3, 4, 5]));
    }

    #[test]
    fn straight_line_is_one_block() {
        let mut program = build_program("a = 5\nb = 10\nc = a + b").unwrap();
        let cfg = ControlFlowGraph::basic_blocks(&mut program).unwrap();

        assert_eq!(cfg.granularity(), Granularity::BasicBlock);
        assert_eq!(cfg.data_nodes(), &[NodeId(0)]);
        assert_eq!(cfg.instructions_of(NodeId(0)), ids(&[0, 1, 2]).as_slice());
        assert_eq!(
            cfg.edges(),
            vec![(cfg.entry(), NodeId(0)), (NodeId(0), cfg.exit())]
        );
    }

    #[test]
    fn self_loop_block_is_a_back_edge() {
        let mut program = build_program("LOOP: a = 1\nif a == 1 goto LOOP").unwrap();
        let cfg = ControlFlowGraph::basic_blocks(&mut program).unwrap();

        assert_eq!(cfg.data_nodes(), &[NodeId(0)]);
        assert_eq!(cfg.successors(NodeId(0)), set(&[0, 3]));
        assert!(cfg.is_back_edge(NodeId(0), NodeId(0)));
    }

    #[test]
    fn instruction_after_goto_starts_a_block() {
        let mut program = build_program("a = 1\ngoto END\nb = 2\nEND: c = 3").unwrap();
        let cfg = ControlFlowGraph::basic_blocks(&mut program).unwrap();

        assert_eq!(cfg.data_nodes(), &[NodeId(0), NodeId(2), NodeId(3)]);
        assert_eq!(cfg.successors(NodeId(0)), set(&[3]));
        assert!(cfg.predecessors(NodeId(2)).is_empty());
        assert_eq!(cfg.successors(NodeId(2)), set(&[3]));
    }

    #[test]
    fn unreachable_self_loop_block_is_kept() {
        let mut program = build_program("goto END\nDEAD: x = 1\ngoto DEAD\nEND: y = 2").unwrap();
        let cfg = ControlFlowGraph::basic_blocks(&mut program).unwrap();

        assert_eq!(cfg.data_nodes(), &[NodeId(0), NodeId(1), NodeId(3)]);
        assert_eq!(cfg.instructions_of(NodeId(1)), ids(&[1, 2]).as_slice());
        assert_eq!(cfg.successors(NodeId(1)), set(&[1]));
        assert_eq!(cfg.predecessors(NodeId(1)), set(&[1]));
        assert_eq!(cfg.successors(NodeId(3)), set(&[5]));
    }

    #[test]
    fn empty_program_has_no_blocks() {
        let mut program = build_program("").unwrap();
        assert!(find_leaders(&program).unwrap().is_empty());
        let cfg = ControlFlowGraph::basic_blocks(&mut program).unwrap();
        assert_eq!(cfg.edges(), vec![(NodeId(0), NodeId(1))]);
    }
}
