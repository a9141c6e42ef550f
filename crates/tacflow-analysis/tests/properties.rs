//! Property tests: lattice laws, CFG boundary invariants, and the navigator's
//! window arithmetic.

use proptest::prelude::*;

use tacflow_analysis::dataflow::meet_maps;
use tacflow_analysis::{ConstValue, ControlFlowGraph, StepNavigator, WindowSize};
use tacflow_core::build_program;

fn const_value() -> impl Strategy<Value = ConstValue> {
    prop_oneof![
        Just(ConstValue::Undef),
        Just(ConstValue::Nac),
        (-3i64..3).prop_map(ConstValue::Const),
    ]
}

/// Small programs with forward and backward jumps to a fixed label set.
fn program_text() -> impl Strategy<Value = String> {
    let var = prop::sample::select(vec!["a", "b", "c"]);
    let label = prop::sample::select(vec!["A", "B"]);
    let line = prop_oneof![
        (var.clone(), 0i64..5).prop_map(|(v, k)| format!("{v} = {k}")),
        (var.clone(), var.clone()).prop_map(|(v, w)| format!("{v} = {w} + 1")),
        label.clone().prop_map(|l| format!("goto {l}")),
        (var, label).prop_map(|(v, l)| format!("if {v} < 3 goto {l}")),
    ];
    proptest::collection::vec(line, 0..12).prop_map(|lines| {
        let mut text = String::from("A: a = 0\n");
        text.push_str(&lines.join("\n"));
        text.push_str("\nB: b = a");
        text
    })
}

proptest! {
    #[test]
    fn meet_with_nac_is_nac(x in const_value()) {
        prop_assert_eq!(ConstValue::Nac.meet(x), ConstValue::Nac);
        prop_assert_eq!(x.meet(ConstValue::Nac), ConstValue::Nac);
    }

    #[test]
    fn meet_is_commutative_and_idempotent(x in const_value(), y in const_value()) {
        prop_assert_eq!(x.meet(y), y.meet(x));
        prop_assert_eq!(x.meet(x), x);
        prop_assert_eq!(ConstValue::Undef.meet(x), x);
    }

    #[test]
    fn meet_is_associative(x in const_value(), y in const_value(), z in const_value()) {
        prop_assert_eq!(x.meet(y).meet(z), x.meet(y.meet(z)));
    }

    #[test]
    fn meet_maps_is_commutative(
        a in proptest::collection::btree_map("[a-c]", const_value(), 0..3),
        b in proptest::collection::btree_map("[a-c]", const_value(), 0..3),
    ) {
        prop_assert_eq!(meet_maps(&a, &b), meet_maps(&b, &a));
    }

    #[test]
    fn cfg_boundaries_hold(text in program_text(), blocks in any::<bool>()) {
        let mut program = build_program(&text).expect("generated program is valid");
        let graph = if blocks {
            ControlFlowGraph::basic_blocks(&mut program)
        } else {
            ControlFlowGraph::per_instruction(&mut program)
        }
        .expect("graph builds");

        prop_assert!(graph.predecessors(graph.entry()).is_empty());
        prop_assert!(graph.successors(graph.exit()).is_empty());
        for (from, to) in graph.edges() {
            prop_assert!(graph.contains(from) && graph.contains(to));
            prop_assert!(graph.predecessors(to).contains(&from));
            if from == graph.entry() || to == graph.exit() {
                prop_assert!(!graph.is_back_edge(from, to));
            }
        }
        // every instruction is covered by exactly one data node
        let covered: usize = graph
            .data_nodes()
            .iter()
            .map(|&node| graph.instructions_of(node).len())
            .sum();
        prop_assert_eq!(covered, program.len());
    }

    #[test]
    fn navigator_reaches_the_last_value(count in 0u32..40, size in 0usize..8) {
        let mut nav = StepNavigator::new(0..count, WindowSize::Bounded(size));
        nav.step_to_end();
        prop_assert_eq!(nav.current().copied(), count.checked_sub(1));
        prop_assert!(!nav.has_next());
    }

    #[test]
    fn navigator_history_is_bounded(count in 1u32..40, size in 0usize..8) {
        let mut nav = StepNavigator::new(0..count, WindowSize::Bounded(size));
        nav.step_to_end();
        let mut back = 0usize;
        while nav.has_previous() {
            nav.previous();
            back += 1;
        }
        // the lookahead slot becomes visible once the source is exhausted
        let visible = size.max(1) + 1;
        prop_assert_eq!(back, (count as usize).min(visible) - 1);
        prop_assert_eq!(nav.current().copied(), Some(count - (back as u32) - 1));
    }
}
