//! End-to-end scenarios: source text in, final dataflow facts out.
//!
//! Each test builds a program with `build_program`, runs one analysis
//! through an `AnalysisSession` to its fixed point, and checks the facts of
//! the final snapshot.

use std::collections::BTreeSet;

use tacflow_analysis::dataflow::{Liveness, ReachingDefinitions};
use tacflow_analysis::{
    Algorithm, AnalysisSession, ConstValue, ControlFlowGraph, FactKind, Phase, SessionConfig,
    Snapshot, WindowSize,
};
use tacflow_core::{build_program, NodeId};

// ---------------------------------------------------------------------------
// Test helpers
// ---------------------------------------------------------------------------

fn names(raw: &[&str]) -> BTreeSet<String> {
    raw.iter().map(|s| s.to_string()).collect()
}

/// Runs `algorithm` to the end; returns the exit id and the final snapshot.
fn run_to_end(text: &str, algorithm: Algorithm) -> (NodeId, Snapshot) {
    let program = build_program(text).expect("program should verify");
    let mut session = AnalysisSession::new(program, algorithm, SessionConfig::default())
        .expect("session should start");
    let exit = session.view().nodes.last().expect("exit node").id;
    let last = session.step_to_end().cloned().expect("a final snapshot");
    (exit, last)
}

// ---------------------------------------------------------------------------
// Scenarios
// ---------------------------------------------------------------------------

#[test]
fn reaching_definitions_straight_line() {
    let (exit, last) = run_to_end("a = 5\nb = 10\nc = a + b", Algorithm::ReachingDefinitions);

    assert_eq!(last.phase, Phase::Ended);
    assert_eq!(last.set(exit, FactKind::In), Some(&names(&["d1", "d2", "d3"])));
    assert_eq!(last.set(exit, FactKind::Out), Some(&names(&["d1", "d2", "d3"])));
}

#[test]
fn constant_propagation_straight_line_redefinition() {
    let (exit, last) = run_to_end(
        "a = 5\nb = 10\nc = a + b\na = c",
        Algorithm::ConstantPropagation,
    );
    let out = last.constants(exit, FactKind::Out).expect("constant map");

    assert_eq!(out["a"], ConstValue::Nac);
    assert_eq!(out["b"], ConstValue::Const(10));
    assert_eq!(out["c"], ConstValue::Const(15));
}

#[test]
fn constant_propagation_through_a_loop() {
    let text = "n = 4\ni = 0\nL: i = i + 1\nif i < n goto L\nr = n * 2";
    let (exit, last) = run_to_end(text, Algorithm::ConstantPropagation);
    let out = last.constants(exit, FactKind::Out).unwrap();

    assert_eq!(out["n"], ConstValue::Const(4));
    assert_eq!(out["i"], ConstValue::Nac);
    assert_eq!(out["r"], ConstValue::Const(8));
}

#[test]
fn liveness_granularities_agree_at_block_boundaries() {
    let text = "a = 1\nb = 2\nL: c = a + b\na = c\nif a < 10 goto L\nd = b";
    let live_out = names(&["d"]);

    let (_, per_instruction) = run_to_end(
        text,
        Algorithm::LivenessInstructions {
            live_out: live_out.clone(),
        },
    );
    let (_, blocks) = run_to_end(text, Algorithm::LivenessBlocks { live_out });

    // leaders 0, 2 and 5 start blocks; their live-in sets match the
    // instruction-level live-in of the same instruction
    for leader in [0, 2, 5].map(NodeId) {
        assert_eq!(
            per_instruction.set(leader, FactKind::In),
            blocks.set(leader, FactKind::In),
            "live-in differs at {leader}"
        );
    }
    assert_eq!(blocks.set(NodeId(2), FactKind::In), Some(&names(&["a", "b"])));
}

#[test]
fn liveness_is_deterministic() {
    let text = "i = 0\nL: t = i * 2\ni = i + 1\nif i < 10 goto L\nr = t";
    let algorithm = Algorithm::LivenessBlocks {
        live_out: names(&["r"]),
    };
    let (_, first) = run_to_end(text, algorithm.clone());
    let (_, second) = run_to_end(text, algorithm);
    assert_eq!(first, second);
}

#[test]
fn reaching_definitions_out_sets_only_grow() {
    let text = "x = 0\ny = 1\nL: x = x + y\nif x < 10 goto L\ny = x\ngoto L";
    let mut program = build_program(text).unwrap();
    let graph = ControlFlowGraph::basic_blocks(&mut program).unwrap();
    let nodes = graph.nodes().to_vec();
    let steps: Vec<Snapshot> = ReachingDefinitions::new(&program, graph)
        .unwrap()
        .engine()
        .collect();

    for pair in steps.windows(2) {
        for &node in &nodes {
            let before = pair[0].set(node, FactKind::Out).unwrap();
            let after = pair[1].set(node, FactKind::Out).unwrap();
            assert!(before.is_subset(after), "out({node}) shrank");
        }
    }
    assert_eq!(steps.last().map(|s| s.phase), Some(Phase::Ended));
}

#[test]
fn unreachable_code_still_gets_facts() {
    let text = "goto END\nDEAD: x = 1\ngoto DEAD\nEND: y = 2";
    let mut program = build_program(text).unwrap();
    let graph = ControlFlowGraph::basic_blocks(&mut program).unwrap();
    let last = Liveness::new(&program, graph, names(&["y"]))
        .unwrap()
        .engine()
        .last()
        .unwrap();

    assert_eq!(last.set(NodeId(1), FactKind::Def), Some(&names(&["x"])));
    assert_eq!(last.set(NodeId(1), FactKind::In), Some(&names(&[])));
    assert_eq!(last.set(NodeId(3), FactKind::In), Some(&names(&[])));
}

#[test]
fn bounded_window_forgets_early_steps() {
    let program = build_program("a = 1\nb = a\nc = b").unwrap();
    let config = SessionConfig {
        window: WindowSize::Bounded(2),
    };
    let mut session = AnalysisSession::new(program, Algorithm::ReachingDefinitions, config).unwrap();

    session.step_to_end();
    session.step_backward();
    session.step_backward();
    assert!(!session.has_previous());
    assert_ne!(session.current().map(|s| s.phase), Some(Phase::Initialized));
}

#[test]
fn unbounded_window_reaches_back_to_the_start() {
    let program = build_program("a = 1\nb = a\nc = b").unwrap();
    let config = SessionConfig {
        window: WindowSize::Unbounded,
    };
    let mut session = AnalysisSession::new(program, Algorithm::ReachingDefinitions, config).unwrap();

    session.step_to_end();
    while session.has_previous() {
        session.step_backward();
    }
    assert_eq!(session.current().map(|s| s.phase), Some(Phase::Initialized));
}

#[test]
fn snapshots_serialize_to_json() {
    let (exit, last) = run_to_end("a = 5", Algorithm::ConstantPropagation);
    let json = serde_json::to_value(&last).unwrap();

    assert_eq!(json["phase"], "ended");
    let out = &json["nodes"][exit.to_string()]["out"];
    assert_eq!(out["data"]["constants"]["a"]["const"], 5);
    assert_eq!(out["was_changed"], false);
}
