//! One program, one selected analysis, one navigator.
//!
//! [`AnalysisSession`] keeps the verified program untouched and works on a
//! fresh clone for every selection, so the synthetic Entry/Exit ids are the
//! same each time an algorithm is (re)selected.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use tacflow_core::{tokenize, Program, TokenKind};

use crate::cfg::ControlFlowGraph;
use crate::dataflow::{
    definition_tags, ConstantPropagation, DataflowEngine, Liveness, ReachingDefinitions, Snapshot,
};
use crate::error::AnalysisError;
use crate::navigator::{StepNavigator, WindowSize};
use crate::view::GraphView;

/// The closed set of analyses a session can run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "algorithm", rename_all = "snake_case")]
pub enum Algorithm {
    LivenessInstructions { live_out: BTreeSet<String> },
    LivenessBlocks { live_out: BTreeSet<String> },
    ReachingDefinitions,
    ConstantPropagation,
}

/// Session configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionConfig {
    /// History kept by the step navigator. Default: bounded, 64 steps.
    pub window: WindowSize,
}

type Navigator = StepNavigator<Box<dyn DataflowEngine>>;

pub struct AnalysisSession {
    program: Program,
    config: SessionConfig,
    algorithm: Algorithm,
    view: GraphView,
    navigator: Navigator,
}

impl AnalysisSession {
    pub fn new(
        program: Program,
        algorithm: Algorithm,
        config: SessionConfig,
    ) -> Result<Self, AnalysisError> {
        let (view, navigator) = start(&program, &algorithm, config)?;
        Ok(AnalysisSession {
            program,
            config,
            algorithm,
            view,
            navigator,
        })
    }

    /// Discards the running analysis and starts `algorithm` from scratch.
    pub fn select_algorithm(&mut self, algorithm: Algorithm) -> Result<(), AnalysisError> {
        let (view, navigator) = start(&self.program, &algorithm, self.config)?;
        self.algorithm = algorithm;
        self.view = view;
        self.navigator = navigator;
        Ok(())
    }

    pub fn algorithm(&self) -> &Algorithm {
        &self.algorithm
    }

    pub fn config(&self) -> SessionConfig {
        self.config
    }

    pub fn view(&self) -> &GraphView {
        &self.view
    }

    pub fn current(&self) -> Option<&Snapshot> {
        self.navigator.current()
    }

    /// Advances one step; stays on the last step once the analysis ended.
    pub fn step_forward(&mut self) -> Option<&Snapshot> {
        if self.navigator.has_next() {
            self.navigator.next();
        }
        self.navigator.current()
    }

    pub fn step_backward(&mut self) -> Option<&Snapshot> {
        self.navigator.previous();
        self.navigator.current()
    }

    pub fn step_to_end(&mut self) -> Option<&Snapshot> {
        self.navigator.step_to_end();
        self.navigator.current()
    }

    pub fn has_next(&self) -> bool {
        self.navigator.has_next()
    }

    pub fn has_previous(&self) -> bool {
        self.navigator.has_previous()
    }
}

fn start(
    program: &Program,
    algorithm: &Algorithm,
    config: SessionConfig,
) -> Result<(GraphView, Navigator), AnalysisError> {
    let mut program = program.clone();
    let no_markers = BTreeMap::new();

    let (view, engine) = match algorithm {
        Algorithm::LivenessInstructions { live_out } | Algorithm::LivenessBlocks { live_out } => {
            validate_names(live_out)?;
            let graph = if matches!(algorithm, Algorithm::LivenessInstructions { .. }) {
                ControlFlowGraph::per_instruction(&mut program)?
            } else {
                ControlFlowGraph::basic_blocks(&mut program)?
            };
            let view = GraphView::new(&program, &graph, &no_markers)?;
            let liveness = Liveness::new(&program, graph, live_out.clone())?;
            let engine: Box<dyn DataflowEngine> = Box::new(liveness.engine());
            (view, engine)
        }
        Algorithm::ReachingDefinitions => {
            let graph = ControlFlowGraph::basic_blocks(&mut program)?;
            let view = GraphView::new(&program, &graph, &definition_tags(&program))?;
            let reaching = ReachingDefinitions::new(&program, graph)?;
            let engine: Box<dyn DataflowEngine> = Box::new(reaching.engine());
            (view, engine)
        }
        Algorithm::ConstantPropagation => {
            let graph = ControlFlowGraph::basic_blocks(&mut program)?;
            let view = GraphView::new(&program, &graph, &no_markers)?;
            let constants = ConstantPropagation::new(&program, graph)?;
            let engine: Box<dyn DataflowEngine> = Box::new(constants.engine());
            (view, engine)
        }
    };

    tracing::debug!(
        analysis = engine.name(),
        nodes = view.nodes.len(),
        "selected analysis"
    );
    Ok((view, StepNavigator::new(engine, config.window)))
}

/// Every name must lex as exactly one identifier.
fn validate_names(names: &BTreeSet<String>) -> Result<(), AnalysisError> {
    for name in names {
        let valid = match tokenize(name) {
            Ok(tokens) => matches!(
                tokens.as_slice(),
                [first, end] if first.kind == TokenKind::Identifier(name.clone())
                    && end.kind == TokenKind::EndOfLine
            ),
            Err(_) => false,
        };
        if !valid {
            return Err(AnalysisError::InvalidVariable { name: name.clone() });
        }
    }
    Ok(())
}
