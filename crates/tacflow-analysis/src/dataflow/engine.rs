//! Round-robin fixed-point driver shared by all analyses.
//!
//! [`FixpointEngine`] is an explicit state machine: every call to
//! [`Iterator::next`] performs exactly one step and returns the snapshot it
//! produced. The step sequence is
//!
//! `initialized, (first fact, second fact) per node per sweep..., ended`
//!
//! where a forward analysis computes `in` then `out` and a backward analysis
//! computes `out` then `in`. A sweep that changes nothing ends the loop.

use std::collections::BTreeMap;

use tacflow_core::NodeId;

use super::snapshot::{NodeFacts, Phase, Snapshot};
use crate::cfg::ControlFlowGraph;

/// Traversal direction of an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// Transfer functions and fact storage of one dataflow problem.
pub trait Analysis {
    const NAME: &'static str;
    const DIRECTION: Direction;

    fn graph(&self) -> &ControlFlowGraph;

    /// Recomputes `in(node)`; returns whether it changed.
    fn compute_in(&mut self, node: NodeId) -> bool;

    /// Recomputes `out(node)`; returns whether it changed.
    fn compute_out(&mut self, node: NodeId) -> bool;

    /// Clears looked-at/changed tracking on every store.
    fn reset_observation(&mut self);

    /// Deep copy of every store with current flags.
    fn facts(&self) -> BTreeMap<NodeId, NodeFacts>;
}

/// Object-safe view of an engine, for callers that pick the analysis at
/// runtime.
pub trait DataflowEngine: Iterator<Item = Snapshot> {
    fn name(&self) -> &'static str;
    fn graph(&self) -> &ControlFlowGraph;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ResumePoint {
    Initial,
    First(usize),
    Second(usize),
    Ended,
    Done,
}

/// Drives an [`Analysis`] to its fixed point one step at a time.
#[derive(Debug)]
pub struct FixpointEngine<A> {
    analysis: A,
    order: Vec<NodeId>,
    resume: ResumePoint,
    changed: bool,
    sweep: usize,
}

impl<A: Analysis> FixpointEngine<A> {
    pub fn new(analysis: A) -> Self {
        let mut order = analysis.graph().nodes().to_vec();
        if A::DIRECTION == Direction::Backward {
            order.reverse();
        }
        FixpointEngine {
            analysis,
            order,
            resume: ResumePoint::Initial,
            changed: false,
            sweep: 0,
        }
    }

    pub fn analysis(&self) -> &A {
        &self.analysis
    }

    /// Sweeps started so far.
    pub fn sweeps(&self) -> usize {
        self.sweep
    }

    pub fn is_done(&self) -> bool {
        self.resume == ResumePoint::Done
    }

    fn first(&mut self, node: NodeId) -> (bool, Phase) {
        match A::DIRECTION {
            Direction::Forward => (self.analysis.compute_in(node), Phase::InComputed),
            Direction::Backward => (self.analysis.compute_out(node), Phase::OutComputed),
        }
    }

    fn second(&mut self, node: NodeId) -> (bool, Phase) {
        match A::DIRECTION {
            Direction::Forward => (self.analysis.compute_out(node), Phase::OutComputed),
            Direction::Backward => (self.analysis.compute_in(node), Phase::InComputed),
        }
    }

    fn snapshot(&self, current_node: Option<NodeId>, phase: Phase) -> Snapshot {
        Snapshot {
            current_node,
            phase,
            sweep: self.sweep,
            nodes: self.analysis.facts(),
        }
    }
}

impl<A: Analysis> Iterator for FixpointEngine<A> {
    type Item = Snapshot;

    fn next(&mut self) -> Option<Snapshot> {
        self.analysis.reset_observation();
        match self.resume {
            ResumePoint::Initial => {
                self.resume = if self.order.is_empty() {
                    ResumePoint::Ended
                } else {
                    ResumePoint::First(0)
                };
                Some(self.snapshot(None, Phase::Initialized))
            }
            ResumePoint::First(i) => {
                if i == 0 {
                    self.sweep += 1;
                    self.changed = false;
                    tracing::debug!(analysis = A::NAME, sweep = self.sweep, "starting sweep");
                }
                let node = self.order[i];
                let (changed, phase) = self.first(node);
                self.changed |= changed;
                self.resume = ResumePoint::Second(i);
                Some(self.snapshot(Some(node), phase))
            }
            ResumePoint::Second(i) => {
                let node = self.order[i];
                let (changed, phase) = self.second(node);
                self.changed |= changed;
                self.resume = if i + 1 < self.order.len() {
                    ResumePoint::First(i + 1)
                } else if self.changed {
                    ResumePoint::First(0)
                } else {
                    ResumePoint::Ended
                };
                Some(self.snapshot(Some(node), phase))
            }
            ResumePoint::Ended => {
                self.resume = ResumePoint::Done;
                tracing::info!(
                    analysis = A::NAME,
                    sweeps = self.sweep,
                    "reached fixed point"
                );
                Some(self.snapshot(None, Phase::Ended))
            }
            ResumePoint::Done => None,
        }
    }
}

impl<A: Analysis> DataflowEngine for FixpointEngine<A> {
    fn name(&self) -> &'static str {
        A::NAME
    }

    fn graph(&self) -> &ControlFlowGraph {
        self.analysis.graph()
    }
}
