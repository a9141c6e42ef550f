//! Constant propagation (forward, must) over the `UNDEF < const < NAC`
//! lattice.
//!
//! Relational operators evaluate to `0` for true and `-1` for false. Integer
//! arithmetic wraps; division or remainder by zero is not a constant.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use tacflow_core::{
    BinaryOp, CoreError, Instruction, InstructionKind, NodeId, Operand, Program, UnaryOp,
};

use super::engine::{Analysis, Direction, FixpointEngine};
use super::snapshot::{record, FactKind, FactValue, NodeFacts};
use crate::cfg::ControlFlowGraph;
use crate::observe::ObservationStore;

pub const TRUE: i64 = 0;
pub const FALSE: i64 = -1;

/// A constant-propagation lattice value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConstValue {
    #[default]
    Undef,
    Const(i64),
    Nac,
}

impl ConstValue {
    pub fn meet(self, other: ConstValue) -> ConstValue {
        match (self, other) {
            (ConstValue::Nac, _) | (_, ConstValue::Nac) => ConstValue::Nac,
            (ConstValue::Undef, x) | (x, ConstValue::Undef) => x,
            (ConstValue::Const(a), ConstValue::Const(b)) if a == b => ConstValue::Const(a),
            (ConstValue::Const(_), ConstValue::Const(_)) => ConstValue::Nac,
        }
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Undef => write!(f, "UNDEF"),
            ConstValue::Const(k) => write!(f, "{}", k),
            ConstValue::Nac => write!(f, "NAC"),
        }
    }
}

pub type ConstMap = BTreeMap<String, ConstValue>;

/// Key-wise meet; a key missing on one side counts as `Undef`.
pub fn meet_maps(a: &ConstMap, b: &ConstMap) -> ConstMap {
    let mut merged = a.clone();
    for (name, &value) in b {
        let slot = merged.entry(name.clone()).or_default();
        *slot = slot.meet(value);
    }
    merged
}

fn relational(holds: bool) -> i64 {
    if holds {
        TRUE
    } else {
        FALSE
    }
}

fn resolve(map: &ConstMap, operand: &Operand) -> ConstValue {
    match operand {
        Operand::Integer(k) => ConstValue::Const(*k),
        Operand::Variable(name) => map.get(name).copied().unwrap_or_default(),
    }
}

fn unary(op: UnaryOp, value: ConstValue) -> ConstValue {
    match value {
        ConstValue::Const(k) => ConstValue::Const(match op {
            UnaryOp::Neg => k.wrapping_neg(),
            UnaryOp::Not => relational(k == 0),
        }),
        other => other,
    }
}

fn binary(op: BinaryOp, lhs: ConstValue, rhs: ConstValue) -> ConstValue {
    let (a, b) = match (lhs, rhs) {
        (ConstValue::Nac, _) | (_, ConstValue::Nac) => return ConstValue::Nac,
        (ConstValue::Const(a), ConstValue::Const(b)) => (a, b),
        _ => return ConstValue::Undef,
    };
    match op {
        BinaryOp::Add => ConstValue::Const(a.wrapping_add(b)),
        BinaryOp::Sub => ConstValue::Const(a.wrapping_sub(b)),
        BinaryOp::Mul => ConstValue::Const(a.wrapping_mul(b)),
        BinaryOp::Div if b == 0 => ConstValue::Nac,
        BinaryOp::Div => ConstValue::Const(a.wrapping_div(b)),
        BinaryOp::Rem if b == 0 => ConstValue::Nac,
        BinaryOp::Rem => ConstValue::Const(a.wrapping_rem(b)),
        BinaryOp::Rel(rel) => ConstValue::Const(relational(rel.holds(a, b))),
    }
}

/// Replays `instructions` on `map`, meeting each result with the running
/// value of its destination.
pub fn transfer(map: &mut ConstMap, instructions: &[Instruction]) {
    for instruction in instructions {
        let (dest, value) = match &instruction.kind {
            InstructionKind::Copy { dest, source } => (dest, resolve(map, source)),
            InstructionKind::Unary { dest, op, operand } => {
                (dest, unary(*op, resolve(map, operand)))
            }
            InstructionKind::Binary { dest, lhs, op, rhs } => {
                (dest, binary(*op, resolve(map, lhs), resolve(map, rhs)))
            }
            _ => continue,
        };
        let slot = map.entry(dest.clone()).or_default();
        *slot = slot.meet(value);
    }
}

#[derive(Debug)]
pub struct ConstantPropagation {
    graph: ControlFlowGraph,
    /// Every variable the program mentions, all `Undef`.
    bottom: ConstMap,
    blocks: BTreeMap<NodeId, Vec<Instruction>>,
    const_in: ObservationStore<ConstMap>,
    const_out: ObservationStore<ConstMap>,
}

impl ConstantPropagation {
    pub fn new(program: &Program, graph: ControlFlowGraph) -> Result<Self, CoreError> {
        let names: BTreeSet<&str> = program
            .iter()
            .flat_map(|(_, instruction)| instruction.referenced_variables())
            .collect();
        let bottom: ConstMap = names
            .into_iter()
            .map(|name| (name.to_string(), ConstValue::Undef))
            .collect();

        let mut blocks = BTreeMap::new();
        for &node in graph.nodes() {
            let instructions = graph
                .instructions_of(node)
                .iter()
                .map(|&id| {
                    program
                        .instruction(id)
                        .cloned()
                        .ok_or(CoreError::InstructionNotFound { id })
                })
                .collect::<Result<Vec<_>, _>>()?;
            blocks.insert(node, instructions);
        }

        let initial: BTreeMap<NodeId, ConstMap> =
            graph.nodes().iter().map(|&n| (n, bottom.clone())).collect();

        Ok(ConstantPropagation {
            bottom,
            blocks,
            const_in: ObservationStore::new(initial.clone()),
            const_out: ObservationStore::new(initial),
            graph,
        })
    }

    pub fn engine(self) -> FixpointEngine<Self> {
        FixpointEngine::new(self)
    }
}

impl Analysis for ConstantPropagation {
    const NAME: &'static str = "constant-propagation";
    const DIRECTION: Direction = Direction::Forward;

    fn graph(&self) -> &ControlFlowGraph {
        &self.graph
    }

    fn compute_in(&mut self, node: NodeId) -> bool {
        let mut merged = self.bottom.clone();
        for pred in self.graph.predecessors(node) {
            if let Some(out) = self.const_out.read(pred) {
                merged = meet_maps(&merged, out);
            }
        }
        self.const_in.replace(node, |_| merged)
    }

    fn compute_out(&mut self, node: NodeId) -> bool {
        let mut out = self.const_in.read(node).cloned().unwrap_or_default();
        if let Some(instructions) = self.blocks.get(&node) {
            transfer(&mut out, instructions);
        }
        self.const_out.replace(node, |_| out)
    }

    fn reset_observation(&mut self) {
        self.const_in.reset_observation();
        self.const_out.reset_observation();
    }

    fn facts(&self) -> BTreeMap<NodeId, NodeFacts> {
        let mut facts = BTreeMap::new();
        record(&mut facts, FactKind::In, &self.const_in, FactValue::Constants);
        record(&mut facts, FactKind::Out, &self.const_out, FactValue::Constants);
        facts
    }
}
