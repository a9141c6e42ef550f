//! Instruction vocabulary of three-address code.
//!
//! [`Instruction`] is a closed sum over the seven statement forms. Every
//! instruction keeps its optional label and source line, and reports which
//! variables it reads and writes so analyses can derive use/def and gen/kill
//! sets without matching on the variants themselves.

use std::fmt;

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::token::Symbol;

/// An instruction operand: a variable name or an integer literal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operand {
    Variable(String),
    Integer(i64),
}

impl Operand {
    pub fn as_variable(&self) -> Option<&str> {
        match self {
            Operand::Variable(name) => Some(name),
            Operand::Integer(_) => None,
        }
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Operand::Variable(name) => f.write_str(name),
            Operand::Integer(value) => write!(f, "{value}"),
        }
    }
}

/// Relational operators, usable in conditional jumps and binary assignments.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RelOp {
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
}

impl RelOp {
    pub fn from_symbol(symbol: Symbol) -> Option<RelOp> {
        match symbol {
            Symbol::EqEq => Some(RelOp::Eq),
            Symbol::NotEq => Some(RelOp::Ne),
            Symbol::LessEq => Some(RelOp::Le),
            Symbol::GreaterEq => Some(RelOp::Ge),
            Symbol::Less => Some(RelOp::Lt),
            Symbol::Greater => Some(RelOp::Gt),
            _ => None,
        }
    }

    pub fn symbol(self) -> Symbol {
        match self {
            RelOp::Eq => Symbol::EqEq,
            RelOp::Ne => Symbol::NotEq,
            RelOp::Le => Symbol::LessEq,
            RelOp::Ge => Symbol::GreaterEq,
            RelOp::Lt => Symbol::Less,
            RelOp::Gt => Symbol::Greater,
        }
    }

    pub fn holds(self, lhs: i64, rhs: i64) -> bool {
        match self {
            RelOp::Eq => lhs == rhs,
            RelOp::Ne => lhs != rhs,
            RelOp::Le => lhs <= rhs,
            RelOp::Ge => lhs >= rhs,
            RelOp::Lt => lhs < rhs,
            RelOp::Gt => lhs > rhs,
        }
    }
}

/// Arithmetic negation and logical not.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn from_symbol(symbol: Symbol) -> Option<UnaryOp> {
        match symbol {
            Symbol::Minus => Some(UnaryOp::Neg),
            Symbol::Bang => Some(UnaryOp::Not),
            _ => None,
        }
    }

    pub fn symbol(self) -> Symbol {
        match self {
            UnaryOp::Neg => Symbol::Minus,
            UnaryOp::Not => Symbol::Bang,
        }
    }
}

/// Binary operators: arithmetic plus every relational operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Rel(RelOp),
}

impl BinaryOp {
    pub fn from_symbol(symbol: Symbol) -> Option<BinaryOp> {
        match symbol {
            Symbol::Plus => Some(BinaryOp::Add),
            Symbol::Minus => Some(BinaryOp::Sub),
            Symbol::Star => Some(BinaryOp::Mul),
            Symbol::Slash => Some(BinaryOp::Div),
            Symbol::Percent => Some(BinaryOp::Rem),
            other => RelOp::from_symbol(other).map(BinaryOp::Rel),
        }
    }

    pub fn symbol(self) -> Symbol {
        match self {
            BinaryOp::Add => Symbol::Plus,
            BinaryOp::Sub => Symbol::Minus,
            BinaryOp::Mul => Symbol::Star,
            BinaryOp::Div => Symbol::Slash,
            BinaryOp::Rem => Symbol::Percent,
            BinaryOp::Rel(op) => op.symbol(),
        }
    }
}

/// The seven statement forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "form", rename_all = "snake_case")]
pub enum InstructionKind {
    /// `goto L`
    Jump { target: String },
    /// `if a <relop> b goto L`
    JumpIfRelation {
        lhs: Operand,
        op: RelOp,
        rhs: Operand,
        target: String,
    },
    /// `if a goto L`
    JumpIfTrue { condition: String, target: String },
    /// `ifFalse a goto L`
    JumpIfFalse { condition: String, target: String },
    /// `x = a`
    Copy { dest: String, source: Operand },
    /// `x = <unaryop> a`
    Unary {
        dest: String,
        op: UnaryOp,
        operand: Operand,
    },
    /// `x = a <binop> b`
    Binary {
        dest: String,
        lhs: Operand,
        op: BinaryOp,
        rhs: Operand,
    },
}

/// A parsed instruction with its optional label and source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instruction {
    pub label: Option<String>,
    pub line: usize,
    pub kind: InstructionKind,
}

impl Instruction {
    pub fn new(label: Option<String>, line: usize, kind: InstructionKind) -> Self {
        Instruction { label, line, kind }
    }

    /// Label this instruction jumps to, if it is a jump of any kind.
    pub fn jump_target(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::Jump { target }
            | InstructionKind::JumpIfRelation { target, .. }
            | InstructionKind::JumpIfTrue { target, .. }
            | InstructionKind::JumpIfFalse { target, .. } => Some(target),
            InstructionKind::Copy { .. }
            | InstructionKind::Unary { .. }
            | InstructionKind::Binary { .. } => None,
        }
    }

    pub fn is_unconditional_jump(&self) -> bool {
        matches!(self.kind, InstructionKind::Jump { .. })
    }

    pub fn is_conditional_jump(&self) -> bool {
        matches!(
            self.kind,
            InstructionKind::JumpIfRelation { .. }
                | InstructionKind::JumpIfTrue { .. }
                | InstructionKind::JumpIfFalse { .. }
        )
    }

    /// The variable assigned by this instruction.
    pub fn defined_variable(&self) -> Option<&str> {
        match &self.kind {
            InstructionKind::Copy { dest, .. }
            | InstructionKind::Unary { dest, .. }
            | InstructionKind::Binary { dest, .. } => Some(dest),
            _ => None,
        }
    }

    /// Variables read by this instruction, in operand order.
    pub fn used_variables(&self) -> SmallVec<[&str; 2]> {
        let mut used = SmallVec::new();
        match &self.kind {
            InstructionKind::Jump { .. } => {}
            InstructionKind::JumpIfRelation { lhs, rhs, .. }
            | InstructionKind::Binary { lhs, rhs, .. } => {
                push_variable(&mut used, lhs);
                push_variable(&mut used, rhs);
            }
            InstructionKind::JumpIfTrue { condition, .. }
            | InstructionKind::JumpIfFalse { condition, .. } => used.push(condition.as_str()),
            InstructionKind::Copy { source, .. } => push_variable(&mut used, source),
            InstructionKind::Unary { operand, .. } => push_variable(&mut used, operand),
        }
        used
    }

    /// Every variable name this instruction mentions, read or written.
    pub fn referenced_variables(&self) -> SmallVec<[&str; 3]> {
        let mut names: SmallVec<[&str; 3]> = self.used_variables().into_iter().collect();
        if let Some(dest) = self.defined_variable() {
            names.push(dest);
        }
        names
    }

    /// Renders the instruction without its label prefix.
    pub fn body(&self) -> String {
        match &self.kind {
            InstructionKind::Jump { target } => format!("goto {target}"),
            InstructionKind::JumpIfRelation {
                lhs,
                op,
                rhs,
                target,
            } => format!("if {lhs} {} {rhs} goto {target}", op.symbol()),
            InstructionKind::JumpIfTrue { condition, target } => {
                format!("if {condition} goto {target}")
            }
            InstructionKind::JumpIfFalse { condition, target } => {
                format!("ifFalse {condition} goto {target}")
            }
            InstructionKind::Copy { dest, source } => format!("{dest} = {source}"),
            InstructionKind::Unary { dest, op, operand } => {
                format!("{dest} = {}{operand}", op.symbol())
            }
            InstructionKind::Binary { dest, lhs, op, rhs } => {
                format!("{dest} = {lhs} {} {rhs}", op.symbol())
            }
        }
    }
}

fn push_variable<'a>(used: &mut SmallVec<[&'a str; 2]>, operand: &'a Operand) {
    if let Some(name) = operand.as_variable() {
        used.push(name);
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(label) = &self.label {
            write!(f, "{label}: ")?;
        }
        f.write_str(&self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Operand {
        Operand::Variable(name.into())
    }

    #[test]
    fn binary_uses_both_operands() {
        let instr = Instruction::new(
            None,
            1,
            InstructionKind::Binary {
                dest: "c".into(),
                lhs: var("a"),
                op: BinaryOp::Add,
                rhs: Operand::Integer(1),
            },
        );
        assert_eq!(instr.defined_variable(), Some("c"));
        assert_eq!(instr.used_variables().as_slice(), &["a"]);
        assert_eq!(instr.referenced_variables().as_slice(), &["a", "c"]);
        assert_eq!(instr.jump_target(), None);
    }

    #[test]
    fn conditional_jump_reads_condition() {
        let instr = Instruction::new(
            Some("L1".into()),
            2,
            InstructionKind::JumpIfFalse {
                condition: "t".into(),
                target: "END".into(),
            },
        );
        assert!(instr.is_conditional_jump());
        assert!(!instr.is_unconditional_jump());
        assert_eq!(instr.jump_target(), Some("END"));
        assert_eq!(instr.used_variables().as_slice(), &["t"]);
        assert_eq!(instr.defined_variable(), None);
    }

    #[test]
    fn display_renders_canonical_text() {
        let instr = Instruction::new(
            Some("LOOP".into()),
            1,
            InstructionKind::JumpIfRelation {
                lhs: var("a"),
                op: RelOp::Le,
                rhs: Operand::Integer(10),
                target: "LOOP".into(),
            },
        );
        insta::assert_snapshot!(instr.to_string(), @"LOOP: if a <= 10 goto LOOP");

        let unary = Instruction::new(
            None,
            1,
            InstructionKind::Unary {
                dest: "x".into(),
                op: UnaryOp::Neg,
                operand: var("y"),
            },
        );
        insta::assert_snapshot!(unary.to_string(), @"x = -y");
    }

    #[test]
    fn binary_op_covers_relations() {
        assert_eq!(
            BinaryOp::from_symbol(Symbol::NotEq),
            Some(BinaryOp::Rel(RelOp::Ne))
        );
        assert_eq!(BinaryOp::from_symbol(Symbol::Percent), Some(BinaryOp::Rem));
        assert_eq!(BinaryOp::from_symbol(Symbol::Bang), None);
        assert_eq!(UnaryOp::from_symbol(Symbol::Plus), None);
    }
}
