//! Verified program model.
//!
//! [`Program`] owns the instructions in emission order, keyed by the ids its
//! [`IdSource`] handed out, plus the label table. Construction verifies that
//! no label is defined twice and that every jump target exists, collecting
//! all violations before failing. A verified program is never mutated again,
//! except for reserving fresh ids for synthetic CFG nodes.

use indexmap::map::Entry;
use indexmap::IndexMap;
use smallvec::SmallVec;

use crate::error::{CollectiveError, CoreError, SourceError, Stage};
use crate::id::{CounterIds, IdSource, NodeId};
use crate::instruction::Instruction;
use crate::lexer::tokenize;
use crate::parser::parse;

/// Lexes, parses and verifies TAC source text.
pub fn build_program(text: &str) -> Result<Program, CollectiveError> {
    let tokens = tokenize(text)?;
    let instructions = parse(tokens)?;
    Program::new(instructions)
}

/// An immutable, label-resolved instruction sequence.
#[derive(Debug, Clone)]
pub struct Program {
    instructions: IndexMap<NodeId, Instruction>,
    labels: IndexMap<String, NodeId>,
    ids: Box<dyn IdSource>,
}

impl Program {
    /// Numbers `instructions` from 0 and verifies labels.
    pub fn new(instructions: Vec<Instruction>) -> Result<Self, CollectiveError> {
        Self::with_id_source(instructions, Box::new(CounterIds::default()))
    }

    /// Numbers `instructions` with ids drawn from `ids` and verifies labels.
    ///
    /// The same source keeps serving [`Program::reserve_next_id`] afterwards.
    pub fn with_id_source(
        instructions: Vec<Instruction>,
        mut ids: Box<dyn IdSource>,
    ) -> Result<Self, CollectiveError> {
        let instructions: IndexMap<NodeId, Instruction> = instructions
            .into_iter()
            .map(|instruction| (ids.next_id(), instruction))
            .collect();

        let mut errors = Vec::new();
        let mut labels: IndexMap<String, NodeId> = IndexMap::new();

        for (id, instruction) in &instructions {
            let Some(label) = &instruction.label else {
                continue;
            };
            match labels.entry(label.clone()) {
                Entry::Occupied(first) => errors.push(SourceError::LabelAlreadyDefined {
                    line: instruction.line,
                    label: label.clone(),
                    first_line: instructions[first.get()].line,
                }),
                Entry::Vacant(slot) => {
                    slot.insert(*id);
                }
            }
        }

        for instruction in instructions.values() {
            if let Some(target) = instruction.jump_target() {
                if !labels.contains_key(target) {
                    errors.push(SourceError::LabelNotDefined {
                        line: instruction.line,
                        label: target.to_string(),
                    });
                }
            }
        }

        CollectiveError::check(Stage::Verification, errors)?;

        Ok(Program {
            instructions,
            labels,
            ids,
        })
    }

    // -----------------------------------------------------------------------
    // Read-only accessors
    // -----------------------------------------------------------------------

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    pub fn instruction(&self, id: NodeId) -> Option<&Instruction> {
        self.instructions.get(&id)
    }

    /// Instruction ids in program order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.instructions.keys().copied()
    }

    /// `(id, instruction)` pairs in program order.
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &Instruction)> + '_ {
        self.instructions.iter().map(|(id, instruction)| (*id, instruction))
    }

    pub fn first_id(&self) -> Option<NodeId> {
        self.instructions.first().map(|(id, _)| *id)
    }

    pub fn last_id(&self) -> Option<NodeId> {
        self.instructions.last().map(|(id, _)| *id)
    }

    /// The label table in definition order.
    pub fn labels(&self) -> &IndexMap<String, NodeId> {
        &self.labels
    }

    pub fn label_target(&self, label: &str) -> Option<NodeId> {
        self.labels.get(label).copied()
    }

    fn position(&self, id: NodeId) -> Option<usize> {
        self.instructions.get_index_of(&id)
    }

    fn get(&self, id: NodeId) -> Result<&Instruction, CoreError> {
        self.instruction(id)
            .ok_or(CoreError::InstructionNotFound { id })
    }

    // -----------------------------------------------------------------------
    // Navigation
    // -----------------------------------------------------------------------

    /// The instruction that follows `id` in program order.
    pub fn next_in_order(&self, id: NodeId) -> Option<NodeId> {
        let position = self.position(id)?;
        self.instructions
            .get_index(position + 1)
            .map(|(next, _)| *next)
    }

    /// Ids of the instructions control may reach directly after `id`.
    ///
    /// Fallthrough comes first, then the label target. An unconditional jump
    /// has only its target; the last instruction has no fallthrough.
    pub fn instructions_executed_after(
        &self,
        id: NodeId,
    ) -> Result<SmallVec<[NodeId; 2]>, CoreError> {
        let instruction = self.get(id)?;
        let mut after = SmallVec::new();

        if !instruction.is_unconditional_jump() {
            if let Some(next) = self.next_in_order(id) {
                after.push(next);
            }
        }
        for target in self.explicit_jump_targets(id)? {
            if !after.contains(&target) {
                after.push(target);
            }
        }
        Ok(after)
    }

    /// Label-resolved jump targets of `id`; empty for non-jumps.
    pub fn explicit_jump_targets(&self, id: NodeId) -> Result<SmallVec<[NodeId; 1]>, CoreError> {
        let instruction = self.get(id)?;
        Ok(instruction
            .jump_target()
            .and_then(|label| self.label_target(label))
            .into_iter()
            .collect())
    }

    /// Whether `a` occurs strictly before `b` in program order.
    ///
    /// Ids that are not instructions (reserved ids) are never before anything.
    pub fn instruction_is_before(&self, a: NodeId, b: NodeId) -> bool {
        match (self.position(a), self.position(b)) {
            (Some(a), Some(b)) => a < b,
            _ => false,
        }
    }

    /// Instruction ids from `start` (inclusive) up to `end` (exclusive), in
    /// program order. `None` as `end` runs to the end of the program.
    pub fn ids_in_range(&self, start: NodeId, end: Option<NodeId>) -> Result<Vec<NodeId>, CoreError> {
        let from = self
            .position(start)
            .ok_or(CoreError::InstructionNotFound { id: start })?;
        let to = match end {
            Some(end) => self
                .position(end)
                .ok_or(CoreError::InstructionNotFound { id: end })?,
            None => self.instructions.len(),
        };
        Ok(self
            .instructions
            .keys()
            .skip(from)
            .take(to.saturating_sub(from))
            .copied()
            .collect())
    }

    /// Hands out a fresh id from the program's id source.
    pub fn reserve_next_id(&mut self) -> NodeId {
        self.ids.next_id()
    }
}
