//! Stable ID newtype and pluggable id sources.
//!
//! Instructions and CFG nodes share one id space: a data node is keyed by the
//! id of its first instruction, and the synthetic Entry/Exit nodes use ids
//! reserved from the same [`IdSource`] after all instructions were numbered.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Stable identifier for an instruction or a CFG node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct NodeId(pub u32);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A generator of fresh, never-repeating ids.
///
/// The program numbers its instructions with it and later hands out
/// additional ids through [`crate::Program::reserve_next_id`].
pub trait IdSource: fmt::Debug {
    /// Returns an id that this source has never returned before.
    fn next_id(&mut self) -> NodeId;

    /// Clones the source, including its current position.
    fn boxed_clone(&self) -> Box<dyn IdSource>;
}

impl Clone for Box<dyn IdSource> {
    fn clone(&self) -> Self {
        self.boxed_clone()
    }
}

/// Default id source: a counter advancing by one per call.
#[derive(Debug, Clone, Default)]
pub struct CounterIds {
    next: u32,
}

impl CounterIds {
    /// Creates a counter whose first id is `start`.
    pub fn starting_at(start: u32) -> Self {
        CounterIds { next: start }
    }
}

impl IdSource for CounterIds {
    fn next_id(&mut self) -> NodeId {
        let id = NodeId(self.next);
        self.next += 1;
        id
    }

    fn boxed_clone(&self) -> Box<dyn IdSource> {
        Box::new(self.clone())
    }
}
