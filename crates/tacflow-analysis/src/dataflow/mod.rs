//! Dataflow analyses as step-by-step producers of [`Snapshot`]s.
//!
//! Each analysis implements [`Analysis`] and is driven by a
//! [`FixpointEngine`], an iterator that pauses after every fact
//! recomputation. [`DataflowEngine`] erases the concrete analysis so callers
//! can switch between them at runtime.

pub mod constants;
pub mod engine;
pub mod liveness;
pub mod reaching;
pub mod snapshot;

pub use constants::{meet_maps, ConstMap, ConstValue, ConstantPropagation};
pub use engine::{Analysis, DataflowEngine, Direction, FixpointEngine};
pub use liveness::{use_def, Liveness};
pub use reaching::{definition_tags, ReachingDefinitions};
pub use snapshot::{FactKind, FactValue, NodeFacts, Phase, Snapshot};
