//! Control-flow graphs and step-by-step dataflow analyses over TAC programs.
//!
//! - [`cfg`] builds per-instruction and basic-block graphs.
//! - [`dataflow`] holds liveness, reaching definitions and constant
//!   propagation, each an iterator of [`Snapshot`]s.
//! - [`navigator`] windows any step producer for forward/backward stepping.
//! - [`session`] ties a program, a selected analysis and a navigator together.

pub mod cfg;
pub mod dataflow;
pub mod error;
pub mod navigator;
pub mod observe;
pub mod session;
pub mod view;

// Re-export commonly used types
pub use cfg::{ControlFlowGraph, Granularity, NodeKind};
pub use dataflow::{ConstValue, DataflowEngine, FactKind, FactValue, Phase, Snapshot};
pub use error::AnalysisError;
pub use navigator::{StepNavigator, WindowSize};
pub use observe::{ObservationStore, Observed};
pub use session::{Algorithm, AnalysisSession, SessionConfig};
pub use view::{EdgeView, GraphView, InstructionView, NodeView};
