//! Errors raised while setting up an analysis.

use tacflow_core::CoreError;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Core(#[from] CoreError),

    /// A live-out entry is not a TAC identifier.
    #[error("invalid variable name '{name}'")]
    InvalidVariable { name: String },
}
