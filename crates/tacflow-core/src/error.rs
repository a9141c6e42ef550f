//! Error types for tacflow-core.
//!
//! Source diagnostics ([`SourceError`]) always carry a 1-based line and a
//! human-readable message. Every front-end stage collects them across the
//! whole input and reports them together as one [`CollectiveError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::id::NodeId;
use crate::token::{TokenClass, TokenKind};

/// The three diagnostic families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Unrecognized token text.
    Lexical,
    /// Token present but not matching any expected continuation.
    Syntactic,
    /// Label referenced but never defined, or defined more than once.
    Semantic,
}

/// Operator categories checked by the parser.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OperatorCategory {
    Relational,
    Unary,
    Binary,
}

impl fmt::Display for OperatorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OperatorCategory::Relational => f.write_str("relational"),
            OperatorCategory::Unary => f.write_str("unary"),
            OperatorCategory::Binary => f.write_str("binary"),
        }
    }
}

/// A single diagnostic tied to a source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[serde(tag = "type")]
pub enum SourceError {
    #[error("line {line}: illegal token '{text}'")]
    IllegalToken { line: usize, text: String },

    #[error("line {line}: expected {}, found {found}", join_classes(.expected))]
    UnexpectedToken {
        line: usize,
        expected: Vec<TokenClass>,
        found: TokenKind,
    },

    #[error("line {line}: expected {}, found end of input", join_classes(.expected))]
    UnexpectedEnd {
        line: usize,
        expected: Vec<TokenClass>,
    },

    #[error("line {line}: '{symbol}' is not a valid {category} operator")]
    InvalidOperator {
        line: usize,
        symbol: String,
        category: OperatorCategory,
    },

    #[error("line {line}: label '{label}' is already defined on line {first_line}")]
    LabelAlreadyDefined {
        line: usize,
        label: String,
        first_line: usize,
    },

    #[error("line {line}: label '{label}' is not defined")]
    LabelNotDefined { line: usize, label: String },
}

impl SourceError {
    /// The 1-based source line this diagnostic points at.
    pub fn line(&self) -> usize {
        match self {
            SourceError::IllegalToken { line, .. }
            | SourceError::UnexpectedToken { line, .. }
            | SourceError::UnexpectedEnd { line, .. }
            | SourceError::InvalidOperator { line, .. }
            | SourceError::LabelAlreadyDefined { line, .. }
            | SourceError::LabelNotDefined { line, .. } => *line,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SourceError::IllegalToken { .. } => ErrorKind::Lexical,
            SourceError::UnexpectedToken { .. }
            | SourceError::UnexpectedEnd { .. }
            | SourceError::InvalidOperator { .. } => ErrorKind::Syntactic,
            SourceError::LabelAlreadyDefined { .. } | SourceError::LabelNotDefined { .. } => {
                ErrorKind::Semantic
            }
        }
    }

    /// The message without the `line N:` prefix.
    pub fn reason(&self) -> String {
        let full = self.to_string();
        match full.split_once(": ") {
            Some((_, reason)) => reason.to_string(),
            None => full,
        }
    }
}

fn join_classes(classes: &[TokenClass]) -> String {
    match classes {
        [] => "nothing".to_string(),
        [only] => only.to_string(),
        [init @ .., last] => {
            let head: Vec<String> = init.iter().map(ToString::to_string).collect();
            format!("{} or {last}", head.join(", "))
        }
    }
}

/// Front-end stage that produced a [`CollectiveError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Lexing,
    Parsing,
    Verification,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Lexing => f.write_str("lexing"),
            Stage::Parsing => f.write_str("parsing"),
            Stage::Verification => f.write_str("verification"),
        }
    }
}

/// All diagnostics of one stage, reported at once.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Error)]
#[error("{stage} failed with {}", count_errors(.errors.len()))]
pub struct CollectiveError {
    pub stage: Stage,
    pub errors: Vec<SourceError>,
}

impl CollectiveError {
    pub fn new(stage: Stage, errors: Vec<SourceError>) -> Self {
        CollectiveError { stage, errors }
    }

    /// Returns `Ok(())` when `errors` is empty, the collective error otherwise.
    pub fn check(stage: Stage, errors: Vec<SourceError>) -> Result<(), CollectiveError> {
        if errors.is_empty() {
            Ok(())
        } else {
            Err(CollectiveError::new(stage, errors))
        }
    }

    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

fn count_errors(count: usize) -> String {
    if count == 1 {
        "1 error".to_string()
    } else {
        format!("{count} errors")
    }
}

/// Errors from querying a verified program.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The id does not belong to any instruction of the program.
    #[error("instruction not found: NodeId({id})", id = id.0)]
    InstructionNotFound { id: NodeId },
}
