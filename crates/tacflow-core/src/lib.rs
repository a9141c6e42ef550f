pub mod error;
pub mod id;
pub mod instruction;
pub mod lexer;
pub mod parser;
pub mod program;
pub mod token;

// Re-export commonly used types
pub use error::{CollectiveError, CoreError, ErrorKind, SourceError, Stage};
pub use id::{CounterIds, IdSource, NodeId};
pub use instruction::{BinaryOp, Instruction, InstructionKind, Operand, RelOp, UnaryOp};
pub use lexer::tokenize;
pub use parser::parse;
pub use program::{build_program, Program};
pub use token::{Keyword, Symbol, Token, TokenClass, TokenKind};
