//! Token vocabulary shared by the lexer and the parser.

use std::fmt;

use serde::{Deserialize, Serialize};

/// The three reserved words of the language.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Keyword {
    If,
    IfFalse,
    Goto,
}

impl Keyword {
    pub fn as_str(self) -> &'static str {
        match self {
            Keyword::If => "if",
            Keyword::IfFalse => "ifFalse",
            Keyword::Goto => "goto",
        }
    }

    pub fn from_word(word: &str) -> Option<Keyword> {
        match word {
            "if" => Some(Keyword::If),
            "ifFalse" => Some(Keyword::IfFalse),
            "goto" => Some(Keyword::Goto),
            _ => None,
        }
    }
}

/// Operator and punctuation symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Symbol {
    EqEq,
    NotEq,
    LessEq,
    GreaterEq,
    Less,
    Greater,
    Assign,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Bang,
    Colon,
}

impl Symbol {
    /// Every symbol, longest spelling first so that prefix matching picks
    /// `<=` over `<`.
    pub const ALL: [Symbol; 14] = [
        Symbol::EqEq,
        Symbol::NotEq,
        Symbol::LessEq,
        Symbol::GreaterEq,
        Symbol::Less,
        Symbol::Greater,
        Symbol::Assign,
        Symbol::Plus,
        Symbol::Minus,
        Symbol::Star,
        Symbol::Slash,
        Symbol::Percent,
        Symbol::Bang,
        Symbol::Colon,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Symbol::EqEq => "==",
            Symbol::NotEq => "!=",
            Symbol::LessEq => "<=",
            Symbol::GreaterEq => ">=",
            Symbol::Less => "<",
            Symbol::Greater => ">",
            Symbol::Assign => "=",
            Symbol::Plus => "+",
            Symbol::Minus => "-",
            Symbol::Star => "*",
            Symbol::Slash => "/",
            Symbol::Percent => "%",
            Symbol::Bang => "!",
            Symbol::Colon => ":",
        }
    }

    /// Matches the longest symbol at the start of `text`.
    pub fn match_prefix(text: &str) -> Option<Symbol> {
        Symbol::ALL
            .into_iter()
            .find(|symbol| text.starts_with(symbol.as_str()))
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Token category together with its literal payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenKind {
    /// Lowercase variable name.
    Identifier(String),
    /// Uppercase jump label.
    Label(String),
    /// Non-negative integer literal.
    Integer(i64),
    Keyword(Keyword),
    Symbol(Symbol),
    EndOfLine,
}

impl TokenKind {
    /// The class used in "expected ..." diagnostics.
    pub fn class(&self) -> TokenClass {
        match self {
            TokenKind::Identifier(_) => TokenClass::Identifier,
            TokenKind::Label(_) => TokenClass::Label,
            TokenKind::Integer(_) => TokenClass::Integer,
            TokenKind::Keyword(Keyword::If) => TokenClass::If,
            TokenKind::Keyword(Keyword::IfFalse) => TokenClass::IfFalse,
            TokenKind::Keyword(Keyword::Goto) => TokenClass::Goto,
            TokenKind::Symbol(Symbol::Colon) => TokenClass::Colon,
            TokenKind::Symbol(Symbol::Assign) => TokenClass::Assign,
            TokenKind::Symbol(_) => TokenClass::Operator,
            TokenKind::EndOfLine => TokenClass::EndOfLine,
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Identifier(name) => write!(f, "identifier '{name}'"),
            TokenKind::Label(name) => write!(f, "label '{name}'"),
            TokenKind::Integer(value) => write!(f, "integer {value}"),
            TokenKind::Keyword(keyword) => write!(f, "'{}'", keyword.as_str()),
            TokenKind::Symbol(symbol) => write!(f, "'{symbol}'"),
            TokenKind::EndOfLine => f.write_str("end of line"),
        }
    }
}

/// Coarse token classes named by parse errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenClass {
    Identifier,
    Label,
    Integer,
    If,
    IfFalse,
    Goto,
    Colon,
    Assign,
    Operator,
    RelationalOperator,
    UnaryOperator,
    BinaryOperator,
    EndOfLine,
}

impl fmt::Display for TokenClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            TokenClass::Identifier => "identifier",
            TokenClass::Label => "label",
            TokenClass::Integer => "integer",
            TokenClass::If => "'if'",
            TokenClass::IfFalse => "'ifFalse'",
            TokenClass::Goto => "'goto'",
            TokenClass::Colon => "':'",
            TokenClass::Assign => "'='",
            TokenClass::Operator => "operator",
            TokenClass::RelationalOperator => "relational operator",
            TokenClass::UnaryOperator => "unary operator",
            TokenClass::BinaryOperator => "binary operator",
            TokenClass::EndOfLine => "end of line",
        };
        f.write_str(text)
    }
}

/// A token tagged with its 1-based source line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
}

impl Token {
    pub fn new(kind: TokenKind, line: usize) -> Self {
        Token { kind, line }
    }
}
