//! Recursive-descent parser from tokens to [`Instruction`]s.
//!
//! The token sequence is reversed once and consumed as a stack, so popping
//! the next token is O(1). Each instruction may start with a `LABEL:` prefix
//! and must end at an end-of-line token; a label alone on its line attaches
//! to the next instruction.
//!
//! On a syntax error the rest of the line is discarded and parsing resumes on
//! the next line. If any error was recorded the whole parse fails with every
//! diagnostic; a partial instruction list is never returned.

use crate::error::{CollectiveError, OperatorCategory, SourceError, Stage};
use crate::instruction::{BinaryOp, Instruction, InstructionKind, Operand, RelOp, UnaryOp};
use crate::token::{Keyword, Symbol, Token, TokenClass, TokenKind};

const STATEMENT_START: &[TokenClass] = &[
    TokenClass::Identifier,
    TokenClass::If,
    TokenClass::IfFalse,
    TokenClass::Goto,
];

const OPERAND: &[TokenClass] = &[TokenClass::Identifier, TokenClass::Integer];

/// Parses a token sequence into instructions, all-or-nothing.
pub fn parse(tokens: Vec<Token>) -> Result<Vec<Instruction>, CollectiveError> {
    Parser::new(tokens).run()
}

struct Parser {
    /// Remaining tokens, next token last.
    stack: Vec<Token>,
    /// Line of the most recently consumed token, for end-of-input errors.
    last_line: usize,
    errors: Vec<SourceError>,
}

impl Parser {
    fn new(mut tokens: Vec<Token>) -> Self {
        tokens.reverse();
        Parser {
            stack: tokens,
            last_line: 1,
            errors: Vec::new(),
        }
    }

    fn run(mut self) -> Result<Vec<Instruction>, CollectiveError> {
        let mut instructions = Vec::new();

        loop {
            self.skip_blank_lines();
            if self.stack.is_empty() {
                break;
            }
            match self.instruction() {
                Ok(instruction) => instructions.push(instruction),
                Err(error) => {
                    self.errors.push(error);
                    self.skip_line();
                }
            }
        }

        CollectiveError::check(Stage::Parsing, self.errors)?;
        Ok(instructions)
    }

    // -----------------------------------------------------------------------
    // Token stack primitives
    // -----------------------------------------------------------------------

    fn peek(&self) -> Option<&Token> {
        self.stack.last()
    }

    fn peek_kind(&self) -> Option<&TokenKind> {
        self.peek().map(|token| &token.kind)
    }

    fn pop(&mut self) -> Option<Token> {
        let token = self.stack.pop();
        if let Some(token) = &token {
            self.last_line = token.line;
        }
        token
    }

    fn skip_blank_lines(&mut self) {
        while matches!(self.peek_kind(), Some(TokenKind::EndOfLine)) {
            self.pop();
        }
    }

    /// Discards tokens up to and including the next end-of-line.
    fn skip_line(&mut self) {
        while let Some(token) = self.pop() {
            if token.kind == TokenKind::EndOfLine {
                break;
            }
        }
    }

    fn unexpected(&self, expected: &[TokenClass]) -> SourceError {
        match self.peek() {
            Some(token) => SourceError::UnexpectedToken {
                line: token.line,
                expected: expected.to_vec(),
                found: token.kind.clone(),
            },
            None => SourceError::UnexpectedEnd {
                line: self.last_line,
                expected: expected.to_vec(),
            },
        }
    }

    /// Pops the next token if `accept` maps it to a value.
    fn expect<T>(
        &mut self,
        expected: &[TokenClass],
        accept: impl FnOnce(&TokenKind) -> Option<T>,
    ) -> Result<T, SourceError> {
        match self.peek_kind().and_then(accept) {
            Some(value) => {
                self.pop();
                Ok(value)
            }
            None => Err(self.unexpected(expected)),
        }
    }

    fn expect_identifier(&mut self) -> Result<String, SourceError> {
        self.expect(&[TokenClass::Identifier], |kind| match kind {
            TokenKind::Identifier(name) => Some(name.clone()),
            _ => None,
        })
    }

    fn expect_label(&mut self) -> Result<String, SourceError> {
        self.expect(&[TokenClass::Label], |kind| match kind {
            TokenKind::Label(name) => Some(name.clone()),
            _ => None,
        })
    }

    fn expect_operand(&mut self, expected: &[TokenClass]) -> Result<Operand, SourceError> {
        self.expect(expected, |kind| match kind {
            TokenKind::Identifier(name) => Some(Operand::Variable(name.clone())),
            TokenKind::Integer(value) => Some(Operand::Integer(*value)),
            _ => None,
        })
    }

    fn expect_keyword(&mut self, keyword: Keyword, class: TokenClass) -> Result<(), SourceError> {
        self.expect(&[class], |kind| {
            (*kind == TokenKind::Keyword(keyword)).then_some(())
        })
    }

    fn expect_symbol(&mut self, symbol: Symbol, class: TokenClass) -> Result<(), SourceError> {
        self.expect(&[class], |kind| {
            (*kind == TokenKind::Symbol(symbol)).then_some(())
        })
    }

    /// Pops an operator symbol of the given category.
    ///
    /// A symbol outside the category is an invalid-operator error; any other
    /// token is an unexpected-token error listing `expected`.
    fn expect_operator<T>(
        &mut self,
        category: OperatorCategory,
        expected: &[TokenClass],
        convert: fn(Symbol) -> Option<T>,
    ) -> Result<T, SourceError> {
        let Some(&Token {
            kind: TokenKind::Symbol(symbol),
            line,
        }) = self.peek()
        else {
            return Err(self.unexpected(expected));
        };

        match convert(symbol) {
            Some(op) => {
                self.pop();
                Ok(op)
            }
            None => Err(SourceError::InvalidOperator {
                line,
                symbol: symbol.as_str().to_string(),
                category,
            }),
        }
    }

    fn expect_end_of_line(&mut self) -> Result<(), SourceError> {
        match self.peek_kind() {
            None => Ok(()),
            Some(TokenKind::EndOfLine) => {
                self.pop();
                Ok(())
            }
            Some(_) => Err(self.unexpected(&[TokenClass::EndOfLine])),
        }
    }

    // -----------------------------------------------------------------------
    // Grammar
    // -----------------------------------------------------------------------

    fn instruction(&mut self) -> Result<Instruction, SourceError> {
        let label = self.label_prefix()?;
        if label.is_some() {
            self.skip_blank_lines();
        }

        let Some(line) = self.peek().map(|token| token.line) else {
            return Err(self.unexpected(STATEMENT_START));
        };

        let kind = match self.peek_kind() {
            Some(TokenKind::Keyword(Keyword::Goto)) => {
                self.pop();
                InstructionKind::Jump {
                    target: self.expect_label()?,
                }
            }
            Some(TokenKind::Keyword(Keyword::If)) => {
                self.pop();
                self.if_statement()?
            }
            Some(TokenKind::Keyword(Keyword::IfFalse)) => {
                self.pop();
                let condition = self.expect_identifier()?;
                self.expect_keyword(Keyword::Goto, TokenClass::Goto)?;
                InstructionKind::JumpIfFalse {
                    condition,
                    target: self.expect_label()?,
                }
            }
            Some(TokenKind::Identifier(_)) => self.assignment()?,
            _ => return Err(self.unexpected(STATEMENT_START)),
        };

        self.expect_end_of_line()?;
        Ok(Instruction::new(label, line, kind))
    }

    fn label_prefix(&mut self) -> Result<Option<String>, SourceError> {
        let Some(TokenKind::Label(name)) = self.peek_kind() else {
            return Ok(None);
        };
        let name = name.clone();
        self.pop();
        self.expect_symbol(Symbol::Colon, TokenClass::Colon)?;
        Ok(Some(name))
    }

    /// Everything after `if`: either `a goto L` or `a <relop> b goto L`.
    fn if_statement(&mut self) -> Result<InstructionKind, SourceError> {
        let line = self.peek().map_or(self.last_line, |token| token.line);
        let lhs = self.expect_operand(OPERAND)?;

        if matches!(self.peek_kind(), Some(TokenKind::Keyword(Keyword::Goto))) {
            let condition = match lhs {
                Operand::Variable(name) => name,
                Operand::Integer(value) => {
                    return Err(SourceError::UnexpectedToken {
                        line,
                        expected: vec![TokenClass::Identifier],
                        found: TokenKind::Integer(value),
                    })
                }
            };
            self.pop();
            return Ok(InstructionKind::JumpIfTrue {
                condition,
                target: self.expect_label()?,
            });
        }

        let op = self.expect_operator(
            OperatorCategory::Relational,
            &[TokenClass::RelationalOperator, TokenClass::Goto],
            RelOp::from_symbol,
        )?;
        let rhs = self.expect_operand(OPERAND)?;
        self.expect_keyword(Keyword::Goto, TokenClass::Goto)?;
        Ok(InstructionKind::JumpIfRelation {
            lhs,
            op,
            rhs,
            target: self.expect_label()?,
        })
    }

    /// `x = a`, `x = <unaryop> a` or `x = a <binop> b`.
    fn assignment(&mut self) -> Result<InstructionKind, SourceError> {
        let dest = self.expect_identifier()?;
        self.expect_symbol(Symbol::Assign, TokenClass::Assign)?;

        let unary = match self.peek_kind() {
            Some(TokenKind::Symbol(symbol)) => UnaryOp::from_symbol(*symbol),
            _ => None,
        };
        if let Some(op) = unary {
            self.pop();
            let operand = self.expect_operand(OPERAND)?;
            return Ok(InstructionKind::Unary { dest, op, operand });
        }

        let lhs = self.expect_operand(&[
            TokenClass::Identifier,
            TokenClass::Integer,
            TokenClass::UnaryOperator,
        ])?;

        if matches!(self.peek_kind(), None | Some(TokenKind::EndOfLine)) {
            return Ok(InstructionKind::Copy { dest, source: lhs });
        }

        let op = self.expect_operator(
            OperatorCategory::Binary,
            &[TokenClass::BinaryOperator, TokenClass::EndOfLine],
            BinaryOp::from_symbol,
        )?;
        let rhs = self.expect_operand(OPERAND)?;
        Ok(InstructionKind::Binary { dest, lhs, op, rhs })
    }
}
