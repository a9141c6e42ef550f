//! Line-oriented lexer for three-address code.
//!
//! Each input line is trimmed and scanned on its own, so one statement never
//! spans lines. Words are classified as keyword, label, identifier or integer
//! literal; symbols are matched longest-first and do not need surrounding
//! whitespace (`LOOP:` and `a=b+1` both lex). An [`TokenKind::EndOfLine`]
//! token closes every line.
//!
//! An unclassifiable piece records an illegal-token error and skips the rest
//! of its line; scanning resumes on the next line so every bad line is
//! reported in a single pass.

use crate::error::{CollectiveError, SourceError, Stage};
use crate::token::{Keyword, Symbol, Token, TokenKind};

/// Converts source text into a flat token sequence.
///
/// Returns every illegal token of the input at once as a
/// [`CollectiveError`] with stage [`Stage::Lexing`].
pub fn tokenize(text: &str) -> Result<Vec<Token>, CollectiveError> {
    let mut tokens = Vec::new();
    let mut errors = Vec::new();

    for (index, line) in text.lines().enumerate() {
        let number = index + 1;
        if let Err(error) = lex_line(line, number, &mut tokens) {
            errors.push(error);
        }
        tokens.push(Token::new(TokenKind::EndOfLine, number));
    }

    CollectiveError::check(Stage::Lexing, errors)?;
    Ok(tokens)
}

fn lex_line(line: &str, number: usize, tokens: &mut Vec<Token>) -> Result<(), SourceError> {
    let mut rest = line.trim();

    while let Some(first) = rest.chars().next() {
        if first.is_whitespace() {
            rest = rest.trim_start();
            continue;
        }

        if is_word_char(first) {
            let end = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
            let (word, tail) = rest.split_at(end);
            let kind = classify_word(word).ok_or_else(|| SourceError::IllegalToken {
                line: number,
                text: word.to_string(),
            })?;
            tokens.push(Token::new(kind, number));
            rest = tail;
            continue;
        }

        if let Some(symbol) = Symbol::match_prefix(rest) {
            tokens.push(Token::new(TokenKind::Symbol(symbol), number));
            rest = &rest[symbol.as_str().len()..];
            continue;
        }

        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        return Err(SourceError::IllegalToken {
            line: number,
            text: rest[..end].to_string(),
        });
    }

    Ok(())
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

fn classify_word(word: &str) -> Option<TokenKind> {
    if let Some(keyword) = Keyword::from_word(word) {
        return Some(TokenKind::Keyword(keyword));
    }

    let mut chars = word.chars();
    let first = chars.next()?;
    let tail = chars.as_str();

    if first.is_ascii_digit() {
        // No leading zeros unless the literal is exactly "0".
        if !word.bytes().all(|b| b.is_ascii_digit()) || (first == '0' && !tail.is_empty()) {
            return None;
        }
        return word.parse().ok().map(TokenKind::Integer);
    }

    let tail_matches = |accept: fn(char) -> bool| tail.chars().all(|c| accept(c) || c == '_');

    if first.is_ascii_lowercase() && tail_matches(|c| c.is_ascii_lowercase() || c.is_ascii_digit())
    {
        return Some(TokenKind::Identifier(word.to_string()));
    }

    if first.is_ascii_uppercase() && tail_matches(|c| c.is_ascii_uppercase() || c.is_ascii_digit())
    {
        return Some(TokenKind::Label(word.to_string()));
    }

    None
}
