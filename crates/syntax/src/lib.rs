//! # Syntax
//! Parse Ava source code into an Abstract Syntax Tree
//!
//! A hand written recursive descent parser. The source is first tokenised, and the
//! tokens are then consumed to build an owned tree of declarations, statements and
//! expressions. Every node keeps the [`Span`] of source it came from, so later stages
//! can point diagnostics at the right place.
//!
//! Parsing stops at the first error.

pub mod ast;
mod parser;
mod span;
mod tokeniser;

#[cfg(test)]
mod test;

/// Parses a source code string into an AST.
///
/// # Examples
/// ```
/// use ava_syntax::parse;
/// let program = parse("fun main() { return 1 + 2; }").unwrap();
///
/// assert_eq!(program.declarations.len(), 1);
/// ```
///
/// # Errors
/// If the source is not a valid program
pub fn parse(source: &str) -> Result<ast::Program, ParseError> {
  let tokens = tokenise(source).collect();
  parser::Parser::new(source, tokens).parse()
}

/// Get the tokens from a source code string
pub fn tokenise(source: &str) -> impl Iterator<Item = tokeniser::Token> + '_ {
  tokeniser::Tokeniser::from(source)
}

pub use ast::Program;
pub use parser::ParseError;
pub use span::{LineIndex, Span};
pub use tokeniser::{Token, TokenKind};
