//! # AST
//!
//! The definition of the Abstract Syntax Tree (AST).
//!
//! Every kind of node is a closed enum, so consumers match exhaustively and a new
//! node kind can't be silently ignored.

use crate::span::Span;
use thin_vec::ThinVec;

pub mod expression;
mod prettyprint;
pub mod statement;

pub use expression::Expression;
pub use statement::Statement;

/// Abstract Syntax Tree of a whole source file
#[must_use]
#[derive(Debug, Default)]
pub struct Program {
  /// The top level declarations, in source order
  pub declarations: Vec<Declaration>,
}
impl Program {
  /// All the function declarations in the program
  pub fn functions(&self) -> impl Iterator<Item = &Function> {
    self.declarations.iter().filter_map(|declaration| match declaration {
      Declaration::Function(function) => Some(function),
      Declaration::Variable(_) => None,
    })
  }
}

/// A top level declaration
#[derive(Debug)]
pub enum Declaration {
  /// A function, e.g. `fun main() { ... }`
  Function(Function),
  /// A global variable, e.g. `let x = 5;`
  Variable(statement::Let),
}
impl Declaration {
  /// The location of the declaration
  pub fn span(&self) -> Span {
    match self {
      Self::Function(function) => function.span,
      Self::Variable(variable) => variable.span,
    }
  }
}

/// A function declaration, e.g. `fun main() { return 0; }`
#[derive(Debug)]
pub struct Function {
  /// The name of the function
  pub name: String,
  /// The location of the name
  pub name_span: Span,
  /// The statements which make up the function
  pub body: Block,
  /// The location of the whole function
  pub span: Span,
}

/// A sequence of statements between curly braces
#[derive(Debug, Default)]
pub struct Block {
  /// The statements in the block
  pub statements: ThinVec<Statement>,
  /// The location of the block
  pub span: Span,
}
impl Block {
  /// The number of statements in the block
  #[must_use]
  pub fn len(&self) -> usize {
    self.statements.len()
  }

  /// Does the block not contain any statements?
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.statements.is_empty()
  }
}
