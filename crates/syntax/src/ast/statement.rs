//! # Statements

use super::{Block, expression::Expression, expression::Variable};
use crate::span::Span;

/// A statement within a function body
#[derive(Debug)]
pub enum Statement {
  /// A variable declaration, e.g. `let x = 1;`
  Let(Let),
  /// An expression, evaluated for its side effects, e.g. `putint(3);`
  Expression(ExpressionStmt),
  /// A loop, e.g. `while (x < 3) { ... }`
  While(While),
  /// A conditional, e.g. `if (x == 3) { ... } else { ... }`
  If(If),
  /// An assignment to an existing variable, e.g. `x = x + 1;`
  Assign(Assign),
  /// A return from the current function, e.g. `return x;`
  Return(Return),
}
impl Statement {
  /// The location of the statement
  pub fn span(&self) -> Span {
    match self {
      Self::Let(let_) => let_.span,
      Self::Expression(expression) => expression.span,
      Self::While(while_) => while_.span,
      Self::If(if_) => if_.span,
      Self::Assign(assign) => assign.span,
      Self::Return(return_) => return_.span,
    }
  }
}

/// A variable declaration, e.g. `let x = 1;` or `let x;`
#[derive(Debug)]
pub struct Let {
  /// The name of the variable
  pub name: String,
  /// The initial value, if one is given
  pub value: Option<Expression>,
  /// The location of the declaration
  pub span: Span,
}
impl Let {
  /// Does the declaration give the variable an initial value?
  #[must_use]
  pub fn has_initializer(&self) -> bool {
    self.value.is_some()
  }
}

/// An expression on its own, e.g. `putint(3);`
#[derive(Debug)]
pub struct ExpressionStmt {
  /// The expression
  pub expression: Expression,
  /// The location of the statement
  pub span: Span,
}

/// A loop, e.g. `while (x < 3) { x = x + 1; }`
#[derive(Debug)]
pub struct While {
  /// Loop continues while this isn't zero
  pub condition: Expression,
  /// The body of the loop
  pub body: Block,
  /// The location of the loop
  pub span: Span,
}

/// A conditional, e.g. `if (x) { ... } else { ... }`
///
/// An `else if` chain is stored as an `else` block containing a single `if`.
#[derive(Debug)]
pub struct If {
  /// The then block is executed if this isn't zero
  pub condition: Expression,
  /// Executed when the condition isn't zero
  pub then: Block,
  /// Executed when the condition is zero
  pub otherwise: Option<Block>,
  /// The location of the conditional
  pub span: Span,
}

/// An assignment, e.g. `x = 4;`
#[derive(Debug)]
pub struct Assign {
  /// The variable being assigned to
  pub target: Variable,
  /// The value being assigned
  pub value: Expression,
  /// The location of the assignment
  pub span: Span,
}

/// A return statement, e.g. `return x;`
#[derive(Debug)]
pub struct Return {
  /// The value being returned. Functions return `0` if there is no value
  pub value: Option<Expression>,
  /// The location of the statement
  pub span: Span,
}
