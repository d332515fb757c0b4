//! # Expressions

use crate::span::Span;
use thin_vec::ThinVec;

/// An expression, something which produces a value
#[derive(Debug)]
pub enum Expression {
  /// An integer literal, e.g. `42`
  Integer(Integer),
  /// A string literal, e.g. `"hello"`
  String(StringLiteral),
  /// A reference to a variable, e.g. `x`
  Variable(Variable),
  /// A call to a function or a builtin operator, e.g. `f()` or `1 + 2`
  Call(Call),
}
impl Expression {
  /// The location of the expression
  pub fn span(&self) -> Span {
    match self {
      Self::Integer(integer) => integer.span,
      Self::String(string) => string.span,
      Self::Variable(variable) => variable.span,
      Self::Call(call) => call.span,
    }
  }
}

/// An integer literal, e.g. `42`
#[derive(Debug)]
pub struct Integer {
  /// The value of the literal
  pub value: i64,
  /// The location of the literal
  pub span: Span,
}

/// A string literal, with escape sequences resolved
#[derive(Debug)]
pub struct StringLiteral {
  /// The contents of the string, without quotes
  pub value: String,
  /// The location of the literal, including quotes
  pub span: Span,
}

/// A reference to a variable, e.g. `x`
#[derive(Debug)]
pub struct Variable {
  /// The name of the variable
  pub name: String,
  /// The location of the variable
  pub span: Span,
}

/// A call expression.
///
/// Binary and unary operators are represented as calls whose callee is the
/// operator symbol, with `is_operator` set. So `1 + 2` is a call to `+` with two
/// arguments, and `!x` is a call to `!` with one.
#[derive(Debug)]
pub struct Call {
  /// The name of the function, or the operator symbol
  pub callee: String,
  /// The location of the callee name, or the operator
  pub callee_span: Span,
  /// The arguments, in source order
  pub arguments: ThinVec<Expression>,
  /// Is this a builtin operator rather than a named function?
  pub is_operator: bool,
  /// The location of the whole call
  pub span: Span,
}
