//! Pretty-print the AST into a human readable format.

use super::{Block, Declaration, Function, Program, expression::*, statement::*};
use std::fmt;

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    for declaration in &self.declarations {
      declaration.pretty(f, "", false)?;
    }

    Ok(())
  }
}

const OTHER_CHILD: &str = "│  ";
const OTHER_ENTRY: &str = "├─ ";
const FINAL_CHILD: &str = "   ";
const FINAL_ENTRY: &str = "╰─ ";

fn connector(last: bool) -> &'static str {
  if last { FINAL_ENTRY } else { OTHER_ENTRY }
}
fn child_prefix(prefix: &str, last: bool) -> String {
  format!("{prefix}{}", if last { FINAL_CHILD } else { OTHER_CHILD })
}

trait PrettyPrint {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result;
}

impl PrettyPrint for Declaration {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    match self {
      Self::Function(function) => function.pretty(f, prefix, last),
      Self::Variable(variable) => variable.pretty(f, prefix, last),
    }
  }
}
impl PrettyPrint for Function {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}Function ({})", connector(last), self.name)?;
    self.body.pretty(f, &child_prefix(prefix, last), true)
  }
}
impl PrettyPrint for Block {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}Block", connector(last))?;

    let prefix = child_prefix(prefix, last);
    if let Some((last_statement, statements)) = self.statements.split_last() {
      for statement in statements {
        statement.pretty(f, &prefix, false)?;
      }
      last_statement.pretty(f, &prefix, true)?;
    }

    Ok(())
  }
}

impl PrettyPrint for Statement {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    match self {
      Self::Let(x) => x.pretty(f, prefix, last),
      Self::Expression(x) => x.expression.pretty(f, prefix, last),
      Self::While(x) => x.pretty(f, prefix, last),
      Self::If(x) => x.pretty(f, prefix, last),
      Self::Assign(x) => x.pretty(f, prefix, last),
      Self::Return(x) => x.pretty(f, prefix, last),
    }
  }
}
impl PrettyPrint for Let {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}Let '{}' =", connector(last), self.name)?;

    if let Some(value) = &self.value {
      value.pretty(f, &child_prefix(prefix, last), true)?;
    }

    Ok(())
  }
}
impl PrettyPrint for While {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}While", connector(last))?;

    let prefix = child_prefix(prefix, last);
    writeln!(f, "{prefix}{OTHER_ENTRY}Condition")?;
    self.condition.pretty(f, &format!("{prefix}{OTHER_CHILD}"), true)?;
    self.body.pretty(f, &prefix, true)
  }
}
impl PrettyPrint for If {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}If", connector(last))?;

    let prefix = child_prefix(prefix, last);
    writeln!(f, "{prefix}{OTHER_ENTRY}Condition")?;
    self.condition.pretty(f, &format!("{prefix}{OTHER_CHILD}"), true)?;

    match &self.otherwise {
      Some(otherwise) => {
        self.then.pretty(f, &prefix, false)?;
        otherwise.pretty(f, &prefix, true)
      }
      None => self.then.pretty(f, &prefix, true),
    }
  }
}
impl PrettyPrint for Assign {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}Assign '{}' =", connector(last), self.target.name)?;
    self.value.pretty(f, &child_prefix(prefix, last), true)
  }
}
impl PrettyPrint for Return {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    writeln!(f, "{prefix}{}Return", connector(last))?;

    if let Some(value) = &self.value {
      value.pretty(f, &child_prefix(prefix, last), true)?;
    }

    Ok(())
  }
}

impl PrettyPrint for Expression {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    match self {
      Self::Integer(x) => writeln!(f, "{prefix}{}Integer ({})", connector(last), x.value),
      Self::String(x) => writeln!(f, "{prefix}{}String {:?}", connector(last), x.value),
      Self::Variable(x) => writeln!(f, "{prefix}{}Variable ({})", connector(last), x.name),
      Self::Call(x) => x.pretty(f, prefix, last),
    }
  }
}
impl PrettyPrint for Call {
  fn pretty(&self, f: &mut fmt::Formatter, prefix: &str, last: bool) -> fmt::Result {
    let kind = if self.is_operator { "Operator" } else { "Call" };
    writeln!(f, "{prefix}{}{kind} ({})", connector(last), self.callee)?;

    let prefix = child_prefix(prefix, last);
    if let Some((last_argument, arguments)) = self.arguments.split_last() {
      for argument in arguments {
        argument.pretty(f, &prefix, false)?;
      }
      last_argument.pretty(f, &prefix, true)?;
    }

    Ok(())
  }
}
