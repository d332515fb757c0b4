use crate::bytecode::{Label, OpCode, OperandOrder, Program, ProgramBuilder, Register};
use crate::collections::{HashMap, String as SmartString};
use ava_syntax::{
  Span,
  ast::{Block, Declaration, Function, Program as Ast, expression::*, statement::*},
};
use std::{error, fmt};

/// Lowers an AST into a linked bytecode program
///
/// Every function gets a frame of local slots, sized by counting its `let`s up front:
///
/// ```text
/// prologue:  Load fp, LoadImmediate 0 (once per local), SetFp
/// epilogue:  Store r0, Pop (once per local), Store fp, Ret
/// ```
///
/// `return` leaves its value on the stack and jumps to the epilogue, which moves it into
/// `r0` for `Ret` to hand back to the caller.
pub struct Assembler {
  builder: ProgramBuilder,
  functions: HashMap<SmartString, Label>,

  scopes: Vec<HashMap<SmartString, i64>>,
  next_slot: i64,
  /// Where `return` jumps to in the current function
  epilogue: Label,
}
impl Assembler {
  fn new() -> Self {
    Self {
      builder: ProgramBuilder::new(),
      functions: HashMap::default(),

      scopes: Vec::with_capacity(8),
      next_slot: 0,
      epilogue: Label::new(0),
    }
  }

  /// Assemble a whole program, starting from the `main` function
  pub fn assemble(ast: &Ast) -> Result<Program, AssembleError> {
    let mut assembler = Self::new();

    // declare every function first, so calls can refer to later functions
    for declaration in &ast.declarations {
      match declaration {
        Declaration::Function(function) => assembler.declare_function(function)?,
        Declaration::Variable(variable) => {
          return Err(AssembleError::UnsupportedDeclaration {
            span: variable.span,
          });
        }
      }
    }

    let Some(main) = assembler.functions.get("main").copied() else {
      return Err(AssembleError::MissingMain);
    };

    for function in ast.functions() {
      assembler.function(function)?;
    }

    let entry = assembler.builder.new_label();
    assembler.builder.name_label(entry, "<entry>");
    assembler.builder.mark(entry);
    assembler.builder.add_jump(OpCode::Call, main);
    assembler.builder.add(OpCode::Store, Register::R0.id());
    assembler.builder.add_opcode(OpCode::Hlt);

    assembler.builder.finish(entry)
  }

  fn declare_function(&mut self, function: &Function) -> Result<(), AssembleError> {
    if self.functions.contains_key(function.name.as_str()) {
      return Err(AssembleError::DuplicateFunction {
        name: function.name.clone(),
        span: function.name_span,
      });
    }

    let label = self.builder.new_label();
    self.builder.name_label(label, &function.name);
    self.functions.insert(function.name.as_str().into(), label);

    Ok(())
  }

  fn function(&mut self, function: &Function) -> Result<(), AssembleError> {
    let label = self.functions[function.name.as_str()];
    let epilogue = self.builder.new_label();
    let locals = count_locals(&function.body);

    self.scopes.clear();
    self.next_slot = 0;
    self.epilogue = epilogue;

    self.builder.mark(label);
    self.builder.add(OpCode::Load, Register::Fp.id());
    for _ in 0..locals {
      self.builder.add(OpCode::LoadImmediate, 0);
    }
    self.builder.add_opcode(OpCode::SetFp);

    function.body.assemble(self)?;

    // running off the end of the body returns 0
    self.builder.add(OpCode::LoadImmediate, 0);

    self.builder.mark(epilogue);
    self.builder.add(OpCode::Store, Register::R0.id());
    for _ in 0..locals {
      self.builder.add_opcode(OpCode::Pop);
    }
    self.builder.add(OpCode::Store, Register::Fp.id());
    self.builder.add_opcode(OpCode::Ret);

    Ok(())
  }

  fn begin_scope(&mut self) {
    self.scopes.push(HashMap::default());
  }
  fn end_scope(&mut self) {
    self.scopes.pop();
  }

  fn define_variable(&mut self, name: &str) -> i64 {
    let slot = self.next_slot;
    self.next_slot += 1;

    if let Some(scope) = self.scopes.last_mut() {
      scope.insert(name.into(), slot);
    }

    slot
  }
  fn resolve_variable(&self, variable: &Variable) -> Result<i64, AssembleError> {
    (self.scopes.iter().rev())
      .find_map(|scope| scope.get(variable.name.as_str()).copied())
      .ok_or_else(|| AssembleError::UndefinedVariable {
        name: variable.name.clone(),
        span: variable.span,
      })
  }
}

/// The number of local slots a function body needs, one for each `let`
fn count_locals(block: &Block) -> usize {
  (block.statements.iter())
    .map(|statement| match statement {
      Statement::Let(_) => 1,
      Statement::While(while_) => count_locals(&while_.body),
      Statement::If(if_) => {
        count_locals(&if_.then) + if_.otherwise.as_ref().map_or(0, count_locals)
      }
      Statement::Expression(_) | Statement::Assign(_) | Statement::Return(_) => 0,
    })
    .sum()
}

/// Functions provided by the machine, rather than defined in the program
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Intrinsic {
  /// `putint(n)`, print an integer
  PutInt,
  /// `putstr(s)`, print a string
  PutStr,
  /// `getint()`, read a byte of input
  GetInt,
}
impl Intrinsic {
  /// Look up an intrinsic by the name it is called with
  #[must_use]
  pub fn from_name(name: &str) -> Option<Self> {
    match name {
      "putint" => Some(Self::PutInt),
      "putstr" => Some(Self::PutStr),
      "getint" => Some(Self::GetInt),
      _ => None,
    }
  }

  /// The number of arguments the intrinsic takes
  #[must_use]
  pub fn arity(self) -> usize {
    match self {
      Self::PutInt | Self::PutStr => 1,
      Self::GetInt => 0,
    }
  }

  /// The instruction which performs the intrinsic
  #[must_use]
  pub fn opcode(self) -> OpCode {
    match self {
      Self::PutInt => OpCode::PutInt,
      Self::PutStr => OpCode::PutStr,
      Self::GetInt => OpCode::GetInt,
    }
  }

  /// Does the intrinsic leave a value on the stack?
  #[must_use]
  pub fn has_value(self) -> bool {
    match self {
      Self::PutInt | Self::PutStr => false,
      Self::GetInt => true,
    }
  }
}

/// Get the opcode for a binary operator, and if its result should be negated
fn binary_operator(operator: &str) -> Option<(OpCode, bool)> {
  match operator {
    "+" => Some((OpCode::Add, false)),
    "-" => Some((OpCode::Sub, false)),
    "*" => Some((OpCode::Mul, false)),
    "/" => Some((OpCode::Div, false)),
    "%" => Some((OpCode::Mod, false)),
    "<" => Some((OpCode::Lt, false)),
    ">" => Some((OpCode::Gt, false)),
    "==" => Some((OpCode::Eq, false)),
    "!=" => Some((OpCode::Eq, true)),
    "<=" => Some((OpCode::Gt, true)),
    ">=" => Some((OpCode::Lt, true)),
    _ => None,
  }
}

trait Assemble {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError>;
}

impl Assemble for Block {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    assembler.begin_scope();
    for statement in &self.statements {
      statement.assemble(assembler)?;
    }
    assembler.end_scope();

    Ok(())
  }
}

impl Assemble for Statement {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    match self {
      Self::Let(let_) => let_.assemble(assembler),
      Self::Expression(expression) => expression.assemble(assembler),
      Self::While(while_) => while_.assemble(assembler),
      Self::If(if_) => if_.assemble(assembler),
      Self::Assign(assign) => assign.assemble(assembler),
      Self::Return(return_) => return_.assemble(assembler),
    }
  }
}
impl Assemble for Let {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    // the initializer can't see the variable it defines
    match &self.value {
      Some(value) => value.assemble(assembler)?,
      None => assembler.builder.add(OpCode::LoadImmediate, 0),
    }

    let slot = assembler.define_variable(&self.name);
    assembler.builder.add(OpCode::StoreA, slot);

    Ok(())
  }
}
impl Assemble for ExpressionStmt {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    let has_value = match &self.expression {
      Expression::Call(call) => assembler.call(call, false)?,
      expression => {
        expression.assemble(assembler)?;
        true
      }
    };

    if has_value {
      assembler.builder.add_opcode(OpCode::Pop);
    }

    Ok(())
  }
}
impl Assemble for While {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    let start = assembler.builder.new_label();
    let end = assembler.builder.new_label();

    assembler.builder.mark(start);
    self.condition.assemble(assembler)?;
    assembler.builder.add_jump(OpCode::Jz, end);
    self.body.assemble(assembler)?;
    assembler.builder.add_jump(OpCode::Jmp, start);
    assembler.builder.mark(end);

    Ok(())
  }
}
impl Assemble for If {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    let otherwise_label = assembler.builder.new_label();

    self.condition.assemble(assembler)?;
    assembler.builder.add_jump(OpCode::Jz, otherwise_label);
    self.then.assemble(assembler)?;

    if let Some(otherwise) = &self.otherwise {
      let end = assembler.builder.new_label();
      assembler.builder.add_jump(OpCode::Jmp, end);
      assembler.builder.mark(otherwise_label);
      otherwise.assemble(assembler)?;
      assembler.builder.mark(end);
    } else {
      assembler.builder.mark(otherwise_label);
    }

    Ok(())
  }
}
impl Assemble for Assign {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    let slot = assembler.resolve_variable(&self.target)?;
    self.value.assemble(assembler)?;
    assembler.builder.add(OpCode::StoreA, slot);

    Ok(())
  }
}
impl Assemble for Return {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    match &self.value {
      Some(value) => value.assemble(assembler)?,
      None => assembler.builder.add(OpCode::LoadImmediate, 0),
    }

    assembler.builder.add_jump(OpCode::Jmp, assembler.epilogue);

    Ok(())
  }
}

/// Expressions always leave exactly one value on the stack
impl Assemble for Expression {
  fn assemble(&self, assembler: &mut Assembler) -> Result<(), AssembleError> {
    match self {
      Self::Integer(integer) => {
        assembler.builder.add(OpCode::LoadImmediate, integer.value);
      }
      Self::String(string) => {
        let offset = assembler.builder.add_static_string(&string.value);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);
        assembler.builder.add(OpCode::NewString, offset);
      }
      Self::Variable(variable) => {
        let slot = assembler.resolve_variable(variable)?;
        assembler.builder.add(OpCode::LoadA, slot);
      }
      Self::Call(call) => {
        if !assembler.call(call, true)? {
          return Err(AssembleError::NoValue {
            name: call.callee.clone(),
            span: call.span,
          });
        }
      }
    }

    Ok(())
  }
}

impl Assembler {
  /// Assemble a call, returning whether it leaves a value on the stack
  ///
  /// When a value is needed, calls which have no value fail before emitting anything.
  fn call(&mut self, call: &Call, needs_value: bool) -> Result<bool, AssembleError> {
    if call.is_operator {
      self.operator(call)?;
      return Ok(true);
    }

    if let Some(label) = self.functions.get(call.callee.as_str()).copied() {
      check_arguments(call, 0)?;
      self.builder.add_jump(OpCode::Call, label);
      return Ok(true);
    }

    let Some(intrinsic) = Intrinsic::from_name(&call.callee) else {
      return Err(AssembleError::FunctionNotFound {
        name: call.callee.clone(),
        span: call.callee_span,
      });
    };
    check_arguments(call, intrinsic.arity())?;
    if needs_value && !intrinsic.has_value() {
      return Ok(false);
    }

    for argument in &call.arguments {
      argument.assemble(self)?;
    }
    self.builder.add_opcode(intrinsic.opcode());

    Ok(intrinsic.has_value())
  }

  fn operator(&mut self, call: &Call) -> Result<(), AssembleError> {
    if call.callee == "!" {
      check_arguments(call, 1)?;
      call.arguments[0].assemble(self)?;
      self.builder.add_opcode(OpCode::Not);
      return Ok(());
    }

    let Some((opcode, negate)) = binary_operator(&call.callee) else {
      return Err(AssembleError::FunctionNotFound {
        name: call.callee.clone(),
        span: call.callee_span,
      });
    };
    check_arguments(call, 2)?;

    let (left, right) = (&call.arguments[0], &call.arguments[1]);
    match opcode.operand_order() {
      Some(OperandOrder::LeftFirst) => {
        right.assemble(self)?;
        left.assemble(self)?;
      }
      Some(OperandOrder::RightFirst) | None => {
        left.assemble(self)?;
        right.assemble(self)?;
      }
    }
    self.builder.add_opcode(opcode);

    if negate {
      self.builder.add_opcode(OpCode::Not);
    }

    Ok(())
  }
}

fn check_arguments(call: &Call, expected: usize) -> Result<(), AssembleError> {
  if call.arguments.len() == expected {
    Ok(())
  } else {
    Err(AssembleError::ArgumentCount {
      name: call.callee.clone(),
      expected,
      received: call.arguments.len(),
      span: call.span,
    })
  }
}

/// An error from assembling an AST into bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssembleError {
  /// Variable isn't defined in any enclosing scope
  UndefinedVariable {
    /// The name of the variable
    name: String,
    /// Where the variable is used
    span: Span,
  },
  /// Called something which is neither a function nor an intrinsic
  FunctionNotFound {
    /// The name which was called
    name: String,
    /// Where the name is used
    span: Span,
  },
  /// There is no `main` function to start from
  MissingMain,
  /// Two functions share a name
  DuplicateFunction {
    /// The name of the function
    name: String,
    /// Where the second function is named
    span: Span,
  },
  /// Called with the wrong number of arguments
  ArgumentCount {
    /// The name of the function or operator
    name: String,
    /// The number of arguments it takes
    expected: usize,
    /// The number of arguments it was given
    received: usize,
    /// Where it is called
    span: Span,
  },
  /// Used a call which doesn't produce a value as a value
  NoValue {
    /// The name of the function
    name: String,
    /// Where it is called
    span: Span,
  },
  /// Variables outside of functions aren't supported
  UnsupportedDeclaration {
    /// Where the variable is declared
    span: Span,
  },
  /// A label was referenced, but its position was never marked
  UnresolvedLabel {
    /// The label with no position
    label: Label,
  },
}
impl AssembleError {
  /// The title of the error message
  #[must_use]
  pub fn title(&self) -> &'static str {
    match self {
      Self::UndefinedVariable { .. } => "Undefined Variable",
      Self::FunctionNotFound { .. } => "Function Not Found",
      Self::MissingMain => "Missing Main",
      Self::DuplicateFunction { .. } => "Duplicate Function",
      Self::ArgumentCount { .. } => "Wrong Number of Arguments",
      Self::NoValue { .. } => "No Value",
      Self::UnsupportedDeclaration { .. } => "Unsupported Declaration",
      Self::UnresolvedLabel { .. } => "Unresolved Label",
    }
  }

  /// The body of the error message describing what has gone wrong
  #[must_use]
  pub fn message(&self) -> String {
    match self {
      Self::UndefinedVariable { name, .. } => format!("variable `{name}` is not defined"),
      Self::FunctionNotFound { name, .. } => format!("no function named `{name}`"),
      Self::MissingMain => "no function named `main` to start from".into(),
      Self::DuplicateFunction { name, .. } => format!("function `{name}` is already defined"),
      Self::ArgumentCount {
        name,
        expected,
        received,
        ..
      } => {
        let plural = if *expected == 1 { "" } else { "s" };
        format!("`{name}` takes {expected} argument{plural} but was given {received}")
      }
      Self::NoValue { name, .. } => format!("`{name}` does not produce a value"),
      Self::UnsupportedDeclaration { .. } => {
        "variables can only be declared inside functions".into()
      }
      Self::UnresolvedLabel { label } => format!("label {label} is used but never placed"),
    }
  }

  /// The location of the error in the source, if it has one
  #[must_use]
  pub fn span(&self) -> Option<Span> {
    match self {
      Self::UndefinedVariable { span, .. }
      | Self::FunctionNotFound { span, .. }
      | Self::DuplicateFunction { span, .. }
      | Self::ArgumentCount { span, .. }
      | Self::NoValue { span, .. }
      | Self::UnsupportedDeclaration { span } => Some(*span),
      Self::MissingMain | Self::UnresolvedLabel { .. } => None,
    }
  }
}
impl fmt::Display for AssembleError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message())
  }
}
impl error::Error for AssembleError {}
