//! Instructions, labels and the linked program the VM executes.

use crate::assembler::AssembleError;
use crate::collections::{HashMap, String as SmartString};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
/// The operation an [`Instruction`] performs
pub enum OpCode {
  // Stack
  /// Push the operand
  LoadImmediate,
  /// Push the value of the register named by the operand
  Load,
  /// Pop into the register named by the operand
  Store,
  /// Push the local slot named by the operand
  LoadA,
  /// Pop into the local slot named by the operand
  StoreA,
  /// Discard the top of the stack
  Pop,
  /// Set the frame pointer to the current stack depth
  SetFp,

  // Arithmetic
  /// Wrapping addition
  Add,
  /// Wrapping subtraction
  Sub,
  /// Wrapping multiplication
  Mul,
  /// Truncating division
  Div,
  /// Remainder, with the sign of the dividend
  Mod,

  // Comparisons
  /// Push 1 if left < right, else 0
  Lt,
  /// Push 1 if left > right, else 0
  Gt,
  /// Push 1 if left == right, else 0
  Eq,
  /// Push 1 if the value is 0, else 0
  Not,

  // Control Flow
  /// Jump to the label named by the operand
  Jmp,
  /// Pop, and jump to the label if the value was 0
  Jz,
  /// Push the return address onto the call stack and jump to the label
  Call,
  /// Return to the address on top of the call stack, pushing `r0`
  Ret,
  /// Increment the register named by the operand
  Inc,
  /// Marks the position of the label named by the operand
  Lbl,

  // Input + Output
  /// Pop and print as a decimal integer
  PutInt,
  /// Print the static string at the operand offset
  PutCStr,
  /// Copy the static string at the operand offset to the heap, and push its heap offset
  NewString,
  /// Pop a heap offset and print the string there
  PutStr,
  /// Push the next byte of input, or -1 once the input is exhausted
  GetInt,

  // Termination
  /// Stop execution
  Hlt,
  /// Stop execution abnormally
  Trap,
}
impl OpCode {
  /// What the operand of the instruction refers to
  #[must_use]
  pub fn operand_kind(self) -> OperandKind {
    match self {
      Self::LoadImmediate => OperandKind::Literal,
      Self::Load | Self::Store | Self::Inc => OperandKind::Register,
      Self::LoadA | Self::StoreA => OperandKind::Slot,
      Self::Jmp | Self::Jz | Self::Call | Self::Lbl => OperandKind::Label,
      Self::PutCStr | Self::NewString => OperandKind::Static,
      Self::Pop
      | Self::SetFp
      | Self::Add
      | Self::Sub
      | Self::Mul
      | Self::Div
      | Self::Mod
      | Self::Lt
      | Self::Gt
      | Self::Eq
      | Self::Not
      | Self::Ret
      | Self::PutInt
      | Self::PutStr
      | Self::GetInt
      | Self::Hlt
      | Self::Trap => OperandKind::None,
    }
  }

  /// For binary operations, which operand is popped off the stack first
  ///
  /// Arithmetic takes its left operand from the top of the stack, whereas comparisons
  /// take their right operand from the top.
  #[must_use]
  pub fn operand_order(self) -> Option<OperandOrder> {
    match self {
      Self::Add | Self::Sub | Self::Mul | Self::Div | Self::Mod => Some(OperandOrder::LeftFirst),
      Self::Lt | Self::Gt | Self::Eq => Some(OperandOrder::RightFirst),
      _ => None,
    }
  }
}
impl fmt::Display for OpCode {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{self:?}")
  }
}

/// What the operand of an instruction refers to
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandKind {
  /// The operand is unused
  None,
  /// An integer value
  Literal,
  /// A register id
  Register,
  /// A local slot in the current frame
  Slot,
  /// A label id
  Label,
  /// A byte offset into the static segment
  Static,
}

/// The order a binary operation pops its operands
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum OperandOrder {
  /// The left operand is on top of the stack
  LeftFirst,
  /// The right operand is on top of the stack
  RightFirst,
}

/// A single instruction, an opcode and its operand
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Instruction {
  /// The operation to perform
  pub opcode: OpCode,
  /// The operand, its meaning depends on the opcode
  pub operand: i64,
}
impl Instruction {
  /// Create an instruction with an operand
  #[must_use]
  pub const fn new(opcode: OpCode, operand: i64) -> Self {
    Self { opcode, operand }
  }

  /// Create an instruction which doesn't use its operand
  #[must_use]
  pub const fn simple(opcode: OpCode) -> Self {
    Self { opcode, operand: 0 }
  }

  /// The label the instruction refers to, if it refers to one
  #[must_use]
  pub fn label(self) -> Option<Label> {
    if self.opcode.operand_kind() == OperandKind::Label {
      u32::try_from(self.operand).ok().map(Label)
    } else {
      None
    }
  }
}

impl fmt::Display for Instruction {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let Self { opcode, operand } = *self;

    let text = match opcode.operand_kind() {
      OperandKind::None => opcode.to_string(),
      OperandKind::Register => match Register::try_from(operand) {
        Ok(register) => format!("{opcode} {register}"),
        Err(id) => format!("{opcode} ?{id}"),
      },
      OperandKind::Label => match self.label() {
        Some(label) => format!("{opcode} {label}"),
        None => format!("{opcode} ?{operand}"),
      },
      OperandKind::Literal | OperandKind::Slot | OperandKind::Static => {
        format!("{opcode} {operand}")
      }
    };

    f.pad(&text)
  }
}

/// The registers of the machine
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Register {
  /// General purpose register, also holds return values
  R0 = 0,
  /// General purpose register
  R1 = 1,
  /// General purpose register
  R2 = 2,
  /// General purpose register
  R3 = 3,
  /// Frame pointer, one past the last local slot of the current frame
  Fp = 4,
}
impl Register {
  /// The number of registers
  pub const COUNT: usize = 5;

  /// All the registers, in id order
  pub const ALL: [Self; Self::COUNT] = [Self::R0, Self::R1, Self::R2, Self::R3, Self::Fp];

  /// The id used as an instruction operand
  #[must_use]
  pub const fn id(self) -> i64 {
    self as i64
  }
}
impl TryFrom<i64> for Register {
  type Error = i64;

  fn try_from(value: i64) -> Result<Self, Self::Error> {
    usize::try_from(value)
      .ok()
      .and_then(|index| Self::ALL.get(index).copied())
      .ok_or(value)
  }
}
impl fmt::Display for Register {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::R0 => write!(f, "r0"),
      Self::R1 => write!(f, "r1"),
      Self::R2 => write!(f, "r2"),
      Self::R3 => write!(f, "r3"),
      Self::Fp => write!(f, "fp"),
    }
  }
}

/// A handle to a position in the program, allocated before the position is known
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Label(u32);
impl Label {
  /// Create a label handle from its id
  #[must_use]
  pub const fn new(id: u32) -> Self {
    Self(id)
  }

  /// The id of the label
  #[must_use]
  pub const fn id(self) -> u32 {
    self.0
  }

  /// The id as an instruction operand
  #[must_use]
  pub const fn operand(self) -> i64 {
    self.0 as i64
  }
}
impl fmt::Display for Label {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "L{}", self.0)
  }
}

/// Maps label ids to their instruction address
///
/// Only labels which have been marked are in the table, any other label is unresolved.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LabelTable {
  addresses: HashMap<Label, usize>,
}
impl LabelTable {
  /// The address of a label, if it has been resolved
  #[must_use]
  pub fn resolve(&self, label: Label) -> Option<usize> {
    self.addresses.get(&label).copied()
  }

  /// The number of resolved labels
  #[must_use]
  pub fn len(&self) -> usize {
    self.addresses.len()
  }

  /// Are no labels resolved?
  #[must_use]
  pub fn is_empty(&self) -> bool {
    self.addresses.is_empty()
  }

  /// Every resolved label with its address, ordered by label id
  pub fn iter(&self) -> impl Iterator<Item = (Label, usize)> + '_ {
    let mut labels: Vec<_> = (self.addresses.iter())
      .map(|(label, address)| (*label, *address))
      .collect();
    labels.sort_unstable();
    labels.into_iter()
  }
}

/// Build the label table for a sequence of instructions
///
/// Every `Lbl` instruction resolves its label to its own address. Labels which are
/// referenced but never marked stay unresolved. The instructions are not modified, so
/// linking again gives the same table.
#[must_use]
pub fn link(instructions: &[Instruction]) -> LabelTable {
  let addresses = (instructions.iter().enumerate())
    .filter(|(_, instruction)| instruction.opcode == OpCode::Lbl)
    .filter_map(|(address, instruction)| Some((instruction.label()?, address)))
    .collect();

  LabelTable { addresses }
}

/// A linked program, ready to be executed
#[derive(Clone, Debug, Default)]
pub struct Program {
  instructions: Vec<Instruction>,
  labels: LabelTable,
  statics: Vec<u8>,
  entry: Option<Label>,
  symbols: HashMap<Label, SmartString>,
}
impl Program {
  /// Link a sequence of instructions into a program, which starts at the first instruction
  #[must_use]
  pub fn new(instructions: Vec<Instruction>, statics: Vec<u8>) -> Self {
    Self {
      labels: link(&instructions),
      instructions,
      statics,
      entry: None,
      symbols: HashMap::default(),
    }
  }

  /// The instructions of the program, indexed by address
  #[must_use]
  pub fn instructions(&self) -> &[Instruction] {
    &self.instructions
  }

  /// The resolved label table
  #[must_use]
  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }

  /// The static data segment
  #[must_use]
  pub fn statics(&self) -> &[u8] {
    &self.statics
  }

  /// The label execution starts from
  #[must_use]
  pub fn entry(&self) -> Option<Label> {
    self.entry
  }

  /// The name of the function a label marks
  #[must_use]
  pub fn symbol(&self, label: Label) -> Option<&str> {
    self.symbols.get(&label).map(SmartString::as_str)
  }

  /// The name of the function containing an address
  ///
  /// The nearest named label at or before the address.
  #[must_use]
  pub fn function_at(&self, address: usize) -> Option<&str> {
    (self.symbols.iter())
      .filter_map(|(label, name)| Some((self.labels.resolve(*label)?, name)))
      .filter(|(start, _)| *start <= address)
      .max_by_key(|(start, _)| *start)
      .map(|(_, name)| name.as_str())
  }

  /// Link the program again, replacing the label table
  pub fn relink(&mut self) {
    self.labels = link(&self.instructions);
  }

  fn label_name(&self, label: Label) -> String {
    match self.symbol(label) {
      Some(name) => name.to_owned(),
      None => label.to_string(),
    }
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    writeln!(f, "      ╭─[Bytecode]")?;

    for (position, instruction) in self.instructions.iter().enumerate() {
      write!(f, " {position:0>4} │ ")?;
      let Instruction { opcode, operand } = *instruction;

      match opcode.operand_kind() {
        OperandKind::None => write!(f, "{opcode}"),
        OperandKind::Literal | OperandKind::Slot => write!(f, "{opcode} {operand}"),
        OperandKind::Register => match Register::try_from(operand) {
          Ok(register) => write!(f, "{opcode} {register}"),
          Err(id) => write!(f, "{opcode} ?{id}"),
        },
        OperandKind::Static => {
          let string = (usize::try_from(operand).ok())
            .and_then(|offset| static_string(&self.statics, offset))
            .unwrap_or_default();
          write!(f, "{opcode} {operand} {:?}", String::from_utf8_lossy(string))
        }
        OperandKind::Label if opcode == OpCode::Lbl => match instruction.label() {
          Some(label) => write!(f, "{opcode} {}", self.label_name(label)),
          None => write!(f, "{opcode} ?{operand}"),
        },
        OperandKind::Label => match instruction.label() {
          Some(label) => match self.labels.resolve(label) {
            Some(address) => write!(f, "{opcode} {} ({address:0>4})", self.label_name(label)),
            None => write!(f, "{opcode} {} (????)", self.label_name(label)),
          },
          None => write!(f, "{opcode} ?{operand}"),
        },
      }?;
      writeln!(f)?;
    }

    if !self.statics.is_empty() {
      writeln!(f, "      ├─[Statics]")?;

      let mut offset = 0;
      while offset < self.statics.len() {
        let string = static_string(&self.statics, offset).unwrap_or_default();
        writeln!(f, " {offset:0>4} │ {:?}", String::from_utf8_lossy(string))?;
        offset += string.len() + 1;
      }
    }

    writeln!(f, "──────╯")
  }
}

/// The bytes of a NUL-terminated string, without the terminator
///
/// A string missing its terminator runs to the end of the data.
pub(crate) fn static_string(data: &[u8], offset: usize) -> Option<&[u8]> {
  let bytes = data.get(offset..)?;
  if bytes.is_empty() {
    return None;
  }

  let length = bytes.iter().position(|byte| *byte == 0).unwrap_or(bytes.len());
  Some(&bytes[..length])
}

/// Builds up a program, then links it
#[derive(Debug, Default)]
pub struct ProgramBuilder {
  instructions: Vec<Instruction>,
  label_count: u32,
  statics: Vec<u8>,
  interned: HashMap<SmartString, usize>,
  symbols: HashMap<Label, SmartString>,
}
impl ProgramBuilder {
  /// Create an empty builder
  #[must_use]
  pub fn new() -> Self {
    Self::default()
  }

  /// Allocate a new label, with no position yet
  pub fn new_label(&mut self) -> Label {
    let label = Label(self.label_count);
    self.label_count += 1;
    label
  }

  /// Give a label a name, shown when disassembling
  pub fn name_label(&mut self, label: Label, name: &str) {
    self.symbols.insert(label, name.into());
  }

  /// Append an instruction
  pub fn add(&mut self, opcode: OpCode, operand: i64) {
    self.instructions.push(Instruction::new(opcode, operand));
  }

  /// Append an instruction which has no operand
  pub fn add_opcode(&mut self, opcode: OpCode) {
    self.instructions.push(Instruction::simple(opcode));
  }

  /// Append a jump, branch or call to a label
  pub fn add_jump(&mut self, opcode: OpCode, label: Label) {
    debug_assert_eq!(opcode.operand_kind(), OperandKind::Label);
    self.add(opcode, label.operand());
  }

  /// Mark the position of a label as the next instruction
  pub fn mark(&mut self, label: Label) {
    self.add(OpCode::Lbl, label.operand());
  }

  /// Add a string to the static segment, returning its offset
  ///
  /// Identical strings share the same offset.
  pub fn add_static_string(&mut self, string: &str) -> usize {
    if let Some(offset) = self.interned.get(string) {
      return *offset;
    }

    let offset = self.statics.len();
    self.statics.extend_from_slice(string.as_bytes());
    self.statics.push(0);
    self.interned.insert(string.into(), offset);

    offset
  }

  /// Link the program, with execution starting at the `entry` label
  ///
  /// # Errors
  /// If an instruction refers to a label which has not been marked
  pub fn finish(self, entry: Label) -> Result<Program, AssembleError> {
    let labels = link(&self.instructions);

    for instruction in &self.instructions {
      if let Some(label) = instruction.label()
        && labels.resolve(label).is_none()
      {
        return Err(AssembleError::UnresolvedLabel { label });
      }
    }
    if labels.resolve(entry).is_none() {
      return Err(AssembleError::UnresolvedLabel { label: entry });
    }

    Ok(Program {
      instructions: self.instructions,
      labels,
      statics: self.statics,
      entry: Some(entry),
      symbols: self.symbols,
    })
  }
}
