use crate::bytecode::{Instruction, Label, LabelTable, OpCode, Program, Register, static_string};
use crate::memory::Heap;
use std::{error, fmt, io};

/// Settings for a run of the VM
#[derive(Clone, Debug, Default)]
pub struct Config {
  /// Bytes read by `GetInt`, in order
  pub input: Vec<u8>,
  /// Trap once this many instructions have been executed
  pub step_limit: Option<u64>,
  /// Print each instruction to stderr as it is executed
  pub trace: bool,
}

/// The state of the machine
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Status {
  /// Not yet run
  #[default]
  Ready,
  /// Stopped at a `Hlt` instruction
  Halted,
  /// Stopped abnormally, by a `Trap` instruction or a runtime error
  Trapped,
}

/// What happens after an instruction is executed
enum Flow {
  /// Go to the next instruction
  Next,
  /// Land on the instruction at the address
  Jump(usize),
  /// Stop execution
  Halt,
}

/// A virtual machine to execute a linked [`Program`]
#[derive(Debug)]
pub struct VM {
  registers: [i64; Register::COUNT],
  stack: Vec<i64>,
  call_stack: Vec<usize>,
  heap: Heap,
  statics: Vec<u8>,
  labels: LabelTable,

  input: Vec<u8>,
  input_position: usize,
  step_limit: Option<u64>,
  trace: bool,

  steps: u64,
  status: Status,
}
impl VM {
  /// Create a new VM, with all state empty
  #[must_use]
  pub fn new(config: Config) -> Self {
    Self {
      registers: [0; Register::COUNT],
      stack: Vec::with_capacity(256),
      call_stack: Vec::with_capacity(16),
      heap: Heap::new(),
      statics: Vec::new(),
      labels: LabelTable::default(),

      input: config.input,
      input_position: 0,
      step_limit: config.step_limit,
      trace: config.trace,

      steps: 0,
      status: Status::Ready,
    }
  }

  /// Reset the machine so it can run a new program
  fn reset(&mut self, program: &Program) {
    self.registers = [0; Register::COUNT];
    self.stack.clear();
    self.call_stack.clear();
    self.heap = Heap::new();
    self.statics = program.statics().to_vec();
    self.labels = program.labels().clone();
    self.input_position = 0;
    self.steps = 0;
    self.status = Status::Ready;
  }

  /// Run a program until it halts or traps, writing its output to `output`
  ///
  /// Output is written as it is produced, so a program which traps keeps the output
  /// it made before the trap.
  ///
  /// # Errors
  /// If the program traps, or an instruction can't be executed
  pub fn run(&mut self, program: &Program, output: &mut impl io::Write) -> Result<(), RuntimeError> {
    self.reset(program);

    let instructions = program.instructions();
    let mut pc = (program.entry())
      .and_then(|label| self.labels.resolve(label))
      .unwrap_or_default();

    let error = loop {
      // running off the end of the program stops it
      let Some(instruction) = instructions.get(pc).copied() else {
        break None;
      };

      if let Some(limit) = self.step_limit
        && self.steps >= limit
      {
        break Some((ErrorKind::StepLimitExceeded(limit), instruction));
      }
      self.steps += 1;

      if self.trace {
        eprintln!("{pc:0>4} │ {instruction:<20} │ {:?}", self.stack);
      }

      match self.execute(instruction, pc, output) {
        Ok(Flow::Next) => pc += 1,
        Ok(Flow::Jump(address)) => pc = address,
        Ok(Flow::Halt) => break None,
        Err(kind) => break Some((kind, instruction)),
      }
    };

    let error = match (error, output.flush()) {
      (Some(error), _) => Some(error),
      (None, Err(flush_error)) => Some((
        ErrorKind::Output(flush_error.kind()),
        Instruction::simple(OpCode::Hlt),
      )),
      (None, Ok(())) => None,
    };

    if let Some((kind, instruction)) = error {
      self.status = Status::Trapped;
      Err(RuntimeError {
        kind,
        address: pc,
        opcode: instruction.opcode,
      })
    } else {
      self.status = Status::Halted;
      Ok(())
    }
  }

  fn execute(
    &mut self,
    instruction: Instruction,
    pc: usize,
    output: &mut impl io::Write,
  ) -> Result<Flow, ErrorKind> {
    let Instruction { opcode, operand } = instruction;

    match opcode {
      // Stack
      OpCode::LoadImmediate => self.push(operand),
      OpCode::Load => {
        let register = register(operand)?;
        self.push(self.registers[register as usize]);
      }
      OpCode::Store => {
        let register = register(operand)?;
        self.registers[register as usize] = self.pop()?;
      }
      OpCode::LoadA => {
        let slot = self.slot(operand)?;
        self.push(self.stack[slot]);
      }
      OpCode::StoreA => {
        let value = self.pop()?;
        let slot = self.slot(operand)?;
        self.stack[slot] = value;
      }
      OpCode::Pop => {
        self.pop()?;
      }
      OpCode::SetFp => {
        self.registers[Register::Fp as usize] = i64::try_from(self.stack.len()).unwrap_or(i64::MAX);
      }

      // Arithmetic, the left operand is on top
      OpCode::Add => self.arithmetic(i64::wrapping_add)?,
      OpCode::Sub => self.arithmetic(i64::wrapping_sub)?,
      OpCode::Mul => self.arithmetic(i64::wrapping_mul)?,
      OpCode::Div => {
        let left = self.pop()?;
        let right = self.pop()?;
        if right == 0 {
          return Err(ErrorKind::DivisionByZero);
        }
        self.push(left.wrapping_div(right));
      }
      OpCode::Mod => {
        let left = self.pop()?;
        let right = self.pop()?;
        if right == 0 {
          return Err(ErrorKind::DivisionByZero);
        }
        self.push(left.wrapping_rem(right));
      }

      // Comparisons, the right operand is on top
      OpCode::Lt => self.comparison(|left, right| left < right)?,
      OpCode::Gt => self.comparison(|left, right| left > right)?,
      OpCode::Eq => self.comparison(|left, right| left == right)?,
      OpCode::Not => {
        let value = self.pop()?;
        self.push(i64::from(value == 0));
      }

      // Control Flow
      OpCode::Jmp => return Ok(Flow::Jump(self.label(operand)?)),
      OpCode::Jz => {
        let value = self.pop()?;
        if value == 0 {
          return Ok(Flow::Jump(self.label(operand)?));
        }
      }
      OpCode::Call => {
        let address = self.label(operand)?;
        self.call_stack.push(pc + 1);
        return Ok(Flow::Jump(address));
      }
      OpCode::Ret => {
        let address = self.call_stack.pop().ok_or(ErrorKind::CallStackUnderflow)?;
        self.push(self.registers[Register::R0 as usize]);
        return Ok(Flow::Jump(address));
      }
      OpCode::Inc => {
        let register = register(operand)?;
        let value = &mut self.registers[register as usize];
        *value = value.wrapping_add(1);
      }
      OpCode::Lbl => {}

      // Input + Output
      OpCode::PutInt => {
        let value = self.pop()?;
        write!(output, "{value}").map_err(|error| ErrorKind::Output(error.kind()))?;
      }
      OpCode::PutCStr => {
        let string = (usize::try_from(operand).ok())
          .and_then(|offset| static_string(&self.statics, offset))
          .ok_or(ErrorKind::StaticOutOfBounds(operand))?;
        output.write_all(string).map_err(|error| ErrorKind::Output(error.kind()))?;
      }
      OpCode::NewString => {
        let string = (usize::try_from(operand).ok())
          .and_then(|offset| static_string(&self.statics, offset))
          .ok_or(ErrorKind::StaticOutOfBounds(operand))?;
        let offset = self.heap.allocate_string(string);
        self.push(i64::try_from(offset).unwrap_or(i64::MAX));
      }
      OpCode::PutStr => {
        let pointer = self.pop()?;
        let string = (usize::try_from(pointer).ok())
          .and_then(|offset| self.heap.string(offset))
          .ok_or(ErrorKind::HeapOutOfBounds(pointer))?;
        output.write_all(string).map_err(|error| ErrorKind::Output(error.kind()))?;
      }
      OpCode::GetInt => {
        let value = match self.input.get(self.input_position) {
          Some(byte) => {
            self.input_position += 1;
            i64::from(*byte)
          }
          None => -1,
        };
        self.push(value);
      }

      // Termination
      OpCode::Hlt => return Ok(Flow::Halt),
      OpCode::Trap => return Err(ErrorKind::Trap),
    }

    Ok(Flow::Next)
  }

  #[inline]
  fn push(&mut self, value: i64) {
    self.stack.push(value);
  }
  #[inline]
  fn pop(&mut self) -> Result<i64, ErrorKind> {
    self.stack.pop().ok_or(ErrorKind::StackUnderflow)
  }

  fn arithmetic(&mut self, operation: fn(i64, i64) -> i64) -> Result<(), ErrorKind> {
    let left = self.pop()?;
    let right = self.pop()?;
    self.push(operation(left, right));
    Ok(())
  }
  fn comparison(&mut self, operation: fn(i64, i64) -> bool) -> Result<(), ErrorKind> {
    let right = self.pop()?;
    let left = self.pop()?;
    self.push(i64::from(operation(left, right)));
    Ok(())
  }

  /// The stack index of a local slot, which lives at `fp - slot - 1`
  fn slot(&self, slot: i64) -> Result<usize, ErrorKind> {
    let frame_pointer = self.registers[Register::Fp as usize];

    (slot >= 0)
      .then(|| frame_pointer.checked_sub(slot)?.checked_sub(1))
      .flatten()
      .and_then(|index| usize::try_from(index).ok())
      .filter(|index| *index < self.stack.len())
      .ok_or(ErrorKind::InvalidFrameSlot(slot))
  }

  fn label(&self, operand: i64) -> Result<usize, ErrorKind> {
    u32::try_from(operand)
      .ok()
      .and_then(|id| self.labels.resolve(Label::new(id)))
      .ok_or(ErrorKind::UnresolvedLabel(operand))
  }

  /// The values of the registers, indexed by register id
  #[must_use]
  pub fn registers(&self) -> &[i64; Register::COUNT] {
    &self.registers
  }
  /// The value of a single register
  #[must_use]
  pub fn register(&self, register: Register) -> i64 {
    self.registers[register as usize]
  }
  /// The operand stack, bottom first
  #[must_use]
  pub fn stack(&self) -> &[i64] {
    &self.stack
  }
  /// The saved return addresses, oldest first
  #[must_use]
  pub fn call_stack(&self) -> &[usize] {
    &self.call_stack
  }
  /// The heap
  #[must_use]
  pub fn heap(&self) -> &Heap {
    &self.heap
  }
  /// The static data segment of the program being run
  #[must_use]
  pub fn statics(&self) -> &[u8] {
    &self.statics
  }
  /// The label table of the program being run
  #[must_use]
  pub fn labels(&self) -> &LabelTable {
    &self.labels
  }
  /// The state of the machine
  #[must_use]
  pub fn status(&self) -> Status {
    self.status
  }
  /// The number of instructions executed in the last run
  #[must_use]
  pub fn steps(&self) -> u64 {
    self.steps
  }
}

fn register(operand: i64) -> Result<Register, ErrorKind> {
  Register::try_from(operand).map_err(ErrorKind::InvalidRegister)
}

impl fmt::Display for VM {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "registers:")?;
    for register in Register::ALL {
      write!(f, " {register}={}", self.register(register))?;
    }
    writeln!(f)?;

    writeln!(f, "stack: {:?}", self.stack)?;
    writeln!(f, "call stack: {:?}", self.call_stack)?;

    write!(f, "labels:")?;
    for (label, address) in self.labels.iter() {
      write!(f, " {label}={address:0>4}")?;
    }
    writeln!(f)?;

    let heap = String::from_utf8_lossy(self.heap.as_bytes());
    writeln!(f, "heap ({} bytes): {heap:?}", self.heap.len())?;
    let statics = String::from_utf8_lossy(&self.statics);
    writeln!(f, "statics ({} bytes): {statics:?}", self.statics.len())?;
    writeln!(f, "status: {:?} after {} steps", self.status, self.steps)
  }
}

/// An error whilst executing bytecode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
  kind: ErrorKind,
  address: usize,
  opcode: OpCode,
}
impl RuntimeError {
  /// The title of the error message
  #[must_use]
  pub fn title(&self) -> &'static str {
    self.kind.title()
  }

  /// The body of the error message describing what has gone wrong
  #[must_use]
  pub fn message(&self) -> String {
    self.kind.message()
  }

  /// What went wrong
  #[must_use]
  pub fn kind(&self) -> &ErrorKind {
    &self.kind
  }

  /// The address of the instruction which failed
  #[must_use]
  pub fn address(&self) -> usize {
    self.address
  }

  /// The opcode of the instruction which failed
  #[must_use]
  pub fn opcode(&self) -> OpCode {
    self.opcode
  }
}
impl fmt::Display for RuntimeError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "{} (at {:0>4} `{}`)",
      self.message(),
      self.address,
      self.opcode
    )
  }
}
impl error::Error for RuntimeError {}

/// The kind of a [`RuntimeError`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
  /// Popped from an empty operand stack
  StackUnderflow,
  /// Returned with an empty call stack
  CallStackUnderflow,
  /// Divided or took the remainder by zero
  DivisionByZero,
  /// Heap offset outside the heap
  HeapOutOfBounds(i64),
  /// Static offset outside the static segment
  StaticOutOfBounds(i64),
  /// Operand isn't a register id
  InvalidRegister(i64),
  /// Local slot outside the current frame
  InvalidFrameSlot(i64),
  /// Label which was never marked
  UnresolvedLabel(i64),
  /// A `Trap` instruction was executed
  Trap,
  /// The step limit was reached
  StepLimitExceeded(u64),
  /// The output couldn't be written
  Output(io::ErrorKind),
}
impl ErrorKind {
  /// The title of the error message
  #[must_use]
  pub fn title(&self) -> &'static str {
    match self {
      Self::StackUnderflow => "Stack Underflow",
      Self::CallStackUnderflow => "Call Stack Underflow",
      Self::DivisionByZero => "Division By Zero",
      Self::HeapOutOfBounds(_) => "Heap Out Of Bounds",
      Self::StaticOutOfBounds(_) => "Static Out Of Bounds",
      Self::InvalidRegister(_) => "Invalid Register",
      Self::InvalidFrameSlot(_) => "Invalid Frame Slot",
      Self::UnresolvedLabel(_) => "Unresolved Label",
      Self::Trap => "Trap",
      Self::StepLimitExceeded(_) => "Step Limit Exceeded",
      Self::Output(_) => "Output Error",
    }
  }

  /// The body of the error message describing what has gone wrong
  #[must_use]
  pub fn message(&self) -> String {
    match self {
      Self::StackUnderflow => "popped from an empty stack".into(),
      Self::CallStackUnderflow => "returned with no caller to return to".into(),
      Self::DivisionByZero => "attempted to divide by zero".into(),
      Self::HeapOutOfBounds(offset) => format!("heap offset {offset} is outside the heap"),
      Self::StaticOutOfBounds(offset) => {
        format!("static offset {offset} is outside the static data")
      }
      Self::InvalidRegister(id) => format!("{id} is not a register"),
      Self::InvalidFrameSlot(slot) => format!("slot {slot} is outside the current frame"),
      Self::UnresolvedLabel(id) => format!("label {id} has no position"),
      Self::Trap => "the program trapped".into(),
      Self::StepLimitExceeded(limit) => format!("stopped after {limit} steps"),
      Self::Output(kind) => format!("could not write output: {kind}"),
    }
  }
}
