//! # Ava VM
//! Assembler and virtual machine for running Ava programs.
//!
//! The assembler lowers an AST from `ava_syntax` into a flat list of instructions, with
//! jumps and calls referring to labels. Linking resolves every label to an address, and
//! the VM then executes the program, one instruction at a time.

mod assembler;
mod bytecode;
mod memory;
mod vm;

/// More efficient datastructures than in standard library
pub(crate) mod collections {
  pub use rustc_hash::FxHashMap as HashMap;
  pub use smartstring::alias::String;
}


/// Assemble an AST into a linked bytecode program
///
/// # Examples
/// ```
/// use ava_syntax::parse;
/// let ast = parse("fun main() { return 5 + 3; }").unwrap();
/// let program = ava_vm::assemble(&ast).unwrap();
/// ```
///
/// # Errors
/// If the AST refers to variables or functions which don't exist, or can't be lowered
pub fn assemble(ast: &ava_syntax::Program) -> Result<Program, AssembleError> {
  assembler::Assembler::assemble(ast)
}

pub use assembler::{AssembleError, Intrinsic};
pub use bytecode::{
  Instruction, Label, LabelTable, OpCode, OperandKind, OperandOrder, Program, ProgramBuilder,
  Register, link,
};
pub use memory::Heap;
pub use vm::{Config, ErrorKind as RuntimeErrorKind, RuntimeError, Status, VM};
