//! # Ava
//! A small procedural language, assembled to bytecode for its own virtual machine.
//!
//! Parses a source file, lowers it to bytecode, and runs it.

#![allow(clippy::print_stdout)]

mod commands;
mod diagnostics;

use clap::builder::styling::{AnsiColor, Style, Styles};
use clap::{Args, Parser, Subcommand};
use commands::CommandStatus;
use owo_colors::*;
use std::process;

const STYLES: Styles = Styles::styled()
  .usage(Style::new().italic())
  .header(AnsiColor::BrightYellow.on_default().bold());

fn coloured_header() -> String {
  format!(
    "{} {}",
    "Ava".fg::<owo_colors::colors::css::MediumPurple>().bold(),
    "(v0.1.0)".italic().dimmed()
  )
}

fn about() -> String {
  format!(
    "{}\nA small procedural language, running on its own bytecode virtual machine.",
    coloured_header()
  )
}

#[derive(Parser)]
#[clap(
  name = "ava",
  version,
  about = about(),
  styles = STYLES,
  disable_help_subcommand = true,
)]
enum App {
  /// Runs an Ava program
  Run(RunOptions),

  /// Prints debugging information
  Print {
    #[command(subcommand)]
    command: PrintCommand,
  },
}

#[derive(Args)]
struct RunOptions {
  /// The file to run, or `-` to read from stdin
  file: String,

  /// Input for the program, read a byte at a time by `getint`
  #[clap(long, conflicts_with = "input_file", help_heading = "Machine Config")]
  input: Option<String>,
  /// File to use as the input for the program
  #[clap(long, help_heading = "Machine Config")]
  input_file: Option<String>,
  /// Stop the program after this many instructions
  #[clap(long, help_heading = "Machine Config")]
  max_steps: Option<u64>,

  /// Print each instruction to stderr as it is executed
  #[clap(long)]
  trace: bool,
  /// Print the state of the machine to stderr once the program stops
  #[clap(long)]
  dump_state: bool,
}

#[derive(Subcommand)]
enum PrintCommand {
  /// Displays the tokens in the file
  Tokens {
    /// The file to print
    file: String,
  },
  /// Displays the Abstract Syntax Tree
  Ast {
    /// The file to print
    file: String,
  },
  /// Displays the bytecode
  Bytecode {
    /// The file to print
    file: String,
  },
}

fn main() -> process::ExitCode {
  let args = App::parse();

  let result = match args {
    App::Run(options) => commands::run(&options),
    App::Print { command } => match command {
      PrintCommand::Tokens { file } => commands::print_tokens(&file),
      PrintCommand::Ast { file } => commands::print_ast(&file),
      PrintCommand::Bytecode { file } => commands::print_bytecode(&file),
    },
  };

  match result {
    Ok(CommandStatus::Success) => process::ExitCode::from(0),
    Ok(CommandStatus::Failure) => process::ExitCode::from(1),
    Err(()) => process::ExitCode::from(2),
  }
}
