use super::RunOptions;
use super::diagnostics::{CodeFrame, Message};

use ava_syntax::{Program as Ast, tokenise};
use ava_vm::{Config, Program, Register, VM};

use anstream::{eprint, eprintln, print, println};
use owo_colors::OwoColorize;
use std::{fs, io};

pub enum CommandStatus {
  /// Command was successful
  Success,
  /// Command ran, but the program it ran failed
  Failure,
}

fn read_file(filename: &str) -> Result<String, ()> {
  if filename == "-" {
    return read_stdin();
  }

  match fs::read_to_string(filename) {
    Ok(file) if file.len() >= u32::MAX as usize => {
      eprintln!("{}", Message::error("File too large - max size 4GB".into()));
      Err(())
    }
    Ok(file) => Ok(file),
    Err(_) => {
      eprintln!("{}", Message::error(format!("File not found `{filename}`")));
      Err(())
    }
  }
}

fn read_stdin() -> Result<String, ()> {
  use std::io::Read;

  let mut buffer = Vec::new();
  let mut stdin = io::stdin().lock();

  match stdin.read_to_end(&mut buffer) {
    Ok(_) if buffer.len() >= u32::MAX as usize => {
      eprintln!("{}", Message::error("File too large - max size 4GB".into()));
      Err(())
    }
    Ok(_) => String::from_utf8(buffer).map_err(|_| {
      eprintln!("{}", Message::error("STDIN is not valid UTF-8".into()));
    }),
    Err(_) => {
      eprintln!("{}", Message::error("Problem Reading from STDIN".into()));
      Err(())
    }
  }
}

fn read_input(options: &RunOptions) -> Result<Vec<u8>, ()> {
  if let Some(input) = &options.input {
    return Ok(input.as_bytes().to_vec());
  }

  match &options.input_file {
    Some(filename) => fs::read(filename).map_err(|_| {
      eprintln!("{}", Message::error(format!("File not found `{filename}`")));
    }),
    None => Ok(Vec::new()),
  }
}

fn parse(filename: &str, source: &str) -> Result<Ast, ()> {
  ava_syntax::parse(source).map_err(|error| {
    eprintln!("{}", Message::from(&error));
    eprintln!("{}", CodeFrame::new(filename, source, error.span()));
  })
}

fn assemble(filename: &str, source: &str, ast: &Ast) -> Result<Program, ()> {
  ava_vm::assemble(ast).map_err(|error| {
    eprintln!("{}", Message::from(&error));
    if let Some(span) = error.span() {
      eprintln!("{}", CodeFrame::new(filename, source, span));
    }
  })
}

pub fn run(options: &RunOptions) -> Result<CommandStatus, ()> {
  let source = read_file(&options.file)?;
  let ast = parse(&options.file, &source)?;
  let program = assemble(&options.file, &source, &ast)?;

  let mut vm = VM::new(Config {
    input: read_input(options)?,
    step_limit: options.max_steps,
    trace: options.trace,
  });

  let mut stdout = io::stdout().lock();
  let result = vm.run(&program, &mut stdout);
  drop(stdout);

  if options.dump_state {
    eprintln!("╭─[Machine State]");
    eprint!("{vm}");
    eprintln!("╯");
  }

  match result {
    Ok(()) => {
      // the entry sequence leaves the value `main` returned in r0
      eprintln!("{} {}", "Exit code:".dimmed(), vm.register(Register::R0));
      Ok(CommandStatus::Success)
    }
    Err(error) => {
      eprintln!("{}", Message::from(&error));

      let function = program.function_at(error.address()).unwrap_or("?");
      eprintln!(
        "at {:0>4} `{}` in function `{function}`",
        error.address(),
        error.opcode()
      );

      Ok(CommandStatus::Failure)
    }
  }
}

pub fn print_tokens(filename: &str) -> Result<CommandStatus, ()> {
  let source = read_file(filename)?;
  let filename = if filename == "-" { "STDIN" } else { filename };

  println!("    ╭─[Tokens: {filename}]");
  for token in tokenise(&source) {
    print!("{:>3} │ {}", token.start, token.kind);
    if !token.kind.has_fixed_length() {
      print!(" (length: {})", token.length);
    }
    println!();
  }
  println!("────╯");

  Ok(CommandStatus::Success)
}

pub fn print_ast(filename: &str) -> Result<CommandStatus, ()> {
  let source = read_file(filename)?;
  let ast = parse(filename, &source)?;

  let filename = if filename == "-" { "STDIN" } else { filename };
  println!("╭─[Abstract Syntax Tree: {filename}]");
  print!("{ast}");
  println!("╯");

  Ok(CommandStatus::Success)
}

pub fn print_bytecode(filename: &str) -> Result<CommandStatus, ()> {
  let source = read_file(filename)?;
  let ast = parse(filename, &source)?;
  let program = assemble(filename, &source, &ast)?;

  print!("{program}");

  Ok(CommandStatus::Success)
}
