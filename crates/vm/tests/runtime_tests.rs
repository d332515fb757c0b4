//! # Runtime Tests
//!
//! Check that assembled programs behave correctly when run.

use ava_syntax::parse;
use ava_vm::{Config, Register, RuntimeError, RuntimeErrorKind, Status, VM, assemble};
use indoc::indoc;

struct Run {
  vm: VM,
  result: Result<(), RuntimeError>,
  output: String,
}

fn run_with(source: &str, config: Config) -> Run {
  let ast = parse(source).unwrap();
  let program = assemble(&ast).unwrap();

  let mut vm = VM::new(config);
  let mut output = Vec::new();
  let result = vm.run(&program, &mut output);

  Run {
    vm,
    result,
    output: String::from_utf8(output).unwrap(),
  }
}
fn run(source: &str) -> Run {
  run_with(source, Config::default())
}

/// Runs to completion with nothing left behind on the stacks
fn assert_balanced(run: &Run) {
  assert!(run.result.is_ok(), "{:?}", run.result);
  assert_eq!(run.vm.status(), Status::Halted);
  assert!(run.vm.stack().is_empty(), "stack: {:?}", run.vm.stack());
  assert!(run.vm.call_stack().is_empty());
  assert_eq!(run.vm.register(Register::Fp), 0);
}

#[test]
fn constant_return() {
  let constant = run("fun main() { return 42; }");

  assert_balanced(&constant);
  assert_eq!(constant.vm.register(Register::R0), 42);
  assert_eq!(constant.output, "");
}

#[test]
fn missing_return_gives_zero() {
  let implicit = run(indoc! {"
    fun nothing() {}
    fun bare() { return; }
    fun main() { return nothing() + bare() + 5; }
  "});

  assert_balanced(&implicit);
  assert_eq!(implicit.vm.register(Register::R0), 5);

  let empty = run("fun main() { putint(1); }");
  assert_balanced(&empty);
  assert_eq!(empty.vm.register(Register::R0), 0);
}

#[test]
fn print_sum() {
  let sum = run("fun main() { putint(1 + 2); }");

  assert_balanced(&sum);
  assert_eq!(sum.output, "3");
}

#[test]
fn string_round_trip() {
  let hello = run(r#"fun main() { putstr("hi"); }"#);

  assert_balanced(&hello);
  assert_eq!(hello.output, "hi");
  assert_eq!(hello.vm.statics(), b"hi\0");
  assert_eq!(hello.vm.heap().as_bytes(), b"hi\0");
}

#[test]
fn strings_are_interned() {
  let strings = run(indoc! {r#"
    fun main() {
      let s = "hey";
      putstr(s);
      putstr("hey");
      putstr("\t\"x\"\n");
    }
  "#});

  assert_balanced(&strings);
  assert_eq!(strings.output, "heyhey\t\"x\"\n");
  assert_eq!(strings.vm.statics(), b"hey\0\t\"x\"\n\0");
  // every evaluation of a literal makes a new heap copy
  assert_eq!(strings.vm.heap().len(), 4 + 4 + 6);
}

#[test]
fn while_loop() {
  let count = run(indoc! {"
    fun main() {
      let i = 0;
      while (i < 3) {
        putint(i);
        i = i + 1;
      }
      return i;
    }
  "});

  assert_balanced(&count);
  assert_eq!(count.output, "012");
  assert_eq!(count.vm.register(Register::R0), 3);
}

#[test]
fn nested_loops() {
  let table = run(indoc! {"
    fun main() {
      let i = 1;
      while (i <= 3) {
        let j = 1;
        while (j <= i) {
          putint(j);
          j = j + 1;
        }
        putstr(\",\");
        i = i + 1;
      }
    }
  "});

  assert_balanced(&table);
  assert_eq!(table.output, "1,12,123,");
}

#[test]
fn if_else() {
  let input = run_with(
    indoc! {"
      fun classify() {
        let n = getint();
        if (n < 50) {
          putstr(\"small \");
        } else if (n == 50) {
          putstr(\"fifty \");
        } else {
          putstr(\"big \");
        }
      }

      fun main() {
        classify();
        classify();
        classify();
        if (0) { putstr(\"never\"); }
      }
    "},
    Config {
      input: vec![10, 50, 90],
      ..Config::default()
    },
  );

  assert_balanced(&input);
  assert_eq!(input.output, "small fifty big ");
}

#[test]
fn division_by_zero_stops_output() {
  let divide = run(indoc! {"
    fun main() {
      putint(1);
      putint(1 / 0);
      putint(2);
    }
  "});

  assert_eq!(divide.output, "1");
  let error = divide.result.unwrap_err();
  assert_eq!(error.kind(), &RuntimeErrorKind::DivisionByZero);
  assert_eq!(divide.vm.status(), Status::Trapped);
}

#[test]
fn nested_calls() {
  let calls = run(indoc! {"
    fun inc() {
      putint(1);
      return 1;
    }
    fun twice() {
      let a = inc();
      return a + inc();
    }
    fun main() {
      return twice();
    }
  "});

  assert_balanced(&calls);
  assert_eq!(calls.output, "11");
  assert_eq!(calls.vm.register(Register::R0), 2);
}

#[test]
fn functions_can_be_used_before_definition() {
  let forward = run(indoc! {"
    fun main() { return later(); }
    fun later() { return 7; }
  "});

  assert_balanced(&forward);
  assert_eq!(forward.vm.register(Register::R0), 7);
}

#[test]
fn functions_shadow_intrinsics() {
  let shadow = run(indoc! {"
    fun putint() { return 5; }
    fun main() { return putint(); }
  "});

  assert_balanced(&shadow);
  assert_eq!(shadow.vm.register(Register::R0), 5);
  assert_eq!(shadow.output, "");
}

#[test]
fn arithmetic_evaluates_right_operand_first() {
  let order = run(indoc! {"
    fun a() { putint(1); return 10; }
    fun b() { putint(2); return 3; }
    fun main() { putint(a() - b()); }
  "});

  assert_balanced(&order);
  assert_eq!(order.output, "217");
}

#[test]
fn comparison_evaluates_left_operand_first() {
  let order = run(indoc! {"
    fun a() { putint(1); return 10; }
    fun b() { putint(2); return 3; }
    fun main() { putint(a() > b()); }
  "});

  assert_balanced(&order);
  assert_eq!(order.output, "121");
}

#[test]
fn operators() {
  let operators = run(indoc! {r#"
    fun main() {
      putint(7 - 2 - 1); putstr(" ");
      putint(2 + 3 * 4); putstr(" ");
      putint(17 / 5); putstr(" ");
      putint(17 % 5); putstr(" ");
      putint(-7 / 2); putstr(" ");
      putint(-(3 - 5)); putstr(" ");
      putint(1 != 2); putint(2 != 2); putstr(" ");
      putint(1 <= 1); putint(2 <= 1); putstr(" ");
      putint(1 >= 2); putint(2 >= 2); putstr(" ");
      putint(!0); putint(!5);
    }
  "#});

  assert_balanced(&operators);
  assert_eq!(operators.output, "4 14 3 2 -3 2 10 10 01 10");
}

#[test]
fn integers_wrap() {
  let wrap = run("fun main() { putint(9223372036854775807 + 1); }");

  assert_balanced(&wrap);
  assert_eq!(wrap.output, "-9223372036854775808");
}

#[test]
fn block_scopes() {
  let scopes = run(indoc! {"
    fun main() {
      let x = 1;
      if (x) {
        let x = 2;
        putint(x);
      }
      putint(x);
    }
  "});

  assert_balanced(&scopes);
  assert_eq!(scopes.output, "21");
}

#[test]
fn uninitialised_let_resets_each_iteration() {
  let reset = run(indoc! {"
    fun main() {
      let i = 0;
      while (i < 2) {
        let y;
        putint(y);
        y = 7;
        i = i + 1;
      }
    }
  "});

  assert_balanced(&reset);
  assert_eq!(reset.output, "00");
}

#[test]
fn return_from_inside_loop() {
  let early = run(indoc! {"
    fun find() {
      let i = 0;
      while (1) {
        let doubled = i * 2;
        if (doubled == 6) {
          return i;
        }
        i = i + 1;
      }
    }
    fun main() {
      let before = 100;
      let found = find();
      return before + found;
    }
  "});

  assert_balanced(&early);
  assert_eq!(early.vm.register(Register::R0), 103);
}

#[test]
fn expression_statements_are_discarded() {
  let discard = run(indoc! {"
    fun value() { return 9; }
    fun main() {
      value();
      1 + 2;
      getint();
      \"unused\";
    }
  "});

  assert_balanced(&discard);
}

#[test]
fn input_bytes() {
  let echo = run_with(
    indoc! {"
      fun main() {
        let c = getint();
        while (c != -1) {
          putint(c);
          putstr(\" \");
          c = getint();
        }
      }
    "},
    Config {
      input: b"ab".to_vec(),
      ..Config::default()
    },
  );

  assert_balanced(&echo);
  assert_eq!(echo.output, "97 98 ");
}

#[test]
fn step_limit_stops_infinite_loop() {
  let infinite = run_with(
    "fun main() { while (1) {} }",
    Config {
      step_limit: Some(1000),
      ..Config::default()
    },
  );

  let error = infinite.result.unwrap_err();
  assert_eq!(error.kind(), &RuntimeErrorKind::StepLimitExceeded(1000));
  assert_eq!(infinite.vm.status(), Status::Trapped);
}

#[test]
fn assembled_programs_link_idempotently() {
  let ast = parse("fun main() { let i = 0; while (i < 3) { i = i + 1; } }").unwrap();
  let mut program = assemble(&ast).unwrap();
  let labels = program.labels().clone();
  let instructions = program.instructions().to_vec();

  program.relink();
  assert_eq!(program.labels(), &labels);
  assert_eq!(program.instructions(), instructions);
  assert_eq!(ava_vm::link(&instructions), labels);

  // main, its epilogue, the loop start and end, and the entry
  assert_eq!(labels.len(), 5);
}

#[test]
fn disassembly() {
  let ast = parse("fun main() { return 1 + 2; }").unwrap();
  let program = assemble(&ast).unwrap();

  let expected = indoc! {"
          ╭─[Bytecode]
     0000 │ Lbl main
     0001 │ Load fp
     0002 │ SetFp
     0003 │ LoadImmediate 2
     0004 │ LoadImmediate 1
     0005 │ Add
     0006 │ Jmp L1 (0008)
     0007 │ LoadImmediate 0
     0008 │ Lbl L1
     0009 │ Store r0
     0010 │ Store fp
     0011 │ Ret
     0012 │ Lbl <entry>
     0013 │ Call main (0000)
     0014 │ Store r0
     0015 │ Hlt
    ──────╯
  "};
  assert_eq!(program.to_string(), expected);
}

#[test]
fn locals_fill_the_frame() {
  let ast = parse(indoc! {"
    fun main() {
      let a = 1;
      while (a < 2) {
        let b = 2;
        if (b) { let c = 3; } else { let d = 4; }
        a = a + 1;
      }
    }
  "})
  .unwrap();
  let program = assemble(&ast).unwrap();

  let prologue: Vec<_> = (program.instructions().iter())
    .skip(1)
    .take(6)
    .map(ToString::to_string)
    .collect();
  assert_eq!(
    prologue,
    [
      "Load fp",
      "LoadImmediate 0",
      "LoadImmediate 0",
      "LoadImmediate 0",
      "LoadImmediate 0",
      "SetFp"
    ]
  );
}
