//! # UI Tests for Running Programs
#![cfg(not(miri))]

use assert_cmd::Command;
use indoc::indoc;

fn ava() -> Command {
  Command::cargo_bin(env!("CARGO_PKG_NAME")).unwrap()
}

fn run(source: &str) -> String {
  let output = ava().args(["run", "-"]).write_stdin(source).output().unwrap();

  assert!(output.status.success());
  assert_eq!(String::from_utf8(output.stderr).unwrap(), "Exit code: 0\n");
  String::from_utf8(output.stdout).unwrap()
}

#[test]
fn hello_demo() {
  let output = ava().args(["run", "../../demos/hello.ava"]).output().unwrap();

  assert!(output.status.success());
  assert_eq!(String::from_utf8(output.stderr).unwrap(), "Exit code: 0\n");
  assert_eq!(String::from_utf8(output.stdout).unwrap(), "Hello, World!\n");
}

#[test]
fn fibonacci_demo() {
  let output = ava()
    .args(["run", "../../demos/fibonacci.ava"])
    .output()
    .unwrap();

  assert!(output.status.success());
  let expected = indoc! {"
    0
    1
    1
    2
    3
    5
    8
    13
    21
    34
  "};
  assert_eq!(String::from_utf8(output.stdout).unwrap(), expected);
}

#[test]
fn input_from_argument() {
  let output = ava()
    .args(["run", "../../demos/count.ava", "--input", "5"])
    .output()
    .unwrap();

  assert!(output.status.success());
  assert_eq!(String::from_utf8(output.stdout).unwrap(), "1 2 3 4 5 \n");
  assert_eq!(String::from_utf8(output.stderr).unwrap(), "Exit code: 6\n");
}

#[test]
fn input_from_file() {
  let output = ava()
    .args(["run", "-", "--input-file", "../../demos/hello.ava"])
    .write_stdin("fun main() { putint(getint()); putint(getint()); }")
    .output()
    .unwrap();

  assert!(output.status.success());
  // `//` from the comment on the first line
  assert_eq!(String::from_utf8(output.stdout).unwrap(), "4747");
}

#[test]
fn input_exhausted() {
  let output = run("fun main() { putint(getint()); }");
  assert_eq!(output, "-1");
}

#[test]
fn input_options_conflict() {
  let output = ava()
    .args(["run", "-", "--input", "1", "--input-file", "x"])
    .write_stdin("fun main() {}")
    .output()
    .unwrap();

  assert!(!output.status.success());
  assert!(output.stdout.is_empty());
}

#[test]
fn arithmetic() {
  let output = run(indoc! {r#"
    fun square() {
      let n = getint();
      return n * n;
    }

    fun main() {
      putint(-(2 + 3) * 4 % 7);
      putstr("\n");
      putint(square());
      putstr("\n");
    }
  "#});
  assert_eq!(output, "-6\n1\n");
}

#[test]
fn strings() {
  let output = run(indoc! {r#"
    fun main() {
      let greeting = "tab\there";
      putstr(greeting);
      putstr("\n\"quoted\"\n");
    }
  "#});
  assert_eq!(output, "tab\there\n\"quoted\"\n");
}

#[test]
fn main_return_value_is_reported() {
  let output = ava()
    .args(["run", "-"])
    .write_stdin("fun main() { return 7; }")
    .output()
    .unwrap();

  assert_eq!(output.status.code(), Some(0));
  assert!(output.stdout.is_empty());
  assert_eq!(String::from_utf8(output.stderr).unwrap(), "Exit code: 7\n");

  let output = ava()
    .args(["run", "-"])
    .write_stdin("fun main() { putint(3); return -(1 + 1); }")
    .output()
    .unwrap();

  assert_eq!(output.status.code(), Some(0));
  assert_eq!(String::from_utf8(output.stdout).unwrap(), "3");
  assert_eq!(String::from_utf8(output.stderr).unwrap(), "Exit code: -2\n");
}

#[test]
fn dump_state() {
  let output = ava()
    .args(["run", "-", "--dump-state"])
    .write_stdin("fun main() { return 7; }")
    .output()
    .unwrap();

  assert!(output.status.success());
  assert!(output.stdout.is_empty());

  let stderr = String::from_utf8(output.stderr).unwrap();
  assert!(stderr.starts_with("╭─[Machine State]\nregisters: r0=7 r1=0 r2=0 r3=0 fp=0\n"));
  assert!(stderr.contains("stack: []\ncall stack: []\n"));
  assert!(stderr.contains("status: Halted after "));
  assert!(stderr.ends_with("╯\nExit code: 7\n"));
}

#[test]
fn trace() {
  let output = ava()
    .args(["run", "-", "--trace"])
    .write_stdin("fun main() { putint(1); }")
    .output()
    .unwrap();

  assert!(output.status.success());
  assert_eq!(String::from_utf8(output.stdout).unwrap(), "1");

  let stderr = String::from_utf8(output.stderr).unwrap();
  assert!(stderr.contains("│ Call "));
  assert!(stderr.contains("PutInt"));
  assert!(stderr.contains("Hlt"));
}
