use crate::{ParseError, Span, TokenKind, ast::Program};
use indoc::indoc;

fn parse(source: &str) -> Result<Program, ParseError> {
  crate::parse(source)
}

fn parse_to_string(source: &str) -> String {
  crate::parse(source).unwrap().to_string()
}

#[test]
fn empty_source() {
  assert!(parse("").unwrap().declarations.is_empty());
  assert!(parse("   \n\t\n ").unwrap().declarations.is_empty());
  assert!(parse("// only a comment\n").unwrap().declarations.is_empty());
}

#[test]
fn whitespace_and_comments() {
  assert!(parse("fun main() {}\n\n\n").is_ok());
  assert!(parse("fun main() { // comment\n return 0; }").is_ok());
  assert!(parse("fun main(){return 0;}").is_ok());
  assert!(parse("fun\tmain ( ) {\r\n}").is_ok());
}

#[test]
fn function_declaration() {
  let ast = parse_to_string("fun main() { return 1 + 2; }");
  let expected = indoc! {"
    ├─ Function (main)
    │  ╰─ Block
    │     ╰─ Return
    │        ╰─ Operator (+)
    │           ├─ Integer (1)
    │           ╰─ Integer (2)
  "};
  assert_eq!(ast, expected);

  let program = parse("fun a() {} fun b() {}").unwrap();
  let names: Vec<_> = program.functions().map(|f| f.name.as_str()).collect();
  assert_eq!(names, ["a", "b"]);
}

#[test]
fn global_variable_and_call() {
  let ast = parse_to_string("let g = 1;\nfun main() { putint(g, 2); }");
  let expected = indoc! {"
    ├─ Let 'g' =
    │  ╰─ Integer (1)
    ├─ Function (main)
    │  ╰─ Block
    │     ╰─ Call (putint)
    │        ├─ Variable (g)
    │        ╰─ Integer (2)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn operator_precedence() {
  let ast = parse_to_string("fun f() { 1 + 2 * 3; }");
  let expected = indoc! {"
    ├─ Function (f)
    │  ╰─ Block
    │     ╰─ Operator (+)
    │        ├─ Integer (1)
    │        ╰─ Operator (*)
    │           ├─ Integer (2)
    │           ╰─ Integer (3)
  "};
  assert_eq!(ast, expected);

  let ast = parse_to_string("fun f() { (1 + 2) % 3; }");
  let expected = indoc! {"
    ├─ Function (f)
    │  ╰─ Block
    │     ╰─ Operator (%)
    │        ├─ Operator (+)
    │        │  ├─ Integer (1)
    │        │  ╰─ Integer (2)
    │        ╰─ Integer (3)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn left_associative() {
  let ast = parse_to_string("fun f() { 10 - 4 - 3; }");
  let expected = indoc! {"
    ├─ Function (f)
    │  ╰─ Block
    │     ╰─ Operator (-)
    │        ├─ Operator (-)
    │        │  ├─ Integer (10)
    │        │  ╰─ Integer (4)
    │        ╰─ Integer (3)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn comparison_binds_loosest() {
  let ast = parse_to_string("fun f() { 1 + 1 >= 2 * 1; }");
  let expected = indoc! {"
    ├─ Function (f)
    │  ╰─ Block
    │     ╰─ Operator (>=)
    │        ├─ Operator (+)
    │        │  ├─ Integer (1)
    │        │  ╰─ Integer (1)
    │        ╰─ Operator (*)
    │           ├─ Integer (2)
    │           ╰─ Integer (1)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn unary() {
  let ast = parse_to_string("fun f() { -5; -x; !x; }");
  let expected = indoc! {"
    ├─ Function (f)
    │  ╰─ Block
    │     ├─ Integer (-5)
    │     ├─ Operator (-)
    │     │  ├─ Integer (0)
    │     │  ╰─ Variable (x)
    │     ╰─ Operator (!)
    │        ╰─ Variable (x)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn integer_limits() {
  assert!(parse("fun f() { 9223372036854775807; }").is_ok());
  assert!(parse("fun f() { -9223372036854775808; }").is_ok());

  assert!(matches!(
    parse("fun f() { 9223372036854775808; }"),
    Err(ParseError::IntegerTooLarge(_))
  ));
  assert!(matches!(
    parse("fun f() { 99999999999999999999999; }"),
    Err(ParseError::IntegerTooLarge(_))
  ));
}

#[test]
fn while_loop() {
  let ast = parse_to_string("fun main() { while (i < 3) { i = i + 1; } }");
  let expected = indoc! {"
    ├─ Function (main)
    │  ╰─ Block
    │     ╰─ While
    │        ├─ Condition
    │        │  ╰─ Operator (<)
    │        │     ├─ Variable (i)
    │        │     ╰─ Integer (3)
    │        ╰─ Block
    │           ╰─ Assign 'i' =
    │              ╰─ Operator (+)
    │                 ├─ Variable (i)
    │                 ╰─ Integer (1)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn if_else() {
  let ast = parse_to_string("fun main() { if (x == 1) { return 1; } else { return 2; } }");
  let expected = indoc! {"
    ├─ Function (main)
    │  ╰─ Block
    │     ╰─ If
    │        ├─ Condition
    │        │  ╰─ Operator (==)
    │        │     ├─ Variable (x)
    │        │     ╰─ Integer (1)
    │        ├─ Block
    │        │  ╰─ Return
    │        │     ╰─ Integer (1)
    │        ╰─ Block
    │           ╰─ Return
    │              ╰─ Integer (2)
  "};
  assert_eq!(ast, expected);
}

#[test]
fn else_if_nests() {
  let ast = parse_to_string("fun main() { if (a) {} else if (b) {} }");
  let expected = indoc! {"
    ├─ Function (main)
    │  ╰─ Block
    │     ╰─ If
    │        ├─ Condition
    │        │  ╰─ Variable (a)
    │        ├─ Block
    │        ╰─ Block
    │           ╰─ If
    │              ├─ Condition
    │              │  ╰─ Variable (b)
    │              ╰─ Block
  "};
  assert_eq!(ast, expected);
}

#[test]
fn let_statements() {
  let ast = parse_to_string("fun main() { let x; let y = 2; return; }");
  let expected = indoc! {"
    ├─ Function (main)
    │  ╰─ Block
    │     ├─ Let 'x' =
    │     ├─ Let 'y' =
    │     │  ╰─ Integer (2)
    │     ╰─ Return
  "};
  assert_eq!(ast, expected);
}

#[test]
fn strings() {
  let ast = parse_to_string(r#"fun main() { putstr("hi\n"); putstr("say \"yes\""); }"#);
  let expected = indoc! {r#"
    ├─ Function (main)
    │  ╰─ Block
    │     ├─ Call (putstr)
    │     │  ╰─ String "hi\n"
    │     ╰─ Call (putstr)
    │        ╰─ String "say \"yes\""
  "#};
  assert_eq!(ast, expected);

  // non-ascii characters are fine inside strings
  assert!(parse("fun main() { putstr(\"¬🤗\"); }").is_ok());
}

#[test]
fn invalid_escape() {
  let error = parse(r#"fun f() { "a\q"; }"#).unwrap_err();

  assert_eq!(
    error,
    ParseError::InvalidEscape {
      character: Some('q'),
      span: Span::new(12, 14),
    }
  );
  assert_eq!(error.title(), "Invalid Escape Sequence");
  assert_eq!(error.message(), "unknown escape sequence `\\q`");
}

#[test]
fn unterminated_string() {
  assert!(matches!(
    parse("fun main() { \"abc"),
    Err(ParseError::UnterminatedString(_))
  ));
  assert!(matches!(
    parse("fun main() { putstr(\"abc\\\"); }"),
    Err(ParseError::UnterminatedString(_))
  ));
}

#[test]
fn unknown_character() {
  assert!(matches!(
    parse("fun main() { 3 $ 4; }"),
    Err(ParseError::UnknownCharacter(_))
  ));
  assert!(matches!(
    parse("fun main() { 🤗; }"),
    Err(ParseError::UnknownCharacter(_))
  ));
  assert!(matches!(parse("&"), Err(ParseError::UnknownCharacter(_))));
}

#[test]
fn missing_semicolon() {
  let error = parse("fun main() { return 1 }").unwrap_err();

  assert_eq!(
    error,
    ParseError::Expected {
      expected: TokenKind::Semicolon,
      received: crate::Token {
        kind: TokenKind::RightCurly,
        start: 22,
        length: 1,
      },
    }
  );
  assert_eq!(error.span(), Span::new(22, 23));
  assert_eq!(error.title(), "Expected ;");
  assert_eq!(error.to_string(), "expected ; but got }");
}

#[test]
fn comparisons_do_not_chain() {
  assert!(matches!(
    parse("fun main() { 1 < 2 < 3; }"),
    Err(ParseError::Expected {
      expected: TokenKind::Semicolon,
      ..
    })
  ));
}

#[test]
fn expected_expression() {
  assert!(matches!(
    parse("fun main() { x + ; }"),
    Err(ParseError::ExpectedExpression(_))
  ));
  assert!(matches!(
    parse("fun main() { return ); }"),
    Err(ParseError::ExpectedExpression(_))
  ));
}

#[test]
fn top_level_statements_rejected() {
  assert!(matches!(
    parse("return 5;"),
    Err(ParseError::ExpectedDeclaration(_))
  ));
  assert!(matches!(
    parse("fun main() {} x = 1;"),
    Err(ParseError::ExpectedDeclaration(_))
  ));
}

#[test]
fn functions_have_no_parameters() {
  assert!(matches!(
    parse("fun main(a) {}"),
    Err(ParseError::FunctionParameters(_))
  ));
}

#[test]
fn unclosed_block() {
  assert!(matches!(
    parse("fun main() { return 1;"),
    Err(ParseError::Expected {
      expected: TokenKind::RightCurly,
      ..
    })
  ));
}
