use crate::{
  ast::{Block, Declaration, Expression, Function, Program, Statement, expression::*, statement::*},
  span::Span,
  tokeniser::{Token, TokenKind},
};
use std::{error, fmt};
use thin_vec::ThinVec;

pub struct Parser<'source> {
  /// The source code being parsed
  source: &'source str,
  /// The tokens of the source
  tokens: Vec<Token>,
  /// The current token
  position: usize,
}
impl<'source> Parser<'source> {
  pub fn new(source: &'source str, tokens: Vec<Token>) -> Self {
    Self {
      source,
      tokens,
      position: 0,
    }
  }

  pub fn parse(mut self) -> Result<Program, ParseError> {
    let mut program = Program::default();

    while !self.is_finished() {
      let declaration = self.parse_declaration()?;
      program.declarations.push(declaration);
    }

    Ok(program)
  }

  fn is_finished(&self) -> bool {
    self.current_kind() == TokenKind::EndOfFile
  }

  fn current_token(&self) -> Token {
    match self.tokens.get(self.position) {
      Some(token) => *token,
      None => {
        let end = u32::try_from(self.source.len()).unwrap_or(u32::MAX);
        Token {
          kind: TokenKind::EndOfFile,
          start: end,
          length: 0,
        }
      }
    }
  }

  fn current_kind(&self) -> TokenKind {
    self.current_token().kind
  }

  fn peek_kind(&self) -> TokenKind {
    self
      .tokens
      .get(self.position + 1)
      .map_or(TokenKind::EndOfFile, |token| token.kind)
  }

  fn advance(&mut self) -> Token {
    let token = self.current_token();
    self.position += 1;
    token
  }

  fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
    if self.current_kind() == kind {
      Ok(self.advance())
    } else {
      Err(self.unexpected(ParseError::Expected {
        expected: kind,
        received: self.current_token(),
      }))
    }
  }

  fn matches(&mut self, kind: TokenKind) -> bool {
    if self.current_kind() == kind {
      self.position += 1;
      true
    } else {
      false
    }
  }

  /// Problem tokens get a more specific error than the one which was expected
  fn unexpected(&self, error: ParseError) -> ParseError {
    let token = self.current_token();

    match token.kind {
      TokenKind::UnterminatedString => ParseError::UnterminatedString(token),
      TokenKind::Unknown => ParseError::UnknownCharacter(token),
      _ => error,
    }
  }

  fn token_text(&self, token: Token) -> &'source str {
    Span::from(token).source_text(self.source)
  }

  fn parse_declaration(&mut self) -> Result<Declaration, ParseError> {
    match self.current_kind() {
      TokenKind::Fun => Ok(Declaration::Function(self.parse_function()?)),
      TokenKind::Let => Ok(Declaration::Variable(self.parse_let()?)),
      _ => Err(self.unexpected(ParseError::ExpectedDeclaration(self.current_token()))),
    }
  }

  fn parse_function(&mut self) -> Result<Function, ParseError> {
    let keyword = self.expect(TokenKind::Fun)?;
    let name = self.expect(TokenKind::Identifier)?;

    self.expect(TokenKind::LeftParen)?;
    if self.current_kind() != TokenKind::RightParen {
      return Err(ParseError::FunctionParameters(self.current_token()));
    }
    self.expect(TokenKind::RightParen)?;

    let body = self.parse_block()?;

    Ok(Function {
      name: self.token_text(name).to_owned(),
      name_span: Span::from(name),
      span: Span::from(keyword).merge(body.span),
      body,
    })
  }

  fn parse_block(&mut self) -> Result<Block, ParseError> {
    let opening = self.expect(TokenKind::LeftCurly)?;

    let mut statements = ThinVec::new();
    while !matches!(
      self.current_kind(),
      TokenKind::RightCurly | TokenKind::EndOfFile
    ) {
      statements.push(self.parse_statement()?);
    }

    let closing = self.expect(TokenKind::RightCurly)?;

    Ok(Block {
      statements,
      span: Span::from(opening).merge(Span::from(closing)),
    })
  }

  fn parse_statement(&mut self) -> Result<Statement, ParseError> {
    match (self.current_kind(), self.peek_kind()) {
      (TokenKind::Let, _) => Ok(Statement::Let(self.parse_let()?)),
      (TokenKind::While, _) => Ok(Statement::While(self.parse_while()?)),
      (TokenKind::If, _) => Ok(Statement::If(self.parse_if()?)),
      (TokenKind::Return, _) => Ok(Statement::Return(self.parse_return()?)),
      (TokenKind::Identifier, TokenKind::Equal) => Ok(Statement::Assign(self.parse_assign()?)),
      _ => {
        let expression = self.parse_expression()?;
        let semicolon = self.expect(TokenKind::Semicolon)?;

        Ok(Statement::Expression(ExpressionStmt {
          span: expression.span().merge(Span::from(semicolon)),
          expression,
        }))
      }
    }
  }

  fn parse_let(&mut self) -> Result<Let, ParseError> {
    let keyword = self.expect(TokenKind::Let)?;
    let name = self.expect(TokenKind::Identifier)?;

    let value = if self.matches(TokenKind::Equal) {
      Some(self.parse_expression()?)
    } else {
      None
    };
    let semicolon = self.expect(TokenKind::Semicolon)?;

    Ok(Let {
      name: self.token_text(name).to_owned(),
      value,
      span: Span::from(keyword).merge(Span::from(semicolon)),
    })
  }

  fn parse_while(&mut self) -> Result<While, ParseError> {
    let keyword = self.expect(TokenKind::While)?;
    let condition = self.parse_condition()?;
    let body = self.parse_block()?;

    Ok(While {
      condition,
      span: Span::from(keyword).merge(body.span),
      body,
    })
  }

  fn parse_if(&mut self) -> Result<If, ParseError> {
    let keyword = self.expect(TokenKind::If)?;
    let condition = self.parse_condition()?;
    let then = self.parse_block()?;

    let otherwise = if self.matches(TokenKind::Else) {
      if self.current_kind() == TokenKind::If {
        let nested = self.parse_if()?;
        let span = nested.span;
        let mut statements = ThinVec::with_capacity(1);
        statements.push(Statement::If(nested));

        Some(Block { statements, span })
      } else {
        Some(self.parse_block()?)
      }
    } else {
      None
    };

    let end = otherwise.as_ref().map_or(then.span, |block| block.span);
    Ok(If {
      condition,
      then,
      otherwise,
      span: Span::from(keyword).merge(end),
    })
  }

  fn parse_condition(&mut self) -> Result<Expression, ParseError> {
    self.expect(TokenKind::LeftParen)?;
    let condition = self.parse_expression()?;
    self.expect(TokenKind::RightParen)?;

    Ok(condition)
  }

  fn parse_return(&mut self) -> Result<Return, ParseError> {
    let keyword = self.expect(TokenKind::Return)?;

    let value = if self.current_kind() == TokenKind::Semicolon {
      None
    } else {
      Some(self.parse_expression()?)
    };
    let semicolon = self.expect(TokenKind::Semicolon)?;

    Ok(Return {
      value,
      span: Span::from(keyword).merge(Span::from(semicolon)),
    })
  }

  fn parse_assign(&mut self) -> Result<Assign, ParseError> {
    let name = self.expect(TokenKind::Identifier)?;
    self.expect(TokenKind::Equal)?;
    let value = self.parse_expression()?;
    let semicolon = self.expect(TokenKind::Semicolon)?;

    Ok(Assign {
      target: Variable {
        name: self.token_text(name).to_owned(),
        span: Span::from(name),
      },
      value,
      span: Span::from(name).merge(Span::from(semicolon)),
    })
  }

  fn parse_expression(&mut self) -> Result<Expression, ParseError> {
    self.parse_comparison()
  }

  /// Comparisons don't chain, `a < b < c` is an error
  fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
    let left = self.parse_additive()?;

    if matches!(
      self.current_kind(),
      TokenKind::EqualEqual
        | TokenKind::BangEqual
        | TokenKind::Less
        | TokenKind::LessEqual
        | TokenKind::Greater
        | TokenKind::GreaterEqual
    ) {
      let operator = self.advance();
      let right = self.parse_additive()?;
      return Ok(self.binary(operator, left, right));
    }

    Ok(left)
  }

  fn parse_additive(&mut self) -> Result<Expression, ParseError> {
    let mut left = self.parse_term()?;

    while matches!(self.current_kind(), TokenKind::Plus | TokenKind::Minus) {
      let operator = self.advance();
      let right = self.parse_term()?;
      left = self.binary(operator, left, right);
    }

    Ok(left)
  }

  fn parse_term(&mut self) -> Result<Expression, ParseError> {
    let mut left = self.parse_unary()?;

    while matches!(
      self.current_kind(),
      TokenKind::Star | TokenKind::Slash | TokenKind::Percent
    ) {
      let operator = self.advance();
      let right = self.parse_unary()?;
      left = self.binary(operator, left, right);
    }

    Ok(left)
  }

  fn parse_unary(&mut self) -> Result<Expression, ParseError> {
    match self.current_kind() {
      TokenKind::Bang => {
        let operator = self.advance();
        let operand = self.parse_unary()?;

        Ok(Expression::Call(Call {
          callee: "!".to_owned(),
          callee_span: Span::from(operator),
          span: Span::from(operator).merge(operand.span()),
          arguments: thin_vec::thin_vec![operand],
          is_operator: true,
        }))
      }
      TokenKind::Minus if self.peek_kind() == TokenKind::Number => {
        let minus = self.advance();
        let number = self.advance();
        let text = format!("-{}", self.token_text(number));

        Ok(Expression::Integer(Integer {
          value: text
            .parse()
            .map_err(|_| ParseError::IntegerTooLarge(number))?,
          span: Span::from(minus).merge(Span::from(number)),
        }))
      }
      TokenKind::Minus => {
        let operator = self.advance();
        let operand = self.parse_unary()?;
        let zero = Expression::Integer(Integer {
          value: 0,
          span: Span::from(operator),
        });

        Ok(self.binary(operator, zero, operand))
      }
      _ => self.parse_primary(),
    }
  }

  fn parse_primary(&mut self) -> Result<Expression, ParseError> {
    let token = self.current_token();

    match token.kind {
      TokenKind::Number => {
        self.advance();
        let value = (self.token_text(token).parse())
          .map_err(|_| ParseError::IntegerTooLarge(token))?;

        Ok(Expression::Integer(Integer {
          value,
          span: Span::from(token),
        }))
      }
      TokenKind::String => {
        self.advance();
        Ok(Expression::String(StringLiteral {
          value: self.unescape(token)?,
          span: Span::from(token),
        }))
      }
      TokenKind::Identifier if self.peek_kind() == TokenKind::LeftParen => self.parse_call(),
      TokenKind::Identifier => {
        self.advance();
        Ok(Expression::Variable(Variable {
          name: self.token_text(token).to_owned(),
          span: Span::from(token),
        }))
      }
      TokenKind::LeftParen => {
        self.advance();
        let expression = self.parse_expression()?;
        self.expect(TokenKind::RightParen)?;

        Ok(expression)
      }
      _ => Err(self.unexpected(ParseError::ExpectedExpression(token))),
    }
  }

  fn parse_call(&mut self) -> Result<Expression, ParseError> {
    let name = self.expect(TokenKind::Identifier)?;
    self.expect(TokenKind::LeftParen)?;

    let mut arguments = ThinVec::new();
    if self.current_kind() != TokenKind::RightParen {
      arguments.push(self.parse_expression()?);

      while self.matches(TokenKind::Comma) {
        arguments.push(self.parse_expression()?);
      }
    }
    let closing = self.expect(TokenKind::RightParen)?;

    Ok(Expression::Call(Call {
      callee: self.token_text(name).to_owned(),
      callee_span: Span::from(name),
      arguments,
      is_operator: false,
      span: Span::from(name).merge(Span::from(closing)),
    }))
  }

  fn binary(&self, operator: Token, left: Expression, right: Expression) -> Expression {
    Expression::Call(Call {
      callee: self.token_text(operator).to_owned(),
      callee_span: Span::from(operator),
      span: left.span().merge(right.span()),
      arguments: thin_vec::thin_vec![left, right],
      is_operator: true,
    })
  }

  /// Get the contents of a string token, resolving any escape sequences
  fn unescape(&self, token: Token) -> Result<String, ParseError> {
    let text = self.token_text(token);
    let contents = &text[1..text.len() - 1];

    let mut string = String::with_capacity(contents.len());
    let mut characters = contents.char_indices();
    while let Some((index, character)) = characters.next() {
      if character != '\\' {
        string.push(character);
        continue;
      }

      match characters.next() {
        Some((_, 'n')) => string.push('\n'),
        Some((_, 't')) => string.push('\t'),
        Some((_, '"')) => string.push('"'),
        Some((_, '\\')) => string.push('\\'),
        escape => {
          let start = token.start + 1 + u32::try_from(index).unwrap_or_default();
          let length = escape.map_or(1, |(_, c)| 1 + c.len_utf8());

          return Err(ParseError::InvalidEscape {
            character: escape.map(|(_, c)| c),
            span: Span::new(start, start + u32::try_from(length).unwrap_or(1)),
          });
        }
      }
    }

    Ok(string)
  }
}

/// An error from parsing the source code
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
  /// Expected a token of a certain kind
  Expected {
    /// Expected Token Kind to be
    expected: TokenKind,
    /// Received this Token instead
    received: Token,
  },
  /// Expected Expression
  ExpectedExpression(Token),
  /// Expected a function or variable declaration
  ExpectedDeclaration(Token),
  /// Functions don't take parameters
  FunctionParameters(Token),
  /// Unknown Character
  UnknownCharacter(Token),
  /// Unterminated String Literal
  UnterminatedString(Token),
  /// Unknown escape sequence in a string
  InvalidEscape {
    /// The character after the backslash
    character: Option<char>,
    /// The location of the escape sequence
    span: Span,
  },
  /// Integer literal doesn't fit in 64 bits
  IntegerTooLarge(Token),
}
impl ParseError {
  /// The title of the error message
  #[must_use]
  pub fn title(&self) -> String {
    match self {
      Self::Expected { expected, .. } => format!("Expected {expected}"),
      Self::ExpectedExpression(_) => "Expected Expression".into(),
      Self::ExpectedDeclaration(_) => "Expected Declaration".into(),
      Self::FunctionParameters(_) => "Function Parameters".into(),
      Self::UnknownCharacter(_) => "Unknown Character".into(),
      Self::UnterminatedString(_) => "Unterminated String".into(),
      Self::InvalidEscape { .. } => "Invalid Escape Sequence".into(),
      Self::IntegerTooLarge(_) => "Integer Too Large".into(),
    }
  }

  /// The body of the error message describing what has gone wrong
  #[must_use]
  pub fn message(&self) -> String {
    match self {
      Self::Expected { expected, received } => {
        format!("expected {expected} but got {}", received.kind)
      }
      Self::ExpectedExpression(t) => format!("expected expression but got {}", t.kind),
      Self::ExpectedDeclaration(t) => {
        format!("expected `fun` or `let` at the top level but got {}", t.kind)
      }
      Self::FunctionParameters(_) => "functions do not take parameters".into(),
      Self::UnknownCharacter(_) => "got unknown character".into(),
      Self::UnterminatedString(_) => "missing closing quote for string".into(),
      Self::InvalidEscape {
        character: Some(character),
        ..
      } => format!("unknown escape sequence `\\{character}`"),
      Self::InvalidEscape {
        character: None, ..
      } => "string ends with a backslash".into(),
      Self::IntegerTooLarge(_) => "integer literal does not fit in 64 bits".into(),
    }
  }

  /// The location of the error
  #[must_use]
  pub fn span(&self) -> Span {
    match self {
      Self::Expected { received, .. } => Span::from(*received),
      Self::ExpectedExpression(token)
      | Self::ExpectedDeclaration(token)
      | Self::FunctionParameters(token)
      | Self::UnknownCharacter(token)
      | Self::UnterminatedString(token)
      | Self::IntegerTooLarge(token) => Span::from(*token),
      Self::InvalidEscape { span, .. } => *span,
    }
  }
}
impl fmt::Display for ParseError {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.message())
  }
}
impl error::Error for ParseError {}
