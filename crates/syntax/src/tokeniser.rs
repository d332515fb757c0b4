use crate::span::Span;
use std::{fmt, iter};

/// Convert a string of source code into an [Iterator] of [Token]s
pub struct Tokeniser<'source> {
  /// The source code to tokenise
  source: &'source [u8],
  /// The current position in the source code
  position: usize,
}
impl<'source> From<&'source str> for Tokeniser<'source> {
  /// Create a new [Tokeniser] from a source code string
  ///
  /// # Panics
  /// Panics if the length of the source code is greater than `u32::MAX`
  fn from(value: &'source str) -> Self {
    assert!(value.len() < u32::MAX as usize);

    Self {
      source: value.as_ref(),
      position: 0,
    }
  }
}
impl Tokeniser<'_> {
  /// Has the end of the source code been reached?
  fn is_end(&self, position: usize) -> bool {
    position >= self.source.len()
  }

  /// Skip over whitespace, so the position is at the start of the next token
  fn skip_whitespace(&mut self) {
    while let Some(b' ' | b'\r' | b'\t' | b'\n') = self.source.get(self.position) {
      self.position += 1;
    }
  }

  /// Get the next token from the source code
  fn get_next_token(&self) -> (TokenKind, usize) {
    let character = self.source[self.position];
    let next_character = self.source.get(self.position + 1);

    match character {
      b'/' if matches!(next_character, Some(b'/')) => self.comment(),

      // Values
      b'"' => self.string(),
      b'0'..=b'9' => self.number(),
      b'_' | b'a'..=b'z' | b'A'..=b'Z' => self.identifier(),

      // Brackets + Separators
      b'(' => (TokenKind::LeftParen, 1),
      b')' => (TokenKind::RightParen, 1),
      b'{' => (TokenKind::LeftCurly, 1),
      b'}' => (TokenKind::RightCurly, 1),
      b';' => (TokenKind::Semicolon, 1),
      b',' => (TokenKind::Comma, 1),

      // Operators
      b'+' => (TokenKind::Plus, 1),
      b'-' => (TokenKind::Minus, 1),
      b'/' => (TokenKind::Slash, 1),
      b'*' => (TokenKind::Star, 1),
      b'%' => (TokenKind::Percent, 1),

      // Equalities
      b'!' if matches!(next_character, Some(b'=')) => (TokenKind::BangEqual, 2),
      b'=' if matches!(next_character, Some(b'=')) => (TokenKind::EqualEqual, 2),
      b'<' if matches!(next_character, Some(b'=')) => (TokenKind::LessEqual, 2),
      b'>' if matches!(next_character, Some(b'=')) => (TokenKind::GreaterEqual, 2),
      b'!' => (TokenKind::Bang, 1),
      b'=' => (TokenKind::Equal, 1),
      b'<' => (TokenKind::Less, 1),
      b'>' => (TokenKind::Greater, 1),

      // Unknown character, consume the whole UTF-8 sequence
      x if (x & 0b1111_0000) == 0b1111_0000 => (TokenKind::Unknown, 4),
      x if (x & 0b1110_0000) == 0b1110_0000 => (TokenKind::Unknown, 3),
      x if (x & 0b1100_0000) == 0b1100_0000 => (TokenKind::Unknown, 2),
      _ => (TokenKind::Unknown, 1),
    }
  }

  /// Skip to the end of a comment token (a newline)
  fn comment(&self) -> (TokenKind, usize) {
    let length = self.source[self.position..]
      .iter()
      .take_while(|c| **c != b'\n')
      .count();

    (TokenKind::Comment, length)
  }

  /// Go to the end of a string token, the closing quote.
  ///
  /// Escape sequences are kept in the token, and are resolved by the parser.
  fn string(&self) -> (TokenKind, usize) {
    let mut position = self.position + 1;

    loop {
      if self.is_end(position) {
        break (TokenKind::UnterminatedString, position - self.position);
      }

      match self.source[position] {
        b'"' => break (TokenKind::String, position - self.position + 1),
        b'\\' => position += 2,
        _ => position += 1,
      }
    }
  }

  /// Get an integer token, a sequence of digits
  fn number(&self) -> (TokenKind, usize) {
    let length = self.source[self.position..]
      .iter()
      .take_while(|c| c.is_ascii_digit())
      .count();

    (TokenKind::Number, length)
  }

  /// Get an identifier token, a sequence of [a-zA-Z0-9_]
  fn identifier(&self) -> (TokenKind, usize) {
    let length = self.source[self.position..]
      .iter()
      .take_while(|c| c.is_ascii_alphanumeric() || **c == b'_')
      .count();

    (self.identifier_type(length), length)
  }

  /// Determines the type of the identifier, is it a keyword or a standard identifier
  fn identifier_type(&self, length: usize) -> TokenKind {
    match &self.source[self.position..self.position + length] {
      b"else" => TokenKind::Else,
      b"fun" => TokenKind::Fun,
      b"if" => TokenKind::If,
      b"let" => TokenKind::Let,
      b"return" => TokenKind::Return,
      b"while" => TokenKind::While,
      _ => TokenKind::Identifier,
    }
  }
}
impl Iterator for Tokeniser<'_> {
  type Item = Token;

  #[allow(clippy::cast_possible_truncation, reason = "source.len() < u32::MAX")]
  fn next(&mut self) -> Option<Self::Item> {
    loop {
      self.skip_whitespace();
      if self.is_end(self.position) {
        return None;
      }

      let (kind, length) = self.get_next_token();
      let start = self.position;
      // an escape or multi-byte character can claim more bytes than remain
      self.position = (self.position + length).min(self.source.len());

      if kind != TokenKind::Comment {
        return Some(Token {
          kind,
          start: start as u32,
          length: (self.position - start) as u32,
        });
      }
    }
  }
}
impl iter::FusedIterator for Tokeniser<'_> {}

/// A Token of source code, a lexeme of the language
///
/// With the type of token, start position and length of the token in the source code
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Token {
  /// The type of the token
  pub kind: TokenKind,
  /// The byte index of the start of the token
  pub start: u32,
  /// The length of the token in bytes
  pub length: u32,
}
impl From<Token> for Span {
  fn from(token: Token) -> Self {
    Self {
      start: token.start,
      end: token.start + token.length,
    }
  }
}

/// The type of a token
#[derive(Copy, Clone, Default, Debug, PartialEq, Eq)]
pub enum TokenKind {
  // Brackets
  /// `(`
  LeftParen,
  /// `)`
  RightParen,
  /// `{`
  LeftCurly,
  /// `}`
  RightCurly,

  // Separators
  /// `;`
  Semicolon,
  /// `,`
  Comma,

  // Operators
  /// `-`
  Minus,
  /// `+`
  Plus,
  /// `/`
  Slash,
  /// `*`
  Star,
  /// `%`
  Percent,

  // Equalities
  /// `!`
  Bang,
  /// `!=`
  BangEqual,
  /// `=`
  Equal,
  /// `==`
  EqualEqual,
  /// `>`
  Greater,
  /// `>=`
  GreaterEqual,
  /// `<`
  Less,
  /// `<=`
  LessEqual,

  // Literals
  /// An identifier, e.g. `counter`
  Identifier,
  /// A string literal, e.g. `"hello"`
  String,
  /// An integer literal, e.g. `42`
  Number,

  // Keywords
  /// `else`
  Else,
  /// `fun`
  Fun,
  /// `if`
  If,
  /// `let`
  Let,
  /// `return`
  Return,
  /// `while`
  While,

  // Other
  /// A comment, from `//` to the end of the line
  Comment,
  /// A string which is missing its closing quote
  UnterminatedString,
  /// A character which isn't part of the language
  Unknown,
  /// The end of the source
  #[default]
  EndOfFile,
}
impl TokenKind {
  /// Does the token always have the same length in the source?
  #[must_use]
  pub fn has_fixed_length(self) -> bool {
    !matches!(
      self,
      Self::Identifier
        | Self::String
        | Self::Number
        | Self::Comment
        | Self::UnterminatedString
        | Self::Unknown
    )
  }
}
impl fmt::Display for TokenKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let string = match self {
      Self::LeftParen => "(",
      Self::RightParen => ")",
      Self::LeftCurly => "{",
      Self::RightCurly => "}",
      Self::Semicolon => ";",
      Self::Comma => ",",
      Self::Minus => "-",
      Self::Plus => "+",
      Self::Slash => "/",
      Self::Star => "*",
      Self::Percent => "%",
      Self::Bang => "!",
      Self::BangEqual => "!=",
      Self::Equal => "=",
      Self::EqualEqual => "==",
      Self::Greater => ">",
      Self::GreaterEqual => ">=",
      Self::Less => "<",
      Self::LessEqual => "<=",
      Self::Identifier => "Identifier",
      Self::String => "String",
      Self::Number => "Number",
      Self::Else => "else",
      Self::Fun => "fun",
      Self::If => "if",
      Self::Let => "let",
      Self::Return => "return",
      Self::While => "while",
      Self::Comment => "Comment",
      Self::UnterminatedString => "Unterminated String",
      Self::Unknown => "Unknown Character",
      Self::EndOfFile => "End of File",
    };

    write!(f, "{string}")
  }
}
