use ava_syntax::{LineIndex, Span};
use owo_colors::{OwoColorize, Style};
use std::fmt;

pub struct Message {
  pub title: String,
  pub body: String,
  pub hint: Option<String>,
}
impl Message {
  pub fn error(message: String) -> Self {
    Self {
      title: message,
      body: String::new(),
      hint: None,
    }
  }
}
impl fmt::Display for Message {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", "✕ Error".bold().red())?;
    writeln!(f, "{} {}", ":".bold(), &self.title.bold())?;

    if !self.body.is_empty() {
      writeln!(f, "{}", &self.body)?;
    }

    if let Some(hint) = &self.hint {
      writeln!(f, "{} {}", "hint:".italic().cyan(), hint)?;
    }

    Ok(())
  }
}
impl From<&ava_syntax::ParseError> for Message {
  fn from(error: &ava_syntax::ParseError) -> Self {
    Self {
      title: error.title(),
      body: error.message(),
      hint: None,
    }
  }
}
impl From<&ava_vm::AssembleError> for Message {
  fn from(error: &ava_vm::AssembleError) -> Self {
    let hint = match error {
      ava_vm::AssembleError::MissingMain => Some("add a function `fun main() { ... }`".into()),
      ava_vm::AssembleError::UnsupportedDeclaration { .. } => {
        Some("move the variable inside a function".into())
      }
      _ => None,
    };

    Self {
      title: error.title().to_owned(),
      body: error.message(),
      hint,
    }
  }
}
impl From<&ava_vm::RuntimeError> for Message {
  fn from(error: &ava_vm::RuntimeError) -> Self {
    let hint = match error.kind() {
      ava_vm::RuntimeErrorKind::StepLimitExceeded(_) => {
        Some("raise the limit with `--max-steps`".into())
      }
      _ => None,
    };

    Self {
      title: error.title().to_owned(),
      body: error.message(),
      hint,
    }
  }
}

pub struct CodeFrame<'a> {
  title: &'a str,
  source: &'a str,
  span: Span,

  lines: LineIndex,
}
impl<'a> CodeFrame<'a> {
  pub fn new(title: &'a str, source: &'a str, span: Span) -> Self {
    Self {
      title: if title == "-" { "STDIN" } else { title },
      source,
      span,
      lines: LineIndex::from_source(source),
    }
  }
}
impl fmt::Display for CodeFrame<'_> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    let start_line = self.lines.line(self.span).max(1);
    let end_line = self.lines.final_line(self.span).max(start_line);

    writeln!(
      f,
      "    {}{}{}{}{}",
      "╭─[".dimmed(),
      self.title,
      ":".dimmed(),
      start_line,
      "]".dimmed()
    )?;

    for line in start_line..=end_line {
      let line_text = self.lines.line_span(line).source_text(self.source);
      write!(f, "{line:>3} {}", "│".dimmed())?;
      if !line_text.is_empty() {
        write!(f, " ")?;
      }
      highlight_source(f, line_text)?;
      if !line_text.ends_with('\n') {
        writeln!(f)?;
      }
    }

    write!(f, "{}", "────╯".dimmed())
  }
}

/// Writes source code, colouring literals and keywords
///
/// Comments and whitespace aren't tokens, so the text between tokens is written as is.
pub fn highlight_source(output: &mut dyn fmt::Write, source: &str) -> fmt::Result {
  use ava_syntax::{TokenKind, tokenise};

  let mut last = 0;
  for token in tokenise(source) {
    let gap = Span::new(last, token.start).source_text(source);
    write!(output, "{}", gap.dimmed())?;

    let style = match token.kind {
      TokenKind::Number => Style::new().blue(),
      TokenKind::String | TokenKind::UnterminatedString => Style::new().green(),
      TokenKind::Else | TokenKind::If | TokenKind::Return | TokenKind::While => {
        Style::new().cyan()
      }
      TokenKind::Let | TokenKind::Fun => Style::new().magenta(),
      _ => Style::new(),
    };
    let token_text = Span::from(token).source_text(source);
    write!(output, "{}", token_text.style(style))?;

    last = token.start + token.length;
  }

  let tail = Span::new(last, u32::try_from(source.len()).unwrap_or(u32::MAX));
  write!(output, "{}", tail.source_text(source).dimmed())
}
