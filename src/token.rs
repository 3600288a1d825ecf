use std::fmt;

/// The kind of value a [`Token`] holds.
///
/// Arrays have no kind of their own: the lexer flattens an array reply into
/// the sequence of its elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
  /// When the first byte of the data is "-"
  ///
  /// Kept apart from [`TokenKind::SimpleString`], unlike the original client
  /// which lexed these as simple strings, so an error reply is never `OK`.
  /// Both are displayed the same way.
  ///
  /// ```terminal
  /// "-ERR unknown command 'foobar'\r\n"
  /// ```
  Error,
  /// When the first byte of the data is ":"
  ///
  /// ```terminal
  /// ":1000\r\n"
  /// ```
  Integer,
  /// When the first byte of the data is ";"
  ///
  /// ```terminal
  /// ";3.14\r\n"
  /// ```
  Float,
  /// When the first byte of the data is "+"
  ///
  /// ```terminal
  /// "+OK\r\n"
  /// ```
  SimpleString,
  /// When the first byte of the data is "$"
  ///
  /// ```terminal
  /// "$6\r\nfoobar\r\n"
  /// ```
  BulkString,
}

/// A single value decoded from a server reply.
///
/// For [`TokenKind::Integer`] and [`TokenKind::Float`] the value is the
/// decimal rendering of the parsed number, not the bytes seen on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
  kind: TokenKind,
  value: Vec<u8>,
}

impl Token {
  pub fn new(kind: TokenKind, value: impl Into<Vec<u8>>) -> Self {
    Self {
      kind,
      value: value.into(),
    }
  }

  pub fn integer(value: i64) -> Self {
    Self::new(TokenKind::Integer, value.to_string())
  }

  pub fn float(value: f64) -> Self {
    Self::new(TokenKind::Float, format!("{:.6}", value))
  }

  pub fn kind(&self) -> TokenKind {
    self.kind
  }

  pub fn value(&self) -> &[u8] {
    &self.value
  }

  /// Returns true when the token is the `+OK` acknowledgement.
  pub fn is_ok(&self) -> bool {
    self.kind() == TokenKind::SimpleString && self.value() == b"OK"
  }
}

impl fmt::Display for Token {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", String::from_utf8_lossy(self.value()))
  }
}

/// Renders a reply for the terminal.
pub fn render(tokens: &[Token]) -> String {
  match tokens {
    [] => String::from("(empty)"),
    [token] => token.to_string(),
    tokens => tokens
      .iter()
      .enumerate()
      .map(|(i, token)| format!("{}) {}", i + 1, token))
      .collect::<Vec<_>>()
      .join("\n"),
  }
}
