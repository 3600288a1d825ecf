/// Decoding server replies.
///
/// A Redis server replies to clients sending any valid RESP data type as
/// reply. The type of the reply depends on its first byte:
///
/// ```terminal
/// "-"  error          "-ERR unknown command 'foobar'\r\n"
/// "+"  simple string  "+OK\r\n"
/// ":"  integer        ":1000\r\n"
/// ";"  float          ";3.14\r\n"
/// "$"  bulk string    "$6\r\nfoobar\r\n"
/// "*"  array          "*2\r\n$3\r\nfoo\r\n:1\r\n"
/// ```
///
/// Arrays are flattened: lexing an array returns its elements, and an
/// element can't be another array.
use std::io;

use miette::Diagnostic;
use thiserror::Error;
use tokio::io::AsyncRead;
use tracing::trace;

use crate::cursor::ByteCursor;
use crate::token::{Token, TokenKind};

/// Prefixes a reply may start with.
pub const REPLY_PREFIXES: &[u8] = b"-:;+$*";

/// Prefixes an array element may start with.
pub const ELEMENT_PREFIXES: &[u8] = b":;+$";

#[derive(Debug, PartialEq, Diagnostic, Error)]
pub enum LexerError {
  #[error("(At [{position}]): Unexpected end of input")]
  #[diagnostic(
    code(corkscrew::unexpected_end_of_input),
    help("the server closed the connection before the reply was complete")
  )]
  UnexpectedEndOfInput { position: usize },

  #[error("(At [{position}]): Expected {}; found {}", expected_list(.expected), quoted(.found))]
  #[diagnostic(code(corkscrew::unexpected_prefix))]
  UnexpectedPrefix {
    position: usize,
    found: u8,
    expected: &'static [u8],
  },

  #[error("(At [{position}]): {reason}")]
  #[diagnostic(
    code(corkscrew::malformed_simple_string),
    help("simple strings can't contain \\r or \\n and must end with \\r\\n")
  )]
  MalformedSimpleString {
    position: usize,
    reason: &'static str,
  },

  #[error("(At [{position}]): {reason}")]
  #[diagnostic(
    code(corkscrew::malformed_bulk_string),
    help("bulk strings are sent as $<length>\\r\\n<bytes>\\r\\n")
  )]
  MalformedBulkString { position: usize, reason: String },

  #[error("(At [{position}]): Invalid Integer {lexeme:?}")]
  #[diagnostic(code(corkscrew::invalid_integer))]
  InvalidInteger { position: usize, lexeme: String },

  #[error("(At [{position}]): Invalid Float {lexeme:?}")]
  #[diagnostic(code(corkscrew::invalid_float))]
  InvalidFloat { position: usize, lexeme: String },

  #[error("(At [{position}]): {message}")]
  #[diagnostic(code(corkscrew::transport))]
  Transport {
    position: usize,
    kind: io::ErrorKind,
    message: String,
  },
}

/// Broad categories of [`LexerError`], for callers deciding whether the
/// session can go on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
  EndOfStream,
  Transport,
  Framing,
  Parse,
}

impl LexerError {
  /// The number of bytes consumed when the error was detected.
  pub fn position(&self) -> usize {
    match self {
      LexerError::UnexpectedEndOfInput { position }
      | LexerError::UnexpectedPrefix { position, .. }
      | LexerError::MalformedSimpleString { position, .. }
      | LexerError::MalformedBulkString { position, .. }
      | LexerError::InvalidInteger { position, .. }
      | LexerError::InvalidFloat { position, .. }
      | LexerError::Transport { position, .. } => *position,
    }
  }

  pub fn kind(&self) -> ErrorKind {
    match self {
      LexerError::UnexpectedEndOfInput { .. } => ErrorKind::EndOfStream,
      LexerError::Transport { .. } => ErrorKind::Transport,
      LexerError::UnexpectedPrefix { .. }
      | LexerError::MalformedSimpleString { .. }
      | LexerError::MalformedBulkString { .. } => ErrorKind::Framing,
      LexerError::InvalidInteger { .. } | LexerError::InvalidFloat { .. } => ErrorKind::Parse,
    }
  }

  /// Returns true when the stream ended or the peer dropped the connection.
  pub fn is_disconnect(&self) -> bool {
    match self {
      LexerError::UnexpectedEndOfInput { .. } => true,
      LexerError::Transport { kind, .. } => is_disconnect(*kind),
      _ => false,
    }
  }
}

pub fn is_disconnect(kind: io::ErrorKind) -> bool {
  matches!(
    kind,
    io::ErrorKind::BrokenPipe
      | io::ErrorKind::ConnectionReset
      | io::ErrorKind::ConnectionAborted
      | io::ErrorKind::UnexpectedEof
  )
}

fn quoted(byte: &u8) -> String {
  format!("'{}'", char::from(*byte).escape_default())
}

fn expected_list(expected: &[u8]) -> String {
  expected.iter().map(quoted).collect::<Vec<_>>().join(", ")
}

/// A reply that could not be lexed.
///
/// `tokens` holds the array elements lexed before the error.
#[derive(Debug, PartialEq, Error)]
#[error("{error}")]
pub struct DecodeError {
  pub tokens: Vec<Token>,
  pub error: LexerError,
}

impl From<LexerError> for DecodeError {
  fn from(error: LexerError) -> Self {
    Self {
      tokens: Vec::new(),
      error,
    }
  }
}

#[derive(Debug)]
struct Lexer<'a, R> {
  cursor: ByteCursor<'a, R>,
}

impl<'a, R> Lexer<'a, R>
where
  R: AsyncRead + Unpin,
{
  fn new(reader: &'a mut R) -> Self {
    Self {
      cursor: ByteCursor::new(reader),
    }
  }

  fn unexpected_prefix(&self, found: u8, expected: &'static [u8]) -> LexerError {
    LexerError::UnexpectedPrefix {
      position: self.cursor.position(),
      found,
      expected,
    }
  }

  async fn reply(&mut self) -> Result<Vec<Token>, DecodeError> {
    let prefix = self.cursor.next().await?;

    trace!(prefix = %char::from(prefix), "lexing reply");

    let token = match prefix {
      b'-' => self.error().await,
      b':' => self.integer().await,
      b';' => self.float().await,
      b'+' => self.simple_string().await,
      b'$' => self.bulk_string().await,
      b'*' => return self.array().await,
      found => Err(self.unexpected_prefix(found, REPLY_PREFIXES)),
    }?;

    Ok(vec![token])
  }

  async fn element(&mut self) -> Result<Token, LexerError> {
    let prefix = self.cursor.next().await?;

    trace!(prefix = %char::from(prefix), "lexing array element");

    match prefix {
      b':' => self.integer().await,
      b';' => self.float().await,
      b'+' => self.simple_string().await,
      b'$' => self.bulk_string().await,
      // Nested arrays end up here. Supporting them means recursing into
      // `array` from a `b'*'` arm and deciding how to shape the result.
      found => Err(self.unexpected_prefix(found, ELEMENT_PREFIXES)),
    }
  }

  async fn array(&mut self) -> Result<Vec<Token>, DecodeError> {
    let length = self.read_integer().await?;

    let mut tokens = Vec::new();

    // A negative length reads no elements.
    for _ in 0..length {
      match self.element().await {
        Ok(token) => tokens.push(token),
        Err(error) => return Err(DecodeError { tokens, error }),
      }
    }

    Ok(tokens)
  }

  /// Reads bytes up to the next "\r\n", which is consumed but not returned.
  async fn line(&mut self) -> Result<Vec<u8>, LexerError> {
    let mut value = Vec::new();

    loop {
      match self.cursor.next().await? {
        b'\r' => {
          return match self.cursor.next().await {
            Ok(b'\n') => Ok(value),
            Ok(_) | Err(LexerError::UnexpectedEndOfInput { .. }) => {
              Err(LexerError::MalformedSimpleString {
                position: self.cursor.position(),
                reason: "Simple string must end with \\r\\n",
              })
            }
            Err(error) => Err(error),
          };
        }
        b'\n' => {
          return Err(LexerError::MalformedSimpleString {
            position: self.cursor.position(),
            reason: "Invalid line feed in simple string",
          })
        }
        byte => value.push(byte),
      }
    }
  }

  async fn simple_string(&mut self) -> Result<Token, LexerError> {
    let value = self.line().await?;

    Ok(Token::new(TokenKind::SimpleString, value))
  }

  async fn error(&mut self) -> Result<Token, LexerError> {
    let value = self.line().await?;

    Ok(Token::new(TokenKind::Error, value))
  }

  async fn read_integer(&mut self) -> Result<i64, LexerError> {
    let lexeme = self.line().await?;

    parse_lexeme(&lexeme).ok_or_else(|| LexerError::InvalidInteger {
      position: self.cursor.position(),
      lexeme: String::from_utf8_lossy(&lexeme).into_owned(),
    })
  }

  async fn integer(&mut self) -> Result<Token, LexerError> {
    let integer = self.read_integer().await?;

    Ok(Token::integer(integer))
  }

  async fn float(&mut self) -> Result<Token, LexerError> {
    let lexeme = self.line().await?;

    let float = parse_lexeme::<f64>(&lexeme).ok_or_else(|| LexerError::InvalidFloat {
      position: self.cursor.position(),
      lexeme: String::from_utf8_lossy(&lexeme).into_owned(),
    })?;

    Ok(Token::float(float))
  }

  async fn bulk_string(&mut self) -> Result<Token, LexerError> {
    let declared_length = self.read_integer().await?;

    let invalid_length = |position| LexerError::MalformedBulkString {
      position,
      reason: format!("Invalid bulk string of length {}", declared_length),
    };

    let length =
      usize::try_from(declared_length).map_err(|_| invalid_length(self.cursor.position()))?;

    let mut value = Vec::with_capacity(length.min(4096));

    for _ in 0..length {
      match self.cursor.next().await {
        Ok(byte) => value.push(byte),
        Err(LexerError::UnexpectedEndOfInput { position }) => return Err(invalid_length(position)),
        Err(error) => return Err(error),
      }
    }

    for terminator in [b'\r', b'\n'] {
      match self.cursor.next().await {
        Ok(byte) if byte == terminator => {}
        Ok(_) | Err(LexerError::UnexpectedEndOfInput { .. }) => {
          return Err(LexerError::MalformedBulkString {
            position: self.cursor.position(),
            reason: String::from("Bulk string must end with \\r\\n"),
          })
        }
        Err(error) => return Err(error),
      }
    }

    Ok(Token::new(TokenKind::BulkString, value))
  }
}

fn parse_lexeme<T: std::str::FromStr>(lexeme: &[u8]) -> Option<T> {
  std::str::from_utf8(lexeme).ok()?.parse().ok()
}

/// Lexes one reply from `reader`.
///
/// Bytes are consumed one at a time, so nothing past the end of the reply
/// is read. On error, the bytes read so far stay consumed.
pub async fn lex<R>(reader: &mut R) -> Result<Vec<Token>, DecodeError>
where
  R: AsyncRead + Unpin,
{
  Lexer::new(reader).reply().await
}
