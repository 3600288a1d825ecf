use std::io::ErrorKind;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::lexer::LexerError;

/// Reads a stream one byte at a time, keeping track of how many bytes
/// were consumed so errors can point at where they happened.
#[derive(Debug)]
pub struct ByteCursor<'a, R> {
  /// Number of bytes consumed so far.
  position: usize,
  reader: &'a mut R,
}

impl<'a, R> ByteCursor<'a, R>
where
  R: AsyncRead + Unpin,
{
  pub fn new(reader: &'a mut R) -> Self {
    Self {
      position: 0,
      reader,
    }
  }

  pub fn position(&self) -> usize {
    self.position
  }

  /// Returns the next byte of the stream.
  ///
  /// The position is only advanced when a byte was actually read.
  pub async fn next(&mut self) -> Result<u8, LexerError> {
    match self.reader.read_u8().await {
      Ok(byte) => {
        self.position += 1;
        Ok(byte)
      }
      Err(error) if error.kind() == ErrorKind::UnexpectedEof => {
        Err(LexerError::UnexpectedEndOfInput {
          position: self.position,
        })
      }
      Err(error) => Err(LexerError::Transport {
        position: self.position,
        kind: error.kind(),
        message: error.to_string(),
      }),
    }
  }
}
