/// The interactive loop: one command per line, one reply per command.
use std::io;

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt};
use tracing::{info_span, warn};
use tracing_futures::Instrument;

use crate::client::{Client, ClientError};
use crate::command::Command;
use crate::token::{self, Token};

pub const PROMPT: &str = "Command> ";

pub const LOST_CONNECTION: &str = "Lost connection to server...";

/// Reads one line without its terminator.
///
/// Returns `None` once `input` is exhausted.
async fn read_line<I>(input: &mut I) -> io::Result<Option<Vec<u8>>>
where
  I: AsyncBufRead + Unpin,
{
  let mut line = Vec::new();

  if input.read_until(b'\n', &mut line).await? == 0 {
    return Ok(None);
  }

  if line.last() == Some(&b'\n') {
    line.pop();
  }
  if line.last() == Some(&b'\r') {
    line.pop();
  }

  Ok(Some(line))
}

async fn write_line<O>(output: &mut O, text: &str) -> io::Result<()>
where
  O: AsyncWrite + Unpin,
{
  output.write_all(text.as_bytes()).await?;
  output.write_all(b"\n").await
}

/// Runs commands read from `input` until the user quits, `input` ends or
/// the connection is lost. Replies and errors are written to `output`.
pub async fn run<S, I, O>(client: &mut Client<S>, input: &mut I, output: &mut O) -> io::Result<()>
where
  S: AsyncRead + AsyncWrite + Unpin,
  I: AsyncBufRead + Unpin,
  O: AsyncWrite + Unpin,
{
  loop {
    output.write_all(PROMPT.as_bytes()).await?;
    output.flush().await?;

    let line = match read_line(input).await? {
      Some(line) => line,
      None => return Ok(()),
    };

    let line = match String::from_utf8(line) {
      Ok(line) => line,
      Err(error) => {
        warn!(%error, "skipping input line");
        write_line(output, &format!("Invalid input: {}", error)).await?;
        continue;
      }
    };

    let command = Command::parse(&line);

    if command.is_empty() {
      continue;
    }

    let result = client
      .send(&command)
      .instrument(info_span!("command", line = %line))
      .await;

    match result {
      Ok(reply) => {
        write_line(output, &token::render(&reply)).await?;

        if command.is_quit() && reply.first().map_or(false, Token::is_ok) {
          return Ok(());
        }
      }
      Err(error) if error.is_connection_lost() => {
        write_line(output, LOST_CONNECTION).await?;
        return Ok(());
      }
      Err(ClientError::Decode(error)) => {
        warn!(
          position = error.error.position(),
          kind = ?error.error.kind(),
          "malformed reply"
        );

        if !error.tokens.is_empty() {
          write_line(output, &token::render(&error.tokens)).await?;
        }
        write_line(output, &error.to_string()).await?;
      }
      Err(error) => {
        warn!(%error, "command failed");
        write_line(output, &error.to_string()).await?;
      }
    }
  }
}
