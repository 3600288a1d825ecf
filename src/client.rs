/// Sending commands to a server.
///
/// How the interaction between the client and the server works:
///
/// A client sends the server a RESP Array consisting of just Bulk Strings.
/// The server replies with any valid RESP data type, and the client waits
/// for the whole reply before sending the next command.
///
/// # Examples
///
/// ```terminal
/// client: "*2\r\n$4\r\nLLEN\r\n$6\r\nmylist\r\n" -- the request
/// server: ":48293\r\n"                          -- the reply
/// ```
use std::io;

use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tracing::{debug, info};

use crate::command::Command;
use crate::lexer::{self, DecodeError};
use crate::token::Token;

#[derive(Debug, Error)]
pub enum ClientError {
  #[error("failed to send command: {0}")]
  Io(#[from] io::Error),
  #[error(transparent)]
  Decode(#[from] DecodeError),
}

impl ClientError {
  /// Returns true when the server went away.
  pub fn is_connection_lost(&self) -> bool {
    match self {
      ClientError::Io(error) => lexer::is_disconnect(error.kind()),
      ClientError::Decode(error) => error.error.is_disconnect(),
    }
  }
}

#[derive(Debug)]
pub struct Client<S> {
  /// Kept across commands so buffered bytes are never dropped between replies.
  stream: BufStream<S>,
}

impl Client<TcpStream> {
  pub async fn connect(address: &str) -> io::Result<Self> {
    info!(address, "connecting");

    let stream = TcpStream::connect(address).await?;

    info!(address, "connected");

    Ok(Self::new(stream))
  }
}

impl<S> Client<S>
where
  S: AsyncRead + AsyncWrite + Unpin,
{
  pub fn new(stream: S) -> Self {
    Self {
      stream: BufStream::new(stream),
    }
  }

  /// Sends `command` and waits for the reply.
  ///
  /// An empty command is not sent and gets an empty reply.
  pub async fn send(&mut self, command: &Command) -> Result<Vec<Token>, ClientError> {
    let encoded_command = command.encode();

    if encoded_command.is_empty() {
      return Ok(Vec::new());
    }

    debug!(tokens = ?command.tokens(), "encoding command");

    info!(
      "sending RESP command: {}",
      String::from_utf8_lossy(&encoded_command)
        .replace('\r', "\\r")
        .replace('\n', "\\n")
    );

    self.stream.write_all(&encoded_command).await?;
    self.stream.flush().await?;

    let reply = lexer::lex(&mut self.stream).await?;

    debug!(?reply, "reply");

    Ok(reply)
  }
}

#[cfg(test)]
mod tests {
  use tokio::io::{duplex, AsyncReadExt, DuplexStream};

  use super::*;
  use crate::lexer::LexerError;
  use crate::token::TokenKind;

  /// Reads exactly `request` from the client side, then writes `reply`.
  async fn serve(server: &mut DuplexStream, request: &str, reply: &str) {
    let mut buffer = vec![0; request.len()];
    server.read_exact(&mut buffer).await.unwrap();
    assert_eq!(request, String::from_utf8_lossy(&buffer));
    server.write_all(reply.as_bytes()).await.unwrap();
  }

  #[test_log::test(tokio::test)]
  async fn sends_command_and_lexes_reply() {
    let (client, mut server) = duplex(1024);
    let mut client = Client::new(client);

    let server = tokio::spawn(async move {
      serve(
        &mut server,
        "*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$11\r\nhello world\r\n",
        "+OK\r\n",
      )
      .await;
      serve(
        &mut server,
        "*2\r\n$6\r\nLRANGE\r\n$4\r\nlist\r\n",
        "*2\r\n$3\r\nfoo\r\n:5\r\n",
      )
      .await;
    });

    let reply = client
      .send(&Command::parse(r#"SET key "hello world""#))
      .await
      .unwrap();
    assert_eq!(vec![Token::new(TokenKind::SimpleString, "OK")], reply);

    let reply = client.send(&Command::parse("LRANGE list")).await.unwrap();
    assert_eq!(
      vec![
        Token::new(TokenKind::BulkString, "foo"),
        Token::integer(5)
      ],
      reply
    );

    server.await.unwrap();
  }

  #[tokio::test]
  async fn empty_command_is_not_sent() {
    let (client, server) = duplex(64);
    let mut client = Client::new(client);

    // Nothing is written, so no reply is awaited even though the server is gone.
    drop(server);

    assert_eq!(
      Vec::<Token>::new(),
      client.send(&Command::parse("   ")).await.unwrap()
    );
  }

  #[test_log::test(tokio::test)]
  async fn closed_connection_is_reported_as_lost() {
    let (client, mut server) = duplex(1024);
    let mut client = Client::new(client);

    let server = tokio::spawn(async move {
      serve(&mut server, "*1\r\n$4\r\nPING\r\n", "+PO").await;
    });

    let error = client.send(&Command::parse("PING")).await.unwrap_err();
    server.await.unwrap();

    assert!(error.is_connection_lost(), "{:?}", error);
  }

  #[tokio::test]
  async fn malformed_reply_keeps_the_session() {
    let (client, mut server) = duplex(1024);
    let mut client = Client::new(client);

    let server = tokio::spawn(async move {
      serve(&mut server, "*1\r\n$4\r\nPING\r\n", "&\r\n").await;
      server
    });

    let error = client.send(&Command::parse("PING")).await.unwrap_err();
    let _server = server.await.unwrap();

    assert!(!error.is_connection_lost(), "{:?}", error);
    assert!(matches!(error, ClientError::Decode(_)));
  }

  #[test]
  fn disconnects_end_the_session_on_either_path() {
    let transport = |kind| {
      ClientError::Decode(DecodeError::from(LexerError::Transport {
        position: 3,
        kind,
        message: String::from("transport"),
      }))
    };

    let tests = vec![
      (ClientError::Io(io::ErrorKind::ConnectionReset.into()), true),
      (ClientError::Io(io::ErrorKind::BrokenPipe.into()), true),
      (ClientError::Io(io::ErrorKind::PermissionDenied.into()), false),
      (transport(io::ErrorKind::ConnectionReset), true),
      (transport(io::ErrorKind::ConnectionAborted), true),
      (transport(io::ErrorKind::TimedOut), false),
      (
        ClientError::Decode(DecodeError::from(LexerError::UnexpectedEndOfInput {
          position: 0,
        })),
        true,
      ),
      (
        ClientError::Decode(DecodeError::from(LexerError::InvalidInteger {
          position: 4,
          lexeme: String::from("x"),
        })),
        false,
      ),
    ];

    for (error, expected) in tests {
      assert_eq!(expected, error.is_connection_lost(), "{:?}", error);
    }
  }
}
