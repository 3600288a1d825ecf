/// An interactive client for the Redis serialization protocol.
///
/// RESP protocol description
///
/// Clients send commands to a server as a RESP Array of Bulk Strings.
/// The server replies with one of the RESP types according to the command implementation.
///
/// In RESP, the type of some data depends on the first byte:
///
///     For Simple Strings the first byte of the reply is "+"
///     For Errors the first byte of the reply is "-"
///     For Integers the first byte of the reply is ":"
///     For Floats the first byte of the reply is ";"
///     For Bulk Strings the first byte of the reply is "$"
///     For Arrays the first byte of the reply is "*"
///
/// In RESP different parts of the protocol are always terminated with "\r\n" (CRLF).
mod client;
mod command;
mod config;
mod cursor;
mod lexer;
mod session;
mod token;

use clap::Parser;
use miette::{IntoDiagnostic, Result};
use tokio::io::BufReader;

use crate::client::Client;
use crate::config::Config;

#[tokio::main]
async fn main() -> Result<()> {
  std::env::set_var(
    "RUST_LOG",
    std::env::var("RUST_LOG").unwrap_or(String::from("corkscrew=warn")),
  );

  // Replies go to stdout, logs stay out of their way.
  tracing_subscriber::fmt()
    .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();

  let config = Config::parse();
  let address = config.address();

  println!("Connecting to {:?}...", address);

  let mut client = Client::connect(&address).await.into_diagnostic()?;

  let mut input = BufReader::new(tokio::io::stdin());
  let mut output = tokio::io::stdout();

  session::run(&mut client, &mut input, &mut output)
    .await
    .into_diagnostic()
}
