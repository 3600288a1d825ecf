use clap::Parser;

pub const DEFAULT_HOST: &str = "127.0.0.1";
pub const DEFAULT_PORT: u16 = 6679;

/// Interactive client for RESP servers.
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "corkscrew", version)]
pub struct Config {
  /// Host the server is listening on.
  #[arg(default_value = DEFAULT_HOST)]
  pub host: String,

  /// Port the server is listening on.
  #[arg(default_value_t = DEFAULT_PORT)]
  pub port: u16,
}

impl Config {
  pub fn address(&self) -> String {
    format!("{}:{}", self.host, self.port)
  }
}
