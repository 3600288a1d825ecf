/// Turning a line typed by the user into a request.
///
/// A client sends the server a RESP Array consisting of just Bulk Strings,
/// whatever the semantic type of each argument is:
///
/// ```terminal
/// Command> SET key "hello world"
/// "*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$11\r\nhello world\r\n"
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Command {
  tokens: Vec<String>,
}

/// Splits a line into tokens.
#[derive(Debug)]
struct Tokenizer<'a> {
  /// The current position we are looking at in `input`.
  position: usize,
  input: &'a str,
}

impl<'a> Tokenizer<'a> {
  fn new(input: &'a str) -> Self {
    Self { input, position: 0 }
  }

  fn bytes(&self) -> &'a [u8] {
    self.input.as_bytes()
  }

  fn skip_whitespace(&mut self) {
    while self.position < self.input.len() && is_whitespace(self.bytes()[self.position]) {
      self.position += 1;
    }
  }

  /// Returns the position one past the closing quote when `position` is
  /// looking at a quote that has a matching quote later in the line.
  ///
  /// The closing quote is the last one in the line.
  fn quoted_end(&self) -> Option<usize> {
    let rest = &self.bytes()[self.position..];

    if rest.first() != Some(&b'"') {
      return None;
    }

    match rest.iter().rposition(|&byte| byte == b'"') {
      Some(0) | None => None,
      Some(last) => Some(self.position + last + 1),
    }
  }

  fn word_end(&self) -> usize {
    self.bytes()[self.position..]
      .iter()
      .position(|&byte| is_whitespace(byte))
      .map_or(self.input.len(), |offset| self.position + offset)
  }

  fn next_token(&mut self) -> Option<&'a str> {
    self.skip_whitespace();

    if self.position >= self.input.len() {
      return None;
    }

    let token_starts_at = self.position;
    self.position = self.quoted_end().unwrap_or_else(|| self.word_end());

    // Token boundaries are always ASCII bytes, so slicing stays on char boundaries.
    Some(&self.input[token_starts_at..self.position])
  }
}

impl<'a> Iterator for Tokenizer<'a> {
  type Item = &'a str;

  fn next(&mut self) -> Option<Self::Item> {
    self.next_token()
  }
}

fn is_whitespace(byte: u8) -> bool {
  matches!(byte, b' ' | b'\t' | b'\n' | b'\x0C' | b'\r')
}

/// Writes `<prefix><length>\r\n`.
fn write_header(buffer: &mut Vec<u8>, prefix: u8, length: usize) {
  buffer.push(prefix);
  buffer.extend_from_slice(length.to_string().as_bytes());
  buffer.extend_from_slice(b"\r\n");
}

/// Removes one pair of surrounding double quotes.
fn unquote(token: &str) -> &str {
  if token.len() > 1 && token.starts_with('"') && token.ends_with('"') {
    &token[1..token.len() - 1]
  } else {
    token
  }
}

impl Command {
  pub fn parse(line: &str) -> Self {
    Self {
      tokens: Tokenizer::new(line).map(String::from).collect(),
    }
  }

  pub fn tokens(&self) -> &[String] {
    &self.tokens
  }

  pub fn is_empty(&self) -> bool {
    self.tokens.is_empty()
  }

  /// Returns true when the command is a bare QUIT, in any case.
  pub fn is_quit(&self) -> bool {
    match self.tokens.as_slice() {
      [token] => token.eq_ignore_ascii_case("QUIT"),
      _ => false,
    }
  }

  /// Encodes the command as a RESP Array of Bulk Strings.
  ///
  /// Returns an empty buffer when there is nothing to send.
  pub fn encode(&self) -> Vec<u8> {
    let mut buffer = Vec::new();

    if self.tokens.is_empty() {
      return buffer;
    }

    write_header(&mut buffer, b'*', self.tokens.len());

    for token in &self.tokens {
      let token = unquote(token);
      write_header(&mut buffer, b'$', token.len());
      buffer.extend_from_slice(token.as_bytes());
      buffer.extend_from_slice(b"\r\n");
    }

    buffer
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn tokens(line: &str) -> Vec<String> {
    Command::parse(line).tokens().to_vec()
  }

  fn command(tokens: &[&str]) -> Command {
    Command {
      tokens: tokens.iter().map(|token| token.to_string()).collect(),
    }
  }

  #[test]
  fn empty_lines_have_no_tokens() {
    let tests = vec!["", "   ", "\t \t", " \r "];

    for input in tests {
      assert!(Command::parse(input).is_empty(), "{:?}", input);
    }
  }

  #[test]
  fn tokenize() {
    let tests = vec![
      ("GET key", vec!["GET", "key"]),
      ("  LLEN   mylist  ", vec!["LLEN", "mylist"]),
      (r#"SET key "hello world""#, vec!["SET", "key", r#""hello world""#]),
      (r#"ECHO """#, vec!["ECHO", r#""""#]),
      (r#"SET "a" "b""#, vec!["SET", r#""a" "b""#]),
      (r#"SET a"b c""#, vec!["SET", r#"a"b"#, r#"c""#]),
      (r#"ECHO "unterminated word"#, vec!["ECHO", r#""unterminated"#, "word"]),
      ("SET clé valeur", vec!["SET", "clé", "valeur"]),
    ];

    for (input, expected) in tests {
      assert_eq!(expected, tokens(input), "{:?}", input);
    }
  }

  #[test]
  fn test_encode() {
    let tests = vec![
      (
        command(&["SET", "key", "value"]),
        "*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$5\r\nvalue\r\n",
      ),
      (command(&["ECHO", r#""a b""#]), "*2\r\n$4\r\nECHO\r\n$3\r\na b\r\n"),
      (command(&["ECHO", r#""""#]), "*2\r\n$4\r\nECHO\r\n$0\r\n\r\n"),
      (command(&["ECHO", r#"""#]), "*2\r\n$4\r\nECHO\r\n$1\r\n\"\r\n"),
      (command(&["ECHO", "clé"]), "*2\r\n$4\r\nECHO\r\n$4\r\nclé\r\n"),
      (
        Command::parse(r#"SET key "hello world""#),
        "*3\r\n$3\r\nSET\r\n$3\r\nkey\r\n$11\r\nhello world\r\n",
      ),
    ];

    for (input, expected) in tests {
      assert_eq!(expected.as_bytes(), input.encode().as_slice());
    }
  }

  #[test]
  fn headers_carry_multi_digit_lengths() {
    let value = "x".repeat(12);
    let encoded = command(&["ECHO", &value]).encode();

    assert!(encoded.starts_with(b"*2\r\n$4\r\nECHO\r\n$12\r\n"));
    assert!(encoded.ends_with(b"xxxxxxxxxxxx\r\n"));
  }

  #[test]
  fn empty_command_encodes_to_nothing() {
    assert!(Command::parse("").encode().is_empty());
    assert!(Command::parse("    ").encode().is_empty());
  }

  #[test]
  fn test_is_quit() {
    let tests = vec![
      ("quit", true),
      ("QUIT", true),
      ("Quit", true),
      ("  quit  ", true),
      ("quit extra", false),
      (r#""quit""#, false),
      ("quitter", false),
      ("GET quit", false),
      ("", false),
    ];

    for (input, expected) in tests {
      assert_eq!(expected, Command::parse(input).is_quit(), "{:?}", input);
    }
  }
}
