//! Input reader - splits a byte stream into signed 64-bit values.

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tracing::{debug, warn};

/// Longest token worth buffering. Anything longer cannot be an `i64`.
const MAX_TOKEN_LEN: usize = 32;

/// Reads whitespace-separated integers one at a time.
///
/// Tokens are split on ASCII whitespace at the byte level, so a value is
/// delivered as soon as the whitespace after it arrives. End of stream, the
/// first unparsable token, and read errors all end the input. Once ended, the
/// reader keeps returning `None`.
pub struct IntReader<R> {
  input: BufReader<R>,
  token: Vec<u8>,
  exhausted: bool,
}

impl<R: AsyncRead + Unpin> IntReader<R> {
  pub fn new(input: R) -> Self {
    Self {
      input: BufReader::new(input),
      token: Vec::with_capacity(MAX_TOKEN_LEN),
      exhausted: false,
    }
  }

  /// Read the next value, or `None` once input has ended.
  pub async fn next_value(&mut self) -> Option<i64> {
    if self.exhausted {
      return None;
    }

    match self.next_token().await {
      Ok(true) => {}
      Ok(false) => {
        debug!("End of input");
        self.exhausted = true;
        return None;
      }
      Err(e) => {
        warn!(error = %e, "Failed to read input, ending input");
        self.exhausted = true;
        return None;
      }
    }

    let value = std::str::from_utf8(&self.token).ok().and_then(|s| s.parse::<i64>().ok());
    if value.is_none() {
      debug!(token = %String::from_utf8_lossy(&self.token), "Unparsable token, ending input");
      self.exhausted = true;
    }
    value
  }

  /// Fill `self.token` with the next whitespace-delimited token.
  ///
  /// Returns false at end of stream with no token pending. A token longer than
  /// `MAX_TOKEN_LEN` is cut short there; it fails to parse either way.
  async fn next_token(&mut self) -> std::io::Result<bool> {
    self.token.clear();

    loop {
      let buf = self.input.fill_buf().await?;
      if buf.is_empty() {
        return Ok(!self.token.is_empty());
      }

      let mut used = 0;
      let mut complete = false;
      for &byte in buf {
        used += 1;
        if byte.is_ascii_whitespace() {
          if !self.token.is_empty() {
            complete = true;
            break;
          }
        } else {
          self.token.push(byte);
          if self.token.len() > MAX_TOKEN_LEN {
            complete = true;
            break;
          }
        }
      }
      self.input.consume(used);

      if complete {
        return Ok(true);
      }
    }
  }
}
