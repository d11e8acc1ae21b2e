use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
  #[error("empty message")]
  Empty,
  #[error("unexpected end of message: needed {needed} bytes, {remaining} remaining")]
  UnexpectedEof { needed: usize, remaining: usize },
}

/// Growable big-endian message builder. `build` returns exactly the written bytes.
#[derive(Debug, Default)]
pub struct Writer {
  buffer: Vec<u8>,
}

impl Writer {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      buffer: Vec::with_capacity(capacity),
    }
  }

  pub fn build(self) -> Vec<u8> {
    self.buffer
  }

  pub fn write_u8(&mut self, value: u8) -> &mut Self {
    self.buffer.push(value);
    self
  }

  pub fn write_u16(&mut self, value: u16) -> &mut Self {
    self.buffer.extend_from_slice(&value.to_be_bytes());
    self
  }

  /// Writes the low 24 bits of `value`.
  pub fn write_u24(&mut self, value: u32) -> &mut Self {
    let bytes = value.to_be_bytes();
    self.buffer.extend_from_slice(&bytes[1..]);
    self
  }

  pub fn write_u32(&mut self, value: u32) -> &mut Self {
    self.buffer.extend_from_slice(&value.to_be_bytes());
    self
  }

  pub fn write_bytes(&mut self, value: &[u8]) -> &mut Self {
    self.buffer.extend_from_slice(value);
    self
  }

  pub fn write_str(&mut self, value: &str) -> &mut Self {
    self.write_bytes(value.as_bytes())
  }

  /// Length byte followed by at most 255 bytes of `value`.
  pub fn write_short_bytes(&mut self, value: &[u8]) -> &mut Self {
    let len = value.len().min(u8::MAX as usize);
    self.write_u8(len as u8);
    self.write_bytes(&value[..len])
  }

  /// Like `write_short_bytes`, but never splits a UTF-8 character.
  pub fn write_short_str(&mut self, value: &str) -> &mut Self {
    let mut end = value.len().min(u8::MAX as usize);
    while !value.is_char_boundary(end) {
      end = end.saturating_sub(1);
    }
    self.write_short_bytes(&value.as_bytes()[..end])
  }
}

#[derive(Debug)]
pub struct Reader<'a> {
  data: &'a [u8],
  offset: usize,
}

impl<'a> Reader<'a> {
  pub fn new(data: &'a [u8]) -> Self {
    Self { data, offset: 0 }
  }

  pub fn remaining(&self) -> usize {
    self.data.len() - self.offset
  }

  pub fn skip(&mut self, count: usize) -> Result<(), DecodeError> {
    self.take(count).map(|_| ())
  }

  pub fn read_u8(&mut self) -> Result<u8, DecodeError> {
    Ok(self.take(1)?[0])
  }

  pub fn read_u16(&mut self) -> Result<u16, DecodeError> {
    let bytes = self.take(2)?;
    Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
  }

  pub fn read_u24(&mut self) -> Result<u32, DecodeError> {
    let bytes = self.take(3)?;
    Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
  }

  pub fn read_bytes(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
    self.take(count)
  }

  pub fn read_rest(&mut self) -> &'a [u8] {
    let rest = &self.data[self.offset..];
    self.offset = self.data.len();
    rest
  }

  pub fn read_string(&mut self, count: usize) -> Result<String, DecodeError> {
    let bytes = self.take(count)?;
    Ok(String::from_utf8_lossy(bytes).into_owned())
  }

  fn take(&mut self, count: usize) -> Result<&'a [u8], DecodeError> {
    let remaining = self.remaining();
    if count > remaining {
      return Err(DecodeError::UnexpectedEof {
        needed: count,
        remaining,
      });
    }
    let slice = &self.data[self.offset..self.offset + count];
    self.offset += count;
    Ok(slice)
  }
}
