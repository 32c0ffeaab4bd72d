use std::collections::BTreeMap;
use std::io::Read;

use bytes::Bytes;

use super::error::BencodeError;
use super::value::Value;

const MAX_DEPTH: usize = 64;

/// Parses one complete bencode value out of a slice.
///
/// The slice must hold exactly that value: truncation surfaces as
/// [`BencodeError::UnexpectedEof`], leftover bytes as
/// [`BencodeError::TrailingData`], a bad leading byte as
/// [`BencodeError::InvalidToken`], and nesting past 64 levels as
/// [`BencodeError::NestingTooDeep`].
///
/// # Examples
///
/// ```
/// use btget::bencode::decode;
///
/// assert_eq!(decode(b"i52e").unwrap().as_integer(), Some(52));
/// assert_eq!(decode(b"5:hello").unwrap().as_str(), Some("hello"));
/// assert_eq!(decode(b"l5:helloi52ee").unwrap().as_list().unwrap().len(), 2);
/// ```
pub fn decode(data: &[u8]) -> Result<Value, BencodeError> {
    let mut parser = SliceParser::new(data);
    let value = parser.value(0)?;

    if !parser.at_end() {
        return Err(BencodeError::TrailingData);
    }

    Ok(value)
}

/// Decodes a single bencode value from a reader.
///
/// Unlike [`decode`], this consumes exactly one value and leaves any
/// following bytes unread, so several values can be pulled from the same
/// stream. A one-byte lookahead buffer is used to peek at variant tags and
/// terminators without consuming them; all parsed bytes are copied into
/// owned buffers, so the returned tree does not borrow from the reader.
///
/// # Examples
///
/// ```
/// use std::io::Cursor;
/// use btget::bencode::decode_from;
///
/// let mut cursor = Cursor::new(b"i42e4:spam".to_vec());
/// assert_eq!(decode_from(&mut cursor).unwrap().as_integer(), Some(42));
/// assert_eq!(decode_from(&mut cursor).unwrap().as_str(), Some("spam"));
/// ```
pub fn decode_from<R: Read>(reader: &mut R) -> Result<Value, BencodeError> {
    ByteReader::new(reader).value(0)
}

// Cursor over an in-memory slice. The grammar walk lives in `value` and
// the per-variant methods; `take_until` and `take` are the only places
// that touch the cursor.
struct SliceParser<'a> {
    input: &'a [u8],
    cursor: usize,
}

impl<'a> SliceParser<'a> {
    fn new(input: &'a [u8]) -> Self {
        Self { input, cursor: 0 }
    }

    fn at_end(&self) -> bool {
        self.cursor == self.input.len()
    }

    fn peek(&self) -> Result<u8, BencodeError> {
        self.input
            .get(self.cursor)
            .copied()
            .ok_or(BencodeError::UnexpectedEof)
    }

    fn bump(&mut self) -> Result<u8, BencodeError> {
        let byte = self.peek()?;
        self.cursor += 1;
        Ok(byte)
    }

    // Everything up to (not including) `stop`; consumes the stop byte.
    fn take_until(&mut self, stop: u8) -> Result<&'a [u8], BencodeError> {
        let start = self.cursor;
        while self.cursor < self.input.len() {
            if self.input[self.cursor] == stop {
                let body = &self.input[start..self.cursor];
                self.cursor += 1;
                return Ok(body);
            }
            self.cursor += 1;
        }
        Err(BencodeError::UnexpectedEof)
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], BencodeError> {
        if n > self.input.len() - self.cursor {
            return Err(BencodeError::UnexpectedEof);
        }
        let raw = &self.input[self.cursor..self.cursor + n];
        self.cursor += n;
        Ok(raw)
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep);
        }

        match self.peek()? {
            b'0'..=b'9' => Ok(Value::Bytes(self.byte_string()?)),
            b'i' => self.integer(),
            b'l' => self.list(depth),
            b'd' => self.dictionary(depth),
            other => Err(BencodeError::InvalidToken(other as char)),
        }
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        self.bump()?; // 'i'
        let body = self.take_until(b'e')?;
        Ok(Value::Integer(parse_integer_body(body)?))
    }

    fn byte_string(&mut self) -> Result<Bytes, BencodeError> {
        let digits = self.take_until(b':')?;
        let len = parse_length_prefix(digits)?;
        Ok(Bytes::copy_from_slice(self.take(len)?))
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.bump()?; // 'l'
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value(depth + 1)?);
        }
        self.bump()?; // 'e'
        Ok(Value::List(items))
    }

    fn dictionary(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.bump()?; // 'd'
        let mut entries = BTreeMap::new();
        loop {
            match self.peek()? {
                b'e' => {
                    self.bump()?;
                    return Ok(Value::Dict(entries));
                }
                b'0'..=b'9' => {
                    let key = self.byte_string()?;
                    let value = self.value(depth + 1)?;
                    entries.insert(key, value);
                }
                // dictionary keys must be byte strings
                other => return Err(BencodeError::InvalidToken(other as char)),
            }
        }
    }
}

/// Validates and parses the digits between `i` and `e`.
///
/// Rejects empty bodies, `-0`, and leading zeros on multi-digit numbers.
fn parse_integer_body(body: &[u8]) -> Result<i64, BencodeError> {
    let text = std::str::from_utf8(body)
        .map_err(|_| BencodeError::InvalidInteger("non-ascii digits".into()))?;

    if text.is_empty() || text == "-" {
        return Err(BencodeError::InvalidInteger("no digits".into()));
    }

    if text.starts_with("-0") || (text.starts_with('0') && text.len() > 1) {
        return Err(BencodeError::InvalidInteger("leading zero".into()));
    }

    text.parse()
        .map_err(|_| BencodeError::InvalidInteger(text.into()))
}

fn parse_length_prefix(digits: &[u8]) -> Result<usize, BencodeError> {
    let text = std::str::from_utf8(digits).map_err(|_| BencodeError::InvalidLength)?;
    text.parse().map_err(|_| BencodeError::InvalidLength)
}

// Streaming counterpart of `SliceParser`: the same grammar walk over any
// `Read` source, with a one-byte lookahead standing in for the cursor.
struct ByteReader<'a, R: Read> {
    inner: &'a mut R,
    peeked: Option<u8>,
}

impl<'a, R: Read> ByteReader<'a, R> {
    fn new(inner: &'a mut R) -> Self {
        Self {
            inner,
            peeked: None,
        }
    }

    fn peek(&mut self) -> Result<u8, BencodeError> {
        if let Some(byte) = self.peeked {
            return Ok(byte);
        }
        let byte = self.bump()?;
        self.peeked = Some(byte);
        Ok(byte)
    }

    fn bump(&mut self) -> Result<u8, BencodeError> {
        if let Some(byte) = self.peeked.take() {
            return Ok(byte);
        }
        let mut buf = [0u8; 1];
        self.inner.read_exact(&mut buf).map_err(map_read_error)?;
        Ok(buf[0])
    }

    fn take_until(&mut self, stop: u8) -> Result<Vec<u8>, BencodeError> {
        let mut body = Vec::new();
        loop {
            let byte = self.bump()?;
            if byte == stop {
                return Ok(body);
            }
            body.push(byte);
        }
    }

    fn take(&mut self, n: usize) -> Result<Vec<u8>, BencodeError> {
        let mut buf = vec![0u8; n];
        let mut filled = 0;
        if n > 0 {
            if let Some(byte) = self.peeked.take() {
                buf[0] = byte;
                filled = 1;
            }
        }
        self.inner
            .read_exact(&mut buf[filled..])
            .map_err(map_read_error)?;
        Ok(buf)
    }

    fn value(&mut self, depth: usize) -> Result<Value, BencodeError> {
        if depth > MAX_DEPTH {
            return Err(BencodeError::NestingTooDeep);
        }

        match self.peek()? {
            b'0'..=b'9' => Ok(Value::Bytes(self.byte_string()?)),
            b'i' => self.integer(),
            b'l' => self.list(depth),
            b'd' => self.dictionary(depth),
            other => Err(BencodeError::InvalidToken(other as char)),
        }
    }

    fn integer(&mut self) -> Result<Value, BencodeError> {
        self.bump()?; // 'i'
        let body = self.take_until(b'e')?;
        Ok(Value::Integer(parse_integer_body(&body)?))
    }

    fn byte_string(&mut self) -> Result<Bytes, BencodeError> {
        let digits = self.take_until(b':')?;
        let len = parse_length_prefix(&digits)?;
        Ok(Bytes::from(self.take(len)?))
    }

    fn list(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.bump()?; // 'l'
        let mut items = Vec::new();
        while self.peek()? != b'e' {
            items.push(self.value(depth + 1)?);
        }
        self.bump()?; // 'e'
        Ok(Value::List(items))
    }

    fn dictionary(&mut self, depth: usize) -> Result<Value, BencodeError> {
        self.bump()?; // 'd'
        let mut entries = BTreeMap::new();
        loop {
            match self.peek()? {
                b'e' => {
                    self.bump()?;
                    return Ok(Value::Dict(entries));
                }
                b'0'..=b'9' => {
                    let key = self.byte_string()?;
                    let value = self.value(depth + 1)?;
                    entries.insert(key, value);
                }
                // dictionary keys must be byte strings
                other => return Err(BencodeError::InvalidToken(other as char)),
            }
        }
    }
}

fn map_read_error(e: std::io::Error) -> BencodeError {
    if e.kind() == std::io::ErrorKind::UnexpectedEof {
        BencodeError::UnexpectedEof
    } else {
        BencodeError::Io(e)
    }
}
