use super::error::BencodeError;
use super::value::Value;
use std::io::Write;

/// Encodes a value to its canonical bencode form.
///
/// Dictionary entries are emitted in ascending key byte order regardless of
/// how they were inserted, integers in minimal decimal form, and byte
/// strings length-prefixed. Re-encoding a tree decoded from canonical input
/// reproduces the input byte-for-byte, which is what the info hash depends
/// on.
///
/// # Examples
///
/// ```
/// use btget::bencode::{decode, encode};
///
/// let input = b"d3:bar4:spam3:fooi42ee";
/// let value = decode(input).unwrap();
/// assert_eq!(encode(&value).unwrap(), input);
/// ```
pub fn encode(value: &Value) -> Result<Vec<u8>, BencodeError> {
    let mut out = Vec::new();
    encode_to(value, &mut out)?;
    Ok(out)
}

/// Writes the canonical bencoding of a value to a byte sink.
pub fn encode_to<W: Write>(value: &Value, sink: &mut W) -> Result<(), BencodeError> {
    match value {
        Value::Bytes(bytes) => put_string(bytes, sink)?,
        Value::Integer(n) => {
            sink.write_all(b"i")?;
            sink.write_all(n.to_string().as_bytes())?;
            sink.write_all(b"e")?;
        }
        Value::List(items) => {
            sink.write_all(b"l")?;
            for item in items {
                encode_to(item, sink)?;
            }
            sink.write_all(b"e")?;
        }
        Value::Dict(entries) => {
            sink.write_all(b"d")?;
            // BTreeMap iteration gives the required ascending key order
            for (key, item) in entries {
                put_string(key, sink)?;
                encode_to(item, sink)?;
            }
            sink.write_all(b"e")?;
        }
    }
    Ok(())
}

// `<decimal length>:<raw bytes>`, shared by byte strings and dictionary
// keys.
fn put_string<W: Write>(bytes: &[u8], sink: &mut W) -> Result<(), BencodeError> {
    sink.write_all(bytes.len().to_string().as_bytes())?;
    sink.write_all(b":")?;
    sink.write_all(bytes)?;
    Ok(())
}
