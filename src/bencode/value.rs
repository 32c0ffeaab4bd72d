use bytes::Bytes;
use std::collections::BTreeMap;

/// A decoded bencode value: one of the format's four kinds.
///
/// Byte strings are opaque bytes with no UTF-8 requirement. Dictionaries
/// live in a [`BTreeMap`] keyed by raw bytes, which makes iteration order
/// the ascending lexicographic key order the canonical encoding needs and
/// rules out duplicate keys by construction. The tree owns everything it
/// contains; dropping the root frees it all.
///
/// # Examples
///
/// ```
/// use btget::bencode::Value;
///
/// let announce = Value::string("http://example.com/announce");
/// assert_eq!(announce.as_str(), Some("http://example.com/announce"));
///
/// let port = Value::Integer(6881);
/// assert_eq!(port.as_integer(), Some(6881));
/// assert_eq!(port.as_str(), None);
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Value {
    /// `i...e`, a signed 64-bit number.
    Integer(i64),
    /// `<len>:...`, opaque bytes.
    Bytes(Bytes),
    /// `l...e`, values in order.
    List(Vec<Value>),
    /// `d...e`, byte-string keys mapped to values, held sorted.
    Dict(BTreeMap<Bytes, Value>),
}

impl Value {
    /// Byte-string value holding the UTF-8 bytes of `text`.
    pub fn string(text: &str) -> Self {
        Value::Bytes(Bytes::from(text.as_bytes().to_vec()))
    }

    /// The number inside, when this is an integer.
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(n) = self {
            Some(*n)
        } else {
            None
        }
    }

    /// The raw bytes inside, when this is a byte string.
    pub fn as_bytes(&self) -> Option<&Bytes> {
        if let Value::Bytes(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }

    /// The bytes inside as text, when this is a byte string holding valid
    /// UTF-8.
    pub fn as_str(&self) -> Option<&str> {
        std::str::from_utf8(self.as_bytes()?).ok()
    }

    /// The elements inside, when this is a list.
    pub fn as_list(&self) -> Option<&Vec<Value>> {
        if let Value::List(items) = self {
            Some(items)
        } else {
            None
        }
    }

    /// The entry map inside, when this is a dictionary.
    pub fn as_dict(&self) -> Option<&BTreeMap<Bytes, Value>> {
        if let Value::Dict(entries) = self {
            Some(entries)
        } else {
            None
        }
    }

    /// Dictionary lookup; `None` for a missing key or a non-dictionary.
    ///
    /// # Examples
    ///
    /// ```
    /// use btget::bencode::decode;
    ///
    /// let reply = decode(b"d8:intervali1800ee").unwrap();
    /// assert_eq!(reply.get(b"interval").and_then(|v| v.as_integer()), Some(1800));
    /// assert_eq!(reply.get(b"peers"), None);
    /// ```
    pub fn get(&self, key: &[u8]) -> Option<&Value> {
        match self {
            Value::Dict(entries) => entries.get(key),
            _ => None,
        }
    }

    /// Renders the value as JSON for display.
    ///
    /// Byte strings are converted with lossy UTF-8; dictionary keys keep
    /// their ascending order.
    ///
    /// # Examples
    ///
    /// ```
    /// use btget::bencode::decode;
    ///
    /// let value = decode(b"d3:bar4:spam3:fooi42ee").unwrap();
    /// assert_eq!(
    ///     value.to_json().to_string(),
    ///     r#"{"bar":"spam","foo":42}"#
    /// );
    /// ```
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Value::Integer(i) => serde_json::Value::from(*i),
            Value::Bytes(b) => {
                serde_json::Value::String(String::from_utf8_lossy(b).into_owned())
            }
            Value::List(l) => {
                serde_json::Value::Array(l.iter().map(Value::to_json).collect())
            }
            Value::Dict(d) => serde_json::Value::Object(
                d.iter()
                    .map(|(k, v)| (String::from_utf8_lossy(k).into_owned(), v.to_json()))
                    .collect(),
            ),
        }
    }
}
