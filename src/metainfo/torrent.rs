use std::collections::BTreeMap;
use std::path::Path;

use bytes::Bytes;

use super::error::MetainfoError;
use super::info_hash::InfoHash;
use crate::bencode::{decode, encode, Value};

/// Everything a `.torrent` file declares, in typed form.
///
/// # Examples
///
/// ```no_run
/// use btget::metainfo::Metainfo;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let metainfo = Metainfo::from_file("example.torrent")?;
///
/// println!(
///     "{} ({} bytes) via {}, hash {}",
///     metainfo.info.name, metainfo.info.length, metainfo.announce, metainfo.info_hash,
/// );
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct Metainfo {
    /// Tracker announce URL.
    pub announce: String,
    /// File name, size, and piece hashes.
    pub info: Info,
    /// SHA1 of the canonical `info` bytes; identifies the torrent on
    /// trackers and peers.
    pub info_hash: InfoHash,
    raw_info: Bytes,
}

/// The info dictionary from a single-file torrent.
///
/// The SHA1 hash of this dictionary (in canonical bencode form) is the
/// info hash.
#[derive(Debug, Clone)]
pub struct Info {
    /// Suggested name for the downloaded file.
    pub name: String,
    /// Total file size in bytes.
    pub length: u64,
    /// Number of bytes per piece (except possibly the last).
    pub piece_length: u64,
    /// Concatenated 20-byte SHA1 hashes, one per piece.
    pub pieces: Bytes,
}

impl Metainfo {
    /// Projects raw `.torrent` bytes onto the typed record.
    ///
    /// The info hash is computed here by re-encoding the parsed `info`
    /// sub-tree canonically, so it does not depend on the key order of the
    /// source file.
    ///
    /// # Errors
    ///
    /// Fails when the data is not valid bencode, when a required field is
    /// missing or has the wrong type, or when the `pieces` length is not a
    /// multiple of 20.
    pub fn from_bytes(data: &[u8]) -> Result<Self, MetainfoError> {
        let root = decode(data)?;
        if root.as_dict().is_none() {
            return Err(MetainfoError::InvalidField("root"));
        }

        let announce = required(&root, "announce")?
            .as_str()
            .ok_or(MetainfoError::InvalidField("announce"))?
            .to_string();

        let info_value = required(&root, "info")?;
        let raw_info = Bytes::from(encode(info_value)?);

        Ok(Self {
            announce,
            info: parse_info(info_value)?,
            info_hash: InfoHash::from_info_bytes(&raw_info),
            raw_info,
        })
    }

    /// Reads and parses a torrent file from disk.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, MetainfoError> {
        let data = std::fs::read(path)?;
        Self::from_bytes(&data)
    }

    /// Returns the raw canonical bencoding of the info dictionary.
    ///
    /// These are the exact bytes the info hash was computed over.
    pub fn raw_info(&self) -> &Bytes {
        &self.raw_info
    }
}

impl Info {
    /// Returns the number of pieces in the torrent.
    pub fn piece_count(&self) -> usize {
        self.pieces.len() / 20
    }

    /// Returns the length in bytes of the piece at `index`.
    ///
    /// All pieces have `piece_length` bytes except the last, which holds
    /// whatever remains of the file. Returns `None` for an out-of-range
    /// index.
    ///
    /// # Examples
    ///
    /// ```
    /// use bytes::Bytes;
    /// use btget::metainfo::Info;
    ///
    /// let info = Info {
    ///     name: "sample".into(),
    ///     length: 92063,
    ///     piece_length: 32768,
    ///     pieces: Bytes::from(vec![0u8; 60]),
    /// };
    /// assert_eq!(info.piece_count(), 3);
    /// assert_eq!(info.piece_length_of(0), Some(32768));
    /// assert_eq!(info.piece_length_of(2), Some(26527));
    /// assert_eq!(info.piece_length_of(3), None);
    /// ```
    pub fn piece_length_of(&self, index: usize) -> Option<u64> {
        let count = self.piece_count();
        if index >= count {
            return None;
        }
        if index + 1 == count {
            Some(self.length - self.piece_length * (count as u64 - 1))
        } else {
            Some(self.piece_length)
        }
    }

    /// Returns the expected SHA1 hash of the piece at `index`.
    pub fn piece_hash(&self, index: usize) -> Option<[u8; 20]> {
        let start = index.checked_mul(20)?;
        let window = self.pieces.get(start..start + 20)?;
        let mut hash = [0u8; 20];
        hash.copy_from_slice(window);
        Some(hash)
    }

    /// Iterates over the 20-byte piece hash windows in order.
    pub fn piece_hashes(&self) -> impl Iterator<Item = &[u8]> {
        self.pieces.chunks_exact(20)
    }

    /// Projects this record back onto a bencode dictionary.
    ///
    /// The dictionary uses the canonical metainfo field names; for a
    /// single-file torrent whose source `info` dictionary contained only
    /// these fields, encoding it reproduces the parsed bytes exactly.
    pub fn to_value(&self) -> Value {
        let mut dict = BTreeMap::new();
        dict.insert(
            Bytes::from_static(b"length"),
            Value::Integer(self.length as i64),
        );
        dict.insert(Bytes::from_static(b"name"), Value::string(&self.name));
        dict.insert(
            Bytes::from_static(b"piece length"),
            Value::Integer(self.piece_length as i64),
        );
        dict.insert(
            Bytes::from_static(b"pieces"),
            Value::Bytes(self.pieces.clone()),
        );
        Value::Dict(dict)
    }
}

// Dictionary lookup that turns an absent key into `MissingField`.
fn required<'a>(dict: &'a Value, key: &'static str) -> Result<&'a Value, MetainfoError> {
    dict.get(key.as_bytes())
        .ok_or(MetainfoError::MissingField(key))
}

fn parse_info(value: &Value) -> Result<Info, MetainfoError> {
    if value.as_dict().is_none() {
        return Err(MetainfoError::InvalidField("info"));
    }

    let name = required(value, "name")?
        .as_str()
        .ok_or(MetainfoError::InvalidField("name"))?
        .to_string();

    let length = required(value, "length")?
        .as_integer()
        .ok_or(MetainfoError::InvalidField("length"))?;
    if length < 0 {
        return Err(MetainfoError::InvalidField("length"));
    }

    let piece_length = required(value, "piece length")?
        .as_integer()
        .ok_or(MetainfoError::InvalidField("piece length"))?;
    if piece_length <= 0 {
        return Err(MetainfoError::InvalidField("piece length"));
    }

    let pieces = required(value, "pieces")?
        .as_bytes()
        .ok_or(MetainfoError::InvalidField("pieces"))?
        .clone();

    if pieces.len() % 20 != 0 {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    // the hash count must agree with the piece arithmetic
    let expected = (length as u64).div_ceil(piece_length as u64) as usize;
    if pieces.len() / 20 != expected {
        return Err(MetainfoError::InvalidField("pieces"));
    }

    Ok(Info {
        name,
        length: length as u64,
        piece_length: piece_length as u64,
        pieces,
    })
}
