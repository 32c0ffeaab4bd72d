use std::fmt;

/// A torrent's info hash (20-byte SHA1).
///
/// The info hash identifies the torrent on trackers and peers. It is
/// computed over the canonical bencoding of the `info` dictionary, so it
/// is independent of the key order in the source file.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct InfoHash(pub [u8; 20]);

impl InfoHash {
    /// Creates an info hash from raw bytes.
    pub fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    /// Creates an info hash by hashing canonical info dictionary bytes.
    pub fn from_info_bytes(info_bytes: &[u8]) -> Self {
        use sha1::{Digest, Sha1};
        Self(Sha1::digest(info_bytes).into())
    }

    /// The raw 20-byte digest.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hex rendering, as the CLI prints it.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }

    /// Percent-encodes every byte (`%ab%cd...`) for the tracker announce
    /// query string.
    pub fn url_encode(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 3);
        for &byte in self.0.iter() {
            out.push('%');
            push_hex(&mut out, byte);
        }
        out
    }
}

impl fmt::Debug for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InfoHash({})", self.to_hex())
    }
}

impl fmt::Display for InfoHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 2);
    for &byte in bytes {
        push_hex(&mut out, byte);
    }
    out
}

fn push_hex(out: &mut String, byte: u8) {
    const DIGITS: &[u8; 16] = b"0123456789abcdef";
    out.push(DIGITS[(byte >> 4) as usize] as char);
    out.push(DIGITS[(byte & 0x0F) as usize] as char);
}
