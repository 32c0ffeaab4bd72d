use rand::Rng as _;
use std::fmt;

use crate::metainfo::hex_encode;

const PEER_ID_PREFIX: &[u8] = b"-BG0001-";

/// A 20-byte peer identifier.
///
/// Generated ids use the Azureus convention: a dash-delimited client
/// prefix followed by random bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub [u8; 20]);

impl PeerId {
    /// Generates a fresh peer id with a random suffix.
    pub fn generate() -> Self {
        let mut id = [0u8; 20];
        let (prefix, suffix) = id.split_at_mut(PEER_ID_PREFIX.len());
        prefix.copy_from_slice(PEER_ID_PREFIX);
        rand::rng().fill(suffix);
        Self(id)
    }

    /// Accepts exactly 20 bytes; anything else is `None`.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        bytes.try_into().ok().map(Self)
    }

    /// The raw 20-byte id.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Lowercase hexadecimal rendering, as printed by the CLI.
    pub fn to_hex(&self) -> String {
        hex_encode(&self.0)
    }
}

impl fmt::Debug for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PeerId({})", self.to_hex())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
