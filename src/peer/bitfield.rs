use bytes::Bytes;

/// Per-piece availability, as exchanged in `bitfield` messages.
///
/// Piece `i` maps to bit `7 - (i % 8)` of byte `i / 8`: the wire format
/// numbers pieces from the high bit of the first byte.
#[derive(Debug, Clone)]
pub struct Bitfield {
    bytes: Vec<u8>,
    pieces: usize,
}

// The single bit within its byte that stands for `index`.
fn bit(index: usize) -> u8 {
    0x80 >> (index % 8)
}

impl Bitfield {
    /// An all-zero bitfield sized for `pieces` pieces.
    pub fn new(pieces: usize) -> Self {
        Self {
            bytes: vec![0u8; pieces.div_ceil(8)],
            pieces,
        }
    }

    /// Builds availability from a `bitfield` message payload.
    ///
    /// Short payloads are padded with zeros; excess bytes and spare bits
    /// beyond the piece count are dropped.
    pub fn from_bytes(raw: Bytes, pieces: usize) -> Self {
        let mut bytes = vec![0u8; pieces.div_ceil(8)];
        let available = bytes.len().min(raw.len());
        bytes[..available].copy_from_slice(&raw[..available]);

        let used = pieces % 8;
        if used != 0 {
            if let Some(last) = bytes.last_mut() {
                // keep only the high `used` bits of the final byte
                *last &= !(0xFFu8 >> used);
            }
        }

        Self { bytes, pieces }
    }

    /// Whether the peer claims to have piece `index`.
    pub fn has_piece(&self, index: usize) -> bool {
        index < self.pieces && self.bytes[index / 8] & bit(index) != 0
    }

    /// Marks piece `index` as available.
    pub fn set_piece(&mut self, index: usize) {
        if index < self.pieces {
            self.bytes[index / 8] |= bit(index);
        }
    }

    /// How many pieces are available.
    pub fn count(&self) -> usize {
        (0..self.pieces).filter(|&i| self.has_piece(i)).count()
    }

    /// Whether every piece is available (the peer is a seeder).
    pub fn is_complete(&self) -> bool {
        self.count() == self.pieces
    }

    /// Total pieces this bitfield covers.
    pub fn piece_count(&self) -> usize {
        self.pieces
    }

    /// The underlying packed bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }
}
