use super::error::PeerError;
use bytes::{Buf, BufMut, Bytes, BytesMut};

/// Protocol string carried in every handshake.
pub const PROTOCOL: &[u8] = b"BitTorrent protocol";
/// Size of the fixed handshake layout.
pub const HANDSHAKE_LEN: usize = 68;

/// The one-byte message IDs of the peer wire protocol.
///
/// The ID follows the length prefix; only keep-alive frames omit it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum MessageId {
    /// Sender will not satisfy requests.
    Choke = 0,
    /// Sender will satisfy requests again.
    Unchoke = 1,
    /// Sender wants to download.
    Interested = 2,
    /// Sender no longer wants to download.
    NotInterested = 3,
    /// Sender acquired one more piece.
    Have = 4,
    /// Sender's complete piece availability.
    Bitfield = 5,
    /// Ask for a block.
    Request = 6,
    /// Deliver a block.
    Piece = 7,
    /// Withdraw an earlier request.
    Cancel = 8,
}

impl TryFrom<u8> for MessageId {
    type Error = PeerError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(MessageId::Choke),
            1 => Ok(MessageId::Unchoke),
            2 => Ok(MessageId::Interested),
            3 => Ok(MessageId::NotInterested),
            4 => Ok(MessageId::Have),
            5 => Ok(MessageId::Bitfield),
            6 => Ok(MessageId::Request),
            7 => Ok(MessageId::Piece),
            8 => Ok(MessageId::Cancel),
            _ => Err(PeerError::InvalidMessageId(value)),
        }
    }
}

/// The 68-byte handshake both sides exchange before any framed messages.
///
/// Fixed layout: a length byte (19), the protocol string
/// `"BitTorrent protocol"`, 8 reserved bytes, the 20-byte info hash, and
/// the sender's 20-byte peer ID. Agreement on the info hash is what the
/// exchange establishes.
#[derive(Debug, Clone)]
pub struct Handshake {
    /// Identifies the torrent being exchanged.
    pub info_hash: [u8; 20],
    /// Identifies the sending client.
    pub peer_id: [u8; 20],
    /// Reserved bytes (all zero; no extensions advertised).
    pub reserved: [u8; 8],
}

impl Handshake {
    /// Creates a new handshake with zeroed reserved bytes.
    pub fn new(info_hash: [u8; 20], peer_id: [u8; 20]) -> Self {
        Self {
            info_hash,
            peer_id,
            reserved: [0u8; 8],
        }
    }

    /// Encodes the handshake into its fixed 68-byte layout.
    pub fn encode(&self) -> [u8; HANDSHAKE_LEN] {
        let mut raw = [0u8; HANDSHAKE_LEN];
        raw[0] = PROTOCOL.len() as u8;
        raw[1..20].copy_from_slice(PROTOCOL);
        raw[20..28].copy_from_slice(&self.reserved);
        raw[28..48].copy_from_slice(&self.info_hash);
        raw[48..68].copy_from_slice(&self.peer_id);
        raw
    }

    pub fn decode(raw: &[u8]) -> Result<Self, PeerError> {
        if raw.len() != HANDSHAKE_LEN {
            return Err(PeerError::InvalidHandshake);
        }
        if raw[0] as usize != PROTOCOL.len() || &raw[1..20] != PROTOCOL {
            return Err(PeerError::InvalidHandshake);
        }

        fn field<const N: usize>(raw: &[u8], start: usize) -> Result<[u8; N], PeerError> {
            raw[start..start + N]
                .try_into()
                .map_err(|_| PeerError::InvalidHandshake)
        }

        Ok(Self {
            reserved: field(raw, 20)?,
            info_hash: field(raw, 28)?,
            peer_id: field(raw, 48)?,
        })
    }
}

/// One framed message on the peer wire.
///
/// On the wire every message is a 4-byte big-endian length, then the
/// [`MessageId`] byte, then the payload; a length of zero is the bare
/// keep-alive. Every multi-byte integer is big-endian.
///
/// # Examples
///
/// ```
/// use btget::peer::Message;
///
/// let request = Message::Request {
///     index: 2,
///     begin: 16384,
///     length: 16384,
/// };
///
/// // 17 bytes total: prefix (4) + id (1) + three u32 fields (12)
/// assert_eq!(request.encode().len(), 17);
/// ```
#[derive(Debug, Clone)]
pub enum Message {
    /// Zero-length frame; carries nothing.
    KeepAlive,
    /// The sender will not satisfy our requests.
    Choke,
    /// The sender will satisfy requests again.
    Unchoke,
    /// We want to download from the sender.
    Interested,
    /// We no longer want to download.
    NotInterested,
    /// The sender acquired piece `piece`.
    Have { piece: u32 },
    /// The sender's complete piece availability.
    Bitfield(Bytes),
    /// Ask for `length` bytes at `begin` within piece `index`.
    Request { index: u32, begin: u32, length: u32 },
    /// A delivered block; `data` is freed when the message drops.
    Piece { index: u32, begin: u32, data: Bytes },
    /// Withdraw the matching earlier request.
    Cancel { index: u32, begin: u32, length: u32 },
}

impl Message {
    /// Serializes the message into a complete frame, length prefix
    /// included.
    ///
    /// The payload is assembled first and the length prefix derived from
    /// it, so the two can never disagree.
    pub fn encode(&self) -> Bytes {
        let mut payload = BytesMut::new();

        match self {
            Message::KeepAlive => {}
            Message::Choke => payload.put_u8(MessageId::Choke as u8),
            Message::Unchoke => payload.put_u8(MessageId::Unchoke as u8),
            Message::Interested => payload.put_u8(MessageId::Interested as u8),
            Message::NotInterested => payload.put_u8(MessageId::NotInterested as u8),
            Message::Have { piece } => {
                payload.put_u8(MessageId::Have as u8);
                payload.put_u32(*piece);
            }
            Message::Bitfield(bits) => {
                payload.put_u8(MessageId::Bitfield as u8);
                payload.put_slice(bits);
            }
            Message::Request {
                index,
                begin,
                length,
            } => {
                payload.put_u8(MessageId::Request as u8);
                put_block_ref(&mut payload, *index, *begin, *length);
            }
            Message::Piece { index, begin, data } => {
                payload.put_u8(MessageId::Piece as u8);
                payload.put_u32(*index);
                payload.put_u32(*begin);
                payload.put_slice(data);
            }
            Message::Cancel {
                index,
                begin,
                length,
            } => {
                payload.put_u8(MessageId::Cancel as u8);
                put_block_ref(&mut payload, *index, *begin, *length);
            }
        }

        let mut frame = BytesMut::with_capacity(4 + payload.len());
        frame.put_u32(payload.len() as u32);
        frame.put_slice(&payload);
        frame.freeze()
    }

    /// Decodes one message from a complete frame (length prefix included).
    pub fn decode(mut frame: Bytes) -> Result<Self, PeerError> {
        if frame.len() < 4 {
            return Err(PeerError::InvalidMessage("missing length prefix".into()));
        }

        let length = frame.get_u32() as usize;
        if length == 0 {
            return Ok(Message::KeepAlive);
        }
        if frame.remaining() < length {
            return Err(PeerError::InvalidMessage("truncated frame".into()));
        }

        let mut payload = frame.split_to(length);
        match MessageId::try_from(payload.get_u8())? {
            MessageId::Choke => Ok(Message::Choke),
            MessageId::Unchoke => Ok(Message::Unchoke),
            MessageId::Interested => Ok(Message::Interested),
            MessageId::NotInterested => Ok(Message::NotInterested),
            MessageId::Have => Ok(Message::Have {
                piece: take_u32(&mut payload, "have")?,
            }),
            // whatever follows the ID byte is the bitfield
            MessageId::Bitfield => Ok(Message::Bitfield(payload)),
            MessageId::Request => {
                let (index, begin, length) = take_block_ref(&mut payload, "request")?;
                Ok(Message::Request {
                    index,
                    begin,
                    length,
                })
            }
            MessageId::Piece => {
                let index = take_u32(&mut payload, "piece")?;
                let begin = take_u32(&mut payload, "piece")?;
                // the rest of the payload is the block
                Ok(Message::Piece {
                    index,
                    begin,
                    data: payload,
                })
            }
            MessageId::Cancel => {
                let (index, begin, length) = take_block_ref(&mut payload, "cancel")?;
                Ok(Message::Cancel {
                    index,
                    begin,
                    length,
                })
            }
        }
    }

    /// Short name for diagnostics.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Message::KeepAlive => "keep-alive",
            Message::Choke => "choke",
            Message::Unchoke => "unchoke",
            Message::Interested => "interested",
            Message::NotInterested => "not_interested",
            Message::Have { .. } => "have",
            Message::Bitfield(_) => "bitfield",
            Message::Request { .. } => "request",
            Message::Piece { .. } => "piece",
            Message::Cancel { .. } => "cancel",
        }
    }
}

// index/begin/length triple shared by request and cancel.
fn put_block_ref(payload: &mut BytesMut, index: u32, begin: u32, length: u32) {
    payload.put_u32(index);
    payload.put_u32(begin);
    payload.put_u32(length);
}

fn take_block_ref(payload: &mut Bytes, what: &'static str) -> Result<(u32, u32, u32), PeerError> {
    Ok((
        take_u32(payload, what)?,
        take_u32(payload, what)?,
        take_u32(payload, what)?,
    ))
}

fn take_u32(payload: &mut Bytes, what: &'static str) -> Result<u32, PeerError> {
    if payload.remaining() < 4 {
        return Err(PeerError::InvalidMessage(format!(
            "{} payload too short",
            what
        )));
    }
    Ok(payload.get_u32())
}
