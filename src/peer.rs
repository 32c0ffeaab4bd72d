//! Peer wire protocol (BEP-3)
//!
//! This module implements the base peer wire protocol: the 68-byte
//! handshake, length-prefixed message framing, and a session type that
//! walks the choke/interested/bitfield/request/piece progression to
//! download hash-verified pieces from a single peer.

mod bitfield;
mod error;
mod message;
mod peer_id;
mod session;
mod transport;

pub use bitfield::Bitfield;
pub use error::PeerError;
pub use message::{Handshake, Message, MessageId};
pub use peer_id::PeerId;
pub use session::{PeerSession, BLOCK_SIZE};
pub use transport::PeerTransport;

#[cfg(test)]
mod tests;
