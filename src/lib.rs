//! btget - a single-peer BitTorrent client
//!
//! This library implements the pieces of the BitTorrent protocol needed to
//! download a file from one peer:
//!
//! - [`bencode`] - BEP-3 bencode encoding/decoding
//! - [`metainfo`] - torrent file parsing, info hashes, piece arithmetic
//! - [`tracker`] - HTTP tracker announces and compact peer lists
//! - [`peer`] - peer wire protocol, handshake, and verified piece downloads

pub mod bencode;
pub mod metainfo;
pub mod peer;
pub mod tracker;

pub use bencode::{decode, decode_from, encode, encode_to, BencodeError, Value};
pub use metainfo::{Info, InfoHash, Metainfo, MetainfoError};
pub use peer::{Bitfield, Handshake, Message, PeerError, PeerId, PeerSession};
pub use tracker::{AnnounceResponse, HttpTracker, TrackerError};
