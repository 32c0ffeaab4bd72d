//! Torrent metainfo handling (BEP-3)
//!
//! This module parses `.torrent` files into a typed record, computes the
//! info hash over the canonical bencoding of the `info` dictionary, and
//! provides the per-piece length arithmetic the download path relies on.

mod error;
mod info_hash;
mod torrent;

pub use error::MetainfoError;
pub use info_hash::InfoHash;
pub(crate) use info_hash::hex_encode;
pub use torrent::{Info, Metainfo};
