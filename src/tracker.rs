//! HTTP tracker protocol (BEP-3, BEP-23)
//!
//! Trackers are servers that help peers find each other. A client
//! "announces" itself with a GET request carrying the info hash and
//! transfer statistics; the bencoded reply contains the re-announce
//! interval and a compact peer list (6 bytes per peer: 4-byte IPv4
//! address plus 2-byte big-endian port).

mod error;
mod http;
mod response;

pub use error::TrackerError;
pub use http::HttpTracker;
pub use response::{parse_compact_peers, AnnounceResponse};

#[cfg(test)]
mod tests;
