use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use super::error::TrackerError;

/// A successful tracker announce reply.
#[derive(Debug, Clone)]
pub struct AnnounceResponse {
    /// Seconds to wait before the next announce.
    pub interval: u32,
    /// Peers available for this torrent.
    pub peers: Vec<SocketAddr>,
}

/// Parses the compact peer representation.
///
/// Each peer is 6 bytes: a 4-byte IPv4 address followed by a 2-byte
/// big-endian port. A length that is not a multiple of 6 is rejected.
///
/// # Examples
///
/// ```
/// use btget::tracker::parse_compact_peers;
///
/// let peers = parse_compact_peers(&[192, 168, 1, 1, 0x1A, 0xE1]).unwrap();
/// assert_eq!(peers[0].to_string(), "192.168.1.1:6881");
/// ```
pub fn parse_compact_peers(data: &[u8]) -> Result<Vec<SocketAddr>, TrackerError> {
    if data.len() % 6 != 0 {
        return Err(TrackerError::InvalidResponse(format!(
            "compact peers length {} is not a multiple of 6",
            data.len()
        )));
    }

    Ok(data
        .chunks_exact(6)
        .map(|chunk| {
            let ip = Ipv4Addr::new(chunk[0], chunk[1], chunk[2], chunk[3]);
            let port = u16::from_be_bytes([chunk[4], chunk[5]]);
            SocketAddr::new(IpAddr::V4(ip), port)
        })
        .collect())
}
