use std::time::Duration;

use reqwest::{Client, StatusCode};

use super::error::TrackerError;
use super::response::{parse_compact_peers, AnnounceResponse};
use crate::bencode::{decode, Value};

const ANNOUNCE_TIMEOUT: Duration = Duration::from_secs(20);

/// An HTTP tracker client (BEP-3).
///
/// # Examples
///
/// ```no_run
/// use btget::tracker::HttpTracker;
///
/// # async fn example(info_hash: [u8; 20], peer_id: [u8; 20]) -> Result<(), Box<dyn std::error::Error>> {
/// let tracker = HttpTracker::new("http://tracker.example.com/announce")?;
///
/// // port 6881, nothing transferred yet, 92063 bytes left to fetch
/// let reply = tracker.announce(&info_hash, &peer_id, 6881, 0, 0, 92063).await?;
///
/// println!("re-announce in {}s, {} peers", reply.interval, reply.peers.len());
/// # Ok(())
/// # }
/// ```
pub struct HttpTracker {
    client: Client,
    url: String,
}

impl HttpTracker {
    pub fn new(url: &str) -> Result<Self, TrackerError> {
        let supported = ["http://", "https://"];
        if !supported.iter().any(|scheme| url.starts_with(scheme)) {
            return Err(TrackerError::InvalidUrl(url.to_string()));
        }

        let client = Client::builder().timeout(ANNOUNCE_TIMEOUT).build()?;

        Ok(Self {
            client,
            url: url.to_string(),
        })
    }

    /// Announces to the tracker and returns the interval and peer list.
    ///
    /// The info hash and peer id are URL-encoded byte-by-byte; the
    /// remaining parameters are plain decimal. `compact=1` requests the
    /// 6-bytes-per-peer list format.
    pub async fn announce(
        &self,
        info_hash: &[u8; 20],
        peer_id: &[u8; 20],
        port: u16,
        uploaded: u64,
        downloaded: u64,
        left: u64,
    ) -> Result<AnnounceResponse, TrackerError> {
        let query = [
            ("info_hash", percent_encode(info_hash)),
            ("peer_id", percent_encode(peer_id)),
            ("port", port.to_string()),
            ("uploaded", uploaded.to_string()),
            ("downloaded", downloaded.to_string()),
            ("left", left.to_string()),
            ("compact", "1".to_string()),
        ]
        .iter()
        .map(|(name, value)| format!("{}={}", name, value))
        .collect::<Vec<_>>()
        .join("&");

        let response = self
            .client
            .get(format!("{}?{}", self.url, query))
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            return Err(TrackerError::ServerError(response.status().as_u16()));
        }

        let body = response.bytes().await?;
        let root = decode(&body)?;
        if root.as_dict().is_none() {
            return Err(TrackerError::InvalidResponse(
                "response is not a dictionary".into(),
            ));
        }

        if let Some(reason) = root.get(b"failure reason").and_then(Value::as_str) {
            return Err(TrackerError::Failure(reason.to_string()));
        }

        let interval = root
            .get(b"interval")
            .and_then(Value::as_integer)
            .ok_or_else(|| TrackerError::InvalidResponse("missing interval".into()))?;

        let peers = root
            .get(b"peers")
            .ok_or_else(|| TrackerError::InvalidResponse("missing peers".into()))?
            .as_bytes()
            .ok_or_else(|| TrackerError::InvalidResponse("peers is not a string".into()))?;

        Ok(AnnounceResponse {
            interval: interval as u32,
            peers: parse_compact_peers(peers)?,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

/// Percent-encodes arbitrary bytes for a query string, leaving only the
/// RFC 3986 unreserved characters bare.
pub(crate) fn percent_encode(bytes: &[u8]) -> String {
    const HEX: &[u8; 16] = b"0123456789ABCDEF";

    let mut out = String::with_capacity(bytes.len() * 3);
    for &b in bytes {
        match b {
            b'0'..=b'9' | b'a'..=b'z' | b'A'..=b'Z' | b'-' | b'_' | b'.' | b'~' => {
                out.push(b as char)
            }
            _ => {
                out.push('%');
                out.push(HEX[(b >> 4) as usize] as char);
                out.push(HEX[(b & 0x0F) as usize] as char);
            }
        }
    }
    out
}
