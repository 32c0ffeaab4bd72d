use super::error::PeerError;
use super::message::{Handshake, Message, HANDSHAKE_LEN};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::time::timeout;

const SEND_TIMEOUT: Duration = Duration::from_secs(20);
const RECV_TIMEOUT: Duration = Duration::from_secs(90);

// Largest frame we accept. Far above any bitfield or 16 KiB block a
// cooperating peer sends, far below what a hostile length prefix could
// make us allocate.
const MAX_FRAME_LEN: usize = 2 * 1024 * 1024;

/// Length-prefixed message framing over a TCP stream.
///
/// The read side goes through a [`BufReader`], and every field is pulled
/// with `read_exact`, so partial reads from the socket are never an issue.
/// Zero-length frames (keep-alives) are skipped by
/// [`receive_message`](Self::receive_message). Dropping the transport
/// closes the socket.
pub struct PeerTransport {
    stream: BufReader<TcpStream>,
}

impl PeerTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufReader::new(stream),
        }
    }

    pub async fn send_handshake(&mut self, handshake: &Handshake) -> Result<(), PeerError> {
        self.send_bytes(&handshake.encode()).await
    }

    pub async fn receive_handshake(&mut self) -> Result<Handshake, PeerError> {
        let mut raw = [0u8; HANDSHAKE_LEN];
        self.recv_exact(&mut raw).await?;
        Handshake::decode(&raw)
    }

    pub async fn send_message(&mut self, message: &Message) -> Result<(), PeerError> {
        self.send_bytes(&message.encode()).await
    }

    /// Reads the next non-keep-alive message.
    ///
    /// Keep-alive frames (length 0) carry no information and are read
    /// again transparently.
    pub async fn receive_message(&mut self) -> Result<Message, PeerError> {
        loop {
            let mut prefix = [0u8; 4];
            self.recv_exact(&mut prefix).await?;

            let length = u32::from_be_bytes(prefix) as usize;
            if length == 0 {
                continue;
            }
            if length > MAX_FRAME_LEN {
                return Err(PeerError::InvalidMessage(format!(
                    "frame of {} bytes exceeds limit",
                    length
                )));
            }

            let mut frame = vec![0u8; 4 + length];
            frame[..4].copy_from_slice(&prefix);
            self.recv_exact(&mut frame[4..]).await?;
            return Message::decode(frame.into());
        }
    }

    pub fn peer_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.stream.get_ref().peer_addr()
    }

    async fn send_bytes(&mut self, data: &[u8]) -> Result<(), PeerError> {
        match timeout(SEND_TIMEOUT, self.stream.write_all(data)).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(PeerError::Timeout),
        }
    }

    async fn recv_exact(&mut self, buf: &mut [u8]) -> Result<(), PeerError> {
        match timeout(RECV_TIMEOUT, self.stream.read_exact(buf)).await {
            Ok(Ok(_)) => Ok(()),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                Err(PeerError::ConnectionClosed)
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_) => Err(PeerError::Timeout),
        }
    }
}
