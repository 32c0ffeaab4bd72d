use std::net::SocketAddr;
use std::sync::Arc;

use bytes::{Bytes, BytesMut};
use sha1::{Digest, Sha1};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::net::TcpStream;
use tracing::debug;

use super::bitfield::Bitfield;
use super::error::PeerError;
use super::message::{Handshake, Message};
use super::peer_id::PeerId;
use super::transport::PeerTransport;
use crate::metainfo::Metainfo;

/// Size of a block request (16 KiB), the unit of transfer on the wire.
pub const BLOCK_SIZE: u64 = 16 * 1024;

/// A download session with a single peer.
///
/// The session owns the TCP connection exclusively and walks the protocol
/// in order: handshake on connect, then bitfield, `interested`, and
/// `unchoke` in [`prepare`](Self::prepare), then one block request at a
/// time in [`download_piece`](Self::download_piece). Every assembled piece
/// is SHA1-verified against the metainfo before it is returned; a piece
/// that fails verification is discarded, never surfaced.
///
/// Dropping the session closes the socket.
///
/// # Examples
///
/// ```no_run
/// use std::sync::Arc;
/// use btget::metainfo::Metainfo;
/// use btget::peer::{PeerId, PeerSession};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let metainfo = Arc::new(Metainfo::from_file("example.torrent")?);
/// let addr = "203.0.113.1:6881".parse()?;
///
/// let mut session = PeerSession::connect(addr, metainfo, PeerId::generate()).await?;
/// session.prepare().await?;
/// let piece = session.download_piece(0).await?;
/// println!("got {} verified bytes", piece.len());
/// # Ok(())
/// # }
/// ```
pub struct PeerSession {
    addr: SocketAddr,
    remote_id: PeerId,
    metainfo: Arc<Metainfo>,
    bitfield: Option<Bitfield>,
    peer_choking: bool,
    transport: PeerTransport,
}

impl PeerSession {
    /// Connects to a peer and exchanges handshakes.
    ///
    /// A TCP-level failure is reported as [`PeerError::Connect`] so that
    /// callers iterating a peer list can treat it as retryable. A reply
    /// with the wrong protocol string fails with
    /// [`PeerError::InvalidHandshake`]; a reply for a different torrent
    /// fails with [`PeerError::InfoHashMismatch`].
    pub async fn connect(
        addr: SocketAddr,
        metainfo: Arc<Metainfo>,
        our_id: PeerId,
    ) -> Result<Self, PeerError> {
        let stream = TcpStream::connect(addr).await.map_err(PeerError::Connect)?;
        let mut transport = PeerTransport::new(stream);

        let handshake = Handshake::new(*metainfo.info_hash.as_bytes(), *our_id.as_bytes());
        transport.send_handshake(&handshake).await?;

        let theirs = transport.receive_handshake().await?;
        if theirs.info_hash != *metainfo.info_hash.as_bytes() {
            return Err(PeerError::InfoHashMismatch);
        }

        let remote_id = PeerId::from_bytes(&theirs.peer_id).ok_or(PeerError::InvalidHandshake)?;
        debug!("handshake with {} complete, peer id {}", addr, remote_id);

        Ok(Self {
            addr,
            remote_id,
            metainfo,
            bitfield: None,
            peer_choking: true,
            transport,
        })
    }

    /// Tries each peer in order and returns the first session that
    /// completes a handshake.
    ///
    /// Only connection failures are retried with the next candidate; a
    /// protocol-level failure aborts immediately. An empty or exhausted
    /// list yields [`PeerError::NoUsablePeers`].
    pub async fn connect_any(
        peers: &[SocketAddr],
        metainfo: Arc<Metainfo>,
        our_id: PeerId,
    ) -> Result<Self, PeerError> {
        for &addr in peers {
            match Self::connect(addr, metainfo.clone(), our_id).await {
                Ok(session) => return Ok(session),
                Err(PeerError::Connect(e)) => {
                    debug!("peer {} unreachable: {}", addr, e);
                }
                Err(e) => return Err(e),
            }
        }
        Err(PeerError::NoUsablePeers)
    }

    /// The remote peer's address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The peer id the remote sent in its handshake.
    pub fn remote_id(&self) -> &PeerId {
        &self.remote_id
    }

    /// The peer's piece availability, once a bitfield has been received.
    pub fn bitfield(&self) -> Option<&Bitfield> {
        self.bitfield.as_ref()
    }

    /// Whether the peer is currently choking us.
    pub fn is_choked(&self) -> bool {
        self.peer_choking
    }

    /// Completes the pre-download progression: receive the peer's
    /// bitfield, declare interest, and wait to be unchoked.
    pub async fn prepare(&mut self) -> Result<(), PeerError> {
        match self.transport.receive_message().await? {
            Message::Bitfield(bits) => {
                self.bitfield = Some(Bitfield::from_bytes(
                    bits,
                    self.metainfo.info.piece_count(),
                ));
            }
            other => {
                return Err(PeerError::Desync(format!(
                    "expected bitfield, got {}",
                    other.kind()
                )))
            }
        }

        self.transport.send_message(&Message::Interested).await?;
        self.await_unchoke().await
    }

    /// Downloads and verifies one piece.
    ///
    /// Blocks are requested one at a time in ascending offset order; each
    /// reply must match the outstanding request. The assembled bytes are
    /// fed to a running SHA1 and compared against the metainfo's hash for
    /// this piece before being returned.
    pub async fn download_piece(&mut self, index: usize) -> Result<Bytes, PeerError> {
        let piece_len = self
            .metainfo
            .info
            .piece_length_of(index)
            .ok_or(PeerError::InvalidPieceIndex(index))?;
        let expected = self
            .metainfo
            .info
            .piece_hash(index)
            .ok_or(PeerError::InvalidPieceIndex(index))?;

        let mut assembled = BytesMut::with_capacity(piece_len as usize);
        let mut hasher = Sha1::new();

        let mut offset = 0u64;
        while offset < piece_len {
            let req_len = BLOCK_SIZE.min(piece_len - offset) as u32;
            let block = self
                .request_block(index as u32, offset as u32, req_len)
                .await?;

            if block.len() != req_len as usize {
                return Err(PeerError::InvalidMessage(format!(
                    "block of {} bytes, requested {}",
                    block.len(),
                    req_len
                )));
            }

            hasher.update(&block);
            assembled.extend_from_slice(&block);
            offset += u64::from(req_len);
        }

        let digest: [u8; 20] = hasher.finalize().into();
        if digest != expected {
            return Err(PeerError::HashMismatch { index });
        }

        debug!("piece {} verified ({} bytes)", index, piece_len);
        Ok(assembled.freeze())
    }

    /// Downloads every piece in order, writing each verified piece to the
    /// sink.
    pub async fn download_to<W>(&mut self, sink: &mut W) -> Result<(), PeerError>
    where
        W: AsyncWrite + Unpin,
    {
        for index in 0..self.metainfo.info.piece_count() {
            let piece = self.download_piece(index).await?;
            sink.write_all(&piece).await.map_err(PeerError::Sink)?;
        }
        sink.flush().await.map_err(PeerError::Sink)?;
        Ok(())
    }

    // Sends one request and reads until its block arrives. If the peer
    // chokes us mid-request the pending request is considered dropped:
    // we re-declare interest, wait for the unchoke, and re-issue.
    async fn request_block(
        &mut self,
        index: u32,
        begin: u32,
        length: u32,
    ) -> Result<Bytes, PeerError> {
        loop {
            self.transport
                .send_message(&Message::Request {
                    index,
                    begin,
                    length,
                })
                .await?;

            match self.read_block_reply(index, begin).await? {
                Some(data) => return Ok(data),
                None => continue,
            }
        }
    }

    // Reads messages until the requested block, a choke (None), or a
    // protocol violation.
    async fn read_block_reply(
        &mut self,
        index: u32,
        begin: u32,
    ) -> Result<Option<Bytes>, PeerError> {
        loop {
            match self.transport.receive_message().await? {
                Message::Piece {
                    index: i,
                    begin: b,
                    data,
                } if i == index && b == begin => return Ok(Some(data)),
                Message::Piece {
                    index: i, begin: b, ..
                } => {
                    return Err(PeerError::Desync(format!(
                        "piece {}+{} does not match request {}+{}",
                        i, b, index, begin
                    )))
                }
                Message::Have { piece } => self.record_have(piece),
                Message::Choke => {
                    debug!("choked mid-download by {}", self.addr);
                    self.peer_choking = true;
                    self.transport.send_message(&Message::Interested).await?;
                    self.await_unchoke().await?;
                    return Ok(None);
                }
                other => {
                    return Err(PeerError::Desync(format!(
                        "unexpected {} during download",
                        other.kind()
                    )))
                }
            }
        }
    }

    async fn await_unchoke(&mut self) -> Result<(), PeerError> {
        loop {
            match self.transport.receive_message().await? {
                Message::Unchoke => {
                    self.peer_choking = false;
                    return Ok(());
                }
                Message::Choke => self.peer_choking = true,
                Message::Have { piece } => self.record_have(piece),
                other => {
                    return Err(PeerError::Desync(format!(
                        "expected unchoke, got {}",
                        other.kind()
                    )))
                }
            }
        }
    }

    fn record_have(&mut self, piece: u32) {
        if let Some(bitfield) = &mut self.bitfield {
            bitfield.set_piece(piece as usize);
        }
    }
}
