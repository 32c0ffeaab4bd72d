use thiserror::Error;

/// Everything that can go wrong while talking to a peer.
#[derive(Debug, Error)]
pub enum PeerError {
    /// Socket-level I/O failure.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Could not open the TCP connection. Retryable when other peers are
    /// available.
    #[error("connect failed: {0}")]
    Connect(std::io::Error),

    /// A read or write exceeded its deadline.
    #[error("timeout")]
    Timeout,

    /// The peer hung up.
    #[error("connection closed")]
    ConnectionClosed,

    /// The handshake bytes did not match the fixed layout or protocol
    /// string.
    #[error("invalid handshake")]
    InvalidHandshake,

    /// The handshake reply was for a different torrent.
    #[error("info hash mismatch")]
    InfoHashMismatch,

    /// A frame carried an ID outside the protocol's message table.
    #[error("invalid message id: {0}")]
    InvalidMessageId(u8),

    /// A frame's payload did not match its message ID.
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The peer sent a message that does not fit the download protocol at
    /// this point.
    #[error("protocol desync: {0}")]
    Desync(String),

    /// An assembled piece failed SHA1 verification.
    #[error("piece {index} failed hash verification")]
    HashMismatch { index: usize },

    /// The requested piece index is beyond the torrent's piece count.
    #[error("invalid piece index: {0}")]
    InvalidPieceIndex(usize),

    /// Writing a verified piece to the output sink failed.
    #[error("sink write failed: {0}")]
    Sink(std::io::Error),

    /// Every candidate peer failed to connect or handshake.
    #[error("could not connect to any peer")]
    NoUsablePeers,
}
