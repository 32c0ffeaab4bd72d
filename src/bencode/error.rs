use thiserror::Error;

/// Everything that can go wrong while decoding or encoding bencode.
///
/// # Examples
///
/// ```
/// use btget::bencode::{decode, BencodeError};
///
/// assert!(matches!(decode(b"i42"), Err(BencodeError::UnexpectedEof)));
/// assert!(matches!(decode(b"i-0e"), Err(BencodeError::InvalidInteger(_))));
/// assert!(matches!(decode(b"i42eextra"), Err(BencodeError::TrailingData)));
/// ```
#[derive(Debug, Error)]
pub enum BencodeError {
    /// A value started with a byte that is not `0-9`, `i`, `l`, or `d`.
    #[error("invalid token: {0}")]
    InvalidToken(char),

    /// The input ran out mid-value.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The digits between `i` and `e` are not a well-formed number
    /// (empty, `-0`, a leading zero, or overflow).
    #[error("invalid integer: {0}")]
    InvalidInteger(String),

    /// The string length prefix is not a well-formed number.
    #[error("invalid string length")]
    InvalidLength,

    /// Bytes remained after the decoded value.
    #[error("trailing data after value")]
    TrailingData,

    /// More than 64 levels of nesting; stops stack overflow on crafted
    /// input.
    #[error("nesting too deep")]
    NestingTooDeep,

    /// I/O failure while reading from a stream or writing to a sink.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
