use std::collections::BTreeMap;
use std::sync::Arc;

use bytes::Bytes;
use sha1::{Digest, Sha1};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use super::*;
use crate::bencode::{encode, Value};
use crate::metainfo::Metainfo;

#[test]
fn test_peer_id_generate() {
    let id1 = PeerId::generate();
    let id2 = PeerId::generate();
    assert_ne!(id1.0, id2.0);
    assert_eq!(&id1.0[..8], b"-BG0001-");
    assert_eq!(id1.to_hex().len(), 40);
}

#[test]
fn test_bitfield() {
    let mut bf = Bitfield::new(100);
    assert!(!bf.has_piece(0));

    bf.set_piece(0);
    assert!(bf.has_piece(0));

    bf.set_piece(99);
    assert!(bf.has_piece(99));
    assert!(!bf.has_piece(100));

    assert_eq!(bf.count(), 2);
    assert!(!bf.is_complete());
}

#[test]
fn test_bitfield_from_bytes() {
    let bf = Bitfield::from_bytes(Bytes::from_static(&[0x80, 0x00]), 16);
    assert!(bf.has_piece(0));
    assert!(!bf.has_piece(1));

    // spare bits beyond the piece count are cleared
    let bf = Bitfield::from_bytes(Bytes::from_static(&[0xFF]), 3);
    assert_eq!(bf.count(), 3);
}

#[test]
fn test_handshake_layout() {
    let handshake = Handshake::new([1u8; 20], [2u8; 20]);
    let encoded = handshake.encode();

    assert_eq!(encoded.len(), 68);
    assert_eq!(encoded[0], 19);
    assert_eq!(&encoded[1..20], b"BitTorrent protocol");
    assert_eq!(&encoded[20..28], &[0u8; 8]);
    assert_eq!(&encoded[28..48], &[1u8; 20]);
    assert_eq!(&encoded[48..68], &[2u8; 20]);

    let decoded = Handshake::decode(&encoded).unwrap();
    assert_eq!(decoded.info_hash, [1u8; 20]);
    assert_eq!(decoded.peer_id, [2u8; 20]);
}

#[test]
fn test_handshake_decode_invalid() {
    // wrong protocol length byte
    let mut bad = Handshake::new([0u8; 20], [0u8; 20]).encode().to_vec();
    bad[0] = 18;
    assert!(matches!(
        Handshake::decode(&bad),
        Err(PeerError::InvalidHandshake)
    ));

    // wrong protocol string
    let mut bad = Handshake::new([0u8; 20], [0u8; 20]).encode().to_vec();
    bad[1] = b'b';
    assert!(matches!(
        Handshake::decode(&bad),
        Err(PeerError::InvalidHandshake)
    ));

    // truncated
    assert!(matches!(
        Handshake::decode(&[19u8; 10]),
        Err(PeerError::InvalidHandshake)
    ));
}

#[test]
fn test_message_roundtrip() {
    let messages = vec![
        Message::Choke,
        Message::Unchoke,
        Message::Interested,
        Message::NotInterested,
        Message::Have { piece: 42 },
        Message::Bitfield(Bytes::from_static(&[0xA5])),
        Message::Request {
            index: 1,
            begin: 16384,
            length: 16384,
        },
        Message::Piece {
            index: 1,
            begin: 16384,
            data: Bytes::from_static(b"hello world"),
        },
        Message::Cancel {
            index: 1,
            begin: 16384,
            length: 16384,
        },
    ];

    for msg in messages {
        let encoded = msg.encode();
        let decoded = Message::decode(encoded.clone()).unwrap();
        assert_eq!(decoded.encode(), encoded);
    }
}

#[test]
fn test_keepalive_roundtrip() {
    let encoded = Message::KeepAlive.encode();
    assert_eq!(encoded.as_ref(), &[0, 0, 0, 0]);
    assert!(matches!(
        Message::decode(encoded).unwrap(),
        Message::KeepAlive
    ));
}

#[test]
fn test_message_unknown_id() {
    let frame = Bytes::from_static(&[0, 0, 0, 1, 99]);
    assert!(matches!(
        Message::decode(frame),
        Err(PeerError::InvalidMessageId(99))
    ));
}

#[test]
fn test_message_big_endian_fields() {
    let encoded = Message::Request {
        index: 1,
        begin: 0x0102_0304,
        length: 16384,
    }
    .encode();
    assert_eq!(encoded[0..4], [0, 0, 0, 13]);
    assert_eq!(encoded[4], 6);
    assert_eq!(encoded[5..9], [0, 0, 0, 1]);
    assert_eq!(encoded[9..13], [1, 2, 3, 4]);
    assert_eq!(encoded[13..17], [0, 0, 64, 0]);
}

// Loopback tests: a mock peer serving a tiny torrent over a real socket.

const MOCK_PEER_ID: [u8; 20] = *b"-MK0001-qrstuvwxyz01";

#[derive(Clone, Copy, PartialEq)]
enum MockBehavior {
    Normal,
    CorruptBlocks,
    WrongInfoHash,
    DesyncReply,
    ChokeOnce,
}

fn loopback_metainfo(content: &[u8], piece_length: u64) -> Arc<Metainfo> {
    let mut pieces = Vec::new();
    for chunk in content.chunks(piece_length as usize) {
        pieces.extend_from_slice(&Sha1::digest(chunk));
    }

    let mut info = BTreeMap::new();
    info.insert(
        Bytes::from_static(b"length"),
        Value::Integer(content.len() as i64),
    );
    info.insert(Bytes::from_static(b"name"), Value::string("loopback"));
    info.insert(
        Bytes::from_static(b"piece length"),
        Value::Integer(piece_length as i64),
    );
    info.insert(Bytes::from_static(b"pieces"), Value::Bytes(pieces.into()));

    let mut root = BTreeMap::new();
    root.insert(
        Bytes::from_static(b"announce"),
        Value::string("http://127.0.0.1:1/announce"),
    );
    root.insert(Bytes::from_static(b"info"), Value::Dict(info));

    let data = encode(&Value::Dict(root)).unwrap();
    Arc::new(Metainfo::from_bytes(&data).unwrap())
}

async fn serve_mock_peer(
    listener: TcpListener,
    metainfo: Arc<Metainfo>,
    content: Vec<u8>,
    behavior: MockBehavior,
) {
    let (mut stream, _) = listener.accept().await.unwrap();

    let mut handshake = [0u8; 68];
    stream.read_exact(&mut handshake).await.unwrap();
    assert_eq!(&handshake[28..48], metainfo.info_hash.as_bytes());

    let info_hash = if behavior == MockBehavior::WrongInfoHash {
        [0xEE; 20]
    } else {
        *metainfo.info_hash.as_bytes()
    };
    let reply = Handshake::new(info_hash, MOCK_PEER_ID);
    stream.write_all(&reply.encode()).await.unwrap();
    if behavior == MockBehavior::WrongInfoHash {
        return;
    }

    // a keep-alive before the bitfield must be skipped by the client
    stream.write_all(&Message::KeepAlive.encode()).await.unwrap();

    let piece_count = metainfo.info.piece_count();
    let mut bits = vec![0u8; piece_count.div_ceil(8)];
    for i in 0..piece_count {
        bits[i / 8] |= 0x80 >> (i % 8);
    }
    stream
        .write_all(&Message::Bitfield(bits.into()).encode())
        .await
        .unwrap();

    // interested
    let mut msg = [0u8; 5];
    stream.read_exact(&mut msg).await.unwrap();
    assert_eq!(msg, [0, 0, 0, 1, 2]);
    stream
        .write_all(&Message::Unchoke.encode())
        .await
        .unwrap();

    let mut choked_once = false;
    loop {
        let mut request = [0u8; 17];
        if stream.read_exact(&mut request).await.is_err() {
            return;
        }
        if behavior == MockBehavior::DesyncReply {
            stream
                .write_all(&Message::Interested.encode())
                .await
                .unwrap();
            return;
        }

        if behavior == MockBehavior::ChokeOnce && !choked_once {
            choked_once = true;
            // drop the pending request, then let the client re-interest
            stream.write_all(&Message::Choke.encode()).await.unwrap();
            let mut interested = [0u8; 5];
            stream.read_exact(&mut interested).await.unwrap();
            assert_eq!(interested, [0, 0, 0, 1, 2]);
            stream.write_all(&Message::Unchoke.encode()).await.unwrap();
            // the client re-issues the request
            stream.read_exact(&mut request).await.unwrap();
        }

        assert_eq!(request[..5], [0, 0, 0, 13, 6]);
        let index = u32::from_be_bytes(request[5..9].try_into().unwrap());
        let begin = u32::from_be_bytes(request[9..13].try_into().unwrap());
        let length = u32::from_be_bytes(request[13..17].try_into().unwrap());

        let start = index as usize * metainfo.info.piece_length as usize + begin as usize;
        let mut data = content[start..start + length as usize].to_vec();
        if behavior == MockBehavior::CorruptBlocks {
            data[0] ^= 0xFF;
        }
        stream
            .write_all(
                &Message::Piece {
                    index,
                    begin,
                    data: data.into(),
                }
                .encode(),
            )
            .await
            .unwrap();
    }
}

async fn loopback_session(
    content: &[u8],
    piece_length: u64,
    behavior: MockBehavior,
) -> (Result<PeerSession, PeerError>, Arc<Metainfo>) {
    let metainfo = loopback_metainfo(content, piece_length);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(serve_mock_peer(
        listener,
        metainfo.clone(),
        content.to_vec(),
        behavior,
    ));

    let session = PeerSession::connect(addr, metainfo.clone(), PeerId::generate()).await;
    (session, metainfo)
}

#[tokio::test]
async fn test_session_download_piece() {
    let content: Vec<u8> = (0u16..1000).map(|i| (i % 256) as u8).collect();
    let (session, _) = loopback_session(&content, 400, MockBehavior::Normal).await;
    let mut session = session.unwrap();

    assert_eq!(session.remote_id().as_bytes(), &MOCK_PEER_ID);

    session.prepare().await.unwrap();
    let bitfield = session.bitfield().unwrap();
    assert!(bitfield.has_piece(0) && bitfield.has_piece(2));
    assert!(!session.is_choked());

    // full piece
    assert_eq!(session.download_piece(0).await.unwrap(), content[..400]);
    // short final piece
    assert_eq!(session.download_piece(2).await.unwrap(), content[800..]);
}

#[tokio::test]
async fn test_session_download_to() {
    let content: Vec<u8> = (0u16..1000).map(|i| (255 - i % 256) as u8).collect();
    let (session, _) = loopback_session(&content, 300, MockBehavior::Normal).await;
    let mut session = session.unwrap();
    session.prepare().await.unwrap();

    let mut sink = Vec::new();
    session.download_to(&mut sink).await.unwrap();
    assert_eq!(sink, content);
}

#[tokio::test]
async fn test_session_hash_mismatch() {
    let content = b"some content that will be corrupted".to_vec();
    let (session, _) = loopback_session(&content, 16, MockBehavior::CorruptBlocks).await;
    let mut session = session.unwrap();
    session.prepare().await.unwrap();

    assert!(matches!(
        session.download_piece(0).await,
        Err(PeerError::HashMismatch { index: 0 })
    ));
}

#[tokio::test]
async fn test_session_info_hash_mismatch() {
    let content = b"whatever".to_vec();
    let (session, _) = loopback_session(&content, 8, MockBehavior::WrongInfoHash).await;
    assert!(matches!(session, Err(PeerError::InfoHashMismatch)));
}

#[tokio::test]
async fn test_session_desync() {
    let content = b"desync test content".to_vec();
    let (session, _) = loopback_session(&content, 8, MockBehavior::DesyncReply).await;
    let mut session = session.unwrap();
    session.prepare().await.unwrap();

    assert!(matches!(
        session.download_piece(0).await,
        Err(PeerError::Desync(_))
    ));
}

#[tokio::test]
async fn test_session_survives_mid_download_choke() {
    let content: Vec<u8> = (0u16..600).map(|i| (i % 251) as u8).collect();
    let (session, _) = loopback_session(&content, 200, MockBehavior::ChokeOnce).await;
    let mut session = session.unwrap();
    session.prepare().await.unwrap();

    assert_eq!(session.download_piece(0).await.unwrap(), content[..200]);
    assert_eq!(session.download_piece(1).await.unwrap(), content[200..400]);
}

#[tokio::test]
async fn test_session_invalid_piece_index() {
    let content = b"tiny".to_vec();
    let (session, _) = loopback_session(&content, 4, MockBehavior::Normal).await;
    let mut session = session.unwrap();
    session.prepare().await.unwrap();

    assert!(matches!(
        session.download_piece(99).await,
        Err(PeerError::InvalidPieceIndex(99))
    ));
}

#[tokio::test]
async fn test_connect_any() {
    let content = b"connect_any".to_vec();
    let metainfo = loopback_metainfo(&content, 4);

    // no candidates at all
    assert!(matches!(
        PeerSession::connect_any(&[], metainfo.clone(), PeerId::generate()).await,
        Err(PeerError::NoUsablePeers)
    ));

    // a dead candidate followed by a live one
    let dead = {
        // bind and drop to get a port with no listener
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let live = listener.local_addr().unwrap();
    tokio::spawn(serve_mock_peer(
        listener,
        metainfo.clone(),
        content.clone(),
        MockBehavior::Normal,
    ));

    let session = PeerSession::connect_any(&[dead, live], metainfo, PeerId::generate())
        .await
        .unwrap();
    assert_eq!(session.addr(), live);
}

#[tokio::test]
async fn test_transport_skips_keepalive() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut stream, _) = listener.accept().await.unwrap();
        stream.write_all(&Message::KeepAlive.encode()).await.unwrap();
        stream.write_all(&Message::KeepAlive.encode()).await.unwrap();
        stream
            .write_all(&Message::Have { piece: 7 }.encode())
            .await
            .unwrap();
    });

    let stream = TcpStream::connect(addr).await.unwrap();
    let mut transport = PeerTransport::new(stream);
    assert!(matches!(
        transport.receive_message().await.unwrap(),
        Message::Have { piece: 7 }
    ));
}
