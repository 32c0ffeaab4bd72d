use super::http::percent_encode;
use super::*;

#[test]
fn test_parse_compact_peers() {
    let data = [
        192, 168, 1, 1, 0x1A, 0xE1, // 192.168.1.1:6881
        10, 0, 0, 1, 0x1A, 0xE2, // 10.0.0.1:6882
    ];

    let peers = parse_compact_peers(&data).unwrap();
    assert_eq!(peers.len(), 2);
    assert_eq!(peers[0].to_string(), "192.168.1.1:6881");
    assert_eq!(peers[1].to_string(), "10.0.0.1:6882");
}

#[test]
fn test_parse_compact_peers_empty() {
    assert!(parse_compact_peers(&[]).unwrap().is_empty());
}

#[test]
fn test_parse_compact_peers_remainder() {
    let data = [192, 168, 1, 1, 0x1A, 0xE1, 10, 0];
    assert!(matches!(
        parse_compact_peers(&data),
        Err(TrackerError::InvalidResponse(_))
    ));
}

#[test]
fn test_percent_encode() {
    assert_eq!(percent_encode(b"abc-_.~"), "abc-_.~");
    assert_eq!(percent_encode(&[0x00, 0xFF, b' ']), "%00%FF%20");
}

#[test]
fn test_http_tracker_invalid_url() {
    assert!(matches!(
        HttpTracker::new("udp://tracker.example.com:6969"),
        Err(TrackerError::InvalidUrl(_))
    ));
    assert!(HttpTracker::new("http://tracker.example.com/announce").is_ok());
}
