use std::collections::BTreeMap;
use std::io::Cursor;

use bytes::Bytes;

use super::*;

#[test]
fn test_decode_integer() {
    assert_eq!(decode(b"i42e").unwrap(), Value::Integer(42));
    assert_eq!(decode(b"i-42e").unwrap(), Value::Integer(-42));
    assert_eq!(decode(b"i0e").unwrap(), Value::Integer(0));
    assert_eq!(decode(b"i52e").unwrap(), Value::Integer(52));
}

#[test]
fn test_decode_integer_invalid() {
    assert!(matches!(
        decode(b"i-0e"),
        Err(BencodeError::InvalidInteger(_))
    ));
    assert!(matches!(
        decode(b"i03e"),
        Err(BencodeError::InvalidInteger(_))
    ));
    assert!(matches!(decode(b"ie"), Err(BencodeError::InvalidInteger(_))));
    assert!(matches!(decode(b"i42"), Err(BencodeError::UnexpectedEof)));
}

#[test]
fn test_decode_bytes() {
    assert_eq!(
        decode(b"5:hello").unwrap(),
        Value::Bytes(Bytes::from_static(b"hello"))
    );
    assert_eq!(decode(b"0:").unwrap(), Value::Bytes(Bytes::from_static(b"")));
}

#[test]
fn test_decode_bytes_truncated() {
    assert!(matches!(decode(b"5:hi"), Err(BencodeError::UnexpectedEof)));
    assert!(matches!(decode(b"5"), Err(BencodeError::UnexpectedEof)));
}

#[test]
fn test_decode_invalid_token() {
    assert!(matches!(decode(b"x"), Err(BencodeError::InvalidToken('x'))));
}

#[test]
fn test_decode_list() {
    let result = decode(b"l5:helloi52ee").unwrap();
    match result {
        Value::List(l) => {
            assert_eq!(l.len(), 2);
            assert_eq!(l[0], Value::Bytes(Bytes::from_static(b"hello")));
            assert_eq!(l[1], Value::Integer(52));
        }
        _ => panic!("expected list"),
    }
}

#[test]
fn test_decode_dict() {
    let result = decode(b"d3:bar4:spam3:fooi42ee").unwrap();
    match result {
        Value::Dict(d) => {
            assert_eq!(d.len(), 2);
            assert_eq!(
                d.get(&Bytes::from_static(b"bar")),
                Some(&Value::Bytes(Bytes::from_static(b"spam")))
            );
            assert_eq!(
                d.get(&Bytes::from_static(b"foo")),
                Some(&Value::Integer(42))
            );
        }
        _ => panic!("expected dict"),
    }
}

#[test]
fn test_dict_keys_sorted_after_parse() {
    // keys appear out of order in the input; iteration must be ascending
    let value = decode(b"d3:zzzi1e3:aaai2ee").unwrap();
    let keys: Vec<&[u8]> = value
        .as_dict()
        .unwrap()
        .keys()
        .map(|k| k.as_ref())
        .collect();
    assert_eq!(keys, vec![b"aaa".as_slice(), b"zzz".as_slice()]);
}

#[test]
fn test_encode_integer() {
    assert_eq!(encode(&Value::Integer(42)).unwrap(), b"i42e");
    assert_eq!(encode(&Value::Integer(-42)).unwrap(), b"i-42e");
    assert_eq!(encode(&Value::Integer(0)).unwrap(), b"i0e");
}

#[test]
fn test_encode_bytes() {
    assert_eq!(
        encode(&Value::Bytes(Bytes::from_static(b"spam"))).unwrap(),
        b"4:spam"
    );
}

#[test]
fn test_encode_dict_sorted() {
    let mut dict = BTreeMap::new();
    dict.insert(Bytes::from_static(b"foo"), Value::Integer(42));
    dict.insert(Bytes::from_static(b"bar"), Value::string("spam"));
    assert_eq!(
        encode(&Value::Dict(dict)).unwrap(),
        b"d3:bar4:spam3:fooi42ee"
    );
}

#[test]
fn test_roundtrip_canonical() {
    let inputs: &[&[u8]] = &[
        b"d3:bar4:spam3:fooi42ee",
        b"le",
        b"de",
        b"l5:helloi52ee",
        b"d8:announce15:http://test.com4:infod4:name4:test12:piece lengthi16384eee",
        b"d4:listl4:spami42eee",
    ];
    for input in inputs {
        let decoded = decode(input).unwrap();
        assert_eq!(&encode(&decoded).unwrap(), input);
    }
}

#[test]
fn test_trailing_data_error() {
    assert!(matches!(
        decode(b"i42eextra"),
        Err(BencodeError::TrailingData)
    ));
}

#[test]
fn test_nesting_limit() {
    let mut deep = Vec::new();
    deep.extend(std::iter::repeat(b'l').take(100));
    deep.extend(std::iter::repeat(b'e').take(100));
    assert!(matches!(decode(&deep), Err(BencodeError::NestingTooDeep)));
}

#[test]
fn test_decode_from_matches_slice_decoder() {
    let inputs: &[&[u8]] = &[
        b"i42e",
        b"5:hello",
        b"0:",
        b"l5:helloi52ee",
        b"d3:bar4:spam3:fooi42ee",
        b"d4:listl4:spami42eee",
    ];
    for input in inputs {
        let mut cursor = Cursor::new(input.to_vec());
        let streamed = decode_from(&mut cursor).unwrap();
        assert_eq!(streamed, decode(input).unwrap());
    }
}

#[test]
fn test_decode_from_leaves_trailing_bytes() {
    let mut cursor = Cursor::new(b"i1e3:abci2e".to_vec());
    assert_eq!(decode_from(&mut cursor).unwrap(), Value::Integer(1));
    assert_eq!(
        decode_from(&mut cursor).unwrap(),
        Value::Bytes(Bytes::from_static(b"abc"))
    );
    assert_eq!(decode_from(&mut cursor).unwrap(), Value::Integer(2));
    assert!(matches!(
        decode_from(&mut cursor),
        Err(BencodeError::UnexpectedEof)
    ));
}

#[test]
fn test_decode_from_truncated() {
    let mut cursor = Cursor::new(b"l5:hello".to_vec());
    assert!(matches!(
        decode_from(&mut cursor),
        Err(BencodeError::UnexpectedEof)
    ));
}

#[test]
fn test_to_json() {
    assert_eq!(
        decode(b"5:hello").unwrap().to_json(),
        serde_json::json!("hello")
    );
    assert_eq!(decode(b"i52e").unwrap().to_json(), serde_json::json!(52));
    assert_eq!(
        decode(b"l5:helloi52ee").unwrap().to_json(),
        serde_json::json!(["hello", 52])
    );
    assert_eq!(
        decode(b"d3:bar4:spam3:fooi42ee").unwrap().to_json(),
        serde_json::json!({"bar": "spam", "foo": 42})
    );
}

#[test]
fn test_value_accessors() {
    let value = Value::Integer(42);
    assert_eq!(value.as_integer(), Some(42));
    assert!(value.as_bytes().is_none());

    let value = Value::Bytes(Bytes::from_static(b"test"));
    assert_eq!(value.as_str(), Some("test"));
    assert!(value.as_integer().is_none());

    let value = Value::List(vec![]);
    assert!(value.as_list().is_some());
    assert!(value.as_dict().is_none());
}
