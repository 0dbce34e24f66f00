use super::encode_records;
use crate::ChunkIterator;

#[test]
fn decodes_records_in_order() {
    let data = encode_records(&[(b"a", b"1"), (b"bb", b"22"), (b"ccc", b"333")]);
    let mut it = ChunkIterator::new(&data);

    assert!(it.next());
    assert_eq!(it.key(), b"a");
    assert_eq!(it.value(), b"1");

    assert!(it.next());
    assert_eq!(it.key(), b"bb");
    assert_eq!(it.value(), b"22");

    assert!(it.next());
    assert_eq!(it.key(), b"ccc");
    assert_eq!(it.value(), b"333");

    assert!(!it.next());
    assert!(!it.next(), "end state must be sticky");
    assert_eq!(it.decoded(), 3);
    assert!(!it.corrupt());
}

#[test]
fn empty_buffer_ends_immediately() {
    let mut it = ChunkIterator::new(&[]);
    assert!(!it.next());
    assert_eq!(it.decoded(), 0);
    assert!(!it.corrupt());
}

#[test]
fn large_record_uses_multibyte_length_prefix() {
    let value = vec![b'v'; 300];
    let data = encode_records(&[(b"big", &value), (b"tail", b"t")]);
    let mut it = ChunkIterator::new(&data);

    assert!(it.next());
    assert_eq!(it.key(), b"big");
    assert_eq!(it.value().len(), 300);

    assert!(it.next());
    assert_eq!(it.key(), b"tail");
    assert!(!it.next());
}

#[test]
fn truncated_record_latches_corruption() {
    let mut data = encode_records(&[(b"key", b"value")]);
    data.truncate(data.len() - 2);

    let mut it = ChunkIterator::new(&data);
    assert!(!it.next());
    assert!(it.corrupt());
    assert!(!it.next(), "corrupt iterator stays ended");
}

#[test]
fn length_overflow_latches_corruption() {
    // A key length claiming far more bytes than the buffer holds.
    let data = vec![0xFF, 0xFF, 0xFF, 0x7F, 0x01, b'x'];
    let mut it = ChunkIterator::new(&data);
    assert!(!it.next());
    assert!(it.corrupt());
}

#[test]
fn close_releases_and_ends() {
    let data = encode_records(&[(b"a", b"1"), (b"b", b"2")]);
    let mut it = ChunkIterator::new(&data);
    assert!(it.next());
    it.close();
    assert!(!it.next());
}
