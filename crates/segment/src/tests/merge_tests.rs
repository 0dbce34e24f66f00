use super::encode_records;
use crate::{ChunkIterator, MergingIterator};

fn drain(mi: &mut MergingIterator) -> Vec<(Vec<u8>, Vec<u8>)> {
    let mut out = Vec::new();
    while mi.next() {
        out.push((mi.key().to_vec(), mi.value().to_vec()));
    }
    out
}

#[test]
fn newest_wins_on_overlap() {
    // Iterator 0 is the newest segment. Values are tagged with their source
    // so provenance is visible in the output.
    let a = encode_records(&[(b"1", b"a1"), (b"2", b"a2"), (b"3", b"a3")]);
    let b = encode_records(&[(b"1", b"b1"), (b"2", b"b2"), (b"4", b"b4")]);
    let c = encode_records(&[(b"4", b"c4"), (b"5", b"c5"), (b"6", b"c6")]);

    let mut mi = MergingIterator::new(vec![
        ChunkIterator::new(&a),
        ChunkIterator::new(&b),
        ChunkIterator::new(&c),
    ]);
    let out = drain(&mut mi);

    assert_eq!(
        out,
        vec![
            (b"1".to_vec(), b"a1".to_vec()),
            (b"2".to_vec(), b"a2".to_vec()),
            (b"3".to_vec(), b"a3".to_vec()),
            (b"4".to_vec(), b"b4".to_vec()),
            (b"5".to_vec(), b"c5".to_vec()),
            (b"6".to_vec(), b"c6".to_vec()),
        ]
    );
    assert_eq!(mi.keys_seen(), 9);
    assert_eq!(mi.keys_emitted(), 6);
}

#[test]
fn disjoint_sources_interleave_sorted() {
    let a = encode_records(&[(b"4", b"x"), (b"6", b"x"), (b"8", b"x")]);
    let b = encode_records(&[(b"3", b"x"), (b"5", b"x"), (b"7", b"x"), (b"9", b"x")]);

    let mut mi = MergingIterator::new(vec![ChunkIterator::new(&a), ChunkIterator::new(&b)]);
    let keys: Vec<Vec<u8>> = drain(&mut mi).into_iter().map(|(k, _)| k).collect();

    assert_eq!(
        keys,
        vec![
            b"3".to_vec(),
            b"4".to_vec(),
            b"5".to_vec(),
            b"6".to_vec(),
            b"7".to_vec(),
            b"8".to_vec(),
            b"9".to_vec(),
        ]
    );
}

#[test]
fn output_is_non_descending_and_distinct() {
    let a = encode_records(&[(b"b", b"1"), (b"d", b"1"), (b"f", b"1")]);
    let b = encode_records(&[(b"a", b"2"), (b"b", b"2"), (b"f", b"2"), (b"g", b"2")]);
    let c = encode_records(&[(b"b", b"3"), (b"g", b"3")]);

    let mut mi = MergingIterator::new(vec![
        ChunkIterator::new(&a),
        ChunkIterator::new(&b),
        ChunkIterator::new(&c),
    ]);
    let out = drain(&mut mi);

    for pair in out.windows(2) {
        assert!(pair[0].0 < pair[1].0, "keys must be strictly ascending");
    }
    // Every duplicate resolved toward the lowest (newest) source.
    assert!(out.contains(&(b"b".to_vec(), b"1".to_vec())));
    assert!(out.contains(&(b"f".to_vec(), b"1".to_vec())));
    assert!(out.contains(&(b"g".to_vec(), b"2".to_vec())));
}

#[test]
fn all_sources_empty() {
    let mut mi = MergingIterator::new(vec![ChunkIterator::new(&[]), ChunkIterator::new(&[])]);
    assert!(!mi.next());
    assert_eq!(mi.keys_emitted(), 0);
}

#[test]
fn single_source_passes_through() {
    let a = encode_records(&[(b"x", b"1"), (b"y", b"2")]);
    let mut mi = MergingIterator::new(vec![ChunkIterator::new(&a)]);
    let out = drain(&mut mi);
    assert_eq!(out.len(), 2);
    assert_eq!(out[0].0, b"x");
    assert_eq!(out[1].0, b"y");
}

#[test]
fn corruption_in_a_source_is_reported() {
    let mut bad = encode_records(&[(b"k", b"v")]);
    bad.truncate(bad.len() - 1);
    let good = encode_records(&[(b"a", b"1")]);

    let mut mi = MergingIterator::new(vec![ChunkIterator::new(&good), ChunkIterator::new(&bad)]);
    while mi.next() {}
    assert!(mi.corrupt());
}

#[test]
fn close_ends_all_sources() {
    let a = encode_records(&[(b"a", b"1")]);
    let mut mi = MergingIterator::new(vec![ChunkIterator::new(&a)]);
    mi.close();
    assert!(!mi.next());
}
