use super::helpers::{plant_segment, rw};
use crate::{Database, Error, TOMBSTONE};
use anyhow::Result;
use tempfile::tempdir;

#[test]
fn newer_segment_shadows_older() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(
        &db_dir,
        "2020-01-01T00-00-00.000",
        &[(b"a", b"old-a"), (b"b", b"old-b")],
    );
    plant_segment(&db_dir, "2020-01-01T00-00-01.000", &[(b"a", b"new-a")]);

    let db = Database::open(&db_dir, rw())?;
    assert_eq!(db.get(b"a")?, b"new-a");
    assert_eq!(db.get(b"b")?, b"old-b");
    Ok(())
}

#[test]
fn tombstone_in_newer_segment_hides_older_value() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(&db_dir, "2020-01-01T00-00-00.000", &[(b"k", b"live")]);
    plant_segment(&db_dir, "2020-01-01T00-00-01.000", &[(b"k", TOMBSTONE)]);

    let db = Database::open(&db_dir, rw())?;
    assert!(matches!(db.get(b"k"), Err(Error::KeyNotFound)));
    Ok(())
}

#[test]
fn memtable_tombstone_hides_segment_value() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(&db_dir, "2020-01-01T00-00-00.000", &[(b"k", b"live")]);

    let mut db = Database::open(&db_dir, rw())?;
    assert_eq!(db.get(b"k")?, b"live");
    db.delete(b"k")?;
    assert!(matches!(db.get(b"k"), Err(Error::KeyNotFound)));
    Ok(())
}

// --------------------- Range scans ---------------------

#[test]
fn range_within_one_segment() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(
        &db_dir,
        "2020-01-01T00-00-00.000",
        &[
            (b"a", b"1"),
            (b"b", b"2"),
            (b"c", b"3"),
            (b"d", b"4"),
            (b"e", b"5"),
        ],
    );

    let db = Database::open(&db_dir, rw())?;
    let mut cursor = db.range(b"b", b"d")?;

    let mut keys = Vec::new();
    while cursor.next() {
        keys.push(cursor.key().to_vec());
    }
    assert_eq!(keys, vec![b"b".to_vec(), b"c".to_vec(), b"d".to_vec()]);

    // Cursor keys are non-descending by construction; verify anyway.
    for pair in keys.windows(2) {
        assert!(pair[0] < pair[1]);
    }
    cursor.close();
    Ok(())
}

#[test]
fn range_with_start_after_end_is_invalid() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(&db_dir, "2020-01-01T00-00-00.000", &[(b"a", b"1")]);

    let db = Database::open(&db_dir, rw())?;
    assert!(matches!(db.range(b"z", b"a"), Err(Error::InvalidRange)));
    Ok(())
}

#[test]
fn range_across_segments_is_a_range_error() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(&db_dir, "2020-01-01T00-00-00.000", &[(b"a", b"1"), (b"b", b"2")]);
    plant_segment(&db_dir, "2020-01-01T00-00-01.000", &[(b"y", b"25"), (b"z", b"26")]);

    let db = Database::open(&db_dir, rw())?;
    assert!(matches!(db.range(b"a", b"z"), Err(Error::RangeError)));
    Ok(())
}

#[test]
fn range_with_absent_bound_is_not_found() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(&db_dir, "2020-01-01T00-00-00.000", &[(b"a", b"1")]);

    let db = Database::open(&db_dir, rw())?;
    assert!(matches!(db.range(b"a", b"nope"), Err(Error::KeyNotFound)));
    Ok(())
}

#[test]
fn range_rejects_empty_bounds() -> Result<()> {
    let dir = tempdir()?;
    let db = Database::open(dir.path().join("db"), rw())?;
    assert!(matches!(db.range(b"", b"x"), Err(Error::KeyRequired)));
    assert!(matches!(db.range(b"x", b""), Err(Error::KeyRequired)));
    Ok(())
}

#[test]
fn range_values_come_from_the_segment() -> Result<()> {
    let dir = tempdir()?;
    let db_dir = dir.path().join("db");
    plant_segment(
        &db_dir,
        "2020-01-01T00-00-00.000",
        &[(b"j", b"10"), (b"k", b"11"), (b"l", b"12")],
    );

    let db = Database::open(&db_dir, rw())?;
    let mut cursor = db.range(b"j", b"l")?;
    let mut out = Vec::new();
    while cursor.next() {
        out.push((cursor.key().to_vec(), cursor.value().to_vec()));
    }
    assert_eq!(
        out,
        vec![
            (b"j".to_vec(), b"10".to_vec()),
            (b"k".to_vec(), b"11".to_vec()),
            (b"l".to_vec(), b"12".to_vec()),
        ]
    );
    Ok(())
}
