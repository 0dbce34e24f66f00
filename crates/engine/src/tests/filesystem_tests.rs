use crate::filesystem::FsManager;
use crate::Error;
use anyhow::Result;
use std::fs;
use tempfile::tempdir;

#[test]
fn rename_contracts() -> Result<()> {
    let dir = tempdir()?;
    let mut fs_mgr = FsManager::new(dir.path().join("db"), false);
    fs_mgr.open_db()?;

    assert!(matches!(
        fs_mgr.rename_file("missing", "whatever"),
        Err(Error::FileDoesNotExist)
    ));

    fs::write(fs_mgr.file_path("a"), b"x")?;
    fs::write(fs_mgr.file_path("b"), b"y")?;
    assert!(matches!(
        fs_mgr.rename_file("a", "b"),
        Err(Error::FileAlreadyExists)
    ));

    fs_mgr.rename_file("a", "c")?;
    assert!(!fs_mgr.file_path("a").exists());
    assert!(fs_mgr.file_path("c").exists());
    Ok(())
}

#[test]
fn delete_file_is_a_noop_when_absent() -> Result<()> {
    let dir = tempdir()?;
    let mut fs_mgr = FsManager::new(dir.path().join("db"), false);
    fs_mgr.open_db()?;

    fs_mgr.delete_file("never-existed")?;

    fs::write(fs_mgr.file_path("real"), b"x")?;
    fs_mgr.delete_file("real")?;
    assert!(!fs_mgr.file_path("real").exists());
    Ok(())
}

#[test]
fn data_file_ids_filter_and_sort() -> Result<()> {
    let dir = tempdir()?;
    let mut fs_mgr = FsManager::new(dir.path().join("db"), false);
    fs_mgr.open_db()?;

    fs::write(fs_mgr.file_path("2020-01-01T00-00-02.000.data"), b"")?;
    fs::write(fs_mgr.file_path("2020-01-01T00-00-01.000.data"), b"")?;
    fs::write(fs_mgr.file_path("2020-01-01T00-00-01.000.meta"), b"")?;
    fs::write(fs_mgr.file_path("unrelated.txt"), b"")?;

    let ids = fs_mgr.data_file_ids()?;
    assert_eq!(
        ids,
        vec![
            "2020-01-01T00-00-01.000".to_string(),
            "2020-01-01T00-00-02.000".to_string(),
        ]
    );
    Ok(())
}

#[test]
fn segment_ids_are_strictly_increasing() -> Result<()> {
    let dir = tempdir()?;
    let mut fs_mgr = FsManager::new(dir.path().join("db"), false);
    fs_mgr.open_db()?;

    // Same-millisecond bursts must still produce sortable, distinct ids.
    let mut previous = String::new();
    for _ in 0..10 {
        let seg = fs_mgr.new_segment()?;
        assert!(seg.id > previous, "{} !> {}", seg.id, previous);
        previous = seg.id;
    }
    Ok(())
}

#[test]
fn exclusive_lock_excludes_a_second_writer() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("db");

    let mut first = FsManager::new(path.clone(), false);
    first.open_db()?;

    let mut second = FsManager::new(path.clone(), false);
    assert!(matches!(second.open_db(), Err(Error::Timeout)));

    first.close()?;
    let mut third = FsManager::new(path, false);
    third.open_db()?;
    Ok(())
}

#[test]
fn shared_locks_coexist() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("db");

    // Create the directory with a writable manager first.
    let mut writer = FsManager::new(path.clone(), false);
    writer.open_db()?;
    writer.close()?;

    let mut ro1 = FsManager::new(path.clone(), true);
    let mut ro2 = FsManager::new(path, true);
    ro1.open_db()?;
    ro2.open_db()?;
    Ok(())
}

#[test]
fn open_db_is_idempotent() -> Result<()> {
    let dir = tempdir()?;
    let mut fs_mgr = FsManager::new(dir.path().join("db"), false);
    fs_mgr.open_db()?;
    fs_mgr.open_db()?;
    Ok(())
}
