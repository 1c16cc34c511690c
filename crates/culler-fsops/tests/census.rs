#![cfg(unix)]

use std::fs;

use culler_fsops::{FsOpsError, LinkCounter, UnixLinkCounter, platform_link_counter};
use tokio_util::sync::CancellationToken;

#[test]
fn single_link_counts_as_unlinked() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let file = dir.path().join("movie.mkv");
    fs::write(&file, b"data")?;

    let counter = platform_link_counter();
    assert_eq!(counter.hard_link_count(&file, false), 0);

    fs::hard_link(&file, dir.path().join("library.mkv"))?;
    assert_eq!(counter.hard_link_count(&file, false), 1);
    Ok(())
}

#[test]
fn links_inside_ignored_root_are_subtracted() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let ignored = dir.path().join("cross-seed");
    let downloads = dir.path().join("downloads");
    let library = dir.path().join("library");
    fs::create_dir_all(ignored.join("nested"))?;
    fs::create_dir_all(&downloads)?;
    fs::create_dir_all(&library)?;

    let original = downloads.join("show.mkv");
    fs::write(&original, b"episode")?;
    fs::hard_link(&original, ignored.join("show.mkv"))?;
    fs::hard_link(&original, ignored.join("nested/show.mkv"))?;

    let counter = UnixLinkCounter::new();
    let recorded = counter.populate_file_counts(&ignored, &CancellationToken::new())?;
    assert_eq!(recorded, 2);
    assert_eq!(counter.hard_link_count(&original, true), 1);

    fs::hard_link(&original, library.join("show.mkv"))?;
    assert_eq!(counter.hard_link_count(&original, true), 2);
    Ok(())
}

#[test]
fn missing_files_report_sentinel() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let counter = UnixLinkCounter::new();
    assert_eq!(counter.hard_link_count(&dir.path().join("gone.mkv"), false), -1);
    assert_eq!(counter.hard_link_count(&dir.path().join("gone.mkv"), true), -1);
    Ok(())
}

#[test]
fn missing_root_is_invalid_input() {
    let counter = UnixLinkCounter::new();
    let result =
        counter.populate_file_counts("/definitely/not/here".as_ref(), &CancellationToken::new());
    assert!(matches!(
        result,
        Err(FsOpsError::InvalidInput { field: "root", .. })
    ));
}

#[test]
fn cancelled_census_records_nothing() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    fs::write(dir.path().join("a.mkv"), b"a")?;
    let token = CancellationToken::new();
    token.cancel();

    let counter = UnixLinkCounter::new();
    assert_eq!(counter.populate_file_counts(dir.path(), &token)?, 0);
    Ok(())
}
