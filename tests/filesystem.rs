// tests/filesystem.rs

use std::path::{Path, PathBuf};
use std::sync::Arc;

use devloop::fs::mock::MockFileSystem;
use devloop::fs::{write_if_changed, FileSystem, SubTree};

type TestResult = Result<(), Box<dyn std::error::Error>>;

#[test]
fn sub_tree_speaks_relative_paths() -> TestResult {
    let fs = MockFileSystem::new();
    fs.add_file("/site/static/public/css/a.css", b"a".to_vec());
    fs.add_file("/site/static/public/logo.png", b"png".to_vec());
    let tree = SubTree::new(Arc::new(fs.clone()), "/site/static/public");

    let mut top = tree.read_dir(Path::new(""))?;
    top.sort();
    assert_eq!(top, vec![PathBuf::from("css"), PathBuf::from("logo.png")]);
    assert!(tree.is_dir(Path::new("css")));
    assert_eq!(tree.read(Path::new("css/a.css"))?, b"a");
    assert_eq!(tree.resolve(Path::new("css")), PathBuf::from("/site/static/public/css"));

    tree.write(Path::new("new.txt"), b"n")?;
    assert!(fs.is_file(Path::new("/site/static/public/new.txt")));
    Ok(())
}

#[test]
fn unchanged_contents_are_not_rewritten() -> TestResult {
    let fs = MockFileSystem::new();
    let path = Path::new("/out/normal.txt");

    assert!(write_if_changed(&fs, path, b"v1")?);
    assert!(!write_if_changed(&fs, path, b"v1")?);
    assert!(write_if_changed(&fs, path, b"v2")?);
    assert_eq!(fs.writes(), 2);
    Ok(())
}
