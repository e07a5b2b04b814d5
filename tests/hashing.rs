// tests/hashing.rs

mod common;

use std::path::Path;

use proptest::prelude::*;

use devloop::assets::{
    compute_file_hash, content_hash, hashed_name, identifier_for_digest, output_identifier,
    SHORT_HASH_LEN,
};
use devloop::fs::mock::MockFileSystem;

#[test]
fn identifier_flattens_directories_and_keeps_extension() {
    let id = output_identifier("images/icons/logo.png", b"png bytes");
    let short = &content_hash(b"png bytes")[..SHORT_HASH_LEN];
    assert_eq!(id, format!("images_icons_logo_{short}.png"));
}

#[test]
fn identifier_without_extension_and_dotfiles() {
    let short = &content_hash(b"x")[..SHORT_HASH_LEN];
    assert_eq!(output_identifier("LICENSE", b"x"), format!("LICENSE_{short}"));
    assert_eq!(output_identifier("dir/.env", b"x"), format!("dir_.env_{short}"));
    assert_eq!(output_identifier("a.b/c", b"x"), format!("a.b_c_{short}"));
}

#[test]
fn backslash_paths_give_the_same_identifier() {
    assert_eq!(
        output_identifier("img\\a.png", b"1"),
        output_identifier("img/a.png", b"1")
    );
}

#[test]
fn hashed_name_shape() {
    let name = hashed_name("normal", Some("css"), b"p{}");
    assert!(name.starts_with("normal_"));
    assert!(name.ends_with(".css"));
    assert_eq!(name.len(), "normal_".len() + SHORT_HASH_LEN + ".css".len());
}

#[test]
fn streamed_file_hash_matches_in_memory_hash() {
    let fs = MockFileSystem::new();
    fs.add_file("test.txt", b"hello world");

    let hash = compute_file_hash(&fs, Path::new("test.txt")).unwrap();
    // blake3 hash of "hello world"
    assert_eq!(hash, "d74981efa70a0c880b8d8c1985d075dbcbf679b99a5f9914e5aaf96b831a9e24");
    assert_eq!(hash, content_hash(b"hello world"));
    assert_eq!(
        identifier_for_digest("css/site.css", &hash),
        output_identifier("css/site.css", b"hello world")
    );
}

proptest! {
    #[test]
    fn identifier_is_deterministic(path in "[a-z]{1,8}(/[a-z]{1,8}){0,3}\\.[a-z]{1,4}", bytes in proptest::collection::vec(any::<u8>(), 0..256)) {
        prop_assert_eq!(output_identifier(&path, &bytes), output_identifier(&path, &bytes));
    }

    #[test]
    fn different_content_gives_different_identifier(
        a in proptest::collection::vec(any::<u8>(), 0..128),
        b in proptest::collection::vec(any::<u8>(), 0..128),
    ) {
        prop_assume!(a != b);
        prop_assert_ne!(output_identifier("app.js", &a), output_identifier("app.js", &b));
    }
}
