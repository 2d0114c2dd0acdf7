//! Input, marker and config integration tests.
//!
//! Every test gets its own `assert_fs::TempDir`; nothing touches the real home.

use assert_fs::prelude::*;
use pooldl_core::{
    config, marker,
    types::{sanitize_pool_name, PoolId},
    CoreError, PoolTarget,
};
use predicates::prelude::predicate;
use rstest::rstest;

// ---------------------------------------------------------------------------
// 1. Input forms
// ---------------------------------------------------------------------------

#[rstest]
#[case("1234", 1234)]
#[case("https://e621.net/pools/1234", 1234)]
#[case("https://e621.net/pools/55#top", 55)]
#[case("https://e621.net/pool/show/9", 9)]
#[case("e621.net/pools/31337/", 31337)]
fn id_and_url_inputs(#[case] input: &str, #[case] expected: u64) {
    assert_eq!(
        PoolTarget::parse(input).unwrap(),
        PoolTarget::Id(PoolId(expected))
    );
}

#[rstest]
#[case("")]
#[case("not a pool")]
#[case("https://e621.net/pools/")]
#[case("https://e621.net/pools/x12")]
fn unusable_inputs(#[case] input: &str) {
    let err = PoolTarget::parse(input).unwrap_err();
    assert!(matches!(err, CoreError::InvalidInput(_)), "got: {err}");
}

// ---------------------------------------------------------------------------
// 2. Directory targets and the marker file
// ---------------------------------------------------------------------------

#[test]
fn synced_directory_round_trips_through_marker() {
    let pool_dir = assert_fs::TempDir::new().expect("tempdir");
    assert!(marker::write_if_absent_at(pool_dir.path(), PoolId(4242)).unwrap());
    pool_dir
        .child(".poolinfo")
        .assert(predicate::str::contains("ID=4242"));

    let target = PoolTarget::parse(pool_dir.path().to_str().unwrap()).unwrap();
    assert_eq!(target.pool_id().unwrap(), PoolId(4242));
}

#[test]
fn hand_edited_marker_with_extra_keys_still_resolves() {
    let pool_dir = assert_fs::TempDir::new().expect("tempdir");
    pool_dir
        .child(".poolinfo")
        .write_str("; written by hand\nNAME=Some Pool\nID=17\n")
        .unwrap();

    let target = PoolTarget::Directory(pool_dir.path().to_path_buf());
    assert_eq!(target.pool_id().unwrap(), PoolId(17));
}

#[test]
fn marker_without_id_names_the_file() {
    let pool_dir = assert_fs::TempDir::new().expect("tempdir");
    pool_dir.child(".poolinfo").write_str("NAME=x\n").unwrap();

    let err = PoolTarget::Directory(pool_dir.path().to_path_buf())
        .pool_id()
        .unwrap_err();
    assert!(matches!(err, CoreError::MarkerMissingId { .. }), "got: {err}");
    assert!(err.to_string().contains(".poolinfo"));
}

// ---------------------------------------------------------------------------
// 3. Config
// ---------------------------------------------------------------------------

#[test]
fn config_file_is_read_from_dot_pooldl() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    let file = home.child(".pooldl/config.yaml");
    file.write_str("LOGIN: alice\nAPI_KEY: key\n").unwrap();
    file.assert(predicate::path::exists());

    let cfg = config::load_at(home.path()).unwrap();
    assert_eq!(cfg.login.as_deref(), Some("alice"));
    assert_eq!(cfg.api_key.as_deref(), Some("key"));
    assert!(cfg.prefetch);
}

#[test]
fn empty_config_file_means_defaults() {
    let home = assert_fs::TempDir::new().expect("tempdir");
    home.child(".pooldl/config.yaml").write_str("\n").unwrap();
    assert_eq!(config::load_at(home.path()).unwrap(), config::Config::default());
}

// ---------------------------------------------------------------------------
// 4. Directory naming
// ---------------------------------------------------------------------------

#[rstest]
#[case("Simple", Some("Simple"))]
#[case("two_words", Some("two words"))]
#[case("a__b", Some("a b"))]
#[case("Ünïcode_Pool", Some("ncode Pool"))]
#[case("???", None)]
fn pool_names_become_directory_names(#[case] raw: &str, #[case] expected: Option<&str>) {
    assert_eq!(sanitize_pool_name(raw).as_deref(), expected);
}
