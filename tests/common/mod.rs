use std::path::PathBuf;

/// `tests/fixtures/config`, the config root shipped with the test suite.
pub fn config_root() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests").join("fixtures").join("config")
}
