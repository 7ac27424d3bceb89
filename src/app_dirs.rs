//! Centralized application directory paths.
//!
//! Uses the [`dirs`] crate for platform-appropriate directory resolution.
//!
//! # Environment Overrides
//!
//! - `SPEAKSTREAM_DATA_DIR` overrides [`data_dir`]
//! - `SPEAKSTREAM_CONFIG_DIR` overrides [`config_dir`]

use std::path::PathBuf;

/// Application data root directory.
///
/// Holds the persisted key-value store (transcriptions, corrected text).
#[must_use]
pub fn data_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SPEAKSTREAM_DATA_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::data_dir()
        .map(|d| d.join("speakstream"))
        .unwrap_or_else(|| PathBuf::from("/tmp/speakstream-data"))
}

/// Application config directory (`config.toml`).
#[must_use]
pub fn config_dir() -> PathBuf {
    if let Some(override_dir) = std::env::var_os("SPEAKSTREAM_CONFIG_DIR") {
        return PathBuf::from(override_dir);
    }
    dirs::config_dir()
        .map(|d| d.join("speakstream"))
        .unwrap_or_else(|| PathBuf::from("/tmp/speakstream-config"))
}

/// Default key-value store file (`data_dir()/store.json`).
#[must_use]
pub fn store_file() -> PathBuf {
    data_dir().join("store.json")
}
