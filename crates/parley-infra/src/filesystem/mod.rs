//! Data directory layout for Parley.
//!
//! Everything Parley keeps on disk (`config.toml`, `parley.db`) lives in a
//! single directory: `$PARLEY_DATA_DIR` when set, otherwise `~/.parley`.

use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory.
pub const DATA_DIR_VAR: &str = "PARLEY_DATA_DIR";

/// Resolve the data directory without touching the filesystem.
pub fn resolve_data_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(DATA_DIR_VAR).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".parley")
}

/// Create `data_dir` (and parents) if it does not exist yet.
pub async fn ensure_data_dir(data_dir: &Path) -> Result<(), std::io::Error> {
    tokio::fs::create_dir_all(data_dir).await?;
    tracing::debug!(path = %data_dir.display(), "data directory ready");
    Ok(())
}
