//! Report store location and opening.

use idx_xbrl_data::{DataError, SqliteReportStore};
use std::path::{Path, PathBuf};

/// Get the default data directory.
///
/// Uses platform-specific data directories:
/// - Linux: `~/.local/share/idx-xbrl/`
/// - macOS: `~/Library/Application Support/idx-xbrl/`
/// - Windows: `%APPDATA%\idx-xbrl\`
pub(crate) fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("idx-xbrl")
}

/// Get the default report database path.
pub(crate) fn default_store_path() -> PathBuf {
    default_data_dir().join("reports.db")
}

/// Resolve `--db`, falling back to the default location.
pub(crate) fn store_path(path: Option<&Path>) -> PathBuf {
    path.map_or_else(default_store_path, Path::to_path_buf)
}

/// Open the report store, creating its directory if needed.
pub(crate) fn open_store(path: Option<&Path>) -> Result<SqliteReportStore, DataError> {
    let store_path = store_path(path);

    if let Some(parent) = store_path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }

    SqliteReportStore::new(&store_path)
}
