//! Default on-disk location for the history database.

use std::path::PathBuf;

use crate::error::Result;

/// Environment variable overriding the database location.
pub const HISTORY_PATH_ENV: &str = "GRIMOIRE_HISTORY_PATH";

/// Resolve the history database path.
///
/// Honors `GRIMOIRE_HISTORY_PATH` when set; otherwise uses the platform
/// data directory (`~/.local/share/grimoire/history.db` on Linux). Parent
/// directories are created as needed.
pub fn default_path() -> Result<PathBuf> {
    let path = match std::env::var_os(HISTORY_PATH_ENV) {
        Some(custom) => PathBuf::from(custom),
        None => {
            let base = dirs::data_dir()
                .or_else(|| dirs::home_dir().map(|h| h.join(".local/share")))
                .ok_or_else(|| {
                    std::io::Error::new(std::io::ErrorKind::NotFound, "no data directory available")
                })?;
            base.join("grimoire").join("history.db")
        }
    };

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_path_ends_with_db_file() {
        // Only checks the non-overridden shape; the env override is a plain
        // passthrough exercised by integration setups.
        if std::env::var_os(HISTORY_PATH_ENV).is_none() {
            let path = default_path().unwrap();
            assert!(path.ends_with("grimoire/history.db"));
        }
    }
}
