use thiserror::Error;

#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Migration error: {0}")]
    Migration(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, HistoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_error_names_the_column() {
        let err = HistoryError::Migration("adding column input: disk I/O error".to_string());
        assert_eq!(
            err.to_string(),
            "Migration error: adding column input: disk I/O error"
        );
    }
}
