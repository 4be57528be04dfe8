//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Config error: {0}")]
    Config(String),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Column conflict: cannot rename '{from}' to '{to}', '{to}' already exists")]
    ColumnConflict { from: String, to: String },

    #[error("Invalid keyword grid: {0}")]
    InvalidKeywordGrid(String),
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let error = Error::Io(io_error);
        let display = format!("{}", error);
        assert!(display.contains("IO error"));
        assert!(display.contains("file not found"));
    }

    #[test]
    fn test_error_display_missing_column() {
        let error = Error::MissingColumn("Start Page".to_string());
        assert_eq!(format!("{}", error), "Missing column: Start Page");
    }

    #[test]
    fn test_error_display_column_conflict() {
        let error = Error::ColumnConflict {
            from: "Authors".to_string(),
            to: "author".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("'Authors'"));
        assert!(display.contains("'author' already exists"));
    }

    #[test]
    fn test_error_from_io() {
        let io_error = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "access denied");
        let error: Error = io_error.into();
        assert!(matches!(error, Error::Io(_)));
    }

    #[test]
    fn test_error_from_json() {
        let json_error = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let error: Error = json_error.into();
        assert!(matches!(error, Error::Json(_)));
    }

    #[test]
    fn test_error_debug() {
        let error = Error::InvalidKeywordGrid("3 rows".to_string());
        let debug = format!("{:?}", error);
        assert!(debug.contains("InvalidKeywordGrid"));
        assert!(debug.contains("3 rows"));
    }
}
