//! Error types for scrapper.

use thiserror::Error;

/// Common error type for scrapper.
#[derive(Error, Debug)]
pub enum ScrapperError {
    /// Database error.
    ///
    /// Errors from sqlx are converted into this variant.
    #[error("database error: {0}")]
    Database(String),

    /// Database connection error.
    #[error("database connection error: {0}")]
    DatabaseConnection(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Validation error for input data.
    #[error("validation error: {0}")]
    Validation(String),

    /// Resource not found.
    #[error("{0} not found")]
    NotFound(String),

    /// RSS feed error.
    #[error("RSS error: {0}")]
    Rss(String),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl From<sqlx::Error> for ScrapperError {
    fn from(e: sqlx::Error) -> Self {
        ScrapperError::Database(e.to_string())
    }
}

/// Result type alias for scrapper operations.
pub type Result<T> = std::result::Result<T, ScrapperError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validation_error_display() {
        let err = ScrapperError::Validation("feed url is empty".to_string());
        assert_eq!(err.to_string(), "validation error: feed url is empty");
    }

    #[test]
    fn test_not_found_error_display() {
        let err = ScrapperError::NotFound("feed".to_string());
        assert_eq!(err.to_string(), "feed not found");
    }

    #[test]
    fn test_io_error_conversion() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "file not found");
        let err: ScrapperError = io_err.into();
        assert!(matches!(err, ScrapperError::Io(_)));
        assert!(err.to_string().contains("file not found"));
    }

    #[test]
    fn test_sqlx_error_conversion() {
        let err: ScrapperError = sqlx::Error::RowNotFound.into();
        assert!(matches!(err, ScrapperError::Database(_)));
    }

    #[test]
    fn test_config_error_display() {
        let err = ScrapperError::Config("interval must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "configuration error: interval must be positive"
        );
    }
}
