use std::fmt;

/// Crate-wide failure. Pipeline fallbacks never surface as an `AppError`;
/// only failures that end a run or reject a request do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppError {
    /// Rejected input. The only variant that maps to a client error.
    ValidationError(String),
    ConfigError(String),
    /// Malformed answer snapshot or model response.
    ParseError(String),
    /// Fatal completion failure.
    LLMError(String),
    ConnectionError(String),
    DatabaseError(String),
    IoError(String),
}

impl AppError {
    pub fn is_client_error(&self) -> bool {
        matches!(self, AppError::ValidationError(_))
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::ValidationError(msg) => write!(f, "Invalid request: {}", msg),
            AppError::ConfigError(msg) => write!(f, "Configuration error: {}", msg),
            AppError::ParseError(msg) => write!(f, "Parse error: {}", msg),
            AppError::LLMError(msg) => write!(f, "Completion service error: {}", msg),
            AppError::ConnectionError(msg) => write!(f, "Database connection error: {}", msg),
            AppError::DatabaseError(msg) => write!(f, "Database error: {}", msg),
            AppError::IoError(msg) => write!(f, "IO error: {}", msg),
        }
    }
}

impl std::error::Error for AppError {}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::IoError(err.to_string())
    }
}

impl From<figment::Error> for AppError {
    fn from(err: figment::Error) -> Self {
        AppError::ConfigError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::ValidationError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_validation_is_client_error() {
        assert!(AppError::ValidationError("too long".to_string()).is_client_error());
        assert!(!AppError::DatabaseError("boom".to_string()).is_client_error());
        assert!(!AppError::LLMError("bad key".to_string()).is_client_error());
    }

    #[test]
    fn test_display_keeps_message() {
        let err = AppError::LLMError("invalid api key".to_string());
        assert_eq!(err.to_string(), "Completion service error: invalid api key");
    }
}
