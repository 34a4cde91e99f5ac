use thiserror::Error;

/// Error types for upstream data operations
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API error: {message} (status: {status_code})")]
    Api { status_code: u16, message: String },

    #[error("Parse error: {message}")]
    Parse { message: String },

    #[error("{provider} response is missing field '{field}'")]
    MissingField { provider: String, field: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Data validation error: {field} - {message}")]
    Validation { field: String, message: String },

    #[error("All price sources failed (primary: {primary}; secondary: {secondary})")]
    AllSourcesFailed {
        primary: Box<DataError>,
        secondary: Box<DataError>,
    },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type for data operations
pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Whether the failure is likely to clear up on its own (timeouts,
    /// throttling, server errors) as opposed to a bad key or bad input.
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::Network(_) => true,
            DataError::Api { status_code, .. } => *status_code >= 500 || *status_code == 429,
            DataError::AllSourcesFailed { primary, secondary } => {
                primary.is_transient() || secondary.is_transient()
            }
            _ => false,
        }
    }

    /// Create a parse error with context
    pub fn parse_error<S: Into<String>>(message: S) -> Self {
        DataError::Parse {
            message: message.into(),
        }
    }

    /// Create a validation error with field context
    pub fn validation_error<S: Into<String>>(field: S, message: S) -> Self {
        DataError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an API error with status code
    pub fn api_error<S: Into<String>>(status_code: u16, message: S) -> Self {
        DataError::Api {
            status_code,
            message: message.into(),
        }
    }

    pub fn missing_field<P: Into<String>, F: Into<String>>(provider: P, field: F) -> Self {
        DataError::MissingField {
            provider: provider.into(),
            field: field.into(),
        }
    }
}
