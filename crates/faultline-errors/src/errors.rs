use thiserror::Error;

/// Result type alias using FaultlineError
pub type Result<T> = std::result::Result<T, FaultlineError>;

/// Failures of the library itself
///
/// These describe misuse of the pool or configuration and encoding problems.
/// They are distinct from [`crate::DomainError`], which is the value the
/// library builds for its callers.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum FaultlineError {
    /// A pool configuration value is out of range
    #[error("Invalid pool configuration: {field} {reason}")]
    InvalidConfig { field: &'static str, reason: String },

    /// Configuration text could not be parsed
    #[error("Configuration parse error: {message}")]
    ConfigParse { message: String },

    /// JSON encoding or decoding failed
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// An instance handed back to the pool is still referenced elsewhere
    #[error("Instance still shared by {references} handles; not recycled")]
    SharedInstance { references: usize },
}

impl FaultlineError {
    /// Stable code for programmatic matching
    pub fn code(&self) -> &'static str {
        match self {
            FaultlineError::InvalidConfig { .. } => "ERR_INVALID_CONFIG",
            FaultlineError::ConfigParse { .. } => "ERR_CONFIG_PARSE",
            FaultlineError::Serialization { .. } => "ERR_SERIALIZATION",
            FaultlineError::SharedInstance { .. } => "ERR_SHARED_INSTANCE",
        }
    }
}

impl From<serde_json::Error> for FaultlineError {
    fn from(err: serde_json::Error) -> Self {
        FaultlineError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<toml::de::Error> for FaultlineError {
    fn from(err: toml::de::Error) -> Self {
        FaultlineError::ConfigParse {
            message: err.to_string(),
        }
    }
}
