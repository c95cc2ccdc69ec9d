//! Error types for configuration loading.

/// Errors that can occur while loading or validating `kiln.toml`.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    /// The configuration file is not valid TOML or has the wrong shape.
    #[error("failed to parse kiln.toml: {0}")]
    ParseError(String),

    /// A required field is missing or empty.
    #[error("missing required field: {0}")]
    MissingField(String),

    /// A field holds a value outside its allowed range.
    #[error("invalid value for {field}: {reason}")]
    InvalidValue {
        /// The dotted field path.
        field: String,
        /// Description of why the value is invalid.
        reason: String,
    },
}
