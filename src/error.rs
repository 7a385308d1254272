use std::fmt::Display;

/// Represents the category of error that can occur in the gateway.
///
/// This enum is used to classify errors for easier handling and reporting.
/// Each variant corresponds to a broad class of errors that may arise during
/// startup, configuration, or policy updates.
///
/// # Variants
///
/// - `IO`: An input/output error, typically from file or network operations.
/// - `ParseError`: An error occurred while parsing data (e.g., the config file).
/// - `InvalidInput`: The input provided was invalid or malformed.
/// - `NotFound`: The requested resource was not found.
#[derive(Debug, PartialEq, Eq)]
pub enum GatewayErrorKind {
    /// An input/output error, such as file or network failure.
    IO,
    /// An error occurred while parsing data.
    ParseError,
    /// The input provided was invalid or malformed.
    InvalidInput,
    /// The requested resource was not found.
    NotFound,
}

impl Display for GatewayErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GatewayErrorKind::IO => write!(f, "IO error"),
            GatewayErrorKind::ParseError => write!(f, "Parse error"),
            GatewayErrorKind::InvalidInput => write!(f, "Invalid input"),
            GatewayErrorKind::NotFound => write!(f, "Not found"),
        }
    }
}

/// A structured error type for failures outside the request path.
///
/// `GatewayError` encapsulates both the kind of error (using
/// [`GatewayErrorKind`]) and a human-readable message. Request handling never
/// surfaces one of these to a client; they are produced by configuration
/// loading and policy validation, where the caller decides whether to fall
/// back to defaults or reject the update.
#[derive(Debug, PartialEq, Eq)]
pub struct GatewayError {
    /// The category or type of error.
    pub kind: GatewayErrorKind,
    /// A human-readable error message.
    pub message: String,
}

impl GatewayError {
    /// Creates a new `GatewayError` with the specified kind and message.
    pub fn new(kind: GatewayErrorKind, message: String) -> Self {
        Self { kind, message }
    }

    /// Returns a reference to the error message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns a reference to the error kind.
    pub fn kind(&self) -> &GatewayErrorKind {
        &self.kind
    }
}

impl Display for GatewayError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "GatewayError: {{ message: {}, kind: {} }}",
            self.message, self.kind
        )
    }
}

impl std::error::Error for GatewayError {}

impl From<std::io::Error> for GatewayError {
    fn from(err: std::io::Error) -> Self {
        Self {
            kind: GatewayErrorKind::IO,
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    fn from(err: serde_json::Error) -> Self {
        Self {
            kind: GatewayErrorKind::ParseError,
            message: err.to_string(),
        }
    }
}

impl From<url::ParseError> for GatewayError {
    fn from(err: url::ParseError) -> Self {
        Self {
            kind: GatewayErrorKind::InvalidInput,
            message: err.to_string(),
        }
    }
}
