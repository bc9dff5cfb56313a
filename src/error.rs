//! Error types for the CircleCI provider.

use thiserror::Error;

use crate::schema::Diagnostic;

/// Result alias used throughout the crate.
pub type Result<T, E = ProviderError> = std::result::Result<T, E>;

/// Errors that can occur while talking to CircleCI or managing resources.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The remote entity does not exist.
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// A non-upsert create found an existing entity.
    #[error("Resource already exists: {0}")]
    AlreadyExists(String),

    /// A composite identifier could not be decomposed.
    #[error("{0}")]
    MalformedId(String),

    /// The API answered with a non-success status other than 404.
    #[error("CircleCI API returned {status}: {body}")]
    Remote {
        /// HTTP status code.
        status: u16,
        /// Response body, possibly truncated.
        body: String,
    },

    /// The HTTP request itself failed (connect, timeout, decode).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// A serialization/deserialization error occurred.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The configured API URL is not usable.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// A validation error occurred.
    #[error("Validation error: {0}")]
    Validation(String),

    /// A configuration error occurred.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// The requested resource or data source type is unknown.
    #[error("Unknown resource type: {0}")]
    UnknownResource(String),

    /// Operation not supported for this resource type.
    #[error("Unimplemented: {0}")]
    Unimplemented(String),

    /// Another error with an operation prefix.
    #[error("{context}: {source}")]
    Context {
        /// What was being attempted.
        context: String,
        /// The underlying failure.
        #[source]
        source: Box<ProviderError>,
    },
}

impl ProviderError {
    /// Wrap this error with an operation prefix, e.g. `failed to delete context`.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Self::Context {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Whether this error, or any error it wraps, means the entity is absent.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound(_) => true,
            Self::Context { source, .. } => source.is_not_found(),
            _ => false,
        }
    }

    /// Whether this error, or any error it wraps, is a create conflict.
    pub fn is_already_exists(&self) -> bool {
        match self {
            Self::AlreadyExists(_) => true,
            Self::Context { source, .. } => source.is_already_exists(),
            _ => false,
        }
    }

    /// The innermost error, skipping context wrappers.
    pub fn root_cause(&self) -> &ProviderError {
        match self {
            Self::Context { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

/// Extension for attaching an operation prefix to fallible results.
pub trait ResultExt<T> {
    /// Wrap the error, if any, with `context`.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|err| err.with_context(context))
    }
}

impl From<ProviderError> for Diagnostic {
    fn from(err: ProviderError) -> Self {
        let summary = match err.root_cause() {
            ProviderError::NotFound(_) => "Resource not found",
            ProviderError::AlreadyExists(_) => "Resource already exists",
            ProviderError::MalformedId(_) => "Invalid resource ID",
            ProviderError::Remote { .. } | ProviderError::Http(_) => "CircleCI API request failed",
            ProviderError::Configuration(_) => "Invalid provider configuration",
            ProviderError::Validation(_) => "Invalid configuration",
            _ => "Provider error",
        };
        Diagnostic::error(summary).with_detail(err.to_string())
    }
}
