//! Error types for calls to the calendar API.

use thiserror::Error;

/// Error type for HTTP operations.
///
/// Describes what went wrong without dictating recovery strategy.
#[derive(Debug, Error)]
pub enum HttpError {
    /// Network connection failed.
    ///
    /// This includes DNS resolution failures and refused or reset
    /// connections before a status line arrived.
    #[error("Connection error: {0}")]
    Connection(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// Request timed out.
    #[error("Request timed out")]
    Timeout,

    /// The request could not be sent as built.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// A queued message that cannot be turned into an HTTP request.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The message carries a method that is not a valid HTTP token.
    #[error("Invalid HTTP method '{0}'")]
    InvalidMethod(String),

    /// Root URL plus message path does not form a valid URL.
    #[error("Invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL string
        url: String,
        /// Reason for invalidity
        reason: String,
    },
}

impl HttpError {
    /// Returns true if the calendar API is probably unreachable rather
    /// than the request being unusable.
    #[must_use]
    pub const fn is_unreachable(&self) -> bool {
        match self {
            Self::Connection(_) | Self::Timeout => true,
            Self::InvalidRequest(_) => false,
        }
    }
}
