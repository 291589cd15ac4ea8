//! Error types for queued HTTP requests.
//!
//! Every failure that can reach a [`ResponseListener`](crate::ResponseListener)
//! is an [`Error`]. Errors keep the raw response text and HTTP details when
//! they exist, and [`Error::kind`] groups them into the coarse categories
//! callers usually branch on.

use http::{HeaderMap, StatusCode};

/// Display text of [`Error::NoConnection`].
pub const NO_CONNECTION: &str = "noConnection";

/// The main error type for queued requests.
///
/// # Examples
///
/// ```
/// use callqueue::{Error, ErrorKind};
///
/// let err = Error::NoConnection;
/// assert_eq!(err.to_string(), "noConnection");
/// assert_eq!(err.kind(), ErrorKind::NoConnection);
/// ```
#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// The connectivity gate reported no network when the client was built.
    #[error("noConnection")]
    NoConnection,

    /// A network-level error occurred (connection refused, DNS failure, etc.).
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// An attempt did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,

    /// The server answered with a non-2xx status code.
    #[error("HTTP error {status}: {raw_response}")]
    HttpError {
        /// The HTTP status code
        status: StatusCode,
        /// The raw response body
        raw_response: String,
        /// The response headers
        headers: HeaderMap,
    },

    /// Every attempt allowed by the retry policy failed.
    #[error("Max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded {
        /// The number of attempts made
        attempts: usize,
        /// The last error encountered
        last_error: Box<Error>,
    },

    /// The response body was not valid JSON.
    #[error("Failed to parse response: {serde_error}")]
    Parse {
        /// The body that failed to parse
        raw_response: String,
        /// The serde error message
        serde_error: String,
    },

    /// The request body could not be serialized to JSON.
    #[error("Failed to encode request body: {0}")]
    Encoding(String),

    /// An invalid URL was provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Invalid configuration was provided.
    #[error("Configuration error: {0}")]
    ConfigurationError(String),

    /// The request queue was stopped before the request could run.
    #[error("Request queue is stopped")]
    QueueStopped,
}

/// Coarse classification of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No network was available at client construction.
    NoConnection,
    /// Network, timeout, or HTTP status failure surfaced by the transport.
    Transport,
    /// Request body serialization failed.
    Encoding,
    /// Response body was not valid JSON.
    Parse,
    /// Invalid URL, header, or client setup.
    Configuration,
}

impl Error {
    /// Returns the category this error belongs to.
    ///
    /// # Examples
    ///
    /// ```
    /// use callqueue::{Error, ErrorKind};
    ///
    /// let err = Error::MaxRetriesExceeded {
    ///     attempts: 2,
    ///     last_error: Box::new(Error::Timeout),
    /// };
    /// assert_eq!(err.kind(), ErrorKind::Transport);
    /// ```
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoConnection => ErrorKind::NoConnection,
            Error::Network(_)
            | Error::Timeout
            | Error::HttpError { .. }
            | Error::MaxRetriesExceeded { .. }
            | Error::QueueStopped => ErrorKind::Transport,
            Error::Parse { .. } => ErrorKind::Parse,
            Error::Encoding(_) => ErrorKind::Encoding,
            Error::InvalidUrl(_) | Error::ConfigurationError(_) => ErrorKind::Configuration,
        }
    }

    /// Returns `true` if this error is potentially retryable.
    ///
    /// Network errors, timeouts, and 5xx/429 HTTP errors are considered
    /// retryable. Everything else is final.
    ///
    /// # Examples
    ///
    /// ```
    /// use callqueue::Error;
    /// use http::StatusCode;
    ///
    /// let err = Error::HttpError {
    ///     status: StatusCode::SERVICE_UNAVAILABLE,
    ///     raw_response: String::new(),
    ///     headers: http::HeaderMap::new(),
    /// };
    /// assert!(err.is_retryable());
    /// assert!(!Error::NoConnection.is_retryable());
    /// ```
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::Network(e) => !e.is_builder(),
            Error::Timeout => true,
            Error::HttpError { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            _ => false,
        }
    }

    /// Returns `true` if this error, or the last error behind an exhausted
    /// retry budget, is a timeout.
    pub fn is_timeout(&self) -> bool {
        match self {
            Error::Timeout => true,
            Error::Network(e) => e.is_timeout(),
            Error::MaxRetriesExceeded { last_error, .. } => last_error.is_timeout(),
            _ => false,
        }
    }

    /// Returns the HTTP status code if this error has one.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::HttpError { status, .. } => Some(*status),
            Error::MaxRetriesExceeded { last_error, .. } => last_error.status(),
            _ => None,
        }
    }

    /// Returns the raw response body if this error has one.
    pub fn raw_response(&self) -> Option<&str> {
        match self {
            Error::HttpError { raw_response, .. } => Some(raw_response),
            Error::Parse { raw_response, .. } => Some(raw_response),
            Error::MaxRetriesExceeded { last_error, .. } => last_error.raw_response(),
            _ => None,
        }
    }
}

/// A specialized `Result` type for this crate.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_connection_display_matches_constant() {
        assert_eq!(Error::NoConnection.to_string(), NO_CONNECTION);
    }

    #[test]
    fn test_kind_groups_transport_failures() {
        let http = Error::HttpError {
            status: StatusCode::NOT_FOUND,
            raw_response: "missing".to_string(),
            headers: HeaderMap::new(),
        };
        assert_eq!(http.kind(), ErrorKind::Transport);
        assert_eq!(Error::Timeout.kind(), ErrorKind::Transport);
        assert_eq!(Error::QueueStopped.kind(), ErrorKind::Transport);
        assert_eq!(Error::Encoding("x".into()).kind(), ErrorKind::Encoding);
        assert_eq!(
            Error::Parse {
                raw_response: "nope".into(),
                serde_error: "expected value".into(),
            }
            .kind(),
            ErrorKind::Parse
        );
    }

    #[test]
    fn test_exhausted_retries_expose_last_error_details() {
        let err = Error::MaxRetriesExceeded {
            attempts: 2,
            last_error: Box::new(Error::HttpError {
                status: StatusCode::BAD_GATEWAY,
                raw_response: "upstream".to_string(),
                headers: HeaderMap::new(),
            }),
        };
        assert_eq!(err.status(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(err.raw_response(), Some("upstream"));
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_client_errors_are_not_retryable() {
        let err = Error::HttpError {
            status: StatusCode::BAD_REQUEST,
            raw_response: String::new(),
            headers: HeaderMap::new(),
        };
        assert!(!err.is_retryable());
    }
}
