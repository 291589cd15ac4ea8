//! Successful transport responses.
//!
//! The [`Response`] type carries the body a transport produced together with
//! metadata about the HTTP exchange, so adapters can log timing and retry
//! information without caring which transport ran the request.

use http::{HeaderMap, StatusCode};
use serde_json::Value;
use std::time::Duration;

/// The body of a successful response.
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Already parsed JSON, produced for [`ResponseKind::Json`](crate::ResponseKind::Json) requests.
    Json(Value),
    /// Raw text, produced for [`ResponseKind::Text`](crate::ResponseKind::Text) requests.
    Text(String),
}

/// A successful HTTP response as reported by a transport.
///
/// # Examples
///
/// ```
/// use callqueue::{Payload, Response};
/// use http::{HeaderMap, StatusCode};
/// use std::time::Duration;
///
/// let response = Response::new(
///     Payload::Text(r#"{"count":3}"#.to_string()),
///     StatusCode::OK,
///     HeaderMap::new(),
///     Duration::from_millis(40),
///     2,
/// );
///
/// assert!(response.was_retried());
/// ```
#[derive(Debug, Clone)]
pub struct Response {
    /// The response body.
    pub payload: Payload,

    /// The HTTP status code of the final attempt.
    pub status: StatusCode,

    /// The response headers.
    pub headers: HeaderMap,

    /// Time from the first attempt until the response was received.
    pub latency: Duration,

    /// The number of attempts made, `1` when the first attempt succeeded.
    pub attempts: usize,
}

impl Response {
    /// Creates a new `Response`.
    pub fn new(
        payload: Payload,
        status: StatusCode,
        headers: HeaderMap,
        latency: Duration,
        attempts: usize,
    ) -> Self {
        Self {
            payload,
            status,
            headers,
            latency,
            attempts,
        }
    }

    /// A `200 OK` response with no headers, mostly useful for transport doubles.
    pub fn ok(payload: Payload) -> Self {
        Self::new(payload, StatusCode::OK, HeaderMap::new(), Duration::ZERO, 1)
    }

    /// Returns `true` if the request required retries.
    pub fn was_retried(&self) -> bool {
        self.attempts > 1
    }

    /// Returns a header value by name.
    ///
    /// # Examples
    ///
    /// ```
    /// # use callqueue::{Payload, Response};
    /// # use http::HeaderValue;
    /// let mut response = Response::ok(Payload::Text(String::new()));
    /// response
    ///     .headers
    ///     .insert("content-type", HeaderValue::from_static("application/json"));
    ///
    /// assert_eq!(response.header("content-type"), Some("application/json"));
    /// ```
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }
}
