//! Request description and builder.
//!
//! A [`RequestSpec`] is the immutable value handed to a
//! [`Transport`](crate::Transport): method, URL, headers, encoded body, retry
//! policy, and how the success body should be interpreted.

use crate::{retry::RetryPolicy, Error, Result};
use http::{header, HeaderMap, HeaderName, HeaderValue, Method};
use serde::Serialize;
use url::Url;

const JSON: &str = "application/json";
const JSON_UTF8: &str = "application/json; charset=utf-8";

/// How the transport should hand back a successful response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    /// The transport parses the body as JSON; a parse failure is an error.
    Json,
    /// The transport returns the body as text and leaves parsing to the caller.
    Text,
}

/// An immutable description of one HTTP request.
///
/// # Examples
///
/// ```
/// use callqueue::{RequestSpec, ResponseKind, RetryPolicy};
/// use http::Method;
/// use serde_json::json;
///
/// let spec = RequestSpec::build(
///     Method::PUT,
///     "https://api.example.com/items/1",
///     Some(&json!({"name": "a"})),
///     RetryPolicy::default(),
/// )?;
///
/// assert_eq!(spec.response_kind(), ResponseKind::Text);
/// assert_eq!(spec.header("accept"), Some("application/json"));
/// assert_eq!(spec.body_text(), Some(r#"{"name":"a"}"#));
/// # Ok::<(), callqueue::Error>(())
/// ```
#[derive(Debug, Clone)]
pub struct RequestSpec {
    method: Method,
    url: Url,
    headers: HeaderMap,
    body: Option<Vec<u8>>,
    retry: RetryPolicy,
    response_kind: ResponseKind,
}

impl RequestSpec {
    /// Builds a request for one of GET, POST, PUT, or DELETE.
    ///
    /// GET requests never carry a body. POST bodies are sent as JSON and the
    /// response is parsed by the transport. PUT and DELETE always carry
    /// `Content-Type` and `Accept` headers of `application/json`, whatever the
    /// body.
    ///
    /// A body that fails to serialize is logged and dropped; the request is
    /// still built, without a body.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` does not parse, and
    /// [`Error::ConfigurationError`] for any other method.
    pub fn build<B>(method: Method, url: &str, body: Option<&B>, retry: RetryPolicy) -> Result<Self>
    where
        B: Serialize + ?Sized,
    {
        let url = Url::parse(url)?;
        let mut headers = HeaderMap::new();

        let (body, response_kind) = match method {
            Method::GET => (None, ResponseKind::Text),
            Method::POST => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON_UTF8));
                (body.and_then(|b| encode_or_drop(&url, b)), ResponseKind::Json)
            }
            Method::PUT | Method::DELETE => {
                headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(JSON));
                headers.insert(header::ACCEPT, HeaderValue::from_static(JSON));
                (body.and_then(|b| encode_or_drop(&url, b)), ResponseKind::Text)
            }
            other => {
                return Err(Error::ConfigurationError(format!(
                    "Unsupported method: {}",
                    other
                )))
            }
        };

        Ok(Self {
            method,
            url,
            headers,
            body,
            retry,
            response_kind,
        })
    }

    /// Adds a header to the request, replacing any earlier value.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid, or if it would
    /// replace the `Content-Type` or `Accept` header of a PUT or DELETE.
    pub fn with_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let forced = matches!(self.method, Method::PUT | Method::DELETE)
            && (name == header::CONTENT_TYPE || name == header::ACCEPT);
        if forced {
            return Err(Error::ConfigurationError(format!(
                "{} is fixed to {} for {} requests",
                name, JSON, self.method
            )));
        }
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.headers.insert(name, value);
        Ok(self)
    }

    /// The HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The absolute request URL.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// All request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns a header value by name, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name)?.to_str().ok()
    }

    /// The encoded UTF-8 JSON body.
    pub fn body(&self) -> Option<&[u8]> {
        self.body.as_deref()
    }

    /// The body as text.
    pub fn body_text(&self) -> Option<&str> {
        std::str::from_utf8(self.body()?).ok()
    }

    /// The timeout and retry parameters.
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// How the success body should be returned.
    pub fn response_kind(&self) -> ResponseKind {
        self.response_kind
    }
}

/// Serializes `body` as UTF-8 JSON.
///
/// # Errors
///
/// Returns [`Error::Encoding`] if serde rejects the value.
pub fn encode_body<B>(body: &B) -> Result<Vec<u8>>
where
    B: Serialize + ?Sized,
{
    serde_json::to_vec(body).map_err(|e| Error::Encoding(e.to_string()))
}

fn encode_or_drop<B>(url: &Url, body: &B) -> Option<Vec<u8>>
where
    B: Serialize + ?Sized,
{
    match encode_body(body) {
        Ok(bytes) => Some(bytes),
        Err(e) => {
            tracing::error!(error = %e, url = %url, "Dropping request body");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};
    use std::collections::BTreeMap;

    const URL: &str = "https://api.example.com/items";

    fn unencodable() -> BTreeMap<Vec<u8>, u8> {
        // serde_json only accepts string-like map keys
        let mut map = BTreeMap::new();
        map.insert(vec![1, 2], 3);
        map
    }

    #[test]
    fn test_get_never_carries_body() {
        let spec =
            RequestSpec::build(Method::GET, URL, Some(&json!({"a": 1})), RetryPolicy::default())
                .unwrap();

        assert_eq!(spec.method(), &Method::GET);
        assert!(spec.body().is_none());
        assert!(spec.headers().is_empty());
        assert_eq!(spec.response_kind(), ResponseKind::Text);
    }

    #[test]
    fn test_post_is_json_typed() {
        let spec = RequestSpec::build(
            Method::POST,
            URL,
            Some(&json!({"name": "a"})),
            RetryPolicy::default(),
        )
        .unwrap();

        assert_eq!(spec.response_kind(), ResponseKind::Json);
        assert_eq!(spec.header("content-type"), Some(JSON_UTF8));
        let body: Value = serde_json::from_slice(spec.body().unwrap()).unwrap();
        assert_eq!(body, json!({"name": "a"}));
    }

    #[test]
    fn test_put_and_delete_force_json_headers() {
        for method in [Method::PUT, Method::DELETE] {
            let spec = RequestSpec::build::<Value>(method, URL, None, RetryPolicy::default())
                .unwrap();

            assert_eq!(spec.header("content-type"), Some(JSON));
            assert_eq!(spec.header("accept"), Some(JSON));
            assert!(spec.body().is_none());
        }
    }

    #[test]
    fn test_encoding_failure_drops_body() {
        let spec =
            RequestSpec::build(Method::PUT, URL, Some(&unencodable()), RetryPolicy::default())
                .unwrap();

        assert!(spec.body().is_none());
        assert_eq!(spec.header("accept"), Some(JSON));
    }

    #[test]
    fn test_encode_body_reports_encoding_error() {
        let err = encode_body(&unencodable()).unwrap_err();
        assert!(matches!(err, Error::Encoding(_)));
    }

    #[test]
    fn test_invalid_url_is_rejected() {
        let result =
            RequestSpec::build::<Value>(Method::GET, "not a url", None, RetryPolicy::default());
        assert!(matches!(result, Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_unsupported_method_is_rejected() {
        let result = RequestSpec::build::<Value>(Method::PATCH, URL, None, RetryPolicy::default());
        assert!(matches!(result, Err(Error::ConfigurationError(_))));
    }

    #[test]
    fn test_with_header_keeps_forced_json_headers() {
        for method in [Method::PUT, Method::DELETE] {
            for name in ["Content-Type", "accept"] {
                let err = RequestSpec::build::<Value>(
                    method.clone(),
                    URL,
                    None,
                    RetryPolicy::default(),
                )
                .unwrap()
                .with_header(name, "text/plain")
                .unwrap_err();
                assert!(matches!(err, Error::ConfigurationError(_)));
            }
        }

        // GET has no forced headers
        let spec = RequestSpec::build::<Value>(Method::GET, URL, None, RetryPolicy::default())
            .unwrap()
            .with_header("accept", "text/plain")
            .unwrap();
        assert_eq!(spec.header("accept"), Some("text/plain"));
    }

    #[test]
    fn test_with_header() {
        let spec = RequestSpec::build::<Value>(Method::GET, URL, None, RetryPolicy::default())
            .unwrap()
            .with_header("x-trace", "abc")
            .unwrap();
        assert_eq!(spec.header("x-trace"), Some("abc"));

        let err = RequestSpec::build::<Value>(Method::GET, URL, None, RetryPolicy::default())
            .unwrap()
            .with_header("bad header", "v")
            .unwrap_err();
        assert!(matches!(err, Error::ConfigurationError(_)));
    }
}
