//! A bounded, retry-aware request queue on top of `reqwest`.
//!
//! [`RequestQueue`] is the bundled [`Transport`]. Each enqueued request runs
//! on its own tokio task; a semaphore caps how many are on the wire at once.
//! Retries re-send immediately with the timeout grown by the request's
//! [`RetryPolicy`](crate::RetryPolicy).

use crate::{
    retry::{RetryOnRetryable, RetryPredicate},
    transport::{ErrorCallback, SuccessCallback, Transport},
    Error, Payload, RequestSpec, Response, ResponseKind, Result,
};
use http::{HeaderMap, HeaderName, HeaderValue};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::runtime::Handle;
use tokio::sync::Semaphore;

/// Number of requests allowed on the wire at the same time.
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;

/// Executes queued requests on a tokio runtime.
///
/// The queue is cheap to clone; clones share the same pool and state.
///
/// Requests run as tasks on the tokio runtime the queue was built with. If
/// that runtime shuts down before a task completes, tokio drops the task
/// together with its callbacks, and the request produces no outcome. Keep the
/// runtime alive for as long as requests are in flight.
///
/// # Examples
///
/// ```no_run
/// use callqueue::RequestQueue;
///
/// # async fn example() -> Result<(), callqueue::Error> {
/// let queue = RequestQueue::builder()
///     .max_in_flight(8)
///     .default_header("User-Agent", "my-app/1.0")?
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RequestQueue {
    inner: Arc<QueueInner>,
}

struct QueueInner {
    http_client: reqwest::Client,
    runtime: Handle,
    permits: Arc<Semaphore>,
    default_headers: HeaderMap,
    retry_predicate: Box<dyn RetryPredicate>,
    stopped: AtomicBool,
}

impl RequestQueue {
    /// Creates a new `RequestQueueBuilder`.
    pub fn builder() -> RequestQueueBuilder {
        RequestQueueBuilder::new()
    }

    /// Creates a queue with default settings on the current tokio runtime.
    ///
    /// # Errors
    ///
    /// Returns an error when called outside a tokio runtime.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    /// Stops the queue.
    ///
    /// Requests already on the wire finish normally. Requests still waiting
    /// for a slot, and any enqueued afterwards, fail with
    /// [`Error::QueueStopped`].
    pub fn stop(&self) {
        if !self.inner.stopped.swap(true, Ordering::SeqCst) {
            tracing::info!("Stopping request queue");
            self.inner.permits.close();
        }
    }

    /// Returns `true` once [`stop`](Self::stop) has been called.
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.load(Ordering::SeqCst)
    }

    /// Runs `spec` to completion, retrying as its policy allows.
    async fn run(&self, spec: &RequestSpec) -> Result<Response> {
        let policy = spec.retry_policy();
        let start_time = Instant::now();
        let mut attempt = 1;
        let mut timeout = policy.timeout();

        loop {
            let result = match self.execute_request(spec, timeout, attempt).await {
                Ok(response) => {
                    self.read_response(response, spec, start_time, attempt)
                        .await
                }
                Err(e) => Err(e),
            };

            let error = match result {
                Ok(response) => return Ok(response),
                Err(e) => e,
            };

            tracing::warn!(
                error = %error,
                attempt = attempt,
                method = %spec.method(),
                url = %spec.url(),
                "Request failed"
            );

            if !self.inner.retry_predicate.should_retry(&error, attempt) {
                return Err(error);
            }

            match policy.timeout_for_attempt(attempt + 1) {
                Some(next_timeout) => {
                    tracing::info!(
                        timeout_ms = next_timeout.as_millis(),
                        attempt = attempt,
                        "Retrying request"
                    );
                    timeout = next_timeout;
                    attempt += 1;
                }
                None if attempt > 1 => {
                    return Err(Error::MaxRetriesExceeded {
                        attempts: attempt,
                        last_error: Box::new(error),
                    });
                }
                None => return Err(error),
            }
        }
    }

    /// Executes a single attempt.
    async fn execute_request(
        &self,
        spec: &RequestSpec,
        timeout: Duration,
        attempt: usize,
    ) -> Result<reqwest::Response> {
        tracing::debug!(
            method = %spec.method(),
            url = %spec.url(),
            attempt = attempt,
            timeout_ms = timeout.as_millis(),
            "Executing HTTP request"
        );

        let mut request = self
            .inner
            .http_client
            .request(spec.method().clone(), spec.url().clone())
            .timeout(timeout)
            .headers(merge_headers(&self.inner.default_headers, spec.headers()));

        if let Some(body) = spec.body() {
            request = request.body(body.to_vec());
        }

        request.send().await.map_err(transport_error)
    }

    /// Turns an HTTP response into a `Response` or an error.
    async fn read_response(
        &self,
        response: reqwest::Response,
        spec: &RequestSpec,
        start_time: Instant,
        attempts: usize,
    ) -> Result<Response> {
        let status = response.status();
        let headers = response.headers().clone();
        let raw_body = response.text().await.map_err(transport_error)?;
        let latency = start_time.elapsed();

        tracing::info!(
            status = status.as_u16(),
            latency_ms = latency.as_millis(),
            attempts = attempts,
            "Received HTTP response"
        );

        if !status.is_success() {
            return Err(Error::HttpError {
                status,
                raw_response: raw_body,
                headers,
            });
        }

        let payload = match spec.response_kind() {
            ResponseKind::Text => Payload::Text(raw_body),
            ResponseKind::Json => match serde_json::from_str::<Value>(&raw_body) {
                Ok(value) => Payload::Json(value),
                Err(e) => {
                    return Err(Error::Parse {
                        raw_response: raw_body,
                        serde_error: e.to_string(),
                    })
                }
            },
        };

        Ok(Response::new(payload, status, headers, latency, attempts))
    }
}

impl Transport for RequestQueue {
    fn enqueue(&self, spec: RequestSpec, on_success: SuccessCallback, on_error: ErrorCallback) {
        if self.is_stopped() {
            on_error(Error::QueueStopped);
            return;
        }

        let queue = self.clone();
        self.inner.runtime.spawn(async move {
            let permit = match Arc::clone(&queue.inner.permits).acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    on_error(Error::QueueStopped);
                    return;
                }
            };

            let result = queue.run(&spec).await;
            drop(permit);

            match result {
                Ok(response) => on_success(response),
                Err(e) => on_error(e),
            }
        });
    }
}

/// Combines queue defaults with request headers; a request header replaces
/// every default value of the same name.
fn merge_headers(defaults: &HeaderMap, request: &HeaderMap) -> HeaderMap {
    let mut merged = defaults.clone();
    for name in request.keys() {
        merged.remove(name);
    }
    for (name, value) in request {
        merged.append(name.clone(), value.clone());
    }
    merged
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout
    } else {
        Error::Network(e)
    }
}

/// Builder for configuring and creating a [`RequestQueue`].
pub struct RequestQueueBuilder {
    max_in_flight: usize,
    default_headers: HeaderMap,
    retry_predicate: Option<Box<dyn RetryPredicate>>,
    runtime: Option<Handle>,
    http_client: Option<reqwest::Client>,
}

impl RequestQueueBuilder {
    /// Creates a new `RequestQueueBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            max_in_flight: DEFAULT_MAX_IN_FLIGHT,
            default_headers: HeaderMap::new(),
            retry_predicate: None,
            runtime: None,
            http_client: None,
        }
    }

    /// Sets how many requests may run at once.
    pub fn max_in_flight(mut self, max_in_flight: usize) -> Self {
        self.max_in_flight = max_in_flight;
        self
    }

    /// Adds a header sent with every request. Request headers take precedence.
    ///
    /// # Errors
    ///
    /// Returns an error if the header name or value is invalid.
    pub fn default_header(mut self, name: impl AsRef<str>, value: impl AsRef<str>) -> Result<Self> {
        let name = HeaderName::try_from(name.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header name: {}", e)))?;
        let value = HeaderValue::try_from(value.as_ref())
            .map_err(|e| Error::ConfigurationError(format!("Invalid header value: {}", e)))?;
        self.default_headers.insert(name, value);
        Ok(self)
    }

    /// Sets the predicate deciding which failures are retried.
    ///
    /// By default, requests are retried based on `Error::is_retryable()`.
    pub fn retry_predicate(mut self, predicate: Box<dyn RetryPredicate>) -> Self {
        self.retry_predicate = Some(predicate);
        self
    }

    /// Runs requests on `handle` instead of the runtime current at `build()`.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    /// Uses a preconfigured `reqwest::Client`.
    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Builds the configured `RequestQueue`.
    ///
    /// # Errors
    ///
    /// Returns an error if `max_in_flight` is zero, if no runtime was given
    /// and none is current, or if the HTTP client cannot be created.
    pub fn build(self) -> Result<RequestQueue> {
        if self.max_in_flight == 0 {
            return Err(Error::ConfigurationError(
                "max_in_flight must be at least 1".to_string(),
            ));
        }

        let runtime = match self.runtime {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|e| {
                Error::ConfigurationError(format!("No tokio runtime available: {}", e))
            })?,
        };

        let http_client = match self.http_client {
            Some(client) => client,
            None => reqwest::Client::builder().build().map_err(|e| {
                Error::ConfigurationError(format!("Failed to build HTTP client: {}", e))
            })?,
        };

        let retry_predicate = self
            .retry_predicate
            .unwrap_or_else(|| Box::new(RetryOnRetryable));

        Ok(RequestQueue {
            inner: Arc::new(QueueInner {
                http_client,
                runtime,
                permits: Arc::new(Semaphore::new(self.max_in_flight)),
                default_headers: self.default_headers,
                retry_predicate,
                stopped: AtomicBool::new(false),
            }),
        })
    }
}

impl Default for RequestQueueBuilder {
    fn default() -> Self {
        Self::new()
    }
}
