//! The callback-style client facade.
//!
//! The [`Client`] type is the main entry point: it builds requests, attaches
//! the retry policy, hands them to its [`Transport`], and routes every outcome
//! to one [`ResponseListener`]. Use [`ClientBuilder`] to configure and create
//! clients.

use crate::{
    adapter::{ResponseAdapter, Sink, SinkRef},
    connectivity::{AlwaysOnline, Connectivity},
    listener::{Outcome, ResponseListener},
    retry::{RetryPolicy, DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_RETRIES},
    transport::Transport,
    Error, RequestSpec, Result,
};
use http::Method;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;

/// Request timeout used when the builder is not given one.
pub const DEFAULT_CLIENT_TIMEOUT: Duration = Duration::from_millis(4000);

/// Settings fixed when a client is built.
///
/// Only the debug flag can change afterwards, through
/// [`Client::set_debug_logging`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientConfig {
    /// Timeout of the first attempt of every request.
    pub default_timeout: Duration,
    /// Log request and response bodies.
    pub debug_logging: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            default_timeout: DEFAULT_CLIENT_TIMEOUT,
            debug_logging: false,
        }
    }
}

/// Submits JSON requests and reports their outcomes to a listener.
///
/// Every submitted request produces exactly one call to the listener, with
/// one exception: a GET, PUT, or DELETE whose success body is not valid JSON
/// is logged and produces none.
///
/// Outcomes that complete after every clone of the client has been dropped
/// are discarded unless [`ClientBuilder::deliver_after_drop`] is set.
///
/// # Examples
///
/// ```no_run
/// use callqueue::{Client, Outcome, RequestQueue};
/// use serde_json::json;
///
/// # async fn example() -> Result<(), callqueue::Error> {
/// let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Outcome>();
///
/// let client = Client::builder()
///     .transport(RequestQueue::new()?)
///     .listener(tx)
///     .build()?;
///
/// client.do_post("https://api.example.com/items", &json!({"name": "a"}));
///
/// match rx.recv().await {
///     Some(Outcome::Success(payload)) => println!("created: {}", payload),
///     Some(Outcome::Failure(error)) => eprintln!("failed: {}", error),
///     None => {}
/// }
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    transport: Arc<dyn Transport>,
    sink: Arc<Sink>,
    default_timeout: Duration,
    deliver_after_drop: bool,
}

impl Client {
    /// Creates a new `ClientBuilder` for configuring a client.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Sends a GET request. The response body is parsed as JSON.
    pub fn do_get(&self, url: &str) {
        self.dispatch::<()>(Method::GET, url, None);
    }

    /// Sends a POST request with `body` encoded as JSON.
    pub fn do_post<B>(&self, url: &str, body: &B)
    where
        B: Serialize + ?Sized,
    {
        self.dispatch(Method::POST, url, Some(body));
    }

    /// Sends a PUT request with `body` encoded as JSON.
    pub fn do_put<B>(&self, url: &str, body: &B)
    where
        B: Serialize + ?Sized,
    {
        self.dispatch(Method::PUT, url, Some(body));
    }

    /// Sends a DELETE request with `body` encoded as JSON.
    pub fn do_delete<B>(&self, url: &str, body: &B)
    where
        B: Serialize + ?Sized,
    {
        self.dispatch(Method::DELETE, url, Some(body));
    }

    /// Submits a caller-built request as is.
    pub fn submit(&self, spec: RequestSpec) {
        if self.debug_logging() {
            tracing::debug!(
                method = %spec.method(),
                url = %spec.url(),
                body = spec.body_text().unwrap_or_default(),
                "Sending request"
            );
        }

        let sink = if self.inner.deliver_after_drop {
            SinkRef::Attached(Arc::clone(&self.inner.sink))
        } else {
            SinkRef::Detached(Arc::downgrade(&self.inner.sink))
        };
        let (on_success, on_error) = ResponseAdapter::new(sink, &spec).into_callbacks();
        self.inner.transport.enqueue(spec, on_success, on_error);
    }

    /// The retry policy attached to every request built by this client.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.inner.default_timeout,
            DEFAULT_MAX_RETRIES,
            DEFAULT_BACKOFF_MULTIPLIER,
        )
    }

    /// A snapshot of the client's settings.
    pub fn config(&self) -> ClientConfig {
        ClientConfig {
            default_timeout: self.inner.default_timeout,
            debug_logging: self.debug_logging(),
        }
    }

    /// Returns `true` if request and response bodies are logged.
    pub fn debug_logging(&self) -> bool {
        self.inner.sink.debug()
    }

    /// Turns body logging on or off for this client and all its clones.
    pub fn set_debug_logging(&self, enabled: bool) {
        self.inner.sink.set_debug(enabled);
    }

    fn dispatch<B>(&self, method: Method, url: &str, body: Option<&B>)
    where
        B: Serialize + ?Sized,
    {
        match RequestSpec::build(method, url, body, self.retry_policy()) {
            Ok(spec) => self.submit(spec),
            Err(e) => {
                tracing::warn!(error = %e, url = url, "Could not build request");
                self.inner.sink.deliver(Outcome::Failure(e), url);
            }
        }
    }
}

/// Builder for configuring and creating a [`Client`].
///
/// # Examples
///
/// ```no_run
/// use callqueue::{Client, FnListener, NetworkState, RequestQueue};
/// use std::time::Duration;
///
/// # async fn example() -> Result<(), callqueue::Error> {
/// let network = NetworkState::new(true);
///
/// let client = Client::builder()
///     .transport(RequestQueue::new()?)
///     .listener(FnListener::new(
///         |payload| println!("ok: {}", payload),
///         |error| eprintln!("failed: {}", error),
///     ))
///     .connectivity(network.clone())
///     .timeout(Duration::from_secs(10))
///     .debug_logging(true)
///     .build()?;
/// # Ok(())
/// # }
/// ```
pub struct ClientBuilder {
    transport: Option<Arc<dyn Transport>>,
    listener: Option<Arc<dyn ResponseListener>>,
    connectivity: Box<dyn Connectivity>,
    config: ClientConfig,
    deliver_after_drop: bool,
}

impl ClientBuilder {
    /// Creates a new `ClientBuilder` with default settings.
    pub fn new() -> Self {
        Self {
            transport: None,
            listener: None,
            connectivity: Box::new(AlwaysOnline),
            config: ClientConfig::default(),
            deliver_after_drop: false,
        }
    }

    /// Sets the queue requests are submitted to.
    pub fn transport<T>(mut self, transport: T) -> Self
    where
        T: Transport + 'static,
    {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Sets the listener receiving every outcome.
    pub fn listener<L>(mut self, listener: L) -> Self
    where
        L: ResponseListener + 'static,
    {
        self.listener = Some(Arc::new(listener));
        self
    }

    /// Sets the connectivity check consulted once by `build()`.
    pub fn connectivity<C>(mut self, connectivity: C) -> Self
    where
        C: Connectivity + 'static,
    {
        self.connectivity = Box::new(connectivity);
        self
    }

    /// Replaces all settings at once.
    pub fn config(mut self, config: ClientConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the timeout of the first attempt of every request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Enables logging of request and response bodies.
    pub fn debug_logging(mut self, enabled: bool) -> Self {
        self.config.debug_logging = enabled;
        self
    }

    /// Keeps delivering outcomes after the client has been dropped.
    pub fn deliver_after_drop(mut self, enabled: bool) -> Self {
        self.deliver_after_drop = enabled;
        self
    }

    /// Builds the configured `Client`.
    ///
    /// If the connectivity check reports no network, the listener receives
    /// [`Error::NoConnection`] before this returns. The client is built
    /// regardless and still submits requests.
    ///
    /// # Errors
    ///
    /// Returns an error if no transport or no listener was provided.
    pub fn build(self) -> Result<Client> {
        let transport = self
            .transport
            .ok_or_else(|| Error::ConfigurationError("A transport is required".to_string()))?;
        let listener = self
            .listener
            .ok_or_else(|| Error::ConfigurationError("A listener is required".to_string()))?;

        let sink = Arc::new(Sink::new(listener, self.config.debug_logging));

        if !self.connectivity.is_online() {
            tracing::warn!("No network connection available");
            sink.deliver(Outcome::Failure(Error::NoConnection), "client construction");
        }

        Ok(Client {
            inner: Arc::new(ClientInner {
                transport,
                sink,
                default_timeout: self.config.default_timeout,
                deliver_after_drop: self.deliver_after_drop,
            }),
        })
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
