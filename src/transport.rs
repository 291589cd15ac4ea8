//! The seam between the client facade and whatever executes requests.

use crate::{Error, RequestSpec, Response};

/// Invoked once with the response when a request succeeds.
pub type SuccessCallback = Box<dyn FnOnce(Response) + Send + 'static>;

/// Invoked once with the cause when a request fails.
pub type ErrorCallback = Box<dyn FnOnce(Error) + Send + 'static>;

/// A queue that executes requests and reports their completion.
///
/// Implementations must call exactly one of the two callbacks exactly once
/// per enqueued request, and must not block the caller while the request
/// runs. If an implementation loses a request without running either
/// callback (for example because its executor shut down), that request
/// produces no outcome. For [`ResponseKind::Json`](crate::ResponseKind::Json) requests the
/// success payload must be [`Payload::Json`](crate::Payload::Json); a body
/// that is not JSON goes to `on_error` as [`Error::Parse`].
///
/// [`RequestQueue`](crate::RequestQueue) is the bundled implementation.
///
/// # Examples
///
/// ```
/// use callqueue::{
///     ErrorCallback, Payload, RequestSpec, Response, SuccessCallback, Transport,
/// };
///
/// /// Answers every request with an empty JSON object.
/// struct Canned;
///
/// impl Transport for Canned {
///     fn enqueue(&self, _spec: RequestSpec, on_success: SuccessCallback, _on_error: ErrorCallback) {
///         on_success(Response::ok(Payload::Text("{}".to_string())));
///     }
/// }
/// ```
pub trait Transport: Send + Sync {
    /// Queues `spec` for execution.
    fn enqueue(&self, spec: RequestSpec, on_success: SuccessCallback, on_error: ErrorCallback);
}

impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    fn enqueue(&self, spec: RequestSpec, on_success: SuccessCallback, on_error: ErrorCallback) {
        (**self).enqueue(spec, on_success, on_error)
    }
}
