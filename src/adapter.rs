//! Turns transport callbacks into listener deliveries.

use crate::{
    listener::{Outcome, ResponseListener},
    transport::{ErrorCallback, SuccessCallback},
    Error, Payload, RequestSpec, Response,
};
use http::Method;
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use url::Url;

/// The listener and debug flag shared by a client and its in-flight requests.
pub(crate) struct Sink {
    listener: Arc<dyn ResponseListener>,
    debug: AtomicBool,
}

impl Sink {
    pub(crate) fn new(listener: Arc<dyn ResponseListener>, debug: bool) -> Self {
        Self {
            listener,
            debug: AtomicBool::new(debug),
        }
    }

    pub(crate) fn debug(&self) -> bool {
        self.debug.load(Ordering::Relaxed)
    }

    pub(crate) fn set_debug(&self, enabled: bool) {
        self.debug.store(enabled, Ordering::Relaxed);
    }

    /// Hands `outcome` to the listener, containing any panic it raises.
    pub(crate) fn deliver(&self, outcome: Outcome, target: &str) {
        let result = panic::catch_unwind(AssertUnwindSafe(|| match outcome {
            Outcome::Success(payload) => self.listener.on_complete(payload),
            Outcome::Failure(error) => self.listener.on_error(error),
        }));

        if result.is_err() {
            tracing::error!(target_url = target, "Response listener panicked");
        }
    }
}

/// Either keeps the client's sink alive or lets it go with the client.
#[derive(Clone)]
pub(crate) enum SinkRef {
    Attached(Arc<Sink>),
    Detached(Weak<Sink>),
}

impl SinkRef {
    fn upgrade(&self) -> Option<Arc<Sink>> {
        match self {
            SinkRef::Attached(sink) => Some(Arc::clone(sink)),
            SinkRef::Detached(sink) => sink.upgrade(),
        }
    }
}

/// Adapts one request's success and error callbacks to the listener.
#[derive(Clone)]
pub(crate) struct ResponseAdapter {
    sink: SinkRef,
    method: Method,
    url: Url,
}

impl ResponseAdapter {
    pub(crate) fn new(sink: SinkRef, spec: &RequestSpec) -> Self {
        Self {
            sink,
            method: spec.method().clone(),
            url: spec.url().clone(),
        }
    }

    /// Splits the adapter into the two callbacks a transport expects.
    pub(crate) fn into_callbacks(self) -> (SuccessCallback, ErrorCallback) {
        let on_error = self.clone();
        (
            Box::new(move |response: Response| self.on_success(response)),
            Box::new(move |error: Error| on_error.on_error(error)),
        )
    }

    pub(crate) fn on_success(&self, response: Response) {
        let Some(sink) = self.live_sink() else {
            return;
        };

        let payload = match response.payload {
            Payload::Json(value) => value,
            Payload::Text(raw) => match serde_json::from_str::<Value>(&raw) {
                Ok(value) => value,
                Err(e) => {
                    // Not reported to the listener: the request yields no outcome.
                    tracing::warn!(
                        error = %e,
                        method = %self.method,
                        url = %self.url,
                        "Discarding response that is not valid JSON"
                    );
                    if sink.debug() {
                        tracing::debug!(raw_response = %raw, "Unparsed response body");
                    }
                    return;
                }
            },
        };

        if sink.debug() {
            tracing::debug!(
                method = %self.method,
                url = %self.url,
                status = response.status.as_u16(),
                latency_ms = response.latency.as_millis(),
                attempts = response.attempts,
                response = %payload,
                "Received response"
            );
        }

        sink.deliver(Outcome::Success(payload), self.url.as_str());
    }

    pub(crate) fn on_error(&self, error: Error) {
        let Some(sink) = self.live_sink() else {
            return;
        };

        if sink.debug() {
            tracing::error!(
                method = %self.method,
                url = %self.url,
                error = %error,
                "Request failed"
            );
        }

        sink.deliver(Outcome::Failure(error), self.url.as_str());
    }

    fn live_sink(&self) -> Option<Arc<Sink>> {
        let sink = self.sink.upgrade();
        if sink.is_none() {
            tracing::debug!(
                method = %self.method,
                url = %self.url,
                "Client dropped; discarding outcome"
            );
        }
        sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RetryPolicy;
    use serde_json::json;
    use std::sync::atomic::AtomicUsize;
    use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver};

    fn spec() -> RequestSpec {
        RequestSpec::build::<Value>(
            Method::GET,
            "https://api.example.com/items",
            None,
            RetryPolicy::default(),
        )
        .unwrap()
    }

    fn attached() -> (ResponseAdapter, UnboundedReceiver<Outcome>, Arc<Sink>) {
        let (tx, rx) = unbounded_channel();
        let sink = Arc::new(Sink::new(Arc::new(tx), true));
        let adapter = ResponseAdapter::new(SinkRef::Attached(Arc::clone(&sink)), &spec());
        (adapter, rx, sink)
    }

    #[test]
    fn test_text_payload_is_parsed() {
        let (adapter, mut rx, _sink) = attached();

        adapter.on_success(Response::ok(Payload::Text(r#"{"count":3}"#.to_string())));

        match rx.try_recv() {
            Ok(Outcome::Success(value)) => assert_eq!(value, json!({"count": 3})),
            other => panic!("Expected success, got {:?}", other),
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_json_payload_is_forwarded() {
        let (adapter, mut rx, _sink) = attached();

        adapter.on_success(Response::ok(Payload::Json(json!({"id": 7}))));

        assert!(matches!(rx.try_recv(), Ok(Outcome::Success(v)) if v == json!({"id": 7})));
    }

    #[test]
    fn test_unparseable_text_delivers_nothing() {
        let (adapter, mut rx, _sink) = attached();

        adapter.on_success(Response::ok(Payload::Text("not json".to_string())));

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_error_is_delivered_once() {
        let (adapter, mut rx, _sink) = attached();

        adapter.on_error(Error::Timeout);

        assert!(matches!(rx.try_recv(), Ok(Outcome::Failure(Error::Timeout))));
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_listener_panic_is_contained() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let listener = crate::FnListener::new(
            |_| panic!("listener bug"),
            move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                panic!("listener bug");
            },
        );
        let sink = Arc::new(Sink::new(Arc::new(listener), false));
        let adapter = ResponseAdapter::new(SinkRef::Attached(sink), &spec());

        adapter.on_success(Response::ok(Payload::Json(json!({}))));
        adapter.on_error(Error::Timeout);

        // The panicking error handler ran once and was not re-invoked.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_detached_sink_drops_outcome_after_owner_is_gone() {
        let (tx, mut rx) = unbounded_channel();
        let sink = Arc::new(Sink::new(Arc::new(tx), false));
        let adapter = ResponseAdapter::new(SinkRef::Detached(Arc::downgrade(&sink)), &spec());

        drop(sink);
        adapter.on_error(Error::Timeout);

        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_callbacks_share_one_adapter() {
        let (adapter, mut rx, _sink) = attached();
        let (on_success, on_error) = adapter.into_callbacks();

        on_success(Response::ok(Payload::Text("[1,2]".to_string())));
        drop(on_error);

        assert!(matches!(rx.try_recv(), Ok(Outcome::Success(v)) if v == json!([1, 2])));
    }

    #[test]
    fn test_debug_flag_toggles() {
        let (_adapter, _rx, sink) = attached();
        assert!(sink.debug());
        sink.set_debug(false);
        assert!(!sink.debug());
    }
}
