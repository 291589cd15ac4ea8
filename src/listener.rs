//! The caller-facing completion interface.

use crate::Error;
use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

/// The single result delivered for a submitted request.
#[derive(Debug)]
pub enum Outcome {
    /// The request succeeded with a JSON payload.
    Success(Value),
    /// The request failed.
    Failure(Error),
}

impl Outcome {
    /// Returns `true` for [`Outcome::Success`].
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }

    /// Converts into a standard `Result`.
    pub fn into_result(self) -> crate::Result<Value> {
        match self {
            Outcome::Success(value) => Ok(value),
            Outcome::Failure(error) => Err(error),
        }
    }
}

/// Receives the outcome of each submitted request.
///
/// Methods run on the transport's worker tasks. A panic inside either method
/// is caught and logged by the client; it never reaches the transport and the
/// outcome is not delivered a second time.
///
/// # Examples
///
/// ```
/// use callqueue::{Error, ResponseListener};
/// use serde_json::Value;
///
/// struct PrintListener;
///
/// impl ResponseListener for PrintListener {
///     fn on_complete(&self, payload: Value) {
///         println!("ok: {}", payload);
///     }
///
///     fn on_error(&self, error: Error) {
///         eprintln!("failed: {}", error);
///     }
/// }
/// ```
pub trait ResponseListener: Send + Sync {
    /// Called with the parsed response of a successful request.
    fn on_complete(&self, payload: Value);

    /// Called with the cause of a failed request.
    fn on_error(&self, error: Error);
}

/// Forwards outcomes into a channel. A closed receiver silently drops them.
impl ResponseListener for UnboundedSender<Outcome> {
    fn on_complete(&self, payload: Value) {
        let _ = self.send(Outcome::Success(payload));
    }

    fn on_error(&self, error: Error) {
        let _ = self.send(Outcome::Failure(error));
    }
}

/// A listener built from a pair of closures.
///
/// # Examples
///
/// ```
/// use callqueue::FnListener;
///
/// let listener = FnListener::new(
///     |payload| println!("ok: {}", payload),
///     |error| eprintln!("failed: {}", error),
/// );
/// # let _ = listener;
/// ```
pub struct FnListener<C, E> {
    on_complete: C,
    on_error: E,
}

impl<C, E> FnListener<C, E>
where
    C: Fn(Value) + Send + Sync,
    E: Fn(Error) + Send + Sync,
{
    /// Creates a listener from the two callbacks.
    pub fn new(on_complete: C, on_error: E) -> Self {
        Self {
            on_complete,
            on_error,
        }
    }
}

impl<C, E> ResponseListener for FnListener<C, E>
where
    C: Fn(Value) + Send + Sync,
    E: Fn(Error) + Send + Sync,
{
    fn on_complete(&self, payload: Value) {
        (self.on_complete)(payload)
    }

    fn on_error(&self, error: Error) {
        (self.on_error)(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_channel_listener_forwards_outcomes() {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();

        tx.on_complete(json!({"ok": true}));
        tx.on_error(Error::Timeout);

        assert!(matches!(rx.try_recv(), Ok(Outcome::Success(v)) if v == json!({"ok": true})));
        assert!(matches!(rx.try_recv(), Ok(Outcome::Failure(Error::Timeout))));
    }

    #[test]
    fn test_channel_listener_ignores_closed_receiver() {
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel::<Outcome>();
        drop(rx);
        tx.on_error(Error::NoConnection);
    }

    #[test]
    fn test_fn_listener() {
        let completes = AtomicUsize::new(0);
        let errors = AtomicUsize::new(0);
        let listener = FnListener::new(
            |_| {
                completes.fetch_add(1, Ordering::SeqCst);
            },
            |_| {
                errors.fetch_add(1, Ordering::SeqCst);
            },
        );

        listener.on_complete(Value::Null);
        listener.on_error(Error::Timeout);
        listener.on_error(Error::Timeout);

        assert_eq!(completes.load(Ordering::SeqCst), 1);
        assert_eq!(errors.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_outcome_into_result() {
        assert_eq!(
            Outcome::Success(json!(1)).into_result().unwrap(),
            json!(1)
        );
        assert!(Outcome::Failure(Error::Timeout).into_result().is_err());
        assert!(!Outcome::Failure(Error::Timeout).is_success());
    }
}
