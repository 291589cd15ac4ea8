//! # Callqueue - callback-style JSON requests over a shared queue
//!
//! Callqueue is a small facade for apps that fire off JSON requests and want
//! the result pushed back to them instead of awaiting it. It builds GET, POST,
//! PUT and DELETE requests, attaches a retry policy, submits them to a
//! [`Transport`], and reports each result through a two-method
//! [`ResponseListener`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use callqueue::{Client, Outcome, RequestQueue};
//! use serde_json::json;
//! use std::time::Duration;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), callqueue::Error> {
//!     let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Outcome>();
//!
//!     let client = Client::builder()
//!         .transport(RequestQueue::new()?)
//!         .listener(tx)
//!         .timeout(Duration::from_secs(5))
//!         .build()?;
//!
//!     client.do_get("https://api.example.com/items");
//!     client.do_put("https://api.example.com/items/1", &json!({"name": "a"}));
//!
//!     for _ in 0..2 {
//!         match rx.recv().await {
//!             Some(Outcome::Success(payload)) => println!("ok: {}", payload),
//!             Some(Outcome::Failure(error)) => eprintln!("failed: {}", error),
//!             None => break,
//!         }
//!     }
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Delivery rules
//!
//! - Every request produces exactly one listener call, on the queue's worker
//!   tasks.
//! - GET, PUT and DELETE bodies are parsed by the client. A body that is not
//!   valid JSON is logged and produces **no** listener call.
//! - A body that cannot be serialized is logged and the request is sent
//!   without one.
//! - If the [`Connectivity`] check fails when the client is built, the listener
//!   receives [`Error::NoConnection`] immediately. Later requests are still
//!   submitted.
//!
//! ## Retries
//!
//! [`RequestQueue`] re-sends failed attempts immediately, growing the timeout
//! by the [`RetryPolicy`] multiplier each time. Which failures are retried is
//! decided by a [`RetryPredicate`]:
//!
//! ```no_run
//! use callqueue::{retry::RetryOnTimeout, RequestQueue};
//!
//! # async fn example() -> Result<(), callqueue::Error> {
//! let queue = RequestQueue::builder()
//!     .retry_predicate(Box::new(RetryOnTimeout))
//!     .build()?;
//! # Ok(())
//! # }
//! ```

mod adapter;
mod client;
pub mod connectivity;
mod error;
mod listener;
mod queue;
pub mod request;
mod response;
pub mod retry;
mod transport;

pub use client::{Client, ClientBuilder, ClientConfig, DEFAULT_CLIENT_TIMEOUT};
pub use connectivity::{AlwaysOnline, Connectivity, NetworkState};
pub use error::{Error, ErrorKind, Result, NO_CONNECTION};
pub use listener::{FnListener, Outcome, ResponseListener};
pub use queue::{RequestQueue, RequestQueueBuilder, DEFAULT_MAX_IN_FLIGHT};
pub use request::{RequestSpec, ResponseKind};
pub use response::{Payload, Response};
pub use retry::{RetryPolicy, RetryPredicate};
pub use transport::{ErrorCallback, SuccessCallback, Transport};
