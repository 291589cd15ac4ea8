//! Basic example firing GET, POST, PUT and DELETE requests through a queue.
//!
//! This example shows how to:
//! - Build a request queue and a client around it
//! - Receive outcomes through a channel listener
//! - Toggle body logging at runtime
//!
//! Run with: `cargo run --example basic_call`

use callqueue::{Client, Error, NetworkState, Outcome, RequestQueue};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;

#[derive(Debug, Serialize)]
struct NewPost {
    title: String,
    body: String,
    #[serde(rename = "userId")]
    user_id: u32,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    tracing_subscriber::fmt()
        .with_env_filter("callqueue=debug,basic_call=info")
        .init();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel::<Outcome>();

    let client = Client::builder()
        .transport(RequestQueue::new()?)
        .listener(tx)
        .connectivity(NetworkState::new(true))
        .timeout(Duration::from_secs(5))
        .build()?;

    let base = "https://jsonplaceholder.typicode.com";

    client.do_get(&format!("{}/posts/1", base));

    client.set_debug_logging(true);
    client.do_post(
        &format!("{}/posts", base),
        &NewPost {
            title: "My New Post".to_string(),
            body: "This is the content of my new post!".to_string(),
            user_id: 1,
        },
    );
    client.do_put(&format!("{}/posts/1", base), &json!({"id": 1, "title": "Edited"}));
    client.do_delete(&format!("{}/posts/1", base), &json!({}));

    for _ in 0..4 {
        match tokio::time::timeout(Duration::from_secs(15), rx.recv()).await {
            Ok(Some(Outcome::Success(payload))) => println!("Success: {}", payload),
            Ok(Some(Outcome::Failure(error))) => println!("Failure ({:?}): {}", error.kind(), error),
            Ok(None) => break,
            Err(_) => {
                println!("No further outcomes (unparseable bodies are not reported)");
                break;
            }
        }
    }

    Ok(())
}
