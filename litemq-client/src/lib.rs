//! Client library of the LiteMQ message queue server.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! let client = litemq_client::connect("localhost:42090").await?;
//!
//! client.enqueue("orders", "first").await?;
//!
//! let message = client.dequeue("orders").await?;
//! assert_eq!(&message[..], b"first");
//!
//! client.close().await?;
//! # Ok(())
//! # }
//! ```
mod client_api;
pub use client_api::{connect, Client};

mod error;
pub use error::ClientError;

mod processor;

pub use litemq_codec::frame::ErrorCode;
