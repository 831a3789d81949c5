//! LiteMQ is a lightweight in-memory message queue server.
//!
//! Clients enqueue byte payloads to named queues and dequeue them in FIFO order. A dequeue on an
//! empty queue waits until a message arrives, the caller cancels or the queue is purged.
pub mod client;
pub mod config;
pub mod error;
pub mod queue;
pub mod restapi;

pub use error::{Error, Result};

use log::{error, info};
use queue::registry::QueueRegistry;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;

/// Shared state of the server, every connection gets a clone of it.
#[derive(Clone)]
pub struct Context {
    pub registry: Arc<QueueRegistry>,
    /// Upper limit of dequeue waits, `None` means unlimited.
    pub max_dequeue_timeout: Option<Duration>,
}

impl Context {
    pub fn new(config: &config::Config) -> Self {
        let max_dequeue_timeout = match config.dequeue.max_timeout_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms as u64)),
        };

        Context {
            registry: Arc::new(QueueRegistry::new()),
            max_dequeue_timeout,
        }
    }

    /// The effective wait limit of a dequeue which asked for `requested_ms` (0 is unlimited).
    pub fn dequeue_timeout(&self, requested_ms: u32) -> Option<Duration> {
        let requested = match requested_ms {
            0 => None,
            ms => Some(Duration::from_millis(ms as u64)),
        };

        match (requested, self.max_dequeue_timeout) {
            (Some(r), Some(max)) => Some(r.min(max)),
            (r, max) => r.or(max),
        }
    }
}

#[macro_export]
macro_rules! logerr {
    ($val:expr) => {
        if let Err(e) = $val {
            log::error!("Error {:?}", e);
        }
    };
}

/// Accept queue protocol connections and serve each of them on a separate task.
pub async fn start_tcp(context: Context, listener: TcpListener) -> Result<()> {
    info!("Start listening on {}", listener.local_addr()?);

    loop {
        let (socket, peer) = listener.accept().await?;
        let ctx = context.clone();

        tokio::spawn(async move {
            if let Err(e) = client::conn::handle_client(socket, ctx).await {
                error!("Error handling client {} {:?}", peer, e)
            }
        });
    }
}
