use anyhow::Result;
use litemq::config::Config;
use litemq::Context;
use litemq_client::{Client, ClientError};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;

/// Broker running in the test process on an ephemeral port.
pub(crate) struct Broker {
    pub(crate) addr: SocketAddr,
    pub(crate) context: Context,
}

/// Start a broker with the default config.
pub(crate) async fn start() -> Result<Broker> {
    start_with(Config::default()).await
}

pub(crate) async fn start_with(config: Config) -> Result<Broker> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    let context = Context::new(&config);
    let ctx = context.clone();

    tokio::spawn(async move {
        let _ = litemq::start_tcp(ctx, listener).await;
    });

    Ok(Broker { addr, context })
}

impl Broker {
    /// Open a new client connection to the broker.
    pub(crate) async fn connect(&self) -> Result<Client> {
        litemq_client::connect(&self.addr.to_string()).await
    }

    /// Wait until `n` consumers are blocked on the queue.
    pub(crate) async fn wait_for_waiters(&self, queue: &str, n: usize) {
        loop {
            if let Some(q) = self.context.registry.lookup(queue) {
                if q.waiters() >= n {
                    return;
                }
            }

            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    }
}

/// Unwrap and downcast the error as a `ClientError`.
pub(crate) fn to_client_error<T: std::fmt::Debug>(result: Result<T>) -> ClientError {
    result.unwrap_err().downcast::<ClientError>().unwrap()
}
