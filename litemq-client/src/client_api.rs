use crate::client_error;
use crate::processor;
use anyhow::{anyhow, Result};
use bytes::Bytes;
use litemq_codec::frame::{self, DequeueArgs, ErrorCode, Frame, Response};
use log::error;
use std::fmt;
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

pub(crate) type ClientRequestSink = mpsc::Sender<ClientRequest>;

/// Represents a client request, send a frame and wait for the answer of the server.
pub(crate) struct ClientRequest {
    pub(crate) frame: Frame,
    pub(crate) response: oneshot::Sender<Result<Response>>,
}

impl fmt::Debug for ClientRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Request{{Frame={:?}}}", self.frame)
    }
}

/// Connection to a LiteMQ server.
///
/// The server processes the requests of a connection one after the other, so while a dequeue is
/// waiting for a message, the other calls on the same connection wait too. Use separate
/// connections for producing and consuming.
pub struct Client {
    request_sink: ClientRequestSink,
    socket_loop: JoinHandle<()>,
}

/// Connect to a LiteMQ server.
pub async fn connect(url: &str) -> Result<Client> {
    use tokio::net::TcpStream;

    match TcpStream::connect(url).await {
        Ok(socket) => {
            let (sender, receiver) = mpsc::channel(1);

            let socket_loop = tokio::spawn(async move {
                if let Err(e) = processor::socket_loop(socket, receiver).await {
                    error!("error: {:?}", e);
                }
            });

            Ok(Client {
                request_sink: sender,
                socket_loop,
            })
        }
        Err(e) => Err(anyhow!("Connection error {:?}", e)),
    }
}

impl Client {
    /// Liveness check of the server.
    pub async fn health(&self) -> Result<()> {
        match self.call(frame::health()).await? {
            Response::HealthOk => Ok(()),
            r => unexpected(r),
        }
    }

    /// Enqueue a message and return the number of buffered messages in the queue afterwards. It
    /// is 0 when a waiting consumer took the message directly.
    pub async fn enqueue(&self, queue: &str, data: impl Into<Bytes>) -> Result<u64> {
        match self.call(frame::enqueue(queue, data)).await? {
            Response::QueueLength(count) => Ok(count),
            r => unexpected(r),
        }
    }

    /// Dequeue the next message, waiting for it as long as it takes.
    pub async fn dequeue(&self, queue: &str) -> Result<Bytes> {
        match self.call(frame::dequeue(queue)).await? {
            Response::Message(data) => Ok(data),
            r => unexpected(r),
        }
    }

    /// Dequeue the next message, waiting at most `timeout`. Returns `None` if no message arrived
    /// in time. The server may cut the wait shorter if it has a lower limit configured.
    pub async fn dequeue_timeout(&self, queue: &str, timeout: Duration) -> Result<Option<Bytes>> {
        let timeout_ms = timeout.as_millis().clamp(1, u32::MAX as u128) as u32;
        let f = DequeueArgs::default().queue(queue).timeout_ms(timeout_ms).frame();

        match self.call(f).await {
            Ok(Response::Message(data)) => Ok(Some(data)),
            Ok(r) => unexpected(r),
            Err(e) => match e.downcast_ref::<crate::ClientError>() {
                Some(ce) if ce.code == ErrorCode::Timeout as u16 => Ok(None),
                _ => Err(e),
            },
        }
    }

    /// Number of buffered messages of the queue.
    pub async fn length(&self, queue: &str) -> Result<u64> {
        match self.call(frame::length(queue)).await? {
            Response::QueueLength(count) => Ok(count),
            r => unexpected(r),
        }
    }

    /// Delete the queue with its messages, returns the number of deleted messages.
    pub async fn purge(&self, queue: &str) -> Result<u64> {
        match self.call(frame::purge(queue)).await? {
            Response::QueueLength(count) => Ok(count),
            r => unexpected(r),
        }
    }

    /// Delete all the queues, returns the number of deleted queues and messages.
    pub async fn flush(&self) -> Result<(u64, u64)> {
        match self.call(frame::flush()).await? {
            Response::FlushOk { queues, messages } => Ok((queues, messages)),
            r => unexpected(r),
        }
    }

    /// Close the connection and wait for the socket loop to finish.
    pub async fn close(self) -> Result<()> {
        drop(self.request_sink);

        self.socket_loop.await?;

        Ok(())
    }

    async fn call(&self, frame: Frame) -> Result<Response> {
        let (tx, rx) = oneshot::channel();

        self.request_sink
            .send(ClientRequest { frame, response: tx })
            .await
            .map_err(|_| anyhow!("Connection is closed"))?;

        match rx.await?? {
            Response::Error(args) => client_error!(args.code, args.text),
            response => Ok(response),
        }
    }
}

fn unexpected<T>(response: Response) -> Result<T> {
    Err(anyhow!("Unexpected response {:?}", response))
}
