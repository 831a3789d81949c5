use crate::client::handler;
use crate::error::{runtime_error, RuntimeError};
use crate::{logerr, Context, Result};
use futures::{SinkExt, Stream, StreamExt};
use litemq_codec::codec::LiteCodec;
use litemq_codec::frame::{ErrorCode, Frame, Request};
use log::{error, info, trace};
use std::collections::VecDeque;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

/// Requests read ahead of the handler on top of the request channel capacity.
const MAX_PIPELINED_REQUESTS: usize = 1024;

/// Serve one client connection. Requests are processed one by one and every request gets its
/// response in the order of arrival.
///
/// A separate task reads the socket, so when the client goes away the `closed` token is cancelled
/// and a dequeue which is waiting on behalf of this connection gives up.
pub async fn handle_client(socket: TcpStream, context: Context) -> Result<()> {
    let conn_id = Uuid::new_v4().to_string();

    if let Ok(peer) = socket.peer_addr() {
        info!("[{}] Client connected from {}", conn_id, peer);
    }

    let (mut sink, stream) = Framed::new(socket, LiteCodec {}).split();
    let (request_sink, mut request_stream) = mpsc::channel::<Request>(16);
    let (error_sink, mut error_stream) = mpsc::channel::<RuntimeError>(1);
    let closed = CancellationToken::new();

    let reader_closed = closed.clone();
    let reader_id = conn_id.clone();

    tokio::spawn(async move {
        if let Err(e) = incoming_loop(stream, request_sink, &reader_closed).await {
            error!("[{}] Error {:?}", reader_id, e);

            if let Ok(rte) = e.downcast::<RuntimeError>() {
                logerr!(error_sink.send(*rte).await);
            }
        }

        reader_closed.cancel();
    });

    let result = outgoing_loop(&conn_id, &context, &mut request_stream, &closed, &mut sink).await;

    // let the reader go if we stopped because of a write error
    closed.cancel();

    if let Some(rte) = error_stream.recv().await {
        logerr!(sink.send(rte.into()).await);
    }

    info!("[{}] Client disconnected", conn_id);

    result
}

/// Read the frames of the client and pass the requests to the handler loop.
///
/// The socket is read even when the handler is busy with a blocked dequeue, the requests are
/// buffered meanwhile. This way the end of the stream is seen as soon as the client closes.
async fn incoming_loop<S>(mut stream: S, requests: mpsc::Sender<Request>, closed: &CancellationToken) -> Result<()>
where
    S: Stream<Item = std::result::Result<Frame, std::io::Error>> + Unpin,
{
    let mut pending = VecDeque::<Request>::new();

    loop {
        tokio::select! {
            _ = closed.cancelled() => return Ok(()),
            permit = requests.reserve(), if !pending.is_empty() => {
                match permit {
                    Ok(permit) => {
                        if let Some(request) = pending.pop_front() {
                            permit.send(request);
                        }
                    }
                    Err(_) => return Ok(()),
                }
            }
            data = stream.next() => {
                let frame = match data {
                    Some(frame) => frame?,
                    None => break,
                };

                match frame {
                    Frame::Request(request) => {
                        if pending.len() >= MAX_PIPELINED_REQUESTS {
                            return runtime_error(ErrorCode::TooManyRequests, "Too many pipelined requests");
                        }

                        pending.push_back(request);
                    }
                    Frame::Response(response) => {
                        return runtime_error(ErrorCode::UnexpectedFrame, &format!("Unexpected frame {:?}", response));
                    }
                }
            }
        }
    }

    // client is gone, release the waits but still answer what has been read
    closed.cancel();

    for request in pending {
        if requests.send(request).await.is_err() {
            break;
        }
    }

    Ok(())
}

async fn outgoing_loop<S>(
    conn_id: &str,
    context: &Context,
    requests: &mut mpsc::Receiver<Request>,
    closed: &CancellationToken,
    sink: &mut S,
) -> Result<()>
where
    S: futures::Sink<Frame, Error = std::io::Error> + Unpin,
{
    while let Some(request) = requests.recv().await {
        trace!("[{}] Incoming {:?}", conn_id, request);

        let response = handler::handle_request(context, request, closed).await;

        trace!("[{}] Outgoing {:?}", conn_id, response);

        sink.send(response).await?;
    }

    Ok(())
}
