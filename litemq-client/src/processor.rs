use crate::client_api::ClientRequest;
use anyhow::{anyhow, Result};
use futures::stream::StreamExt;
use futures::SinkExt;
use litemq_codec::codec::LiteCodec;
use litemq_codec::frame::{Frame, Response};
use log::{debug, error, trace};
use std::collections::VecDeque;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, oneshot};
use tokio_util::codec::Framed;

type Waiter = oneshot::Sender<Result<Response>>;

/// Send the requests to the server and route the responses back to the callers. The server
/// answers in request order, so the waiters are kept in a FIFO.
pub(crate) async fn socket_loop<T>(socket: T, mut requests: mpsc::Receiver<ClientRequest>) -> Result<()>
where
    T: AsyncRead + AsyncWrite,
{
    let (mut sink, mut stream) = Framed::new(socket, LiteCodec {}).split();
    let mut waiters = VecDeque::<Waiter>::new();

    loop {
        tokio::select! {
            // Receiving incoming frames. Here we can handle any IO error and the
            // closing of the input stream (server closes the stream).
            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Frame::Response(response))) => {
                        trace!("Incoming {:?}", response);

                        match waiters.pop_front() {
                            Some(waiter) => {
                                let _ = waiter.send(Ok(response));
                            }
                            None => error!("Response without request {:?}", response),
                        }
                    }
                    Some(Ok(Frame::Request(request))) => {
                        fail_waiters(&mut waiters, "Server sent a request frame");

                        return Err(anyhow!("Unexpected frame from server {:?}", request));
                    }
                    Some(Err(e)) => {
                        fail_waiters(&mut waiters, "Invalid frame from server");

                        return Err(e.into());
                    }
                    None => {
                        debug!("Server closed the connection");

                        break;
                    }
                }
            }
            req = requests.recv() => {
                match req {
                    Some(request) => {
                        trace!("Outgoing {:?}", request);

                        match sink.send(request.frame).await {
                            Ok(()) => waiters.push_back(request.response),
                            Err(e) => {
                                let _ = request.response.send(Err(anyhow!("Send error {:?}", e)));
                            }
                        }
                    }
                    None => {
                        // every Client handle is gone, close the connection
                        break;
                    }
                }
            }
        }
    }

    fail_waiters(&mut waiters, "Connection closed");

    Ok(())
}

fn fail_waiters(waiters: &mut VecDeque<Waiter>, reason: &str) {
    for waiter in waiters.drain(..) {
        let _ = waiter.send(Err(anyhow!("{}", reason)));
    }
}
