use crate::Context;
use litemq_codec::frame::{self, DequeueArgs, EnqueueArgs, ErrorCode, Frame, Request};
use log::{debug, info};
use tokio_util::sync::CancellationToken;

/// Execute one request against the queue registry and build the response frame. `closed` is the
/// token of the connection, it cancels the dequeue waits when the client goes away.
pub(crate) async fn handle_request(context: &Context, request: Request, closed: &CancellationToken) -> Frame {
    match request {
        Request::Health => {
            info!("HEALTH");

            frame::health_ok()
        }
        Request::Enqueue(args) => enqueue(context, args),
        Request::Dequeue(args) => dequeue(context, args, closed).await,
        Request::Length(queue) => {
            info!("LENGTH {}", queue);

            frame::queue_length(context.registry.length(&queue) as u64)
        }
        Request::Purge(queue) => {
            info!("PURGE {}", queue);

            frame::queue_length(context.registry.purge(&queue) as u64)
        }
        Request::Flush => {
            info!("FLUSH");

            let (queues, messages) = context.registry.flush();

            frame::flush_ok(queues as u64, messages as u64)
        }
    }
}

fn enqueue(context: &Context, args: EnqueueArgs) -> Frame {
    info!("ENQUEUE {} {} bytes", args.queue, args.data.len());

    frame::queue_length(context.registry.enqueue(&args.queue, args.data) as u64)
}

async fn dequeue(context: &Context, args: DequeueArgs, closed: &CancellationToken) -> Frame {
    info!("DEQUEUE {}", args.queue);

    // nobody would read the message
    if closed.is_cancelled() {
        return frame::error(ErrorCode::Cancelled, "Connection is closing");
    }

    let cancel = closed.child_token();
    let wait = context.registry.dequeue(&args.queue, &cancel);

    let result = match context.dequeue_timeout(args.timeout_ms) {
        Some(limit) => match tokio::time::timeout(limit, wait).await {
            Ok(result) => result,
            Err(_) => {
                debug!("Dequeue on {} timed out after {:?}", args.queue, limit);

                return frame::error(ErrorCode::Timeout, "Dequeue timed out");
            }
        },
        None => wait.await,
    };

    match result {
        Ok(data) => {
            debug!("< {} bytes from {}", data.len(), args.queue);

            frame::message(data)
        }
        Err(e) => {
            info!("DEQUEUE {} ended with {}", args.queue, e);

            e.into_frame()
        }
    }
}
