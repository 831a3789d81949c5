use super::helper;
use anyhow::Result;
use futures::SinkExt;
use litemq::config::Config;
use litemq_client::ErrorCode;
use litemq_codec::codec::LiteCodec;
use litemq_codec::frame;
use std::collections::HashSet;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

#[tokio::test]
async fn blocked_dequeue_gets_the_next_message() -> Result<()> {
    let broker = helper::start().await?;
    let consumer = broker.connect().await?;
    let producer = broker.connect().await?;

    let waiting = tokio::spawn(async move { consumer.dequeue("jobs").await });

    broker.wait_for_waiters("jobs", 1).await;

    assert_eq!(producer.length("jobs").await?, 0);
    assert_eq!(producer.enqueue("jobs", "job-1").await?, 0);
    assert_eq!(waiting.await??, "job-1");
    assert_eq!(producer.length("jobs").await?, 0);

    Ok(())
}

#[tokio::test]
async fn dequeue_timeout_returns_none() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    let res = client.dequeue_timeout("quiet", Duration::from_millis(30)).await?;

    assert!(res.is_none());

    // the timed out waiter must not swallow the next message
    client.enqueue("quiet", "later").await?;
    assert_eq!(client.length("quiet").await?, 1);
    assert_eq!(
        client.dequeue_timeout("quiet", Duration::from_secs(1)).await?,
        Some("later".into())
    );

    Ok(())
}

#[tokio::test]
async fn server_limits_the_wait() -> Result<()> {
    let mut config = Config::default();
    config.dequeue.max_timeout_ms = 20;

    let broker = helper::start_with(config).await?;
    let client = broker.connect().await?;

    let res = client.dequeue("limited").await;
    let err = helper::to_client_error(res);

    assert_eq!(err.code, ErrorCode::Timeout as u16);

    Ok(())
}

#[tokio::test]
async fn disconnect_cancels_the_waiting_dequeue() -> Result<()> {
    let broker = helper::start().await?;
    let consumer = broker.connect().await?;

    let waiting = tokio::spawn(async move { consumer.dequeue("gone").await });

    broker.wait_for_waiters("gone", 1).await;

    // dropping the client task closes the socket
    waiting.abort();
    let _ = waiting.await;

    while broker.context.registry.lookup("gone").map(|q| q.waiters()).unwrap_or(0) > 0 {
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    let producer = broker.connect().await?;

    assert_eq!(producer.enqueue("gone", "kept").await?, 1);
    assert_eq!(producer.dequeue("gone").await?, "kept");

    Ok(())
}

#[tokio::test]
async fn disconnect_behind_pipelined_requests_cancels_the_dequeue() -> Result<()> {
    let broker = helper::start().await?;
    let socket = TcpStream::connect(broker.addr).await?;
    let mut framed = Framed::new(socket, LiteCodec {});

    framed.send(frame::dequeue("bp")).await?;

    broker.wait_for_waiters("bp", 1).await;

    // more requests than the connection channel holds, all stuck behind the dequeue
    for _ in 0..40 {
        framed.feed(frame::health()).await?;
    }

    framed.flush().await?;
    drop(framed);

    tokio::time::timeout(Duration::from_secs(5), async {
        while broker.context.registry.lookup("bp").map(|q| q.waiters()).unwrap_or(0) > 0 {
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
    })
    .await?;

    let producer = broker.connect().await?;
    let consumer = broker.connect().await?;

    assert_eq!(producer.enqueue("bp", "not lost").await?, 1);
    assert_eq!(
        consumer.dequeue_timeout("bp", Duration::from_secs(1)).await?,
        Some("not lost".into())
    );

    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn many_consumers_get_distinct_messages() -> Result<()> {
    const N: usize = 20;

    let broker = helper::start().await?;
    let mut consumers = vec![];

    for _ in 0..N {
        let client = broker.connect().await?;

        consumers.push(tokio::spawn(async move { client.dequeue("work").await }));
    }

    broker.wait_for_waiters("work", N).await;

    let producer = broker.connect().await?;

    for i in 0..N {
        assert_eq!(producer.enqueue("work", format!("item {i}")).await?, 0);
    }

    let mut received = HashSet::new();

    for c in consumers {
        assert!(received.insert(c.await??));
    }

    assert_eq!(received.len(), N);
    assert_eq!(producer.length("work").await?, 0);

    Ok(())
}
