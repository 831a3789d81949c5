use super::helper;
use anyhow::Result;
use litemq_client::ErrorCode;

#[tokio::test]
async fn purge_releases_waiting_consumer() -> Result<()> {
    let broker = helper::start().await?;
    let consumer = broker.connect().await?;
    let admin = broker.connect().await?;

    let waiting = tokio::spawn(async move { consumer.dequeue("doomed").await });

    broker.wait_for_waiters("doomed", 1).await;

    assert_eq!(admin.purge("doomed").await?, 0);

    let err = helper::to_client_error(waiting.await?);
    assert_eq!(err.code, ErrorCode::Purged as u16);

    // the next message lands in a fresh queue
    assert_eq!(admin.enqueue("doomed", "fresh").await?, 1);

    Ok(())
}

#[tokio::test]
async fn purge_discards_buffered_messages() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    for body in ["1", "2", "3"] {
        client.enqueue("batch", body).await?;
    }

    assert_eq!(client.purge("batch").await?, 3);
    assert_eq!(client.length("batch").await?, 0);
    assert_eq!(client.purge("batch").await?, 0);

    Ok(())
}

#[tokio::test]
async fn flush_removes_all_queues() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    client.enqueue("a", "1").await?;
    client.enqueue("a", "2").await?;
    client.enqueue("b", "3").await?;

    assert_eq!(client.flush().await?, (2, 3));
    assert_eq!(client.length("a").await?, 0);
    assert!(broker.context.registry.is_empty());

    Ok(())
}
