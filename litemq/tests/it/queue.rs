use super::helper;
use anyhow::Result;

#[tokio::test]
async fn health_check() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    client.health().await?;
    assert!(broker.context.registry.is_empty());

    client.close().await?;

    Ok(())
}

#[tokio::test]
async fn orders_scenario() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    assert_eq!(client.enqueue("orders", "a").await?, 1);
    assert_eq!(client.enqueue("orders", "b").await?, 2);
    assert_eq!(client.dequeue("orders").await?, "a");
    assert_eq!(client.length("orders").await?, 1);
    assert_eq!(client.purge("orders").await?, 1);
    assert_eq!(client.length("orders").await?, 0);

    client.close().await?;

    Ok(())
}

#[tokio::test]
async fn messages_are_delivered_in_order() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    for i in 0..10 {
        client.enqueue("fifo", format!("message {i}")).await?;
    }

    for i in 0..10 {
        assert_eq!(client.dequeue("fifo").await?, format!("message {i}"));
    }

    assert_eq!(client.length("fifo").await?, 0);

    Ok(())
}

#[tokio::test]
async fn empty_payload_and_empty_name() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    assert_eq!(client.enqueue("", "").await?, 1);
    assert!(client.dequeue("").await?.is_empty());
    assert_eq!(client.purge("never-used").await?, 0);
    assert_eq!(client.length("never-used").await?, 0);

    Ok(())
}

#[tokio::test]
async fn binary_payload_is_kept_intact() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;
    let payload: Vec<u8> = (0..=255u8).cycle().take(100_000).collect();

    client.enqueue("binary", payload.clone()).await?;

    assert_eq!(client.dequeue("binary").await?.to_vec(), payload);

    Ok(())
}
