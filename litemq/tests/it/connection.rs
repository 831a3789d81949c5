use super::helper;
use anyhow::Result;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

#[tokio::test]
async fn garbage_closes_the_connection() -> Result<()> {
    let broker = helper::start().await?;
    let mut socket = TcpStream::connect(broker.addr).await?;

    socket.write_all(b"\x7F\x00\x00\x00\x00\xCE").await?;

    // the broker closes the socket, no answer is expected
    let mut buf = vec![];
    let _ = socket.read_to_end(&mut buf).await;
    assert!(buf.is_empty());

    // the broker still serves other clients
    let client = broker.connect().await?;
    client.health().await?;

    Ok(())
}

#[tokio::test]
async fn response_frame_from_client_is_rejected() -> Result<()> {
    let broker = helper::start().await?;
    let mut socket = TcpStream::connect(broker.addr).await?;

    // a HealthOk frame, only the server may send it
    socket.write_all(b"\x11\x00\x00\x00\x00\xCE").await?;

    let mut buf = vec![];
    socket.read_to_end(&mut buf).await?;

    // error frame with code 505
    assert_eq!(buf[0], 0x1F);
    assert_eq!(&buf[5..7], &505u16.to_be_bytes());

    Ok(())
}

#[tokio::test]
async fn pipelined_requests_are_answered_in_order() -> Result<()> {
    let broker = helper::start().await?;
    let client = broker.connect().await?;

    let (a, b, c) = tokio::join!(
        client.enqueue("pipe", "1"),
        client.enqueue("pipe", "2"),
        client.length("pipe")
    );

    let mut lengths = vec![a?, b?];
    lengths.sort();

    assert_eq!(lengths, vec![1, 2]);
    assert!(c? <= 2);

    Ok(())
}
