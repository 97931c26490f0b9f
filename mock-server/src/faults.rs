//! Raw-TCP peers that break the HTTP contract on purpose.

use std::time::Duration;

use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWriteExt},
    net::TcpListener,
};

/// Answer every request with a `Content-Length` of `declared` but send only
/// `sent`, then close the connection.
pub async fn run_truncated(
    listener: TcpListener,
    declared: usize,
    sent: &'static [u8],
) -> Result<(), std::io::Error> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            if read_request_head(&mut stream).await.is_err() {
                return;
            }
            let head = format!(
                "HTTP/1.1 200 OK\r\nContent-Length: {declared}\r\nConnection: close\r\n\r\n"
            );
            let _ = stream.write_all(head.as_bytes()).await;
            let _ = stream.write_all(sent).await;
            let _ = stream.shutdown().await;
        });
    }
}

/// Answer every request with `200 {reason}` and the body `ok`.
pub async fn run_reason_phrase(
    listener: TcpListener,
    reason: &'static str,
) -> Result<(), std::io::Error> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            if read_request_head(&mut stream).await.is_err() {
                return;
            }
            let response =
                format!("HTTP/1.1 200 {reason}\r\nContent-Length: 2\r\nConnection: close\r\n\r\nok");
            let _ = stream.write_all(response.as_bytes()).await;
            let _ = stream.shutdown().await;
        });
    }
}

/// Accept connections and never answer. Each connection is held open for
/// `hold` before being dropped.
pub async fn run_silent(listener: TcpListener, hold: Duration) -> Result<(), std::io::Error> {
    loop {
        let (mut stream, _) = listener.accept().await?;
        tokio::spawn(async move {
            let _ = read_request_head(&mut stream).await;
            tokio::time::sleep(hold).await;
        });
    }
}

/// Read until the blank line ending the request head.
pub(crate) async fn read_request_head<S>(stream: &mut S) -> Result<Vec<u8>, std::io::Error>
where
    S: AsyncRead + Unpin,
{
    let mut head = Vec::new();
    let mut buf = [0u8; 1024];
    while !head.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = stream.read(&mut buf).await?;
        if n == 0 {
            return Err(std::io::ErrorKind::UnexpectedEof.into());
        }
        head.extend_from_slice(&buf[..n]);
    }
    Ok(head)
}
