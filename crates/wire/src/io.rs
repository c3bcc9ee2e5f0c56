//! Async frame I/O over any tokio byte stream.

use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::codec::{Frame, Header, HEADER_SIZE};
use crate::error::WireError;

/// Upper bound on the buffer reserved before any payload bytes arrive.
const INITIAL_READ_CAPACITY: usize = 64 * 1024;

/// Read exactly `n` bytes from `reader`.
///
/// The buffer grows as bytes arrive, so a large declared length costs
/// nothing until the peer actually sends it. Fails with
/// [`WireError::ConnectionClosed`] if the peer closes the stream before `n`
/// bytes have accumulated.
pub async fn read_exactly<R>(reader: &mut R, n: usize) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = Vec::with_capacity(n.min(INITIAL_READ_CAPACITY));
    (&mut *reader).take(n as u64).read_to_end(&mut buf).await?;
    if buf.len() < n {
        return Err(WireError::ConnectionClosed {
            expected: n,
            received: buf.len(),
        });
    }
    Ok(buf)
}

/// Read one complete frame: the 5-byte header, then exactly the declared payload.
pub async fn read_frame<R>(reader: &mut R) -> Result<Frame, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let header_bytes = read_exactly(reader, HEADER_SIZE).await?;
    let mut raw = [0u8; HEADER_SIZE];
    raw.copy_from_slice(&header_bytes);
    let header = Header::parse(&raw);

    let payload = read_exactly(reader, header.payload_len()).await?;
    trace!(command = header.command, length = header.length, "frame read");
    Ok(Frame {
        command: header.command,
        payload: Bytes::from(payload),
    })
}

/// Encode `frame`, write it and flush.
pub async fn write_frame<W>(writer: &mut W, frame: &Frame) -> Result<(), WireError>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let bytes = frame.encode()?;
    writer.write_all(&bytes).await?;
    writer.flush().await?;
    trace!(command = frame.command, length = frame.len(), "frame written");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::encode;

    #[tokio::test]
    async fn read_exactly_across_partial_writes() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            client.write_all(b"ab").await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"cde").await.unwrap();
        });

        let bytes = read_exactly(&mut server, 5).await.unwrap();
        assert_eq!(bytes, b"abcde");
    }

    #[tokio::test]
    async fn read_exactly_zero_bytes_returns_immediately() {
        let (_client, mut server) = tokio::io::duplex(8);
        assert!(read_exactly(&mut server, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn read_exactly_reports_early_close() {
        let (mut client, mut server) = tokio::io::duplex(64);
        client.write_all(b"abc").await.unwrap();
        drop(client);

        match read_exactly(&mut server, 5).await {
            Err(WireError::ConnectionClosed { expected, received }) => {
                assert_eq!(expected, 5);
                assert_eq!(received, 3);
            }
            other => panic!("expected ConnectionClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn frames_survive_a_stream() {
        let (mut client, mut server) = tokio::io::duplex(1024);
        write_frame(&mut client, &Frame::new(1, &b"first"[..])).await.unwrap();
        write_frame(&mut client, &Frame::new(2, Bytes::new())).await.unwrap();

        let first = read_frame(&mut server).await.unwrap();
        assert_eq!(first.command, 1);
        assert_eq!(&first.payload[..], b"first");

        let second = read_frame(&mut server).await.unwrap();
        assert_eq!(second.command, 2);
        assert!(second.is_empty());
    }

    #[tokio::test]
    async fn truncated_payload_is_connection_closed() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let bytes = encode(2, b"0123456789").unwrap();
        client.write_all(&bytes[..8]).await.unwrap();
        drop(client);

        let err = read_frame(&mut server).await.unwrap_err();
        assert!(err.is_disconnect());
    }

    #[tokio::test]
    async fn oversized_declared_length_fails_on_close_without_reserving_it() {
        let (mut client, mut server) = tokio::io::duplex(64);
        let mut header = vec![2u8];
        header.extend_from_slice(&u32::MAX.to_be_bytes());
        client.write_all(&header).await.unwrap();
        client.write_all(b"abc").await.unwrap();
        drop(client);

        match read_frame(&mut server).await {
            Err(WireError::ConnectionClosed { expected, received }) => {
                assert_eq!(expected, u32::MAX as usize);
                assert_eq!(received, 3);
            }
            other => panic!("expected ConnectionClosed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn large_payload_grows_past_initial_capacity() {
        let payload = vec![7u8; INITIAL_READ_CAPACITY * 3 + 11];
        let (mut client, mut server) = tokio::io::duplex(4096);
        let expected = payload.clone();
        tokio::spawn(async move {
            write_frame(&mut client, &Frame::new(1, payload)).await.unwrap();
        });

        let frame = read_frame(&mut server).await.unwrap();
        assert_eq!(frame.len(), expected.len());
        assert_eq!(&frame.payload[..], &expected[..]);
    }
}
