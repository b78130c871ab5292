//! Exact-length reads over any async byte stream.

use std::io;

use tokio::io::{AsyncRead, AsyncReadExt};

use crate::error::WireError;

/// Read exactly `n` bytes.
///
/// End-of-stream before `n` bytes arrive yields [`WireError::ShortRead`]; a
/// partial buffer is never returned as success. Secure channels report an
/// abrupt close as `UnexpectedEof`, which is treated the same way.
pub async fn read_exact<R>(reader: &mut R, n: usize) -> Result<Vec<u8>, WireError>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut buf = vec![0u8; n];
    let mut filled = 0;

    while filled < n {
        match reader.read(&mut buf[filled..]).await {
            Ok(0) => {
                return Err(WireError::ShortRead {
                    expected: n,
                    received: filled,
                })
            }
            Ok(read) => filled += read,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) if e.kind() == io::ErrorKind::UnexpectedEof => {
                return Err(WireError::ShortRead {
                    expected: n,
                    received: filled,
                })
            }
            Err(e) => return Err(WireError::Io(e)),
        }
    }

    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;

    #[tokio::test]
    async fn reads_across_partial_writes() {
        let (mut client, mut server) = tokio::io::duplex(64);
        tokio::spawn(async move {
            client.write_all(b"abc").await.unwrap();
            tokio::task::yield_now().await;
            client.write_all(b"defg").await.unwrap();
        });

        let bytes = read_exact(&mut server, 6).await.unwrap();
        assert_eq!(bytes, b"abcdef");
    }

    #[tokio::test]
    async fn short_stream_is_short_read() {
        let mut input: &[u8] = b"12345";
        let err = read_exact(&mut input, 9).await.unwrap_err();
        assert!(matches!(
            err,
            WireError::ShortRead {
                expected: 9,
                received: 5
            }
        ));
    }

    #[tokio::test]
    async fn zero_length_read_succeeds_on_empty_stream() {
        let mut input: &[u8] = b"";
        assert!(read_exact(&mut input, 0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn transport_errors_stay_distinct() {
        let mut reader = failing_reader(io::ErrorKind::ConnectionReset);
        let err = read_exact(&mut reader, 4).await.unwrap_err();
        assert!(matches!(err, WireError::Io(ref e) if e.kind() == io::ErrorKind::ConnectionReset));
    }

    fn failing_reader(kind: io::ErrorKind) -> impl AsyncRead + Unpin {
        struct Failing(io::ErrorKind);
        impl AsyncRead for Failing {
            fn poll_read(
                self: std::pin::Pin<&mut Self>,
                _cx: &mut std::task::Context<'_>,
                _buf: &mut tokio::io::ReadBuf<'_>,
            ) -> std::task::Poll<io::Result<()>> {
                std::task::Poll::Ready(Err(io::Error::from(self.0)))
            }
        }
        Failing(kind)
    }
}
