//! Transport classification.
//!
//! A freshly accepted stream is offered to the secure-transport collaborator.
//! The handshake's own failure taxonomy, never the payload, decides what
//! happens next:
//!
//! ```text
//! handshake ok                      → Secure(channel)
//! failed, plaintext record header   → PlaintextFallback(replay of consumed bytes + stream)
//! failed, anything else             → Rejected(reason)
//! ```
//!
//! The bytes consumed by a failed handshake are recorded so a plaintext
//! client's request is not lost, and whatever the handshake wrote after its
//! last read never reaches a plaintext client.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{ready, Context, Poll};

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

/// Upper bound on bytes kept while a handshake is in progress.
pub const RECORD_LIMIT: usize = 8 * 1024;

/// The secure-transport collaborator.
pub trait SecureTransport<S>: Send + Sync {
    /// The established secure channel.
    type Channel: Send;

    /// Run a server-side handshake over `stream`.
    fn handshake(
        &self,
        stream: S,
    ) -> impl Future<Output = Result<Self::Channel, HandshakeFailure<S>>> + Send;

    /// Access the stream underneath an established channel.
    fn transport_mut(channel: &mut Self::Channel) -> &mut S;
}

/// A failed handshake, returning ownership of the stream.
#[derive(Debug)]
pub struct HandshakeFailure<S> {
    pub stream: S,
    pub error: io::Error,
    /// The peer's first bytes were not a secure-transport record at all.
    pub is_plaintext_signature: bool,
}

/// What classification decided for one connection.
#[derive(Debug)]
pub enum ConnectionOutcome<C, S> {
    Secure(C),
    PlaintextFallback(Replay<S>),
    Rejected(io::Error),
}

impl<C, S> ConnectionOutcome<C, S> {
    /// Stable label used for metrics and logs.
    pub fn label(&self) -> &'static str {
        match self {
            ConnectionOutcome::Secure(_) => "secure",
            ConnectionOutcome::PlaintextFallback(_) => "plaintext",
            ConnectionOutcome::Rejected(_) => "rejected",
        }
    }
}

/// Classify a fresh connection by attempting a handshake on it.
pub async fn classify<S, T>(
    transport: &T,
    stream: S,
) -> ConnectionOutcome<<T as SecureTransport<Recorder<S>>>::Channel, S>
where
    T: SecureTransport<Recorder<S>>,
{
    match transport.handshake(Recorder::new(stream)).await {
        Ok(mut channel) => {
            <T as SecureTransport<Recorder<S>>>::transport_mut(&mut channel).stop();
            ConnectionOutcome::Secure(channel)
        }
        Err(failure) if failure.is_plaintext_signature => {
            tracing::info!(error = %failure.error, "Plain connection detected");
            ConnectionOutcome::PlaintextFallback(failure.stream.into_replay())
        }
        Err(failure) => ConnectionOutcome::Rejected(failure.error),
    }
}

/// Stream wrapper used for the duration of a handshake.
///
/// Reads are recorded (up to [`RECORD_LIMIT`] bytes) so a plaintext client's
/// request can be replayed. Writes are held back and only reach the peer
/// before the next read or after [`Recorder::stop`]. Anything written after
/// the last read of a failed handshake, such as a fatal alert, is dropped by
/// [`Recorder::into_replay`].
#[derive(Debug)]
pub struct Recorder<S> {
    inner: S,
    recorded: Vec<u8>,
    recording: bool,
    held: Vec<u8>,
    holding: bool,
}

impl<S> Recorder<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            recorded: Vec::new(),
            recording: true,
            held: Vec::new(),
            holding: true,
        }
    }

    /// Stop recording and release the buffer. Held writes go out on the next
    /// read, write or flush.
    pub fn stop(&mut self) {
        self.recording = false;
        self.recorded = Vec::new();
        self.holding = false;
    }

    pub fn recorded(&self) -> &[u8] {
        &self.recorded
    }

    /// Bytes written but not yet sent to the peer.
    pub fn held(&self) -> &[u8] {
        &self.held
    }

    /// Turn the recorded bytes and the stream into a replaying channel.
    /// Held writes are discarded.
    pub fn into_replay(self) -> Replay<S> {
        if !self.held.is_empty() {
            tracing::debug!(bytes = self.held.len(), "Dropping handshake output");
        }
        Replay::new(self.recorded, self.inner)
    }
}

impl<S: AsyncWrite + Unpin> Recorder<S> {
    fn poll_release(&mut self, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        while !self.held.is_empty() {
            let n = ready!(Pin::new(&mut self.inner).poll_write(cx, &self.held))?;
            if n == 0 {
                return Poll::Ready(Err(io::ErrorKind::WriteZero.into()));
            }
            self.held.drain(..n);
        }
        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncRead + AsyncWrite + Unpin> AsyncRead for Recorder<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.held.is_empty() {
            ready!(this.poll_release(cx))?;
            ready!(Pin::new(&mut this.inner).poll_flush(cx))?;
        }

        let before = buf.filled().len();
        ready!(Pin::new(&mut this.inner).poll_read(cx, buf))?;

        if this.recording {
            let fresh = &buf.filled()[before..];
            let room = RECORD_LIMIT - this.recorded.len();
            let take = fresh.len().min(room);
            this.recorded.extend_from_slice(&fresh[..take]);
            if this.recorded.len() == RECORD_LIMIT {
                this.recording = false;
            }
        }

        Poll::Ready(Ok(()))
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Recorder<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = self.get_mut();
        if this.holding {
            this.held.extend_from_slice(buf);
            return Poll::Ready(Ok(buf.len()));
        }
        ready!(this.poll_release(cx))?;
        Pin::new(&mut this.inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if this.holding {
            return Poll::Ready(Ok(()));
        }
        ready!(this.poll_release(cx))?;
        Pin::new(&mut this.inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        if !this.holding {
            ready!(this.poll_release(cx))?;
        }
        Pin::new(&mut this.inner).poll_shutdown(cx)
    }
}

/// A channel that yields a fixed prefix before reading from the stream.
#[derive(Debug)]
pub struct Replay<S> {
    prefix: Vec<u8>,
    pos: usize,
    inner: S,
}

impl<S> Replay<S> {
    pub fn new(prefix: Vec<u8>, inner: S) -> Self {
        Self {
            prefix,
            pos: 0,
            inner,
        }
    }

    /// Bytes of the prefix not yet read.
    pub fn pending(&self) -> &[u8] {
        &self.prefix[self.pos..]
    }
}

impl<S: AsyncRead + Unpin> AsyncRead for Replay<S> {
    fn poll_read(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = self.get_mut();
        let pending = &this.prefix[this.pos..];
        if !pending.is_empty() {
            let n = pending.len().min(buf.remaining());
            buf.put_slice(&pending[..n]);
            this.pos += n;
            return Poll::Ready(Ok(()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

impl<S: AsyncWrite + Unpin> AsyncWrite for Replay<S> {
    fn poll_write(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        Pin::new(&mut self.get_mut().inner).poll_write(cx, buf)
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_flush(cx)
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.get_mut().inner).poll_shutdown(cx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, DuplexStream};

    const ALERT: &[u8] = b"\x15\x03\x03\x00\x02\x02\x32";
    const SERVER_FLIGHT: &[u8] = b"server-flight";

    /// Behaves like a TLS server: a record that starts with 0x16 gets a
    /// server flight and a one-byte client reply; anything else gets an
    /// alert written after the failing read.
    struct ScriptedTransport {
        consume: usize,
        plaintext: bool,
    }

    impl SecureTransport<Recorder<DuplexStream>> for ScriptedTransport {
        type Channel = Recorder<DuplexStream>;

        fn handshake(
            &self,
            mut stream: Recorder<DuplexStream>,
        ) -> impl Future<Output = Result<Self::Channel, HandshakeFailure<Recorder<DuplexStream>>>> + Send
        {
            let consume = self.consume;
            let plaintext = self.plaintext;
            async move {
                let mut buf = vec![0u8; consume];
                if let Err(error) = stream.read_exact(&mut buf).await {
                    return Err(HandshakeFailure {
                        stream,
                        error,
                        is_plaintext_signature: false,
                    });
                }
                if buf.first() == Some(&0x16) {
                    let result = async {
                        stream.write_all(SERVER_FLIGHT).await?;
                        stream.flush().await?;
                        stream.read_exact(&mut [0u8; 1]).await?;
                        Ok::<_, io::Error>(())
                    }
                    .await;
                    return match result {
                        Ok(()) => Ok(stream),
                        Err(error) => Err(HandshakeFailure {
                            stream,
                            error,
                            is_plaintext_signature: false,
                        }),
                    };
                }
                let _ = stream.write_all(ALERT).await;
                let _ = stream.flush().await;
                Err(HandshakeFailure {
                    stream,
                    error: io::Error::new(io::ErrorKind::InvalidData, "bad record"),
                    is_plaintext_signature: plaintext,
                })
            }
        }

        fn transport_mut(channel: &mut Self::Channel) -> &mut Recorder<DuplexStream> {
            channel
        }
    }

    #[tokio::test]
    async fn plaintext_signature_replays_consumed_bytes() {
        let (mut client, server) = tokio::io::duplex(256);
        client.write_all(b"GET /a.css HTTP/1.1\r\n\r\n").await.unwrap();

        let transport = ScriptedTransport {
            consume: 5,
            plaintext: true,
        };
        let outcome = classify(&transport, server).await;
        assert_eq!(outcome.label(), "plaintext");

        let ConnectionOutcome::PlaintextFallback(mut replay) = outcome else {
            panic!("expected plaintext fallback");
        };
        assert_eq!(replay.pending(), b"GET /");

        client.shutdown().await.unwrap();
        let mut all = Vec::new();
        replay.read_to_end(&mut all).await.unwrap();
        assert_eq!(all, b"GET /a.css HTTP/1.1\r\n\r\n");
    }

    #[tokio::test]
    async fn plaintext_client_never_sees_handshake_output() {
        let (mut client, server) = tokio::io::duplex(256);
        client.write_all(b"GET /a.css HTTP/1.1\r\n\r\n").await.unwrap();

        let transport = ScriptedTransport {
            consume: 5,
            plaintext: true,
        };
        let ConnectionOutcome::PlaintextFallback(mut replay) = classify(&transport, server).await else {
            panic!("expected plaintext fallback");
        };
        replay.write_all(b"HTTP/1.1 301 Moved Permanently\r\n").await.unwrap();
        replay.flush().await.unwrap();
        drop(replay);

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"HTTP/1.1 301 Moved Permanently\r\n");
    }

    #[tokio::test]
    async fn other_failures_are_rejected() {
        let (mut client, server) = tokio::io::duplex(256);
        client.write_all(b"\x15\x03\x03\x00\x02").await.unwrap();

        let transport = ScriptedTransport {
            consume: 5,
            plaintext: false,
        };
        assert!(matches!(
            classify(&transport, server).await,
            ConnectionOutcome::Rejected(_)
        ));
    }

    #[tokio::test]
    async fn handshake_output_reaches_a_secure_client() {
        let (mut client, server) = tokio::io::duplex(256);
        let peer = tokio::spawn(async move {
            client.write_all(b"\x16\x03\x01\x00\x00").await.unwrap();
            let mut flight = [0u8; SERVER_FLIGHT.len()];
            client.read_exact(&mut flight).await.unwrap();
            assert_eq!(flight, SERVER_FLIGHT);
            client.write_all(b"F").await.unwrap();
            client
        });

        let transport = ScriptedTransport {
            consume: 5,
            plaintext: true,
        };
        let ConnectionOutcome::Secure(mut channel) = classify(&transport, server).await else {
            panic!("expected secure channel");
        };
        assert!(channel.recorded().is_empty());

        let mut client = peer.await.unwrap();
        channel.write_all(b"app").await.unwrap();
        channel.flush().await.unwrap();
        let mut app = [0u8; 3];
        client.read_exact(&mut app).await.unwrap();
        assert_eq!(&app, b"app");
    }

    #[tokio::test]
    async fn writes_are_held_until_stopped() {
        let (mut client, server) = tokio::io::duplex(256);
        let mut recorder = Recorder::new(server);
        recorder.write_all(b"tail").await.unwrap();
        recorder.flush().await.unwrap();
        assert_eq!(recorder.held(), b"tail");

        recorder.stop();
        recorder.flush().await.unwrap();
        assert!(recorder.held().is_empty());

        let mut out = [0u8; 4];
        client.read_exact(&mut out).await.unwrap();
        assert_eq!(&out, b"tail");
    }

    #[tokio::test]
    async fn recorder_is_bounded() {
        let (mut client, server) = tokio::io::duplex(RECORD_LIMIT * 2);
        client.write_all(&vec![b'x'; RECORD_LIMIT + 100]).await.unwrap();
        client.shutdown().await.unwrap();

        let mut recorder = Recorder::new(server);
        let mut sink = Vec::new();
        recorder.read_to_end(&mut sink).await.unwrap();

        assert_eq!(sink.len(), RECORD_LIMIT + 100);
        assert_eq!(recorder.recorded().len(), RECORD_LIMIT);
    }
}
