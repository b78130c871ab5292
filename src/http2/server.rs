//! HTTP/2 connection handling.
//!
//! Reads the preface, then frames until the peer closes. SETTINGS frames are
//! decoded and acknowledged; every other frame is logged and its payload
//! discarded. No streams, HPACK or flow control.

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};

use crate::error::{ConnectionError, ParseError};
use crate::http2::codec::{Frame, FrameCodec, FramePayload};
use crate::http2::frame::settings_ack;
use crate::http2::registry::{describe_frame_type, flag_names};
use crate::observability::metrics;

#[derive(Debug, Clone, Copy)]
pub struct Http2Handler {
    codec: FrameCodec,
}

impl Http2Handler {
    pub fn new(codec: FrameCodec) -> Self {
        Self { codec }
    }

    pub async fn serve<S>(&self, channel: &mut S) -> Result<(), ConnectionError>
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let preface = self.codec.read_preface(channel).await?;
        tracing::info!(preface = %String::from_utf8_lossy(&preface).escape_debug(), "Received HTTP/2 preface");

        loop {
            let frame = match self.codec.read_frame(channel).await {
                Ok(frame) => frame,
                Err(ParseError::Wire(w)) if w.is_clean_eof() => {
                    tracing::debug!("Peer closed the connection");
                    return Ok(());
                }
                Err(e) => return Err(e.into()),
            };
            self.dispatch(frame, channel).await?;
        }
    }

    async fn dispatch<S>(&self, frame: Frame, channel: &mut S) -> Result<(), ConnectionError>
    where
        S: AsyncWrite + Unpin,
    {
        let header = frame.header;
        let type_name = describe_frame_type(header.frame_type);
        metrics::record_frame(&type_name);
        tracing::info!(
            frame_type = %type_name,
            length = header.length,
            flags = ?flag_names(header.frame_type, header.flags),
            stream = header.stream_id,
            "Received frame"
        );

        match frame.payload {
            FramePayload::Settings(params) => {
                for param in &params {
                    tracing::info!(%param, "Setting");
                }
                if header.is_ack() {
                    tracing::debug!("Peer acknowledged our settings");
                    return Ok(());
                }

                channel
                    .write_all(&settings_ack(header.stream_id))
                    .await
                    .map_err(ConnectionError::from_write)?;
                channel.flush().await.map_err(ConnectionError::from_write)?;
                tracing::info!("Sent settings frame with ACK flag");
            }
            FramePayload::Opaque(payload) => {
                tracing::debug!(bytes = payload.len(), "Discarded frame payload");
            }
        }
        Ok(())
    }
}
