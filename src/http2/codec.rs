//! Reading the connection preface and frames off a byte stream.

use tokio::io::AsyncRead;

use crate::error::ParseError;
use crate::http2::frame::{FrameHeader, FRAME_HEADER_LEN};
use crate::http2::registry::FrameType;
use crate::http2::settings::{decode_settings, SettingsParameter};
use crate::net::wire::read_exact;

/// Client connection preface: `PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n`.
pub const PREFACE: &[u8; 24] = b"PRI * HTTP/2.0\r\n\r\nSM\r\n\r\n";

/// A decoded frame payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    Settings(Vec<SettingsParameter>),
    /// Any other frame type. The bytes are kept but not interpreted.
    Opaque(Vec<u8>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub header: FrameHeader,
    pub payload: FramePayload,
}

#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    strict_preface: bool,
    max_payload: u32,
}

impl FrameCodec {
    pub fn new(strict_preface: bool, max_payload: u32) -> Self {
        Self {
            strict_preface,
            max_payload,
        }
    }

    /// Consume the 24-octet preface.
    ///
    /// The bytes are only compared against [`PREFACE`] in strict mode.
    pub async fn read_preface<R>(&self, reader: &mut R) -> Result<Vec<u8>, ParseError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let preface = read_exact(reader, PREFACE.len()).await?;
        if self.strict_preface && preface.as_slice() != PREFACE.as_slice() {
            return Err(ParseError::InvalidPreface(preface));
        }
        Ok(preface)
    }

    pub async fn read_frame_header<R>(&self, reader: &mut R) -> Result<FrameHeader, ParseError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let bytes = read_exact(reader, FRAME_HEADER_LEN).await?;
        let mut header = [0u8; FRAME_HEADER_LEN];
        header.copy_from_slice(&bytes);
        Ok(FrameHeader::decode(&header))
    }

    /// Read the payload announced by `header`.
    pub async fn read_payload<R>(&self, reader: &mut R, header: &FrameHeader) -> Result<Vec<u8>, ParseError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        if header.length > self.max_payload {
            return Err(ParseError::FrameTooLarge {
                length: header.length,
                max: self.max_payload,
            });
        }
        Ok(read_exact(reader, header.length as usize).await?)
    }

    pub async fn read_frame<R>(&self, reader: &mut R) -> Result<Frame, ParseError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let header = self.read_frame_header(reader).await?;
        let payload = self.read_payload(reader, &header).await?;
        Ok(Frame {
            header,
            payload: decode_payload(&header, payload),
        })
    }
}

/// Pick a payload decoder by frame type.
pub fn decode_payload(header: &FrameHeader, payload: Vec<u8>) -> FramePayload {
    match header.kind() {
        Some(FrameType::Settings) => FramePayload::Settings(decode_settings(&payload)),
        _ => FramePayload::Opaque(payload),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WireError;

    fn codec() -> FrameCodec {
        FrameCodec::new(false, 16_384)
    }

    #[tokio::test]
    async fn preface_then_settings_frame() {
        let mut input = PREFACE.to_vec();
        input.extend_from_slice(&[0x00, 0x00, 0x06, 0x04, 0x00, 0x00, 0x00, 0x00, 0x00]);
        input.extend_from_slice(&[0x00, 0x03, 0x00, 0x00, 0x00, 0x64]);
        let mut reader = input.as_slice();

        let preface = codec().read_preface(&mut reader).await.unwrap();
        assert_eq!(preface, PREFACE);

        let frame = codec().read_frame(&mut reader).await.unwrap();
        assert_eq!(frame.header.length, 6);
        assert_eq!(
            frame.payload,
            FramePayload::Settings(vec![SettingsParameter { identifier: 3, value: 100 }])
        );
    }

    #[tokio::test]
    async fn lenient_preface_accepts_other_bytes() {
        let mut reader: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        let preface = codec().read_preface(&mut reader).await.unwrap();
        assert_eq!(preface.len(), 24);
    }

    #[tokio::test]
    async fn strict_preface_rejects_other_bytes() {
        let mut reader: &[u8] = b"GET / HTTP/1.1\r\nHost: x\r\n\r\n";
        let err = FrameCodec::new(true, 16_384)
            .read_preface(&mut reader)
            .await
            .unwrap_err();
        assert!(matches!(err, ParseError::InvalidPreface(_)));
    }

    #[tokio::test]
    async fn short_preface_is_short_read() {
        let mut reader: &[u8] = b"PRI * HTTP/2.0";
        let err = codec().read_preface(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            ParseError::Wire(WireError::ShortRead { expected: 24, received: 14 })
        ));
    }

    #[tokio::test]
    async fn truncated_header_is_short_read() {
        let mut reader: &[u8] = &[0x00, 0x00, 0x00, 0x04];
        let err = codec().read_frame_header(&mut reader).await.unwrap_err();
        assert!(matches!(
            err,
            ParseError::Wire(WireError::ShortRead { expected: 9, received: 4 })
        ));
    }

    #[tokio::test]
    async fn oversized_payload_is_refused_before_reading() {
        let mut reader: &[u8] = &[0x01, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x01];
        let err = codec().read_frame(&mut reader).await.unwrap_err();
        assert!(matches!(err, ParseError::FrameTooLarge { length: 65_536, max: 16_384 }));
    }

    #[tokio::test]
    async fn other_frames_are_opaque() {
        let mut reader: &[u8] = &[0x00, 0x00, 0x04, 0x08, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00, 0xff, 0xff];
        let frame = codec().read_frame(&mut reader).await.unwrap();
        assert_eq!(frame.header.kind(), Some(FrameType::WindowUpdate));
        assert_eq!(frame.payload, FramePayload::Opaque(vec![0x00, 0x00, 0xff, 0xff]));
    }
}
