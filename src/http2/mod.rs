//! Minimal HTTP/2 framing.
//!
//! ## Data Flow
//!
//! ```text
//! channel ──► FrameCodec::read_preface ──► FrameCodec::read_frame ──► Http2Handler
//!                                               │                        │
//!                                      FrameHeader::decode        SETTINGS? ──► settings_ack
//!                                      decode_settings            otherwise ──► discard
//! ```
//!
//! Enough of RFC 9113 to complete the opening SETTINGS exchange and describe
//! what a client sends afterwards.

pub mod codec;
pub mod frame;
pub mod registry;
pub mod server;
pub mod settings;

pub use codec::{Frame, FrameCodec, FramePayload, PREFACE};
pub use frame::{settings_ack, FrameHeader, FRAME_HEADER_LEN};
pub use registry::{describe_frame_type, flag_name, flag_names, frame_type_name, FrameType, SettingId};
pub use server::Http2Handler;
pub use settings::{decode_settings, SettingsParameter};
