//! Frame-type, flag and settings-parameter names.
//!
//! Process-wide, read-only tables. Diagnostics use them for every frame;
//! the codec uses them to pick a payload decoder.

/// Frame type codes (RFC 9113 section 6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FrameType {
    Data = 0x0,
    Headers = 0x1,
    Priority = 0x2,
    RstStream = 0x3,
    Settings = 0x4,
    PushPromise = 0x5,
    Ping = 0x6,
    GoAway = 0x7,
    WindowUpdate = 0x8,
    Continuation = 0x9,
}

/// Flag bits shared by several frame types.
pub mod flags {
    pub const END_STREAM: u8 = 0x1;
    pub const ACK: u8 = 0x1;
    pub const END_HEADERS: u8 = 0x4;
    pub const PADDED: u8 = 0x8;
    pub const PRIORITY: u8 = 0x20;
}

const FRAME_TYPES: [FrameType; 10] = [
    FrameType::Data,
    FrameType::Headers,
    FrameType::Priority,
    FrameType::RstStream,
    FrameType::Settings,
    FrameType::PushPromise,
    FrameType::Ping,
    FrameType::GoAway,
    FrameType::WindowUpdate,
    FrameType::Continuation,
];

impl FrameType {
    pub fn from_code(code: u8) -> Option<Self> {
        FRAME_TYPES.get(code as usize).copied()
    }

    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn name(self) -> &'static str {
        match self {
            FrameType::Data => "DATA",
            FrameType::Headers => "HEADERS",
            FrameType::Priority => "PRIORITY",
            FrameType::RstStream => "RST_STREAM",
            FrameType::Settings => "SETTINGS",
            FrameType::PushPromise => "PUSH_PROMISE",
            FrameType::Ping => "PING",
            FrameType::GoAway => "GOAWAY",
            FrameType::WindowUpdate => "WINDOW_UPDATE",
            FrameType::Continuation => "CONTINUATION",
        }
    }

    /// Flags this frame type defines, as `(bit, name)`.
    pub fn flags(self) -> &'static [(u8, &'static str)] {
        use flags::*;
        match self {
            FrameType::Data => &[(END_STREAM, "END_STREAM"), (PADDED, "PADDED")],
            FrameType::Headers => &[
                (END_STREAM, "END_STREAM"),
                (END_HEADERS, "END_HEADERS"),
                (PADDED, "PADDED"),
                (PRIORITY, "PRIORITY"),
            ],
            FrameType::Settings | FrameType::Ping => &[(ACK, "ACK")],
            FrameType::PushPromise => &[(END_HEADERS, "END_HEADERS"), (PADDED, "PADDED")],
            FrameType::Continuation => &[(END_HEADERS, "END_HEADERS")],
            FrameType::Priority
            | FrameType::RstStream
            | FrameType::GoAway
            | FrameType::WindowUpdate => &[],
        }
    }
}

/// Name of a frame type code, if it is one this registry knows.
pub fn frame_type_name(code: u8) -> Option<&'static str> {
    FrameType::from_code(code).map(FrameType::name)
}

/// Display form of a frame type, `UNKNOWN(0x..)` for unregistered codes.
pub fn describe_frame_type(code: u8) -> String {
    match frame_type_name(code) {
        Some(name) => name.to_string(),
        None => format!("UNKNOWN({code:#04x})"),
    }
}

/// Name of one flag bit for a frame type.
pub fn flag_name(frame_type: u8, bit: u8) -> Option<&'static str> {
    FrameType::from_code(frame_type)?
        .flags()
        .iter()
        .find(|(b, _)| *b == bit)
        .map(|(_, name)| *name)
}

/// Names of every defined flag set in `flags`. Undefined bits are ignored.
pub fn flag_names(frame_type: u8, flags: u8) -> Vec<&'static str> {
    FrameType::from_code(frame_type)
        .map(|t| {
            t.flags()
                .iter()
                .filter(|(bit, _)| flags & bit != 0)
                .map(|(_, name)| *name)
                .collect()
        })
        .unwrap_or_default()
}

/// SETTINGS parameter identifiers (RFC 9113 section 6.5.2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u16)]
pub enum SettingId {
    HeaderTableSize = 0x1,
    EnablePush = 0x2,
    MaxConcurrentStreams = 0x3,
    InitialWindowSize = 0x4,
    MaxFrameSize = 0x5,
    MaxHeaderListSize = 0x6,
}

impl SettingId {
    pub fn from_code(code: u16) -> Option<Self> {
        match code {
            0x1 => Some(SettingId::HeaderTableSize),
            0x2 => Some(SettingId::EnablePush),
            0x3 => Some(SettingId::MaxConcurrentStreams),
            0x4 => Some(SettingId::InitialWindowSize),
            0x5 => Some(SettingId::MaxFrameSize),
            0x6 => Some(SettingId::MaxHeaderListSize),
            _ => None,
        }
    }

    pub fn code(self) -> u16 {
        self as u16
    }

    pub fn name(self) -> &'static str {
        match self {
            SettingId::HeaderTableSize => "SETTINGS_HEADER_TABLE_SIZE",
            SettingId::EnablePush => "SETTINGS_ENABLE_PUSH",
            SettingId::MaxConcurrentStreams => "SETTINGS_MAX_CONCURRENT_STREAMS",
            SettingId::InitialWindowSize => "SETTINGS_INITIAL_WINDOW_SIZE",
            SettingId::MaxFrameSize => "SETTINGS_MAX_FRAME_SIZE",
            SettingId::MaxHeaderListSize => "SETTINGS_MAX_HEADER_LIST_SIZE",
        }
    }
}
