//! SETTINGS payload decoding.
//!
//! A SETTINGS payload is a sequence of 6-octet entries: a 16-bit identifier
//! followed by a 32-bit value, both big-endian.

use std::fmt;

use crate::http2::registry::SettingId;

pub const SETTING_ENTRY_LEN: usize = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SettingsParameter {
    pub identifier: u16,
    pub value: u32,
}

impl SettingsParameter {
    pub fn id(&self) -> Option<SettingId> {
        SettingId::from_code(self.identifier)
    }

    pub fn name(&self) -> Option<&'static str> {
        self.id().map(SettingId::name)
    }
}

impl fmt::Display for SettingsParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{name}={}", self.value),
            None => write!(f, "UNKNOWN({:#06x})={}", self.identifier, self.value),
        }
    }
}

/// Decode every whole entry in `payload`, in order.
///
/// Trailing bytes that do not make up a full entry are ignored.
pub fn decode_settings(payload: &[u8]) -> Vec<SettingsParameter> {
    payload
        .chunks_exact(SETTING_ENTRY_LEN)
        .map(|entry| SettingsParameter {
            identifier: u16::from_be_bytes([entry[0], entry[1]]),
            value: u32::from_be_bytes([entry[2], entry[3], entry[4], entry[5]]),
        })
        .collect()
}
