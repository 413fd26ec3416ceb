//! Audio format parameters carried by the container header.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

use crate::errors::AudioError;

const SUPPORTED_BITS: [u16; 4] = [8, 16, 24, 32];
const MAX_CHANNELS: u16 = 16;

/// Byte order of the PCM payload, signalled by the container tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ByteOrder {
    /// `RIFF` container
    #[default]
    LittleEndian,
    /// `RIFX` container
    BigEndian,
}

impl ByteOrder {
    pub fn tag(&self) -> &'static [u8; 4] {
        match self {
            ByteOrder::LittleEndian => b"RIFF",
            ByteOrder::BigEndian => b"RIFX",
        }
    }

    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            b"RIFF" => Some(ByteOrder::LittleEndian),
            b"RIFX" => Some(ByteOrder::BigEndian),
            _ => None,
        }
    }

    pub(crate) fn put_u16(&self, out: &mut Vec<u8>, value: u16) {
        match self {
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub(crate) fn put_u32(&self, out: &mut Vec<u8>, value: u32) {
        match self {
            ByteOrder::LittleEndian => out.extend_from_slice(&value.to_le_bytes()),
            ByteOrder::BigEndian => out.extend_from_slice(&value.to_be_bytes()),
        }
    }

    pub(crate) fn read_u16(&self, bytes: [u8; 2]) -> u16 {
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(bytes),
            ByteOrder::BigEndian => u16::from_be_bytes(bytes),
        }
    }

    pub(crate) fn read_u32(&self, bytes: [u8; 4]) -> u32 {
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(bytes),
            ByteOrder::BigEndian => u32::from_be_bytes(bytes),
        }
    }
}

/// Parameters needed to interpret a raw PCM payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioFormat {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    #[serde(default)]
    pub byte_order: ByteOrder,
}

impl AudioFormat {
    pub fn new(sample_rate: u32, channels: u16, bits_per_sample: u16) -> Self {
        Self {
            sample_rate,
            channels,
            bits_per_sample,
            byte_order: ByteOrder::LittleEndian,
        }
    }

    pub fn with_byte_order(mut self, byte_order: ByteOrder) -> Self {
        self.byte_order = byte_order;
        self
    }

    /// Microphone capture: 16 kHz mono 16-bit
    pub fn capture_default() -> Self {
        Self::new(16_000, 1, 16)
    }

    /// Raw PCM returned by speech synthesis endpoints: 24 kHz mono 16-bit
    pub fn speech_default() -> Self {
        Self::new(24_000, 1, 16)
    }

    pub fn bytes_per_sample(&self) -> u16 {
        self.bits_per_sample / 8
    }

    /// Bytes per frame (one sample for every channel)
    pub fn block_align(&self) -> u16 {
        self.channels.saturating_mul(self.bytes_per_sample())
    }

    pub fn byte_rate(&self) -> u32 {
        self.sample_rate.saturating_mul(u32::from(self.block_align()))
    }

    /// Playback length of a payload of the given size
    pub fn duration_of(&self, payload_len: usize) -> Duration {
        let byte_rate = self.byte_rate();
        if byte_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(payload_len as f64 / f64::from(byte_rate))
    }

    pub fn validate(&self) -> Result<(), AudioError> {
        if self.sample_rate == 0 {
            return Err(AudioError::InvalidFormat(
                "sample rate must be greater than zero".to_string(),
            ));
        }
        if self.channels == 0 || self.channels > MAX_CHANNELS {
            return Err(AudioError::InvalidFormat(format!(
                "channel count must be between 1 and {}, got {}",
                MAX_CHANNELS, self.channels
            )));
        }
        if !SUPPORTED_BITS.contains(&self.bits_per_sample) {
            return Err(AudioError::InvalidFormat(format!(
                "unsupported bits per sample {}, expected one of {:?}",
                self.bits_per_sample, SUPPORTED_BITS
            )));
        }
        if self.sample_rate.checked_mul(u32::from(self.block_align())).is_none() {
            return Err(AudioError::InvalidFormat(format!(
                "sample rate {} is too large",
                self.sample_rate
            )));
        }
        Ok(())
    }
}

impl Default for AudioFormat {
    fn default() -> Self {
        Self::capture_default()
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let order = match self.byte_order {
            ByteOrder::LittleEndian => "LE",
            ByteOrder::BigEndian => "BE",
        };
        write!(
            f,
            "{} Hz, {} channel(s), {}-bit {}",
            self.sample_rate, self.channels, self.bits_per_sample, order
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_derived_sizes() {
        let format = AudioFormat::new(44_100, 2, 16);
        assert_eq!(format.block_align(), 4);
        assert_eq!(format.byte_rate(), 176_400);
        assert_eq!(format.duration_of(176_400), Duration::from_secs(1));
    }

    #[test]
    fn test_defaults() {
        assert_eq!(AudioFormat::default(), AudioFormat::new(16_000, 1, 16));
        assert_eq!(AudioFormat::speech_default().sample_rate, 24_000);
        assert_eq!(AudioFormat::default().byte_order, ByteOrder::LittleEndian);
    }

    #[test]
    fn test_validate_rejects_bad_parameters() {
        assert!(AudioFormat::new(0, 1, 16).validate().is_err());
        assert!(AudioFormat::new(16_000, 0, 16).validate().is_err());
        assert!(AudioFormat::new(16_000, 17, 16).validate().is_err());
        assert!(AudioFormat::new(16_000, 1, 12).validate().is_err());
        assert!(AudioFormat::new(u32::MAX, 2, 32).validate().is_err());
        assert!(AudioFormat::new(48_000, 2, 24).validate().is_ok());
    }

    #[test]
    fn test_tags() {
        assert_eq!(ByteOrder::from_tag(b"RIFF"), Some(ByteOrder::LittleEndian));
        assert_eq!(ByteOrder::from_tag(b"RIFX"), Some(ByteOrder::BigEndian));
        assert_eq!(ByteOrder::from_tag(b"OggS"), None);
        assert_eq!(ByteOrder::BigEndian.tag(), b"RIFX");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            AudioFormat::capture_default().to_string(),
            "16000 Hz, 1 channel(s), 16-bit LE"
        );
    }
}
