use std::fmt;
use std::time::Duration;

use super::format::{AudioFormat, ByteOrder};
use crate::errors::AudioError;

/// Size of the fixed preamble in front of every payload
pub const HEADER_LEN: usize = 44;

const WAVE_TAG: &[u8; 4] = b"WAVE";
const FMT_TAG: &[u8; 4] = b"fmt ";
const DATA_TAG: &[u8; 4] = b"data";
const FMT_CHUNK_LEN: u32 = 16;
const PCM_FORMAT_TAG: u16 = 1;
/// RIFF size counts everything after the first eight bytes
const RIFF_OVERHEAD: u32 = (HEADER_LEN - 8) as u32;

/// What an audio buffer appears to contain, judged from its first bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferKind {
    Headered,
    RawPcm,
}

/// Audio bytes, either raw PCM or a headered container
#[derive(Clone, PartialEq, Eq, Default)]
pub struct AudioBuffer(Vec<u8>);

impl AudioBuffer {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn kind(&self) -> BufferKind {
        if is_headered(&self.0) {
            BufferKind::Headered
        } else {
            BufferKind::RawPcm
        }
    }

    /// Playback length, if the buffer carries a valid header
    pub fn duration(&self) -> Option<Duration> {
        Header::parse(&self.0)
            .ok()
            .map(|header| header.format.duration_of(self.0.len() - HEADER_LEN))
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("kind", &self.kind())
            .field("len", &self.0.len())
            .finish()
    }
}

impl From<Vec<u8>> for AudioBuffer {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for AudioBuffer {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

/// Whether the buffer starts with the container tag sequence.
///
/// This is a sniff of the first twelve bytes: raw PCM that happens to begin with
/// `RIFF????WAVE` is reported as headered.
pub fn is_headered(buffer: &[u8]) -> bool {
    buffer.len() >= 12
        && ByteOrder::from_tag(&buffer[0..4]).is_some()
        && &buffer[8..12] == WAVE_TAG
}

/// Prefix raw PCM with a container header. The payload is copied unmodified.
pub fn wrap(raw_pcm: &[u8], format: AudioFormat) -> Result<AudioBuffer, AudioError> {
    if is_headered(raw_pcm) {
        return Err(AudioError::AlreadyHeadered);
    }
    format.validate()?;

    let block_align = usize::from(format.block_align());
    if raw_pcm.len() % block_align != 0 {
        return Err(AudioError::InvalidFormat(format!(
            "payload of {} bytes is not a whole number of {}-byte frames",
            raw_pcm.len(),
            block_align
        )));
    }
    let data_len = u32::try_from(raw_pcm.len())
        .ok()
        .filter(|len| len.checked_add(RIFF_OVERHEAD).is_some())
        .ok_or_else(|| {
            AudioError::InvalidFormat(format!(
                "payload of {} bytes is too large for the container",
                raw_pcm.len()
            ))
        })?;

    let order = format.byte_order;
    let mut out = Vec::with_capacity(HEADER_LEN + raw_pcm.len());
    out.extend_from_slice(order.tag());
    order.put_u32(&mut out, RIFF_OVERHEAD + data_len);
    out.extend_from_slice(WAVE_TAG);
    out.extend_from_slice(FMT_TAG);
    order.put_u32(&mut out, FMT_CHUNK_LEN);
    order.put_u16(&mut out, PCM_FORMAT_TAG);
    order.put_u16(&mut out, format.channels);
    order.put_u32(&mut out, format.sample_rate);
    order.put_u32(&mut out, format.byte_rate());
    order.put_u16(&mut out, format.block_align());
    order.put_u16(&mut out, format.bits_per_sample);
    out.extend_from_slice(DATA_TAG);
    order.put_u32(&mut out, data_len);
    debug_assert_eq!(out.len(), HEADER_LEN);
    out.extend_from_slice(raw_pcm);

    Ok(AudioBuffer(out))
}

/// Return headered input untouched and wrap anything else
pub fn ensure_headered(buffer: Vec<u8>, format: AudioFormat) -> Result<AudioBuffer, AudioError> {
    if is_headered(&buffer) {
        Ok(AudioBuffer(buffer))
    } else {
        wrap(&buffer, format)
    }
}

/// Split a headered buffer into its PCM payload and format
pub fn unwrap(buffer: &[u8]) -> Result<(Vec<u8>, AudioFormat), AudioError> {
    let header = Header::parse(buffer)?;
    Ok((buffer[HEADER_LEN..].to_vec(), header.format))
}

struct Header {
    format: AudioFormat,
}

impl Header {
    fn parse(buffer: &[u8]) -> Result<Self, AudioError> {
        let malformed = |msg: String| AudioError::MalformedContainer(msg);

        if buffer.len() < 4 {
            return Err(malformed(format!(
                "buffer of {} bytes is too short for a container tag",
                buffer.len()
            )));
        }
        let order = ByteOrder::from_tag(&buffer[0..4])
            .ok_or_else(|| malformed("missing RIFF/RIFX tag".to_string()))?;
        if buffer.len() < HEADER_LEN {
            return Err(malformed(format!(
                "truncated header: {} of {} bytes",
                buffer.len(),
                HEADER_LEN
            )));
        }

        let u16_at = |offset: usize| order.read_u16([buffer[offset], buffer[offset + 1]]);
        let u32_at = |offset: usize| {
            order.read_u32([
                buffer[offset],
                buffer[offset + 1],
                buffer[offset + 2],
                buffer[offset + 3],
            ])
        };

        if &buffer[8..12] != WAVE_TAG {
            return Err(malformed("missing WAVE tag".to_string()));
        }
        if &buffer[12..16] != FMT_TAG || u32_at(16) != FMT_CHUNK_LEN {
            return Err(malformed("expected a 16-byte fmt chunk".to_string()));
        }
        if u16_at(20) != PCM_FORMAT_TAG {
            return Err(malformed(format!(
                "unsupported encoding {}, only PCM is accepted",
                u16_at(20)
            )));
        }
        if &buffer[36..40] != DATA_TAG {
            return Err(malformed("expected data chunk after fmt chunk".to_string()));
        }

        let format = AudioFormat {
            sample_rate: u32_at(24),
            channels: u16_at(22),
            bits_per_sample: u16_at(34),
            byte_order: order,
        };
        format
            .validate()
            .map_err(|e| malformed(format!("invalid format fields: {}", e)))?;
        if u32_at(28) != format.byte_rate() || u16_at(32) != format.block_align() {
            return Err(malformed(
                "byte rate or block align disagree with the format".to_string(),
            ));
        }

        let declared = u32_at(40) as usize;
        let remaining = buffer.len() - HEADER_LEN;
        if declared != remaining {
            return Err(malformed(format!(
                "declared payload length {} but {} bytes follow the header",
                declared, remaining
            )));
        }
        if u32_at(4) as usize != declared + RIFF_OVERHEAD as usize {
            return Err(malformed(format!(
                "RIFF size {} does not match payload length {}",
                u32_at(4),
                declared
            )));
        }

        Ok(Self { format })
    }
}
