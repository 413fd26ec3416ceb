//! Audio container handling
//!
//! Synthesis produces raw PCM and playback wants a self-describing file, so this module
//! moves between the two using a canonical 44-byte RIFF/WAVE header that is written and
//! parsed here without any external codec.
pub mod container;
pub mod format;

pub use container::{ensure_headered, is_headered, unwrap, wrap, AudioBuffer, BufferKind, HEADER_LEN};
pub use format::{AudioFormat, ByteOrder};
