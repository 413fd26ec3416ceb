//! Transcription and synthesis capabilities used by the text channel
pub mod base;
pub mod mock;
pub mod openai;

pub use base::{Synthesizer, Transcriber};
pub use mock::MockSpeech;
pub use openai::{OpenAiSpeech, OpenAiSpeechConfig};
