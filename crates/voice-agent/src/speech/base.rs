use anyhow::Result;
use async_trait::async_trait;

/// Turns recorded speech into text
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe a headered audio buffer
    async fn transcribe(&self, audio: &[u8]) -> Result<String>;
}

/// Turns text into speech
#[async_trait]
pub trait Synthesizer: Send + Sync {
    /// Synthesize text into raw PCM with no header
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>>;
}
