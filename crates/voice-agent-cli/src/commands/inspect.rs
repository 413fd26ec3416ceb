use anyhow::{Context, Result};
use console::style;
use std::path::Path;
use voice_agent::audio::{unwrap, AudioBuffer, AudioFormat, BufferKind, HEADER_LEN};

/// Print what an audio file contains
pub async fn execute(path: &Path, capture_format: AudioFormat) -> Result<()> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    println!("{}", style(path.display()).bold());
    println!("{}", describe(bytes, capture_format)?);
    Ok(())
}

/// Human readable summary of a buffer's container and format
pub fn describe(bytes: Vec<u8>, capture_format: AudioFormat) -> Result<String> {
    let buffer = AudioBuffer::new(bytes);
    match buffer.kind() {
        BufferKind::Headered => {
            let (pcm, format) = unwrap(buffer.as_bytes()).context("Invalid audio container")?;
            Ok(format!(
                "container: WAV ({}-byte header)\nformat: {}\npayload: {} bytes\nduration: {:.2}s",
                HEADER_LEN,
                format,
                pcm.len(),
                format.duration_of(pcm.len()).as_secs_f64()
            ))
        }
        BufferKind::RawPcm => Ok(format!(
            "container: none (raw PCM)\nassumed format: {}\npayload: {} bytes\nduration: {:.2}s",
            capture_format,
            buffer.len(),
            capture_format.duration_of(buffer.len()).as_secs_f64()
        )),
    }
}
