use anyhow::{bail, Context, Result};
use console::style;
use std::path::Path;
use std::time::Duration;
use voice_agent::audio::{unwrap, AudioBuffer, AudioFormat, BufferKind};
use voice_agent::models::context::VoiceContext;
use voice_agent::VoicePipeline;

use super::{build_agent, build_channel, write_audio};
use crate::configuration::Settings;

pub async fn execute(settings: &Settings, input: &Path, out: &Path) -> Result<()> {
    let recording = tokio::fs::read(input)
        .await
        .with_context(|| format!("Failed to read recording {}", input.display()))?;

    let length = recording_length(&recording, settings.audio.capture_format())?;
    if length > settings.audio.max_recording() {
        bail!(
            "Recording is {:.1}s long, the limit is {}s",
            length.as_secs_f64(),
            settings.audio.max_recording_secs
        );
    }

    let pipeline = VoicePipeline::new(build_channel(settings)?, build_agent(settings)?);
    let exchange = pipeline
        .respond(&VoiceContext::anonymous(), &recording)
        .await?;

    println!("{} {}", style("you:").bold().cyan(), exchange.transcript);
    println!("{} {}", style("assistant:").bold().green(), exchange.reply_text);

    write_audio(out, &exchange.audio).await?;
    println!(
        "{} {}",
        style("reply written to").dim(),
        style(out.display()).bold()
    );
    Ok(())
}

/// Playback length of a recording, headered or raw capture PCM
pub fn recording_length(recording: &[u8], capture_format: AudioFormat) -> Result<Duration> {
    let buffer = AudioBuffer::new(recording.to_vec());
    match buffer.kind() {
        BufferKind::Headered => {
            let (pcm, format) = unwrap(recording)?;
            Ok(format.duration_of(pcm.len()))
        }
        BufferKind::RawPcm => Ok(capture_format.duration_of(recording.len())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use voice_agent::audio::wrap;

    #[test]
    fn test_recording_length() {
        let capture = AudioFormat::capture_default();
        assert_eq!(
            recording_length(&vec![0u8; 32_000], capture).unwrap(),
            Duration::from_secs(1)
        );

        let wav = wrap(&vec![0u8; 16_000], AudioFormat::new(8_000, 1, 16)).unwrap();
        assert_eq!(
            recording_length(wav.as_bytes(), capture).unwrap(),
            Duration::from_secs(1)
        );
    }

    #[test]
    fn test_corrupt_wav_is_an_error() {
        let mut wav = wrap(&[0u8; 64], AudioFormat::capture_default())
            .unwrap()
            .into_bytes();
        wav.truncate(50);
        assert!(recording_length(&wav, AudioFormat::capture_default()).is_err());
    }
}
