use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::audio::{ensure_headered, AudioBuffer, AudioFormat};
use crate::errors::ChannelError;
use crate::speech::{Synthesizer, Transcriber};

/// Audio formats and limits for the speech services
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelConfig {
    /// Format of raw PCM handed to `speech_to_text`
    pub capture_format: AudioFormat,
    /// Format of raw PCM returned by the synthesizer
    pub synthesis_format: AudioFormat,
    /// Limit for each transcription or synthesis attempt
    pub timeout: Duration,
    /// Total attempts per speech call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry, doubled for each later one
    pub retry_delay: Duration,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capture_format: AudioFormat::capture_default(),
            synthesis_format: AudioFormat::speech_default(),
            timeout: Duration::from_secs(10),
            max_attempts: 3,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Moves between audio and text through the external speech services
#[derive(Clone)]
pub struct TextChannel {
    transcriber: Arc<dyn Transcriber>,
    synthesizer: Arc<dyn Synthesizer>,
    config: ChannelConfig,
}

impl TextChannel {
    pub fn new(
        transcriber: Arc<dyn Transcriber>,
        synthesizer: Arc<dyn Synthesizer>,
        config: ChannelConfig,
    ) -> Self {
        Self {
            transcriber,
            synthesizer,
            config,
        }
    }

    pub fn config(&self) -> &ChannelConfig {
        &self.config
    }

    /// Transcribe recorded audio. Raw capture PCM is wrapped into the container first.
    pub async fn speech_to_text(&self, audio: &[u8]) -> Result<String, ChannelError> {
        if audio.is_empty() {
            return Err(ChannelError::Validation("Empty audio data".to_string()));
        }

        let headered = ensure_headered(audio.to_vec(), self.config.capture_format)?;
        tracing::debug!(
            audio_bytes = headered.len(),
            duration = ?headered.duration(),
            "transcribing audio"
        );

        let text = self
            .with_retry("transcription", || {
                self.transcriber.transcribe(headered.as_bytes())
            })
            .await?;
        Ok(text.trim().to_string())
    }

    /// Synthesize text into a playable buffer
    pub async fn text_to_speech(&self, text: &str) -> Result<AudioBuffer, ChannelError> {
        if text.trim().is_empty() {
            return Err(ChannelError::Validation("Empty text input".to_string()));
        }

        let pcm = self
            .with_retry("synthesis", || self.synthesizer.synthesize(text))
            .await?;
        let audio = ensure_headered(pcm, self.config.synthesis_format)?;
        tracing::debug!(
            audio_bytes = audio.len(),
            duration = ?audio.duration(),
            "synthesized reply"
        );
        Ok(audio)
    }

    /// Run a speech call, retrying failures and timeouts with exponential backoff
    async fn with_retry<T, F, Fut>(&self, operation: &str, call: F) -> Result<T, ChannelError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = anyhow::Result<T>>,
    {
        let max_attempts = self.config.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;
            let err = match tokio::time::timeout(self.config.timeout, call()).await {
                Ok(Ok(value)) => return Ok(value),
                Ok(Err(err)) => ChannelError::Transport(err.to_string()),
                Err(_) => ChannelError::Timeout(self.config.timeout),
            };

            if attempt >= max_attempts {
                tracing::error!(
                    operation,
                    attempts = attempt,
                    error = %err,
                    "speech service call failed"
                );
                return Err(err);
            }

            let delay = self.backoff(attempt);
            tracing::warn!(
                operation,
                attempt,
                error = %err,
                retry_in_ms = delay.as_millis() as u64,
                "speech service call failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.saturating_sub(1).min(16);
        self.config.retry_delay.saturating_mul(factor)
    }
}
