use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::base::{Synthesizer, Transcriber};
use crate::providers::configs::OPENAI_HOST;

pub const TRANSCRIPTION_MODEL: &str = "whisper-1";
pub const SPEECH_MODEL: &str = "tts-1";
pub const SPEECH_VOICE: &str = "alloy";

#[derive(Clone)]
pub struct OpenAiSpeechConfig {
    pub host: String,
    pub api_key: String,
    pub transcription_model: String,
    pub speech_model: String,
    pub voice: String,
}

impl OpenAiSpeechConfig {
    pub fn new<S: Into<String>>(api_key: S) -> Self {
        Self {
            host: OPENAI_HOST.to_string(),
            api_key: api_key.into(),
            transcription_model: TRANSCRIPTION_MODEL.to_string(),
            speech_model: SPEECH_MODEL.to_string(),
            voice: SPEECH_VOICE.to_string(),
        }
    }
}

impl fmt::Debug for OpenAiSpeechConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OpenAiSpeechConfig")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("transcription_model", &self.transcription_model)
            .field("speech_model", &self.speech_model)
            .field("voice", &self.voice)
            .finish()
    }
}

#[derive(Deserialize)]
struct TranscriptionResponse {
    text: String,
}

#[derive(Serialize)]
struct SpeechRequest<'a> {
    model: &'a str,
    input: &'a str,
    voice: &'a str,
    response_format: &'a str,
}

/// Whisper transcription and TTS synthesis over the OpenAI audio endpoints.
///
/// Synthesis asks for `pcm`, which the endpoint returns as 24 kHz mono 16-bit little endian
/// samples without a header.
pub struct OpenAiSpeech {
    client: Client,
    config: OpenAiSpeechConfig,
}

impl OpenAiSpeech {
    pub fn new(config: OpenAiSpeechConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(anyhow!("An API key is required for speech services"));
        }
        let client = Client::builder().build()?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.host.trim_end_matches('/'), path)
    }
}

#[async_trait]
impl Transcriber for OpenAiSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        tracing::debug!(audio_bytes = audio.len(), "starting transcription");

        let form = Form::new()
            .part(
                "file",
                Part::bytes(audio.to_vec())
                    .file_name("audio.wav")
                    .mime_str("audio/wav")?,
            )
            .text("model", self.config.transcription_model.clone());

        let response = self
            .client
            .post(self.url("/v1/audio/transcriptions"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .multipart(form)
            .send()
            .await
            .context("transcription request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "transcription API error");
            return Err(anyhow!("Transcription failed with status {}", status));
        }

        let result: TranscriptionResponse = response
            .json()
            .await
            .context("failed to parse transcription response")?;
        tracing::debug!(chars = result.text.len(), "transcription complete");
        Ok(result.text)
    }
}

#[async_trait]
impl Synthesizer for OpenAiSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        tracing::debug!(chars = text.len(), voice = %self.config.voice, "starting synthesis");

        let request = SpeechRequest {
            model: &self.config.speech_model,
            input: text,
            voice: &self.config.voice,
            response_format: "pcm",
        };

        let response = self
            .client
            .post(self.url("/v1/audio/speech"))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .json(&request)
            .send()
            .await
            .context("speech request failed")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = %status, body = %body, "speech API error");
            return Err(anyhow!("Speech synthesis failed with status {}", status));
        }

        let audio = response.bytes().await?.to_vec();
        tracing::debug!(audio_bytes = audio.len(), "synthesis complete");
        Ok(audio)
    }
}
