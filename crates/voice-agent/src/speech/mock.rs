use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use super::base::{Synthesizer, Transcriber};

/// Canned transcription and synthesis for tests and offline demos
#[derive(Clone, Default)]
pub struct MockSpeech {
    transcript: String,
    pcm: Vec<u8>,
    failure: Option<String>,
    /// Only the first `n` calls fail when set
    failure_limit: Option<u32>,
    calls: Arc<Mutex<u32>>,
    delay: Option<Duration>,
    transcribed: Arc<Mutex<Vec<Vec<u8>>>>,
    synthesized: Arc<Mutex<Vec<String>>>,
}

impl MockSpeech {
    /// Always transcribe to `transcript` and synthesize to `pcm`
    pub fn new<S: Into<String>>(transcript: S, pcm: Vec<u8>) -> Self {
        Self {
            transcript: transcript.into(),
            pcm,
            ..Self::default()
        }
    }

    /// Every call fails with the given transport error
    pub fn failing<S: Into<String>>(reason: S) -> Self {
        Self {
            failure: Some(reason.into()),
            ..Self::default()
        }
    }

    /// The first `failures` calls fail, later calls answer like `new`
    pub fn flaky<S: Into<String>>(
        failures: u32,
        reason: S,
        transcript: S,
        pcm: Vec<u8>,
    ) -> Self {
        Self {
            failure: Some(reason.into()),
            failure_limit: Some(failures),
            ..Self::new(transcript, pcm)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Audio buffers passed to `transcribe`, in call order
    pub fn transcribed(&self) -> Vec<Vec<u8>> {
        self.transcribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Texts passed to `synthesize`, in call order
    pub fn synthesized(&self) -> Vec<String> {
        self.synthesized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    async fn respond<T>(&self, value: T) -> Result<T> {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let call = {
            let mut calls = self.calls.lock().unwrap_or_else(PoisonError::into_inner);
            *calls += 1;
            *calls
        };
        match (&self.failure, self.failure_limit) {
            (Some(reason), None) => Err(anyhow!(reason.clone())),
            (Some(reason), Some(limit)) if call <= limit => Err(anyhow!(reason.clone())),
            _ => Ok(value),
        }
    }
}

#[async_trait]
impl Transcriber for MockSpeech {
    async fn transcribe(&self, audio: &[u8]) -> Result<String> {
        self.transcribed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(audio.to_vec());
        self.respond(self.transcript.clone()).await
    }
}

#[async_trait]
impl Synthesizer for MockSpeech {
    async fn synthesize(&self, text: &str) -> Result<Vec<u8>> {
        self.synthesized
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(text.to_string());
        self.respond(self.pcm.clone()).await
    }
}
