pub mod inspect;
pub mod text;
pub mod tools;
pub mod voice;

use anyhow::{Context, Result};
use std::path::Path;
use std::sync::Arc;
use voice_agent::audio::AudioBuffer;
use voice_agent::providers::openai::OpenAiProvider;
use voice_agent::speech::OpenAiSpeech;
use voice_agent::tools::{PasswordResetTool, ToolRegistry};
use voice_agent::{Agent, TextChannel};

use crate::configuration::Settings;

/// Registry shared by every agent in the process
pub fn build_registry() -> Arc<ToolRegistry> {
    let mut registry = ToolRegistry::new();
    registry.register(PasswordResetTool::default());
    Arc::new(registry)
}

pub fn build_agent(settings: &Settings) -> Result<Agent> {
    let provider = OpenAiProvider::new(settings.provider_config())?;
    let agent = Agent::new(
        Box::new(provider),
        build_registry(),
        settings.agent_config()?,
    )?;
    Ok(agent)
}

pub fn build_channel(settings: &Settings) -> Result<TextChannel> {
    let speech = Arc::new(OpenAiSpeech::new(settings.speech_config())?);
    Ok(TextChannel::new(
        speech.clone(),
        speech,
        settings.channel_config()?,
    ))
}

pub async fn write_audio(path: &Path, audio: &AudioBuffer) -> Result<()> {
    tokio::fs::write(path, audio.as_bytes())
        .await
        .with_context(|| format!("Failed to write audio to {}", path.display()))
}
