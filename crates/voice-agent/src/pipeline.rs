use tracing::Instrument;

use crate::agent::Agent;
use crate::audio::AudioBuffer;
use crate::channel::TextChannel;
use crate::errors::ChannelError;
use crate::models::context::VoiceContext;

/// Everything produced by one spoken turn
#[derive(Debug, Clone)]
pub struct Exchange {
    pub transcript: String,
    pub reply_text: String,
    /// Headered audio of the spoken reply
    pub audio: AudioBuffer,
}

/// One spoken turn end to end: transcribe, run the agent, speak the reply
pub struct VoicePipeline {
    channel: TextChannel,
    agent: Agent,
}

impl VoicePipeline {
    pub fn new(channel: TextChannel, agent: Agent) -> Self {
        Self { channel, agent }
    }

    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub fn channel(&self) -> &TextChannel {
        &self.channel
    }

    /// Respond to recorded audio.
    ///
    /// A failed run is spoken back as an apology rather than returned as an error, so the
    /// caller always has something to play. Failures of the speech services are returned.
    pub async fn respond(
        &self,
        context: &VoiceContext,
        audio: &[u8],
    ) -> Result<Exchange, ChannelError> {
        let span = tracing::info_span!(
            "voice_turn",
            session_id = %context.session_id,
            audio_quality = context.audio_quality
        );
        self.respond_inner(audio).instrument(span).await
    }

    async fn respond_inner(&self, audio: &[u8]) -> Result<Exchange, ChannelError> {
        let transcript = self.channel.speech_to_text(audio).await?;
        tracing::debug!(chars = transcript.len(), "transcribed user audio");

        let reply_text = match self.agent.run(&transcript).await {
            Ok(reply) => reply.text,
            Err(err) => {
                tracing::warn!(error = %err, "run failed, apologising to the user");
                err.user_message()
            }
        };

        let audio = self.channel.text_to_speech(&reply_text).await?;
        tracing::info!(audio_bytes = audio.len(), "voice turn complete");
        Ok(Exchange {
            transcript,
            reply_text,
            audio,
        })
    }
}
