use crate::error::{to_env_var, ConfigError, ENV_PREFIX};
use config::{Config, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::Path;
use std::time::Duration;
use voice_agent::agent::{AgentConfig, DEFAULT_AGENT_NAME};
use voice_agent::audio::AudioFormat;
use voice_agent::channel::ChannelConfig;
use voice_agent::providers::configs::{OpenAiProviderConfig, OPENAI_DEFAULT_MODEL, OPENAI_HOST};
use voice_agent::speech::openai::{
    OpenAiSpeechConfig, SPEECH_MODEL, SPEECH_VOICE, TRANSCRIPTION_MODEL,
};

/// Settings file picked up from the working directory when `--config` is not given
const DEFAULT_CONFIG_FILE: &str = "voice-agent";

#[derive(Clone, Deserialize)]
pub struct ProviderSettings {
    pub host: String,
    #[serde(default)]
    pub api_key: String,
    pub model: String,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<i32>,
}

impl fmt::Debug for ProviderSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ProviderSettings")
            .field("host", &self.host)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .finish()
    }
}

impl ProviderSettings {
    pub fn into_config(self) -> OpenAiProviderConfig {
        OpenAiProviderConfig {
            host: self.host,
            api_key: self.api_key,
            model: self.model,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SpeechSettings {
    pub host: String,
    pub transcription_model: String,
    pub speech_model: String,
    pub voice: String,
    pub sample_rate: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    /// Longest recording accepted by the voice command
    pub max_recording_secs: u64,
}

impl AudioSettings {
    pub fn capture_format(&self) -> AudioFormat {
        AudioFormat::new(self.sample_rate, self.channels, self.bits_per_sample)
    }

    pub fn max_recording(&self) -> Duration {
        Duration::from_secs(self.max_recording_secs)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSettings {
    pub name: String,
    pub max_rounds: u32,
    /// Total attempts per external call
    pub max_retries: u32,
    pub retry_delay: f64,
    pub api_timeout: f64,
    pub tool_timeout: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    pub provider: ProviderSettings,
    pub speech: SpeechSettings,
    pub audio: AudioSettings,
    pub agent: AgentSettings,
}

impl Settings {
    /// Load settings from defaults, then the settings file, then the environment
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let settings = Self::load_layers(config_file)?;
        settings.validate()?;
        Ok(settings)
    }

    fn load_layers(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let file = match config_file {
            Some(path) => File::from(path).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            // Provider defaults
            .set_default("provider.host", OPENAI_HOST)?
            .set_default("provider.model", OPENAI_DEFAULT_MODEL)?
            .set_default("provider.temperature", 0.7)?
            // Speech defaults
            .set_default("speech.host", OPENAI_HOST)?
            .set_default("speech.transcription_model", TRANSCRIPTION_MODEL)?
            .set_default("speech.speech_model", SPEECH_MODEL)?
            .set_default("speech.voice", SPEECH_VOICE)?
            .set_default(
                "speech.sample_rate",
                i64::from(AudioFormat::speech_default().sample_rate),
            )?
            // Audio defaults
            .set_default("audio.sample_rate", 16_000i64)?
            .set_default("audio.channels", 1i64)?
            .set_default("audio.bits_per_sample", 16i64)?
            .set_default("audio.max_recording_secs", 30i64)?
            // Agent defaults
            .set_default("agent.name", DEFAULT_AGENT_NAME)?
            .set_default("agent.max_rounds", 8i64)?
            .set_default("agent.max_retries", 3i64)?
            .set_default("agent.retry_delay", 0.5)?
            .set_default("agent.api_timeout", 10.0)?
            .set_default("agent.tool_timeout", 10.0)?
            .add_source(file)
            // Layer on the environment variables
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Try to deserialize the configuration
        let result: Result<Self, config::ConfigError> = config.try_deserialize();

        match result {
            Ok(settings) => Ok(settings),
            Err(err) => {
                tracing::debug!("Configuration error: {:?}", &err);

                let error_str = err.to_string();
                if let Some(field) = missing_field(&error_str) {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(&field),
                    })
                } else if let config::ConfigError::NotFound(field) = &err {
                    Err(ConfigError::MissingEnvVar {
                        env_var: to_env_var(field),
                    })
                } else {
                    Err(ConfigError::Other(err))
                }
            }
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.provider.api_key.trim().is_empty() {
            return Err(ConfigError::MissingEnvVar {
                env_var: to_env_var("provider.api_key"),
            });
        }
        self.audio
            .capture_format()
            .validate()
            .map_err(|e| invalid("audio", e))?;
        self.synthesis_format()
            .validate()
            .map_err(|e| invalid("speech.sample_rate", e))?;
        if self.agent.max_rounds == 0 {
            return Err(invalid("agent.max_rounds", "must be at least 1"));
        }
        if self.agent.max_retries == 0 {
            return Err(invalid("agent.max_retries", "must be at least 1"));
        }
        for (key, secs) in [
            ("agent.retry_delay", self.agent.retry_delay),
            ("agent.api_timeout", self.agent.api_timeout),
            ("agent.tool_timeout", self.agent.tool_timeout),
        ] {
            seconds(key, secs)?;
        }
        Ok(())
    }

    pub fn synthesis_format(&self) -> AudioFormat {
        AudioFormat::new(self.speech.sample_rate, 1, 16)
    }

    pub fn provider_config(&self) -> OpenAiProviderConfig {
        self.provider.clone().into_config()
    }

    pub fn speech_config(&self) -> OpenAiSpeechConfig {
        OpenAiSpeechConfig {
            host: self.speech.host.clone(),
            api_key: self.provider.api_key.clone(),
            transcription_model: self.speech.transcription_model.clone(),
            speech_model: self.speech.speech_model.clone(),
            voice: self.speech.voice.clone(),
        }
    }

    pub fn agent_config(&self) -> Result<AgentConfig, ConfigError> {
        Ok(AgentConfig {
            name: self.agent.name.clone(),
            max_rounds: self.agent.max_rounds,
            max_attempts: self.agent.max_retries,
            retry_delay: seconds("agent.retry_delay", self.agent.retry_delay)?,
            call_timeout: seconds("agent.api_timeout", self.agent.api_timeout)?,
            tool_timeout: seconds("agent.tool_timeout", self.agent.tool_timeout)?,
        })
    }

    pub fn channel_config(&self) -> Result<ChannelConfig, ConfigError> {
        Ok(ChannelConfig {
            capture_format: self.audio.capture_format(),
            synthesis_format: self.synthesis_format(),
            timeout: seconds("agent.api_timeout", self.agent.api_timeout)?,
            max_attempts: self.agent.max_retries,
            retry_delay: seconds("agent.retry_delay", self.agent.retry_delay)?,
        })
    }
}

fn missing_field(error: &str) -> Option<String> {
    // "missing field `api_key`", possibly followed by " for key `provider`"
    let rest = error.strip_prefix("missing field `")?;
    let (field, rest) = rest.split_once('`')?;
    match rest.split_once("for key `") {
        Some((_, parent)) => Some(format!("{}.{}", parent.trim_end_matches('`'), field)),
        None => Some(field.to_string()),
    }
}

fn invalid(key: &str, reason: impl ToString) -> ConfigError {
    ConfigError::Invalid {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

fn seconds(key: &str, secs: f64) -> Result<Duration, ConfigError> {
    Duration::try_from_secs_f64(secs).map_err(|e| invalid(key, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::env;
    use std::io::Write;

    fn clean_env() {
        for (key, _) in env::vars() {
            if key.starts_with("VOICE_AGENT_") {
                env::remove_var(&key);
            }
        }
    }

    #[test]
    #[serial]
    fn test_default_settings() {
        clean_env();
        env::set_var("VOICE_AGENT_PROVIDER__API_KEY", "test-key");

        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.provider.host, "https://api.openai.com");
        assert_eq!(settings.provider.api_key, "test-key");
        assert_eq!(settings.provider.model, "gpt-4-turbo");
        assert_eq!(settings.provider.temperature, Some(0.7));
        assert_eq!(settings.provider.max_tokens, None);
        assert_eq!(settings.audio.capture_format(), AudioFormat::capture_default());
        assert_eq!(settings.audio.max_recording(), Duration::from_secs(30));
        assert_eq!(settings.synthesis_format(), AudioFormat::speech_default());
        assert_eq!(settings.speech.voice, "alloy");

        let agent = settings.agent_config().unwrap();
        assert_eq!(agent.max_rounds, 8);
        assert_eq!(agent.max_attempts, 3);
        assert_eq!(agent.retry_delay, Duration::from_millis(500));
        assert_eq!(agent.call_timeout, Duration::from_secs(10));

        let channel = settings.channel_config().unwrap();
        assert_eq!(channel.max_attempts, 3);
        assert_eq!(channel.retry_delay, Duration::from_millis(500));
        assert_eq!(channel.timeout, Duration::from_secs(10));

        // Clean up
        env::remove_var("VOICE_AGENT_PROVIDER__API_KEY");
    }

    #[test]
    #[serial]
    fn test_missing_api_key_names_env_var() {
        clean_env();

        match Settings::load(None) {
            Err(ConfigError::MissingEnvVar { env_var }) => {
                assert_eq!(env_var, "VOICE_AGENT_PROVIDER__API_KEY")
            }
            other => panic!("expected MissingEnvVar, got {:?}", other),
        }
    }

    #[test]
    #[serial]
    fn test_environment_override() {
        clean_env();
        env::set_var("VOICE_AGENT_PROVIDER__API_KEY", "test-key");
        env::set_var("VOICE_AGENT_PROVIDER__MODEL", "gpt-4o-mini");
        env::set_var("VOICE_AGENT_PROVIDER__TEMPERATURE", "0.2");
        env::set_var("VOICE_AGENT_AGENT__MAX_ROUNDS", "4");
        env::set_var("VOICE_AGENT_AUDIO__SAMPLE_RATE", "8000");
        env::set_var("VOICE_AGENT_AGENT__MAX_RETRIES", "5");

        let settings = Settings::load(None).unwrap();
        assert_eq!(settings.provider.model, "gpt-4o-mini");
        assert_eq!(settings.provider.temperature, Some(0.2));
        assert_eq!(settings.agent.max_rounds, 4);
        assert_eq!(settings.audio.sample_rate, 8000);
        assert_eq!(settings.channel_config().unwrap().max_attempts, 5);

        // Clean up
        env::remove_var("VOICE_AGENT_PROVIDER__API_KEY");
        env::remove_var("VOICE_AGENT_PROVIDER__MODEL");
        env::remove_var("VOICE_AGENT_PROVIDER__TEMPERATURE");
        env::remove_var("VOICE_AGENT_AGENT__MAX_ROUNDS");
        env::remove_var("VOICE_AGENT_AUDIO__SAMPLE_RATE");
        env::remove_var("VOICE_AGENT_AGENT__MAX_RETRIES");
    }

    #[test]
    #[serial]
    fn test_settings_file() {
        clean_env();
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[provider]\napi_key = \"file-key\"\n\n[speech]\nvoice = \"nova\"\n\n[agent]\nname = \"Aria\"\napi_timeout = 2.5"
        )
        .unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.provider.api_key, "file-key");
        assert_eq!(settings.speech.voice, "nova");
        assert_eq!(settings.speech_config().api_key, "file-key");
        let agent = settings.agent_config().unwrap();
        assert_eq!(agent.name, "Aria");
        assert_eq!(agent.call_timeout, Duration::from_millis(2500));
    }

    #[test]
    #[serial]
    fn test_invalid_values_are_rejected() {
        clean_env();
        env::set_var("VOICE_AGENT_PROVIDER__API_KEY", "test-key");
        env::set_var("VOICE_AGENT_AUDIO__BITS_PER_SAMPLE", "12");
        assert!(matches!(
            Settings::load(None),
            Err(ConfigError::Invalid { .. })
        ));
        env::remove_var("VOICE_AGENT_AUDIO__BITS_PER_SAMPLE");

        env::set_var("VOICE_AGENT_AGENT__RETRY_DELAY", "-1.0");
        match Settings::load(None) {
            Err(ConfigError::Invalid { key, .. }) => assert_eq!(key, "agent.retry_delay"),
            other => panic!("expected Invalid, got {:?}", other),
        }

        // Clean up
        env::remove_var("VOICE_AGENT_AGENT__RETRY_DELAY");
        env::remove_var("VOICE_AGENT_PROVIDER__API_KEY");
    }

    #[test]
    fn test_missing_field_parsing() {
        assert_eq!(
            missing_field("missing field `api_key`"),
            Some("api_key".to_string())
        );
        assert_eq!(
            missing_field("missing field `api_key` for key `provider`"),
            Some("provider.api_key".to_string())
        );
        assert_eq!(missing_field("invalid type: string"), None);
    }
}
