use thiserror::Error;

pub const ENV_PREFIX: &str = "VOICE_AGENT";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration. Set the {env_var} environment variable")]
    MissingEnvVar { env_var: String },

    #[error("Invalid value for {key}: {reason}")]
    Invalid { key: String, reason: String },

    #[error("Configuration error: {0}")]
    Other(#[from] config::ConfigError),
}

/// Environment variable that sets a dotted settings key, e.g. `provider.api_key`
pub fn to_env_var(field: &str) -> String {
    let path = field.split('.').collect::<Vec<_>>().join("__");
    format!("{}_{}", ENV_PREFIX, path.to_uppercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_env_var() {
        assert_eq!(to_env_var("provider.api_key"), "VOICE_AGENT_PROVIDER__API_KEY");
        assert_eq!(to_env_var("audio"), "VOICE_AGENT_AUDIO");
    }

    #[test]
    fn test_missing_env_var_message() {
        let err = ConfigError::MissingEnvVar {
            env_var: to_env_var("provider.api_key"),
        };
        assert_eq!(
            err.to_string(),
            "Missing required configuration. Set the VOICE_AGENT_PROVIDER__API_KEY environment variable"
        );
    }
}
