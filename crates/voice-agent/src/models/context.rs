use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::RunError;

/// Per-session details attached to every voice turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VoiceContext {
    pub session_id: String,
    pub user_id: Option<String>,
    /// Quality score of the captured audio, between 0.0 and 1.0
    pub audio_quality: f32,
}

impl VoiceContext {
    pub fn new<S: Into<String>>(
        session_id: S,
        user_id: Option<String>,
        audio_quality: f32,
    ) -> Result<Self, RunError> {
        if !(0.0..=1.0).contains(&audio_quality) {
            return Err(RunError::Validation(format!(
                "audio_quality must be between 0.0 and 1.0, got {}",
                audio_quality
            )));
        }
        let session_id = session_id.into();
        if session_id.trim().is_empty() {
            return Err(RunError::Validation("session_id cannot be empty".to_string()));
        }
        Ok(Self {
            session_id,
            user_id,
            audio_quality,
        })
    }

    /// A fresh anonymous session with a random id
    pub fn anonymous() -> Self {
        Self {
            session_id: Uuid::new_v4().to_string(),
            user_id: None,
            audio_quality: 1.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_voice_context_creation() {
        let context =
            VoiceContext::new("test-session", Some("test-user".to_string()), 0.8).unwrap();
        assert_eq!(context.session_id, "test-session");
        assert_eq!(context.user_id.as_deref(), Some("test-user"));
        assert_eq!(context.audio_quality, 0.8);
    }

    #[test]
    fn test_voice_context_rejects_quality_out_of_range() {
        assert!(matches!(
            VoiceContext::new("test-session", None, 1.5),
            Err(RunError::Validation(_))
        ));
        assert!(VoiceContext::new("test-session", None, -0.1).is_err());
    }

    #[test]
    fn test_voice_context_rejects_blank_session() {
        assert!(VoiceContext::new("  ", None, 0.5).is_err());
    }

    #[test]
    fn test_anonymous_sessions_are_distinct() {
        let a = VoiceContext::anonymous();
        let b = VoiceContext::anonymous();
        assert_ne!(a.session_id, b.session_id);
        assert!(a.user_id.is_none());
    }
}
