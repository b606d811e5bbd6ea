use moodtune_core::{PipelinePolicy, DEFAULT_TRACK_LIMIT, LOW_CONFIDENCE_THRESHOLD};
use moodtune_remote::chat::{DEFAULT_CHAT_MODEL, DEFAULT_TEMPERATURE, GROQ_BASE_URL};
use moodtune_remote::{ChatSettings, SpotifyCredentials};
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("environment variable {0} is not set")]
    Missing(&'static str),
}

/// Process configuration, read once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct Config {
    pub spotify_client_id: Option<String>,
    pub spotify_client_secret: Option<String>,
    pub groq_api_key: Option<String>,
    /// Base URL of the OpenAI-compatible chat API.
    pub llm_base_url: String,
    pub llm_model: String,
    pub llm_temperature: f32,
    /// Timeout applied to every HTTP request.
    pub http_timeout_secs: u64,
    /// Directory containing the ONNX model files.
    pub model_dir: PathBuf,
    /// V4L2 device path (default: /dev/video0).
    pub camera_device: String,
    pub camera_width: u32,
    pub camera_height: u32,
    /// Frames discarded before a snapshot so exposure can settle.
    pub warmup_frames: usize,
    pub track_limit: usize,
    pub low_confidence_threshold: f32,
}

impl Config {
    /// Load configuration from the environment with defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let secret = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let parsed = |key: &str| lookup(key).and_then(|v| v.trim().parse().ok());

        Self {
            spotify_client_id: secret("SPOTIFY_CLIENT_ID"),
            spotify_client_secret: secret("SPOTIFY_CLIENT_SECRET"),
            groq_api_key: secret("GROQ_API_KEY"),
            llm_base_url: lookup("MOODTUNE_LLM_BASE_URL").unwrap_or_else(|| GROQ_BASE_URL.to_string()),
            llm_model: lookup("MOODTUNE_LLM_MODEL").unwrap_or_else(|| DEFAULT_CHAT_MODEL.to_string()),
            llm_temperature: parsed("MOODTUNE_LLM_TEMPERATURE").unwrap_or(DEFAULT_TEMPERATURE),
            http_timeout_secs: parsed("MOODTUNE_HTTP_TIMEOUT_SECS").unwrap_or(60),
            model_dir: lookup("MOODTUNE_MODEL_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(moodtune_vision::default_model_dir),
            camera_device: lookup("MOODTUNE_CAMERA_DEVICE").unwrap_or_else(|| "/dev/video0".to_string()),
            camera_width: parsed("MOODTUNE_CAMERA_WIDTH").unwrap_or(640),
            camera_height: parsed("MOODTUNE_CAMERA_HEIGHT").unwrap_or(480),
            warmup_frames: parsed("MOODTUNE_WARMUP_FRAMES").unwrap_or(4),
            track_limit: parsed("MOODTUNE_TRACK_LIMIT").unwrap_or(DEFAULT_TRACK_LIMIT),
            low_confidence_threshold: parsed("MOODTUNE_LOW_CONFIDENCE")
                .unwrap_or(LOW_CONFIDENCE_THRESHOLD),
        }
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn chat_settings(&self) -> Result<ChatSettings, ConfigError> {
        let api_key = self
            .groq_api_key
            .clone()
            .ok_or(ConfigError::Missing("GROQ_API_KEY"))?;
        Ok(ChatSettings {
            base_url: self.llm_base_url.clone(),
            model: self.llm_model.clone(),
            api_key,
            temperature: self.llm_temperature,
            timeout: self.http_timeout(),
        })
    }

    pub fn spotify_credentials(&self) -> Result<SpotifyCredentials, ConfigError> {
        Ok(SpotifyCredentials {
            client_id: self
                .spotify_client_id
                .clone()
                .ok_or(ConfigError::Missing("SPOTIFY_CLIENT_ID"))?,
            client_secret: self
                .spotify_client_secret
                .clone()
                .ok_or(ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))?,
        })
    }

    pub fn policy(&self) -> PipelinePolicy {
        PipelinePolicy {
            track_limit: self.track_limit,
            low_confidence_threshold: self.low_confidence_threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config(vars: &[(&str, &str)]) -> Config {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| map.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let c = config(&[("MOODTUNE_MODEL_DIR", "/opt/models")]);
        assert_eq!(c.llm_base_url, GROQ_BASE_URL);
        assert_eq!(c.llm_model, "llama-3.1-8b-instant");
        assert!((c.llm_temperature - 0.3).abs() < 1e-6);
        assert_eq!(c.track_limit, 5);
        assert!((c.low_confidence_threshold - 0.55).abs() < 1e-6);
        assert_eq!(c.camera_device, "/dev/video0");
        assert_eq!(c.model_dir, PathBuf::from("/opt/models"));
        assert_eq!(c.http_timeout(), Duration::from_secs(60));
    }

    #[test]
    fn test_overrides_and_bad_numbers() {
        let c = config(&[
            ("MOODTUNE_TRACK_LIMIT", "10"),
            ("MOODTUNE_LOW_CONFIDENCE", "0.7"),
            ("MOODTUNE_WARMUP_FRAMES", "lots"),
        ]);
        assert_eq!(c.policy().track_limit, 10);
        assert!((c.policy().low_confidence_threshold - 0.7).abs() < 1e-6);
        assert_eq!(c.warmup_frames, 4);
    }

    #[test]
    fn test_missing_credentials_are_reported() {
        let c = config(&[("SPOTIFY_CLIENT_ID", "id"), ("GROQ_API_KEY", "  ")]);
        assert!(matches!(c.chat_settings(), Err(ConfigError::Missing("GROQ_API_KEY"))));
        assert!(matches!(
            c.spotify_credentials(),
            Err(ConfigError::Missing("SPOTIFY_CLIENT_SECRET"))
        ));
    }

    #[test]
    fn test_credentials_present() {
        let c = config(&[
            ("SPOTIFY_CLIENT_ID", "id"),
            ("SPOTIFY_CLIENT_SECRET", "secret"),
            ("GROQ_API_KEY", "gsk"),
            ("MOODTUNE_LLM_MODEL", "llama-3.3-70b-versatile"),
        ]);
        let chat = c.chat_settings().unwrap();
        assert_eq!(chat.api_key, "gsk");
        assert_eq!(chat.model, "llama-3.3-70b-versatile");
        let spotify = c.spotify_credentials().unwrap();
        assert_eq!(spotify.client_secret, "secret");
    }
}
