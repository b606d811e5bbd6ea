//! OpenAI-compatible chat completions client.
//!
//! Works with Groq, OpenAI, OpenRouter and any other service exposing
//! `POST {base_url}/chat/completions`.

use moodtune_core::{GenerationError, TextGenerator};
use reqwest::blocking::Client;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const GROQ_BASE_URL: &str = "https://api.groq.com/openai/v1";
pub const DEFAULT_CHAT_MODEL: &str = "llama-3.1-8b-instant";
pub const DEFAULT_TEMPERATURE: f32 = 0.3;

/// Connection settings for a chat completions endpoint.
#[derive(Debug, Clone)]
pub struct ChatSettings {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub temperature: f32,
    pub timeout: Duration,
}

impl ChatSettings {
    pub fn groq(api_key: impl Into<String>) -> Self {
        Self {
            base_url: GROQ_BASE_URL.to_string(),
            model: DEFAULT_CHAT_MODEL.to_string(),
            api_key: api_key.into(),
            temperature: DEFAULT_TEMPERATURE,
            timeout: Duration::from_secs(60),
        }
    }
}

pub struct ChatCompletionsClient {
    client: Client,
    settings: ChatSettings,
}

impl ChatCompletionsClient {
    pub fn new(settings: ChatSettings) -> Result<Self, GenerationError> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .build()
            .map_err(|e| GenerationError::Connection(e.to_string()))?;
        Ok(Self { client, settings })
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.settings.base_url.trim_end_matches('/'))
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.settings.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: self.settings.temperature,
        }
    }
}

impl TextGenerator for ChatCompletionsClient {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        tracing::debug!(model = %self.settings.model, prompt_len = prompt.len(), "sending chat completion request");

        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.settings.api_key)
            .json(&self.request_body(prompt))
            .send()
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(status_error(status, body));
        }

        let body: ChatResponse = response
            .json()
            .map_err(|e| GenerationError::InvalidResponse(format!("failed to parse chat response: {e}")))?;
        let content = first_content(body)?;

        tracing::debug!(chars = content.len(), "received chat completion");
        Ok(content)
    }
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    if e.is_timeout() {
        GenerationError::Timeout
    } else {
        GenerationError::Connection(e.to_string())
    }
}

fn status_error(status: StatusCode, body: String) -> GenerationError {
    match status {
        StatusCode::TOO_MANY_REQUESTS => GenerationError::RateLimited,
        _ => GenerationError::Api { status: status.as_u16(), message: body },
    }
}

fn first_content(body: ChatResponse) -> Result<String, GenerationError> {
    body.choices
        .into_iter()
        .next()
        .ok_or_else(|| GenerationError::InvalidResponse("no choices in response".into()))
        .map(|choice| choice.message.content.unwrap_or_default())
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base_url: &str) -> ChatCompletionsClient {
        let mut settings = ChatSettings::groq("gsk-test");
        settings.base_url = base_url.to_string();
        ChatCompletionsClient::new(settings).unwrap()
    }

    #[test]
    fn test_endpoint_joins_base_url() {
        assert_eq!(
            client("https://api.groq.com/openai/v1/").endpoint(),
            "https://api.groq.com/openai/v1/chat/completions"
        );
    }

    #[test]
    fn test_request_body_shape() {
        let c = client(GROQ_BASE_URL);
        let body = serde_json::to_value(c.request_body("map my mood")).unwrap();
        assert_eq!(body["model"], "llama-3.1-8b-instant");
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "map my mood");
        assert!((body["temperature"].as_f64().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn test_first_content_extracts_message() {
        let body: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"mood_label\":\"Calm\"}"},"finish_reason":"stop"}],"usage":{"total_tokens":12}}"#,
        )
        .unwrap();
        assert_eq!(first_content(body).unwrap(), r#"{"mood_label":"Calm"}"#);
    }

    #[test]
    fn test_first_content_without_choices_is_invalid() {
        let body: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(body), Err(GenerationError::InvalidResponse(_))));
    }

    #[test]
    fn test_null_content_is_empty_string() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":null}}]}"#).unwrap();
        assert_eq!(first_content(body).unwrap(), "");
    }

    #[test]
    fn test_status_errors() {
        assert!(matches!(
            status_error(StatusCode::TOO_MANY_REQUESTS, "slow down".into()),
            GenerationError::RateLimited
        ));
        match status_error(StatusCode::UNAUTHORIZED, r#"{"error":"invalid api key"}"#.into()) {
            GenerationError::Api { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid api key"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert!(matches!(
            status_error(StatusCode::INTERNAL_SERVER_ERROR, String::new()),
            GenerationError::Api { status: 500, .. }
        ));
    }

    #[test]
    fn test_unreachable_endpoint_is_connection_error() {
        let c = client("http://127.0.0.1:9");
        assert!(matches!(
            c.generate("hi"),
            Err(GenerationError::Connection(_)) | Err(GenerationError::Timeout)
        ));
    }
}
