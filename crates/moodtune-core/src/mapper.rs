//! Mood-to-genre mapping through a text-generation collaborator.
//!
//! The model's reply is untrusted. It is only ever handed to a strict JSON
//! parser; anything that does not deserialize into a [`GenreMapping`] falls
//! back to using the emotion itself as the query.

use crate::types::GenreMapping;
use thiserror::Error;

/// Reason attached to the fallback when the reply carries no usable JSON.
pub const FALLBACK_REASON: &str = "Fallback";
/// Reason attached to the fallback when the generator itself failed.
pub const GENERATION_FAILED_REASON: &str = "LLM failed";

/// Errors a text generator may report.
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
    #[error("rate limited")]
    RateLimited,
    #[error("request timeout")]
    Timeout,
}

/// Capability: turn a prompt into free text.
pub trait TextGenerator {
    fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}

/// Why a mapping had to fall back.
#[derive(Error, Debug)]
pub enum MappingDegraded {
    #[error("response contained no JSON object")]
    NoStructuredOutput,
    #[error("response JSON rejected: {0}")]
    Unparseable(String),
    #[error("LLM error: {0}")]
    GenerationFailed(#[from] GenerationError),
}

/// A mapping plus the reason it degraded, if it did.
#[derive(Debug)]
pub struct MappingOutcome {
    pub mapping: GenreMapping,
    pub degraded: Option<MappingDegraded>,
}

impl MappingOutcome {
    fn fallback(emotion: &str, cause: MappingDegraded) -> Self {
        let reason = match cause {
            MappingDegraded::GenerationFailed(_) => GENERATION_FAILED_REASON,
            _ => FALLBACK_REASON,
        };
        Self {
            mapping: GenreMapping {
                mood_label: emotion.to_string(),
                genre_query: emotion.to_string(),
                reason: reason.to_string(),
            },
            degraded: Some(cause),
        }
    }
}

pub struct MoodMapper {
    generator: Box<dyn TextGenerator>,
}

impl MoodMapper {
    pub fn new(generator: Box<dyn TextGenerator>) -> Self {
        Self { generator }
    }

    /// Map an emotion (and optional user context) to a genre query.
    ///
    /// Never fails: every error path yields the fallback mapping.
    pub fn map(&self, emotion: &str, free_text: Option<&str>) -> MappingOutcome {
        let prompt = build_prompt(emotion, free_text);

        let raw = match self.generator.generate(&prompt) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(error = %e, emotion, "text generation failed; using fallback mapping");
                return MappingOutcome::fallback(emotion, e.into());
            }
        };

        match parse_mapping(&raw) {
            Ok(mapping) => {
                tracing::debug!(?mapping, "mapped emotion to genre");
                MappingOutcome { mapping, degraded: None }
            }
            Err(cause) => {
                tracing::warn!(%cause, emotion, "unusable mapping response; using fallback mapping");
                MappingOutcome::fallback(emotion, cause)
            }
        }
    }
}

/// Build the instruction sent to the generator.
pub fn build_prompt(emotion: &str, free_text: Option<&str>) -> String {
    let context = free_text
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("None");
    format!(
        "You are a music mood mapper. Based on the detected emotion and user context,\n\
         respond in JSON only with keys: mood_label, genre_query, reason.\n\
         Return exactly one JSON object with those three string keys and nothing else.\n\
         genre_query is a short music search string (genre, style or mood keywords).\n\
         \n\
         Detected emotion: {emotion}\n\
         User text/context: \"{context}\"\n"
    )
}

/// Extract and strictly parse the JSON object in a model reply.
///
/// The object spans from the first `{` to the last `}`, which tolerates
/// surrounding prose or code fences.
pub fn parse_mapping(raw: &str) -> Result<GenreMapping, MappingDegraded> {
    let start = raw.find('{').ok_or(MappingDegraded::NoStructuredOutput)?;
    let end = raw
        .rfind('}')
        .filter(|&end| end > start)
        .ok_or_else(|| MappingDegraded::Unparseable("unterminated object".into()))?;

    let mapping: GenreMapping = serde_json::from_str(&raw[start..=end])
        .map_err(|e| MappingDegraded::Unparseable(e.to_string()))?;

    if mapping.genre_query.trim().is_empty() {
        return Err(MappingDegraded::Unparseable("empty genre_query".into()));
    }
    Ok(mapping)
}
