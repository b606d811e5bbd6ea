//! Emotion detection contract.
//!
//! The analyzer that actually looks at pixels lives behind [`EmotionAnalyzer`];
//! [`EmotionDetector`] validates its output and turns it into a
//! [`MoodObservation`].

use crate::types::{EmotionScores, Frame, MoodObservation};
use thiserror::Error;

/// Confidence below which the detected emotion is flagged as uncertain.
pub const LOW_CONFIDENCE_THRESHOLD: f32 = 0.55;

#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("emotion analyzer unavailable: {0}")]
    Unavailable(String),
    #[error("analysis failed: {0}")]
    Failed(String),
    #[error("analyzer returned no emotion scores")]
    NoScores,
    #[error("dominant emotion {0:?} has no score")]
    MissingDominant(String),
    #[error("invalid score {score} for emotion {emotion:?}")]
    InvalidScore { emotion: String, score: f32 },
}

/// Raw output of a vision analyzer for one image.
#[derive(Debug, Clone)]
pub struct EmotionAnalysis {
    pub dominant_emotion: String,
    pub scores: EmotionScores,
}

impl EmotionAnalysis {
    /// Build an analysis whose dominant emotion is the top score.
    pub fn from_scores(scores: EmotionScores) -> Result<Self, AnalysisError> {
        let dominant_emotion = scores
            .dominant()
            .map(|(name, _)| name.to_string())
            .ok_or(AnalysisError::NoScores)?;
        Ok(Self { dominant_emotion, scores })
    }
}

/// Capability: classify the facial emotion in a frame.
///
/// Implementations must not fail just because no face is confidently located;
/// they return a best-effort result for the whole frame instead.
pub trait EmotionAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<EmotionAnalysis, AnalysisError>;
}

/// Runs an analyzer and validates what it reports.
pub struct EmotionDetector {
    analyzer: Box<dyn EmotionAnalyzer>,
}

impl EmotionDetector {
    pub fn new(analyzer: Box<dyn EmotionAnalyzer>) -> Self {
        Self { analyzer }
    }

    /// Detect the dominant emotion in `frame`.
    ///
    /// The reported confidence is the dominant emotion's own score.
    pub fn detect(&mut self, frame: &Frame) -> Result<MoodObservation, AnalysisError> {
        let analysis = self.analyzer.analyze(frame)?;

        if analysis.scores.is_empty() {
            return Err(AnalysisError::NoScores);
        }
        for (emotion, score) in analysis.scores.iter() {
            if !score.is_finite() || !(0.0..=1.0).contains(&score) {
                return Err(AnalysisError::InvalidScore {
                    emotion: emotion.to_string(),
                    score,
                });
            }
        }

        let dominant = analysis.dominant_emotion.trim().to_lowercase();
        let confidence = analysis
            .scores
            .get(&dominant)
            .ok_or_else(|| AnalysisError::MissingDominant(dominant.clone()))?;

        tracing::debug!(emotion = %dominant, confidence, "emotion detected");

        Ok(MoodObservation {
            dominant_emotion: dominant,
            confidence,
            all_scores: analysis.scores,
        })
    }
}

/// Whether `confidence` should be flagged to the user.
pub fn is_low_confidence(confidence: f32, threshold: f32) -> bool {
    confidence < threshold
}
