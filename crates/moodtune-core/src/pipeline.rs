//! One user interaction, from input to display.
//!
//! ```text
//! AwaitingInput ─┬─ image present ──► ImagePath ───┐
//!                ├─ text only ──────► TextOnlyPath ┼─► Display ─► AwaitingInput
//!                └─ nothing ────────► AwaitingInput
//! ```
//!
//! Results are pushed to a [`Presenter`] as they become available. Failures of
//! external collaborators are reported through the presenter and end the
//! interaction; they never escape as panics or errors to the session.

use crate::catalog::{CatalogError, TrackRetriever, DEFAULT_TRACK_LIMIT};
use crate::emotion::{is_low_confidence, AnalysisError, EmotionDetector, LOW_CONFIDENCE_THRESHOLD};
use crate::mapper::MoodMapper;
use crate::types::{EmotionScores, Frame, GenreMapping, Track};
use thiserror::Error;

/// Emotion assumed when only free text is available.
pub const TEXT_ONLY_EMOTION: &str = "neutral";

/// What the user supplied for one interaction.
#[derive(Debug, Clone, Default)]
pub struct Interaction {
    pub image: Option<Frame>,
    pub free_text: Option<String>,
}

impl Interaction {
    pub fn new(image: Option<Frame>, free_text: Option<String>) -> Self {
        let free_text = free_text
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        Self { image, free_text }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::new(None, Some(text.into()))
    }

    /// Which path this interaction takes. An image wins over text; text then
    /// only adds context to the prompt.
    pub fn route(&self) -> Route {
        match (&self.image, &self.free_text) {
            (Some(_), _) => Route::Image,
            (None, Some(_)) => Route::TextOnly,
            (None, None) => Route::Idle,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    Image,
    TextOnly,
    Idle,
}

/// Something the presentation layer should show.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayEvent {
    ImagePreview { width: u32, height: u32 },
    EmotionBanner { emotion: String, confidence: f32 },
    ScoreChart(EmotionScores),
    LowConfidence { confidence: f32 },
    MappingWarning(String),
    Mapping(GenreMapping),
    Tracks(Vec<Track>),
    NoTracks,
    Error(String),
}

/// Sink for display events.
pub trait Presenter {
    fn show(&mut self, event: DisplayEvent);
}

impl Presenter for Vec<DisplayEvent> {
    fn show(&mut self, event: DisplayEvent) {
        self.push(event);
    }
}

#[derive(Error, Debug)]
pub enum InteractionError {
    #[error("Emotion detection failed: {0}")]
    Analysis(#[from] AnalysisError),
    #[error("Track search failed: {0}")]
    Catalog(#[from] CatalogError),
}

#[derive(Debug)]
pub enum Outcome {
    /// Nothing to do; still waiting for input.
    AwaitingInput,
    /// The full result was displayed.
    Displayed,
    /// The interaction stopped early; the error was already displayed.
    Halted(InteractionError),
}

#[derive(Debug, Clone, Copy)]
pub struct PipelinePolicy {
    pub track_limit: usize,
    pub low_confidence_threshold: f32,
}

impl Default for PipelinePolicy {
    fn default() -> Self {
        Self {
            track_limit: DEFAULT_TRACK_LIMIT,
            low_confidence_threshold: LOW_CONFIDENCE_THRESHOLD,
        }
    }
}

pub struct Pipeline {
    detector: Option<EmotionDetector>,
    mapper: MoodMapper,
    retriever: TrackRetriever,
    policy: PipelinePolicy,
}

impl Pipeline {
    /// `detector` may be absent when no vision model is loaded; image
    /// interactions then halt with [`AnalysisError::Unavailable`].
    pub fn new(
        detector: Option<EmotionDetector>,
        mapper: MoodMapper,
        retriever: TrackRetriever,
        policy: PipelinePolicy,
    ) -> Self {
        Self { detector, mapper, retriever, policy }
    }

    /// Run one interaction to completion.
    pub fn run(&mut self, interaction: &Interaction, presenter: &mut dyn Presenter) -> Outcome {
        let route = interaction.route();
        tracing::debug!(?route, "interaction started");

        let result = match route {
            Route::Idle => return Outcome::AwaitingInput,
            Route::Image => match &interaction.image {
                Some(frame) => self.image_path(frame, interaction.free_text.as_deref(), presenter),
                None => return Outcome::AwaitingInput,
            },
            Route::TextOnly => {
                self.recommend(TEXT_ONLY_EMOTION, interaction.free_text.as_deref(), presenter)
            }
        };

        match result {
            Ok(()) => Outcome::Displayed,
            Err(e) => {
                tracing::warn!(error = %e, ?route, "interaction halted");
                presenter.show(DisplayEvent::Error(e.to_string()));
                Outcome::Halted(e)
            }
        }
    }

    fn image_path(
        &mut self,
        frame: &Frame,
        free_text: Option<&str>,
        presenter: &mut dyn Presenter,
    ) -> Result<(), InteractionError> {
        presenter.show(DisplayEvent::ImagePreview {
            width: frame.width,
            height: frame.height,
        });

        let detector = self.detector.as_mut().ok_or_else(|| {
            AnalysisError::Unavailable("no emotion model loaded".into())
        })?;
        let observation = detector.detect(frame)?;

        presenter.show(DisplayEvent::EmotionBanner {
            emotion: observation.dominant_emotion.clone(),
            confidence: observation.confidence,
        });
        presenter.show(DisplayEvent::ScoreChart(observation.all_scores.clone()));
        if is_low_confidence(observation.confidence, self.policy.low_confidence_threshold) {
            presenter.show(DisplayEvent::LowConfidence {
                confidence: observation.confidence,
            });
        }

        self.recommend(&observation.dominant_emotion, free_text, presenter)
    }

    /// Shared tail of both paths: map, retrieve, display.
    fn recommend(
        &self,
        emotion: &str,
        free_text: Option<&str>,
        presenter: &mut dyn Presenter,
    ) -> Result<(), InteractionError> {
        let outcome = self.mapper.map(emotion, free_text);
        if let Some(cause) = &outcome.degraded {
            presenter.show(DisplayEvent::MappingWarning(cause.to_string()));
        }
        let query = outcome.mapping.genre_query.clone();
        presenter.show(DisplayEvent::Mapping(outcome.mapping));

        let tracks = self.retriever.search(&query, self.policy.track_limit)?;
        if tracks.is_empty() {
            presenter.show(DisplayEvent::NoTracks);
        } else {
            presenter.show(DisplayEvent::Tracks(tracks));
        }
        Ok(())
    }
}
