//! moodtune-core — emotion-to-music recommendation pipeline.
//!
//! Defines the data model, the capability traits for the three external
//! collaborators (vision analysis, text generation, catalog search) and the
//! single-shot interaction pipeline that sequences them.

pub mod catalog;
pub mod emotion;
pub mod mapper;
pub mod pipeline;
pub mod types;

pub use catalog::{CatalogError, TrackCatalog, TrackRetriever, DEFAULT_TRACK_LIMIT};
pub use emotion::{AnalysisError, EmotionAnalysis, EmotionAnalyzer, EmotionDetector, LOW_CONFIDENCE_THRESHOLD};
pub use mapper::{GenerationError, MappingDegraded, MappingOutcome, MoodMapper, TextGenerator};
pub use pipeline::{DisplayEvent, Interaction, InteractionError, Outcome, Pipeline, PipelinePolicy, Presenter, Route};
pub use types::{EmotionScores, Frame, GenreMapping, MoodObservation, Track};
