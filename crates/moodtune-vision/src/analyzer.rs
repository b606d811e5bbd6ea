//! Local emotion analyzer: locate the face, crop it, classify it.

use crate::classifier::{ClassifierError, EmotionClassifier, FERPLUS_INPUT_SIZE};
use crate::crop::{crop_resized, face_region, full_region};
use crate::locator::FaceLocator;
use crate::types::Region;
use moodtune_core::{AnalysisError, EmotionAnalysis, EmotionAnalyzer, Frame};
use std::path::Path;

pub const LOCATOR_MODEL_FILE: &str = "det_10g.onnx";
pub const CLASSIFIER_MODEL_FILE: &str = "emotion-ferplus-8.onnx";

/// Fraction of the face size added around the detected box before cropping.
const FACE_MARGIN: f32 = 0.2;

/// ONNX-backed [`EmotionAnalyzer`].
///
/// Face location is best effort. When the locator model is missing, or finds
/// no face, the whole frame is classified.
pub struct OnnxEmotionAnalyzer {
    locator: Option<FaceLocator>,
    classifier: EmotionClassifier,
}

impl OnnxEmotionAnalyzer {
    /// Load both models from `model_dir`. Only the classifier is required.
    pub fn load(model_dir: &Path) -> Result<Self, ClassifierError> {
        let classifier = EmotionClassifier::load(&model_dir.join(CLASSIFIER_MODEL_FILE))?;

        let locator_path = model_dir.join(LOCATOR_MODEL_FILE);
        let locator = match FaceLocator::load(&locator_path) {
            Ok(l) => Some(l),
            Err(e) => {
                tracing::warn!(
                    error = %e,
                    "face locator unavailable; emotions will be read from the full frame"
                );
                None
            }
        };

        Ok(Self { locator, classifier })
    }

    fn face_region(&mut self, frame: &Frame) -> Result<Option<Region>, AnalysisError> {
        let Some(locator) = self.locator.as_mut() else {
            return Ok(None);
        };
        let faces = locator
            .locate(frame)
            .map_err(|e| AnalysisError::Failed(e.to_string()))?;

        Ok(faces.first().and_then(|face| {
            tracing::debug!(confidence = face.confidence, "using best face");
            face_region(face, frame.width, frame.height, FACE_MARGIN)
        }))
    }
}

impl EmotionAnalyzer for OnnxEmotionAnalyzer {
    fn analyze(&mut self, frame: &Frame) -> Result<EmotionAnalysis, AnalysisError> {
        let region = match self.face_region(frame)? {
            Some(region) => region,
            None => {
                tracing::info!("no face located; analyzing the full frame");
                full_region(frame)
            }
        };

        let crop = crop_resized(frame, region, FERPLUS_INPUT_SIZE);
        let scores = self
            .classifier
            .classify(&crop)
            .map_err(|e| AnalysisError::Failed(e.to_string()))?;

        EmotionAnalysis::from_scores(scores)
    }
}
