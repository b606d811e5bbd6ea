//! FER+ facial emotion classifier via ONNX Runtime.
//!
//! Takes a 64×64 grayscale face crop and produces a probability for each of
//! the eight FER+ emotion categories.

use moodtune_core::EmotionScores;
use ndarray::Array4;
use ort::session::Session;
use ort::value::TensorRef;
use std::path::Path;
use thiserror::Error;

/// Side length of the square model input.
pub const FERPLUS_INPUT_SIZE: usize = 64;

/// Output order of the FER+ model, as reported labels.
pub const FERPLUS_EMOTIONS: [&str; 8] = [
    "neutral", "happy", "surprise", "sad", "angry", "disgust", "fear", "contempt",
];

#[derive(Error, Debug)]
pub enum ClassifierError {
    #[error("model file not found: {0}")]
    ModelNotFound(String),
    #[error("inference failed: {0}")]
    InferenceFailed(String),
    #[error("expected a {expected}-pixel face crop, got {actual}")]
    BadInput { expected: usize, actual: usize },
    #[error("ort: {0}")]
    Ort(#[from] ort::Error),
}

pub struct EmotionClassifier {
    session: Session,
}

impl EmotionClassifier {
    pub fn load(model_path: &Path) -> Result<Self, ClassifierError> {
        if !model_path.exists() {
            return Err(ClassifierError::ModelNotFound(model_path.display().to_string()));
        }

        let session = Session::builder()?
            .with_intra_threads(2)?
            .commit_from_file(model_path)?;

        tracing::info!(
            path = %model_path.display(),
            inputs = ?session.inputs().iter().map(|i| i.name()).collect::<Vec<_>>(),
            outputs = ?session.outputs().iter().map(|o| o.name()).collect::<Vec<_>>(),
            "loaded FER+ emotion classifier"
        );

        Ok(Self { session })
    }

    /// Classify a 64×64 grayscale face crop.
    pub fn classify(&mut self, face: &[u8]) -> Result<EmotionScores, ClassifierError> {
        let expected = FERPLUS_INPUT_SIZE * FERPLUS_INPUT_SIZE;
        if face.len() != expected {
            return Err(ClassifierError::BadInput { expected, actual: face.len() });
        }

        let input = preprocess(face);
        let outputs = self
            .session
            .run(ort::inputs![TensorRef::from_array_view(input.view())?])?;

        let (_, logits) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| ClassifierError::InferenceFailed(format!("logits: {e}")))?;

        scores_from_logits(logits)
    }
}

/// FER+ consumes raw 0–255 intensities in a 1×1×64×64 tensor.
fn preprocess(face: &[u8]) -> Array4<f32> {
    let n = FERPLUS_INPUT_SIZE;
    Array4::from_shape_fn((1, 1, n, n), |(_, _, y, x)| face[y * n + x] as f32)
}

/// Softmax the eight logits into labelled probabilities.
fn scores_from_logits(logits: &[f32]) -> Result<EmotionScores, ClassifierError> {
    if logits.len() != FERPLUS_EMOTIONS.len() {
        return Err(ClassifierError::InferenceFailed(format!(
            "expected {} logits, got {}",
            FERPLUS_EMOTIONS.len(),
            logits.len()
        )));
    }
    if logits.iter().any(|l| !l.is_finite()) {
        return Err(ClassifierError::InferenceFailed("non-finite logits".into()));
    }

    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let exps: Vec<f32> = logits.iter().map(|l| (l - max).exp()).collect();
    let sum: f32 = exps.iter().sum();

    Ok(FERPLUS_EMOTIONS
        .iter()
        .zip(exps)
        .map(|(label, e)| (*label, e / sum))
        .collect())
}
