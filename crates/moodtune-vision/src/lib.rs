//! moodtune-vision — facial emotion analysis.
//!
//! Uses SCRFD to locate the face and FER+ to classify its expression, both
//! running via ONNX Runtime for CPU inference.

pub mod analyzer;
pub mod classifier;
pub mod crop;
pub mod locator;
pub mod source;
pub mod types;

pub use analyzer::OnnxEmotionAnalyzer;
pub use classifier::{ClassifierError, EmotionClassifier};
pub use locator::{FaceLocator, LocatorError};
pub use source::{load_frame, save_frame, ImageError};
pub use types::FaceBox;

use std::path::PathBuf;

/// `$XDG_DATA_HOME/moodtune/models`, or `~/.local/share/moodtune/models`.
pub fn default_model_dir() -> PathBuf {
    std::env::var("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".local/share")
        })
        .join("moodtune")
        .join("models")
}
