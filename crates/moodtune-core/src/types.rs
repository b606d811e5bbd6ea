use serde::{Deserialize, Serialize};

/// An 8-bit grayscale image, row-major.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    /// Wrap a grayscale buffer, returning `None` if its length does not match
    /// `width * height` or either dimension is zero.
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Option<Self> {
        if width == 0 || height == 0 || data.len() != width as usize * height as usize {
            return None;
        }
        Some(Self { data, width, height })
    }
}

/// Per-emotion confidence scores, kept in the analyzer's category order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EmotionScores(Vec<(String, f32)>);

impl EmotionScores {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace the score for `emotion`.
    pub fn set(&mut self, emotion: impl Into<String>, score: f32) {
        let emotion = emotion.into();
        match self.0.iter_mut().find(|(name, _)| *name == emotion) {
            Some(entry) => entry.1 = score,
            None => self.0.push((emotion, score)),
        }
    }

    /// Score for `emotion`, matching the label case-insensitively.
    pub fn get(&self, emotion: &str) -> Option<f32> {
        self.0
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(emotion))
            .map(|(_, score)| *score)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f32)> {
        self.0.iter().map(|(name, score)| (name.as_str(), *score))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Highest-scoring emotion. Ties keep the earlier category.
    pub fn dominant(&self) -> Option<(&str, f32)> {
        self.iter().fold(None, |best, (name, score)| match best {
            Some((_, best_score)) if best_score >= score => best,
            _ => Some((name, score)),
        })
    }
}

impl<S: Into<String>> FromIterator<(S, f32)> for EmotionScores {
    fn from_iter<I: IntoIterator<Item = (S, f32)>>(iter: I) -> Self {
        let mut scores = EmotionScores::new();
        for (name, score) in iter {
            scores.set(name, score);
        }
        scores
    }
}

/// Result of analyzing one image.
#[derive(Debug, Clone, Serialize)]
pub struct MoodObservation {
    /// Lower-cased dominant emotion label.
    pub dominant_emotion: String,
    /// Score of `dominant_emotion`, in [0, 1].
    pub confidence: f32,
    pub all_scores: EmotionScores,
}

/// Mood label and catalog query produced for an emotion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GenreMapping {
    pub mood_label: String,
    pub genre_query: String,
    pub reason: String,
}

/// A catalog track, flattened for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Track {
    pub name: String,
    pub artist: String,
    pub url: String,
    pub preview_url: Option<String>,
}
