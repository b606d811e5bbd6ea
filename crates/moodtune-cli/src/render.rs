//! Terminal presentation of pipeline results.

use moodtune_core::{DisplayEvent, EmotionScores, GenreMapping, Presenter, Track};
use std::io::Write;
use thiserror::Error;

/// Width of a full-confidence bar, in cells.
const CHART_WIDTH: usize = 30;

#[derive(Error, Debug, PartialEq)]
pub enum ChartRenderError {
    #[error("no scores to plot")]
    Empty,
    #[error("score for {0} is not a finite number")]
    NonFinite(String),
}

/// Writes display events as plain text lines.
pub struct TerminalPresenter<W: Write> {
    out: W,
}

impl<W: Write> TerminalPresenter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    #[cfg(test)]
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> Presenter for TerminalPresenter<W> {
    fn show(&mut self, event: DisplayEvent) {
        let text = render_event(&event);
        if let Err(e) = writeln!(self.out, "{text}").and_then(|_| self.out.flush()) {
            tracing::warn!(error = %e, "failed to write to terminal");
        }
    }
}

pub fn render_event(event: &DisplayEvent) -> String {
    match event {
        DisplayEvent::ImagePreview { width, height } => format!("Captured image ({width}x{height})"),
        DisplayEvent::EmotionBanner { emotion, confidence } => {
            format!("Detected Emotion: {} ({confidence:.2} confidence)", capitalize(emotion))
        }
        DisplayEvent::ScoreChart(scores) => match render_chart(scores) {
            Ok(chart) => format!("Emotion Confidence Breakdown\n{chart}"),
            Err(e) => {
                tracing::warn!(error = %e, "emotion chart not rendered");
                format!("Warning: Could not plot emotion chart: {e}")
            }
        },
        DisplayEvent::LowConfidence { confidence } => format!(
            "Warning: Low confidence ({confidence:.2}); the detected emotion may be unreliable."
        ),
        DisplayEvent::MappingWarning(message) => format!("Warning: {message}"),
        DisplayEvent::Mapping(mapping) => render_mapping(mapping),
        DisplayEvent::Tracks(tracks) => render_tracks(tracks),
        DisplayEvent::NoTracks => "No tracks found — try again.".to_string(),
        DisplayEvent::Error(message) => format!("Error: {message}"),
    }
}

/// Horizontal bar chart, one row per emotion in category order.
pub fn render_chart(scores: &EmotionScores) -> Result<String, ChartRenderError> {
    if scores.is_empty() {
        return Err(ChartRenderError::Empty);
    }
    if let Some((emotion, _)) = scores.iter().find(|(_, s)| !s.is_finite()) {
        return Err(ChartRenderError::NonFinite(emotion.to_string()));
    }

    let label_width = scores.iter().map(|(e, _)| e.chars().count()).max().unwrap_or(0);
    let rows: Vec<String> = scores
        .iter()
        .map(|(emotion, score)| {
            let cells = (score.clamp(0.0, 1.0) * CHART_WIDTH as f32).round() as usize;
            format!(
                "  {:<label_width$} {:<bar_width$} {:>5.1}%",
                capitalize(emotion),
                "█".repeat(cells),
                score * 100.0,
                label_width = label_width,
                bar_width = CHART_WIDTH,
            )
        })
        .collect();
    Ok(rows.join("\n"))
}

fn render_mapping(mapping: &GenreMapping) -> String {
    format!(
        "AI Mood: {}\nGenre: {}\nReason: {}",
        capitalize(&mapping.mood_label),
        mapping.genre_query,
        mapping.reason
    )
}

fn render_tracks(tracks: &[Track]) -> String {
    let mut lines = vec!["Recommended Tracks".to_string()];
    for track in tracks {
        lines.push(format!("- {} by {} -> {}", track.name, track.artist, track.url));
        if let Some(preview) = &track.preview_url {
            lines.push(format!("    preview: {preview}"));
        }
    }
    lines.join("\n")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_banner() {
        let line = render_event(&DisplayEvent::EmotionBanner {
            emotion: "happy".into(),
            confidence: 0.82,
        });
        assert_eq!(line, "Detected Emotion: Happy (0.82 confidence)");
    }

    #[test]
    fn test_chart_rows_keep_category_order() {
        let scores: EmotionScores = [("happy", 0.5), ("sad", 0.25), ("neutral", 0.0)]
            .into_iter()
            .collect();
        let chart = render_chart(&scores).unwrap();
        let rows: Vec<&str> = chart.lines().collect();
        assert_eq!(rows.len(), 3);
        assert!(rows[0].contains("Happy"));
        assert_eq!(rows[0].matches('█').count(), 15);
        assert!(rows[0].ends_with(" 50.0%"));
        assert!(rows[1].contains("Sad"));
        assert_eq!(rows[2].matches('█').count(), 0);
    }

    #[test]
    fn test_chart_failures() {
        assert_eq!(render_chart(&EmotionScores::new()), Err(ChartRenderError::Empty));

        let scores: EmotionScores = [("happy", f32::NAN)].into_iter().collect();
        assert_eq!(render_chart(&scores), Err(ChartRenderError::NonFinite("happy".into())));
    }

    #[test]
    fn test_chart_failure_is_a_warning() {
        let line = render_event(&DisplayEvent::ScoreChart(EmotionScores::new()));
        assert_eq!(line, "Warning: Could not plot emotion chart: no scores to plot");
    }

    #[test]
    fn test_mapping_block() {
        let text = render_event(&DisplayEvent::Mapping(GenreMapping {
            mood_label: "Joyful".into(),
            genre_query: "upbeat pop".into(),
            reason: "Bright and energetic".into(),
        }));
        assert_eq!(text, "AI Mood: Joyful\nGenre: upbeat pop\nReason: Bright and energetic");
    }

    #[test]
    fn test_fallback_mood_label_is_capitalized() {
        let text = render_event(&DisplayEvent::Mapping(GenreMapping {
            mood_label: "sad".into(),
            genre_query: "sad".into(),
            reason: "Fallback".into(),
        }));
        assert_eq!(text.lines().next(), Some("AI Mood: Sad"));
        assert!(text.contains("Genre: sad\n"));
    }

    #[test]
    fn test_track_rows() {
        let text = render_event(&DisplayEvent::Tracks(vec![
            Track {
                name: "Levitating".into(),
                artist: "Dua Lipa".into(),
                url: "https://open.spotify.com/track/2".into(),
                preview_url: None,
            },
            Track {
                name: "Good as Hell".into(),
                artist: "Lizzo".into(),
                url: "https://open.spotify.com/track/1".into(),
                preview_url: Some("https://p.scdn.co/mp3-preview/1".into()),
            },
        ]));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "Recommended Tracks");
        assert_eq!(lines[1], "- Levitating by Dua Lipa -> https://open.spotify.com/track/2");
        assert_eq!(lines[2], "- Good as Hell by Lizzo -> https://open.spotify.com/track/1");
        assert_eq!(lines[3], "    preview: https://p.scdn.co/mp3-preview/1");
    }

    #[test]
    fn test_presenter_writes_lines() {
        let mut presenter = TerminalPresenter::new(Vec::new());
        presenter.show(DisplayEvent::NoTracks);
        presenter.show(DisplayEvent::Error("Track search failed: rate limited".into()));
        let out = String::from_utf8(presenter.into_inner()).unwrap();
        assert_eq!(out, "No tracks found — try again.\nError: Track search failed: rate limited\n");
    }

    #[test]
    fn test_capitalize() {
        assert_eq!(capitalize("surprise"), "Surprise");
        assert_eq!(capitalize(""), "");
    }
}
