//! Preview playback for the most recently displayed tracks.

use anyhow::{Context, Result};
use moodtune_core::{DisplayEvent, Presenter, Track};
use moodtune_hw::{decode_clip, Speaker};
use moodtune_remote::PreviewClient;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug, PartialEq)]
pub enum PlayError {
    #[error("no tracks to play yet")]
    NoTracks,
    #[error("there is no track {number}; pick 1 to {count}")]
    OutOfRange { number: usize, count: usize },
    #[error("{0} has no preview clip")]
    NoPreview(String),
    #[error("none of the tracks has a preview clip")]
    NoPreviews,
}

/// Pick the track to preview: the 1-based `number`, or the first track that
/// has a preview when no number is given.
pub fn select_preview(tracks: &[Track], number: Option<usize>) -> Result<&Track, PlayError> {
    if tracks.is_empty() {
        return Err(PlayError::NoTracks);
    }
    match number {
        None => tracks
            .iter()
            .find(|t| t.preview_url.is_some())
            .ok_or(PlayError::NoPreviews),
        Some(n) => {
            let track = n
                .checked_sub(1)
                .and_then(|i| tracks.get(i))
                .ok_or(PlayError::OutOfRange { number: n, count: tracks.len() })?;
            match track.preview_url {
                Some(_) => Ok(track),
                None => Err(PlayError::NoPreview(track.name.clone())),
            }
        }
    }
}

pub trait PreviewPlayer {
    fn play(&self, track: &Track) -> Result<()>;
}

/// Downloads the preview and plays it on the default output device.
pub struct SpeakerPlayer {
    client: PreviewClient,
}

impl SpeakerPlayer {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = PreviewClient::new(timeout).context("failed to create preview client")?;
        Ok(Self { client })
    }
}

impl PreviewPlayer for SpeakerPlayer {
    fn play(&self, track: &Track) -> Result<()> {
        let url = track
            .preview_url
            .as_deref()
            .with_context(|| format!("{} has no preview clip", track.name))?;

        let preview = self.client.fetch(url)?;
        let extension = preview.extension();
        let clip = decode_clip(preview.bytes, extension)?;
        tracing::info!(track = %track.name, seconds = clip.duration().as_secs_f32(), "playing preview");

        Speaker::open_default()?.play(clip)?;
        Ok(())
    }
}

/// Passes events through and keeps the last track list for `/play`.
pub struct TrackMemory<'a> {
    inner: &'a mut dyn Presenter,
    tracks: Vec<Track>,
}

impl<'a> TrackMemory<'a> {
    pub fn new(inner: &'a mut dyn Presenter) -> Self {
        Self { inner, tracks: Vec::new() }
    }

    pub fn tracks(&self) -> &[Track] {
        &self.tracks
    }
}

impl Presenter for TrackMemory<'_> {
    fn show(&mut self, event: DisplayEvent) {
        match &event {
            DisplayEvent::Mapping(_) | DisplayEvent::NoTracks => self.tracks.clear(),
            DisplayEvent::Tracks(tracks) => self.tracks = tracks.clone(),
            _ => {}
        }
        self.inner.show(event);
    }
}

/// Select and play a preview, showing any failure as an error line.
pub fn play_selected(
    player: &dyn PreviewPlayer,
    tracks: &[Track],
    number: Option<usize>,
    presenter: &mut dyn Presenter,
) -> bool {
    let track = match select_preview(tracks, number) {
        Ok(track) => track,
        Err(e) => {
            presenter.show(DisplayEvent::Error(e.to_string()));
            return false;
        }
    };

    println!("Playing preview: {} by {}", track.name, track.artist);
    match player.play(track) {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, track = %track.name, "preview playback failed");
            presenter.show(DisplayEvent::Error(format!("Preview playback failed: {e:#}")));
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    fn track(name: &str, preview: Option<&str>) -> Track {
        Track {
            name: name.to_string(),
            artist: "Artist".into(),
            url: format!("https://open.spotify.com/track/{name}"),
            preview_url: preview.map(str::to_string),
        }
    }

    fn tracks() -> Vec<Track> {
        vec![
            track("one", None),
            track("two", Some("https://p.scdn.co/mp3-preview/2")),
            track("three", Some("https://p.scdn.co/mp3-preview/3")),
        ]
    }

    #[test]
    fn test_select_by_number() {
        let tracks = tracks();
        assert_eq!(select_preview(&tracks, Some(3)).unwrap().name, "three");
        assert_eq!(
            select_preview(&tracks, Some(1)),
            Err(PlayError::NoPreview("one".into()))
        );
        assert_eq!(
            select_preview(&tracks, Some(0)),
            Err(PlayError::OutOfRange { number: 0, count: 3 })
        );
        assert_eq!(
            select_preview(&tracks, Some(4)),
            Err(PlayError::OutOfRange { number: 4, count: 3 })
        );
    }

    #[test]
    fn test_select_first_with_preview() {
        assert_eq!(select_preview(&tracks(), None).unwrap().name, "two");
        assert_eq!(
            select_preview(&[track("one", None)], None),
            Err(PlayError::NoPreviews)
        );
        assert_eq!(select_preview(&[], Some(1)), Err(PlayError::NoTracks));
    }

    #[test]
    fn test_track_memory_follows_latest_results() {
        let mut events: Vec<DisplayEvent> = Vec::new();
        let mut memory = TrackMemory::new(&mut events);

        memory.show(DisplayEvent::Tracks(tracks()));
        assert_eq!(memory.tracks().len(), 3);
        memory.show(DisplayEvent::Error("Preview playback failed".into()));
        assert_eq!(memory.tracks().len(), 3);
        memory.show(DisplayEvent::NoTracks);
        assert!(memory.tracks().is_empty());

        drop(memory);
        assert_eq!(events.len(), 3);
    }

    struct RecordingPlayer {
        played: RefCell<Vec<String>>,
        fail: bool,
    }

    impl PreviewPlayer for RecordingPlayer {
        fn play(&self, track: &Track) -> Result<()> {
            self.played.borrow_mut().push(track.name.clone());
            if self.fail {
                anyhow::bail!("no audio output device");
            }
            Ok(())
        }
    }

    #[test]
    fn test_play_selected_reports_failures() {
        let player = RecordingPlayer { played: RefCell::new(Vec::new()), fail: true };
        let mut events: Vec<DisplayEvent> = Vec::new();

        assert!(!play_selected(&player, &tracks(), Some(2), &mut events));
        assert_eq!(*player.played.borrow(), vec!["two".to_string()]);
        assert!(matches!(
            &events[0],
            DisplayEvent::Error(m) if m == "Preview playback failed: no audio output device"
        ));

        assert!(!play_selected(&player, &tracks(), Some(1), &mut events));
        assert_eq!(player.played.borrow().len(), 1);
    }
}
