//! Pipeline assembly and the interactive session loop.

use crate::config::Config;
use crate::play::{play_selected, PreviewPlayer, TrackMemory};
use anyhow::{Context, Result};
use moodtune_core::{
    DisplayEvent, EmotionDetector, Frame, Interaction, MoodMapper, Outcome, Pipeline,
    PipelinePolicy, Presenter, TrackRetriever,
};
use moodtune_hw::Camera;
use moodtune_remote::{ChatCompletionsClient, SpotifyCatalog};
use moodtune_vision::OnnxEmotionAnalyzer;
use std::io::{BufRead, Write};
use std::path::PathBuf;

/// Build the pipeline with live collaborators.
///
/// Missing credentials are fatal. A missing vision model is not: the
/// pipeline still serves text-only interactions.
pub fn build_pipeline(config: &Config, policy: PipelinePolicy) -> Result<Pipeline> {
    let generator = ChatCompletionsClient::new(config.chat_settings()?)
        .context("failed to create chat client")?;
    let catalog = SpotifyCatalog::new(config.spotify_credentials()?, config.http_timeout())
        .context("failed to create Spotify client")?;

    let detector = match OnnxEmotionAnalyzer::load(&config.model_dir) {
        Ok(analyzer) => Some(EmotionDetector::new(Box::new(analyzer))),
        Err(e) => {
            tracing::warn!(
                error = %e,
                model_dir = %config.model_dir.display(),
                "emotion model unavailable; only text interactions will work"
            );
            None
        }
    };

    Ok(Pipeline::new(
        detector,
        MoodMapper::new(Box::new(generator)),
        TrackRetriever::new(Box::new(catalog)),
        policy,
    ))
}

pub fn open_camera(config: &Config) -> Result<Camera> {
    Camera::open(&config.camera_device, config.camera_width, config.camera_height)
        .with_context(|| format!("failed to open camera {}", config.camera_device))
}

pub fn snapshot(camera: &Camera, config: &Config) -> Result<Frame> {
    camera
        .snapshot(config.warmup_frames)
        .context("camera capture failed")
}

/// Optional local devices available to a session.
#[derive(Default, Clone, Copy)]
pub struct SessionDevices<'a> {
    pub camera: Option<&'a Camera>,
    pub player: Option<&'a dyn PreviewPlayer>,
}

/// One line of session input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionCommand {
    Blank,
    Quit,
    Text(String),
    Snap(Option<String>),
    Image { path: PathBuf, text: Option<String> },
    Play(Option<usize>),
    Unknown(String),
}

pub fn parse_command(line: &str) -> SessionCommand {
    let line = line.trim();
    if line.is_empty() {
        return SessionCommand::Blank;
    }
    if !line.starts_with('/') {
        return SessionCommand::Text(line.to_string());
    }

    let (command, rest) = match line.split_once(char::is_whitespace) {
        Some((c, r)) => (c, r.trim()),
        None => (line, ""),
    };
    let rest_text = || Some(rest.to_string()).filter(|r| !r.is_empty());

    match command {
        "/quit" | "/exit" => SessionCommand::Quit,
        "/snap" => SessionCommand::Snap(rest_text()),
        "/image" if !rest.is_empty() => {
            let (path, text) = match rest.split_once(char::is_whitespace) {
                Some((p, t)) => (p, Some(t.trim().to_string()).filter(|t| !t.is_empty())),
                None => (rest, None),
            };
            SessionCommand::Image { path: PathBuf::from(path), text }
        }
        "/play" if rest.is_empty() => SessionCommand::Play(None),
        "/play" => match rest.parse() {
            Ok(n) => SessionCommand::Play(Some(n)),
            Err(_) => SessionCommand::Unknown(line.to_string()),
        },
        other => SessionCommand::Unknown(other.to_string()),
    }
}

const HELP: &str =
    "Describe how you feel, or: /snap [text]  /image PATH [text]  /play [N]  /quit";

/// Read lines until `/quit` or end of input, running one interaction per line.
pub fn run_session<R: BufRead, W: Write>(
    pipeline: &mut Pipeline,
    devices: SessionDevices<'_>,
    config: &Config,
    input: R,
    prompt: &mut W,
    presenter: &mut dyn Presenter,
) -> Result<()> {
    let mut presenter = TrackMemory::new(presenter);

    writeln!(prompt, "{HELP}")?;
    write!(prompt, "> ")?;
    prompt.flush()?;

    for line in input.lines() {
        let line = line.context("failed to read input")?;
        let interaction = match parse_command(&line) {
            SessionCommand::Quit => break,
            SessionCommand::Blank => None,
            SessionCommand::Text(text) => Some(Interaction::text(text)),
            SessionCommand::Snap(text) => match devices.camera {
                Some(camera) => match snapshot(camera, config) {
                    Ok(frame) => Some(Interaction::new(Some(frame), text)),
                    Err(e) => {
                        presenter.show(DisplayEvent::Error(format!("{e:#}")));
                        None
                    }
                },
                None => {
                    presenter.show(DisplayEvent::Error(
                        "no camera open; start the session with --camera".into(),
                    ));
                    None
                }
            },
            SessionCommand::Image { path, text } => match moodtune_vision::load_frame(&path) {
                Ok(frame) => Some(Interaction::new(Some(frame), text)),
                Err(e) => {
                    presenter.show(DisplayEvent::Error(e.to_string()));
                    None
                }
            },
            SessionCommand::Play(number) => {
                match devices.player {
                    Some(player) => {
                        let tracks = presenter.tracks().to_vec();
                        play_selected(player, &tracks, number, &mut presenter);
                    }
                    None => {
                        presenter.show(DisplayEvent::Error("audio playback is unavailable".into()))
                    }
                }
                None
            }
            SessionCommand::Unknown(command) => {
                writeln!(prompt, "Unknown command {command}. {HELP}")?;
                None
            }
        };

        if let Some(interaction) = interaction {
            if let Outcome::Halted(e) = pipeline.run(&interaction, &mut presenter) {
                tracing::debug!(error = %e, "interaction halted; waiting for next input");
            }
        }

        write!(prompt, "> ")?;
        prompt.flush()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::TerminalPresenter;
    use moodtune_core::{
        AnalysisError, CatalogError, EmotionAnalysis, EmotionAnalyzer, GenerationError,
        TextGenerator, Track, TrackCatalog,
    };
    use std::cell::RefCell;
    use std::io::Cursor;

    #[test]
    fn test_parse_plain_text() {
        assert_eq!(parse_command("  feeling tired  "), SessionCommand::Text("feeling tired".into()));
        assert_eq!(parse_command("   "), SessionCommand::Blank);
    }

    #[test]
    fn test_parse_commands() {
        assert_eq!(parse_command("/quit"), SessionCommand::Quit);
        assert_eq!(parse_command("/snap"), SessionCommand::Snap(None));
        assert_eq!(
            parse_command("/snap long day at work"),
            SessionCommand::Snap(Some("long day at work".into()))
        );
        assert_eq!(
            parse_command("/image face.png"),
            SessionCommand::Image { path: PathBuf::from("face.png"), text: None }
        );
        assert_eq!(
            parse_command("/image face.png  rainy sunday"),
            SessionCommand::Image {
                path: PathBuf::from("face.png"),
                text: Some("rainy sunday".into())
            }
        );
        assert_eq!(parse_command("/image"), SessionCommand::Unknown("/image".into()));
        assert_eq!(parse_command("/dance"), SessionCommand::Unknown("/dance".into()));
    }

    #[test]
    fn test_parse_play() {
        assert_eq!(parse_command("/play"), SessionCommand::Play(None));
        assert_eq!(parse_command("/play 2"), SessionCommand::Play(Some(2)));
        assert_eq!(parse_command("/play two"), SessionCommand::Unknown("/play two".into()));
    }

    struct CannedGenerator(&'static str);

    impl TextGenerator for CannedGenerator {
        fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            Ok(self.0.into())
        }
    }

    struct FixedTracks(Vec<Track>);

    impl TrackCatalog for FixedTracks {
        fn search_tracks(&self, _query: &str, _limit: usize) -> Result<Vec<Track>, CatalogError> {
            Ok(self.0.clone())
        }
    }

    struct HappyFace;

    impl EmotionAnalyzer for HappyFace {
        fn analyze(&mut self, _frame: &Frame) -> Result<EmotionAnalysis, AnalysisError> {
            Ok(EmotionAnalysis {
                dominant_emotion: "happy".into(),
                scores: [("happy", 0.82), ("neutral", 0.1), ("sad", 0.05), ("surprise", 0.03)]
                    .into_iter()
                    .collect(),
            })
        }
    }

    struct RecordingPlayer(RefCell<Vec<String>>);

    impl PreviewPlayer for RecordingPlayer {
        fn play(&self, track: &Track) -> Result<()> {
            self.0.borrow_mut().push(track.name.clone());
            Ok(())
        }
    }

    const MELLOW: &str =
        r#"{"mood_label":"Mellow","genre_query":"lofi beats","reason":"Slow and soft"}"#;
    const JOYFUL: &str =
        r#"{"mood_label":"Joyful","genre_query":"upbeat pop","reason":"High happiness score"}"#;

    fn track(name: &str, preview: Option<&str>) -> Track {
        Track {
            name: name.into(),
            artist: "Nujabes".into(),
            url: format!("https://open.spotify.com/track/{name}"),
            preview_url: preview.map(str::to_string),
        }
    }

    fn offline_pipeline(
        detector: Option<EmotionDetector>,
        reply: &'static str,
        tracks: Vec<Track>,
    ) -> Pipeline {
        Pipeline::new(
            detector,
            MoodMapper::new(Box::new(CannedGenerator(reply))),
            TrackRetriever::new(Box::new(FixedTracks(tracks))),
            PipelinePolicy::default(),
        )
    }

    fn offline_config() -> Config {
        let mut config = Config::from_env();
        config.model_dir = PathBuf::from("/nonexistent");
        config
    }

    fn run_lines(
        pipeline: &mut Pipeline,
        devices: SessionDevices<'_>,
        input: &str,
    ) -> Vec<DisplayEvent> {
        let mut prompt = Vec::new();
        let mut events: Vec<DisplayEvent> = Vec::new();
        run_session(
            pipeline,
            devices,
            &offline_config(),
            Cursor::new(input.to_string()),
            &mut prompt,
            &mut events,
        )
        .unwrap();
        events
    }

    #[test]
    fn test_session_runs_text_lines_until_quit() {
        let mut pipeline = offline_pipeline(None, MELLOW, vec![track("Aruarian Dance", None)]);
        let events = run_lines(&mut pipeline, SessionDevices::default(), "\nrainy day\n/snap\n/quit\nignored\n");

        assert!(events.iter().any(|e| matches!(
            e,
            DisplayEvent::Mapping(m) if m.genre_query == "lofi beats"
        )));
        assert!(events
            .iter()
            .any(|e| matches!(e, DisplayEvent::Tracks(t) if t[0].name == "Aruarian Dance")));
        assert!(matches!(events.last(), Some(DisplayEvent::Error(m)) if m.contains("no camera")));
        assert_eq!(
            events.iter().filter(|e| matches!(e, DisplayEvent::Mapping(_))).count(),
            1
        );
    }

    #[test]
    fn test_session_reports_unreadable_image() {
        let mut pipeline = offline_pipeline(None, MELLOW, Vec::new());
        let events = run_lines(&mut pipeline, SessionDevices::default(), "/image /nonexistent/face.png\n");

        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], DisplayEvent::Error(_)));
    }

    #[test]
    fn test_session_plays_track_from_last_results() {
        let tracks = vec![
            track("Aruarian Dance", None),
            track("Feather", Some("https://p.scdn.co/mp3-preview/feather")),
        ];
        let mut pipeline = offline_pipeline(None, MELLOW, tracks);
        let player = RecordingPlayer(RefCell::new(Vec::new()));
        let devices = SessionDevices { camera: None, player: Some(&player) };

        let events = run_lines(&mut pipeline, devices, "/play\nrainy day\n/play\n/play 1\n/play 9\n");

        assert_eq!(*player.0.borrow(), vec!["Feather".to_string()]);
        let errors: Vec<&str> = events
            .iter()
            .filter_map(|e| match e {
                DisplayEvent::Error(m) => Some(m.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(
            errors,
            vec![
                "no tracks to play yet",
                "Aruarian Dance has no preview clip",
                "there is no track 9; pick 1 to 2",
            ]
        );
    }

    #[test]
    fn test_session_without_player_reports_unavailable() {
        let mut pipeline = offline_pipeline(None, MELLOW, Vec::new());
        let events = run_lines(&mut pipeline, SessionDevices::default(), "/play 1\n");
        assert!(matches!(&events[0], DisplayEvent::Error(m) if m.contains("unavailable")));
    }

    #[test]
    fn test_image_scenario_renders_to_terminal() {
        let tracks = vec![
            track("Good as Hell", Some("https://p.scdn.co/mp3-preview/1")),
            track("Levitating", None),
            track("Walking on Sunshine", None),
        ];
        let detector = EmotionDetector::new(Box::new(HappyFace));
        let mut pipeline = offline_pipeline(Some(detector), JOYFUL, tracks);
        let mut terminal = TerminalPresenter::new(Vec::new());

        let frame = Frame::new(vec![120; 16 * 16], 16, 16).unwrap();
        let outcome = pipeline.run(&Interaction::new(Some(frame), Some(String::new())), &mut terminal);
        assert!(matches!(outcome, Outcome::Displayed));

        let out = String::from_utf8(terminal.into_inner()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines.contains(&"Detected Emotion: Happy (0.82 confidence)"));
        assert!(out.contains("AI Mood: Joyful\nGenre: upbeat pop\nReason: High happiness score"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("- ")).count(), 3);
        assert!(lines.contains(&"- Levitating by Nujabes -> https://open.spotify.com/track/Levitating"));
        assert!(!out.contains("Low confidence"));
        assert!(!out.contains("Warning"));
    }
}
