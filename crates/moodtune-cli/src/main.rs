mod config;
mod play;
mod render;
mod session;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::Config;
use moodtune_core::{Interaction, Outcome, Route};
use moodtune_hw::Camera;
use moodtune_vision::analyzer::{CLASSIFIER_MODEL_FILE, LOCATOR_MODEL_FILE};
use play::{PreviewPlayer, SpeakerPlayer, TrackMemory};
use render::TerminalPresenter;
use session::SessionDevices;
use std::path::PathBuf;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "moodtune", about = "Music recommendations from your facial expression or mood")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one recommendation from an image, the camera, or text
    Recommend {
        /// Image file to analyze
        #[arg(long, conflicts_with = "camera")]
        image: Option<PathBuf>,
        /// Take a snapshot from the camera
        #[arg(long)]
        camera: bool,
        /// How you feel, in your own words
        #[arg(short, long)]
        text: Option<String>,
        /// Number of tracks to show
        #[arg(short, long)]
        limit: Option<usize>,
        /// Also write the analyzed image to this PNG file
        #[arg(long)]
        save_capture: Option<PathBuf>,
        /// Play the preview of track N, or of the first track with one
        #[arg(long, value_name = "N")]
        play: Option<Option<usize>>,
    },
    /// Interactive session, one recommendation per input line
    Session {
        /// Open the camera so `/snap` works
        #[arg(long)]
        camera: bool,
    },
    /// List video capture devices
    Devices,
    /// Show configuration and model availability
    Status,
}

fn main() -> Result<ExitCode> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Recommend {
            image,
            camera,
            text,
            limit,
            save_capture,
            play,
        } => recommend(&config, image, camera, text, limit, save_capture, play),
        Commands::Session { camera } => {
            let mut pipeline = session::build_pipeline(&config, config.policy())?;
            let camera = if camera { Some(session::open_camera(&config)?) } else { None };
            let player = match SpeakerPlayer::new(config.http_timeout()) {
                Ok(player) => Some(player),
                Err(e) => {
                    tracing::warn!(error = %e, "preview playback disabled");
                    None
                }
            };
            let devices = SessionDevices {
                camera: camera.as_ref(),
                player: player.as_ref().map(|p| p as &dyn PreviewPlayer),
            };
            let mut presenter = TerminalPresenter::new(std::io::stdout());
            session::run_session(
                &mut pipeline,
                devices,
                &config,
                std::io::stdin().lock(),
                &mut std::io::stdout(),
                &mut presenter,
            )?;
            Ok(ExitCode::SUCCESS)
        }
        Commands::Devices => {
            let devices = Camera::list_devices();
            if devices.is_empty() {
                println!("No video capture devices found");
            }
            for d in devices {
                println!("{}  {} ({}, {})", d.path, d.name, d.driver, d.bus);
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Status => {
            let status = serde_json::json!({
                "version": env!("CARGO_PKG_VERSION"),
                "credentials": {
                    "spotify": config.spotify_credentials().is_ok(),
                    "llm": config.chat_settings().is_ok(),
                },
                "llm": {
                    "base_url": config.llm_base_url,
                    "model": config.llm_model,
                    "temperature": config.llm_temperature,
                },
                "models": {
                    "dir": config.model_dir.display().to_string(),
                    "classifier": config.model_dir.join(CLASSIFIER_MODEL_FILE).exists(),
                    "face_locator": config.model_dir.join(LOCATOR_MODEL_FILE).exists(),
                },
                "camera": config.camera_device,
                "track_limit": config.track_limit,
                "low_confidence_threshold": config.low_confidence_threshold,
            });
            println!("{}", serde_json::to_string_pretty(&status)?);
            Ok(ExitCode::SUCCESS)
        }
    }
}

fn recommend(
    config: &Config,
    image: Option<PathBuf>,
    camera: bool,
    text: Option<String>,
    limit: Option<usize>,
    save_capture: Option<PathBuf>,
    play: Option<Option<usize>>,
) -> Result<ExitCode> {
    let mut policy = config.policy();
    if let Some(limit) = limit {
        policy.track_limit = limit;
    }

    let frame = match (image, camera) {
        (Some(path), _) => Some(
            moodtune_vision::load_frame(&path)
                .with_context(|| format!("failed to load {}", path.display()))?,
        ),
        (None, true) => {
            let camera = session::open_camera(config)?;
            Some(session::snapshot(&camera, config)?)
        }
        (None, false) => None,
    };

    if let (Some(frame), Some(path)) = (&frame, &save_capture) {
        moodtune_vision::save_frame(frame, path)?;
        tracing::info!(path = %path.display(), "saved capture");
    }

    let interaction = Interaction::new(frame, text);
    if let Some(hint) = idle_hint(&interaction) {
        println!("{hint}");
        return Ok(ExitCode::SUCCESS);
    }

    let mut pipeline = session::build_pipeline(config, policy)?;
    let mut terminal = TerminalPresenter::new(std::io::stdout());
    let mut presenter = TrackMemory::new(&mut terminal);
    if let Outcome::Halted(_) = pipeline.run(&interaction, &mut presenter) {
        return Ok(ExitCode::FAILURE);
    }

    if let Some(number) = play {
        let player = SpeakerPlayer::new(config.http_timeout())?;
        let tracks = presenter.tracks().to_vec();
        if !play::play_selected(&player, &tracks, number, &mut presenter) {
            return Ok(ExitCode::FAILURE);
        }
    }
    Ok(ExitCode::SUCCESS)
}

/// Usage hint when there is neither an image nor text to work with.
fn idle_hint(interaction: &Interaction) -> Option<&'static str> {
    match interaction.route() {
        Route::Idle => Some("Nothing to analyze: pass --image, --camera or --text."),
        Route::Image | Route::TextOnly => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recommend_args(args: &[&str]) -> Commands {
        let argv = ["moodtune", "recommend"].iter().chain(args).copied();
        Cli::try_parse_from(argv).unwrap().command
    }

    #[test]
    fn test_play_flag_forms() {
        let play_of = |args: &[&str]| match recommend_args(args) {
            Commands::Recommend { play, .. } => play,
            _ => unreachable!(),
        };
        assert_eq!(play_of(&["--text", "calm"]), None);
        assert_eq!(play_of(&["--text", "calm", "--play"]), Some(None));
        assert_eq!(play_of(&["--text", "calm", "--play", "2"]), Some(Some(2)));
    }

    #[test]
    fn test_idle_interaction_gets_hint() {
        assert!(idle_hint(&Interaction::new(None, None)).is_some());
        assert!(idle_hint(&Interaction::new(None, Some("   ".into()))).is_some());
        assert!(idle_hint(&Interaction::text("rainy day")).is_none());
    }
}
