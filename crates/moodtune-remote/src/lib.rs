//! moodtune-remote — network collaborators.
//!
//! Blocking HTTP clients implementing the core capability traits: an
//! OpenAI-compatible chat completions generator and a Spotify track catalog,
//! plus a downloader for track preview clips.

pub mod chat;
pub mod preview;
pub mod spotify;

pub use chat::{ChatCompletionsClient, ChatSettings};
pub use preview::{Preview, PreviewClient, PreviewError};
pub use spotify::{SpotifyCatalog, SpotifyCredentials};
