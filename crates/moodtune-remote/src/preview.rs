//! Download of track preview clips.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use std::time::Duration;
use thiserror::Error;

/// Previews are ~30s MP3s; anything much larger is not a preview.
pub const MAX_PREVIEW_BYTES: usize = 8 * 1024 * 1024;

#[derive(Error, Debug)]
pub enum PreviewError {
    #[error("connection error: {0}")]
    Connection(String),
    #[error("preview request failed with HTTP {0}")]
    Http(u16),
    #[error("preview is too large ({0} bytes)")]
    TooLarge(usize),
}

/// A downloaded clip and its declared media type.
#[derive(Debug, Clone)]
pub struct Preview {
    pub bytes: Vec<u8>,
    pub content_type: Option<String>,
}

impl Preview {
    /// File extension matching the media type, used as a decoder hint.
    pub fn extension(&self) -> Option<&'static str> {
        let mime = self.content_type.as_deref()?;
        let essence = mime.split(';').next()?.trim().to_ascii_lowercase();
        match essence.as_str() {
            "audio/mpeg" | "audio/mp3" => Some("mp3"),
            "audio/mp4" | "audio/aac" => Some("m4a"),
            "audio/ogg" => Some("ogg"),
            "audio/wav" | "audio/x-wav" | "audio/wave" => Some("wav"),
            "audio/flac" => Some("flac"),
            _ => None,
        }
    }
}

pub struct PreviewClient {
    client: Client,
}

impl PreviewClient {
    pub fn new(timeout: Duration) -> Result<Self, PreviewError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PreviewError::Connection(e.to_string()))?;
        Ok(Self { client })
    }

    pub fn fetch(&self, url: &str) -> Result<Preview, PreviewError> {
        tracing::debug!(url, "downloading preview");

        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| PreviewError::Connection(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PreviewError::Http(status.as_u16()));
        }
        if let Some(len) = response.content_length() {
            check_size(len as usize)?;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let bytes = response
            .bytes()
            .map_err(|e| PreviewError::Connection(e.to_string()))?;
        check_size(bytes.len())?;

        tracing::debug!(bytes = bytes.len(), content_type = ?content_type, "preview downloaded");
        Ok(Preview { bytes: bytes.to_vec(), content_type })
    }
}

fn check_size(len: usize) -> Result<(), PreviewError> {
    if len > MAX_PREVIEW_BYTES {
        return Err(PreviewError::TooLarge(len));
    }
    Ok(())
}
