//! Image files in and out of [`Frame`]s.

use image::GrayImage;
use moodtune_core::Frame;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ImageError {
    #[error("cannot read image {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("cannot write image {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: image::ImageError,
    },
    #[error("image {0} is empty")]
    Empty(String),
}

/// Decode any supported image file into a grayscale frame.
pub fn load_frame(path: &Path) -> Result<Frame, ImageError> {
    let img = image::open(path).map_err(|source| ImageError::Read {
        path: path.display().to_string(),
        source,
    })?;
    let gray = img.to_luma8();
    let (width, height) = gray.dimensions();

    tracing::debug!(path = %path.display(), width, height, "loaded image");
    Frame::new(gray.into_raw(), width, height)
        .ok_or_else(|| ImageError::Empty(path.display().to_string()))
}

/// Save a frame; the format follows the file extension.
pub fn save_frame(frame: &Frame, path: &Path) -> Result<(), ImageError> {
    let img = GrayImage::from_raw(frame.width, frame.height, frame.data.clone())
        .ok_or_else(|| ImageError::Empty(path.display().to_string()))?;
    img.save(path).map_err(|source| ImageError::Write {
        path: path.display().to_string(),
        source,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("moodtune-{}-{name}", std::process::id()))
    }

    #[test]
    fn test_save_then_load_png() {
        let data: Vec<u8> = (0..48).map(|i| (i * 5) as u8).collect();
        let frame = Frame::new(data.clone(), 8, 6).unwrap();
        let path = temp_path("frame.png");

        save_frame(&frame, &path).unwrap();
        let loaded = load_frame(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!((loaded.width, loaded.height), (8, 6));
        assert_eq!(loaded.data, data);
    }

    #[test]
    fn test_missing_file_is_read_error() {
        let err = load_frame(Path::new("/nonexistent/moodtune/selfie.jpg")).unwrap_err();
        assert!(matches!(err, ImageError::Read { .. }));
    }
}
