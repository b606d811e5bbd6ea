//! Raw camera buffers to grayscale, plus dark-frame detection.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PixelError {
    #[error("buffer too short for {format}: expected {expected}, got {actual}")]
    TooShort {
        format: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("MJPEG decode failed: {0}")]
    Jpeg(#[from] image::ImageError),
    #[error("MJPEG frame is {actual_w}x{actual_h}, negotiated {width}x{height}")]
    SizeMismatch {
        width: u32,
        height: u32,
        actual_w: u32,
        actual_h: u32,
    },
}

/// Packed YUYV 4:2:2 to grayscale: keep every Y byte.
pub fn yuyv_to_grayscale(yuyv: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PixelError> {
    let expected = (width * height * 2) as usize;
    if yuyv.len() < expected {
        return Err(PixelError::TooShort { format: "YUYV", expected, actual: yuyv.len() });
    }
    Ok(yuyv[..expected].iter().step_by(2).copied().collect())
}

/// 8-bit grayscale passthrough with a length check.
pub fn grey_to_grayscale(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PixelError> {
    let expected = (width * height) as usize;
    if buf.len() < expected {
        return Err(PixelError::TooShort { format: "GREY", expected, actual: buf.len() });
    }
    Ok(buf[..expected].to_vec())
}

/// Decode one MJPEG buffer and convert it to grayscale.
pub fn mjpeg_to_grayscale(buf: &[u8], width: u32, height: u32) -> Result<Vec<u8>, PixelError> {
    let gray = image::load_from_memory_with_format(buf, image::ImageFormat::Jpeg)?.to_luma8();
    let (actual_w, actual_h) = gray.dimensions();
    if (actual_w, actual_h) != (width, height) {
        return Err(PixelError::SizeMismatch { width, height, actual_w, actual_h });
    }
    Ok(gray.into_raw())
}

/// True when more than `threshold_pct` of the pixels are below 32.
///
/// Webcams commonly deliver a few black frames right after streaming starts.
pub fn is_dark_frame(gray: &[u8], threshold_pct: f32) -> bool {
    if gray.is_empty() {
        return true;
    }
    let dark = gray.iter().filter(|&&p| p < 32).count();
    (dark as f32 / gray.len() as f32) > threshold_pct
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuyv_keeps_luma() {
        let yuyv: Vec<u8> = (0..16).collect();
        assert_eq!(yuyv_to_grayscale(&yuyv, 4, 2).unwrap(), vec![0, 2, 4, 6, 8, 10, 12, 14]);
    }

    #[test]
    fn test_yuyv_too_short() {
        assert!(matches!(
            yuyv_to_grayscale(&[100, 128], 2, 1),
            Err(PixelError::TooShort { expected: 4, actual: 2, .. })
        ));
    }

    #[test]
    fn test_grey_truncates_padding() {
        let buf = vec![7u8; 10];
        assert_eq!(grey_to_grayscale(&buf, 3, 2).unwrap(), vec![7; 6]);
        assert!(grey_to_grayscale(&buf, 4, 4).is_err());
    }

    #[test]
    fn test_mjpeg_decodes_and_checks_size() {
        let img = image::GrayImage::from_pixel(4, 2, image::Luma([120u8]));
        let mut jpeg = Vec::new();
        image::DynamicImage::ImageLuma8(img)
            .write_to(&mut std::io::Cursor::new(&mut jpeg), image::ImageFormat::Jpeg)
            .unwrap();

        let gray = mjpeg_to_grayscale(&jpeg, 4, 2).unwrap();
        assert_eq!(gray.len(), 8);
        assert!(gray.iter().all(|&p| (p as i32 - 120).abs() <= 3));
        assert!(matches!(
            mjpeg_to_grayscale(&jpeg, 8, 8),
            Err(PixelError::SizeMismatch { .. })
        ));
    }

    #[test]
    fn test_mjpeg_garbage_is_error() {
        assert!(matches!(mjpeg_to_grayscale(&[0, 1, 2], 1, 1), Err(PixelError::Jpeg(_))));
    }

    #[test]
    fn test_dark_frame_detection() {
        assert!(is_dark_frame(&[0u8; 1000], 0.95));
        assert!(!is_dark_frame(&[128u8; 1000], 0.95));
        assert!(is_dark_frame(&[], 0.95));

        let mut mostly_dark = vec![10u8; 960];
        mostly_dark.extend([128u8; 40]);
        assert!(is_dark_frame(&mostly_dark, 0.95));

        let mut lit = vec![10u8; 940];
        lit.extend([128u8; 60]);
        assert!(!is_dark_frame(&lit, 0.95));
    }
}
