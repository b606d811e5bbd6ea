//! V4L2 camera snapshots via the `v4l` crate.

use crate::pixels::{self, PixelError};
use moodtune_core::Frame;
use std::path::Path;
use thiserror::Error;
use v4l::buffer::Type as BufType;
use v4l::io::traits::CaptureStream;
use v4l::prelude::*;
use v4l::video::Capture;
use v4l::FourCC;

/// Share of sub-32 pixels above which a frame counts as dark.
const DARK_FRAME_THRESHOLD: f32 = 0.95;
/// Extra frames read past warmup while waiting for a lit frame.
const MAX_DARK_RETRIES: usize = 8;

#[derive(Error, Debug)]
pub enum CameraError {
    #[error("device not found: {0}")]
    DeviceNotFound(String),
    #[error("device busy")]
    DeviceBusy,
    #[error("capture failed: {0}")]
    CaptureFailed(String),
    #[error("format negotiation failed: {0}")]
    FormatNegotiationFailed(String),
    #[error("device cannot capture video")]
    StreamingNotSupported,
    #[error("bad frame: {0}")]
    BadFrame(#[from] PixelError),
}

/// A V4L2 capture device.
#[derive(Debug, Clone)]
pub struct DeviceInfo {
    pub path: String,
    pub name: String,
    pub driver: String,
    pub bus: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    /// YUYV 4:2:2 packed, the usual uncompressed webcam format.
    Yuyv,
    /// Motion JPEG, one JPEG image per buffer.
    Mjpeg,
    /// 8-bit grayscale.
    Grey,
}

impl PixelFormat {
    fn from_fourcc(fourcc: FourCC) -> Option<Self> {
        match &fourcc.repr {
            b"YUYV" => Some(Self::Yuyv),
            b"MJPG" => Some(Self::Mjpeg),
            b"GREY" => Some(Self::Grey),
            _ => None,
        }
    }
}

pub struct Camera {
    device: Device,
    pub width: u32,
    pub height: u32,
    pub device_path: String,
    pixel_format: PixelFormat,
}

impl Camera {
    /// Open a camera (e.g. "/dev/video0") and ask for `width × height` YUYV.
    /// Drivers that answer with MJPEG or GREY are accepted too.
    pub fn open(device_path: &str, width: u32, height: u32) -> Result<Self, CameraError> {
        if !Path::new(device_path).exists() {
            return Err(CameraError::DeviceNotFound(device_path.to_string()));
        }

        let device = Device::with_path(device_path).map_err(|e| {
            if e.raw_os_error() == Some(16) || e.to_string().contains("busy") {
                CameraError::DeviceBusy
            } else {
                CameraError::DeviceNotFound(format!("{device_path}: {e}"))
            }
        })?;

        let caps = device
            .query_caps()
            .map_err(|e| CameraError::CaptureFailed(format!("failed to query capabilities: {e}")))?;
        if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
            return Err(CameraError::StreamingNotSupported);
        }
        tracing::info!(device = device_path, card = %caps.card, driver = %caps.driver, "opened camera");

        let mut fmt = device
            .format()
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("failed to get format: {e}")))?;
        fmt.fourcc = FourCC::new(b"YUYV");
        fmt.width = width;
        fmt.height = height;

        let negotiated = device
            .set_format(&fmt)
            .map_err(|e| CameraError::FormatNegotiationFailed(format!("failed to set format: {e}")))?;

        let pixel_format = PixelFormat::from_fourcc(negotiated.fourcc).ok_or_else(|| {
            CameraError::FormatNegotiationFailed(format!(
                "unsupported pixel format {:?} (need YUYV, MJPG or GREY)",
                negotiated.fourcc
            ))
        })?;

        tracing::info!(
            width = negotiated.width,
            height = negotiated.height,
            format = ?pixel_format,
            "negotiated format"
        );

        Ok(Self {
            device,
            width: negotiated.width,
            height: negotiated.height,
            device_path: device_path.to_string(),
            pixel_format,
        })
    }

    /// Take one still for analysis.
    ///
    /// Discards `warmup` frames so auto exposure can settle, then keeps
    /// reading until a frame is not dark. If every retry is dark, the last
    /// frame is returned anyway.
    pub fn snapshot(&self, warmup: usize) -> Result<Frame, CameraError> {
        let mut stream = MmapStream::with_buffers(&self.device, BufType::VideoCapture, 4)
            .map_err(|e| CameraError::CaptureFailed(format!("failed to create mmap stream: {e}")))?;

        for _ in 0..warmup {
            stream
                .next()
                .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
        }

        let mut last = None;
        for attempt in 0..=MAX_DARK_RETRIES {
            let (buf, meta) = stream
                .next()
                .map_err(|e| CameraError::CaptureFailed(format!("failed to dequeue buffer: {e}")))?;
            let gray = self.to_grayscale(buf)?;

            if !pixels::is_dark_frame(&gray, DARK_FRAME_THRESHOLD) {
                tracing::debug!(seq = meta.sequence, attempt, "captured snapshot");
                return self.frame(gray);
            }
            tracing::debug!(seq = meta.sequence, "skipping dark frame");
            last = Some(gray);
        }

        tracing::warn!(device = %self.device_path, "all frames dark; using the last one");
        match last {
            Some(gray) => self.frame(gray),
            None => Err(CameraError::CaptureFailed("no frame captured".into())),
        }
    }

    fn to_grayscale(&self, buf: &[u8]) -> Result<Vec<u8>, PixelError> {
        match self.pixel_format {
            PixelFormat::Yuyv => pixels::yuyv_to_grayscale(buf, self.width, self.height),
            PixelFormat::Mjpeg => pixels::mjpeg_to_grayscale(buf, self.width, self.height),
            PixelFormat::Grey => pixels::grey_to_grayscale(buf, self.width, self.height),
        }
    }

    fn frame(&self, gray: Vec<u8>) -> Result<Frame, CameraError> {
        Frame::new(gray, self.width, self.height)
            .ok_or_else(|| CameraError::CaptureFailed("empty frame".into()))
    }

    /// List video capture devices among /dev/video0..15.
    pub fn list_devices() -> Vec<DeviceInfo> {
        (0..16)
            .filter_map(|i| {
                let path = format!("/dev/video{i}");
                if !Path::new(&path).exists() {
                    return None;
                }
                let caps = Device::with_path(&path).ok()?.query_caps().ok()?;
                if !caps.capabilities.contains(v4l::capability::Flags::VIDEO_CAPTURE) {
                    return None;
                }
                Some(DeviceInfo {
                    path,
                    name: caps.card,
                    driver: caps.driver,
                    bus: caps.bus,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixel_format_from_fourcc() {
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"YUYV")), Some(PixelFormat::Yuyv));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"MJPG")), Some(PixelFormat::Mjpeg));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"GREY")), Some(PixelFormat::Grey));
        assert_eq!(PixelFormat::from_fourcc(FourCC::new(b"H264")), None);
    }

    #[test]
    fn test_open_missing_device() {
        assert!(matches!(
            Camera::open("/dev/video-moodtune-missing", 640, 480),
            Err(CameraError::DeviceNotFound(_))
        ));
    }
}
