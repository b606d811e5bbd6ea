//! moodtune-hw — local devices.
//!
//! V4L2 capture of a single settled frame converted to grayscale, and
//! playback of short audio previews on the default output device.

pub mod camera;
pub mod clip;
pub mod pixels;
pub mod speaker;

pub use camera::{Camera, CameraError, DeviceInfo, PixelFormat};
pub use clip::{decode_clip, AudioClip, AudioError};
pub use speaker::Speaker;
