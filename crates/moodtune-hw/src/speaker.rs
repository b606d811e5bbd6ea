//! Blocking playback of decoded clips on the default output device via `cpal`.

use crate::clip::{AudioClip, AudioError};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

const POLL_INTERVAL: Duration = Duration::from_millis(50);
/// Extra wait past the clip length before giving up on a stalled device.
const PLAYBACK_GRACE: Duration = Duration::from_secs(2);

pub struct Speaker {
    device: Device,
    config: StreamConfig,
    sample_format: SampleFormat,
}

impl Speaker {
    /// Open the host's default output device at its preferred configuration.
    pub fn open_default() -> Result<Self, AudioError> {
        let host = cpal::default_host();
        let device = host.default_output_device().ok_or(AudioError::NoOutputDevice)?;
        let supported = device
            .default_output_config()
            .map_err(|e| AudioError::Output(format!("failed to get default config: {e}")))?;

        let sample_format = supported.sample_format();
        let config = supported.config();
        tracing::info!(
            device = %device.name().unwrap_or_else(|_| "unknown".to_string()),
            rate = config.sample_rate.0,
            channels = config.channels,
            format = ?sample_format,
            "opened audio output"
        );

        Ok(Self { device, config, sample_format })
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate.0
    }

    /// Play `clip` to the end, blocking the caller.
    pub fn play(&self, clip: AudioClip) -> Result<(), AudioError> {
        let clip = clip.resampled(self.sample_rate())?;
        let deadline = Instant::now() + clip.duration() + PLAYBACK_GRACE;
        let cursor = Arc::new(ClipCursor::new(clip.samples));

        let stream = match self.sample_format {
            SampleFormat::F32 => self.build_stream::<f32>(Arc::clone(&cursor))?,
            SampleFormat::I16 => self.build_stream::<i16>(Arc::clone(&cursor))?,
            SampleFormat::U16 => self.build_stream::<u16>(Arc::clone(&cursor))?,
            other => {
                return Err(AudioError::Output(format!("unsupported sample format {other:?}")));
            }
        };
        stream
            .play()
            .map_err(|e| AudioError::Output(format!("failed to start stream: {e}")))?;

        while !cursor.finished() {
            if Instant::now() >= deadline {
                tracing::warn!("audio device stopped consuming samples; ending playback");
                break;
            }
            std::thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    fn build_stream<T>(&self, cursor: Arc<ClipCursor>) -> Result<Stream, AudioError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let channels = self.config.channels as usize;
        self.device
            .build_output_stream(
                &self.config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| fill(data, channels, &cursor),
                |err| tracing::error!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| AudioError::Output(format!("failed to build stream: {e}")))
    }
}

/// Read position into a stereo clip, shared with the audio callback.
struct ClipCursor {
    samples: Vec<f32>,
    frame: AtomicUsize,
    finished: AtomicBool,
}

impl ClipCursor {
    fn new(samples: Vec<f32>) -> Self {
        Self {
            samples,
            frame: AtomicUsize::new(0),
            finished: AtomicBool::new(false),
        }
    }

    /// Next stereo frame, or silence once the clip is exhausted.
    fn next_frame(&self) -> (f32, f32) {
        let i = self.frame.fetch_add(1, Ordering::Relaxed);
        match self.samples.get(i * 2..i * 2 + 2) {
            Some(&[l, r]) => (l, r),
            _ => {
                self.finished.store(true, Ordering::Release);
                (0.0, 0.0)
            }
        }
    }

    fn finished(&self) -> bool {
        self.finished.load(Ordering::Acquire)
    }
}

/// Fill an interleaved device buffer. Mono devices get the downmix, extra
/// channels alternate left and right.
fn fill<T>(data: &mut [T], channels: usize, cursor: &ClipCursor)
where
    T: Sample + FromSample<f32>,
{
    for frame in data.chunks_mut(channels.max(1)) {
        let (l, r) = cursor.next_frame();
        if let [mono] = frame {
            *mono = T::from_sample((l + r) * 0.5);
            continue;
        }
        for (i, sample) in frame.iter_mut().enumerate() {
            *sample = T::from_sample(if i % 2 == 0 { l } else { r });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fill_stereo_then_silence() {
        let cursor = ClipCursor::new(vec![0.1, 0.2, 0.3, 0.4]);
        let mut out = [9.0f32; 6];
        fill(&mut out, 2, &cursor);
        assert_eq!(out, [0.1, 0.2, 0.3, 0.4, 0.0, 0.0]);
        assert!(cursor.finished());
    }

    #[test]
    fn test_fill_not_finished_mid_clip() {
        let cursor = ClipCursor::new(vec![0.1, 0.2, 0.3, 0.4]);
        let mut out = [0.0f32; 2];
        fill(&mut out, 2, &cursor);
        assert!(!cursor.finished());
    }

    #[test]
    fn test_fill_mono_downmix_and_surround() {
        let cursor = ClipCursor::new(vec![0.2, 0.4]);
        let mut mono = [0.0f32; 1];
        fill(&mut mono, 1, &cursor);
        assert!((mono[0] - 0.3).abs() < 1e-6);

        let cursor = ClipCursor::new(vec![0.2, 0.4]);
        let mut quad = [0.0f32; 4];
        fill(&mut quad, 4, &cursor);
        assert_eq!(quad, [0.2, 0.4, 0.2, 0.4]);
    }

    #[test]
    fn test_fill_integer_formats() {
        let cursor = ClipCursor::new(vec![1.0, -1.0]);
        let mut out = [0i16; 2];
        fill(&mut out, 2, &cursor);
        assert!(out[0] > 32000);
        assert!(out[1] < -32000);
    }
}
