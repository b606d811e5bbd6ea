//! Compressed audio previews decoded to interleaved stereo `f32`.

use rubato::{FastFixedIn, PolynomialDegree, Resampler};
use std::io::Cursor;
use std::time::Duration;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AudioError {
    #[error("unsupported audio: {0}")]
    Unsupported(String),
    #[error("decode failed: {0}")]
    Decode(String),
    #[error("resampling failed: {0}")]
    Resample(String),
    #[error("no audio output device")]
    NoOutputDevice,
    #[error("audio output failed: {0}")]
    Output(String),
}

/// Decoded PCM, interleaved stereo.
#[derive(Debug, Clone)]
pub struct AudioClip {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
}

impl AudioClip {
    pub fn frames(&self) -> usize {
        self.samples.len() / 2
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.frames() as f64 / self.sample_rate.max(1) as f64)
    }

    /// Convert to `rate` Hz. Returns the clip unchanged when it already matches.
    pub fn resampled(self, rate: u32) -> Result<AudioClip, AudioError> {
        if rate == self.sample_rate || self.frames() == 0 {
            return Ok(self);
        }
        tracing::debug!(from = self.sample_rate, to = rate, frames = self.frames(), "resampling clip");

        let (left, right): (Vec<f32>, Vec<f32>) =
            self.samples.chunks_exact(2).map(|f| (f[0], f[1])).unzip();

        let mut resampler = FastFixedIn::<f32>::new(
            rate as f64 / self.sample_rate as f64,
            1.0,
            PolynomialDegree::Septic,
            left.len(),
            2,
        )
        .map_err(|e| AudioError::Resample(e.to_string()))?;

        let planar = resampler
            .process(&[left, right], None)
            .map_err(|e| AudioError::Resample(e.to_string()))?;

        let samples = planar[0]
            .iter()
            .zip(&planar[1])
            .flat_map(|(&l, &r)| [l, r])
            .collect();
        Ok(AudioClip { samples, sample_rate: rate })
    }
}

/// Decode a whole in-memory clip. `extension` (e.g. "mp3") helps format
/// detection; content sniffing is used when it is absent.
pub fn decode_clip(bytes: Vec<u8>, extension: Option<&str>) -> Result<AudioClip, AudioError> {
    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let detected = symphonia::default::get_probe()
        .format(&hint, mss, &FormatOptions::default(), &MetadataOptions::default())
        .map_err(|e| AudioError::Unsupported(e.to_string()))?;
    let mut format = detected.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| AudioError::Unsupported("no audio track".into()))?;
    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| AudioError::Unsupported(e.to_string()))?;

    let mut samples = Vec::new();
    let mut sample_buf: Option<SampleBuffer<f32>> = None;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => break,
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };
        if packet.track_id() != track_id {
            continue;
        }

        let decoded = match decoder.decode(&packet) {
            Ok(decoded) => decoded,
            Err(SymphoniaError::DecodeError(e)) => {
                tracing::warn!(error = e, "skipping corrupt audio packet");
                continue;
            }
            Err(e) => return Err(AudioError::Decode(e.to_string())),
        };

        let spec = *decoded.spec();
        sample_rate.get_or_insert(spec.rate);
        let channels = spec.channels.count();

        let buf = sample_buf.get_or_insert_with(|| SampleBuffer::new(decoded.capacity() as u64, spec));
        buf.copy_interleaved_ref(decoded);
        push_stereo(buf.samples(), channels, &mut samples);
    }

    let sample_rate = sample_rate.ok_or_else(|| AudioError::Unsupported("unknown sample rate".into()))?;
    if samples.is_empty() {
        return Err(AudioError::Decode("clip contains no audio frames".into()));
    }

    tracing::debug!(sample_rate, frames = samples.len() / 2, "decoded clip");
    Ok(AudioClip { samples, sample_rate })
}

/// Append interleaved `channels`-wide frames as stereo: mono is duplicated,
/// extra channels beyond the first two are dropped.
fn push_stereo(interleaved: &[f32], channels: usize, out: &mut Vec<f32>) {
    match channels {
        0 => {}
        1 => out.extend(interleaved.iter().flat_map(|&s| [s, s])),
        n => out.extend(interleaved.chunks_exact(n).flat_map(|f| [f[0], f[1]])),
    }
}
