//! Audio output abstraction and click-sound synthesis.
//!
//! The engine talks to the audio hardware through [`AudioOutput`]: a
//! monotonic audio clock plus exact-time click scheduling. Programming
//! clicks at exact start times is what decouples audible precision from
//! the jitter of the driving tick.

#[cfg(feature = "cpal-output")]
mod cpal_out;
#[cfg(feature = "cpal-output")]
pub use cpal_out::CpalOutput;

use std::path::Path;

use crate::{Error, Result};

/// Frequency of the regular click tone.
pub const CLICK_FREQ_HZ: f64 = 1000.0;
/// Frequency of the accent click tone.
pub const ACCENT_FREQ_HZ: f64 = 1200.0;
/// Click length in seconds.
pub const CLICK_DURATION_SEC: f64 = 0.03;
/// Gain applied to accent clicks.
pub const ACCENT_GAIN: f32 = 1.0;
/// Gain applied to regular clicks.
pub const NORMAL_GAIN: f32 = 0.8;

/// Abstract audio output device.
///
/// Implementations own the hardware clock domain: `audio_time` is
/// monotonic, starts at an arbitrary origin and advances in real seconds.
pub trait AudioOutput {
    /// Acquire the underlying audio resource. Idempotent.
    fn acquire(&mut self) -> Result<()>;

    /// Resume output if suspended.
    fn resume(&mut self) -> Result<()>;

    /// Current audio-clock time in seconds.
    fn audio_time(&self) -> f64;

    /// Program a click to start at exactly `at` seconds on the audio
    /// clock. Must not play "now"; the hardware honors the timestamp.
    fn schedule_click(&mut self, at: f64, accent: bool) -> Result<()>;

    /// Drop scheduled clicks that have not started yet.
    fn cancel_pending(&mut self);

    /// Release the audio resource. Idempotent.
    fn release(&mut self);
}

/// Mono click sample buffers for the two timbres.
#[derive(Debug, Clone)]
pub struct ClickSounds {
    pub normal: Vec<f32>,
    pub accent: Vec<f32>,
    pub sample_rate: f64,
}

impl ClickSounds {
    /// Synthesize both click timbres at the given sample rate: a short
    /// sine burst with a linear attack, flat sustain and linear release.
    pub fn synthesized(sample_rate: f64) -> Self {
        Self {
            normal: generate_click(sample_rate, CLICK_FREQ_HZ),
            accent: generate_click(sample_rate, ACCENT_FREQ_HZ),
            sample_rate,
        }
    }

    /// Load click timbres from WAV files instead of synthesizing them.
    ///
    /// The files must match the output sample rate; a decode failure or
    /// rate mismatch aborts initialization.
    pub fn from_wav_files(sample_rate: f64, normal: &Path, accent: &Path) -> Result<Self> {
        Ok(Self {
            normal: load_wav_mono(normal, sample_rate)?,
            accent: load_wav_mono(accent, sample_rate)?,
            sample_rate,
        })
    }

    pub fn buffer(&self, accent: bool) -> &[f32] {
        if accent {
            &self.accent
        } else {
            &self.normal
        }
    }

    pub fn gain(accent: bool) -> f32 {
        if accent {
            ACCENT_GAIN
        } else {
            NORMAL_GAIN
        }
    }
}

fn generate_click(sample_rate: f64, freq: f64) -> Vec<f32> {
    let num_samples = (sample_rate * CLICK_DURATION_SEC) as usize;

    (0..num_samples)
        .map(|i| {
            let t = i as f64 / sample_rate;
            let env = if t < 0.001 {
                t / 0.001
            } else if t < 0.02 {
                1.0
            } else {
                1.0 - (t - 0.02) / 0.01
            };
            let phase = 2.0 * std::f64::consts::PI * freq * t;
            (phase.sin() * env) as f32
        })
        .collect()
}

fn load_wav_mono(path: &Path, expected_rate: f64) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)
        .map_err(|e| Error::AssetLoad(format!("{}: {e}", path.display())))?;
    let spec = reader.spec();

    if (f64::from(spec.sample_rate) - expected_rate).abs() > 0.5 {
        return Err(Error::AssetLoad(format!(
            "{}: sample rate {} does not match output rate {expected_rate}",
            path.display(),
            spec.sample_rate
        )));
    }

    let channels = usize::from(spec.channels);
    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<_, _>>()
            .map_err(|e| Error::AssetLoad(format!("{}: {e}", path.display())))?,
        hound::SampleFormat::Int => {
            let scale = (1i64 << (spec.bits_per_sample - 1)) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / scale))
                .collect::<std::result::Result<_, _>>()
                .map_err(|e| Error::AssetLoad(format!("{}: {e}", path.display())))?
        }
    };

    if samples.is_empty() {
        return Err(Error::AssetLoad(format!("{}: empty file", path.display())));
    }

    // Downmix interleaved channels to mono.
    let mono: Vec<f32> = samples
        .chunks(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect();
    Ok(mono)
}
