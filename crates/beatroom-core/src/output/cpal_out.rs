//! CPAL-backed audio output with sample-accurate click scheduling.
//!
//! Scheduled clicks cross into the real-time callback over a lock-free
//! channel; the callback mixes them at their exact start sample. The
//! audio clock is the number of samples rendered so far.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use crossbeam_channel::{unbounded, Receiver, Sender};

use super::{AudioOutput, ClickSounds};
use crate::{Error, Result};

enum ClickCommand {
    Click { start_sample: u64, accent: bool },
    CancelPending,
}

struct Voice {
    start_sample: u64,
    accent: bool,
}

/// State owned by the real-time callback.
struct CallbackState {
    commands: Receiver<ClickCommand>,
    pending: Vec<Voice>,
    voices: Vec<Voice>,
    sounds: ClickSounds,
    samples_elapsed: Arc<AtomicU64>,
    channels: usize,
}

impl CallbackState {
    fn render(&mut self, output: &mut [f32]) {
        let frames = output.len() / self.channels;
        let start = self.samples_elapsed.load(Ordering::Acquire);
        let end = start + frames as u64;

        while let Ok(cmd) = self.commands.try_recv() {
            match cmd {
                ClickCommand::Click {
                    start_sample,
                    accent,
                } => self.pending.push(Voice {
                    start_sample,
                    accent,
                }),
                // Drops clicks that have not started; running voices finish.
                ClickCommand::CancelPending => self.pending.clear(),
            }
        }

        // Activate clicks whose start falls inside this buffer. A click
        // whose whole window is already past is dropped (late beat).
        let mut i = 0;
        while i < self.pending.len() {
            if self.pending[i].start_sample < end {
                let voice = self.pending.swap_remove(i);
                let len = self.sounds.buffer(voice.accent).len() as u64;
                if voice.start_sample + len > start {
                    self.voices.push(voice);
                }
            } else {
                i += 1;
            }
        }

        output.fill(0.0);
        for voice in &self.voices {
            let buf = self.sounds.buffer(voice.accent);
            let gain = ClickSounds::gain(voice.accent);
            for frame in 0..frames {
                let t = start + frame as u64;
                if t < voice.start_sample {
                    continue;
                }
                let idx = (t - voice.start_sample) as usize;
                if idx >= buf.len() {
                    break;
                }
                let sample = buf[idx] * gain;
                let base = frame * self.channels;
                for ch in 0..self.channels {
                    output[base + ch] += sample;
                }
            }
        }

        let sounds = &self.sounds;
        self.voices
            .retain(|v| v.start_sample + sounds.buffer(v.accent).len() as u64 > end);

        self.samples_elapsed.store(end, Ordering::Release);
    }
}

/// CPAL output device implementing [`AudioOutput`].
pub struct CpalOutput {
    sample_rate: f64,
    commands: Option<Sender<ClickCommand>>,
    samples_elapsed: Arc<AtomicU64>,
    stream: Option<cpal::Stream>,
    wav_override: Option<(PathBuf, PathBuf)>,
}

impl CpalOutput {
    pub fn new() -> Self {
        Self {
            sample_rate: 0.0,
            commands: None,
            samples_elapsed: Arc::new(AtomicU64::new(0)),
            stream: None,
            wav_override: None,
        }
    }

    /// Use WAV files for the two click timbres instead of synthesis.
    pub fn with_wav_clicks(mut self, normal: PathBuf, accent: PathBuf) -> Self {
        self.wav_override = Some((normal, accent));
        self
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }
}

impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioOutput for CpalOutput {
    fn acquire(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or(Error::UnsupportedPlatform)?;
        let config = device.default_output_config()?;

        let sample_rate = f64::from(config.sample_rate().0);
        let channels = usize::from(config.channels());

        let sounds = match &self.wav_override {
            Some((normal, accent)) => ClickSounds::from_wav_files(sample_rate, normal, accent)?,
            None => ClickSounds::synthesized(sample_rate),
        };

        let (tx, rx) = unbounded();
        self.samples_elapsed.store(0, Ordering::Release);
        let state = CallbackState {
            commands: rx,
            pending: Vec::new(),
            voices: Vec::new(),
            sounds,
            samples_elapsed: Arc::clone(&self.samples_elapsed),
            channels,
        };

        let stream = match config.sample_format() {
            cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config.into(), state)?,
            cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config.into(), state)?,
            cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config.into(), state)?,
            format => {
                return Err(Error::AudioResource(format!(
                    "unsupported sample format: {format:?}"
                )));
            }
        };
        stream.play()?;

        self.sample_rate = sample_rate;
        self.commands = Some(tx);
        self.stream = Some(stream);
        tracing::debug!(sample_rate, channels, "audio output acquired");
        Ok(())
    }

    fn resume(&mut self) -> Result<()> {
        match &self.stream {
            Some(stream) => {
                stream.play()?;
                Ok(())
            }
            None => Err(Error::NotReady),
        }
    }

    fn audio_time(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.samples_elapsed.load(Ordering::Acquire) as f64 / self.sample_rate
    }

    fn schedule_click(&mut self, at: f64, accent: bool) -> Result<()> {
        let tx = self.commands.as_ref().ok_or(Error::NotReady)?;
        let start_sample = (at.max(0.0) * self.sample_rate).round() as u64;
        tx.send(ClickCommand::Click {
            start_sample,
            accent,
        })
        .map_err(|_| Error::AudioResource("audio callback is gone".into()))
    }

    fn cancel_pending(&mut self) {
        if let Some(tx) = &self.commands {
            let _ = tx.send(ClickCommand::CancelPending);
        }
    }

    fn release(&mut self) {
        self.stream = None;
        self.commands = None;
    }
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut state: CallbackState,
) -> Result<cpal::Stream>
where
    T: cpal::SizedSample + cpal::FromSample<f32>,
{
    let mut scratch: Vec<f32> = Vec::new();
    let stream = device.build_output_stream(
        config,
        move |data: &mut [T], _| {
            scratch.resize(data.len(), 0.0);
            state.render(&mut scratch);
            for (out, sample) in data.iter_mut().zip(scratch.iter()) {
                *out = T::from_sample(*sample);
            }
        },
        |err| tracing::error!("audio stream error: {err}"),
        None,
    )?;
    Ok(stream)
}
