//! # Tone Playback Module
//!
//! Plays a sine tone at a requested frequency and SPL so the user can hear a
//! point on the chart. Playback is an owned [`ToneSession`]: it opens the
//! default output device on `start`, glides to new settings on `update`, fades
//! out on `stop`, and releases the device when dropped.
//!
//! ## Signal chain
//! Oscillator -> smoothed gain -> peak limiter -> every output channel.
//!
//! The synthesis itself lives in [`ToneVoice`], which has no device dependency
//! and runs inside the audio callback.

use anyhow::{anyhow, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SupportedStreamConfigRange;
use crossbeam_channel::{Receiver, Sender, TrySendError};

use crate::error::{check_finite, check_frequency};

/// SPL that maps to a digital gain of 1.0 (0 dBFS). Leaves headroom for the
/// 120-130 dB peaks in the bass while keeping 60 dB audible.
pub const REFERENCE_DB_SPL: f64 = 110.0;

/// Hard cap on the linear gain sent to the limiter.
pub const MAX_GAIN: f32 = 1.5;

/// Time constant for frequency and gain glides after an update, in seconds.
pub const UPDATE_TIME_CONSTANT: f32 = 0.05;

/// Time constant for the fade to silence on stop, in seconds.
pub const STOP_TIME_CONSTANT: f32 = 0.1;

const LIMITER_THRESHOLD_DB: f32 = -1.0;
const LIMITER_RATIO: f32 = 12.0;
const LIMITER_ATTACK: f32 = 0.003;
const LIMITER_RELEASE: f32 = 0.25;

/// Preferred output sample rate.
const TARGET_SAMPLE_RATE: u32 = 48000;

/// Converts an SPL to the linear amplitude of the synthesized tone.
///
/// Follows the usual 20 dB per decade of amplitude, anchored so that
/// [`REFERENCE_DB_SPL`] is full scale, and capped at [`MAX_GAIN`].
pub fn tone_gain(decibel_level: f64) -> f32 {
    let gain = 10f64.powf((decibel_level - REFERENCE_DB_SPL) / 20.0) as f32;
    gain.min(MAX_GAIN)
}

/// A parameter update for the audio callback.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ToneCommand {
    /// Glide to a new frequency (Hz) and linear gain.
    Update { frequency: f32, gain: f32 },
    /// Fade to silence, keeping the oscillator running.
    Stop,
}

/// Exponential approach to a target value, one step per sample.
#[derive(Debug, Clone)]
struct Smoother {
    value: f32,
    target: f32,
    coeff: f32,
}

impl Smoother {
    fn new(value: f32) -> Self {
        Self {
            value,
            target: value,
            coeff: 1.0,
        }
    }

    fn set_target(&mut self, target: f32, time_constant: f32, sample_rate: f32) {
        self.target = target;
        self.coeff = 1.0 - (-1.0 / (time_constant * sample_rate)).exp();
    }

    fn next(&mut self) -> f32 {
        self.value += (self.target - self.value) * self.coeff;
        self.value
    }
}

/// Peak limiter with a fast attack, applied after the gain stage.
#[derive(Debug, Clone)]
struct Limiter {
    envelope: f32,
    attack: f32,
    release: f32,
}

impl Limiter {
    fn new(sample_rate: f32) -> Self {
        Self {
            envelope: 0.0,
            attack: 1.0 - (-1.0 / (LIMITER_ATTACK * sample_rate)).exp(),
            release: 1.0 - (-1.0 / (LIMITER_RELEASE * sample_rate)).exp(),
        }
    }

    fn process(&mut self, sample: f32) -> f32 {
        let level = sample.abs();
        let coeff = if level > self.envelope { self.attack } else { self.release };
        self.envelope += (level - self.envelope) * coeff;

        let envelope_db = 20.0 * self.envelope.max(1e-9).log10();
        if envelope_db <= LIMITER_THRESHOLD_DB {
            return sample;
        }
        let limited_db = LIMITER_THRESHOLD_DB + (envelope_db - LIMITER_THRESHOLD_DB) / LIMITER_RATIO;
        sample * 10f32.powf((limited_db - envelope_db) / 20.0)
    }
}

/// The sine generator rendered by the audio callback.
#[derive(Debug, Clone)]
pub struct ToneVoice {
    sample_rate: f32,
    phase: f32,
    frequency: Smoother,
    gain: Smoother,
    limiter: Limiter,
}

impl ToneVoice {
    /// Creates a silent voice tuned to `frequency`.
    pub fn new(sample_rate: u32, frequency: f32) -> Self {
        let sample_rate = sample_rate as f32;
        Self {
            sample_rate,
            phase: 0.0,
            frequency: Smoother::new(frequency),
            gain: Smoother::new(0.0),
            limiter: Limiter::new(sample_rate),
        }
    }

    pub fn apply(&mut self, command: ToneCommand) {
        match command {
            ToneCommand::Update { frequency, gain } => {
                self.frequency
                    .set_target(frequency, UPDATE_TIME_CONSTANT, self.sample_rate);
                self.gain.set_target(gain, UPDATE_TIME_CONSTANT, self.sample_rate);
            }
            ToneCommand::Stop => {
                self.gain.set_target(0.0, STOP_TIME_CONSTANT, self.sample_rate);
            }
        }
    }

    /// Renders one mono sample.
    pub fn next_sample(&mut self) -> f32 {
        let frequency = self.frequency.next();
        let gain = self.gain.next();
        let sample = (self.phase * std::f32::consts::TAU).sin() * gain;
        self.phase = (self.phase + frequency / self.sample_rate).fract();
        self.limiter.process(sample)
    }

    /// Fills an interleaved buffer, writing the same sample to every channel.
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        for frame in buffer.chunks_mut(channels.max(1)) {
            let sample = self.next_sample();
            frame.fill(sample);
        }
    }

    pub fn current_frequency(&self) -> f32 {
        self.frequency.value
    }

    pub fn current_gain(&self) -> f32 {
        self.gain.value
    }
}

/// An open output stream playing a single tone.
///
/// The stream stays open until the session is dropped; `stop` only fades the
/// tone out, and a later `update` brings it back.
pub struct ToneSession {
    _stream: cpal::Stream,
    commands: Sender<ToneCommand>,
    sample_rate: u32,
}

impl ToneSession {
    /// Opens the default output device and fades in a tone.
    ///
    /// # Arguments
    /// * `frequency` - Tone frequency in Hz
    /// * `decibel_level` - Target SPL, mapped through [`tone_gain`]
    ///
    /// # Returns
    /// * `Ok(session)` - Playing session
    /// * `Err(e)` - No output device, no usable f32 format, or stream failure
    pub fn start(frequency: f64, decibel_level: f64) -> Result<Self> {
        let command = update_command(frequency, decibel_level)?;

        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow!("No output device available"))?;
        log::info!("Using audio output device: {}", device.name()?);

        let configs = device.supported_output_configs()?.collect::<Vec<_>>();
        let supported_config = find_supported_config(configs, TARGET_SAMPLE_RATE)
            .ok_or_else(|| anyhow!("No suitable f32 output format found"))?;
        let sample_rate = clamp_sample_rate(&supported_config, TARGET_SAMPLE_RATE);
        let config: cpal::StreamConfig = supported_config
            .with_sample_rate(cpal::SampleRate(sample_rate))
            .into();
        let channels = config.channels as usize;
        log::info!("Tone output: {} Hz, {} channel(s)", sample_rate, channels);

        let (commands, receiver) = crossbeam_channel::bounded(64);
        let mut voice = ToneVoice::new(sample_rate, frequency as f32);
        voice.apply(command);

        let stream = device
            .build_output_stream(
                &config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    drain_commands(&receiver, &mut voice);
                    voice.render(data, channels);
                },
                |err| log::error!("An error occurred on the output stream: {}", err),
                None,
            )
            .context("failed to open output stream")?;
        stream.play().context("failed to start output stream")?;

        Ok(Self {
            _stream: stream,
            commands,
            sample_rate,
        })
    }

    /// Glides the tone to a new frequency and SPL.
    pub fn update(&self, frequency: f64, decibel_level: f64) -> Result<()> {
        let command = update_command(frequency, decibel_level)?;
        self.send(command);
        Ok(())
    }

    /// Fades the tone to silence.
    pub fn stop(&self) {
        self.send(ToneCommand::Stop);
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn send(&self, command: ToneCommand) {
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => log::warn!("Tone command queue full, dropping {:?}", command),
            Err(TrySendError::Disconnected(_)) => log::warn!("Tone stream is gone, dropping {:?}", command),
        }
    }
}

fn update_command(frequency: f64, decibel_level: f64) -> Result<ToneCommand> {
    let frequency = check_frequency(frequency)?;
    let decibel_level = check_finite("decibel level", decibel_level)?;
    Ok(ToneCommand::Update {
        frequency: frequency as f32,
        gain: tone_gain(decibel_level),
    })
}

fn drain_commands(receiver: &Receiver<ToneCommand>, voice: &mut ToneVoice) {
    while let Ok(command) = receiver.try_recv() {
        voice.apply(command);
    }
}

/// Picks the f32 output configuration whose rate range lies closest to `target_rate`.
fn find_supported_config(
    configs: Vec<SupportedStreamConfigRange>,
    target_rate: u32,
) -> Option<SupportedStreamConfigRange> {
    configs
        .into_iter()
        .filter(|c| c.sample_format() == cpal::SampleFormat::F32)
        .min_by_key(|c| {
            let rate = clamp_sample_rate(c, target_rate);
            ((rate as i64 - target_rate as i64).abs(), c.channels())
        })
}

fn clamp_sample_rate(config: &SupportedStreamConfigRange, target_rate: u32) -> u32 {
    target_rate.clamp(config.min_sample_rate().0, config.max_sample_rate().0)
}
