use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::thread;
use std::time::Duration;

use thiserror::Error;

use crate::audio::synth::AudioBuffer;

#[derive(Debug, Error)]
pub enum PlaybackError {
    #[error("no audio output device available")]
    NoDevice,
    #[error("audio device error: {0}")]
    Device(String),
    #[error("unsupported device sample format: {0}")]
    UnsupportedFormat(String),
    #[error("playback did not finish within {0:?}")]
    Timeout(Duration),
}

/// Output side of a session. `play` returns once the whole buffer has been
/// handed to the device. Implementations keep the device open between calls.
pub trait Playback {
    fn play(&mut self, buffer: &AudioBuffer) -> Result<(), PlaybackError>;
}

/// Plays nothing. When paced it sleeps for the buffer's duration so the
/// session keeps its real rhythm.
#[derive(Clone, Copy, Debug, Default)]
pub struct SilentPlayback {
    paced: bool,
}

impl SilentPlayback {
    pub fn paced() -> Self {
        Self { paced: true }
    }

    pub fn instant() -> Self {
        Self { paced: false }
    }
}

impl Playback for SilentPlayback {
    fn play(&mut self, buffer: &AudioBuffer) -> Result<(), PlaybackError> {
        if self.paced && !buffer.is_empty() {
            thread::sleep(Duration::from_secs_f64(buffer.duration_secs()));
        }
        Ok(())
    }
}

/// Nearest-sample rate conversion; the trainer's tones are narrowband so this
/// is adequate for pitch and timing.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Vec<f32> {
    if from_rate == to_rate || samples.is_empty() || from_rate == 0 {
        return samples.to_vec();
    }
    let out_len = (samples.len() as u64 * to_rate as u64 / from_rate as u64) as usize;
    (0..out_len)
        .map(|i| {
            let src = (i as u64 * from_rate as u64 / to_rate as u64) as usize;
            samples[src.min(samples.len() - 1)]
        })
        .collect()
}

/// Sample FIFO shared between `play` and a device callback. The callback
/// drains it and wakes the waiting player once it runs dry.
#[derive(Debug, Default)]
#[cfg_attr(not(feature = "audio"), allow(dead_code))]
pub struct SampleQueue {
    samples: Mutex<VecDeque<f32>>,
    drained: Condvar,
}

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
impl SampleQueue {
    pub fn pending(&self) -> usize {
        self.samples.lock().map(|s| s.len()).unwrap_or(0)
    }

    /// Write one queued sample per frame, duplicated across channels, padding
    /// with silence once the queue is empty.
    pub fn fill<T: Copy>(&self, out: &mut [T], channels: usize, convert: impl Fn(f32) -> T) {
        let silence = convert(0.0);
        let Ok(mut samples) = self.samples.lock() else {
            out.fill(silence);
            return;
        };
        for frame in out.chunks_mut(channels.max(1)) {
            let value = samples.pop_front().map(&convert).unwrap_or(silence);
            frame.fill(value);
        }
        if samples.is_empty() {
            self.drained.notify_all();
        }
    }

    /// Queue `new` and block until the consumer has taken all of it. On
    /// timeout whatever is left is dropped.
    pub fn play_through(&self, new: Vec<f32>, limit: Duration) -> Result<(), PlaybackError> {
        let mut samples = self.samples.lock().map_err(|_| poisoned())?;
        samples.extend(new);
        let (mut samples, wait) = self
            .drained
            .wait_timeout_while(samples, limit, |s| !s.is_empty())
            .map_err(|_| poisoned())?;
        if wait.timed_out() {
            samples.clear();
            return Err(PlaybackError::Timeout(limit));
        }
        Ok(())
    }
}

#[cfg_attr(not(feature = "audio"), allow(dead_code))]
fn poisoned() -> PlaybackError {
    PlaybackError::Device("sample queue lock poisoned".into())
}

#[cfg(feature = "audio")]
pub use device::CpalPlayback;

#[cfg(feature = "audio")]
mod device {
    use std::sync::Arc;
    use std::time::Duration;

    use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
    use cpal::{FromSample, Sample, SizedSample};
    use tracing::{info, warn};

    use super::{Playback, PlaybackError, SampleQueue, resample};
    use crate::audio::synth::AudioBuffer;

    const TIMEOUT_SLACK: Duration = Duration::from_secs(2);

    /// Default output device via cpal. One stream stays open for the life of
    /// the value and is fed through a shared queue, so silence written ahead
    /// of the first character keeps the device awake.
    pub struct CpalPlayback {
        _stream: cpal::Stream,
        queue: Arc<SampleQueue>,
        out_rate: u32,
    }

    impl CpalPlayback {
        pub fn open_default() -> Result<Self, PlaybackError> {
            let host = cpal::default_host();
            let device = host.default_output_device().ok_or(PlaybackError::NoDevice)?;
            let config = device
                .default_output_config()
                .map_err(|e| PlaybackError::Device(e.to_string()))?;
            info!(
                "Audio playback: using device '{}' ({}Hz, {} ch, {:?})",
                device.name().unwrap_or_else(|_| "unknown".into()),
                config.sample_rate().0,
                config.channels(),
                config.sample_format()
            );

            let queue = Arc::new(SampleQueue::default());
            let stream = match config.sample_format() {
                cpal::SampleFormat::F32 => build_stream::<f32>(&device, &config, queue.clone())?,
                cpal::SampleFormat::I16 => build_stream::<i16>(&device, &config, queue.clone())?,
                cpal::SampleFormat::U16 => build_stream::<u16>(&device, &config, queue.clone())?,
                cpal::SampleFormat::U8 => build_stream::<u8>(&device, &config, queue.clone())?,
                other => return Err(PlaybackError::UnsupportedFormat(format!("{other:?}"))),
            };
            stream
                .play()
                .map_err(|e| PlaybackError::Device(e.to_string()))?;

            Ok(Self {
                _stream: stream,
                queue,
                out_rate: config.sample_rate().0,
            })
        }
    }

    fn build_stream<T>(
        device: &cpal::Device,
        config: &cpal::SupportedStreamConfig,
        queue: Arc<SampleQueue>,
    ) -> Result<cpal::Stream, PlaybackError>
    where
        T: SizedSample + FromSample<f32>,
    {
        let config: cpal::StreamConfig = config.clone().into();
        let channels = config.channels.max(1) as usize;
        device
            .build_output_stream(
                &config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    queue.fill(data, channels, |v| T::from_sample(v));
                },
                |err| warn!("Audio output stream error: {}", err),
                None,
            )
            .map_err(|e| PlaybackError::Device(e.to_string()))
    }

    impl Playback for CpalPlayback {
        fn play(&mut self, buffer: &AudioBuffer) -> Result<(), PlaybackError> {
            if buffer.is_empty() {
                return Ok(());
            }
            let samples = resample(&buffer.to_f32(), buffer.format().sample_rate, self.out_rate);
            let limit = Duration::from_secs_f64(buffer.duration_secs()) + TIMEOUT_SLACK;
            self.queue.play_through(samples, limit)
        }
    }
}
