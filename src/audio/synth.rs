use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// PCM sample encoding shared by synthesis and playback.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SampleFormat {
    /// 8-bit unsigned, silence at 128.
    U8,
    /// 16-bit signed little-endian, silence at 0.
    I16,
}

impl SampleFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "u8" => Some(SampleFormat::U8),
            "i16" => Some(SampleFormat::I16),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SampleFormat::U8 => "u8",
            SampleFormat::I16 => "i16",
        }
    }

    pub fn bytes_per_sample(self) -> usize {
        match self {
            SampleFormat::U8 => 1,
            SampleFormat::I16 => 2,
        }
    }

    pub fn bits_per_sample(self) -> u16 {
        self.bytes_per_sample() as u16 * 8
    }

    /// Mid-scale value emitted for silent intervals.
    pub fn silence(self) -> i32 {
        match self {
            SampleFormat::U8 => 128,
            SampleFormat::I16 => 0,
        }
    }

    pub fn amplitude(self) -> f64 {
        match self {
            SampleFormat::U8 => 127.0,
            SampleFormat::I16 => 32767.0,
        }
    }

    pub fn min_value(self) -> i32 {
        match self {
            SampleFormat::U8 => 0,
            SampleFormat::I16 => i16::MIN as i32,
        }
    }

    pub fn max_value(self) -> i32 {
        match self {
            SampleFormat::U8 => u8::MAX as i32,
            SampleFormat::I16 => i16::MAX as i32,
        }
    }

    fn encode(self, value: i32, out: &mut Vec<u8>) {
        let value = value.clamp(self.min_value(), self.max_value());
        match self {
            SampleFormat::U8 => out.push(value as u8),
            SampleFormat::I16 => out.extend_from_slice(&(value as i16).to_le_bytes()),
        }
    }

    fn decode(self, bytes: &[u8]) -> i32 {
        match self {
            SampleFormat::U8 => bytes[0] as i32,
            SampleFormat::I16 => i16::from_le_bytes([bytes[0], bytes[1]]) as i32,
        }
    }
}

/// What a playback device needs to interpret an [`AudioBuffer`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PcmFormat {
    pub sample_rate: u32,
    pub sample_format: SampleFormat,
    pub channels: u16,
}

impl PcmFormat {
    pub fn mono(sample_rate: u32, sample_format: SampleFormat) -> Self {
        Self {
            sample_rate,
            sample_format,
            channels: 1,
        }
    }
}

/// Encoded mono PCM. Buffers are never edited in place; composition builds
/// new buffers by concatenation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AudioBuffer {
    format: PcmFormat,
    data: Vec<u8>,
}

impl AudioBuffer {
    pub fn empty(format: PcmFormat) -> Self {
        Self {
            format,
            data: Vec::new(),
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Number of samples (not bytes).
    pub fn len(&self) -> usize {
        self.data.len() / self.format.sample_format.bytes_per_sample()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn duration_secs(&self) -> f64 {
        self.len() as f64 / self.format.sample_rate as f64
    }

    pub fn samples(&self) -> impl Iterator<Item = i32> + '_ {
        let fmt = self.format.sample_format;
        self.data
            .chunks_exact(fmt.bytes_per_sample())
            .map(move |chunk| fmt.decode(chunk))
    }

    /// Samples normalised to roughly [-1.0, 1.0] for float output devices.
    pub fn to_f32(&self) -> Vec<f32> {
        let fmt = self.format.sample_format;
        let silence = fmt.silence() as f32;
        let scale = (fmt.max_value() - fmt.silence() + 1) as f32;
        self.samples()
            .map(|s| (s as f32 - silence) / scale)
            .collect()
    }

    /// Concatenate `parts`, inserting `separator` between neighbours but not
    /// after the last one.
    pub fn join(format: PcmFormat, parts: &[AudioBuffer], separator: &AudioBuffer) -> Self {
        let total: usize = parts.iter().map(|p| p.data.len()).sum::<usize>()
            + separator.data.len() * parts.len().saturating_sub(1);
        let mut data = Vec::with_capacity(total);
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                data.extend_from_slice(&separator.data);
            }
            data.extend_from_slice(&part.data);
        }
        Self { format, data }
    }

    pub fn concat(format: PcmFormat, parts: &[AudioBuffer]) -> Self {
        Self::join(format, parts, &AudioBuffer::empty(format))
    }
}

/// Sine tone and silence generator for a fixed sample rate and encoding.
#[derive(Clone, Copy, Debug)]
pub struct ToneSynthesizer {
    format: PcmFormat,
}

impl ToneSynthesizer {
    pub fn new(sample_rate: u32, sample_format: SampleFormat) -> Self {
        Self {
            format: PcmFormat::mono(sample_rate, sample_format),
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn sample_count(&self, duration_seconds: f64) -> usize {
        (self.format.sample_rate as f64 * duration_seconds.max(0.0)).round() as usize
    }

    pub fn synthesize(&self, duration_seconds: f64, frequency_hz: f64, silent: bool) -> AudioBuffer {
        let fmt = self.format.sample_format;
        let rate = self.format.sample_rate as f64;
        let count = self.sample_count(duration_seconds);
        let mut data = Vec::with_capacity(count * fmt.bytes_per_sample());

        if silent || frequency_hz <= 0.0 {
            for _ in 0..count {
                fmt.encode(fmt.silence(), &mut data);
            }
        } else {
            // Angular step is pi * f / rate (not 2 * pi * f / rate); kept as the
            // trainer has always pitched its tone.
            let period = (rate / frequency_hz) / PI;
            let midscale = fmt.silence() as f64;
            for x in 0..count {
                let value = ((x as f64 / period).sin() * fmt.amplitude() + midscale).round();
                fmt.encode(value as i32, &mut data);
            }
        }

        AudioBuffer {
            format: self.format,
            data,
        }
    }

    pub fn tone(&self, duration_seconds: f64, frequency_hz: f64) -> AudioBuffer {
        self.synthesize(duration_seconds, frequency_hz, false)
    }

    pub fn silence(&self, duration_seconds: f64) -> AudioBuffer {
        self.synthesize(duration_seconds, 0.0, true)
    }
}
