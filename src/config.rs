use std::fs;
use std::path::PathBuf;

use anyhow::Result;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::audio::synth::{SampleFormat, ToneSynthesizer};
use crate::audio::timing::{ConfigurationError, Timing};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_frequency_hz")]
    pub frequency_hz: f64,
    #[serde(default = "default_char_wpm")]
    pub char_wpm: f64,
    #[serde(default = "default_farnsworth_wpm")]
    pub farnsworth_wpm: f64,
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default = "default_sample_format")]
    pub sample_format: String,
    #[serde(default = "default_history_len")]
    pub history_len: usize,
}

fn default_frequency_hz() -> f64 {
    600.0
}
fn default_char_wpm() -> f64 {
    30.0
}
fn default_farnsworth_wpm() -> f64 {
    8.0
}
fn default_sample_rate() -> u32 {
    8000
}
fn default_sample_format() -> String {
    "u8".to_string()
}
fn default_history_len() -> usize {
    40
}

impl Default for Config {
    fn default() -> Self {
        Self {
            frequency_hz: default_frequency_hz(),
            char_wpm: default_char_wpm(),
            farnsworth_wpm: default_farnsworth_wpm(),
            sample_rate: default_sample_rate(),
            sample_format: default_sample_format(),
            history_len: default_history_len(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path();
        if path.exists() {
            let content = fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)?;
            info!("Loaded config from {}", path.display());
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        fs::write(&path, content)?;
        Ok(())
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kochr")
            .join("config.toml")
    }

    /// Pull values back into workable ranges. Speed relationships are left
    /// alone so `timing()` can report them.
    pub fn validate(&mut self) {
        self.frequency_hz = self.frequency_hz.clamp(100.0, 2000.0);
        self.char_wpm = self.char_wpm.clamp(5.0, 60.0);
        self.farnsworth_wpm = self.farnsworth_wpm.clamp(1.0, 60.0);
        self.sample_rate = self.sample_rate.clamp(4000, 96000);
        self.history_len = self.history_len.clamp(1, 200);
        if SampleFormat::from_name(&self.sample_format).is_none() {
            warn!(
                "Unknown sample format {:?}, using {}",
                self.sample_format,
                default_sample_format()
            );
            self.sample_format = default_sample_format();
        }
    }

    pub fn sample_format(&self) -> SampleFormat {
        SampleFormat::from_name(&self.sample_format).unwrap_or(SampleFormat::U8)
    }

    pub fn timing(&self) -> Result<Timing, ConfigurationError> {
        Timing::new(self.frequency_hz, self.char_wpm, self.farnsworth_wpm)
    }

    pub fn synthesizer(&self) -> ToneSynthesizer {
        ToneSynthesizer::new(self.sample_rate, self.sample_format())
    }
}
