use anyhow::Result;
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::info;

use crate::audio::morse::MorseEncoder;
use crate::audio::playback::{Playback, SilentPlayback};
use crate::audio::synth::{AudioBuffer, ToneSynthesizer};
use crate::audio::timing::Timing;
use crate::config::Config;
use crate::session::trainer::{InputSource, StatusDisplay, Trainer};
use crate::store::json_store::JsonStore;
use crate::ui::theme::Theme;

const PHRASE_LEAD_SECS: f64 = 1.0;

pub struct App {
    pub config: Config,
    pub timing: Timing,
    pub synth: ToneSynthesizer,
    pub store: JsonStore,
    pub theme: Theme,
    pub trainer: Trainer<SmallRng>,
}

impl App {
    /// Fails fast when the speeds in `config` give negative spacing.
    pub fn new(config: Config, store: JsonStore) -> Result<Self> {
        let timing = config.timing()?;
        let synth = config.synthesizer();
        let progress = store.load_progress();
        let trainer = Trainer::new(
            &timing,
            &synth,
            &progress,
            SmallRng::from_entropy(),
            config.history_len,
        );
        info!(
            "Timing: dit {:.3}s, char space {:.3}s, word space {:.3}s",
            timing.dit_time, timing.char_space, timing.word_space
        );

        Ok(Self {
            config,
            timing,
            synth,
            store,
            theme: Theme::default(),
            trainer,
        })
    }

    pub fn with_theme(mut self, theme: Theme) -> Self {
        self.theme = theme;
        self
    }

    /// The sound device, or a paced silent stand-in when muted or built
    /// without audio support.
    pub fn open_playback(mute: bool) -> Result<Box<dyn Playback>> {
        if mute {
            return Ok(Box::new(SilentPlayback::paced()));
        }
        #[cfg(feature = "audio")]
        {
            Ok(Box::new(crate::audio::playback::CpalPlayback::open_default()?))
        }
        #[cfg(not(feature = "audio"))]
        {
            tracing::warn!("Built without audio support; playing silently");
            Ok(Box::new(SilentPlayback::paced()))
        }
    }

    pub fn render_phrase(&self, text: &str) -> AudioBuffer {
        let encoder = MorseEncoder::new(&self.timing, &self.synth);
        let lead = self.synth.silence(PHRASE_LEAD_SECS);
        AudioBuffer::concat(
            self.synth.format(),
            &[lead.clone(), encoder.compose_phrase(text), lead],
        )
    }

    pub fn play_phrase(&self, text: &str, playback: &mut dyn Playback) -> Result<()> {
        info!("Playing phrase {text:?}");
        playback.play(&self.render_phrase(text))?;
        Ok(())
    }

    pub fn run_session(
        &mut self,
        playback: &mut dyn Playback,
        input: &mut dyn InputSource,
        display: &mut dyn StatusDisplay,
    ) -> Result<()> {
        self.trainer.run(playback, input, display, &self.store)
    }
}
