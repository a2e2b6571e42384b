use std::collections::VecDeque;
use std::time::{Duration, Instant};

use anyhow::Result;
use rand::Rng;
use tracing::{info, warn};

use crate::audio::morse::{MorseEncoder, Symbol};
use crate::audio::playback::Playback;
use crate::audio::synth::{AudioBuffer, ToneSynthesizer};
use crate::audio::timing::Timing;
use crate::engine::curriculum::{
    self, CurriculumState, Selection, symbols_to_string, target_recognition_time_ms,
};
use crate::engine::reaction_stats::{ReactionStats, ReactionSummary, StatKey};
use crate::session::trial::{self, Outcome};
use crate::store::json_store::JsonStore;
use crate::store::schema::ProgressData;

/// One latency bar cell per this many milliseconds.
pub const BAR_UNIT_MS: u32 = 20;
const PRIMING_SECS: f64 = 1.0;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Response {
    Key(char),
    Exit,
}

/// Blocks until the learner presses a key or asks to leave.
pub trait InputSource {
    fn next_response(&mut self) -> Result<Response>;
}

pub trait StatusDisplay {
    fn show(&mut self, view: &SessionView) -> Result<()>;
}

/// Everything the screen shows, computed from session state.
#[derive(Clone, Debug, PartialEq)]
pub struct SessionView {
    pub target_ms: u64,
    pub last_symbol: Option<Symbol>,
    pub last_outcome: Option<Outcome>,
    pub latency_bar: String,
    pub history: String,
    pub by_latency: Vec<(Symbol, ReactionSummary)>,
    pub by_error_ratio: Vec<(Symbol, ReactionSummary)>,
    pub overall: ReactionSummary,
    pub alphabet: String,
    pub pool: String,
    pub unlocked_count: usize,
    pub total_symbols: usize,
    pub just_unlocked: Option<Symbol>,
}

impl SessionView {
    pub fn last_latency_ms(&self) -> Option<u32> {
        match self.last_outcome {
            Some(Outcome::Correct { latency_ms }) => Some(latency_ms),
            _ => None,
        }
    }
}

pub fn latency_bar(latency_ms: u32) -> String {
    "\u{2588}".repeat((latency_ms / BAR_UNIT_MS) as usize)
}

pub struct Trainer<R: Rng> {
    encoder: MorseEncoder,
    priming: AudioBuffer,
    target_ms: u64,
    state: CurriculumState,
    stats: ReactionStats,
    rng: R,
    history: VecDeque<char>,
    history_len: usize,
    pool: Vec<Symbol>,
    last_symbol: Option<Symbol>,
    last_outcome: Option<Outcome>,
    just_unlocked: Option<Symbol>,
}

impl<R: Rng> Trainer<R> {
    pub fn new(
        timing: &Timing,
        synth: &ToneSynthesizer,
        progress: &ProgressData,
        rng: R,
        history_len: usize,
    ) -> Self {
        let (state, stats) = progress.to_session();
        Self {
            encoder: MorseEncoder::new(timing, synth),
            priming: synth.silence(PRIMING_SECS),
            target_ms: target_recognition_time_ms(timing.char_space),
            state,
            stats,
            rng,
            history: VecDeque::with_capacity(history_len),
            history_len: history_len.max(1),
            pool: Vec::new(),
            last_symbol: None,
            last_outcome: None,
            just_unlocked: None,
        }
    }

    pub fn target_ms(&self) -> u64 {
        self.target_ms
    }

    pub fn state(&self) -> &CurriculumState {
        &self.state
    }

    pub fn stats(&self) -> &ReactionStats {
        &self.stats
    }

    pub fn alphabet(&self) -> Vec<Symbol> {
        curriculum::training_alphabet(&self.state)
    }

    pub fn next_trial(&mut self) -> Option<Selection> {
        let selection =
            curriculum::select_next(&self.alphabet(), &self.stats, self.target_ms, &mut self.rng)?;
        self.pool = selection.pool.clone();
        Some(selection)
    }

    /// Classify a response to `expected`, update the windows and re-check
    /// progression.
    pub fn record(&mut self, expected: Symbol, typed: char, elapsed: Duration) -> Outcome {
        let outcome = trial::classify(expected, typed, elapsed, self.target_ms);
        self.just_unlocked = None;
        if !outcome.is_recorded() {
            return outcome;
        }

        trial::apply(outcome, expected, &mut self.stats);
        self.history.push_back(typed.to_ascii_uppercase());
        while self.history.len() > self.history_len {
            self.history.pop_front();
        }
        self.last_symbol = Some(expected);
        self.last_outcome = Some(outcome);

        let alphabet = self.alphabet();
        self.just_unlocked =
            curriculum::maybe_unlock(&mut self.state, &alphabet, &self.stats, self.target_ms);
        outcome
    }

    pub fn view(&self) -> SessionView {
        let alphabet = self.alphabet();
        let latency_ms = match self.last_outcome {
            Some(Outcome::Correct { latency_ms }) => latency_ms,
            _ => 0,
        };
        SessionView {
            target_ms: self.target_ms,
            last_symbol: self.last_symbol,
            last_outcome: self.last_outcome,
            latency_bar: latency_bar(latency_ms),
            history: self.history.iter().collect(),
            by_latency: self.stats.ranked_by_latency(&alphabet),
            by_error_ratio: self.stats.ranked_by_error_ratio(&alphabet),
            overall: self.stats.summarize(StatKey::Aggregate),
            alphabet: symbols_to_string(&alphabet),
            pool: symbols_to_string(&self.pool),
            unlocked_count: self.state.unlocked_count,
            total_symbols: CurriculumState::total(),
            just_unlocked: self.just_unlocked,
        }
    }

    pub fn progress(&self) -> ProgressData {
        ProgressData::from_session(&self.state, &self.stats)
    }

    /// Play, listen, score, repeat until the input source says exit, then
    /// persist progress. Playback failures end the session immediately
    /// without saving; display or input failures save what was recorded
    /// before returning the error.
    pub fn run<P, I, D>(
        &mut self,
        playback: &mut P,
        input: &mut I,
        display: &mut D,
        store: &JsonStore,
    ) -> Result<()>
    where
        P: Playback + ?Sized,
        I: InputSource + ?Sized,
        D: StatusDisplay + ?Sized,
    {
        info!(
            "Session started: alphabet {}, target {}ms",
            symbols_to_string(&self.alphabet()),
            self.target_ms
        );
        playback.play(&self.priming)?;

        let mut trials = 0usize;
        let ended: Result<()> = loop {
            let Some(selection) = self.next_trial() else {
                break Ok(());
            };
            if let Err(e) = display.show(&self.view()) {
                break Err(e);
            }
            playback.play(&self.encoder.compose_symbol(selection.symbol))?;
            let started = Instant::now();

            match input.next_response() {
                Ok(Response::Exit) => break Ok(()),
                Ok(Response::Key(typed)) => {
                    self.record(selection.symbol, typed, started.elapsed());
                    trials += 1;
                }
                Err(e) => break Err(e),
            }
        };

        if let Err(e) = ended {
            if let Err(save_err) = store.save_progress(&self.progress()) {
                warn!("Could not save progress after session error: {save_err:#}");
            }
            return Err(e);
        }

        store.save_progress(&self.progress())?;
        info!(
            "Session ended after {trials} responses, {} characters unlocked",
            self.state.unlocked_count
        );
        playback.play(&self.priming)?;
        Ok(())
    }
}
