use std::cmp::Ordering;
use std::collections::VecDeque;
use std::fmt;

use crate::audio::morse::Symbol;

/// Most recent responses kept per window.
pub const WINDOW_CAPACITY: usize = 50;

/// Responses slower than this multiple of the target time are treated as noise.
pub const DISCARD_FACTOR: u64 = 5;

/// Key under which the all-characters latency window is persisted.
pub const AGGREGATE_LABEL: &str = "*";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatKey {
    Symbol(Symbol),
    /// Latency over every character, regardless of which was played.
    Aggregate,
}

impl StatKey {
    fn slot(self) -> usize {
        match self {
            StatKey::Symbol(s) => s.index(),
            StatKey::Aggregate => Symbol::COUNT,
        }
    }
}

impl fmt::Display for StatKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatKey::Symbol(s) => write!(f, "{s}"),
            StatKey::Aggregate => f.write_str(AGGREGATE_LABEL),
        }
    }
}

impl From<Symbol> for StatKey {
    fn from(symbol: Symbol) -> Self {
        StatKey::Symbol(symbol)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ReactionSummary {
    pub avg_latency: f64,
    pub sample_count: usize,
    pub error_ratio: f64,
}

/// True when a response should leave every window untouched: an accidental
/// space, or an answer so late the learner was clearly not listening.
pub fn should_discard(raw: char, elapsed_ms: u64, target_ms: u64) -> bool {
    raw == ' ' || elapsed_ms > DISCARD_FACTOR * target_ms
}

fn push_bounded<T>(window: &mut VecDeque<T>, value: T) {
    window.push_back(value);
    while window.len() > WINDOW_CAPACITY {
        window.pop_front();
    }
}

/// Rolling latency and mistake windows, one slot per table symbol plus the
/// aggregate slot. The aggregate mistake window is never written.
#[derive(Clone, Debug, PartialEq)]
pub struct ReactionStats {
    reactions: Vec<VecDeque<u32>>,
    mistakes: Vec<VecDeque<u8>>,
}

impl Default for ReactionStats {
    fn default() -> Self {
        Self {
            reactions: vec![VecDeque::new(); Symbol::COUNT + 1],
            mistakes: vec![VecDeque::new(); Symbol::COUNT + 1],
        }
    }
}

impl ReactionStats {
    pub fn record_correct(&mut self, symbol: Symbol, latency_ms: u32) {
        push_bounded(&mut self.reactions[symbol.index()], latency_ms);
        push_bounded(&mut self.reactions[StatKey::Aggregate.slot()], latency_ms);
        push_bounded(&mut self.mistakes[symbol.index()], 0);
    }

    pub fn record_mistake(&mut self, symbol: Symbol) {
        push_bounded(&mut self.mistakes[symbol.index()], 1);
    }

    pub fn reaction_window(&self, key: StatKey) -> &VecDeque<u32> {
        &self.reactions[key.slot()]
    }

    pub fn mistake_window(&self, key: StatKey) -> &VecDeque<u8> {
        &self.mistakes[key.slot()]
    }

    /// Replace a latency window with `values`, keeping only the newest entries.
    pub fn load_reactions(&mut self, key: StatKey, values: impl IntoIterator<Item = u32>) {
        let window = &mut self.reactions[key.slot()];
        window.clear();
        for v in values {
            push_bounded(window, v);
        }
    }

    /// Replace a mistake window; any non-zero value counts as a mistake.
    pub fn load_mistakes(&mut self, symbol: Symbol, values: impl IntoIterator<Item = u8>) {
        let window = &mut self.mistakes[symbol.index()];
        window.clear();
        for v in values {
            push_bounded(window, u8::from(v != 0));
        }
    }

    pub fn summarize(&self, key: StatKey) -> ReactionSummary {
        let reactions = self.reaction_window(key);
        let mistakes = self.mistake_window(key);

        let avg_latency = if reactions.is_empty() {
            0.0
        } else {
            reactions.iter().map(|&v| v as f64).sum::<f64>() / reactions.len() as f64
        };
        let error_ratio = if mistakes.is_empty() {
            0.0
        } else {
            mistakes.iter().map(|&v| v as f64).sum::<f64>() / mistakes.len() as f64
        };

        ReactionSummary {
            avg_latency,
            sample_count: reactions.len(),
            error_ratio,
        }
    }

    /// Slowest first.
    pub fn ranked_by_latency(&self, symbols: &[Symbol]) -> Vec<(Symbol, ReactionSummary)> {
        let mut rows = self.rows(symbols);
        rows.sort_by(|a, b| {
            b.1.avg_latency
                .partial_cmp(&a.1.avg_latency)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }

    /// Most error-prone first.
    pub fn ranked_by_error_ratio(&self, symbols: &[Symbol]) -> Vec<(Symbol, ReactionSummary)> {
        let mut rows = self.rows(symbols);
        rows.sort_by(|a, b| {
            b.1.error_ratio
                .partial_cmp(&a.1.error_ratio)
                .unwrap_or(Ordering::Equal)
        });
        rows
    }

    fn rows(&self, symbols: &[Symbol]) -> Vec<(Symbol, ReactionSummary)> {
        symbols
            .iter()
            .map(|&s| (s, self.summarize(StatKey::Symbol(s))))
            .collect()
    }
}
