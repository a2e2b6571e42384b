use std::time::Duration;

use tracing::debug;

use crate::audio::morse::Symbol;
use crate::engine::reaction_stats::{ReactionStats, should_discard};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Correct { latency_ms: u32 },
    Mistake { typed: char },
    /// Noise: recorded nowhere.
    Discarded,
}

impl Outcome {
    pub fn is_recorded(self) -> bool {
        !matches!(self, Outcome::Discarded)
    }
}

pub fn classify(expected: Symbol, typed: char, elapsed: Duration, target_ms: u64) -> Outcome {
    let elapsed_ms = elapsed.as_millis().min(u64::MAX as u128) as u64;
    if should_discard(typed, elapsed_ms, target_ms) {
        debug!("Discarding {typed:?} after {elapsed_ms}ms for '{expected}'");
        return Outcome::Discarded;
    }
    if typed.to_ascii_uppercase() == expected.as_char() {
        Outcome::Correct {
            latency_ms: elapsed_ms.min(u32::MAX as u64) as u32,
        }
    } else {
        Outcome::Mistake {
            typed: typed.to_ascii_uppercase(),
        }
    }
}

/// Mistakes are charged to the character that was played, not the one typed.
pub fn apply(outcome: Outcome, expected: Symbol, stats: &mut ReactionStats) {
    match outcome {
        Outcome::Correct { latency_ms } => stats.record_correct(expected, latency_ms),
        Outcome::Mistake { .. } => stats.record_mistake(expected),
        Outcome::Discarded => {}
    }
}
