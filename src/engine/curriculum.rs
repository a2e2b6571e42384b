use rand::Rng;
use tracing::info;

use crate::audio::morse::Symbol;
use crate::engine::reaction_stats::{ReactionStats, ReactionSummary, StatKey};

/// Koch introduction order: characters are unlocked strictly left to right.
pub const KOCH_ORDER: &str = "KMURESNAPTLWI.JZ=FOY,VG5/Q92H38B?47C1D60X";

pub const DEFAULT_UNLOCKED: usize = 5;

/// Share of the inter-character gap a learner may use to name a character.
const RECOGNITION_MARGIN: f64 = 0.85;
const MAX_ERROR_RATIO: f64 = 0.05;
const MIN_SAMPLES_TO_UNLOCK: usize = 25;
/// Above this many weak characters the pool doubles instead of growing by half.
const BROAD_WEAKNESS: usize = 3;

pub fn koch_order() -> Vec<Symbol> {
    KOCH_ORDER
        .chars()
        .filter_map(|c| Symbol::from_char(c).ok())
        .collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CurriculumState {
    pub unlocked_count: usize,
}

impl CurriculumState {
    /// Clamped to `1..=len(KOCH_ORDER)`.
    pub fn new(unlocked_count: usize) -> Self {
        Self {
            unlocked_count: unlocked_count.clamp(1, Self::total()),
        }
    }

    pub fn total() -> usize {
        KOCH_ORDER.chars().count()
    }

    pub fn is_complete(&self) -> bool {
        self.unlocked_count >= Self::total()
    }

    pub fn progress(&self) -> f64 {
        self.unlocked_count as f64 / Self::total() as f64
    }
}

impl Default for CurriculumState {
    fn default() -> Self {
        Self::new(DEFAULT_UNLOCKED)
    }
}

pub fn training_alphabet(state: &CurriculumState) -> Vec<Symbol> {
    koch_order()
        .into_iter()
        .take(state.unlocked_count)
        .collect()
}

pub fn target_recognition_time_ms(char_space_seconds: f64) -> u64 {
    (char_space_seconds * RECOGNITION_MARGIN * 1000.0).round().max(0.0) as u64
}

fn median(values: &mut [usize]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.sort_unstable();
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) as f64 / 2.0
    } else {
        values[mid] as f64
    }
}

/// Characters needing extra drilling. Accuracy problems (too few samples
/// relative to the rest, or too many mistakes) take precedence over slowness.
pub fn problematic(alphabet: &[Symbol], stats: &ReactionStats, target_ms: u64) -> Vec<Symbol> {
    let summaries: Vec<(Symbol, ReactionSummary)> = alphabet
        .iter()
        .map(|&s| (s, stats.summarize(StatKey::Symbol(s))))
        .collect();
    let mut counts: Vec<usize> = summaries.iter().map(|(_, s)| s.sample_count).collect();
    let median_count = median(&mut counts);

    let accuracy: Vec<Symbol> = summaries
        .iter()
        .filter(|(_, s)| (s.sample_count as f64) < median_count || s.error_ratio > MAX_ERROR_RATIO)
        .map(|&(sym, _)| sym)
        .collect();
    if !accuracy.is_empty() {
        return accuracy;
    }

    summaries
        .iter()
        .filter(|(_, s)| s.avg_latency > target_ms as f64)
        .map(|&(sym, _)| sym)
        .collect()
}

/// The whole alphabet once, followed by whole copies of the problematic
/// characters until at least `limit` extra entries have been added.
pub fn weighted_pool(alphabet: &[Symbol], stats: &ReactionStats, target_ms: u64) -> Vec<Symbol> {
    let mut pool = alphabet.to_vec();
    let weak = problematic(alphabet, stats, target_ms);
    if weak.is_empty() {
        return pool;
    }

    let limit = if weak.len() > BROAD_WEAKNESS {
        alphabet.len() as f64
    } else {
        (alphabet.len() as f64 / 2.0).max(1.0)
    };
    let mut appended = 0usize;
    while (appended as f64) < limit {
        pool.extend_from_slice(&weak);
        appended += weak.len();
    }
    pool
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub symbol: Symbol,
    pub pool: Vec<Symbol>,
}

/// Pick the next character to drill. `None` only for an empty alphabet.
pub fn select_next<R: Rng + ?Sized>(
    alphabet: &[Symbol],
    stats: &ReactionStats,
    target_ms: u64,
    rng: &mut R,
) -> Option<Selection> {
    let pool = weighted_pool(alphabet, stats, target_ms);
    if pool.is_empty() {
        return None;
    }
    let symbol = pool[rng.gen_range(0..pool.len())];
    Some(Selection { symbol, pool })
}

fn is_proficient(summary: &ReactionSummary, target_ms: u64) -> bool {
    summary.avg_latency <= target_ms as f64
        && summary.sample_count >= MIN_SAMPLES_TO_UNLOCK
        && summary.error_ratio <= MAX_ERROR_RATIO
}

/// Unlock the next Koch character once every trained character, and the
/// aggregate, is fast, accurate and well sampled. Never locks anything.
pub fn maybe_unlock(
    state: &mut CurriculumState,
    alphabet: &[Symbol],
    stats: &ReactionStats,
    target_ms: u64,
) -> Option<Symbol> {
    if state.is_complete() {
        return None;
    }
    let ready = alphabet
        .iter()
        .map(|&s| StatKey::Symbol(s))
        .chain(std::iter::once(StatKey::Aggregate))
        .all(|key| is_proficient(&stats.summarize(key), target_ms));
    if !ready {
        return None;
    }

    state.unlocked_count += 1;
    let unlocked = koch_order().get(state.unlocked_count - 1).copied();
    if let Some(symbol) = unlocked {
        info!(
            "Unlocked '{}' ({}/{})",
            symbol,
            state.unlocked_count,
            CurriculumState::total()
        );
    }
    unlocked
}

pub fn symbols_to_string(symbols: &[Symbol]) -> String {
    symbols.iter().map(|s| s.as_char()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    fn sym(c: char) -> Symbol {
        Symbol::from_char(c).unwrap()
    }

    fn kmure() -> Vec<Symbol> {
        "KMURE".chars().map(sym).collect()
    }

    fn trained(latency: u32, samples: usize) -> ReactionStats {
        let mut stats = ReactionStats::default();
        for s in kmure() {
            for _ in 0..samples {
                stats.record_correct(s, latency);
            }
        }
        stats
    }

    #[test]
    fn test_koch_order_is_fully_encodable() {
        assert_eq!(koch_order().len(), KOCH_ORDER.chars().count());
        assert_eq!(CurriculumState::total(), 41);
    }

    #[test]
    fn test_default_alphabet() {
        let state = CurriculumState::default();
        assert_eq!(symbols_to_string(&training_alphabet(&state)), "KMURE");
    }

    #[test]
    fn test_state_is_clamped() {
        assert_eq!(CurriculumState::new(0).unlocked_count, 1);
        assert_eq!(CurriculumState::new(500).unlocked_count, 41);
        assert!(CurriculumState::new(500).is_complete());
    }

    #[test]
    fn test_target_recognition_time() {
        assert_eq!(target_recognition_time_ms(0.7516), 639);
        assert_eq!(target_recognition_time_ms(0.0), 0);
    }

    #[test]
    fn test_fresh_stats_pool_is_alphabet() {
        let stats = ReactionStats::default();
        assert_eq!(weighted_pool(&kmure(), &stats, 120), kmure());
    }

    #[test]
    fn test_error_prone_character_is_repeated() {
        let mut stats = trained(100, 30);
        stats.record_mistake(sym('U'));
        stats.record_mistake(sym('U'));
        let pool = weighted_pool(&kmure(), &stats, 120);
        // limit is 2.5, so three single-character copies are appended
        assert_eq!(symbols_to_string(&pool), "KMUREUUU");
    }

    #[test]
    fn test_slow_character_is_repeated_when_accuracy_is_fine() {
        let mut stats = trained(100, 30);
        stats.load_reactions(StatKey::Symbol(sym('R')), vec![200; 30]);
        let pool = weighted_pool(&kmure(), &stats, 120);
        assert_eq!(symbols_to_string(&pool), "KMURERRR");
    }

    #[test]
    fn test_accuracy_problems_take_precedence_over_speed() {
        let mut stats = trained(100, 30);
        stats.load_reactions(StatKey::Symbol(sym('R')), vec![200; 30]);
        stats.record_mistake(sym('E'));
        stats.record_mistake(sym('E'));
        let weak = problematic(&kmure(), &stats, 120);
        assert_eq!(weak, vec![sym('E')]);
    }

    #[test]
    fn test_undersampled_characters_are_problematic() {
        let mut stats = trained(100, 30);
        stats.load_reactions(StatKey::Symbol(sym('M')), vec![100; 5]);
        assert_eq!(problematic(&kmure(), &stats, 120), vec![sym('M')]);
    }

    #[test]
    fn test_broad_weakness_doubles_pool() {
        let mut stats = trained(100, 30);
        for c in ['K', 'M', 'U', 'R'] {
            stats.record_mistake(sym(c));
            stats.record_mistake(sym(c));
        }
        let pool = weighted_pool(&kmure(), &stats, 120);
        // limit = 5; two copies of the four weak characters
        assert_eq!(symbols_to_string(&pool), "KMUREKMURKMUR");
    }

    #[test]
    fn test_select_next_is_deterministic_for_seed() {
        let mut stats = trained(100, 30);
        stats.record_mistake(sym('U'));
        let alphabet = kmure();

        let mut a = SmallRng::seed_from_u64(42);
        let mut b = SmallRng::seed_from_u64(42);
        for _ in 0..20 {
            let x = select_next(&alphabet, &stats, 120, &mut a).unwrap();
            let y = select_next(&alphabet, &stats, 120, &mut b).unwrap();
            assert_eq!(x, y);
            assert!(x.pool.contains(&x.symbol));
        }
    }

    #[test]
    fn test_select_next_favours_weak_characters() {
        let mut stats = trained(100, 30);
        stats.record_mistake(sym('U'));
        stats.record_mistake(sym('U'));
        let alphabet = kmure();
        let mut rng = SmallRng::seed_from_u64(7);
        let mut u_count = 0;
        for _ in 0..800 {
            if select_next(&alphabet, &stats, 120, &mut rng).unwrap().symbol == sym('U') {
                u_count += 1;
            }
        }
        // U fills half of an 8-entry pool
        assert!(u_count > 300, "U drawn {u_count} times");
    }

    #[test]
    fn test_select_next_empty_alphabet() {
        let stats = ReactionStats::default();
        let mut rng = SmallRng::seed_from_u64(1);
        assert!(select_next(&[], &stats, 120, &mut rng).is_none());
    }

    #[test]
    fn test_unlock_when_all_proficient() {
        let stats = trained(100, 30);
        let mut state = CurriculumState::default();
        let unlocked = maybe_unlock(&mut state, &kmure(), &stats, 120);
        assert_eq!(state.unlocked_count, 6);
        assert_eq!(unlocked, Some(sym('S')));
    }

    #[test]
    fn test_no_unlock_with_undersampled_character() {
        let mut stats = trained(100, 30);
        stats.load_reactions(StatKey::Symbol(sym('U')), vec![100; 10]);
        let mut state = CurriculumState::default();
        assert_eq!(maybe_unlock(&mut state, &kmure(), &stats, 120), None);
        assert_eq!(state.unlocked_count, 5);
    }

    #[test]
    fn test_no_unlock_when_slow_or_error_prone() {
        let mut state = CurriculumState::default();
        let slow = trained(150, 30);
        assert_eq!(maybe_unlock(&mut state, &kmure(), &slow, 120), None);

        let mut sloppy = trained(100, 30);
        for _ in 0..3 {
            sloppy.record_mistake(sym('K'));
        }
        assert_eq!(maybe_unlock(&mut state, &kmure(), &sloppy, 120), None);
        assert_eq!(state.unlocked_count, 5);
    }

    #[test]
    fn test_slow_aggregate_blocks_unlock() {
        let mut stats = trained(100, 30);
        stats.load_reactions(StatKey::Aggregate, vec![200; 50]);
        for s in kmure() {
            assert!(is_proficient(&stats.summarize(s.into()), 120));
        }
        let mut state = CurriculumState::default();
        assert_eq!(maybe_unlock(&mut state, &kmure(), &stats, 120), None);
        assert_eq!(state.unlocked_count, 5);
    }

    #[test]
    fn test_undersampled_aggregate_blocks_unlock() {
        let mut stats = trained(100, 30);
        stats.load_reactions(StatKey::Aggregate, vec![100; 10]);
        let mut state = CurriculumState::default();
        assert_eq!(maybe_unlock(&mut state, &kmure(), &stats, 120), None);

        stats.load_reactions(StatKey::Aggregate, vec![100; 25]);
        assert_eq!(maybe_unlock(&mut state, &kmure(), &stats, 120), Some(sym('S')));
    }

    #[test]
    fn test_no_unlock_past_end_of_order() {
        let mut state = CurriculumState::new(CurriculumState::total());
        let alphabet = training_alphabet(&state);
        let mut stats = ReactionStats::default();
        for &s in &alphabet {
            for _ in 0..30 {
                stats.record_correct(s, 50);
            }
        }
        assert_eq!(maybe_unlock(&mut state, &alphabet, &stats, 120), None);
        assert_eq!(state.unlocked_count, CurriculumState::total());
    }
}
