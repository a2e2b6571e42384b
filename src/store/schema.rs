use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::audio::morse::Symbol;
use crate::engine::curriculum::{CurriculumState, DEFAULT_UNLOCKED};
use crate::engine::reaction_stats::{AGGREGATE_LABEL, ReactionStats, StatKey};

const SCHEMA_VERSION: u32 = 1;

fn default_schema_version() -> u32 {
    SCHEMA_VERSION
}

fn default_unlocked_count() -> usize {
    DEFAULT_UNLOCKED
}

/// On-disk learner progress. Windows are keyed by the character itself, with
/// `"*"` holding the aggregate latency window.
///
/// Every field is read leniently: a bad value only costs that value, so one
/// stray entry cannot reset the rest of the learner's progress.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProgressData {
    #[serde(default = "default_schema_version", deserialize_with = "lenient_schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_unlocked_count", deserialize_with = "lenient_unlocked_count")]
    pub unlocked_count: usize,
    #[serde(default, deserialize_with = "lenient_reactions")]
    pub reactions: BTreeMap<String, Vec<u32>>,
    #[serde(default, deserialize_with = "lenient_mistakes")]
    pub mistakes: BTreeMap<String, Vec<u8>>,
    #[serde(default, deserialize_with = "lenient_saved_at")]
    pub saved_at: Option<DateTime<Utc>>,
}

/// Non-negative whole number; fractional values are rounded.
fn as_count(value: &Value) -> Option<u64> {
    if let Some(n) = value.as_u64() {
        return Some(n);
    }
    value
        .as_f64()
        .filter(|f| f.is_finite() && *f >= 0.0)
        .map(|f| f.round() as u64)
}

fn lenient_schema_version<'de, D: Deserializer<'de>>(d: D) -> Result<u32, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(as_count(&value)
        .and_then(|n| u32::try_from(n).ok())
        .unwrap_or_else(|| {
            warn!("Ignoring malformed schema_version {value}");
            SCHEMA_VERSION
        }))
}

fn lenient_unlocked_count<'de, D: Deserializer<'de>>(d: D) -> Result<usize, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(as_count(&value)
        .and_then(|n| usize::try_from(n).ok())
        .unwrap_or_else(|| {
            warn!("Ignoring malformed unlocked_count {value}");
            DEFAULT_UNLOCKED
        }))
}

fn lenient_saved_at<'de, D: Deserializer<'de>>(d: D) -> Result<Option<DateTime<Utc>>, D::Error> {
    let value = Value::deserialize(d)?;
    if value.is_null() {
        return Ok(None);
    }
    let parsed = serde_json::from_value(value.clone()).ok();
    if parsed.is_none() {
        warn!("Ignoring malformed saved_at {value}");
    }
    Ok(parsed)
}

/// Read a map of windows, keeping every entry `convert` accepts and dropping
/// the rest with a warning.
fn lenient_windows<T>(
    field: &str,
    value: Value,
    convert: impl Fn(&Value) -> Option<T>,
) -> BTreeMap<String, Vec<T>> {
    let Value::Object(entries) = value else {
        if !value.is_null() {
            warn!("Ignoring malformed {field} table {value}");
        }
        return BTreeMap::new();
    };
    entries
        .into_iter()
        .filter_map(|(label, window)| {
            let Value::Array(items) = window else {
                warn!("Ignoring malformed {field} window for {label:?}");
                return None;
            };
            let kept: Vec<T> = items.iter().filter_map(&convert).collect();
            if kept.len() < items.len() {
                warn!(
                    "Dropped {} malformed {field} entries for {label:?}",
                    items.len() - kept.len()
                );
            }
            Some((label, kept))
        })
        .collect()
}

fn lenient_reactions<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, Vec<u32>>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_windows("reactions", value, |v| {
        as_count(v).map(|n| u32::try_from(n).unwrap_or(u32::MAX))
    }))
}

fn lenient_mistakes<'de, D: Deserializer<'de>>(
    d: D,
) -> Result<BTreeMap<String, Vec<u8>>, D::Error> {
    let value = Value::deserialize(d)?;
    Ok(lenient_windows("mistakes", value, |v| {
        as_count(v).map(|n| u8::from(n > 0))
    }))
}

impl Default for ProgressData {
    fn default() -> Self {
        let mut data = Self {
            schema_version: SCHEMA_VERSION,
            unlocked_count: DEFAULT_UNLOCKED,
            reactions: BTreeMap::new(),
            mistakes: BTreeMap::new(),
            saved_at: None,
        };
        data.backfill();
        data
    }
}

impl ProgressData {
    /// Give every table symbol (and the aggregate latency window) an entry.
    pub fn backfill(&mut self) {
        for symbol in Symbol::all() {
            let key = symbol.to_string();
            self.reactions.entry(key.clone()).or_default();
            self.mistakes.entry(key).or_default();
        }
        self.reactions
            .entry(AGGREGATE_LABEL.to_string())
            .or_default();
    }

    pub fn to_session(&self) -> (CurriculumState, ReactionStats) {
        let state = CurriculumState::new(self.unlocked_count);
        let mut stats = ReactionStats::default();

        for (label, values) in &self.reactions {
            match parse_key(label) {
                Some(key) => stats.load_reactions(key, values.iter().copied()),
                None => warn!("Ignoring latency window for unknown key {label:?}"),
            }
        }
        for (label, values) in &self.mistakes {
            match parse_key(label) {
                Some(StatKey::Symbol(symbol)) => {
                    stats.load_mistakes(symbol, values.iter().copied())
                }
                _ => warn!("Ignoring mistake window for unknown key {label:?}"),
            }
        }

        (state, stats)
    }

    pub fn from_session(state: &CurriculumState, stats: &ReactionStats) -> Self {
        let mut reactions = BTreeMap::new();
        let mut mistakes = BTreeMap::new();
        for symbol in Symbol::all() {
            let key = StatKey::Symbol(symbol);
            reactions.insert(
                symbol.to_string(),
                stats.reaction_window(key).iter().copied().collect(),
            );
            mistakes.insert(
                symbol.to_string(),
                stats.mistake_window(key).iter().copied().collect(),
            );
        }
        reactions.insert(
            AGGREGATE_LABEL.to_string(),
            stats
                .reaction_window(StatKey::Aggregate)
                .iter()
                .copied()
                .collect(),
        );

        Self {
            schema_version: SCHEMA_VERSION,
            unlocked_count: state.unlocked_count,
            reactions,
            mistakes,
            saved_at: Some(Utc::now()),
        }
    }
}

fn parse_key(label: &str) -> Option<StatKey> {
    if label == AGGREGATE_LABEL {
        return Some(StatKey::Aggregate);
    }
    let mut chars = label.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Symbol::from_char(c).ok().map(StatKey::Symbol),
        _ => None,
    }
}
