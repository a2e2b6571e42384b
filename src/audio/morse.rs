use std::fmt;

use thiserror::Error;
use tracing::debug;

use crate::audio::synth::{AudioBuffer, PcmFormat, ToneSynthesizer};
use crate::audio::timing::Timing;

/// Characters the trainer can sound, with their mark patterns.
pub const MORSE_TABLE: &[(char, &str)] = &[
    ('A', ".-"),
    ('B', "-..."),
    ('C', "-.-."),
    ('D', "-.."),
    ('E', "."),
    ('F', "..-."),
    ('G', "--."),
    ('H', "...."),
    ('I', ".."),
    ('J', ".---"),
    ('K', "-.-"),
    ('L', ".-.."),
    ('M', "--"),
    ('N', "-."),
    ('O', "---"),
    ('P', ".--."),
    ('Q', "--.-"),
    ('R', ".-."),
    ('S', "..."),
    ('T', "-"),
    ('U', "..-"),
    ('V', "...-"),
    ('W', ".--"),
    ('X', "-..-"),
    ('Y', "-.--"),
    ('Z', "--.."),
    ('1', ".----"),
    ('2', "..---"),
    ('3', "...--"),
    ('4', "....-"),
    ('5', "....."),
    ('6', "-...."),
    ('7', "--..."),
    ('8', "---.."),
    ('9', "----."),
    ('0', "-----"),
    (',', "--..--"),
    ('.', ".-.-.-"),
    ('?', "..--.."),
    ('/', "-..-."),
    ('-', "-....-"),
    ('(', "-.--."),
    (')', "-.--.-"),
    ('=', "-...-"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("no Morse code for {0:?}")]
pub struct UnsupportedSymbol(pub char);

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mark {
    Dit,
    Dah,
}

/// A validated entry of [`MORSE_TABLE`]; the index doubles as a dense array key.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Symbol(u8);

impl Symbol {
    pub const COUNT: usize = MORSE_TABLE.len();

    pub fn from_char(c: char) -> Result<Self, UnsupportedSymbol> {
        let upper = c.to_ascii_uppercase();
        MORSE_TABLE
            .iter()
            .position(|&(ch, _)| ch == upper)
            .map(|i| Symbol(i as u8))
            .ok_or(UnsupportedSymbol(c))
    }

    pub fn all() -> impl Iterator<Item = Symbol> {
        (0..Self::COUNT).map(|i| Symbol(i as u8))
    }

    pub fn index(self) -> usize {
        self.0 as usize
    }

    pub fn as_char(self) -> char {
        MORSE_TABLE[self.index()].0
    }

    pub fn pattern(self) -> &'static str {
        MORSE_TABLE[self.index()].1
    }

    pub fn marks(self) -> impl Iterator<Item = Mark> {
        self.pattern().chars().map(|m| if m == '-' { Mark::Dah } else { Mark::Dit })
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Look up the mark sequence for `c` (case-insensitive).
pub fn encode_char(c: char) -> Result<Vec<Mark>, UnsupportedSymbol> {
    Symbol::from_char(c).map(|s| s.marks().collect())
}

/// Renders characters, words and phrases to audio. Dit, dah and the three
/// spacing buffers are synthesized once and reused.
pub struct MorseEncoder {
    format: PcmFormat,
    dit: AudioBuffer,
    dah: AudioBuffer,
    element_space: AudioBuffer,
    char_space: AudioBuffer,
    word_space: AudioBuffer,
}

impl MorseEncoder {
    pub fn new(timing: &Timing, synth: &ToneSynthesizer) -> Self {
        let freq = timing.frequency_hz;
        Self {
            format: synth.format(),
            dit: synth.tone(timing.dit_time, freq),
            dah: synth.tone(timing.dah_time, freq),
            element_space: synth.silence(timing.element_space),
            char_space: synth.silence(timing.char_space),
            word_space: synth.silence(timing.word_space),
        }
    }

    pub fn format(&self) -> PcmFormat {
        self.format
    }

    pub fn compose_symbol(&self, symbol: Symbol) -> AudioBuffer {
        let marks: Vec<AudioBuffer> = symbol
            .marks()
            .map(|m| match m {
                Mark::Dit => self.dit.clone(),
                Mark::Dah => self.dah.clone(),
            })
            .collect();
        AudioBuffer::join(self.format, &marks, &self.element_space)
    }

    /// Unsupported characters render as an empty buffer; callers check
    /// `is_empty()` when that matters.
    pub fn compose_char(&self, c: char) -> AudioBuffer {
        match Symbol::from_char(c) {
            Ok(symbol) => self.compose_symbol(symbol),
            Err(err) => {
                debug!("{err}, rendering nothing");
                AudioBuffer::empty(self.format)
            }
        }
    }

    pub fn compose_word(&self, word: &str) -> AudioBuffer {
        let chars: Vec<AudioBuffer> = word.chars().map(|c| self.compose_char(c)).collect();
        AudioBuffer::join(self.format, &chars, &self.char_space)
    }

    pub fn compose_phrase(&self, text: &str) -> AudioBuffer {
        let words: Vec<AudioBuffer> = text.split(' ').map(|w| self.compose_word(w)).collect();
        AudioBuffer::join(self.format, &words, &self.word_space)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::synth::SampleFormat;

    fn encoder() -> (MorseEncoder, ToneSynthesizer, Timing) {
        let timing = Timing::new(600.0, 30.0, 10.0).unwrap();
        let synth = ToneSynthesizer::new(8000, SampleFormat::U8);
        (MorseEncoder::new(&timing, &synth), synth, timing)
    }

    #[test]
    fn test_symbol_lookup_is_case_insensitive() {
        assert_eq!(Symbol::from_char('k'), Symbol::from_char('K'));
        assert_eq!(Symbol::from_char('k').unwrap().pattern(), "-.-");
        assert_eq!(Symbol::from_char('#'), Err(UnsupportedSymbol('#')));
    }

    #[test]
    fn test_table_has_unique_characters() {
        let mut chars: Vec<char> = MORSE_TABLE.iter().map(|&(c, _)| c).collect();
        chars.sort();
        chars.dedup();
        assert_eq!(chars.len(), MORSE_TABLE.len());
        assert!(
            MORSE_TABLE
                .iter()
                .all(|&(_, p)| !p.is_empty() && p.chars().all(|m| m == '.' || m == '-'))
        );
    }

    #[test]
    fn test_encode_char_marks() {
        assert_eq!(encode_char('a').unwrap(), vec![Mark::Dit, Mark::Dah]);
        assert_eq!(encode_char('='), Ok(vec![Mark::Dah, Mark::Dit, Mark::Dit, Mark::Dit, Mark::Dah]));
        assert!(encode_char(' ').is_err());
    }

    #[test]
    fn test_compose_char_length() {
        let (enc, synth, t) = encoder();
        // K = dah dit dah with two element spaces
        let expected = 2 * synth.sample_count(t.dah_time)
            + synth.sample_count(t.dit_time)
            + 2 * synth.sample_count(t.element_space);
        assert_eq!(enc.compose_char('k').len(), expected);
        // E is a single dit with no trailing space
        assert_eq!(enc.compose_char('E').len(), synth.sample_count(t.dit_time));
    }

    #[test]
    fn test_unsupported_char_is_empty() {
        let (enc, _, _) = encoder();
        assert!(enc.compose_char('#').is_empty());
        assert!(enc.compose_char(' ').is_empty());
    }

    #[test]
    fn test_compose_word_and_phrase_spacing() {
        let (enc, synth, t) = encoder();
        let e = enc.compose_char('E').len();
        let t_len = enc.compose_char('T').len();
        let char_space = synth.sample_count(t.char_space);
        let word_space = synth.sample_count(t.word_space);

        assert_eq!(enc.compose_word("ET").len(), e + char_space + t_len);
        assert_eq!(
            enc.compose_phrase("ET E").len(),
            e + char_space + t_len + word_space + e
        );
        assert_eq!(enc.compose_phrase("E").len(), e);
    }

    #[test]
    fn test_compose_word_starts_with_tone() {
        let (enc, _, _) = encoder();
        let word = enc.compose_word("TE");
        let first_tone = enc.compose_char('T');
        assert_eq!(&word.as_bytes()[..first_tone.as_bytes().len()], first_tone.as_bytes());
    }
}
