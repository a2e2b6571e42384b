use thiserror::Error;

/// Farnsworth-stretched spacing goes negative when the effective speed is
/// faster than the character speed allows.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigurationError {
    #[error("{name} must be positive, got {value}")]
    NonPositive { name: &'static str, value: f64 },
    #[error(
        "farnsworth speed {farnsworth_wpm} wpm is too fast for character speed {char_wpm} wpm \
         (spacing unit would be {farnsworth_time:.4}s)"
    )]
    NegativeSpacing {
        char_wpm: f64,
        farnsworth_wpm: f64,
        farnsworth_time: f64,
    },
}

/// Element and spacing durations in seconds, derived from the PARIS standard
/// (50 dit units per word).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Timing {
    pub frequency_hz: f64,
    pub char_wpm: f64,
    pub farnsworth_wpm: f64,
    pub dit_time: f64,
    pub dah_time: f64,
    pub farnsworth_time: f64,
    pub element_space: f64,
    pub char_space: f64,
    pub word_space: f64,
}

impl Timing {
    pub fn new(
        frequency_hz: f64,
        char_wpm: f64,
        farnsworth_wpm: f64,
    ) -> Result<Self, ConfigurationError> {
        for (name, value) in [
            ("frequency_hz", frequency_hz),
            ("char_wpm", char_wpm),
            ("farnsworth_wpm", farnsworth_wpm),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(ConfigurationError::NonPositive { name, value });
            }
        }

        let dit_time = 60.0 / (50.0 * char_wpm);
        // 31 units of a PARIS word are marks and intra-character gaps; the
        // remaining 19 units absorb the Farnsworth stretch.
        let farnsworth_time = ((60.0 / farnsworth_wpm) - 31.0 * dit_time) / 19.0;
        if farnsworth_time < 0.0 {
            return Err(ConfigurationError::NegativeSpacing {
                char_wpm,
                farnsworth_wpm,
                farnsworth_time,
            });
        }

        Ok(Self {
            frequency_hz,
            char_wpm,
            farnsworth_wpm,
            dit_time,
            dah_time: 3.0 * dit_time,
            farnsworth_time,
            element_space: dit_time,
            char_space: 3.0 * farnsworth_time,
            word_space: 7.0 * farnsworth_time,
        })
    }
}
