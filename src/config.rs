//! Speech parameter record.
//!
//! All values are integer percentages with 100 meaning "default".  The
//! record is passed per call, by value; there is no process-wide state.

use serde::{Deserialize, Serialize};

/// Treat `.` as a decimal separator inside numbers.
pub const DEC_SEP_POINT: u32 = 1;

/// Treat `,` as a decimal separator inside numbers.
pub const DEC_SEP_COMMA: u32 = 2;

/// Select the alternative (female) built-in voice.
pub const USE_ALTERNATIVE_VOICE: u32 = 4;

/// Speech parameters for one synthesis call.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Scales duration inversely.  Reasonable range is [20..500].
    pub speech_rate: i32,
    /// Base pitch.  Reasonable range is [50..300].
    pub voice_pitch: i32,
    /// Contour width; 0 is monotone.  Reasonable range is [0..140].
    pub intonation: i32,

    /// Overall inter-clause pause scaling.  The useful upper bound depends
    /// on the speech rate: 125 at the slowest rate, more for quicker speech.
    pub general_gap_factor: i32,
    pub comma_gap_factor: i32,
    pub dot_gap_factor: i32,
    pub semicolon_gap_factor: i32,
    pub colon_gap_factor: i32,
    pub question_gap_factor: i32,
    pub exclamation_gap_factor: i32,
    /// Applied to the intonational gaps the clause splitter synthesizes.
    pub intonational_gap_factor: i32,

    /// Combination of [`DEC_SEP_POINT`], [`DEC_SEP_COMMA`] and
    /// [`USE_ALTERNATIVE_VOICE`].
    pub flags: u32,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            speech_rate: 100,
            voice_pitch: 100,
            intonation: 100,
            general_gap_factor: 100,
            comma_gap_factor: 100,
            dot_gap_factor: 100,
            semicolon_gap_factor: 100,
            colon_gap_factor: 100,
            question_gap_factor: 100,
            exclamation_gap_factor: 100,
            intonational_gap_factor: 100,
            flags: DEC_SEP_POINT | DEC_SEP_COMMA,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_all_hundred() {
        let config = Config::default();
        assert_eq!(config.speech_rate, 100);
        assert_eq!(config.voice_pitch, 100);
        assert_eq!(config.intonation, 100);
        assert_eq!(config.general_gap_factor, 100);
        assert_eq!(config.flags, DEC_SEP_POINT | DEC_SEP_COMMA);
    }

    #[test]
    fn test_partial_json_fills_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"speech_rate": 250, "flags": 4}"#).unwrap();
        assert_eq!(config.speech_rate, 250);
        assert_eq!(config.flags, USE_ALTERNATIVE_VOICE);
        assert_eq!(config.voice_pitch, 100);
        assert_eq!(config.dot_gap_factor, 100);
    }
}
