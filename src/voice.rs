//! Voice banks: prerecorded sound patterns addressed by sound-unit id.
//!
//! A voice is three parallel tables — per-id sample offsets, per-id sample
//! lengths and one flat signed 8-bit sample array — plus a pitch factor
//! applied when the intonation stage computes its tone endpoints.  Two
//! built-in banks (male and female) are generated once at first use; real
//! recordings can be supplied through the bundle loader, whose format is a
//! plain little-endian dump of the same three tables:
//!
//! | Field          | Size        |
//! |----------------|-------------|
//! | magic          | 8 bytes `RUTTSVOX` |
//! | version        | u8 (currently 1)   |
//! | pitch_factor   | u16                |
//! | sample count   | u32                |
//! | sound_offsets  | 201 × u16          |
//! | sound_lengths  | 201 × u16          |
//! | samples        | count × i8         |

use std::path::Path;

use anyhow::Context;
use once_cell::sync::Lazy;
use thiserror::Error;

/// Number of addressable sounds in a voice.
pub const VOICE_DIMENSION: usize = 201;

/// Sample-length threshold dividing short patterns (stretched or mixed by
/// the producer) from long ones (copied verbatim).
pub const VOICE_THRESHOLD: u16 = 105;

const BUNDLE_MAGIC: &[u8; 8] = b"RUTTSVOX";
const BUNDLE_VERSION: u8 = 1;

/// One voice bank.
///
/// Invariant: `sound_offsets[id] + sound_lengths[id] <= samples.len()` for
/// every id; the loader rejects bundles that violate it and the built-in
/// generators produce contiguous layouts.
pub struct Voice {
    /// Percentage applied to the tone bounds; 100 leaves them unchanged,
    /// the alternative voice carries 200 (one octave up).
    pub pitch_factor: u16,
    pub sound_offsets: [u16; VOICE_DIMENSION],
    pub sound_lengths: [u16; VOICE_DIMENSION],
    pub samples: Box<[i8]>,
}

impl Voice {
    /// Sample at an absolute index; silence past the end.
    #[inline]
    pub fn sample(&self, index: usize) -> i8 {
        self.samples.get(index).copied().unwrap_or(0)
    }

    /// Length of the pattern for `id` (0 for out-of-range ids).
    #[inline]
    pub fn length(&self, id: usize) -> u16 {
        self.sound_lengths.get(id).copied().unwrap_or(0)
    }

    /// Offset of the pattern for `id`.
    #[inline]
    pub fn offset(&self, id: usize) -> u16 {
        self.sound_offsets.get(id).copied().unwrap_or(0)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Built-in banks
// ─────────────────────────────────────────────────────────────────────────────

/// Pattern length for a generated bank.
///
/// Most patterns stay below [`VOICE_THRESHOLD`] so the producer stretches or
/// cross-mixes them; a band of long release patterns exercises the verbatim
/// copy path.
fn generated_length(id: usize) -> u16 {
    if (96..=104).contains(&id) {
        110 + (id as u16 - 96) * 6
    } else {
        48 + ((id as u16 * 37) % 53)
    }
}

/// Deterministic triangle-wave pattern for one sound id.
fn generated_pattern(id: usize, len: u16, period_base: usize) -> impl Iterator<Item = i8> {
    let period = period_base + id % 13;
    let amp = 40 + (id % 4) as i32 * 8;
    (0..len as usize).map(move |k| {
        let phase = k % period;
        let rise = period / 2;
        let tri = if phase < rise { phase } else { period - phase };
        ((tri as i32 * 2 * amp) / rise.max(1) as i32 - amp) as i8
    })
}

fn generate_bank(pitch_factor: u16, period_base: usize) -> Voice {
    let mut sound_offsets = [0u16; VOICE_DIMENSION];
    let mut sound_lengths = [0u16; VOICE_DIMENSION];
    let mut samples: Vec<i8> = Vec::new();
    for id in 0..VOICE_DIMENSION {
        let len = generated_length(id);
        sound_offsets[id] = samples.len() as u16;
        sound_lengths[id] = len;
        samples.extend(generated_pattern(id, len, period_base));
    }
    Voice { pitch_factor, sound_offsets, sound_lengths, samples: samples.into_boxed_slice() }
}

/// Built-in male voice bank.
pub static MALE: Lazy<Voice> = Lazy::new(|| generate_bank(100, 18));

/// Built-in female (alternative) voice bank.
pub static FEMALE: Lazy<Voice> = Lazy::new(|| generate_bank(200, 11));

// ─────────────────────────────────────────────────────────────────────────────
// Bundle loader
// ─────────────────────────────────────────────────────────────────────────────

/// Failures while decoding a voice bundle.
#[derive(Debug, Error)]
pub enum VoiceError {
    #[error("not a voice bundle (bad magic)")]
    BadMagic,
    #[error("unsupported voice bundle version {0}")]
    UnsupportedVersion(u8),
    #[error("voice bundle truncated: expected {expected} bytes, got {got}")]
    Truncated { expected: usize, got: usize },
    #[error("voice bundle has zero pitch factor")]
    ZeroPitchFactor,
    #[error("sound {id} spans {offset}+{length}, outside the {total} samples")]
    SoundOutOfRange { id: usize, offset: u16, length: u16, total: usize },
}

/// Decode a voice bundle from raw bytes.
pub fn from_bundle(data: &[u8]) -> Result<Voice, VoiceError> {
    const HEADER: usize = 8 + 1 + 2 + 4;
    const TABLES: usize = VOICE_DIMENSION * 2 * 2;

    if data.len() < HEADER {
        return Err(VoiceError::Truncated { expected: HEADER, got: data.len() });
    }
    if &data[..8] != BUNDLE_MAGIC {
        return Err(VoiceError::BadMagic);
    }
    if data[8] != BUNDLE_VERSION {
        return Err(VoiceError::UnsupportedVersion(data[8]));
    }
    let pitch_factor = u16::from_le_bytes([data[9], data[10]]);
    if pitch_factor == 0 {
        return Err(VoiceError::ZeroPitchFactor);
    }
    let count = u32::from_le_bytes([data[11], data[12], data[13], data[14]]) as usize;

    let expected = HEADER + TABLES + count;
    if data.len() < expected {
        return Err(VoiceError::Truncated { expected, got: data.len() });
    }

    let mut sound_offsets = [0u16; VOICE_DIMENSION];
    let mut sound_lengths = [0u16; VOICE_DIMENSION];
    let mut at = HEADER;
    for off in sound_offsets.iter_mut() {
        *off = u16::from_le_bytes([data[at], data[at + 1]]);
        at += 2;
    }
    for len in sound_lengths.iter_mut() {
        *len = u16::from_le_bytes([data[at], data[at + 1]]);
        at += 2;
    }
    for id in 0..VOICE_DIMENSION {
        let end = sound_offsets[id] as usize + sound_lengths[id] as usize;
        if end > count {
            return Err(VoiceError::SoundOutOfRange {
                id,
                offset: sound_offsets[id],
                length: sound_lengths[id],
                total: count,
            });
        }
    }

    let samples: Box<[i8]> = data[at..at + count].iter().map(|&b| b as i8).collect();
    Ok(Voice { pitch_factor, sound_offsets, sound_lengths, samples })
}

/// Read and decode a voice bundle file.
pub fn load_bundle(path: &Path) -> anyhow::Result<Voice> {
    let data = std::fs::read(path)
        .with_context(|| format!("cannot read voice bundle: {}", path.display()))?;
    from_bundle(&data).with_context(|| format!("invalid voice bundle: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Serialize a voice back into bundle form for round-trip testing.
    fn make_bundle(voice: &Voice) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(BUNDLE_MAGIC);
        out.push(BUNDLE_VERSION);
        out.extend_from_slice(&voice.pitch_factor.to_le_bytes());
        out.extend_from_slice(&(voice.samples.len() as u32).to_le_bytes());
        for &off in &voice.sound_offsets {
            out.extend_from_slice(&off.to_le_bytes());
        }
        for &len in &voice.sound_lengths {
            out.extend_from_slice(&len.to_le_bytes());
        }
        out.extend(voice.samples.iter().map(|&s| s as u8));
        out
    }

    #[test]
    fn test_builtin_banks_satisfy_layout_invariant() {
        for voice in [&*MALE, &*FEMALE] {
            for id in 0..VOICE_DIMENSION {
                let end = voice.sound_offsets[id] as usize + voice.sound_lengths[id] as usize;
                assert!(end <= voice.samples.len(), "sound {} out of range", id);
            }
        }
    }

    #[test]
    fn test_builtin_banks_have_both_pattern_classes() {
        let short = (0..VOICE_DIMENSION).filter(|&id| MALE.sound_lengths[id] < VOICE_THRESHOLD);
        let long = (0..VOICE_DIMENSION).filter(|&id| MALE.sound_lengths[id] > VOICE_THRESHOLD);
        assert!(short.count() > 150);
        assert!(long.count() > 0);
    }

    #[test]
    fn test_alternative_voice_doubles_pitch() {
        assert_eq!(MALE.pitch_factor, 100);
        assert_eq!(FEMALE.pitch_factor, 200);
    }

    #[test]
    fn test_bundle_round_trip() {
        let bundle = make_bundle(&MALE);
        let voice = from_bundle(&bundle).unwrap();
        assert_eq!(voice.pitch_factor, MALE.pitch_factor);
        assert_eq!(voice.sound_offsets, MALE.sound_offsets);
        assert_eq!(voice.sound_lengths, MALE.sound_lengths);
        assert_eq!(voice.samples, MALE.samples);
    }

    #[test]
    fn test_bundle_bad_magic() {
        let mut bundle = make_bundle(&MALE);
        bundle[0] = b'X';
        assert!(matches!(from_bundle(&bundle), Err(VoiceError::BadMagic)));
    }

    #[test]
    fn test_bundle_truncated() {
        let bundle = make_bundle(&MALE);
        assert!(matches!(
            from_bundle(&bundle[..bundle.len() / 2]),
            Err(VoiceError::Truncated { .. })
        ));
    }

    #[test]
    fn test_bundle_rejects_out_of_range_sound() {
        let mut bundle = make_bundle(&MALE);
        // Corrupt the offset of sound 0 to point past the sample array.
        let at = 8 + 1 + 2 + 4;
        bundle[at..at + 2].copy_from_slice(&u16::MAX.to_le_bytes());
        assert!(matches!(
            from_bundle(&bundle),
            Err(VoiceError::SoundOutOfRange { id: 0, .. })
        ));
    }

    #[test]
    fn test_sample_access_past_end_is_silence() {
        assert_eq!(MALE.sample(usize::MAX), 0);
    }
}
