//! Intonation: pitch modulation setup and per-clause contour application.
//!
//! Stress marks partition a clause into pitch envelopes.  Each sound unit's
//! stage is re-tagged into one of three envelope banks (first, intermediate,
//! final), and every stage's intonation control block is loaded with a tone
//! start point and a per-tick delta interpolating towards the end point the
//! clause plan prescribes.

use crate::phone::GAP;
use crate::transcribe::{TRANSCRIPTION_BUFFER_SIZE, TRANSCRIPTION_START};
use crate::utterance::{SoundScript, NSTAGES};
use crate::voice::VOICE_THRESHOLD;

/// Pitch bounds for one synthesis call, derived from the configured voice
/// pitch and intonation level.
#[derive(Debug, Clone, Copy)]
pub struct Modulation {
    pub mintone: u16,
    pub maxtone: u16,
}

impl Modulation {
    /// Derive the tone bounds from voice pitch and intonation level, both
    /// percentages of the default.  Intonation widens the bounds around the
    /// pitch; zero collapses them into a monotone.
    pub fn setup(voice_pitch: i32, intonation: i32) -> Modulation {
        let pitch = voice_pitch.clamp(50, 300);
        let expr = intonation.clamp(0, 140);
        Modulation {
            mintone: (pitch * 200 / (200 + expr)) as u16,
            maxtone: (pitch * (200 + expr) / 200) as u16,
        }
    }
}

// Intonation plans for the sixteen clause types: per stage, the contour
// start and end points as percentages of the tone range.
const INTONATIONS: [[[u8; 2]; NSTAGES]; 16] = [
    [[30, 40], [40, 50], [50, 50], [50, 40], [40, 50], [50, 60], [60, 50], [50, 40], [40, 40], [40, 60], [60, 70], [70, 70]],
    [[30, 40], [40, 50], [50, 50], [50, 40], [40, 45], [45, 50], [50, 60], [60, 40], [40, 25], [25, 15], [15, 30], [30, 60]],
    [[30, 60], [60, 70], [70, 60], [60, 40], [40, 50], [50, 60], [60, 50], [50, 40], [40, 40], [40, 60], [60, 70], [70, 70]],
    [[30, 60], [60, 70], [70, 60], [60, 40], [40, 50], [50, 60], [60, 50], [50, 40], [40, 40], [40, 60], [60, 70], [70, 70]],
    [[30, 60], [60, 70], [70, 60], [60, 40], [40, 50], [50, 60], [60, 50], [50, 40], [40, 40], [40, 60], [60, 70], [70, 70]],
    [[30, 40], [40, 50], [50, 60], [60, 70], [70, 20], [20, 40], [40, 60], [60, 40], [40, 50], [50, 20], [20, 0], [0, 0]],
    [[30, 30], [35, 40], [40, 40], [40, 40], [40, 20], [20, 30], [30, 40], [40, 40], [30, 20], [20, 0], [0, 0], [0, 0]],
    [[30, 40], [40, 50], [50, 60], [60, 60], [60, 20], [20, 40], [40, 60], [60, 60], [40, 60], [60, 35], [35, 20], [20, 0]],
    [[30, 45], [45, 65], [65, 80], [80, 80], [80, 40], [40, 60], [60, 80], [80, 80], [40, 80], [80, 50], [50, 20], [20, 0]],
    [[20, 30], [30, 25], [25, 25], [25, 20], [20, 30], [30, 25], [25, 25], [25, 20], [20, 30], [30, 25], [25, 20], [20, 10]],
    [[40, 80], [80, 80], [80, 80], [80, 70], [70, 70], [70, 65], [65, 60], [60, 60], [60, 80], [80, 100], [100, 100], [100, 10]],
    [[40, 80], [80, 90], [90, 90], [90, 80], [80, 80], [80, 80], [80, 80], [80, 80], [80, 60], [60, 40], [40, 20], [20, 0]],
    [[40, 80], [80, 80], [80, 80], [80, 70], [70, 70], [70, 65], [65, 60], [60, 60], [60, 80], [80, 100], [100, 100], [100, 10]],
    [[40, 100], [100, 100], [100, 100], [100, 50], [100, 100], [100, 100], [100, 100], [100, 100], [50, 80], [80, 100], [100, 40], [20, 0]],
    [[40, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 100], [40, 80], [80, 100], [100, 20], [20, 0]],
    [[40, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 100], [100, 70], [70, 50], [50, 20], [20, 0]],
];

/// Search the transcription for a speech breakpoint ahead of `start`.
///
/// Returns the last checked phoncode, or -1 when nothing is found.
fn search_breakpoint(transcription: &[u8; TRANSCRIPTION_BUFFER_SIZE], start: usize) -> i32 {
    let mut i = start;
    while i < TRANSCRIPTION_BUFFER_SIZE {
        let code = transcription[i];
        if code != GAP {
            if code > GAP {
                return -1;
            }
            break;
        }
        i += 1;
    }
    i += 1;
    while i < TRANSCRIPTION_BUFFER_SIZE {
        let code = transcription[i];
        if code > 42 {
            return code as i32;
        }
        i += 1;
    }
    -1
}

/// Half-period in samples for a contour percentage within the tone bounds.
fn eval_tone(x: u32, mintone: u16, maxtone: u16) -> u8 {
    (10000 / (((maxtone - mintone) as u32 * x / 100) + mintone as u32).max(1)) as u8
}

/// Re-tag stages forward from `start` while they keep ascending; stops at
/// the first descent, which keeps the walk inside one syllable envelope.
fn setstage(script: &mut SoundScript, start: usize, value: u8) -> usize {
    let mut i = start;
    while i < script.length {
        let prev = script.sounds[i].stage;
        script.sounds[i].stage = value;
        i += 1;
        if script.stage_at(i) <= prev {
            break;
        }
    }
    i
}

/// Apply the intonation parameters for one clause.
pub fn apply_intonation(
    transcription: &[u8; TRANSCRIPTION_BUFFER_SIZE],
    script: &mut SoundScript,
    modulation: &Modulation,
    clause_type: u8,
) {
    let tr = |k: usize| transcription.get(k).copied().unwrap_or(44);

    // The voice's own pitch factor shifts the tone bounds.
    let factor = script.voice.pitch_factor.max(1) as u32;
    let mintone = (modulation.mintone as u32 * factor / 100).min(u16::MAX as u32) as u16;
    let maxtone = (modulation.maxtone as u32 * factor / 100).min(u16::MAX as u32) as u16;

    let mut nspeechmarks: u32 = 0;
    let mut i = TRANSCRIPTION_START;
    while i < TRANSCRIPTION_BUFFER_SIZE {
        let bp = search_breakpoint(transcription, i);
        if bp < 0 {
            break;
        }
        if bp != 54 {
            nspeechmarks += 1;
        }
        i += 1;
        while i < TRANSCRIPTION_BUFFER_SIZE && (transcription[i] >= 53 || transcription[i] < GAP) {
            i += 1;
        }
    }

    for icb in script.icb.iter_mut() {
        icb.count = 1;
        icb.period = 1;
    }

    if nspeechmarks == 0 {
        // No marks at all: a perfectly monotone utterance.
        for icb in script.icb.iter_mut() {
            icb.stretch = VOICE_THRESHOLD as u8;
            icb.delta = 0;
        }
        let mut i = 0;
        while i < script.length {
            i = setstage(script, i, 0);
        }
        return;
    }

    for icb in script.icb.iter_mut() {
        icb.stretch = 90;
        icb.delta = 0;
    }

    // Re-tag each unit's stage with the envelope bank for its clause
    // position, raising the stage past a stress onto the release rows.
    let mut j: usize = 0;
    let mut m: u8 = 0;
    let mut st4 = false;
    let mut stage: u8 = 0;
    let mut marks_left = nspeechmarks;
    let mut i = TRANSCRIPTION_START;
    while j < script.length {
        if m == 0 {
            if marks_left == 1 {
                stage = 8;
            } else if st4 {
                stage = 4;
            } else {
                stage = 0;
                st4 = true;
            }
            let bp = search_breakpoint(transcription, i);
            m = if bp != 53 && bp != 54 { 1 } else { 2 };
        }

        if m < 3 {
            if m < 2 && tr(i) > 5 {
                j = setstage(script, j, stage);
                i += 1;
                continue;
            } else if m > 1 && (tr(i) > 5 || tr(i + 1) != 53) {
                if tr(i) != 54 {
                    j = setstage(script, j, stage);
                }
                i += 1;
                continue;
            }

            // The stressed syllable itself: shift its ascending stages into
            // the chosen bank, folding the tail stage onto the release row.
            let mut s = script.stage_at(j);
            while j < script.length {
                let l = s;
                if s == 4 {
                    s = 3;
                }
                script.sounds[j].stage = s + stage;
                j += 1;
                s = script.stage_at(j);
                if l >= s {
                    break;
                }
            }
            m = 3;
            i += 1;
            continue;
        }

        let code = tr(i);
        if code < 53 {
            if code < GAP {
                j = setstage(script, j, stage + 3);
            } else if code != GAP {
                break;
            } else {
                j += 1;
                let bp = search_breakpoint(transcription, i + 1);
                if bp < 0 {
                    break;
                } else if bp != 54 {
                    marks_left -= 1;
                    m = 0;
                }
            }
        }
        i += 1;
    }

    // Sum the short-sound durations per stage: the interpolation step count.
    let mut coef = [0u16; NSTAGES];
    for i in 0..script.length {
        let unit = script.sounds[i];
        if script.voice.length(unit.id as usize) < VOICE_THRESHOLD {
            let k = (unit.stage as usize).min(NSTAGES - 1);
            coef[k] = coef[k].wrapping_add(unit.duration / 10);
        }
    }

    // Load the control block the first time each stage run begins.
    let mut prevk: u16 = 256;
    for i in 0..script.length {
        let unit = script.sounds[i];
        let k = (unit.stage as usize).min(NSTAGES - 1);
        if prevk != k as u16 && script.voice.length(unit.id as usize) < VOICE_THRESHOLD {
            let plan = INTONATIONS[(clause_type & 0x0F) as usize][k];
            let mut q: i32 = 0;
            let mut tone1 = eval_tone(plan[0] as u32, mintone, maxtone);
            let mut tone2 = eval_tone(plan[1] as u32, mintone, maxtone).wrapping_sub(tone1);
            script.icb[k].period = 1;
            script.icb[k].count = 1;
            if tone2 != 0 {
                let tone3 = tone2 as i8;
                tone2 = tone1;
                tone1 = tone1.wrapping_add((tone3 >> 1) as u8);
                let mut t = ((coef[k] as u32 * 10) + (tone1 as u32 >> 1)) / (tone1 as u32).max(1);
                if t == 0 {
                    t = 1;
                }
                let t = t as i32;
                q = tone3 as i32 / t;
                let mut r = tone3 as i32 % t;
                if q != 0 {
                    if r < 0 {
                        r = (-r) << 1;
                        if r >= t {
                            q -= 1;
                        }
                    } else {
                        r <<= 1;
                        if r >= t {
                            q += 1;
                        }
                    }
                } else {
                    q = if r < 0 { -1 } else { 1 };
                    if r < 0 {
                        r = -r;
                    }
                    let spacing = (((t as u32) + (r as u32 >> 1)) / r as u32) & 0xFF;
                    script.icb[k].period = spacing as u8;
                    script.icb[k].count = spacing as u8;
                }
            } else {
                tone2 = tone1;
            }
            script.icb[k].stretch = tone2;
            script.icb[k].delta = q as i8;
            prevk = k as u16;
        } else if prevk != k as u16 {
            prevk = 256;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utterance::SoundUnit;
    use crate::voice::MALE;

    fn transcription(payload: &[u8]) -> [u8; TRANSCRIPTION_BUFFER_SIZE] {
        let mut buf = [GAP; TRANSCRIPTION_BUFFER_SIZE];
        buf[TRANSCRIPTION_START..TRANSCRIPTION_START + payload.len()].copy_from_slice(payload);
        buf
    }

    #[test]
    fn test_modulation_defaults_center_the_tone() {
        let m = Modulation::setup(100, 100);
        assert_eq!(m.mintone, 66);
        assert_eq!(m.maxtone, 150);
        // The midpoint tone lands near the neutral stretch.
        let mid = eval_tone(50, m.mintone, m.maxtone);
        assert!((80..=105).contains(&mid), "midpoint stretch {}", mid);
    }

    #[test]
    fn test_modulation_zero_intonation_is_flat() {
        let m = Modulation::setup(100, 0);
        assert_eq!(m.mintone, m.maxtone);
        assert_eq!(eval_tone(0, m.mintone, m.maxtone), eval_tone(100, m.mintone, m.maxtone));
    }

    #[test]
    fn test_modulation_clamps_inputs() {
        assert_eq!(Modulation::setup(10, 100).mintone, Modulation::setup(50, 100).mintone);
        assert_eq!(Modulation::setup(900, 100).maxtone, Modulation::setup(300, 100).maxtone);
    }

    #[test]
    fn test_no_speech_marks_yields_monotone() {
        let buf = transcription(&[]);
        let mut script = SoundScript::new(&MALE);
        script.sounds[0] = SoundUnit { id: 10, stage: 2, duration: 100 };
        script.sounds[1] = SoundUnit { id: 11, stage: 3, duration: 100 };
        script.length = 2;
        apply_intonation(&buf, &mut script, &Modulation::setup(100, 100), 0);
        for icb in &script.icb {
            assert_eq!(icb.stretch, VOICE_THRESHOLD as u8);
            assert_eq!(icb.delta, 0);
        }
        assert!(script.sounds[..2].iter().all(|u| u.stage == 0));
    }

    #[test]
    fn test_stressed_clause_programs_icbs() {
        // One stressed word ending in a period-class terminator.
        let buf = transcription(&[27, 1, 53, GAP, 45]);
        let mut script = SoundScript::new(&MALE);
        for (n, unit) in [(170u8, 1u8), (1, 2), (96, 3)].iter().enumerate() {
            script.sounds[n] = SoundUnit { id: unit.0, stage: unit.1, duration: 200 };
        }
        script.length = 3;
        apply_intonation(&buf, &mut script, &Modulation::setup(100, 100), 5);
        // A single speech mark selects the final envelope bank.
        assert!(script.sounds[..3].iter().any(|u| u.stage >= 8), "stages: {:?}",
            script.sounds[..3].iter().map(|u| u.stage).collect::<Vec<_>>());
        // At least one programmed block deviates from the neutral load.
        assert!(script.icb.iter().any(|icb| icb.stretch != 90 || icb.delta != 0));
    }

    #[test]
    fn test_search_breakpoint() {
        let buf = transcription(&[GAP, 20, 1, 53, GAP, 45]);
        // From the leading gap: first word, breakpoint is its stress mark.
        assert_eq!(search_breakpoint(&buf, TRANSCRIPTION_START), 53);
        // Starting at the terminator region reports no breakpoint.
        let term = transcription(&[45]);
        assert_eq!(search_breakpoint(&term, TRANSCRIPTION_START), -1);
    }

    #[test]
    fn test_eval_tone_is_inverse_to_pitch() {
        // Higher percentage -> bigger denominator -> shorter half-period.
        let lo = eval_tone(100, 66, 150);
        let hi = eval_tone(0, 66, 150);
        assert!(lo < hi);
        assert_eq!(hi, (10000u32 / 66) as u8);
    }

    #[test]
    fn test_alternative_voice_halves_stretch() {
        // Doubling the tone bounds (female pitch factor) halves eval_tone.
        let male = eval_tone(50, 66, 150);
        let female = eval_tone(50, 132, 300);
        assert!((male as i32 / 2 - female as i32).abs() <= 1);
    }
}
