//! Synthesis driver: turns finished clause transcriptions into sound.
//!
//! The transcription sink flushes into [`SynthDriver`], which finalizes the
//! clause (supplying a synthetic terminator when the buffer filled up
//! mid-clause) and then synthesizes it.  Very long clauses are split at
//! proclitic/enclitic boundaries recognized by the sequence lists below, so
//! a single transcription buffer can carry arbitrarily long input.

use crate::intonation::{apply_intonation, Modulation};
use crate::phone::{Phone, GAP};
use crate::planner::{plan_time, TimePlan};
use crate::producer::make_sound;
use crate::sink::{Consumer, Sink};
use crate::timing::{apply_speechrate, Timing};
use crate::transcribe::{
    TranscriptionState, TranscriptionTarget, CLAUSE_DONE, TRANSCRIPTION_BUFFER_SIZE,
    TRANSCRIPTION_START,
};
use crate::utterance::{build_utterance, SoundScript};
use crate::voice::Voice;

// Sequence lists of length-prefixed phoncode patterns marking breakable
// positions: proclitics, frequent word pairs and splittable prefixes.
const SEQLIST1: &[u8] = &[
    1, 2,
    5, 6, 8, 1, 24, 3,
    4, 21, 2, 25, 3,
    2, 21, 2,
    5, 10, 3, 21, 6, 2,
    5, 10, 3, 35, 17, 5,
    3, 5, 17, 5,
    4, 5, 27, 2, 28,
    5, 5, 16, 2, 33, 3,
    1, 5,
    3, 28, 2, 28,
    4, 17, 5, 20, 1,
    2, 16, 1,
    3, 8, 2, 35,
    5, 27, 2, 28, 25, 3,
    3, 27, 2, 28,
    3, 30, 3, 15,
    4, 27, 1, 25, 3,
    3, 40, 1, 30,
    3, 33, 3, 15,
    5, 33, 27, 1, 20, 4,
    4, 33, 27, 1, 26,
    3, 33, 27, 1,
    4, 5, 27, 2, 22,
    3, 28, 2, 22,
    3, 8, 2, 7,
    3, 27, 2, 22,
    3, 40, 1, 24,
    4, 33, 27, 1, 20,
    2, 27, 1,
    0,
];

const SEQLIST2: &[u8] = &[
    3, 23, 3, 35,
    3, 23, 3, 7,
    4, 6, 21, 1, 17,
    4, 20, 17, 5, 35,
    4, 20, 17, 5, 7,
    5, 6, 8, 1, 24, 3,
    5, 6, 1, 7, 17, 3,
    5, 6, 11, 5, 21, 0,
    3, 6, 19, 3,
    2, 6, 1,
    1, 6,
    1, 34,
    3, 21, 17, 2,
    2, 21, 1,
    2, 5, 35,
    2, 5, 7,
    2, 28, 1,
    1, 28,
    1, 22,
    5, 18, 3, 9, 21, 0,
    3, 16, 2, 21,
    3, 16, 2, 27,
    2, 16, 2,
    2, 19, 3,
    2, 1, 27,
    2, 1, 21,
    2, 1, 20,
    2, 1, 26,
    1, 1,
    5, 29, 3, 13, 3, 21,
    5, 29, 3, 13, 3, 27,
    5, 26, 1, 35, 17, 3,
    3, 26, 1, 21,
    3, 26, 1, 27,
    3, 26, 13, 5,
    3, 26, 8, 1,
    2, 26, 1,
    4, 8, 2, 24, 5,
    5, 35, 28, 6, 1, 38,
    5, 35, 28, 6, 1, 12,
    6, 35, 11, 3, 8, 40, 2,
    2, 35, 1,
    1, 35,
    5, 7, 7, 2, 24, 5,
    1, 0,
    5, 33, 3, 13, 3, 35,
    5, 33, 3, 13, 3, 7,
    2, 7, 2,
    1, 7,
    0,
];

const SEQLIST3: &[u8] = &[
    2, 20, 4,
    1, 20,
    2, 9, 3,
    1, 9,
    5, 19, 5, 20, 0, 24,
    1, 26,
    2, 27, 1,
    0,
];

const SEQLIST4: &[u8] = &[
    3, 2, 6, 2,
    3, 3, 6, 2,
    3, 2, 15, 0,
    3, 3, 15, 0,
    3, 5, 18, 5,
    3, 2, 10, 3,
    3, 2, 10, 2,
    3, 5, 10, 3,
    3, 0, 10, 0,
    4, 1, 53, 6, 2,
    4, 3, 6, 1, 53,
    0,
];

const SEQLIST5: &[u8] = &[
    2, 5, 10,
    3, 1, 53, 10,
    2, 3, 10,
    2, 5, 40,
    2, 5, 15,
    3, 1, 53, 15,
    2, 3, 15,
    0,
];

/// Wave output: the caller's consumer callback behind the wave sink.
pub struct WaveOutput<'a> {
    pub callback: &'a mut dyn FnMut(&[u8]) -> bool,
}

impl Consumer for WaveOutput<'_> {
    fn consume(&mut self, buffer: &mut [u8], len: usize) -> bool {
        (self.callback)(&buffer[..len])
    }
}

/// Per-call synthesis control data; the consumer of the transcription sink.
pub struct SynthDriver<'a> {
    pub state: TranscriptionState,
    /// The call's control flags, carried through for the number speller.
    pub flags: u32,
    pub timing: Timing,
    pub modulation: Modulation,
    pub voice: &'a Voice,
    pub wave: Sink<'a, WaveOutput<'a>>,
}

impl Consumer for SynthDriver<'_> {
    /// Transcription callback: finalize the flushed clause and speak it.
    fn consume(&mut self, buffer: &mut [u8], len: usize) -> bool {
        if len > TRANSCRIPTION_START {
            if self.state.flags & CLAUSE_DONE != 0 {
                self.state.flags &= !CLAUSE_DONE;
            } else {
                // The clause was split mid-stream; close it with a
                // synthetic comma and a neutral clause type.
                buffer[len.min(TRANSCRIPTION_BUFFER_SIZE - 1)] = 44;
                self.state.clause_type = 0;
            }
            // The backing buffer behind the transcription sink is always
            // exactly TRANSCRIPTION_BUFFER_SIZE bytes (see transfer());
            // wiring this driver to a differently-sized sink would panic
            // here.
            let transcription: &mut [u8; TRANSCRIPTION_BUFFER_SIZE] =
                (&mut buffer[..TRANSCRIPTION_BUFFER_SIZE]).try_into().expect("transcription buffer size");
            synth(transcription, self);
        }
        self.wave.status()
    }

    /// Custom reset: refill with the idle phoncode, restore the prefix.
    fn reset(&mut self, buffer: &mut [u8]) -> usize {
        buffer.fill(GAP);
        TRANSCRIPTION_START
    }
}

impl TranscriptionTarget for SynthDriver<'_> {
    fn state(&mut self) -> &mut TranscriptionState {
        &mut self.state
    }

    fn control_flags(&self) -> u32 {
        self.flags
    }
}

/// Whether the phoncodes at `at` match an item of `lst` ending on a word or
/// clause boundary.
fn test_list(buf: &[u8], at: usize, lst: &[u8]) -> bool {
    let mut p = 0;
    loop {
        let n = lst[p] as usize;
        if n == 0 {
            return false;
        }
        if at + n <= buf.len() && buf[at..at + n] == lst[p + 1..p + 1 + n] {
            let next = Phone(buf.get(at + n).copied().unwrap_or(GAP));
            return next.is_gap() || next.is_terminator();
        }
        p += n + 1;
    }
}

/// Close the gap at `at` by shifting everything up to the terminator one
/// position down.
fn shift(buf: &mut [u8], at: usize) {
    let mut i = at;
    while i + 1 < buf.len() {
        buf[i] = buf[i + 1];
        i += 1;
        if Phone(buf[i]).is_terminator() {
            break;
        }
    }
    if i + 1 < buf.len() {
        buf[i + 1] = GAP;
    }
}

/// Move the tail at `point` down over the prefix, refilling the vacated
/// tail with idle phoncodes.  Returns the new scan position.
fn transcription_advance(buf: &mut [u8; TRANSCRIPTION_BUFFER_SIZE], point: usize) -> usize {
    if point > TRANSCRIPTION_START {
        let length = TRANSCRIPTION_BUFFER_SIZE.saturating_sub(point);
        if length > 0 {
            buf.copy_within(point.., TRANSCRIPTION_START);
        }
        buf[TRANSCRIPTION_START + length..].fill(GAP);
    }
    TRANSCRIPTION_START
}

/// Synthesize one clause transcription into the wave sink.
fn synth_chunk(
    transcription: &[u8; TRANSCRIPTION_BUFFER_SIZE],
    driver: &mut SynthDriver,
    clause_type: u8,
) {
    let mut script = SoundScript::new(driver.voice);
    build_utterance(transcription, &mut script);
    let mut draft = TimePlan::new();
    if plan_time(transcription, &mut draft) {
        apply_speechrate(&mut script, &driver.timing, &draft);
    }
    apply_intonation(transcription, &mut script, &driver.modulation, clause_type);
    make_sound(&mut script, &mut driver.wave);
}

/// Synthesize a transcription chunk by chunk, splitting over-long clauses
/// at breakable positions.
pub fn synth(transcription: &mut [u8; TRANSCRIPTION_BUFFER_SIZE], driver: &mut SynthDriver) {
    let mut s = TRANSCRIPTION_START;
    let mut count: u8 = 0;
    let mut flags: u8 = 4;
    let mut t = TRANSCRIPTION_START;

    while t < TRANSCRIPTION_BUFFER_SIZE && !driver.wave.status() {
        if flags & 4 != 0 {
            flags &= !4;
            if test_list(transcription, t, SEQLIST1) {
                if flags & 1 != 0 {
                    transcription[s] = 50;
                    synth_chunk(transcription, driver, 0);
                    t = transcription_advance(transcription, t);
                    count = 0;
                    flags &= !1;
                    s = t;
                }
                flags |= 2;
                t += 1;
                continue;
            } else if test_list(transcription, t, SEQLIST2) {
                flags |= 2;
                t += 1;
                continue;
            } else if test_list(transcription, t, SEQLIST3)
                && t > TRANSCRIPTION_START
                && transcription[t - 1] == GAP
            {
                // Enclitic: glue it to the previous word and rescan.
                s = t - 1;
                shift(transcription, s);
                flags &= !2;
                continue;
            }
        }

        let code = transcription[t];
        if code != GAP {
            if Phone(code).is_terminator() {
                let clause_type = driver.state.clause_type;
                synth_chunk(transcription, driver, clause_type);
                break;
            }
        } else if flags & 2 != 0 {
            shift(transcription, t);
            flags = 4;
            continue;
        } else {
            count += 1;
            if count != 3 || test_list(transcription, t + 1, SEQLIST1) {
                s = t;
                flags |= 5;
            } else {
                let mut perspective: usize = 20;
                if t >= 3
                    && !test_list(transcription, t - 3, SEQLIST4)
                    && !test_list(transcription, t - 2, SEQLIST5)
                {
                    s = t;
                }
                let window_end = (t + 1 + perspective).min(TRANSCRIPTION_BUFFER_SIZE);
                let next = match transcription[t + 1..window_end].iter().position(|&x| x == GAP)
                {
                    Some(p) => {
                        let found = t + 1 + p;
                        perspective = found + 1 - t;
                        found + 1
                    }
                    None => t + perspective + 1,
                };
                let mut k = 1;
                while k <= perspective {
                    let ahead = transcription.get(t + k).copied().unwrap_or(GAP);
                    if Phone(ahead).is_terminator() {
                        break;
                    }
                    k += 1;
                }
                if k > perspective
                    && (next >= TRANSCRIPTION_BUFFER_SIZE
                        || !test_list(transcription, next, SEQLIST1))
                {
                    // No vocalic nor terminator in sight: force a split at
                    // the last candidate position.
                    transcription[s] = 50;
                    synth_chunk(transcription, driver, 0);
                    t = transcription_advance(transcription, s + 1) - 1;
                    count = 0;
                    flags &= !2;
                }
                flags |= 5;
                s = t;
            }
        }
        t += 1;
    }
}
