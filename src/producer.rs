//! Sound producer: turns a sound script into a stream of signed 8-bit
//! samples.
//!
//! Prepared voice patterns come out three ways: long ones are copied
//! verbatim, short ones are repeated in half-period slices whose length the
//! intonation control block keeps interpolating, and transitional ones are
//! additionally cross-mixed with the next unit's pattern.  A small set of
//! unvoiced sounds bypasses the voice entirely and is synthesized by an
//! LFSR-excited two-pole resonator.

use crate::sink::{Consumer, Sink};
use crate::utterance::{Icb, SoundScript};
use crate::voice::VOICE_THRESHOLD;

// Control data for the fully synthetic sounds (ids 169 and up):
// excitation gain and shift/feedback selector per id.  0xFFFF in the
// second column marks plain silence.
const SYNTH_CTRL_DATA: [[u16; 2]; 33] = [
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0x930C, 0],
    [0xCF74, 1],
    [2, 0x8002],
    [0x930C, 1],
    [2, 1],
    [2, 0x8003],
    [0x930C, 0],
    [0xCF74, 1],
    [0x308C, 1],
    [0x0B8B, 2],
    [0x502E, 1],
    [0x66F0, 1],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
    [0, 0xFFFF],
];

/// Advance the control block one tick; returns half of the current stretch.
fn eval(icb: &mut Icb) -> i32 {
    let res = (icb.stretch >> 1) as i32;
    icb.count = icb.count.wrapping_sub(1);
    if icb.count == 0 {
        icb.stretch = icb.stretch.wrapping_add_signed(icb.delta);
        icb.count = icb.period;
    }
    res
}

fn silence<C: Consumer>(consumer: &mut Sink<C>, length: i32) -> i32 {
    for _ in 0..length.max(0) {
        consumer.put(0);
    }
    length
}

/// Three-sample fade out from the last emitted pattern sample.
fn fading<C: Consumer>(consumer: &mut Sink<C>, script: &SoundScript, sidx: usize) -> i32 {
    let mut sample = script.voice.sample(sidx.wrapping_sub(1));
    for _ in 0..3 {
        sample >>= 1;
        consumer.put(sample as u8);
    }
    3
}

/// Generate the sound stream for one clause and feed it to the sink.
pub fn make_sound<C: Consumer>(script: &mut SoundScript, consumer: &mut Sink<C>) {
    consumer.put(0);
    let mut i = 0;
    while i < script.length && !consumer.status() {
        let l = script.sounds[i].duration as i32;
        let id = script.sounds[i].id as usize;
        if id >= 169 {
            // Fully synthetic sounds that are not voice dependent.
            let bx = SYNTH_CTRL_DATA[id - 169][0] as i16;
            let cx = SYNTH_CTRL_DATA[id - 169][1] as i16;
            if cx != -1 {
                let sample_shift = (cx & 0xFF) + 8;
                let mut ax: u16 = 205;
                let mut var1: i16 = 0;
                let mut var2: i16 = 0;
                let mut var3: i16 = 0;
                for _ in 0..=l {
                    // One parity bit of the taps folds back into the LFSR.
                    let mut tmp = (ax & 0x2D) as i16;
                    tmp ^= tmp >> 4;
                    tmp &= 0x0F;
                    if (0x6996 >> tmp) & 0x01 != 0 {
                        ax |= 0x8000;
                    }
                    ax >>= 1;
                    let saved = ax;
                    ax >>= 2;
                    var3 >>= 1;
                    var3 = var3.wrapping_add(var3 >> 2);
                    if cx >= 0 {
                        var3 = var3.wrapping_add(var3 >> 2);
                    }
                    let si = var3;
                    var3 = (var2 << 1).wrapping_sub(var1);
                    var1 = ax as i16;
                    ax = (((var3 as i32) * (bx as i32)) >> 15) as u16;
                    ax = ax.wrapping_add(var1.wrapping_sub(si) as u16);
                    var3 = var2;
                    var2 = ax as i16;
                    consumer.put((var2 >> sample_shift) as u8);
                    ax = saved;
                }
            } else {
                silence(consumer, l);
            }
        } else if l != 0 {
            let mut sidx = script.voice.offset(id) as usize;
            let mut scnt = script.voice.length(id) as i32;
            let stage = (script.sounds[i].stage as usize).min(script.icb.len() - 1);
            if scnt > VOICE_THRESHOLD as i32 {
                // Long pattern: copy verbatim, truncated to the duration.
                let mut l = l;
                loop {
                    consumer.put(script.voice.sample(sidx) as u8);
                    sidx += 1;
                    scnt -= 1;
                    l -= 1;
                    if scnt == 0 || l == 0 {
                        break;
                    }
                }
            } else if id >= 132 {
                // Short pattern repeated in half-period slices.
                let mut l = l;
                let mut ax: i32 = 0;
                while l > ax {
                    let mut k = script.icb[stage].stretch as u16;
                    loop {
                        consumer.put(script.voice.sample(sidx) as u8);
                        sidx += 1;
                        l -= 1;
                        k = k.wrapping_sub(1);
                        if k == 0 {
                            break;
                        }
                        scnt -= 1;
                        if scnt == 0 {
                            break;
                        }
                    }
                    if k != 0 {
                        l -= silence(consumer, k as i32);
                    } else if scnt > 1 {
                        l -= fading(consumer, script, sidx);
                    }
                    ax = eval(&mut script.icb[stage]);
                    sidx = script.voice.offset(id) as usize;
                    scnt = script.voice.length(id) as i32;
                    if consumer.status() {
                        break;
                    }
                }
            } else {
                // Transitional pattern: linear cross-mix into the next
                // unit's pattern across the whole duration.
                let mut dx: i32 = 0;
                let mut ax: i32 = 0;
                while l >= ax {
                    let mut k = script.icb[stage].stretch as u16;
                    let next_id = script.unit(i + 1).id as usize;
                    let next_end = script.voice.offset(next_id + 1) as usize;
                    let mut nidx = script.voice.offset(next_id) as usize;
                    consumer.put(0);
                    let mut mix = script.voice.sample(nidx) as i32;
                    loop {
                        mix -= script.voice.sample(sidx) as i32;
                        mix = mix * dx / l.max(1);
                        dx += 1;
                        mix += script.voice.sample(sidx) as i32;
                        sidx += 1;
                        consumer.put(mix as i8 as u8);
                        nidx += 1;
                        mix = if nidx < next_end { script.voice.sample(nidx) as i32 } else { 0 };
                        k = k.wrapping_sub(1);
                        if k == 0 {
                            break;
                        }
                        scnt -= 1;
                        if scnt == 0 {
                            break;
                        }
                    }
                    if k != 0 {
                        dx += silence(consumer, k as i32);
                    } else if scnt > 1 {
                        dx += fading(consumer, script, sidx);
                    }
                    ax = dx + eval(&mut script.icb[stage]);
                    sidx = script.voice.offset(id) as usize;
                    scnt = script.voice.length(id) as i32;
                    if consumer.status() {
                        break;
                    }
                }
            }
        }
        i += 1;
    }

    consumer.flush();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utterance::{SoundScript, SoundUnit};
    use crate::voice::MALE;

    struct Capture {
        samples: Vec<i8>,
        stop_after: usize,
        calls: usize,
    }

    impl Consumer for Capture {
        fn consume(&mut self, buffer: &mut [u8], len: usize) -> bool {
            self.calls += 1;
            self.samples.extend(buffer[..len].iter().map(|&b| b as i8));
            self.calls >= self.stop_after
        }
    }

    fn run(script: &mut SoundScript) -> Vec<i8> {
        let mut buf = [0u8; 256];
        let mut sink = Sink::new(
            &mut buf,
            Capture { samples: Vec::new(), stop_after: usize::MAX, calls: 0 },
        );
        make_sound(script, &mut sink);
        sink.flush();
        std::mem::take(&mut sink.consumer.samples)
    }

    fn script_of(units: &[(u8, u8, u16)]) -> SoundScript<'static> {
        let mut script = SoundScript::new(&MALE);
        for &(id, stage, duration) in units {
            script.sounds[script.length] = SoundUnit { id, stage, duration };
            script.length += 1;
        }
        for icb in script.icb.iter_mut() {
            icb.stretch = 90;
            icb.count = 1;
            icb.period = 1;
        }
        script
    }

    #[test]
    fn test_empty_script_emits_single_zero() {
        let mut script = script_of(&[]);
        assert_eq!(run(&mut script), vec![0]);
    }

    #[test]
    fn test_silent_control_entry_emits_zeroes() {
        // Id 190 maps to control entry 21: silence of the unit's duration.
        let mut script = script_of(&[(190, 2, 25)]);
        let samples = run(&mut script);
        assert_eq!(samples.len(), 26);
        assert!(samples.iter().all(|&s| s == 0));
    }

    #[test]
    fn test_resonator_emits_duration_plus_one() {
        // Id 177 maps to control entry 8, a live resonator.
        let mut script = script_of(&[(177, 2, 40)]);
        let samples = run(&mut script);
        assert_eq!(samples.len(), 1 + 41);
        assert!(samples.iter().any(|&s| s != 0), "resonator output is all zero");
    }

    #[test]
    fn test_resonator_is_deterministic() {
        let mut one = script_of(&[(178, 2, 64)]);
        let mut two = script_of(&[(178, 2, 64)]);
        assert_eq!(run(&mut one), run(&mut two));
    }

    #[test]
    fn test_long_pattern_copied_verbatim() {
        // Id 96 carries a long pattern in the generated bank.
        let scnt = MALE.sound_lengths[96] as usize;
        assert!(scnt > VOICE_THRESHOLD as usize);
        let mut script = script_of(&[(96, 2, 30)]);
        let samples = run(&mut script);
        // Truncated at the duration: leading zero plus 30 pattern samples.
        assert_eq!(samples.len(), 31);
        let offset = MALE.sound_offsets[96] as usize;
        assert_eq!(samples[1], MALE.samples[offset]);
        assert_eq!(samples[30], MALE.samples[offset + 29]);
    }

    #[test]
    fn test_stretched_pattern_bounded_by_duration() {
        let mut script = script_of(&[(150, 2, 120)]);
        let samples = run(&mut script);
        // The stretch loop may stop up to one half-period short of the
        // nominal duration and may pad a few fade/silence samples per
        // restart, but never runs away.
        assert!(samples.len() > 120 / 2, "only {} samples", samples.len());
        assert!(samples.len() <= 1 + 120 + 8, "runaway: {} samples", samples.len());
    }

    #[test]
    fn test_cancellation_stops_promptly() {
        let mut buf = [0u8; 16];
        let mut sink = Sink::new(
            &mut buf,
            Capture { samples: Vec::new(), stop_after: 1, calls: 0 },
        );
        let mut script = script_of(&[(150, 2, 5000), (151, 2, 5000), (96, 2, 5000)]);
        make_sound(&mut script, &mut sink);
        assert_eq!(sink.consumer.calls, 1);
    }
}
