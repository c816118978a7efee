//! Number speller: transcribes digit runs into spelled-out phoncodes.
//!
//! Digits are grouped into triplets from the right, each spelled from the
//! fixed hundreds/tens/teens/units tables, followed by a period word
//! (thousand, million, billion, trillion) whose grammatical-case suffix
//! agrees with the preceding digit.  An optional fractional part, gated by
//! the decimal-separator configuration flags, recurses with a denominator
//! phrase chosen by digit count.

use crate::config::{DEC_SEP_COMMA, DEC_SEP_POINT};
use crate::phone::GAP;
use crate::sink::Sink;
use crate::transcribe::{list_item, Input, TranscriptionTarget};

const NUMBER_FRACTION: u8 = 1;
const NON_ZERO: u8 = 2;

// Length-prefixed digit transcriptions.
const PRIMARY: [u8; 59] = [
    4, 16, 1, 53, 17,
    5, 2, 24, 5, 53, 16,
    4, 21, 6, 2, 53,
    4, 27, 13, 5, 53,
    7, 33, 3, 27, 4, 53, 13, 3,
    4, 29, 2, 53, 30,
    5, 36, 3, 53, 38, 30,
    4, 38, 3, 53, 15,
    6, 6, 1, 53, 38, 3, 15,
    6, 24, 3, 53, 11, 2, 30,
];
const SECONDARY: [u8; 103] = [
    6, 24, 3, 53, 38, 2, 30,
    9, 2, 24, 5, 53, 16, 2, 32, 2, 30,
    9, 21, 11, 3, 16, 2, 53, 32, 2, 30,
    9, 27, 13, 5, 16, 2, 53, 32, 2, 30,
    11, 33, 3, 27, 4, 53, 8, 16, 2, 32, 2, 30,
    9, 29, 2, 27, 16, 2, 53, 32, 2, 30,
    9, 36, 3, 35, 16, 2, 53, 32, 2, 30,
    9, 38, 3, 15, 16, 2, 53, 32, 2, 30,
    11, 6, 2, 38, 3, 15, 16, 2, 53, 32, 2, 30,
    11, 24, 3, 11, 2, 27, 16, 2, 53, 32, 2, 30,
];
const TENS: [u8; 75] = [
    7, 21, 6, 2, 53, 32, 2, 30,
    7, 27, 13, 5, 53, 32, 2, 30,
    6, 35, 1, 53, 8, 2, 28,
    8, 29, 2, 24, 3, 38, 2, 53, 27,
    9, 36, 3, 12, 24, 3, 38, 2, 53, 27,
    9, 38, 3, 53, 15, 24, 3, 38, 2, 27,
    11, 6, 1, 53, 38, 3, 15, 24, 3, 38, 2, 27,
    10, 24, 3, 11, 2, 16, 1, 53, 35, 27, 2,
];
const HUNDREDS: [u8; 76] = [
    4, 35, 27, 1, 53,
    7, 21, 11, 3, 53, 38, 30, 5,
    7, 27, 13, 5, 53, 35, 27, 2,
    10, 33, 3, 27, 4, 53, 13, 3, 35, 27, 2,
    7, 29, 2, 27, 35, 1, 53, 27,
    7, 36, 3, 35, 35, 1, 53, 27,
    7, 38, 3, 15, 35, 1, 53, 27,
    9, 6, 2, 38, 3, 15, 35, 1, 53, 27,
    9, 24, 3, 11, 2, 27, 35, 1, 53, 27,
];
const PERIODS: [u8; 33] = [
    6, 27, 4, 53, 38, 2, 33,
    7, 18, 5, 17, 5, 1, 53, 16,
    8, 18, 5, 17, 5, 2, 53, 8, 27,
    8, 27, 13, 5, 17, 5, 1, 53, 16,
];
const FRACTIONS: [u8; 159] = [
    6, 24, 3, 38, 2, 53, 27,
    4, 35, 1, 53, 27,
    7, 27, 4, 53, 38, 2, 33, 16,
    13, 24, 3, 38, 2, 30, 5, 27, 4, 53, 38, 2, 33, 16,
    10, 35, 27, 1, 27, 4, 53, 38, 2, 33, 16,
    8, 18, 5, 17, 5, 1, 53, 16, 16,
    14, 24, 3, 38, 2, 30, 5, 18, 5, 17, 5, 1, 53, 16, 16,
    11, 35, 27, 1, 18, 5, 17, 5, 1, 53, 16, 16,
    9, 18, 5, 17, 5, 2, 53, 8, 27, 16,
    15, 24, 3, 38, 2, 30, 5, 18, 5, 17, 5, 2, 53, 8, 27, 16,
    12, 35, 27, 1, 18, 5, 17, 5, 2, 53, 8, 27, 16,
    9, 27, 13, 5, 17, 5, 1, 53, 16, 16,
    15, 24, 3, 38, 2, 30, 5, 27, 13, 5, 17, 5, 1, 53, 16, 16,
    12, 35, 27, 1, 27, 13, 5, 17, 5, 1, 53, 16, 16,
];
const SUFFIXES: [u8; 10] = [
    2, 4, 40,
    3, 2, 10, 2,
    2, 2, 6,
];

// Raw (unprefixed) alternate pronunciations.
const ONE_INT: [u8; 14] = [2, 21, 16, 2, 53, GAP, 32, 3, 53, 14, 2, 10, 2, GAP];
const ONE_O: [u8; 6] = [2, 21, 16, 1, 53, GAP];
const TWO_E: [u8; 5] = [21, 11, 3, 53, GAP];
const N_INTS: [u8; 6] = [32, 3, 53, 14, 4, 40];

fn put_transcription<C: TranscriptionTarget>(sink: &mut Sink<C>, lst: &[u8], n: u8) {
    let item = list_item(lst, n);
    sink.write(&item[1..]);
}

fn transcribe_digit<C: TranscriptionTarget>(sink: &mut Sink<C>, digit: u8, following: u8) {
    put_transcription(sink, &PRIMARY, digit - b'0');
    if following != b' ' {
        sink.put(GAP);
    }
}

/// Transcribe a numeric string from the input cursor into the sink.
///
/// Leaves the cursor on the first byte after the number.
pub fn process_number<C: TranscriptionTarget>(input: &mut Input, sink: &mut Sink<C>) {
    let control = sink.consumer.control_flags();
    let is_separator = |c: u8| {
        (c == b'.' && control & DEC_SEP_POINT != 0) || (c == b',' && control & DEC_SEP_COMMA != 0)
    };

    let mut flags: u8 = 0;
    while input.start < input.end && input.byte(input.start).is_ascii_digit() {
        let mut digits: u8 = 1;
        let mut triplets: u8 = 0;
        let mut lzn: u8 = 0;
        let mut nc: u8 = 0;

        flags &= !NON_ZERO;
        if sink.last() != Some(GAP) {
            sink.put(GAP);
        }

        // Measure the digit run, truncating at four triplets.
        let mut s = input.start + 1;
        while s < input.end {
            if !input.byte(s).is_ascii_digit() {
                break;
            }
            digits += 1;
            if digits > 3 {
                digits = 1;
                triplets += 1;
                if triplets > 4 {
                    digits = 3;
                    triplets = 4;
                    break;
                }
            } else if flags & NUMBER_FRACTION != 0 && triplets > 3 && digits > 1 {
                break;
            }
            s += 1;
        }
        let n = triplets * 3 + digits;

        let mut s = input.start;
        input.start += n as usize;
        while !sink.status() {
            let c = input.byte(s);
            nc = 0;
            if c != b'0' {
                flags |= NON_ZERO;
            } else if input.byte(s + 1).is_ascii_digit() {
                lzn += 1;
            }
            if c != b'0' || !(flags & NON_ZERO != 0 || input.byte(s + 1).is_ascii_digit()) {
                lzn = 0;
                match digits {
                    3 => {
                        put_transcription(sink, &HUNDREDS, c - b'1');
                        sink.put(GAP);
                    }
                    1 => {
                        if c == b'1' {
                            nc = 1;
                            if triplets == 1 {
                                sink.write(&ONE_INT[..6]);
                            } else if triplets == 0
                                && input.byte(s + 2) == b'+'
                                && (input.byte(s + 1) == b'A' || input.byte(s + 1) == b'O')
                            {
                                // Pronoun-like accented suffix consumes two
                                // characters and fixes the gender form.
                                let block: &[u8] =
                                    if input.byte(s + 1) == b'A' { &ONE_INT } else { &ONE_O };
                                input.start += 2;
                                s = input.start;
                                let len = if input.byte(s) != b' ' { 6 } else { 5 };
                                sink.write(&block[..len]);
                            } else if flags & NUMBER_FRACTION != 0 {
                                if s < input.end && input.byte(s + 2).is_ascii_digit() {
                                    transcribe_digit(sink, c, input.byte(s));
                                } else {
                                    sink.write(&ONE_INT[..6]);
                                }
                            } else if s >= input.end
                                || !is_separator(input.byte(s + 1))
                                || !input.byte(s + 2).is_ascii_digit()
                            {
                                transcribe_digit(sink, c, input.byte(s));
                            } else {
                                sink.write(&ONE_INT);
                            }
                        } else {
                            if c < b'5' {
                                nc = 2;
                                if c == b'2' {
                                    if triplets == 0
                                        && input.byte(s + 2) == b'+'
                                        && input.byte(s + 1) == b'E'
                                    {
                                        input.start += 2;
                                        s = input.start;
                                        let len = if input.byte(s) != b' ' { 5 } else { 4 };
                                        sink.write(&TWO_E[..len]);
                                        digits -= 1;
                                        if close_triplet(
                                            sink, &mut digits, &mut triplets, &mut lzn, nc, flags,
                                        ) {
                                            break;
                                        }
                                        s += 1;
                                        continue;
                                    }
                                    if triplets == 1
                                        || (flags & NUMBER_FRACTION != 0 && s + 1 == input.start)
                                        || (is_separator(input.byte(s + 1))
                                            && input.byte(s + 2).is_ascii_digit())
                                    {
                                        sink.write(&TWO_E);
                                        digits -= 1;
                                        if close_triplet(
                                            sink, &mut digits, &mut triplets, &mut lzn, nc, flags,
                                        ) {
                                            break;
                                        }
                                        s += 1;
                                        continue;
                                    }
                                }
                            }
                            transcribe_digit(sink, c, input.byte(s));
                        }
                    }
                    _ => {
                        if c == b'1' {
                            s += 1;
                            put_transcription(sink, &SECONDARY, input.byte(s) - b'0');
                            nc = 0;
                            digits -= 1;
                        } else {
                            put_transcription(sink, &TENS, c - b'2');
                        }
                        sink.put(GAP);
                    }
                }
            }
            digits -= 1;
            if digits == 0 && close_triplet(sink, &mut digits, &mut triplets, &mut lzn, nc, flags) {
                break;
            }
            s += 1;
        }

        if sink.status() {
            break;
        } else if flags & NUMBER_FRACTION != 0 {
            sink.put(GAP);
            put_transcription(sink, &FRACTIONS, n - 1);
            put_transcription(sink, &SUFFIXES, if nc != 1 { 0 } else { 1 });
            break;
        } else if input.start + 1 < input.end
            && is_separator(input.byte(input.start))
            && input.byte(input.start + 1).is_ascii_digit()
        {
            flags |= NUMBER_FRACTION;
            sink.put(GAP);
            if nc != 1 {
                sink.write(&N_INTS);
                sink.flush();
            }
            // Step over the separator into the fractional digits.
            input.start += 1;
        } else {
            sink.put(GAP);
            break;
        }
    }
}

/// Triplet boundary bookkeeping; returns `true` when the number is spelled
/// out completely.
fn close_triplet<C: TranscriptionTarget>(
    sink: &mut Sink<C>,
    digits: &mut u8,
    triplets: &mut u8,
    lzn: &mut u8,
    nc: u8,
    flags: u8,
) -> bool {
    if *digits != 0 {
        return false;
    }
    if *lzn == 3 {
        *lzn = 0;
        if *triplets != 0 {
            *digits = 3;
            *triplets -= 1;
            return false;
        }
        sink.back();
        return true;
    }
    *lzn = 0;
    if *triplets == 0 {
        sink.back();
        return true;
    }
    if flags & NON_ZERO != 0 {
        put_transcription(sink, &PERIODS, *triplets - 1);
        if *triplets != 1 {
            if nc > 1 {
                sink.put(2);
            } else if nc != 1 {
                put_transcription(sink, &SUFFIXES, 2);
            }
        } else if nc > 0 {
            sink.put(if nc > 1 { 5 } else { 2 });
        }
        sink.flush();
    }
    *digits = 3;
    *triplets -= 1;
    false
}
