//! The internal phoncode alphabet.
//!
//! Every stage of the pipeline exchanges phonetic atoms as single bytes in
//! the range 0..=54.  The ranges are load-bearing and tested with ordering
//! comparisons throughout, so the alphabet is a byte newtype rather than an
//! enumeration:
//!
//! | Range   | Meaning                                        |
//! |---------|------------------------------------------------|
//! | 0..=5   | vocalic nuclei and the soft-sign marker        |
//! | 6..=41  | consonants and their variants                  |
//! | 42      | word-internal soft gap                         |
//! | 43      | inter-word gap (the idle fill)                 |
//! | 44..=52 | clause terminators, one per punctuation pair   |
//! | 53      | strong stress mark                             |
//! | 54      | weak stress mark                               |

/// Word-internal soft gap.
pub const SOFT_GAP: u8 = 42;

/// Inter-word gap; also the idle fill value of the transcription buffer.
pub const GAP: u8 = 43;

/// Strong stress mark, valid only after a vocalic phoncode.
pub const STRONG_STRESS: u8 = 53;

/// Weak stress mark, valid only after a vocalic phoncode.
pub const WEAK_STRESS_MARK: u8 = 54;

/// A single phonetic atom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
#[repr(transparent)]
pub struct Phone(pub u8);

impl Phone {
    /// Vocalic nucleus or soft-sign marker.
    pub fn is_vocalic(self) -> bool {
        self.0 <= 5
    }

    /// Consonant or consonant variant.
    pub fn is_consonant(self) -> bool {
        (6..=41).contains(&self.0)
    }

    pub fn is_gap(self) -> bool {
        self.0 == GAP
    }

    /// Clause terminator produced by a punctuation pair (or synthesized by
    /// the clause splitter).
    pub fn is_terminator(self) -> bool {
        (44..=52).contains(&self.0)
    }

    pub fn is_stress(self) -> bool {
        self.0 == STRONG_STRESS || self.0 == WEAK_STRESS_MARK
    }
}

impl From<u8> for Phone {
    fn from(b: u8) -> Self {
        Phone(b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ranges_are_disjoint() {
        for b in 0u8..=54 {
            let p = Phone(b);
            let classes = [
                p.is_vocalic(),
                p.is_consonant(),
                b == SOFT_GAP,
                p.is_gap(),
                p.is_terminator(),
                p.is_stress(),
            ];
            assert_eq!(
                classes.iter().filter(|&&c| c).count(),
                1,
                "phoncode {} must fall in exactly one class",
                b
            );
        }
    }

    #[test]
    fn test_terminator_bounds() {
        assert!(!Phone(GAP).is_terminator());
        assert!(Phone(44).is_terminator());
        assert!(Phone(52).is_terminator());
        assert!(!Phone(STRONG_STRESS).is_terminator());
    }
}
