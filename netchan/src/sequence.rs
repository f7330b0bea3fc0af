//! Wrap-aware sequence arithmetic.

/// A modular sequence-number space of a fixed bit width.
///
/// Comparisons treat the space as a circle: `a` is newer than `b` when the
/// forward distance from `b` to `a` is non-zero and less than half the space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SequenceSpace {
    bits: u32,
}

impl SequenceSpace {
    /// 31-bit sequences; bit 31 of the sequence word is the reliable flag.
    pub const LEGACY: Self = Self { bits: 31 };

    /// 30-bit sequences; bit 30 additionally marks a fragment.
    pub const FRAGMENTING: Self = Self { bits: 30 };

    /// Returns the number of significant bits.
    #[must_use]
    pub const fn bits(self) -> u32 {
        self.bits
    }

    /// Returns the mask selecting sequence bits from a header word.
    #[must_use]
    pub const fn mask(self) -> u32 {
        (1u32 << self.bits) - 1
    }

    /// Returns the sequence following `seq`.
    #[must_use]
    pub const fn next(self, seq: u32) -> u32 {
        seq.wrapping_add(1) & self.mask()
    }

    /// Forward distance from `older` to `newer`.
    #[must_use]
    pub const fn distance(self, newer: u32, older: u32) -> u32 {
        newer.wrapping_sub(older) & self.mask()
    }

    /// Returns `true` if `a` is strictly newer than `b`.
    #[must_use]
    pub const fn is_newer(self, a: u32, b: u32) -> bool {
        let diff = self.distance(a, b);
        diff != 0 && diff < (1u32 << (self.bits - 1))
    }

    /// Number of sequences skipped between `older` and `newer`.
    ///
    /// Zero when `newer` directly follows `older`.
    #[must_use]
    pub const fn gap(self, newer: u32, older: u32) -> u32 {
        self.distance(newer, older).saturating_sub(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn masks() {
        assert_eq!(SequenceSpace::LEGACY.mask(), 0x7FFF_FFFF);
        assert_eq!(SequenceSpace::FRAGMENTING.mask(), 0x3FFF_FFFF);
    }

    #[test]
    fn newer_than() {
        let space = SequenceSpace::LEGACY;
        assert!(space.is_newer(2, 1));
        assert!(!space.is_newer(1, 2));
        assert!(!space.is_newer(1, 1));
    }

    #[test]
    fn newer_across_wrap() {
        let space = SequenceSpace::FRAGMENTING;
        let last = space.mask();
        assert_eq!(space.next(last), 0);
        assert!(space.is_newer(0, last));
        assert!(space.is_newer(5, last - 5));
        assert!(!space.is_newer(last, 0));
    }

    #[test]
    fn gap_counts_missing_sequences() {
        let space = SequenceSpace::LEGACY;
        assert_eq!(space.gap(11, 10), 0);
        assert_eq!(space.gap(14, 10), 3);
        assert_eq!(space.gap(1, space.mask()), 0);
    }
}
