use std::fmt::{Display, Formatter};
use std::ops::Neg;

use crate::utils::MyHash;

/// Handle to a decision-diagram node, with the sign as a complement edge.
///
/// `Ref(1)` is the `true` terminal and `Ref(-1)` the `false` terminal;
/// index 0 is never allocated.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Ref(i32);

impl Ref {
    pub const ONE: Ref = Ref(1);
    pub const ZERO: Ref = Ref(-1);

    pub const fn positive(index: u32) -> Self {
        assert!(index != 0);
        Self(index as i32)
    }

    pub const fn is_negated(&self) -> bool {
        self.0 < 0
    }

    pub const fn negate(self) -> Self {
        Self(-self.0)
    }

    /// Return the internal representation of the reference.
    pub const fn get(self) -> i32 {
        self.0
    }

    /// Return the index of the referenced node, ignoring polarity.
    pub const fn index(self) -> usize {
        self.0.unsigned_abs() as usize
    }

    /// Drop the complement bit.
    pub const fn regular(self) -> Self {
        Self(self.0.abs())
    }
}

impl Neg for Ref {
    type Output = Self;

    fn neg(self) -> Self::Output {
        self.negate()
    }
}

impl MyHash for Ref {
    fn hash(&self) -> u64 {
        signed_to_lit(self.0) as u64
    }
}

impl Display for Ref {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}@{}",
            if self.is_negated() { "~" } else { "" },
            self.index()
        )
    }
}

pub(crate) fn signed_to_lit(value: i32) -> u32 {
    (value.unsigned_abs() << 1) + (value < 0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_terminals_are_complements() {
        assert_eq!(-Ref::ONE, Ref::ZERO);
        assert_eq!(Ref::ONE.index(), Ref::ZERO.index());
        assert!(Ref::ZERO.is_negated());
        assert_eq!(Ref::ZERO.regular(), Ref::ONE);
    }

    #[test]
    fn test_lit_hash_distinguishes_polarity() {
        let r = Ref::positive(5);
        assert_ne!(MyHash::hash(&r), MyHash::hash(&-r));
        assert_eq!(format!("{}", -r), "~@5");
    }
}
