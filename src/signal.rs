use std::fmt::{Debug, Display, Formatter};
use std::ops::Not;

/// An edge in an And-Inverter network: node index plus a complement bit.
///
/// Node 0 is the constant `false`, so `Signal::zero()` and `Signal::one()`
/// need no node of their own.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct Signal(u32);

// Constructors
impl Signal {
    pub const fn zero() -> Self {
        Self(0)
    }

    pub const fn one() -> Self {
        Self(1)
    }

    pub const fn from_index(index: u32) -> Self {
        Self(index << 1)
    }
}

// Getters
impl Signal {
    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn index(self) -> usize {
        (self.0 >> 1) as usize
    }

    /// The same signal without the complement bit.
    pub const fn regular(self) -> Self {
        Self(self.0 & !1)
    }
}

// Checks
impl Signal {
    pub const fn is_const(&self) -> bool {
        self.index() == 0
    }

    pub const fn is_negated(&self) -> bool {
        self.0 & 1 != 0
    }
}

impl From<bool> for Signal {
    fn from(b: bool) -> Self {
        if b {
            Self::one()
        } else {
            Self::zero()
        }
    }
}

impl Not for Signal {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self(self.0 ^ 1)
    }
}

impl Display for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.is_const() {
            write!(f, "{}", self.0 & 1)
        } else {
            if self.is_negated() {
                write!(f, "!")?;
            }
            write!(f, "n{}", self.index())
        }
    }
}

impl Debug for Signal {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_const() {
        let zero = Signal::zero();
        let one = Signal::one();

        assert!(zero.is_const());
        assert!(one.is_const());
        assert_eq!(zero, !one);
        assert!(!zero.is_negated());
        assert!(one.is_negated());
        assert_eq!(Signal::from(true), one);
    }

    #[test]
    fn test_index_roundtrip() {
        let s = Signal::from_index(7);
        assert_eq!(s.index(), 7);
        assert_eq!((!s).index(), 7);
        assert_eq!((!s).regular(), s);
        assert_eq!(format!("{}", !s), "!n7");
    }
}
