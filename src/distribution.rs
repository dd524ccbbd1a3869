//! Random bit-vectors with validity tracking.
//!
//! A [`Distribution`] pairs a bit-vector expression over uniformly random
//! input bits with a 1-bit `valid` predicate over the same bits: draws where
//! `valid` is false are rejected, which is how non-dyadic weights are
//! expressed with fair bits.
//!
//! Combining two distributions either observes the same draw twice (their
//! `valid` predicates are identical) or two independent draws (their inputs
//! are disjoint); anything else is a programmer error and panics.
//!
//! ```
//! use coins_rs::distribution::dist;
//! use coins_rs::utils::ratio;
//!
//! let die = dist(&[ratio(1, 6), ratio(1, 2), ratio(1, 3)], "die");
//! assert_eq!(die.freqs(), vec![ratio(1, 6), ratio(1, 2), ratio(1, 3)]);
//! assert_eq!((die.bit(0) | die.bit(1)).prob(), ratio(2, 3));
//! ```

use std::collections::BTreeSet;
use std::ops::{Add, BitAnd, BitOr, BitXor, Deref, Not, Range};

use log::debug;
use num_bigint::BigInt;
use num_integer::Integer;
use num_rational::BigRational;
use num_traits::{One, Signed, ToPrimitive, Zero};

use crate::compile::count;
use crate::expr::BvExpr;
use crate::utils::fresh_name;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Distribution {
    expr: BvExpr,
    valid: BvExpr,
}

/// A 1-bit [`Distribution`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Coin(Distribution);

/// Right-hand side of a binary operator on distributions.
#[derive(Debug, Clone)]
pub enum Operand {
    Constant(u64),
    Random(Distribution),
}

impl From<u64> for Operand {
    fn from(value: u64) -> Self {
        Operand::Constant(value)
    }
}

impl From<Distribution> for Operand {
    fn from(dist: Distribution) -> Self {
        Operand::Random(dist)
    }
}

impl From<&Distribution> for Operand {
    fn from(dist: &Distribution) -> Self {
        Operand::Random(dist.clone())
    }
}

impl From<Coin> for Operand {
    fn from(coin: Coin) -> Self {
        Operand::Random(coin.0)
    }
}

impl From<&Coin> for Operand {
    fn from(coin: &Coin) -> Self {
        Operand::Random(coin.0.clone())
    }
}

/// Both operands observe the same draw.
pub fn same_coins(left: &Distribution, right: &Distribution) -> bool {
    left.valid == right.valid
}

/// The operands share no random bits.
pub fn unrelated_coins(left: &Distribution, right: &Distribution) -> bool {
    left.inputs().is_disjoint(&right.inputs())
}

fn combine(left: &Distribution, right: Operand, op: fn(&BvExpr, &BvExpr) -> BvExpr) -> Distribution {
    match right {
        Operand::Constant(value) => {
            let width = left.size();
            assert!(
                width >= 64 || value >> width == 0,
                "constant {} does not fit into {} bits",
                value,
                width
            );
            let constant = BvExpr::constant(width, value);
            Distribution::new(op(&left.expr, &constant), left.valid.clone())
        }
        Operand::Random(right) => {
            let expr = op(&left.expr, &right.expr);
            if same_coins(left, &right) {
                return Distribution::new(expr, left.valid.clone());
            }
            assert!(
                unrelated_coins(left, &right),
                "operands share random inputs but not their validity"
            );
            Distribution::new(expr, &left.valid & &right.valid)
        }
    }
}

// Constructors
impl Distribution {
    pub fn new(expr: BvExpr, valid: BvExpr) -> Self {
        assert_eq!(valid.size(), 1, "validity must be a single bit");
        Self { expr, valid }
    }

    /// A distribution whose every draw is valid.
    pub fn certain(expr: BvExpr) -> Self {
        Self::new(expr, BvExpr::constant(1, 1))
    }
}

// Getters
impl Distribution {
    pub fn expr(&self) -> &BvExpr {
        &self.expr
    }

    pub fn valid(&self) -> &BvExpr {
        &self.valid
    }

    pub fn output(&self) -> &str {
        self.expr.output()
    }

    pub fn size(&self) -> usize {
        self.expr.size()
    }

    /// The random bits the distribution is drawn from.
    pub fn inputs(&self) -> BTreeSet<String> {
        let mut inputs = self.expr.inputs();
        inputs.extend(self.valid.inputs());
        inputs
    }

    /// All random bits, concatenated in name order.
    pub fn coins(&self) -> BvExpr {
        let atoms: Vec<BvExpr> = self
            .inputs()
            .iter()
            .map(|name| {
                let width = self.expr.input_width(name).or_else(|| self.valid.input_width(name));
                BvExpr::atom(width.unwrap_or_default(), name)
            })
            .collect();
        match atoms.split_first() {
            Some((first, rest)) => rest.iter().fold(first.clone(), |acc, a| acc.concat(a)),
            None => BvExpr::constant(0, 0),
        }
    }
}

// Transformations
impl Distribution {
    pub fn bit(&self, i: usize) -> Coin {
        Coin::new(Distribution::new(self.expr.index(i), self.valid.clone()))
    }

    pub fn slice(&self, range: Range<usize>) -> Distribution {
        Distribution::new(self.expr.slice(range), self.valid.clone())
    }

    /// Maps the drawn value through `f`, keeping the validity.
    pub fn apply(&self, f: impl FnOnce(&BvExpr) -> BvExpr) -> Distribution {
        Distribution::new(f(&self.expr), self.valid.clone())
    }

    /// Restricts the draws to those satisfying `pred`.
    pub fn condition(&self, pred: &BvExpr) -> Distribution {
        Distribution::new(self.expr.clone(), pred & &self.valid)
    }

    /// `self` in the low bits, `other` in the high bits.
    pub fn concat(&self, other: &Distribution) -> Distribution {
        combine(self, other.into(), |a, b| a.concat(b))
    }

    pub fn with_output(&self, name: &str) -> Distribution {
        Distribution::new(self.expr.with_output(name), self.valid.clone())
    }

    /// Probability of each bit being set.
    pub fn freqs(&self) -> Vec<BigRational> {
        (0..self.size()).map(|i| self.bit(i).prob()).collect()
    }

    pub fn lt(&self, rhs: impl Into<Operand>) -> Coin {
        Coin::new(combine(self, rhs.into(), |a, b| a.lt(b)))
    }

    pub fn le(&self, rhs: impl Into<Operand>) -> Coin {
        Coin::new(combine(self, rhs.into(), |a, b| a.le(b)))
    }

    pub fn gt(&self, rhs: impl Into<Operand>) -> Coin {
        Coin::new(combine(self, rhs.into(), |a, b| a.gt(b)))
    }

    pub fn ge(&self, rhs: impl Into<Operand>) -> Coin {
        Coin::new(combine(self, rhs.into(), |a, b| a.ge(b)))
    }

    pub fn equals(&self, rhs: impl Into<Operand>) -> Coin {
        Coin::new(combine(self, rhs.into(), |a, b| a.equals(b)))
    }

    pub fn not_equals(&self, rhs: impl Into<Operand>) -> Coin {
        Coin::new(combine(self, rhs.into(), |a, b| a.not_equals(b)))
    }
}

impl Coin {
    pub fn new(dist: Distribution) -> Self {
        assert_eq!(dist.size(), 1, "a coin is a single bit");
        Self(dist)
    }

    /// Exact probability of heads, given a valid draw.
    pub fn prob(&self) -> BigRational {
        let top = count(&(&self.0.expr & &self.0.valid));
        let bot = count(&self.0.valid);
        assert!(!bot.is_zero(), "no draw satisfies the validity predicate");
        top / bot
    }

    pub fn into_inner(self) -> Distribution {
        self.0
    }
}

impl Deref for Coin {
    type Target = Distribution;

    fn deref(&self) -> &Distribution {
        &self.0
    }
}

impl From<Coin> for Distribution {
    fn from(coin: Coin) -> Self {
        coin.0
    }
}

macro_rules! binop {
    ($trait:ident, $method:ident, $op:expr) => {
        impl<R: Into<Operand>> $trait<R> for &Distribution {
            type Output = Distribution;

            fn $method(self, rhs: R) -> Distribution {
                combine(self, rhs.into(), $op)
            }
        }

        impl<R: Into<Operand>> $trait<R> for Distribution {
            type Output = Distribution;

            fn $method(self, rhs: R) -> Distribution {
                combine(&self, rhs.into(), $op)
            }
        }

        impl<R: Into<Operand>> $trait<R> for &Coin {
            type Output = Coin;

            fn $method(self, rhs: R) -> Coin {
                Coin::new(combine(&self.0, rhs.into(), $op))
            }
        }

        impl<R: Into<Operand>> $trait<R> for Coin {
            type Output = Coin;

            fn $method(self, rhs: R) -> Coin {
                Coin::new(combine(&self.0, rhs.into(), $op))
            }
        }
    };
}

binop!(Add, add, |a, b| a + b);
binop!(BitAnd, bitand, |a, b| a & b);
binop!(BitOr, bitor, |a, b| a | b);
binop!(BitXor, bitxor, |a, b| a ^ b);

impl Not for &Distribution {
    type Output = Distribution;

    fn not(self) -> Distribution {
        Distribution::new(!&self.expr, self.valid.clone())
    }
}

impl Not for Distribution {
    type Output = Distribution;

    fn not(self) -> Distribution {
        !&self
    }
}

impl Not for &Coin {
    type Output = Coin;

    fn not(self) -> Coin {
        Coin::new(!&self.0)
    }
}

impl Not for Coin {
    type Output = Coin;

    fn not(self) -> Coin {
        !&self
    }
}

/// `ceil(log2(n))`, at least 1.
fn word_len(n: &BigInt) -> usize {
    let bits = (n - BigInt::one()).bits() as usize;
    bits.max(1)
}

/// `var < k`, or constant true when `k` covers the whole word.
fn kmodels(var: &BvExpr, k: &BigInt) -> BvExpr {
    let width = var.size();
    if *k == BigInt::one() << width {
        return BvExpr::constant(1, 1);
    }
    let k = k.to_u64().unwrap_or(u64::MAX);
    var.lt(&BvExpr::constant(width, k))
}

/// A coin that lands heads with probability `prob`.
pub fn coin(prob: &BigRational, name: &str) -> Coin {
    assert!(
        !prob.is_negative() && *prob <= BigRational::one(),
        "probability {} outside [0, 1]",
        prob
    );
    let width = word_len(prob.denom());
    assert!(width <= 64, "denominator {} is too large", prob.denom());

    let var = BvExpr::atom(width, &fresh_name(name));
    let expr = kmodels(&var, prob.numer()).with_output(name);
    let valid = kmodels(&var, prob.denom());
    debug!("coin {}: {} over {} bits", name, prob, width);
    Coin::new(Distribution::new(expr, valid))
}

/// A one-hot outcome vector: bit `i` is set with probability `probs[i]`.
///
/// Weights are scaled to integers by the lcm of the denominators and laid
/// out as consecutive intervals of a uniform word; words past the total
/// weight are invalid.
pub fn dist(probs: &[BigRational], name: &str) -> Distribution {
    assert!(!probs.is_empty(), "empty distribution");
    assert!(probs.iter().all(|p| !p.is_negative()), "negative probability");

    let lcm = probs
        .iter()
        .fold(BigInt::one(), |acc, p| acc.lcm(p.denom()));
    let weights: Vec<BigInt> = probs
        .iter()
        .map(|p| (p * BigRational::from_integer(lcm.clone())).to_integer())
        .collect();
    let total: BigInt = weights.iter().sum();
    assert!(!total.is_zero(), "all weights are zero");

    let width = word_len(&total);
    assert!(width <= 64, "total weight {} is too large", total);
    let word = BvExpr::atom(width, &fresh_name(name));

    let mut lo = BigInt::zero();
    let mut bits: Vec<BvExpr> = Vec::with_capacity(weights.len());
    for w in &weights {
        let hi = &lo + w;
        let above = !kmodels(&word, &lo);
        bits.push(&above & &kmodels(&word, &hi));
        lo = hi;
    }
    let expr = bits
        .iter()
        .skip(1)
        .fold(bits[0].clone(), |acc, b| acc.concat(b))
        .with_output(name);
    let valid = kmodels(&word, &total);
    debug!("dist {}: {} outcomes over {} bits", name, probs.len(), width);
    Distribution::new(expr, valid)
}

/// One-hot number of heads among `n` fair coins.
pub fn binomial(n: usize, name: &str) -> Distribution {
    assert!(n > 0, "binomial needs at least one coin");
    let width = word_len(&BigInt::from(n + 1));
    let flips = BvExpr::atom(n, &fresh_name(name));

    let sum = (0..n)
        .map(|i| flips.index(i).resize(width))
        .reduce(|acc, b| &acc + &b)
        .unwrap_or_else(|| BvExpr::constant(width, 0));
    let outcomes: Vec<BvExpr> = (0..=n as u64)
        .map(|k| sum.equals(&BvExpr::constant(width, k)))
        .collect();
    let expr = outcomes
        .iter()
        .skip(1)
        .fold(outcomes[0].clone(), |acc, b| acc.concat(b))
        .with_output(name);
    Distribution::certain(expr)
}
