//! Single-output unsigned bit-vector expressions.
//!
//! A [`BvExpr`] is a combinational [`Circuit`] with exactly one output port.
//! Binary operators share same-named inputs, so `x + x` reads `x` once.
//!
//! ```
//! use coins_rs::expr::BvExpr;
//!
//! let x = BvExpr::atom(2, "x");
//! let y = BvExpr::constant(2, 3);
//! let e = x.lt(&y);
//! assert_eq!(e.size(), 1);
//! assert_eq!(e.inputs().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::ops::{Add, BitAnd, BitOr, BitXor, Not, Range};

use crate::circuit::{Assignment, Circuit};
use crate::error::Result;
use crate::network::Network;
use crate::signal::Signal;
use crate::utils::fresh_name;

#[derive(Clone, Eq, PartialEq, Hash)]
pub struct BvExpr {
    circ: Circuit,
}

impl Debug for BvExpr {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BvExpr")
            .field("output", &self.output())
            .field("size", &self.size())
            .field("inputs", &self.inputs())
            .finish()
    }
}

// Constructors
impl BvExpr {
    /// Wraps a combinational circuit with a single output.
    pub fn from_circuit(circ: Circuit) -> Self {
        assert_eq!(circ.outputs().len(), 1, "expression needs exactly one output");
        assert!(circ.latches().is_empty(), "expression must be combinational");
        Self { circ }
    }

    /// Free `width`-bit variable `name`.
    pub fn atom(width: usize, name: &str) -> Self {
        let circ = Circuit::identity(width, name).relabel_outputs([(name, fresh_name("expr"))]);
        Self::from_circuit(circ)
    }

    /// `value` truncated to `width` bits.
    pub fn constant(width: usize, value: u64) -> Self {
        let bits = crate::circuit::from_int(value, width);
        Self::from_circuit(Circuit::source(&bits, &fresh_name("expr")))
    }

    /// Constant from explicit bits.
    pub fn from_bits(bits: &[bool]) -> Self {
        Self::from_circuit(Circuit::source(bits, &fresh_name("expr")))
    }
}

// Getters
impl BvExpr {
    pub fn circuit(&self) -> &Circuit {
        &self.circ
    }

    pub fn into_circuit(self) -> Circuit {
        self.circ
    }

    pub fn output(&self) -> &str {
        self.circ
            .output_ports()
            .keys()
            .next()
            .map(String::as_str)
            .unwrap_or_default()
    }

    /// Output width.
    pub fn size(&self) -> usize {
        self.circ.output_ports().values().next().map_or(0, Vec::len)
    }

    pub fn inputs(&self) -> BTreeSet<String> {
        self.circ.inputs()
    }

    pub fn input_width(&self, name: &str) -> Option<usize> {
        self.circ.input_width(name)
    }

    pub fn with_output(&self, name: &str) -> Self {
        if self.output() == name {
            return self.clone();
        }
        Self::from_circuit(self.circ.relabel_outputs([(self.output(), name)]))
    }

    /// Evaluates the expression; unknown inputs are ignored.
    pub fn eval(&self, inputs: &Assignment) -> Result<Vec<bool>> {
        let (mut outputs, _) = self.circ.eval(inputs, &Assignment::new())?;
        Ok(outputs.remove(self.output()).unwrap_or_default())
    }
}

// Lifting
impl BvExpr {
    fn unary(&self, f: impl FnOnce(&mut Network, &[Signal]) -> Vec<Signal>) -> BvExpr {
        let mut net = Network::new();
        let inputs = net.bind_inputs(&self.circ);
        let imported = net.import(&self.circ, &inputs, &BTreeMap::new());
        let bits = &imported.outputs[self.output()];
        let result = f(&mut net, bits);
        let outputs = BTreeMap::from([(fresh_name("expr"), result)]);
        BvExpr::from_circuit(net.finish(outputs, BTreeMap::new()))
    }

    fn binary(
        &self,
        other: &BvExpr,
        f: impl FnOnce(&mut Network, &[Signal], &[Signal]) -> Vec<Signal>,
    ) -> BvExpr {
        let mut net = Network::new();
        let inputs = net.bind_inputs(&self.circ);
        let left = net.import(&self.circ, &inputs, &BTreeMap::new());
        let inputs = net.bind_inputs(&other.circ);
        let right = net.import(&other.circ, &inputs, &BTreeMap::new());
        let result = f(&mut net, &left.outputs[self.output()], &right.outputs[other.output()]);
        let outputs = BTreeMap::from([(fresh_name("expr"), result)]);
        BvExpr::from_circuit(net.finish(outputs, BTreeMap::new()))
    }

    fn bitwise(&self, other: &BvExpr, op: fn(&mut Network, Signal, Signal) -> Signal) -> BvExpr {
        assert_eq!(self.size(), other.size(), "bitwise operands differ in width");
        self.binary(other, |net, a, b| a.iter().zip(b).map(|(&x, &y)| op(net, x, y)).collect())
    }
}

// Comparisons and structure
impl BvExpr {
    pub fn lt(&self, other: &BvExpr) -> BvExpr {
        assert_eq!(self.size(), other.size(), "compared operands differ in width");
        self.binary(other, |net, a, b| vec![net.ult(a, b)])
    }

    pub fn le(&self, other: &BvExpr) -> BvExpr {
        !other.lt(self)
    }

    pub fn gt(&self, other: &BvExpr) -> BvExpr {
        other.lt(self)
    }

    pub fn ge(&self, other: &BvExpr) -> BvExpr {
        !self.lt(other)
    }

    pub fn equals(&self, other: &BvExpr) -> BvExpr {
        assert_eq!(self.size(), other.size(), "compared operands differ in width");
        self.binary(other, |net, a, b| vec![net.equals(a, b)])
    }

    pub fn not_equals(&self, other: &BvExpr) -> BvExpr {
        !self.equals(other)
    }

    /// `if cond { then } else { other }`; `cond` is 1-bit.
    pub fn ite(cond: &BvExpr, then: &BvExpr, other: &BvExpr) -> BvExpr {
        assert_eq!(cond.size(), 1, "condition must be a single bit");
        assert_eq!(then.size(), other.size(), "branches differ in width");
        let branches = then.binary(other, |_, a, b| a.iter().chain(b).copied().collect());
        let width = then.size();
        cond.binary(&branches, |net, c, ab| net.mux_words(c[0], &ab[..width], &ab[width..]))
    }

    /// `self` occupies the low bits, `other` the high ones.
    pub fn concat(&self, other: &BvExpr) -> BvExpr {
        self.binary(other, |_, a, b| a.iter().chain(b).copied().collect())
    }

    pub fn index(&self, i: usize) -> BvExpr {
        assert!(i < self.size(), "bit {} out of range for width {}", i, self.size());
        self.unary(|_, a| vec![a[i]])
    }

    pub fn slice(&self, range: Range<usize>) -> BvExpr {
        assert!(range.end <= self.size(), "slice {:?} out of range", range);
        self.unary(|_, a| a[range].to_vec())
    }

    /// Zero-extends or truncates to `width`.
    pub fn resize(&self, width: usize) -> BvExpr {
        self.unary(|_, a| {
            let mut bits = a.to_vec();
            bits.resize(width, Signal::zero());
            bits
        })
    }

    /// Reduction OR: 1 when any bit is set.
    pub fn any(&self) -> BvExpr {
        self.unary(|net, a| {
            let none = a.iter().fold(Signal::one(), |acc, &s| net.and(acc, !s));
            vec![!none]
        })
    }
}

impl Add for &BvExpr {
    type Output = BvExpr;

    fn add(self, rhs: &BvExpr) -> BvExpr {
        assert_eq!(self.size(), rhs.size(), "summands differ in width");
        self.binary(rhs, |net, a, b| net.add(a, b))
    }
}

impl BitAnd for &BvExpr {
    type Output = BvExpr;

    fn bitand(self, rhs: &BvExpr) -> BvExpr {
        self.bitwise(rhs, Network::and)
    }
}

impl BitOr for &BvExpr {
    type Output = BvExpr;

    fn bitor(self, rhs: &BvExpr) -> BvExpr {
        self.bitwise(rhs, Network::or)
    }
}

impl BitXor for &BvExpr {
    type Output = BvExpr;

    fn bitxor(self, rhs: &BvExpr) -> BvExpr {
        self.bitwise(rhs, Network::xor)
    }
}

impl Not for &BvExpr {
    type Output = BvExpr;

    fn not(self) -> BvExpr {
        self.unary(|_, a| a.iter().map(|&s| !s).collect())
    }
}

impl Not for BvExpr {
    type Output = BvExpr;

    fn not(self) -> BvExpr {
        !&self
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::circuit::{from_int, to_int};

    fn eval_int(e: &BvExpr, pairs: &[(&str, u64)]) -> u64 {
        let inputs = pairs
            .iter()
            .map(|&(name, value)| (name.to_string(), from_int(value, e.input_width(name).unwrap())))
            .collect();
        to_int(&e.eval(&inputs).unwrap())
    }

    #[test]
    fn test_add_wraps() {
        let x = BvExpr::atom(3, "x");
        let y = BvExpr::atom(3, "y");
        let sum = &x + &y;
        assert_eq!(eval_int(&sum, &[("x", 5), ("y", 2)]), 7);
        assert_eq!(eval_int(&sum, &[("x", 5), ("y", 4)]), 1);
    }

    #[test]
    fn test_comparisons() {
        let x = BvExpr::atom(3, "x");
        let four = BvExpr::constant(3, 4);
        for v in 0..8 {
            assert_eq!(eval_int(&x.lt(&four), &[("x", v)]), (v < 4) as u64);
            assert_eq!(eval_int(&x.le(&four), &[("x", v)]), (v <= 4) as u64);
            assert_eq!(eval_int(&x.gt(&four), &[("x", v)]), (v > 4) as u64);
            assert_eq!(eval_int(&x.ge(&four), &[("x", v)]), (v >= 4) as u64);
            assert_eq!(eval_int(&x.equals(&four), &[("x", v)]), (v == 4) as u64);
            assert_eq!(eval_int(&x.not_equals(&four), &[("x", v)]), (v != 4) as u64);
        }
    }

    #[test]
    fn test_shared_inputs() {
        let x = BvExpr::atom(2, "x");
        let e = &x ^ &x;
        assert_eq!(e.inputs().len(), 1);
        assert_eq!(e.circuit().num_ands(), 0);
        assert_eq!(eval_int(&e, &[("x", 3)]), 0);
    }

    #[test]
    fn test_concat_and_slices() {
        let lo = BvExpr::constant(2, 0b01);
        let hi = BvExpr::constant(1, 1);
        let e = lo.concat(&hi);
        assert_eq!(e.size(), 3);
        assert_eq!(eval_int(&e, &[]), 0b101);
        assert_eq!(eval_int(&e.index(1), &[]), 0);
        assert_eq!(eval_int(&e.slice(1..3), &[]), 0b10);
        assert_eq!(eval_int(&e.resize(5), &[]), 0b101);
        assert_eq!(eval_int(&e.resize(2), &[]), 0b01);
    }

    #[test]
    fn test_ite() {
        let c = BvExpr::atom(1, "c");
        let a = BvExpr::constant(2, 1);
        let b = BvExpr::constant(2, 2);
        let e = BvExpr::ite(&c, &a, &b);
        assert_eq!(eval_int(&e, &[("c", 1)]), 1);
        assert_eq!(eval_int(&e, &[("c", 0)]), 2);
    }

    #[test]
    fn test_with_output() {
        let x = BvExpr::atom(2, "x").with_output("y");
        assert_eq!(x.output(), "y");
        assert_eq!(x.inputs(), BTreeSet::from(["x".to_string()]));
    }

    #[test]
    #[should_panic(expected = "differ in width")]
    fn test_width_mismatch() {
        let _ = &BvExpr::atom(2, "x") + &BvExpr::atom(3, "y");
    }
}
