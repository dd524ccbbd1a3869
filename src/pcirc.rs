//! Probabilistic circuits.
//!
//! A [`PCirc`] is a [`FiniteFunc`] with one reserved input, the coin channel,
//! whose bit `i` is an independent coin that lands 1 with probability
//! `coin_biases[i]`. Composition keeps exactly one coin channel: the second
//! operand's channel is first moved to a fresh name, then both are fed from a
//! single wider input covering the two bias vectors in operand order.
//!
//! ```
//! use std::collections::BTreeMap;
//!
//! use coins_rs::encoder::MergeOrder;
//! use coins_rs::expr::BvExpr;
//! use coins_rs::pcirc::pcirc;
//! use coins_rs::utils::ratio;
//!
//! let x = BvExpr::atom(2, "x");
//! let die = BvExpr::atom(2, "die");
//! let func = (&x + &die).with_output("y");
//!
//! let weights = vec![(0u64.into(), ratio(1, 6)), (1u64.into(), ratio(1, 3)), (2u64.into(), ratio(1, 2))];
//! let dist_map = BTreeMap::from([("die".to_string(), weights)]);
//! let circ = pcirc(func, &dist_map, MergeOrder::default()).unwrap();
//!
//! assert_eq!(circ.inputs().len(), 1);
//! assert_eq!(circ.coin_biases(), &[ratio(1, 3), ratio(1, 2)]);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{BitOr, Shl, Shr};

use log::debug;
use num_rational::BigRational;
use num_traits::ToPrimitive;
use rand::Rng;

use crate::circuit::{Assignment, Circuit, Wiring};
use crate::encoder::{encode, MergeOrder};
use crate::encoding::Value;
use crate::error::{CoinsError, Result};
use crate::expr::BvExpr;
use crate::func::{FiniteFunc, Values};
use crate::network::Network;
use crate::utils::fresh_name;

/// Default name of the coin channel.
pub const COINS_ID: &str = "##coins";

/// Weighted support of one input: `(value, weight)` pairs, unnormalized.
pub type Weights = Vec<(Value, BigRational)>;

/// Input name to the distribution driving it.
pub type DistMap = BTreeMap<String, Weights>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct PCirc {
    func: FiniteFunc,
    coin_biases: Vec<BigRational>,
    coins_id: String,
}

impl From<FiniteFunc> for PCirc {
    fn from(func: FiniteFunc) -> Self {
        Self::deterministic(func)
    }
}

impl From<Circuit> for PCirc {
    fn from(circ: Circuit) -> Self {
        Self::deterministic(FiniteFunc::new(circ))
    }
}

impl From<BvExpr> for PCirc {
    fn from(expr: BvExpr) -> Self {
        Self::deterministic(FiniteFunc::from(expr))
    }
}

impl From<&PCirc> for PCirc {
    fn from(pcirc: &PCirc) -> Self {
        pcirc.clone()
    }
}

// Constructors
impl PCirc {
    /// Checks that the coin channel exists and matches the biases.
    pub fn new(func: impl Into<FiniteFunc>, coin_biases: Vec<BigRational>, coins_id: &str) -> Result<Self> {
        let func = func.into();
        if !coin_biases.is_empty() {
            let width = func
                .circ()
                .input_width(coins_id)
                .ok_or_else(|| CoinsError::MissingCoinsInput(coins_id.to_string()))?;
            if width != coin_biases.len() {
                return Err(CoinsError::CoinWidthMismatch {
                    expected: coin_biases.len(),
                    actual: width,
                });
            }
        }
        Ok(Self {
            func,
            coin_biases,
            coins_id: coins_id.to_string(),
        })
    }

    pub fn deterministic(func: impl Into<FiniteFunc>) -> Self {
        Self {
            func: func.into(),
            coin_biases: Vec::new(),
            coins_id: COINS_ID.to_string(),
        }
    }

    fn with_func(&self, func: FiniteFunc) -> Self {
        Self {
            func,
            coin_biases: self.coin_biases.clone(),
            coins_id: self.coins_id.clone(),
        }
    }
}

// Getters
impl PCirc {
    pub fn func(&self) -> &FiniteFunc {
        &self.func
    }

    pub fn circ(&self) -> &Circuit {
        self.func.circ()
    }

    pub fn coin_biases(&self) -> &[BigRational] {
        &self.coin_biases
    }

    pub fn coins_id(&self) -> &str {
        &self.coins_id
    }

    pub fn has_coins(&self) -> bool {
        !self.coin_biases.is_empty()
    }

    pub fn num_coins(&self) -> usize {
        self.coin_biases.len()
    }

    /// Inputs, without the coin channel.
    pub fn inputs(&self) -> BTreeSet<String> {
        let mut inputs = self.func.inputs();
        inputs.remove(&self.coins_id);
        inputs
    }

    pub fn outputs(&self) -> BTreeSet<String> {
        self.func.outputs()
    }

    pub fn latches(&self) -> BTreeSet<String> {
        self.func.latches()
    }

    pub fn latch2init(&self) -> Assignment {
        self.func.latch2init()
    }
}

/// Feeds the coin channels `parts` (name, width) from one input `coins_id`,
/// in order.
fn coin_splitter(coins_id: &str, parts: &[(String, usize)]) -> Circuit {
    let mut net = Network::new();
    let total = parts.iter().map(|(_, w)| w).sum();
    let coins = net.input(coins_id, total);
    let mut outputs = BTreeMap::new();
    let mut start = 0;
    for (name, width) in parts {
        outputs.insert(name.clone(), coins[start..start + width].to_vec());
        start += width;
    }
    net.finish(outputs, BTreeMap::new())
}

fn merge_coins(func: FiniteFunc, left: &PCirc, right: &PCirc, coins_id: &str) -> PCirc {
    let mut parts = Vec::new();
    let mut biases = Vec::new();
    for side in [left, right] {
        if side.has_coins() {
            parts.push((side.coins_id.clone(), side.num_coins()));
            biases.extend(side.coin_biases.iter().cloned());
        }
    }

    let func = match parts.as_slice() {
        [] => func,
        [(name, _)] if name == coins_id => func,
        [(name, _)] => func.relabel_inputs(&[(name.as_str(), coins_id)]),
        _ => FiniteFunc::new(coin_splitter(coins_id, &parts)).then(&func),
    };
    PCirc {
        func,
        coin_biases: biases,
        coins_id: coins_id.to_string(),
    }
}

/// Moves the coin channel of `circ` out of the way before composition.
fn canon(circ: impl Into<PCirc>) -> PCirc {
    let circ: PCirc = circ.into();
    circ.with_coins_id(None)
}

// Composition
impl PCirc {
    /// Renames the coin channel; `None` picks a fresh name.
    pub fn with_coins_id(&self, name: Option<&str>) -> PCirc {
        let name = name.map_or_else(|| fresh_name("coins"), str::to_string);
        let func = if self.has_coins() {
            self.func.relabel_inputs(&[(self.coins_id.as_str(), name.as_str())])
        } else {
            self.func.clone()
        };
        PCirc {
            func,
            coin_biases: self.coin_biases.clone(),
            coins_id: name,
        }
    }

    /// `self` feeds `other`.
    pub fn then(&self, other: impl Into<PCirc>) -> PCirc {
        let other = canon(other);
        let func = self.func.then(&other.func);
        merge_coins(func, self, &other, &self.coins_id)
    }

    /// `other` feeds `self`.
    pub fn after(&self, other: impl Into<PCirc>) -> PCirc {
        let other = canon(other);
        let func = other.func.then(&self.func);
        merge_coins(func, &other, self, &self.coins_id)
    }

    pub fn par(&self, other: impl Into<PCirc>) -> PCirc {
        let other = canon(other);
        let func = self.func.par(&other.func);
        merge_coins(func, self, &other, &self.coins_id)
    }

    /// Conjoins `pred` into the validity of the underlying function.
    pub fn assume(&self, pred: &BvExpr) -> PCirc {
        self.with_func(self.func.assume(pred))
    }

    /// Renames inputs. The coin channel can only be renamed through
    /// [`PCirc::with_coins_id`].
    pub fn relabel_inputs(&self, pairs: &[(&str, &str)]) -> Result<PCirc> {
        if pairs.iter().any(|&(old, new)| old == self.coins_id || new == self.coins_id) {
            return Err(CoinsError::ReservedCoinsRelabel(self.coins_id.clone()));
        }
        Ok(self.with_func(self.func.relabel_inputs(pairs)))
    }

    pub fn relabel_outputs(&self, pairs: &[(&str, &str)]) -> PCirc {
        self.with_func(self.func.relabel_outputs(pairs))
    }

    pub fn relabel_latches(&self, pairs: &[(&str, &str)]) -> PCirc {
        self.with_func(self.func.relabel_latches(pairs))
    }

    /// Feeds outputs back into inputs; every wired input must be free.
    pub fn loopback(&self, wirings: &[Wiring]) -> PCirc {
        let inputs = self.inputs();
        for w in wirings {
            assert!(inputs.contains(&w.input), "'{}' is not a free input", w.input);
        }
        self.with_func(self.func.loopback(wirings))
    }

    /// Replicates the circuit `horizon` times. The per-step coin channels are
    /// merged back into one channel of `num_coins * horizon` bits.
    pub fn unroll(&self, horizon: usize, init: bool, omit_latches: bool, only_last_outputs: bool) -> PCirc {
        let func = self.func.unroll(horizon, init, omit_latches, only_last_outputs);
        if !self.has_coins() {
            return self.with_func(func);
        }

        let parts: Vec<(String, usize)> = (0..horizon)
            .map(|t| {
                let name = format!("{}##time_{}", self.coins_id, t);
                assert!(func.circ().input_width(&name).is_some(), "coin channel '{}' is missing", name);
                (name, self.num_coins())
            })
            .collect();
        let func = FiniteFunc::new(coin_splitter(&self.coins_id, &parts)).then(&func);
        let biases: Vec<BigRational> = (0..horizon).flat_map(|_| self.coin_biases.iter().cloned()).collect();
        debug!("unrolled {} steps, {} coins", horizon, biases.len());
        PCirc {
            func,
            coin_biases: biases,
            coins_id: self.coins_id.clone(),
        }
    }

    /// Drives the inputs in `dist_map` with encoded distributions.
    pub fn randomize(&self, dist_map: &DistMap, order: MergeOrder) -> Result<PCirc> {
        let mut circ = Circuit::empty();
        let mut func_encodings = Vec::new();
        for name in dist_map.keys() {
            let width = self
                .circ()
                .input_width(name)
                .ok_or_else(|| CoinsError::UnknownInput(name.clone()))?;
            circ = circ.par(&Circuit::identity(width, name));
            func_encodings.push((name.clone(), self.func.input_encoding(name)));
        }
        let mut func = FiniteFunc::new(circ);
        for (name, encoding) in func_encodings {
            func = func.with_input_encoding(&name, encoding);
        }
        Ok(pcirc(func, dist_map, order)?.then(self))
    }
}

impl<T: Into<PCirc>> Shr<T> for &PCirc {
    type Output = PCirc;

    fn shr(self, rhs: T) -> PCirc {
        self.then(rhs)
    }
}

impl<T: Into<PCirc>> Shr<T> for PCirc {
    type Output = PCirc;

    fn shr(self, rhs: T) -> PCirc {
        self.then(rhs)
    }
}

impl<T: Into<PCirc>> Shl<T> for &PCirc {
    type Output = PCirc;

    fn shl(self, rhs: T) -> PCirc {
        self.after(rhs)
    }
}

impl<T: Into<PCirc>> BitOr<T> for &PCirc {
    type Output = PCirc;

    fn bitor(self, rhs: T) -> PCirc {
        self.par(rhs)
    }
}

impl<T: Into<PCirc>> BitOr<T> for PCirc {
    type Output = PCirc;

    fn bitor(self, rhs: T) -> PCirc {
        self.par(rhs)
    }
}

// Simulation
impl PCirc {
    fn sample_coins<R: Rng + ?Sized>(&self, rng: &mut R) -> Vec<bool> {
        self.coin_biases
            .iter()
            .map(|bias| rng.gen_bool(bias.to_f64().unwrap_or_default().clamp(0.0, 1.0)))
            .collect()
    }

    fn with_sampled_coins<R: Rng + ?Sized>(&self, rng: &mut R, inputs: &Values) -> Values {
        let mut inputs = inputs.clone();
        if self.has_coins() && !inputs.contains_key(&self.coins_id) {
            inputs.insert(self.coins_id.clone(), Value::Bits(self.sample_coins(rng)));
        }
        inputs
    }

    /// One step. Coins are drawn from the thread-local generator unless the
    /// coin channel is part of `inputs`.
    pub fn call(&self, inputs: &Values, latches: Option<&Assignment>) -> Result<(Values, Assignment)> {
        self.call_with(&mut rand::thread_rng(), inputs, latches)
    }

    /// Like [`PCirc::call`], drawing coins from `rng`.
    pub fn call_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        inputs: &Values,
        latches: Option<&Assignment>,
    ) -> Result<(Values, Assignment)> {
        let inputs = self.with_sampled_coins(rng, inputs);
        self.func.call(&inputs, latches)
    }

    /// Several steps from the initial latch values, sampling missing coins.
    pub fn simulate<R: Rng + ?Sized>(&self, rng: &mut R, steps: &[Values]) -> Result<Vec<(Values, Assignment)>> {
        let steps: Vec<Values> = steps.iter().map(|s| self.with_sampled_coins(rng, s)).collect();
        self.func.simulate(&steps)
    }
}

/// Lifts `func` to a probabilistic circuit whose inputs in `dist_map` are
/// driven by encoded distributions.
pub fn pcirc(func: impl Into<FiniteFunc>, dist_map: &DistMap, order: MergeOrder) -> Result<PCirc> {
    let func = func.into();
    let mut gadgets: Option<PCirc> = None;
    for (name, weights) in dist_map {
        let width = func
            .circ()
            .input_width(name)
            .ok_or_else(|| CoinsError::UnknownInput(name.clone()))?;
        let encoding = func.input_encoding(name);
        let weights = weights
            .iter()
            .map(|(value, weight)| Ok((encoding.encode(name, value, width)?, weight.clone())))
            .collect::<Result<Vec<_>>>()?;

        let fragment = encode(name, width, &weights, COINS_ID, order);
        let gadget = PCirc::new(fragment.circ, fragment.coin_biases, &fragment.coins_id)?;
        gadgets = Some(match gadgets {
            Some(acc) => acc.par(gadget),
            None => gadget,
        });
    }
    Ok(match gadgets {
        Some(gadgets) => gadgets.then(func),
        None => PCirc::deterministic(func),
    })
}

/// A probabilistic circuit with a single output.
#[derive(Debug, Clone)]
pub struct RandomVar {
    pcirc: PCirc,
}

impl RandomVar {
    pub fn new(pcirc: PCirc) -> Self {
        assert_eq!(pcirc.outputs().len(), 1, "a random variable has exactly one output");
        Self { pcirc }
    }

    pub fn pcirc(&self) -> &PCirc {
        &self.pcirc
    }

    pub fn output(&self) -> String {
        self.pcirc.outputs().into_iter().next().unwrap_or_default()
    }

    pub fn with_output(&self, name: &str) -> RandomVar {
        let output = self.output();
        RandomVar::new(self.pcirc.relabel_outputs(&[(output.as_str(), name)]))
    }

    pub fn assume(&self, pred: &BvExpr) -> RandomVar {
        RandomVar::new(self.pcirc.assume(pred))
    }

    /// Draws the variable once.
    pub fn call(&self, inputs: &Values, latches: Option<&Assignment>) -> Result<Value> {
        self.call_with(&mut rand::thread_rng(), inputs, latches)
    }

    pub fn call_with<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        inputs: &Values,
        latches: Option<&Assignment>,
    ) -> Result<Value> {
        let (mut outputs, _) = self.pcirc.call_with(rng, inputs, latches)?;
        let output = self.output();
        outputs
            .remove(&output)
            .ok_or(CoinsError::UnknownOutput(output))
    }
}

#[cfg(test)]
mod tests {
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use test_log::test;

    use super::*;
    use crate::circuit::from_int;
    use crate::encoding::Encoding;
    use crate::utils::ratio;

    fn faces() -> Encoding {
        Encoding::from_pairs([("one", 0), ("two", 1), ("three", 2), ("four", 3)])
    }

    fn die_weights() -> Weights {
        vec![
            ("one".into(), ratio(1, 6)),
            ("two".into(), ratio(2, 6)),
            ("three".into(), ratio(3, 6)),
        ]
    }

    fn die_func() -> FiniteFunc {
        let die = BvExpr::atom(2, "die");
        let x = BvExpr::atom(2, "x");
        FiniteFunc::from((&x + &die).with_output("y")).with_input_encoding("die", faces())
    }

    #[test]
    fn test_new_validates_coins() {
        let circ = Circuit::identity(2, "##coins");
        assert!(PCirc::new(circ.clone(), vec![ratio(1, 2); 2], COINS_ID).is_ok());
        assert_eq!(
            PCirc::new(circ.clone(), vec![ratio(1, 2); 3], COINS_ID).unwrap_err(),
            CoinsError::CoinWidthMismatch { expected: 3, actual: 2 }
        );
        assert_eq!(
            PCirc::new(circ, vec![ratio(1, 2)], "other").unwrap_err(),
            CoinsError::MissingCoinsInput("other".to_string())
        );
    }

    #[test]
    fn test_pcirc_with_encoding() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap();
        assert_eq!(circ.inputs(), BTreeSet::from(["x".to_string()]));
        assert_eq!(circ.outputs(), BTreeSet::from(["y".to_string()]));
        assert_eq!(circ.coin_biases(), &[ratio(1, 3), ratio(1, 2)]);
    }

    #[test]
    fn test_pcirc_unknown_input() {
        let dist_map = DistMap::from([("nope".to_string(), die_weights())]);
        let err = pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap_err();
        assert_eq!(err, CoinsError::UnknownInput("nope".to_string()));
    }

    #[test]
    fn test_randomize_matches_pcirc() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = PCirc::from(die_func()).randomize(&dist_map, MergeOrder::default()).unwrap();
        assert_eq!(circ.inputs(), BTreeSet::from(["x".to_string()]));
        assert_eq!(circ.num_coins(), 2);
    }

    #[test]
    fn test_par_merges_coin_channels() {
        let a = pcirc(
            FiniteFunc::from(BvExpr::atom(1, "a").with_output("oa")),
            &DistMap::from([("a".to_string(), vec![(0u64.into(), ratio(1, 4)), (1u64.into(), ratio(3, 4))])]),
            MergeOrder::default(),
        )
        .unwrap();
        let b = pcirc(
            FiniteFunc::from(BvExpr::atom(1, "b").with_output("ob")),
            &DistMap::from([("b".to_string(), vec![(0u64.into(), ratio(1, 3)), (1u64.into(), ratio(2, 3))])]),
            MergeOrder::default(),
        )
        .unwrap();

        let both = &a | &b;
        assert_eq!(both.coins_id(), a.coins_id());
        assert_eq!(both.coin_biases(), &[ratio(1, 4), ratio(1, 3)]);
        assert_eq!(both.circ().input_width(both.coins_id()), Some(2));
        assert!(both.inputs().is_empty());

        // Coin 0 drives `a`, coin 1 drives `b`; a set coin selects value 0.
        let inputs = Values::from([(both.coins_id().to_string(), Value::Bits(vec![true, false]))]);
        let (outputs, _) = both.call(&inputs, None).unwrap();
        assert_eq!(outputs["oa"], Value::Int(0));
        assert_eq!(outputs["ob"], Value::Int(1));
    }

    #[test]
    fn test_relabel_rejects_coins() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap();
        let err = circ.relabel_inputs(&[(COINS_ID, "c")]).unwrap_err();
        assert_eq!(err, CoinsError::ReservedCoinsRelabel(COINS_ID.to_string()));
        let err = circ.relabel_inputs(&[("x", COINS_ID)]).unwrap_err();
        assert_eq!(err, CoinsError::ReservedCoinsRelabel(COINS_ID.to_string()));
        assert_eq!(circ.inputs(), BTreeSet::from(["x".to_string()]));

        let moved = circ.with_coins_id(Some("c"));
        assert_eq!(moved.coins_id(), "c");
        assert_eq!(moved.circ().input_width("c"), Some(2));
        assert!(moved.relabel_inputs(&[("x", "z")]).unwrap().inputs().contains("z"));
    }

    #[test]
    fn test_unroll_repeats_biases() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap();
        let unrolled = circ.unroll(3, true, true, false);
        assert_eq!(unrolled.num_coins(), 6);
        assert_eq!(unrolled.circ().input_width(COINS_ID), Some(6));
        assert_eq!(unrolled.coin_biases()[4], ratio(1, 3));
        assert_eq!(unrolled.inputs().len(), 3);
    }

    #[test]
    fn test_call_with_explicit_coins() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = pcirc(die_func(), &dist_map, MergeOrder::default())
            .unwrap()
            .relabel_outputs(&[("y", "sum")]);

        // Coins 0b01 select "one" (code 0).
        let inputs = Values::from([
            ("x".to_string(), Value::Int(1)),
            (COINS_ID.to_string(), Value::Bits(from_int(0b01, 2))),
        ]);
        let (outputs, _) = circ.call(&inputs, None).unwrap();
        assert_eq!(outputs["sum"], Value::Int(1));
    }

    #[test]
    fn test_seeded_sampling_is_reproducible() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let var = RandomVar::new(pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap());
        let inputs = Values::from([("x".to_string(), Value::Int(0))]);

        let draw = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            (0..16)
                .map(|_| var.call_with(&mut rng, &inputs, None).unwrap())
                .collect::<Vec<_>>()
        };
        assert_eq!(draw(7), draw(7));
        assert!(draw(7).iter().all(|v| matches!(v, Value::Int(0..=2))));
    }

    #[test]
    fn test_loopback_requires_free_input() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap();
        let looped = circ.loopback(&[Wiring::new("x", "y")]);
        assert!(looped.inputs().is_empty());
        assert_eq!(looped.latches(), BTreeSet::from(["x".to_string()]));
    }

    #[test]
    #[should_panic(expected = "not a free input")]
    fn test_loopback_on_coins_panics() {
        let dist_map = DistMap::from([("die".to_string(), die_weights())]);
        let circ = pcirc(die_func(), &dist_map, MergeOrder::default()).unwrap();
        circ.loopback(&[Wiring::new(COINS_ID, "y")]);
    }
}
