//! Markov decision processes: circuits with some inputs driven by
//! distributions.
//!
//! Inputs registered in `input2dist` belong to the environment; the rest are
//! system actions. The finalized circuit (see [`Mdp::circuit`]) feeds every
//! distribution into its input and exposes the conjunction of their validity
//! predicates as output [`VALID_ID`].

use std::collections::{BTreeMap, BTreeSet};
use std::ops::{BitOr, Shl, Shr};

use log::debug;

use crate::circuit::{timed, Assignment, Circuit};
use crate::distribution::Distribution;
use crate::error::{CoinsError, Result};
use crate::expr::BvExpr;
use crate::network::Network;
use crate::signal::Signal;
use crate::solver::Solver;

/// Output carrying the joint validity of all environment inputs.
pub const VALID_ID: &str = "##valid";

#[derive(Debug, Clone)]
pub struct Mdp {
    circ: Circuit,
    input2dist: BTreeMap<String, Distribution>,
}

impl From<Circuit> for Mdp {
    fn from(circ: Circuit) -> Self {
        Mdp::new(circ, BTreeMap::new())
    }
}

impl From<BvExpr> for Mdp {
    fn from(expr: BvExpr) -> Self {
        Mdp::from(expr.into_circuit())
    }
}

impl From<Distribution> for Mdp {
    /// The identity over the distribution's output, driven by it.
    fn from(dist: Distribution) -> Self {
        let circ = Circuit::identity(dist.size(), dist.output());
        let name = dist.output().to_string();
        Mdp::new(circ, BTreeMap::from([(name, dist)]))
    }
}

impl From<&Mdp> for Mdp {
    fn from(mdp: &Mdp) -> Self {
        mdp.clone()
    }
}

impl Mdp {
    /// Every key of `input2dist` must be an input of `circ` of the
    /// distribution's width. Distributions are renamed to their key.
    pub fn new(circ: Circuit, input2dist: BTreeMap<String, Distribution>) -> Self {
        let input2dist = input2dist
            .into_iter()
            .map(|(name, dist)| {
                let width = match circ.input_width(&name) {
                    Some(width) => width,
                    None => panic!("environment input '{}' is not an input of the circuit", name),
                };
                assert_eq!(width, dist.size(), "distribution width mismatch on '{}'", name);
                let dist = if dist.output() == name { dist } else { dist.with_output(&name) };
                (name, dist)
            })
            .collect();
        Self { circ, input2dist }
    }
}

// Getters
impl Mdp {
    pub fn input2dist(&self) -> &BTreeMap<String, Distribution> {
        &self.input2dist
    }

    pub fn env_inputs(&self) -> BTreeSet<String> {
        self.input2dist.keys().cloned().collect()
    }

    /// System inputs: everything not driven by a distribution.
    pub fn inputs(&self) -> BTreeSet<String> {
        self.circ
            .inputs()
            .into_iter()
            .filter(|name| !self.input2dist.contains_key(name))
            .collect()
    }

    pub fn outputs(&self) -> BTreeSet<String> {
        self.circ.outputs()
    }

    /// The circuit with distributions substituted for environment inputs
    /// and their joint validity exposed as [`VALID_ID`]. Its inputs are the
    /// system inputs plus the distributions' coin inputs.
    pub fn circuit(&self) -> Circuit {
        assert!(
            !self.circ.outputs().contains(VALID_ID),
            "output '{}' is reserved",
            VALID_ID
        );
        let mut sources = Circuit::empty();
        let mut valid = BvExpr::constant(1, 1);
        for dist in self.input2dist.values() {
            sources = sources.par(dist.expr().circuit());
            valid = &valid & dist.valid();
        }
        let circ = sources.then(&self.circ);
        circ.par(&valid.with_output(VALID_ID).into_circuit())
    }
}

// Composition
impl Mdp {
    fn assert_env_disjoint(&self, other: &Mdp) {
        let shared: Vec<_> = self
            .input2dist
            .keys()
            .filter(|name| other.input2dist.contains_key(*name))
            .collect();
        assert!(shared.is_empty(), "environment inputs {:?} on both sides", shared);
    }

    fn merged_dists(&self, other: &Mdp) -> BTreeMap<String, Distribution> {
        let mut input2dist = self.input2dist.clone();
        input2dist.extend(other.input2dist.clone());
        input2dist
    }

    /// Sequential composition: `self` feeds `other`.
    pub fn then(&self, other: impl Into<Mdp>) -> Mdp {
        let other = other.into();
        self.assert_env_disjoint(&other);
        Mdp::new(self.circ.then(&other.circ), self.merged_dists(&other))
    }

    /// Sequential composition: `other` feeds `self`.
    pub fn after(&self, other: impl Into<Mdp>) -> Mdp {
        let other: Mdp = other.into();
        other.then(self)
    }

    pub fn par(&self, other: impl Into<Mdp>) -> Mdp {
        let other = other.into();
        self.assert_env_disjoint(&other);
        Mdp::new(self.circ.par(&other.circ), self.merged_dists(&other))
    }

    /// Closes the loop from `outputs` to the system `inputs` through latches.
    pub fn feedback(
        &self,
        inputs: &[&str],
        outputs: &[&str],
        initials: Option<&[Vec<bool>]>,
        latches: Option<&[&str]>,
        keep_outputs: bool,
    ) -> Mdp {
        let sys = self.inputs();
        for input in inputs {
            assert!(sys.contains(*input), "'{}' is not a system input", input);
        }
        let circ = self.circ.feedback(inputs, outputs, initials, latches, keep_outputs);
        Mdp::new(circ, self.input2dist.clone())
    }

    /// Renames inputs of either kind. System and environment inputs must
    /// stay apart afterwards.
    pub fn relabel_inputs(&self, pairs: &[(&str, &str)]) -> Mdp {
        let rename = |name: &str| -> String {
            match pairs.iter().find(|(old, _)| *old == name) {
                Some((_, new)) => new.to_string(),
                None => name.to_string(),
            }
        };

        let sys: BTreeSet<String> = self.inputs().iter().map(|name| rename(name.as_str())).collect();
        let mut input2dist = BTreeMap::new();
        for (name, dist) in &self.input2dist {
            let name = rename(name.as_str());
            assert!(!sys.contains(&name), "'{}' would be both a system and an environment input", name);
            let prev = input2dist.insert(name.clone(), dist.clone());
            assert!(prev.is_none(), "environment inputs merged into '{}'", name);
        }
        Mdp::new(self.circ.relabel_inputs(pairs.iter().copied()), input2dist)
    }

    pub fn relabel_outputs(&self, pairs: &[(&str, &str)]) -> Mdp {
        assert!(
            pairs.iter().all(|&(_, new)| new != VALID_ID),
            "output '{}' is reserved",
            VALID_ID
        );
        Mdp {
            circ: self.circ.relabel_outputs(pairs.iter().copied()),
            input2dist: self.input2dist.clone(),
        }
    }
}

impl<T: Into<Mdp>> Shr<T> for &Mdp {
    type Output = Mdp;

    fn shr(self, rhs: T) -> Mdp {
        self.then(rhs)
    }
}

impl<T: Into<Mdp>> Shr<T> for Mdp {
    type Output = Mdp;

    fn shr(self, rhs: T) -> Mdp {
        self.then(rhs)
    }
}

impl<T: Into<Mdp>> Shl<T> for &Mdp {
    type Output = Mdp;

    fn shl(self, rhs: T) -> Mdp {
        self.after(rhs)
    }
}

impl<T: Into<Mdp>> Shl<T> for Mdp {
    type Output = Mdp;

    fn shl(self, rhs: T) -> Mdp {
        self.after(rhs)
    }
}

impl<T: Into<Mdp>> BitOr<T> for &Mdp {
    type Output = Mdp;

    fn bitor(self, rhs: T) -> Mdp {
        self.par(rhs)
    }
}

impl<T: Into<Mdp>> BitOr<T> for Mdp {
    type Output = Mdp;

    fn bitor(self, rhs: T) -> Mdp {
        self.par(rhs)
    }
}

impl Shr<Mdp> for Distribution {
    type Output = Mdp;

    fn shr(self, rhs: Mdp) -> Mdp {
        Mdp::from(self).then(rhs)
    }
}

impl Shr<&Mdp> for &Distribution {
    type Output = Mdp;

    fn shr(self, rhs: &Mdp) -> Mdp {
        Mdp::from(self.clone()).then(rhs)
    }
}

// Traces
impl Mdp {
    /// Coin values reproducing a trace.
    ///
    /// `actions[t]` fixes system inputs and `states[t]` fixes outputs of step
    /// `t`. Returns each step's actions extended with the values of the
    /// distributions' coin inputs; these feed [`Mdp::circuit`] directly.
    pub fn encode_trc(&self, solver: &Solver, actions: &[Assignment], states: &[Assignment]) -> Result<Vec<Assignment>> {
        if actions.len() != states.len() {
            return Err(CoinsError::TraceLengthMismatch {
                actions: actions.len(),
                states: states.len(),
            });
        }
        if self.input2dist.is_empty() || actions.is_empty() {
            return Ok(actions.to_vec());
        }

        let circ = self.circuit();
        let sys = self.inputs();
        let coins: Vec<String> = circ.inputs().into_iter().filter(|name| !sys.contains(name)).collect();
        let unrolled = circ.unroll(actions.len(), true, true, false);

        let mut net = Network::new();
        let mut bound = BTreeMap::new();
        for (t, action) in actions.iter().enumerate() {
            for name in &sys {
                let Some(width) = circ.input_width(name) else { continue };
                let signals = match action.get(name) {
                    Some(value) => {
                        if value.len() != width {
                            return Err(CoinsError::WidthMismatch {
                                name: name.clone(),
                                expected: width,
                                actual: value.len(),
                            });
                        }
                        net.constant(value)
                    }
                    None => net.input(&timed(name, t), width),
                };
                bound.insert(timed(name, t), signals);
            }
            for name in &coins {
                let width = circ.input_width(name).unwrap_or_default();
                bound.insert(timed(name, t), net.input(&timed(name, t), width));
            }
        }
        let imported = net.import(&unrolled, &bound, &BTreeMap::new());

        let mut sat = Signal::one();
        for (t, state) in states.iter().enumerate() {
            sat = net.and(sat, imported.outputs[&timed(VALID_ID, t + 1)][0]);
            for (name, value) in state {
                let wire = imported
                    .outputs
                    .get(&timed(name, t + 1))
                    .ok_or_else(|| CoinsError::UnknownOutput(name.clone()))?;
                if wire.len() != value.len() {
                    return Err(CoinsError::WidthMismatch {
                        name: name.clone(),
                        expected: wire.len(),
                        actual: value.len(),
                    });
                }
                let expected = net.constant(value);
                let eq = net.equals(wire, &expected);
                sat = net.and(sat, eq);
            }
        }
        let query = net.finish(BTreeMap::from([("##trace".to_string(), vec![sat])]), BTreeMap::new());
        debug!("encode_trc: {} steps, {} gates", actions.len(), query.num_ands());

        let witness = solver.solve(&query)?.ok_or(CoinsError::UnrealizableTrace)?;
        Ok(actions
            .iter()
            .enumerate()
            .map(|(t, action)| {
                let mut step = action.clone();
                for name in &coins {
                    let width = circ.input_width(name).unwrap_or_default();
                    let value = witness
                        .get(&timed(name, t))
                        .cloned()
                        .unwrap_or_else(|| vec![false; width]);
                    step.insert(name.clone(), value);
                }
                step
            })
            .collect())
    }

    /// Replays coin-annotated actions, as produced by [`Mdp::encode_trc`].
    ///
    /// Returns the system part of each action and the outputs of each step.
    /// Panics if a step leaves the support of a distribution.
    pub fn decode_trc(&self, actions: &[Assignment]) -> Result<(Vec<Assignment>, Vec<Assignment>)> {
        let sys = self.inputs();
        let sys_actions = actions
            .iter()
            .map(|action| {
                action
                    .iter()
                    .filter(|(name, _)| sys.contains(*name))
                    .map(|(name, value)| (name.clone(), value.clone()))
                    .collect()
            })
            .collect();

        let trace = self.circuit().simulate(actions)?;
        let states = trace
            .into_iter()
            .enumerate()
            .map(|(t, (mut outputs, _))| {
                let valid = outputs.remove(VALID_ID).map_or(false, |bits| bits[0]);
                assert!(valid, "step {} leaves the support of a distribution", t);
                outputs
            })
            .collect();
        Ok((sys_actions, states))
    }
}
