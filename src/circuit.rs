//! Named bit-vector circuits.
//!
//! A [`Circuit`] is an immutable And-Inverter graph with named multi-bit
//! input ports, output ports and latches. Bit-vectors are little-endian
//! `Vec<bool>`s. Every operation returns a new circuit; nothing is patched in
//! place, so a circuit can be shared freely between compositions.
//!
//! Composition follows the AIGER conventions:
//!
//! - `a.then(&b)` wires each output of `a` into the same-named input of `b`
//!   and hides it; other inputs with equal names are shared.
//! - `a.par(&b)` runs both side by side, sharing same-named inputs.
//!
//! ```
//! use coins_rs::circuit::{from_int, to_int, Circuit};
//! use coins_rs::expr::BvExpr;
//!
//! let x = BvExpr::atom(3, "x");
//! let y = BvExpr::atom(3, "y");
//! let sum = (&x + &y).with_output("sum");
//!
//! let inputs = [("x".to_string(), from_int(5, 3)), ("y".to_string(), from_int(1, 3))];
//! let (outputs, _) = sum.circuit().eval(&inputs.into(), &Default::default()).unwrap();
//! assert_eq!(to_int(&outputs["sum"]), 6);
//! ```

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::error::{CoinsError, Result};
use crate::network::{Network, Node};
use crate::signal::Signal;

/// Values of named bit-vector ports.
pub type Assignment = BTreeMap<String, Vec<bool>>;

/// Little-endian bits of `value`, truncated to `width`.
pub fn from_int(value: u64, width: usize) -> Vec<bool> {
    (0..width)
        .map(|i| i < 64 && (value >> i) & 1 == 1)
        .collect()
}

/// Integer value of little-endian `bits`; at most 64 bits.
pub fn to_int(bits: &[bool]) -> u64 {
    assert!(bits.len() <= 64, "{} bits do not fit into u64", bits.len());
    bits.iter()
        .enumerate()
        .fold(0, |acc, (i, &b)| acc | ((b as u64) << i))
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Latch {
    pub state: Vec<Signal>,
    pub next: Vec<Signal>,
    pub init: Vec<bool>,
}

impl Latch {
    pub fn width(&self) -> usize {
        self.state.len()
    }
}

/// One feedback wire: `output` is latched and fed back into `input`.
#[derive(Debug, Clone)]
pub struct Wiring {
    pub input: String,
    pub output: String,
    /// Latch name; defaults to the input name.
    pub latch: Option<String>,
    /// Initial latch value; defaults to all zeros.
    pub init: Option<Vec<bool>>,
    pub keep_output: bool,
}

impl Wiring {
    pub fn new(input: &str, output: &str) -> Self {
        Self {
            input: input.to_string(),
            output: output.to_string(),
            latch: None,
            init: None,
            keep_output: true,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct Circuit {
    nodes: Vec<Node>,
    inputs: BTreeMap<String, Vec<Signal>>,
    outputs: BTreeMap<String, Vec<Signal>>,
    latches: BTreeMap<String, Latch>,
}

impl Default for Circuit {
    fn default() -> Self {
        Self::empty()
    }
}

// Constructors
impl Circuit {
    pub(crate) fn from_parts(
        nodes: Vec<Node>,
        inputs: BTreeMap<String, Vec<Signal>>,
        outputs: BTreeMap<String, Vec<Signal>>,
        latches: BTreeMap<String, Latch>,
    ) -> Self {
        Self {
            nodes,
            inputs,
            outputs,
            latches,
        }
    }

    pub fn empty() -> Self {
        Network::new().finish(BTreeMap::new(), BTreeMap::new())
    }

    /// Passes input `name` through to output `name`.
    pub fn identity(width: usize, name: &str) -> Self {
        let mut net = Network::new();
        let bits = net.input(name, width);
        net.finish(BTreeMap::from([(name.to_string(), bits)]), BTreeMap::new())
    }

    /// Constant output `name`.
    pub fn source(value: &[bool], name: &str) -> Self {
        let net = Network::new();
        let bits = net.constant(value);
        net.finish(BTreeMap::from([(name.to_string(), bits)]), BTreeMap::new())
    }

    /// Swallows input `name`.
    pub fn sink(width: usize, name: &str) -> Self {
        let mut net = Network::new();
        net.input(name, width);
        net.finish(BTreeMap::new(), BTreeMap::new())
    }
}

// Getters
impl Circuit {
    pub(crate) fn nodes(&self) -> &[Node] {
        &self.nodes
    }
    pub(crate) fn input_ports(&self) -> &BTreeMap<String, Vec<Signal>> {
        &self.inputs
    }
    pub(crate) fn output_ports(&self) -> &BTreeMap<String, Vec<Signal>> {
        &self.outputs
    }
    pub(crate) fn latch_ports(&self) -> &BTreeMap<String, Latch> {
        &self.latches
    }

    pub fn inputs(&self) -> BTreeSet<String> {
        self.inputs.keys().cloned().collect()
    }
    pub fn outputs(&self) -> BTreeSet<String> {
        self.outputs.keys().cloned().collect()
    }
    pub fn latches(&self) -> BTreeSet<String> {
        self.latches.keys().cloned().collect()
    }

    pub fn input_width(&self, name: &str) -> Option<usize> {
        self.inputs.get(name).map(Vec::len)
    }
    pub fn output_width(&self, name: &str) -> Option<usize> {
        self.outputs.get(name).map(Vec::len)
    }

    /// Initial value of every latch.
    pub fn latch2init(&self) -> Assignment {
        self.latches
            .iter()
            .map(|(name, latch)| (name.clone(), latch.init.clone()))
            .collect()
    }

    /// Number of AND gates.
    pub fn num_ands(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::And(..)))
            .count()
    }
}

fn carry_latches(
    next: BTreeMap<String, Vec<Signal>>,
    old: &BTreeMap<String, Latch>,
) -> impl Iterator<Item = (String, (Vec<Signal>, Vec<bool>))> + '_ {
    next.into_iter().map(move |(name, next)| {
        let init = old[&name].init.clone();
        (name, (next, init))
    })
}

pub(crate) fn timed(name: &str, time: usize) -> String {
    format!("{}##time_{}", name, time)
}

// Composition
impl Circuit {
    /// Sequential composition: `self` feeds `other`.
    pub fn then(&self, other: &Circuit) -> Circuit {
        let mut net = Network::new();
        let inputs = net.bind_inputs(self);
        let latches = net.bind_latches(self);
        let left = net.import(self, &inputs, &latches);

        let mut inputs = BTreeMap::new();
        for (name, bits) in &other.inputs {
            let bound = match left.outputs.get(name) {
                Some(wire) => {
                    assert_eq!(wire.len(), bits.len(), "width mismatch on wire '{}'", name);
                    wire.clone()
                }
                None => net.input(name, bits.len()),
            };
            inputs.insert(name.clone(), bound);
        }
        for name in other.latches.keys() {
            assert!(!self.latches.contains_key(name), "latch '{}' on both sides", name);
        }
        let latches = net.bind_latches(other);
        let right = net.import(other, &inputs, &latches);

        let mut outputs: BTreeMap<_, _> = left
            .outputs
            .into_iter()
            .filter(|(name, _)| !other.inputs.contains_key(name))
            .collect();
        for (name, bits) in right.outputs {
            assert!(!outputs.contains_key(&name), "output '{}' on both sides", name);
            outputs.insert(name, bits);
        }

        let latches = carry_latches(left.latch_next, &self.latches)
            .chain(carry_latches(right.latch_next, &other.latches))
            .collect();
        net.finish(outputs, latches)
    }

    /// Parallel composition; same-named inputs are shared.
    pub fn par(&self, other: &Circuit) -> Circuit {
        let mut net = Network::new();
        let inputs = net.bind_inputs(self);
        let latches = net.bind_latches(self);
        let left = net.import(self, &inputs, &latches);

        for name in other.latches.keys() {
            assert!(!self.latches.contains_key(name), "latch '{}' on both sides", name);
        }
        let inputs = net.bind_inputs(other);
        let latches = net.bind_latches(other);
        let right = net.import(other, &inputs, &latches);

        let mut outputs = left.outputs;
        for (name, bits) in right.outputs {
            assert!(!outputs.contains_key(&name), "output '{}' on both sides", name);
            outputs.insert(name, bits);
        }

        let latches = carry_latches(left.latch_next, &self.latches)
            .chain(carry_latches(right.latch_next, &other.latches))
            .collect();
        net.finish(outputs, latches)
    }

    /// Renames inputs. Renaming onto an existing input merges the two.
    pub fn relabel_inputs<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Circuit
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let renames: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        let mut net = Network::new();
        let inputs = self
            .inputs
            .iter()
            .map(|(name, bits)| {
                let new_name = renames.get(name).unwrap_or(name);
                (name.clone(), net.input(new_name, bits.len()))
            })
            .collect();
        let latches = net.bind_latches(self);
        let imported = net.import(self, &inputs, &latches);
        let latches = carry_latches(imported.latch_next, &self.latches).collect();
        net.finish(imported.outputs, latches)
    }

    /// Renames outputs; the new names must stay distinct.
    pub fn relabel_outputs<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Circuit
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let renames: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        let mut outputs = BTreeMap::new();
        for (name, bits) in &self.outputs {
            let new_name = renames.get(name).unwrap_or(name).clone();
            assert!(!outputs.contains_key(&new_name), "output '{}' would be duplicated", new_name);
            outputs.insert(new_name, bits.clone());
        }
        Circuit {
            outputs,
            ..self.clone()
        }
    }

    pub fn relabel_latches<K, V>(&self, pairs: impl IntoIterator<Item = (K, V)>) -> Circuit
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let renames: BTreeMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.as_ref().to_string(), v.as_ref().to_string()))
            .collect();
        let mut net = Network::new();
        let inputs = net.bind_inputs(self);
        let latches = self
            .latches
            .iter()
            .map(|(name, latch)| {
                let new_name = renames.get(name).unwrap_or(name);
                (name.clone(), net.latch(new_name, latch.width()))
            })
            .collect();
        let imported = net.import(self, &inputs, &latches);
        let latches = imported
            .latch_next
            .into_iter()
            .map(|(name, next)| {
                let init = self.latches[&name].init.clone();
                let new_name = renames.get(&name).cloned().unwrap_or(name);
                (new_name, (next, init))
            })
            .collect();
        net.finish(imported.outputs, latches)
    }

    /// Hides the given outputs.
    pub fn without_outputs<S: AsRef<str>>(&self, names: impl IntoIterator<Item = S>) -> Circuit {
        let mut circ = self.clone();
        for name in names {
            circ.outputs.remove(name.as_ref());
        }
        // Re-finish to drop the gates only the hidden outputs used.
        circ.resweep()
    }

    fn resweep(&self) -> Circuit {
        let mut net = Network::new();
        let inputs = net.bind_inputs(self);
        let latches = net.bind_latches(self);
        let imported = net.import(self, &inputs, &latches);
        let latches = carry_latches(imported.latch_next, &self.latches).collect();
        net.finish(imported.outputs, latches)
    }
}

// Sequential structure
impl Circuit {
    /// Latches each wired output and feeds it back into the wired input.
    pub fn loopback(&self, wirings: &[Wiring]) -> Circuit {
        let mut net = Network::new();

        let mut states = BTreeMap::new();
        for w in wirings {
            let width = match (self.inputs.get(&w.input), self.outputs.get(&w.output)) {
                (Some(i), Some(o)) => {
                    assert_eq!(i.len(), o.len(), "cannot wire '{}' into '{}'", w.output, w.input);
                    i.len()
                }
                (None, _) => panic!("'{}' is not an input", w.input),
                (_, None) => panic!("'{}' is not an output", w.output),
            };
            let latch = w.latch.clone().unwrap_or_else(|| w.input.clone());
            assert!(!self.latches.contains_key(&latch), "latch '{}' already exists", latch);
            states.insert(w.input.clone(), (latch.clone(), net.latch(&latch, width)));
        }

        let mut inputs = BTreeMap::new();
        for (name, bits) in &self.inputs {
            let bound = match states.get(name) {
                Some((_, state)) => state.clone(),
                None => net.input(name, bits.len()),
            };
            inputs.insert(name.clone(), bound);
        }
        let latches = net.bind_latches(self);
        let imported = net.import(self, &inputs, &latches);

        let mut latches: BTreeMap<_, _> = carry_latches(imported.latch_next, &self.latches).collect();
        for w in wirings {
            let (latch, state) = &states[&w.input];
            let next = imported.outputs[&w.output].clone();
            let init = w.init.clone().unwrap_or_else(|| vec![false; state.len()]);
            latches.insert(latch.clone(), (next, init));
        }

        let hidden: BTreeSet<&String> = wirings
            .iter()
            .filter(|w| !w.keep_output)
            .map(|w| &w.output)
            .collect();
        let outputs = imported
            .outputs
            .into_iter()
            .filter(|(name, _)| !hidden.contains(name))
            .collect();
        debug!("loopback: {} wires", wirings.len());
        net.finish(outputs, latches)
    }

    /// Feedback over parallel lists of inputs and outputs.
    pub fn feedback(
        &self,
        inputs: &[&str],
        outputs: &[&str],
        initials: Option<&[Vec<bool>]>,
        latches: Option<&[&str]>,
        keep_outputs: bool,
    ) -> Circuit {
        assert_eq!(inputs.len(), outputs.len());
        let wirings: Vec<Wiring> = inputs
            .iter()
            .zip(outputs)
            .enumerate()
            .map(|(i, (input, output))| Wiring {
                input: input.to_string(),
                output: output.to_string(),
                latch: latches.map(|l| l[i].to_string()),
                init: initials.map(|v| v[i].clone()),
                keep_output: keep_outputs,
            })
            .collect();
        self.loopback(&wirings)
    }

    /// Turns every latch into an input and an output named after it.
    pub fn cut_latches(&self) -> Circuit {
        let mut net = Network::new();
        let inputs = net.bind_inputs(self);
        let mut latches = BTreeMap::new();
        for (name, latch) in &self.latches {
            assert!(!self.inputs.contains_key(name), "latch '{}' shadows an input", name);
            assert!(!self.outputs.contains_key(name), "latch '{}' shadows an output", name);
            latches.insert(name.clone(), net.input(name, latch.width()));
        }
        let imported = net.import(self, &inputs, &latches);
        let mut outputs = imported.outputs;
        outputs.extend(imported.latch_next);
        net.finish(outputs, BTreeMap::new())
    }

    /// Replicates the circuit `horizon` times, threading the latch state.
    ///
    /// Input `x` of step `t` becomes `x##time_t` and output `y` of step `t`
    /// becomes `y##time_{t+1}`. With `init == false` the initial state is
    /// read from inputs `l##time_0`; with `omit_latches == false` the state
    /// after each step is exposed as outputs `l##time_{t+1}`.
    pub fn unroll(
        &self,
        horizon: usize,
        init: bool,
        omit_latches: bool,
        only_last_outputs: bool,
    ) -> Circuit {
        assert!(horizon > 0, "cannot unroll zero steps");
        let mut net = Network::new();

        let mut state: BTreeMap<String, Vec<Signal>> = BTreeMap::new();
        for (name, latch) in &self.latches {
            let bits = if init {
                net.constant(&latch.init)
            } else {
                net.input(&timed(name, 0), latch.width())
            };
            state.insert(name.clone(), bits);
        }

        let mut outputs = BTreeMap::new();
        for t in 0..horizon {
            let inputs = self
                .inputs
                .iter()
                .map(|(name, bits)| (name.clone(), net.input(&timed(name, t), bits.len())))
                .collect();
            let imported = net.import(self, &inputs, &state);
            state = imported.latch_next;

            if only_last_outputs && t + 1 < horizon {
                continue;
            }
            for (name, bits) in imported.outputs {
                outputs.insert(timed(&name, t + 1), bits);
            }
            if !omit_latches {
                for (name, bits) in &state {
                    outputs.insert(timed(name, t + 1), bits.clone());
                }
            }
        }
        debug!("unroll: horizon {}, {} nodes", horizon, net.num_nodes());
        net.finish(outputs, BTreeMap::new())
    }
}

// Simulation
impl Circuit {
    /// Evaluates one step. Latches missing from `latches` start at their
    /// initial value; inputs not on the circuit are ignored.
    ///
    /// Returns the outputs and the next latch values.
    pub fn eval(&self, inputs: &Assignment, latches: &Assignment) -> Result<(Assignment, Assignment)> {
        for (name, bits) in &self.inputs {
            let value = inputs
                .get(name)
                .ok_or_else(|| CoinsError::MissingInput(name.clone()))?;
            if value.len() != bits.len() {
                return Err(CoinsError::WidthMismatch {
                    name: name.clone(),
                    expected: bits.len(),
                    actual: value.len(),
                });
            }
        }
        for (name, latch) in &self.latches {
            if let Some(value) = latches.get(name) {
                if value.len() != latch.width() {
                    return Err(CoinsError::WidthMismatch {
                        name: name.clone(),
                        expected: latch.width(),
                        actual: value.len(),
                    });
                }
            }
        }

        let mut values: Vec<bool> = Vec::with_capacity(self.nodes.len());
        for node in &self.nodes {
            let v = match node {
                Node::Const => false,
                Node::Input { name, bit } => inputs[name][*bit],
                Node::Latch { name, bit } => match latches.get(name) {
                    Some(value) => value[*bit],
                    None => self.latches[name].init[*bit],
                },
                Node::And(a, b) => value_of(&values, *a) && value_of(&values, *b),
            };
            values.push(v);
        }

        let read = |bits: &Vec<Signal>| bits.iter().map(|&s| value_of(&values, s)).collect();
        let outputs = self
            .outputs
            .iter()
            .map(|(name, bits)| (name.clone(), read(bits)))
            .collect();
        let next = self
            .latches
            .iter()
            .map(|(name, latch)| (name.clone(), read(&latch.next)))
            .collect();
        Ok((outputs, next))
    }

    /// Runs `steps` from the initial latch values.
    pub fn simulate(&self, steps: &[Assignment]) -> Result<Vec<(Assignment, Assignment)>> {
        let mut latches = self.latch2init();
        let mut trace = Vec::with_capacity(steps.len());
        for inputs in steps {
            let (outputs, next) = self.eval(inputs, &latches)?;
            latches = next.clone();
            trace.push((outputs, next));
        }
        Ok(trace)
    }
}

fn value_of(values: &[bool], signal: Signal) -> bool {
    values[signal.index()] ^ signal.is_negated()
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    fn assignment(pairs: &[(&str, u64, usize)]) -> Assignment {
        pairs
            .iter()
            .map(|&(name, value, width)| (name.to_string(), from_int(value, width)))
            .collect()
    }

    /// 2-bit counter incremented when `en` is set, exposing the new count.
    fn counter() -> Circuit {
        let mut net = Network::new();
        let en = net.input("en", 1);
        let prev = net.input("prev", 2);
        let one = net.constant(&[true, false]);
        let inc = net.add(&prev, &one);
        let next = net.mux_words(en[0], &inc, &prev);
        net.finish(BTreeMap::from([("count".to_string(), next)]), BTreeMap::new())
    }

    #[test]
    fn test_int_roundtrip() {
        assert_eq!(from_int(6, 3), vec![false, true, true]);
        assert_eq!(to_int(&from_int(6, 3)), 6);
        assert_eq!(from_int(9, 3), vec![true, false, false]);
    }

    #[test]
    fn test_then_hides_wires() {
        let a = Circuit::identity(2, "x").relabel_outputs([("x", "y")]);
        let b = Circuit::identity(2, "y").relabel_outputs([("y", "z")]);
        let c = a.then(&b);

        assert_eq!(c.inputs(), BTreeSet::from(["x".to_string()]));
        assert_eq!(c.outputs(), BTreeSet::from(["z".to_string()]));

        let (out, _) = c.eval(&assignment(&[("x", 3, 2)]), &Assignment::new()).unwrap();
        assert_eq!(to_int(&out["z"]), 3);
    }

    #[test]
    fn test_par_shares_inputs() {
        let a = Circuit::identity(1, "x").relabel_outputs([("x", "a")]);
        let b = Circuit::identity(1, "x").relabel_outputs([("x", "b")]);
        let c = a.par(&b);
        assert_eq!(c.inputs().len(), 1);
        assert_eq!(c.outputs().len(), 2);
    }

    #[test]
    #[should_panic(expected = "on both sides")]
    fn test_par_rejects_output_collision() {
        let a = Circuit::identity(1, "x");
        let b = Circuit::identity(1, "y").relabel_outputs([("y", "x")]);
        a.par(&b);
    }

    #[test]
    fn test_relabel_inputs_merges() {
        let a = Circuit::identity(1, "x").relabel_outputs([("x", "a")]);
        let b = Circuit::identity(1, "y").relabel_outputs([("y", "b")]);
        let c = a.par(&b).relabel_inputs([("y", "x")]);
        assert_eq!(c.inputs(), BTreeSet::from(["x".to_string()]));
    }

    #[test]
    fn test_missing_input_is_an_error() {
        let c = Circuit::identity(1, "x");
        let err = c.eval(&Assignment::new(), &Assignment::new()).unwrap_err();
        assert_eq!(err, CoinsError::MissingInput("x".to_string()));
    }

    #[test]
    fn test_feedback_counts() {
        let circ = counter().feedback(&["prev"], &["count"], None, None, true);
        assert_eq!(circ.inputs(), BTreeSet::from(["en".to_string()]));
        assert_eq!(circ.latches(), BTreeSet::from(["prev".to_string()]));

        let steps: Vec<Assignment> = [1, 1, 0, 1, 1]
            .iter()
            .map(|&en| assignment(&[("en", en, 1)]))
            .collect();
        let trace = circ.simulate(&steps).unwrap();
        let counts: Vec<u64> = trace.iter().map(|(out, _)| to_int(&out["count"])).collect();
        assert_eq!(counts, vec![1, 2, 2, 3, 0]);
    }

    #[test]
    fn test_feedback_initial_value() {
        let circ = counter().feedback(&["prev"], &["count"], Some(&[from_int(2, 2)]), Some(&["s"]), false);
        assert!(circ.outputs().is_empty());
        let (_, next) = circ.eval(&assignment(&[("en", 1, 1)]), &Assignment::new()).unwrap();
        assert_eq!(to_int(&next["s"]), 3);
    }

    #[test]
    fn test_cut_latches() {
        let circ = counter()
            .feedback(&["prev"], &["count"], None, Some(&["state"]), false)
            .cut_latches();
        assert!(circ.latches().is_empty());
        assert!(circ.inputs().contains("state"));
        assert!(circ.outputs().contains("state"));
    }

    #[test]
    fn test_unroll_matches_simulation() {
        let circ = counter().feedback(&["prev"], &["count"], None, None, true);
        let unrolled = circ.unroll(3, true, true, false);

        let expected: BTreeSet<String> = (0..3).map(|t| timed("en", t)).collect();
        assert_eq!(unrolled.inputs(), expected);
        assert!(unrolled.latches().is_empty());

        let inputs = assignment(&[("en##time_0", 1, 1), ("en##time_1", 0, 1), ("en##time_2", 1, 1)]);
        let (out, _) = unrolled.eval(&inputs, &Assignment::new()).unwrap();
        assert_eq!(to_int(&out["count##time_1"]), 1);
        assert_eq!(to_int(&out["count##time_2"]), 1);
        assert_eq!(to_int(&out["count##time_3"]), 2);
    }

    #[test]
    fn test_unroll_without_init_exposes_state() {
        let circ = counter().feedback(&["prev"], &["count"], None, None, false);
        let unrolled = circ.unroll(2, false, false, true);
        assert!(unrolled.inputs().contains("prev##time_0"));
        assert_eq!(
            unrolled.outputs(),
            BTreeSet::from(["prev##time_2".to_string()])
        );
    }

    #[test]
    fn test_structural_equality() {
        let a = Circuit::identity(2, "x").then(&Circuit::sink(2, "x"));
        let b = Circuit::sink(2, "x");
        assert_eq!(a, b);
    }
}
