//! Circuits over symbolic values.
//!
//! A [`FiniteFunc`] is a [`Circuit`] whose ports carry [`Encoding`]s, plus an
//! optional 1-bit validity output recording the assumptions made about its
//! inputs. The validity output is not listed among [`FiniteFunc::outputs`];
//! composition conjoins the validity of both operands.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use crate::circuit::{Assignment, Circuit, Wiring};
use crate::encoding::{Encoding, Value};
use crate::error::{CoinsError, Result};
use crate::expr::BvExpr;
use crate::network::Network;
use crate::utils::fresh_name;

/// Symbolic values of named ports.
pub type Values = BTreeMap<String, Value>;

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct FiniteFunc {
    circ: Circuit,
    input_encodings: BTreeMap<String, Encoding>,
    output_encodings: BTreeMap<String, Encoding>,
    valid_id: Option<String>,
}

impl From<Circuit> for FiniteFunc {
    fn from(circ: Circuit) -> Self {
        Self::new(circ)
    }
}

impl From<BvExpr> for FiniteFunc {
    fn from(expr: BvExpr) -> Self {
        Self::new(expr.into_circuit())
    }
}

// Constructors
impl FiniteFunc {
    pub fn new(circ: Circuit) -> Self {
        Self {
            circ,
            input_encodings: BTreeMap::new(),
            output_encodings: BTreeMap::new(),
            valid_id: None,
        }
    }

    pub fn with_input_encoding(mut self, name: &str, encoding: Encoding) -> Self {
        assert!(self.circ.input_width(name).is_some(), "'{}' is not an input", name);
        self.input_encodings.insert(name.to_string(), encoding);
        self
    }

    pub fn with_output_encoding(mut self, name: &str, encoding: Encoding) -> Self {
        assert!(self.circ.output_width(name).is_some(), "'{}' is not an output", name);
        self.output_encodings.insert(name.to_string(), encoding);
        self
    }

    fn with_circ(&self, circ: Circuit) -> Self {
        Self {
            circ,
            ..self.clone()
        }
    }
}

// Getters
impl FiniteFunc {
    pub fn circ(&self) -> &Circuit {
        &self.circ
    }

    pub fn inputs(&self) -> BTreeSet<String> {
        self.circ.inputs()
    }

    /// Outputs, without the validity output.
    pub fn outputs(&self) -> BTreeSet<String> {
        let mut outputs = self.circ.outputs();
        if let Some(valid) = &self.valid_id {
            outputs.remove(valid);
        }
        outputs
    }

    pub fn latches(&self) -> BTreeSet<String> {
        self.circ.latches()
    }

    pub fn latch2init(&self) -> Assignment {
        self.circ.latch2init()
    }

    pub fn valid_id(&self) -> Option<&str> {
        self.valid_id.as_deref()
    }

    pub fn input_encoding(&self, name: &str) -> Encoding {
        self.input_encodings.get(name).cloned().unwrap_or_default()
    }

    pub fn output_encoding(&self, name: &str) -> Encoding {
        self.output_encodings.get(name).cloned().unwrap_or_default()
    }
}

// Encoding
impl FiniteFunc {
    /// Encodes symbolic input values; every name must be an input.
    pub fn encode_inputs(&self, values: &Values) -> Result<Assignment> {
        values
            .iter()
            .map(|(name, value)| {
                let width = self
                    .circ
                    .input_width(name)
                    .ok_or_else(|| CoinsError::UnknownInput(name.clone()))?;
                let bits = self.input_encoding(name).encode(name, value, width)?;
                Ok((name.clone(), bits))
            })
            .collect()
    }

    /// Encodes symbolic output values; every name must be an output.
    pub fn encode_outputs(&self, values: &Values) -> Result<Assignment> {
        values
            .iter()
            .map(|(name, value)| {
                let width = self
                    .circ
                    .output_width(name)
                    .ok_or_else(|| CoinsError::UnknownOutput(name.clone()))?;
                let bits = self.output_encoding(name).encode(name, value, width)?;
                Ok((name.clone(), bits))
            })
            .collect()
    }

    pub fn decode_outputs(&self, outputs: &Assignment) -> Values {
        outputs
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != self.valid_id())
            .map(|(name, bits)| (name.clone(), self.output_encoding(name).decode(bits)))
            .collect()
    }

    /// One step over symbolic values. Returns the decoded outputs and the
    /// next latch values.
    pub fn call(&self, inputs: &Values, latches: Option<&Assignment>) -> Result<(Values, Assignment)> {
        let inputs = self.encode_inputs(inputs)?;
        let latches = latches.cloned().unwrap_or_default();
        let (outputs, next) = self.circ.eval(&inputs, &latches)?;
        Ok((self.decode_outputs(&outputs), next))
    }

    /// Runs several steps from the initial latch values.
    pub fn simulate(&self, steps: &[Values]) -> Result<Vec<(Values, Assignment)>> {
        let steps = steps
            .iter()
            .map(|step| self.encode_inputs(step))
            .collect::<Result<Vec<_>>>()?;
        let trace = self.circ.simulate(&steps)?;
        Ok(trace
            .into_iter()
            .map(|(outputs, next)| (self.decode_outputs(&outputs), next))
            .collect())
    }

    /// Value of the validity output for `inputs`; `true` without assumptions.
    pub fn is_valid(&self, inputs: &Assignment, latches: &Assignment) -> Result<bool> {
        let Some(valid) = &self.valid_id else {
            return Ok(true);
        };
        let (outputs, _) = self.circ.eval(inputs, latches)?;
        Ok(outputs[valid][0])
    }
}

/// Replaces the 1-bit outputs `names` by their conjunction, output `into`.
fn conjoin_outputs(circ: &Circuit, names: &[String], into: &str) -> Circuit {
    let mut net = Network::new();
    let inputs = net.bind_inputs(circ);
    let latches = net.bind_latches(circ);
    let imported = net.import(circ, &inputs, &latches);

    let mut outputs = imported.outputs;
    let mut valid = crate::signal::Signal::one();
    for name in names {
        let bits = outputs.remove(name).unwrap_or_default();
        assert_eq!(bits.len(), 1, "validity output '{}' must be a single bit", name);
        valid = net.and(valid, bits[0]);
    }
    outputs.insert(into.to_string(), vec![valid]);

    let latches = imported
        .latch_next
        .into_iter()
        .map(|(name, next)| {
            let init = circ.latch_ports()[&name].init.clone();
            (name, (next, init))
        })
        .collect();
    net.finish(outputs, latches)
}

// Composition
impl FiniteFunc {
    /// Conjoins `pred`, a 1-bit expression over the inputs, into the validity
    /// output.
    pub fn assume(&self, pred: &BvExpr) -> FiniteFunc {
        assert_eq!(pred.size(), 1, "assumption must be a single bit");
        let id = fresh_name("valid");
        let circ = self.circ.par(&pred.with_output(&id).into_circuit());
        let mut names = vec![id];
        names.extend(self.valid_id.clone());

        let valid_id = fresh_name("valid");
        Self {
            circ: conjoin_outputs(&circ, &names, &valid_id),
            valid_id: Some(valid_id),
            ..self.clone()
        }
    }

    fn isolate_valid(&self) -> (Circuit, Option<String>) {
        match &self.valid_id {
            Some(valid) => {
                let id = fresh_name("valid");
                (self.circ.relabel_outputs([(valid.as_str(), id.as_str())]), Some(id))
            }
            None => (self.circ.clone(), None),
        }
    }

    fn combine(&self, other: &FiniteFunc, circ: Circuit, left: Option<String>, right: Option<String>) -> FiniteFunc {
        let mut input_encodings = self.input_encodings.clone();
        for (name, enc) in &other.input_encodings {
            if circ.input_width(name).is_some() {
                input_encodings.insert(name.clone(), enc.clone());
            }
        }
        input_encodings.retain(|name, _| circ.input_width(name).is_some());
        let mut output_encodings = self.output_encodings.clone();
        output_encodings.extend(other.output_encodings.clone());
        output_encodings.retain(|name, _| circ.output_width(name).is_some());

        let names: Vec<String> = left.into_iter().chain(right).collect();
        let (circ, valid_id) = if names.is_empty() {
            (circ, None)
        } else {
            let id = fresh_name("valid");
            (conjoin_outputs(&circ, &names, &id), Some(id))
        };
        FiniteFunc {
            circ,
            input_encodings,
            output_encodings,
            valid_id,
        }
    }

    pub fn then(&self, other: &FiniteFunc) -> FiniteFunc {
        let (left, lv) = self.isolate_valid();
        let (right, rv) = other.isolate_valid();
        self.combine(other, left.then(&right), lv, rv)
    }

    pub fn par(&self, other: &FiniteFunc) -> FiniteFunc {
        let (left, lv) = self.isolate_valid();
        let (right, rv) = other.isolate_valid();
        self.combine(other, left.par(&right), lv, rv)
    }

    pub fn relabel_inputs(&self, pairs: &[(&str, &str)]) -> FiniteFunc {
        let mut func = self.with_circ(self.circ.relabel_inputs(pairs.iter().copied()));
        for &(old, new) in pairs {
            if let Some(enc) = func.input_encodings.remove(old) {
                func.input_encodings.insert(new.to_string(), enc);
            }
        }
        func
    }

    pub fn relabel_outputs(&self, pairs: &[(&str, &str)]) -> FiniteFunc {
        if let Some(valid) = &self.valid_id {
            assert!(pairs.iter().all(|&(old, _)| old != valid), "cannot relabel the validity output");
        }
        let mut func = self.with_circ(self.circ.relabel_outputs(pairs.iter().copied()));
        for &(old, new) in pairs {
            if let Some(enc) = func.output_encodings.remove(old) {
                func.output_encodings.insert(new.to_string(), enc);
            }
        }
        func
    }

    pub fn relabel_latches(&self, pairs: &[(&str, &str)]) -> FiniteFunc {
        self.with_circ(self.circ.relabel_latches(pairs.iter().copied()))
    }

    pub fn loopback(&self, wirings: &[Wiring]) -> FiniteFunc {
        let mut func = self.with_circ(self.circ.loopback(wirings));
        for w in wirings {
            func.input_encodings.remove(&w.input);
            if !w.keep_output {
                func.output_encodings.remove(&w.output);
            }
        }
        func
    }

    pub fn cut_latches(&self) -> FiniteFunc {
        self.with_circ(self.circ.cut_latches())
    }

    /// Unrolls the circuit; the per-step validity outputs are conjoined.
    pub fn unroll(&self, horizon: usize, init: bool, omit_latches: bool, only_last_outputs: bool) -> FiniteFunc {
        let Some(valid) = &self.valid_id else {
            let circ = self.circ.unroll(horizon, init, omit_latches, only_last_outputs);
            return self.timed(circ, horizon, None);
        };

        let circ = self.circ.unroll(horizon, init, omit_latches, false);
        let stamped: Vec<String> = (1..=horizon).map(|t| format!("{}##time_{}", valid, t)).collect();
        let id = fresh_name("valid");
        let mut circ = conjoin_outputs(&circ, &stamped, &id);
        if only_last_outputs {
            let early: Vec<String> = circ
                .outputs()
                .into_iter()
                .filter(|name| {
                    *name != id && (1..horizon).any(|t| name.ends_with(&format!("##time_{}", t)))
                })
                .collect();
            circ = circ.without_outputs(early);
        }
        self.timed(circ, horizon, Some(id))
    }

    fn timed(&self, circ: Circuit, horizon: usize, valid_id: Option<String>) -> FiniteFunc {
        let mut input_encodings = BTreeMap::new();
        let mut output_encodings = BTreeMap::new();
        for t in 0..horizon {
            for (name, enc) in &self.input_encodings {
                input_encodings.insert(format!("{}##time_{}", name, t), enc.clone());
            }
            for (name, enc) in &self.output_encodings {
                output_encodings.insert(format!("{}##time_{}", name, t + 1), enc.clone());
            }
        }
        input_encodings.retain(|name, _| circ.input_width(name).is_some());
        output_encodings.retain(|name, _| circ.output_width(name).is_some());
        debug!("unrolled {} steps into {} gates", horizon, circ.num_ands());
        FiniteFunc {
            circ,
            input_encodings,
            output_encodings,
            valid_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::circuit::from_int;

    fn lookup() -> Encoding {
        Encoding::from_pairs([("one", 0), ("two", 1), ("three", 2), ("four", 3)])
    }

    #[test]
    fn test_call_encodes_and_decodes() {
        let die = BvExpr::atom(2, "die");
        let x = BvExpr::atom(2, "x");
        let func = FiniteFunc::from((&x + &die).with_output("y"))
            .with_input_encoding("die", lookup())
            .with_output_encoding("y", lookup());

        let inputs = Values::from([("die".to_string(), "two".into()), ("x".to_string(), Value::Int(1))]);
        let (outputs, _) = func.call(&inputs, None).unwrap();
        assert_eq!(outputs["y"], Value::from("three"));
    }

    #[test]
    fn test_call_rejects_unknown_input() {
        let func = FiniteFunc::from(BvExpr::atom(1, "x").with_output("y"));
        let inputs = Values::from([("z".to_string(), Value::Int(0))]);
        assert_eq!(func.call(&inputs, None).unwrap_err(), CoinsError::UnknownInput("z".to_string()));
    }

    #[test]
    fn test_assume() {
        let x = BvExpr::atom(2, "x");
        let func = FiniteFunc::from(x.with_output("y")).assume(&x.lt(&BvExpr::constant(2, 2)));

        assert_eq!(func.outputs(), BTreeSet::from(["y".to_string()]));
        let ok = Assignment::from([("x".to_string(), from_int(1, 2))]);
        let bad = Assignment::from([("x".to_string(), from_int(3, 2))]);
        assert!(func.is_valid(&ok, &Assignment::new()).unwrap());
        assert!(!func.is_valid(&bad, &Assignment::new()).unwrap());

        let func = func.assume(&x.not_equals(&BvExpr::constant(2, 1)));
        assert!(!func.is_valid(&ok, &Assignment::new()).unwrap());
    }

    #[test]
    fn test_then_conjoins_validity() {
        let x = BvExpr::atom(2, "x");
        let left = FiniteFunc::from(x.with_output("y")).assume(&x.ge(&BvExpr::constant(2, 1)));
        let y = BvExpr::atom(2, "y");
        let right = FiniteFunc::from(y.with_output("z")).assume(&y.le(&BvExpr::constant(2, 2)));
        let both = left.then(&right);

        assert_eq!(both.inputs(), BTreeSet::from(["x".to_string()]));
        assert_eq!(both.outputs(), BTreeSet::from(["z".to_string()]));
        let valid: Vec<bool> = (0..4)
            .map(|v| {
                let inputs = Assignment::from([("x".to_string(), from_int(v, 2))]);
                both.is_valid(&inputs, &Assignment::new()).unwrap()
            })
            .collect();
        assert_eq!(valid, vec![false, true, true, false]);
    }

    #[test]
    fn test_unroll_keeps_encodings() {
        let func = FiniteFunc::from(BvExpr::atom(2, "die").with_output("y")).with_input_encoding("die", lookup());
        let unrolled = func.unroll(2, true, true, false);
        assert_eq!(unrolled.input_encoding("die##time_1"), lookup());
        assert!(unrolled.valid_id().is_none());
    }
}
