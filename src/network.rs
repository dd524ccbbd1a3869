//! Structurally hashed And-Inverter network under construction.
//!
//! A [`Network`] is the mutable side of a [`Circuit`]: gates are appended in
//! topological order, duplicate AND gates are shared, and trivial gates are
//! folded away on the fly. Every circuit operation (composition, relabeling,
//! feedback, unrolling) works by importing existing circuits into a fresh
//! network with their ports bound to new signals, then finishing it.

use std::collections::{BTreeMap, HashMap};

use log::debug;

use crate::circuit::{Circuit, Latch};
use crate::signal::Signal;

#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub enum Node {
    Const,
    Input { name: String, bit: usize },
    Latch { name: String, bit: usize },
    And(Signal, Signal),
}

/// Ports of a circuit after it has been imported into a network.
#[derive(Debug)]
pub struct Imported {
    pub outputs: BTreeMap<String, Vec<Signal>>,
    pub latch_next: BTreeMap<String, Vec<Signal>>,
}

#[derive(Debug)]
pub struct Network {
    nodes: Vec<Node>,
    strash: HashMap<(Signal, Signal), Signal>,
    inputs: BTreeMap<String, Vec<Signal>>,
    latches: BTreeMap<String, Vec<Signal>>,
}

impl Default for Network {
    fn default() -> Self {
        Self::new()
    }
}

pub(crate) fn lift(map: &[Signal], signal: Signal) -> Signal {
    let mapped = map[signal.index()];
    if signal.is_negated() {
        !mapped
    } else {
        mapped
    }
}

impl Network {
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::Const],
            strash: HashMap::new(),
            inputs: BTreeMap::new(),
            latches: BTreeMap::new(),
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }

    fn push(&mut self, node: Node) -> Signal {
        let index = self.nodes.len() as u32;
        self.nodes.push(node);
        Signal::from_index(index)
    }

    /// Returns the bits of input `name`, creating the port on first use.
    pub fn input(&mut self, name: &str, width: usize) -> Vec<Signal> {
        if let Some(bits) = self.inputs.get(name) {
            assert_eq!(bits.len(), width, "input '{}' used with two different widths", name);
            return bits.clone();
        }
        let bits: Vec<Signal> = (0..width)
            .map(|bit| {
                self.push(Node::Input {
                    name: name.to_string(),
                    bit,
                })
            })
            .collect();
        self.inputs.insert(name.to_string(), bits.clone());
        bits
    }

    /// Creates the state bits of a new latch.
    pub fn latch(&mut self, name: &str, width: usize) -> Vec<Signal> {
        assert!(!self.latches.contains_key(name), "latch '{}' already exists", name);
        let bits: Vec<Signal> = (0..width)
            .map(|bit| {
                self.push(Node::Latch {
                    name: name.to_string(),
                    bit,
                })
            })
            .collect();
        self.latches.insert(name.to_string(), bits.clone());
        bits
    }

    pub fn and(&mut self, a: Signal, b: Signal) -> Signal {
        if a == Signal::zero() || b == Signal::zero() || a == !b {
            return Signal::zero();
        }
        if a == Signal::one() || a == b {
            return b;
        }
        if b == Signal::one() {
            return a;
        }
        let key = if a < b { (a, b) } else { (b, a) };
        if let Some(&s) = self.strash.get(&key) {
            return s;
        }
        let s = self.push(Node::And(key.0, key.1));
        self.strash.insert(key, s);
        s
    }

    pub fn or(&mut self, a: Signal, b: Signal) -> Signal {
        !self.and(!a, !b)
    }

    pub fn xor(&mut self, a: Signal, b: Signal) -> Signal {
        let l = self.and(a, !b);
        let r = self.and(!a, b);
        self.or(l, r)
    }

    pub fn mux(&mut self, cond: Signal, then: Signal, other: Signal) -> Signal {
        let t = self.and(cond, then);
        let e = self.and(!cond, other);
        self.or(t, e)
    }

    pub fn and_many(&mut self, signals: impl IntoIterator<Item = Signal>) -> Signal {
        signals
            .into_iter()
            .fold(Signal::one(), |acc, s| self.and(acc, s))
    }

    pub fn constant(&self, bits: &[bool]) -> Vec<Signal> {
        bits.iter().map(|&b| Signal::from(b)).collect()
    }

    /// Modular sum, ripple-carry.
    pub fn add(&mut self, a: &[Signal], b: &[Signal]) -> Vec<Signal> {
        assert_eq!(a.len(), b.len());
        let mut carry = Signal::zero();
        let mut sum = Vec::with_capacity(a.len());
        for (&x, &y) in a.iter().zip(b) {
            let half = self.xor(x, y);
            sum.push(self.xor(half, carry));
            let both = self.and(x, y);
            let propagated = self.and(half, carry);
            carry = self.or(both, propagated);
        }
        sum
    }

    /// Unsigned `a < b`.
    pub fn ult(&mut self, a: &[Signal], b: &[Signal]) -> Signal {
        assert_eq!(a.len(), b.len());
        // Scanning from the least significant bit, the highest differing bit wins.
        let mut lt = Signal::zero();
        for (&x, &y) in a.iter().zip(b) {
            let strictly = self.and(!x, y);
            let same = !self.xor(x, y);
            let keep = self.and(same, lt);
            lt = self.or(strictly, keep);
        }
        lt
    }

    pub fn equals(&mut self, a: &[Signal], b: &[Signal]) -> Signal {
        assert_eq!(a.len(), b.len());
        let bits: Vec<Signal> = a.iter().zip(b).map(|(&x, &y)| !self.xor(x, y)).collect();
        self.and_many(bits)
    }

    pub fn mux_words(&mut self, cond: Signal, then: &[Signal], other: &[Signal]) -> Vec<Signal> {
        assert_eq!(then.len(), other.len());
        then.iter()
            .zip(other)
            .map(|(&t, &e)| self.mux(cond, t, e))
            .collect()
    }

    /// Copies `circ` into this network.
    ///
    /// Every input and latch of `circ` must be bound to signals of this
    /// network; the returned ports are expressed over the same signals.
    pub fn import(
        &mut self,
        circ: &Circuit,
        inputs: &BTreeMap<String, Vec<Signal>>,
        latches: &BTreeMap<String, Vec<Signal>>,
    ) -> Imported {
        let mut map = Vec::with_capacity(circ.nodes().len());
        for node in circ.nodes() {
            let signal = match node {
                Node::Const => Signal::zero(),
                Node::Input { name, bit } => match inputs.get(name) {
                    Some(bits) => bits[*bit],
                    None => panic!("input '{}' is not bound", name),
                },
                Node::Latch { name, bit } => match latches.get(name) {
                    Some(bits) => bits[*bit],
                    None => panic!("latch '{}' is not bound", name),
                },
                Node::And(a, b) => {
                    let a = lift(&map, *a);
                    let b = lift(&map, *b);
                    self.and(a, b)
                }
            };
            map.push(signal);
        }

        let relift = |bits: &Vec<Signal>| bits.iter().map(|&s| lift(&map, s)).collect::<Vec<_>>();
        Imported {
            outputs: circ
                .output_ports()
                .iter()
                .map(|(name, bits)| (name.clone(), relift(bits)))
                .collect(),
            latch_next: circ
                .latch_ports()
                .iter()
                .map(|(name, latch)| (name.clone(), relift(&latch.next)))
                .collect(),
        }
    }

    /// Binds every input of `circ` to the same-named input of this network.
    pub fn bind_inputs(&mut self, circ: &Circuit) -> BTreeMap<String, Vec<Signal>> {
        circ.input_ports()
            .iter()
            .map(|(name, bits)| (name.clone(), self.input(name, bits.len())))
            .collect()
    }

    /// Creates a same-named latch for every latch of `circ`.
    pub fn bind_latches(&mut self, circ: &Circuit) -> BTreeMap<String, Vec<Signal>> {
        circ.latch_ports()
            .iter()
            .map(|(name, latch)| (name.clone(), self.latch(name, latch.width())))
            .collect()
    }

    /// Seals the network. `latches` maps each latch created with
    /// [`Network::latch`] to its next-state signals and initial value.
    pub fn finish(
        self,
        outputs: BTreeMap<String, Vec<Signal>>,
        latches: BTreeMap<String, (Vec<Signal>, Vec<bool>)>,
    ) -> Circuit {
        let latches = latches
            .into_iter()
            .map(|(name, (next, init))| {
                let state = match self.latches.get(&name) {
                    Some(state) => state.clone(),
                    None => panic!("latch '{}' has no state bits", name),
                };
                assert_eq!(state.len(), next.len(), "latch '{}' width mismatch", name);
                assert_eq!(state.len(), init.len(), "latch '{}' init width mismatch", name);
                (name, Latch { state, next, init })
            })
            .collect();
        sweep(self.nodes, self.inputs, outputs, latches)
    }
}

/// Drops gates that no output or latch depends on, keeping every port.
fn sweep(
    nodes: Vec<Node>,
    inputs: BTreeMap<String, Vec<Signal>>,
    outputs: BTreeMap<String, Vec<Signal>>,
    latches: BTreeMap<String, Latch>,
) -> Circuit {
    let mut live = vec![false; nodes.len()];
    live[0] = true;
    let roots = outputs
        .values()
        .flatten()
        .chain(latches.values().flat_map(|l| l.next.iter()));
    for s in roots {
        live[s.index()] = true;
    }
    for i in (0..nodes.len()).rev() {
        match &nodes[i] {
            Node::And(a, b) if live[i] => {
                live[a.index()] = true;
                live[b.index()] = true;
            }
            Node::Input { .. } | Node::Latch { .. } => live[i] = true,
            _ => {}
        }
    }

    let mut map = Vec::with_capacity(nodes.len());
    let mut kept = Vec::new();
    for (i, node) in nodes.into_iter().enumerate() {
        if !live[i] {
            map.push(Signal::zero());
            continue;
        }
        map.push(Signal::from_index(kept.len() as u32));
        kept.push(match node {
            Node::And(a, b) => Node::And(lift(&map, a), lift(&map, b)),
            other => other,
        });
    }
    debug!("sweep: kept {} of {} nodes", kept.len(), map.len());

    let remap = |bits: Vec<Signal>| bits.into_iter().map(|s| lift(&map, s)).collect::<Vec<_>>();
    let inputs = inputs.into_iter().map(|(k, v)| (k, remap(v))).collect();
    let outputs = outputs.into_iter().map(|(k, v)| (k, remap(v))).collect();
    let latches = latches
        .into_iter()
        .map(|(k, l)| {
            let latch = Latch {
                state: remap(l.state),
                next: remap(l.next),
                init: l.init,
            };
            (k, latch)
        })
        .collect();
    Circuit::from_parts(kept, inputs, outputs, latches)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_and_folding() {
        let mut net = Network::new();
        let x = net.input("x", 1)[0];

        assert_eq!(net.and(x, Signal::zero()), Signal::zero());
        assert_eq!(net.and(x, Signal::one()), x);
        assert_eq!(net.and(x, x), x);
        assert_eq!(net.and(x, !x), Signal::zero());
        assert_eq!(net.num_nodes(), 2);
    }

    #[test]
    fn test_strash_shares_gates() {
        let mut net = Network::new();
        let x = net.input("x", 1)[0];
        let y = net.input("y", 1)[0];

        let a = net.and(x, y);
        let b = net.and(y, x);
        assert_eq!(a, b);
        assert_eq!(net.num_nodes(), 4);
    }

    #[test]
    fn test_input_is_shared_by_name() {
        let mut net = Network::new();
        let a = net.input("x", 3);
        let b = net.input("x", 3);
        assert_eq!(a, b);
    }

    #[test]
    #[should_panic(expected = "two different widths")]
    fn test_input_width_conflict() {
        let mut net = Network::new();
        net.input("x", 3);
        net.input("x", 2);
    }
}
