//! Decision-diagram oracle.
//!
//! [`compile`] turns a circuit into one diagram per output bit. Every input
//! bit becomes its own variable; latches are read at their initial value.
//! [`count`] is the uniform model count of a 1-bit expression, as a fraction
//! of all assignments to its inputs.

use std::collections::BTreeMap;

use log::debug;
use num_bigint::BigInt;
use num_rational::BigRational;

use crate::bdd::Bdd;
use crate::circuit::Circuit;
use crate::expr::BvExpr;
use crate::network::Node;
use crate::reference::Ref;

/// Diagrams of every output bit, together with the variable of every input bit.
#[derive(Debug, Clone)]
pub struct Compiled {
    pub outputs: BTreeMap<String, Vec<Ref>>,
    pub vars: BTreeMap<String, Vec<u32>>,
}

impl Compiled {
    pub fn num_vars(&self) -> usize {
        self.vars.values().map(Vec::len).sum()
    }
}

pub fn compile(bdd: &Bdd, circ: &Circuit) -> Compiled {
    compile_ordered(bdd, circ, &[])
}

/// Like [`compile`], but the bits of the inputs in `first` take the lowest
/// variables, in the given order. Unknown names are skipped.
pub fn compile_ordered(bdd: &Bdd, circ: &Circuit, first: &[&str]) -> Compiled {
    let ports = circ.input_ports();
    let mut order: Vec<&str> = first.iter().copied().filter(|name| ports.contains_key(*name)).collect();
    for name in ports.keys() {
        if !order.contains(&name.as_str()) {
            order.push(name);
        }
    }

    let mut vars = BTreeMap::new();
    let mut next = 1;
    for name in order {
        let width = ports[name].len();
        vars.insert(name.to_string(), (next..next + width as u32).collect::<Vec<_>>());
        next += width as u32;
    }

    let latches = circ.latch_ports();
    let mut refs: Vec<Ref> = Vec::with_capacity(circ.nodes().len());
    for node in circ.nodes() {
        let r = match node {
            Node::Const => bdd.zero(),
            Node::Input { name, bit } => bdd.mk_var(vars[name][*bit]),
            Node::Latch { name, bit } => {
                if latches[name].init[*bit] {
                    bdd.one()
                } else {
                    bdd.zero()
                }
            }
            Node::And(a, b) => {
                let a = if a.is_negated() { -refs[a.index()] } else { refs[a.index()] };
                let b = if b.is_negated() { -refs[b.index()] } else { refs[b.index()] };
                bdd.apply_and(a, b)
            }
        };
        refs.push(r);
    }

    let outputs = circ
        .output_ports()
        .iter()
        .map(|(name, bits)| {
            let diagrams = bits
                .iter()
                .map(|s| if s.is_negated() { -refs[s.index()] } else { refs[s.index()] })
                .collect();
            (name.clone(), diagrams)
        })
        .collect();
    debug!("compiled {} gates into {} diagram nodes", circ.num_ands(), bdd.num_nodes());

    Compiled { outputs, vars }
}

/// Fraction of input assignments under which the 1-bit `expr` holds.
pub fn count(expr: &BvExpr) -> BigRational {
    assert_eq!(expr.size(), 1, "can only count a single bit");
    let bdd = Bdd::default();
    let compiled = compile(&bdd, expr.circuit());
    let root = compiled.outputs[expr.output()][0];
    let num_vars = compiled.num_vars();
    let models = bdd.sat_count(root, num_vars);
    BigRational::new(BigInt::from(models), BigInt::from(1) << num_vars)
}
