//! Exact probabilities of closed probabilistic circuits.
//!
//! The query is compiled to a decision diagram with coin `i` as variable
//! `i + 1`. One pass from the terminals up then computes, for every node `u`
//! labelled with coin `i` of bias `p`,
//!
//! ```text
//! lp(u) = logaddexp(ln p + lp(high), ln(1 - p) + lp(low))
//! ```
//!
//! with `lp(true) = 0` and `lp(false) = -inf`. Complement edges are pushed
//! down while walking, so a node and its complement are distinct entries.

use std::collections::{HashMap, HashSet};

use log::debug;
use num_traits::ToPrimitive;

use crate::bdd::Bdd;
use crate::compile::compile_ordered;
use crate::error::{CoinsError, Result};
use crate::pcirc::PCirc;
use crate::reference::Ref;
use crate::utils::log_add_exp;

/// Log-probability that `root` is true when variable `v` is an independent
/// coin of bias `biases[v - 1]`.
pub fn log_prob(bdd: &Bdd, root: Ref, biases: &[f64]) -> f64 {
    let mut parents: HashMap<Ref, Vec<Ref>> = HashMap::new();
    let mut pending: HashMap<Ref, usize> = HashMap::new();
    let mut ready = Vec::new();

    let mut seen = HashSet::from([root]);
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        if bdd.is_terminal(node) {
            ready.push(node);
            continue;
        }
        let (low, high) = (bdd.low_node(node), bdd.high_node(node));
        let kids = if low == high { vec![low] } else { vec![low, high] };
        pending.insert(node, kids.len());
        for kid in kids {
            parents.entry(kid).or_default().push(node);
            if seen.insert(kid) {
                stack.push(kid);
            }
        }
    }

    let mut lp: HashMap<Ref, f64> = HashMap::with_capacity(seen.len());
    while let Some(node) = ready.pop() {
        let value = if bdd.is_one(node) {
            0.0
        } else if bdd.is_zero(node) {
            f64::NEG_INFINITY
        } else {
            let var = bdd.variable(node.index()) as usize;
            let p = biases[var - 1];
            let high = lp[&bdd.high_node(node)];
            let low = lp[&bdd.low_node(node)];
            log_add_exp(p.ln() + high, (1.0 - p).ln() + low)
        };
        lp.insert(node, value);

        for &parent in parents.get(&node).into_iter().flatten() {
            if let Some(count) = pending.get_mut(&parent) {
                *count -= 1;
                if *count == 0 {
                    ready.push(parent);
                }
            }
        }
    }

    debug!("log_prob over {} diagram nodes", lp.len());
    lp[&root]
}

/// Probability that the single 1-bit output of `circ` is true.
///
/// Every input other than the coin channel must be fixed beforehand. If the
/// function carries a validity output, the result is conditioned on it (and
/// is NaN if the validity output can never hold). With `log` the natural
/// logarithm is returned instead.
pub fn prob(circ: &PCirc, log: bool) -> Result<f64> {
    let inputs = circ.inputs();
    if !inputs.is_empty() {
        return Err(CoinsError::FreeInputs(inputs.into_iter().collect()));
    }
    let outputs = circ.outputs();
    let output = match outputs.iter().next() {
        Some(name) if outputs.len() == 1 && circ.circ().output_width(name) == Some(1) => name.clone(),
        _ => return Err(CoinsError::NotSingleOutput(outputs.into_iter().collect())),
    };

    let bdd = Bdd::default();
    let compiled = compile_ordered(&bdd, circ.circ(), &[circ.coins_id()]);
    let biases: Vec<f64> = circ
        .coin_biases()
        .iter()
        .map(|b| b.to_f64().unwrap_or(f64::NAN))
        .collect();

    let query = compiled.outputs[&output][0];
    let result = match circ.func().valid_id() {
        Some(valid) => {
            let valid = compiled.outputs[valid][0];
            let both = bdd.apply_and(query, valid);
            log_prob(&bdd, both, &biases) - log_prob(&bdd, valid, &biases)
        }
        None => log_prob(&bdd, query, &biases),
    };
    debug!("prob({}) = exp({})", output, result);

    Ok(if log { result } else { result.exp() })
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::encoder::MergeOrder;
    use crate::encoding::Encoding;
    use crate::expr::BvExpr;
    use crate::func::FiniteFunc;
    use crate::pcirc::{pcirc, DistMap, COINS_ID};
    use crate::utils::ratio;

    fn assert_close(actual: f64, expected: f64) {
        assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
    }

    #[test]
    fn test_log_prob_terminals() {
        let bdd = Bdd::default();
        assert_eq!(log_prob(&bdd, bdd.one(), &[]), 0.0);
        assert_eq!(log_prob(&bdd, bdd.zero(), &[]), f64::NEG_INFINITY);
    }

    #[test]
    fn test_log_prob_under_complement() {
        let bdd = Bdd::default();
        let f = bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));
        let biases = [0.25, 0.5];
        assert_close(log_prob(&bdd, f, &biases).exp(), 0.125);
        assert_close(log_prob(&bdd, bdd.apply_not(f), &biases).exp(), 0.875);
    }

    #[test]
    fn test_infer_die() {
        let faces = Encoding::from_pairs([("one", 0), ("two", 1), ("three", 2), ("four", 3)]);
        let die = BvExpr::atom(2, "die");
        let query = die.equals(&BvExpr::constant(2, 0)).with_output("is_one");
        let func = FiniteFunc::from(query).with_input_encoding("die", faces);

        let dist_map = DistMap::from([(
            "die".to_string(),
            vec![("one".into(), ratio(1, 6)), ("two".into(), ratio(2, 6)), ("three".into(), ratio(3, 6))],
        )]);
        let circ = pcirc(func, &dist_map, MergeOrder::default()).unwrap();
        assert!(circ.inputs().is_empty());
        assert_close(prob(&circ, false).unwrap(), 1.0 / 6.0);
        assert_close(prob(&circ, true).unwrap(), (1.0f64 / 6.0).ln());
    }

    #[test]
    fn test_free_inputs_rejected() {
        let circ = PCirc::deterministic(BvExpr::atom(1, "x"));
        assert_eq!(prob(&circ, false).unwrap_err(), CoinsError::FreeInputs(vec!["x".to_string()]));
    }

    #[test]
    fn test_wide_output_rejected() {
        let circ = PCirc::deterministic(BvExpr::constant(2, 1).with_output("y"));
        assert_eq!(prob(&circ, false).unwrap_err(), CoinsError::NotSingleOutput(vec!["y".to_string()]));
    }

    #[test]
    fn test_conditional_on_validity() {
        let coins = BvExpr::atom(2, COINS_ID);
        let func = FiniteFunc::from(coins.index(0).with_output("first")).assume(&coins.any());
        let circ = PCirc::new(func, vec![ratio(1, 2), ratio(1, 2)], COINS_ID).unwrap();
        // Given at least one head, the first coin is heads with probability 2/3.
        assert_close(prob(&circ, false).unwrap(), 2.0 / 3.0);
    }

    #[test]
    fn test_many_coins_do_not_underflow() {
        // 2^-1100 is below the smallest positive f64.
        let n = 1100;
        let coins = BvExpr::atom(n, COINS_ID);
        let all = coins.equals(&BvExpr::from_bits(&vec![true; n])).with_output("all");
        let circ = PCirc::new(FiniteFunc::from(all), vec![ratio(1, 2); n], COINS_ID).unwrap();
        let lp = prob(&circ, true).unwrap();
        let expected = n as f64 * 0.5f64.ln();
        assert!((lp - expected).abs() < 1e-6, "{} != {}", lp, expected);
        assert_eq!(prob(&circ, false).unwrap(), 0.0);
    }
}
