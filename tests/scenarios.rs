use std::collections::{BTreeMap, BTreeSet};

use test_log::test;

use coins_rs::circuit::Assignment;
use coins_rs::distribution::{binomial, coin, dist, Distribution};
use coins_rs::encoder::MergeOrder;
use coins_rs::encoding::{Encoding, Value};
use coins_rs::expr::BvExpr;
use coins_rs::func::FiniteFunc;
use coins_rs::infer::prob;
use coins_rs::mdp::Mdp;
use coins_rs::pcirc::{pcirc, DistMap, PCirc};
use coins_rs::solver::Solver;
use coins_rs::utils::ratio;

fn assert_close(actual: f64, expected: f64) {
    assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected);
}

#[test]
fn test_weighted_die_frequencies() {
    let die = dist(&[ratio(1, 6), ratio(3, 6), ratio(2, 6)], "x");
    assert_eq!(die.freqs(), vec![ratio(1, 6), ratio(1, 2), ratio(1, 3)]);

    let even_or_odd = &die.bit(0) | &die.bit(1);
    assert_eq!(even_or_odd.prob(), ratio(2, 3));
}

#[test]
fn test_binomial() {
    let b = binomial(6, "b");
    let expected: Vec<_> = [1, 6, 15, 20, 15, 6, 1].iter().map(|&k| ratio(k, 64)).collect();
    assert_eq!(b.freqs(), expected);
}

#[test]
fn test_coin_complement() {
    let c = coin(&ratio(3, 7), "c");
    let total = c.prob() + (!&c).prob();
    assert_eq!(total, ratio(1, 1));
}

#[test]
fn test_one_hot_outcomes() {
    let d = dist(&[ratio(1, 4), ratio(1, 4), ratio(1, 2)], "d");
    // Exactly one outcome bit is set on every valid draw.
    let a = d.bit(0);
    let b = d.bit(1);
    let c = d.bit(2);
    let two = &(&(&a & &b) | &(&a & &c)) | &(&b & &c);
    assert_eq!(two.prob(), ratio(0, 1));
    let any = &(&a | &b) | &c;
    assert_eq!(any.prob(), ratio(1, 1));
}

#[test]
fn test_single_value_has_no_coins() {
    let func = FiniteFunc::from(BvExpr::atom(2, "x").with_output("y"));
    let dist_map: DistMap = BTreeMap::from([("x".to_string(), vec![(Value::Int(2), ratio(1, 1))])]);
    let circ = pcirc(func, &dist_map, MergeOrder::default()).unwrap();
    assert_eq!(circ.num_coins(), 0);
    assert!(circ.inputs().is_empty());

    let (outputs, _) = circ.call(&BTreeMap::new(), None).unwrap();
    assert_eq!(outputs["y"], Value::Int(2));
}

#[test]
fn test_infer_weighted_die() {
    let faces = Encoding::from_pairs([("one", 0), ("two", 1), ("three", 2)]);
    let roll = BvExpr::atom(2, "roll");
    let query = roll.gt(&BvExpr::constant(2, 0)).with_output("not_one");
    let func = FiniteFunc::from(query).with_input_encoding("roll", faces);
    let dist_map: DistMap = BTreeMap::from([(
        "roll".to_string(),
        vec![("one".into(), ratio(1, 6)), ("two".into(), ratio(3, 6)), ("three".into(), ratio(2, 6))],
    )]);
    for order in [MergeOrder::Balanced, MergeOrder::Chain] {
        let circ = pcirc(func.clone(), &dist_map, order).unwrap();
        assert_close(prob(&circ, false).unwrap(), 5.0 / 6.0);
    }
}

#[test]
fn test_sequential_composition_merges_coins() {
    let x = BvExpr::atom(1, "x");
    let y = BvExpr::atom(1, "y");
    let left = pcirc(
        x.with_output("x"),
        &BTreeMap::from([("x".to_string(), vec![(Value::Int(1), ratio(1, 4)), (Value::Int(0), ratio(3, 4))])]),
        MergeOrder::default(),
    )
    .unwrap();
    let right = pcirc(
        (&x & &y).with_output("both"),
        &BTreeMap::from([("y".to_string(), vec![(Value::Int(1), ratio(1, 2)), (Value::Int(0), ratio(1, 2))])]),
        MergeOrder::default(),
    )
    .unwrap();

    let both: PCirc = &left >> &right;
    assert_eq!(both.num_coins(), left.num_coins() + right.num_coins());
    assert!(both.inputs().is_empty());
    assert_close(prob(&both, false).unwrap(), 1.0 / 8.0);
}

#[test]
fn test_closed_mdp() {
    let s = BvExpr::atom(1, "s");
    let a = BvExpr::atom(1, "a");
    let c1 = BvExpr::atom(1, "c1");
    let dynamics = Mdp::from((&s ^ &a).with_output("s")) << (&c1 & &a).with_output("a");
    let dynamics = dynamics << Distribution::from(coin(&ratio(1, 8), "c1"));

    let c2 = BvExpr::atom(1, "c2");
    let policy = Mdp::from(c2.with_output("a")) << Distribution::from(coin(&ratio(1, 8), "c2"));

    let sys = (policy >> dynamics).feedback(&["s"], &["s"], None, Some(&["s_prev"]), true);
    assert_eq!(sys.inputs(), BTreeSet::new());
    assert_eq!(sys.outputs(), BTreeSet::from(["s".to_string()]));
}

#[test]
fn test_trace_roundtrip() {
    let action = BvExpr::atom(1, "action");
    let x_prev = BvExpr::atom(1, "x_prev");
    let c = BvExpr::atom(1, "c");
    let x_next = (&(&x_prev & &c) & &action).with_output("x_next");
    let sys = Mdp::from(x_next).feedback(&["x_prev"], &["x_next"], Some(&[vec![true]]), None, true)
        << Distribution::from(coin(&ratio(1, 2), "c"));

    let actions = vec![Assignment::from([("action".to_string(), vec![true])]); 4];
    let states = vec![Assignment::from([("x_next".to_string(), vec![true])]); 4];
    let solver = Solver::default();
    let encoded = sys.encode_trc(&solver, &actions, &states).unwrap();
    assert_eq!(encoded.len(), 4);

    let (decoded_actions, decoded_states) = sys.decode_trc(&encoded).unwrap();
    assert_eq!(decoded_actions, actions);
    assert_eq!(decoded_states, states);
}
