//! Finite distributions as coin-driven circuits.
//!
//! Every supported value starts as a leaf. The two cheapest subtrees are
//! repeatedly merged under a fresh coin whose bias is the first subtree's
//! share of the combined weight, until one tree is left. Coin `i` of the
//! resulting fragment is bit `i` of its coin input, in allocation order.
//!
//! The forest lives in an arena: merges only refer to earlier nodes, so the
//! circuit can be built in one forward pass.

use std::cmp::Reverse;
use std::collections::{BTreeMap, BinaryHeap};

use log::debug;
use num_rational::BigRational;
use num_traits::Zero;

use crate::circuit::Circuit;
use crate::network::Network;
use crate::signal::Signal;

/// How the merge queue is ordered.
#[derive(Debug, Copy, Clone, Default, Eq, PartialEq)]
pub enum MergeOrder {
    /// Cheapest subtree has the fewest leaves: a balanced tree with
    /// `O(log |support|)` coins on every path.
    #[default]
    Balanced,
    /// Cheapest subtree has the most leaves: a chain that consumes values
    /// one by one, in insertion order.
    Chain,
}

impl MergeOrder {
    /// Queue key of a new subtree, ahead of its weight and arena id.
    fn key(self, leaves: i64, id: usize) -> (i64, usize) {
        match self {
            MergeOrder::Balanced => (leaves, 0),
            MergeOrder::Chain => (-leaves, id),
        }
    }
}

#[derive(Debug, Clone)]
enum Tree {
    Leaf(Vec<bool>),
    /// Coin set selects `high`, clear selects `low`.
    Merge { coin: usize, high: usize, low: usize },
}

/// A coin-driven circuit producing one value.
#[derive(Debug, Clone)]
pub struct Fragment {
    pub circ: Circuit,
    pub coins_id: String,
    pub coin_biases: Vec<BigRational>,
}

/// Builds a fragment with output `name` (of `width` bits) drawn from
/// `weights`, which pairs encoded values with unnormalized weights.
///
/// Values of zero weight are dropped; at least one must remain.
pub fn encode(
    name: &str,
    width: usize,
    weights: &[(Vec<bool>, BigRational)],
    coins_id: &str,
    order: MergeOrder,
) -> Fragment {
    let mut arena = Vec::new();
    let mut queue = BinaryHeap::new();
    for (value, weight) in weights {
        assert_eq!(value.len(), width, "value {:?} does not fit {} bits", value, width);
        assert!(*weight >= BigRational::zero(), "negative weight");
        if weight.is_zero() {
            continue;
        }
        let id = arena.len();
        arena.push(Tree::Leaf(value.clone()));
        queue.push(Reverse((order.key(1, id), 1i64, weight.clone(), id)));
    }
    assert!(!queue.is_empty(), "distribution over '{}' has no support", name);

    let mut coin_biases = Vec::new();
    let mut root = 0;
    while let Some(Reverse((_, leaves1, weight1, id1))) = queue.pop() {
        let Some(Reverse((_, leaves2, weight2, id2))) = queue.pop() else {
            root = id1;
            break;
        };

        let total = &weight1 + &weight2;
        let bias = &weight1 / &total;
        debug!("merge #{} and #{} with bias {}", id1, id2, bias);
        let coin = coin_biases.len();
        coin_biases.push(bias);

        let id = arena.len();
        arena.push(Tree::Merge {
            coin,
            high: id1,
            low: id2,
        });
        let leaves = leaves1 + leaves2;
        queue.push(Reverse((order.key(leaves, id), leaves, total, id)));
    }

    let mut net = Network::new();
    let coins = if coin_biases.is_empty() {
        Vec::new()
    } else {
        net.input(coins_id, coin_biases.len())
    };
    let mut signals: Vec<Vec<Signal>> = Vec::with_capacity(arena.len());
    for tree in &arena {
        let bits = match tree {
            Tree::Leaf(value) => net.constant(value),
            Tree::Merge { coin, high, low } => {
                let (high, low) = (signals[*high].clone(), signals[*low].clone());
                net.mux_words(coins[*coin], &high, &low)
            }
        };
        signals.push(bits);
    }

    let output = signals.swap_remove(root);
    let circ = net.finish(BTreeMap::from([(name.to_string(), output)]), BTreeMap::new());
    debug!("encoded '{}' with {} coins", name, coin_biases.len());
    Fragment {
        circ,
        coins_id: coins_id.to_string(),
        coin_biases,
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;
    use crate::circuit::{from_int, to_int, Assignment};
    use crate::utils::ratio;

    fn die(order: MergeOrder) -> Fragment {
        let weights: Vec<_> = [ratio(1, 6), ratio(1, 3), ratio(1, 2)]
            .into_iter()
            .enumerate()
            .map(|(v, w)| (from_int(v as u64, 2), w))
            .collect();
        encode("x", 2, &weights, "##coins", order)
    }

    fn roll(frag: &Fragment, coins: u64) -> u64 {
        let inputs = Assignment::from([(frag.coins_id.clone(), from_int(coins, frag.coin_biases.len()))]);
        let (outputs, _) = frag.circ.eval(&inputs, &Assignment::new()).unwrap();
        to_int(&outputs["x"])
    }

    /// Exact probability of every outcome, by enumerating coin patterns.
    fn outcome_probs(frag: &Fragment, outcomes: usize) -> Vec<BigRational> {
        let n = frag.coin_biases.len();
        let mut probs = vec![BigRational::zero(); outcomes];
        for pattern in 0..(1u64 << n) {
            let mut p = ratio(1, 1);
            for (i, bias) in frag.coin_biases.iter().enumerate() {
                p *= if (pattern >> i) & 1 == 1 { bias.clone() } else { ratio(1, 1) - bias };
            }
            probs[roll(frag, pattern) as usize] += p;
        }
        probs
    }

    #[test]
    fn test_balanced_die() {
        let frag = die(MergeOrder::Balanced);
        assert_eq!(frag.coin_biases, vec![ratio(1, 3), ratio(1, 2)]);
        assert_eq!(roll(&frag, 0b00), 1);
        assert_eq!(roll(&frag, 0b01), 0);
        assert_eq!(roll(&frag, 0b10), 2);
        assert_eq!(roll(&frag, 0b11), 2);
    }

    #[test]
    fn test_orders_are_exact() {
        for order in [MergeOrder::Balanced, MergeOrder::Chain] {
            let frag = die(order);
            assert_eq!(outcome_probs(&frag, 3), vec![ratio(1, 6), ratio(1, 3), ratio(1, 2)]);
        }
    }

    #[test]
    fn test_chain_follows_insertion_order() {
        let weights: Vec<_> = [4, 3, 2, 1]
            .into_iter()
            .enumerate()
            .map(|(v, w)| (from_int(v as u64, 2), ratio(w, 1)))
            .collect();
        let frag = encode("x", 2, &weights, "##coins", MergeOrder::Chain);
        assert_eq!(frag.coin_biases, vec![ratio(4, 7), ratio(7, 9), ratio(9, 10)]);
        // The last coin splits off the last value.
        assert_eq!(roll(&frag, 0b000), 3);
        assert_eq!(roll(&frag, 0b100), 2);
        assert_eq!(roll(&frag, 0b110), 1);
        assert_eq!(roll(&frag, 0b111), 0);
    }

    #[test]
    fn test_unnormalized_weights() {
        let weights: Vec<_> = [1, 2, 3, 4, 5]
            .into_iter()
            .enumerate()
            .map(|(v, w)| (from_int(v as u64, 3), ratio(w, 1)))
            .collect();
        for order in [MergeOrder::Balanced, MergeOrder::Chain] {
            let frag = encode("x", 3, &weights, "##coins", order);
            assert_eq!(frag.coin_biases.len(), 4);
            let expected: Vec<_> = [1, 2, 3, 4, 5, 0, 0, 0].iter().map(|&w| ratio(w, 15)).collect();
            assert_eq!(outcome_probs(&frag, 8), expected);
        }
    }

    #[test]
    fn test_single_value_needs_no_coins() {
        let weights = vec![(from_int(3, 2), ratio(1, 1)), (from_int(1, 2), ratio(0, 1))];
        let frag = encode("x", 2, &weights, "##coins", MergeOrder::default());
        assert!(frag.coin_biases.is_empty());
        assert!(frag.circ.inputs().is_empty());
        let (outputs, _) = frag.circ.eval(&Assignment::new(), &Assignment::new()).unwrap();
        assert_eq!(to_int(&outputs["x"]), 3);
    }
}
