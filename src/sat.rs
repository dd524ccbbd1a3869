use std::collections::HashMap;

use num_bigint::BigUint;

use crate::bdd::Bdd;
use crate::reference::Ref;

impl Bdd {
    /// Returns one satisfying assignment for the diagram, if any exists.
    ///
    /// The assignment is a path: `(variable, value)` pairs in diagram order.
    /// Variables not on the path are unconstrained.
    ///
    /// Returns `None` if the diagram is the constant `false`.
    pub fn one_sat(&self, node: Ref) -> Option<Vec<(u32, bool)>> {
        if self.is_zero(node) {
            return None;
        }

        let mut path = Vec::new();
        let mut current = node;

        // In a reduced diagram every non-zero node reaches `one`,
        // so preferring any non-zero child never dead-ends.
        while !self.is_one(current) {
            let var = self.variable(current.index());
            let high = self.high_node(current);
            if !self.is_zero(high) {
                path.push((var, true));
                current = high;
            } else {
                path.push((var, false));
                current = self.low_node(current);
            }
        }

        Some(path)
    }

    /// Number of assignments to variables `1..=num_vars` satisfying `node`.
    pub fn sat_count(&self, node: Ref, num_vars: usize) -> BigUint {
        let mut cache = HashMap::new();
        let max = BigUint::from(1u32) << num_vars;
        self.sat_count_(node, &max, &mut cache)
    }

    fn sat_count_(&self, node: Ref, max: &BigUint, cache: &mut HashMap<Ref, BigUint>) -> BigUint {
        if self.is_zero(node) {
            return BigUint::ZERO;
        } else if self.is_one(node) {
            return max.clone();
        }

        if let Some(count) = cache.get(&node) {
            return count.clone();
        }

        let low = self.low(node.index());
        let high = self.high(node.index());

        let count_low = self.sat_count_(low, max, cache);
        let count_high = self.sat_count_(high, max, cache);

        let count: BigUint = (count_low + count_high) >> 1;
        let count = if node.is_negated() { max - count } else { count };

        cache.insert(node, count.clone());
        count
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_one_sat() {
        let bdd = Bdd::default();

        let f = bdd.apply_and_many([bdd.mk_var(1), -bdd.mk_var(2), -bdd.mk_var(3)]);
        let model = bdd.one_sat(f);
        assert_eq!(model, Some(vec![(1, true), (2, false), (3, false)]));

        assert_eq!(bdd.one_sat(bdd.zero()), None);
        assert_eq!(bdd.one_sat(bdd.one()), Some(vec![]));
    }

    #[test]
    fn test_one_sat_under_complement() {
        let bdd = Bdd::default();

        // ~(x1 & x2): the high branch of x1 leads to ~x2.
        let f = -bdd.apply_and(bdd.mk_var(1), bdd.mk_var(2));
        let model = bdd.one_sat(f).unwrap();
        assert_eq!(model, vec![(1, true), (2, false)]);
    }

    #[test]
    fn test_sat_count_terminal() {
        let bdd = Bdd::default();

        assert_eq!(bdd.sat_count(bdd.zero(), 3), BigUint::from(0u32));
        assert_eq!(bdd.sat_count(bdd.one(), 0), BigUint::from(1u32));
        assert_eq!(bdd.sat_count(bdd.one(), 3), BigUint::from(8u32));
    }

    #[test]
    fn test_sat_count_clause() {
        let bdd = Bdd::default();

        let f = bdd.apply_or(bdd.mk_var(1), bdd.mk_var(2));
        assert_eq!(bdd.sat_count(f, 2), BigUint::from(3u32));
        assert_eq!(bdd.sat_count(f, 4), BigUint::from(12u32));
        assert_eq!(bdd.sat_count(-f, 2), BigUint::from(1u32));
    }
}
