//! Decision-diagram manager.
//!
//! Reduced ordered BDDs with complement edges. Every diagram built through a
//! [`Bdd`] shares its node table, so two [`Ref`]s are equal exactly when they
//! denote the same boolean function (for the fixed variable order `1 < 2 < ...`).
//!
//! Variables are 1-indexed. The inference engine maps coin bit `i` to
//! variable `i + 1`, which keeps the coin order and the diagram order aligned.
//!
//! ```
//! use coins_rs::bdd::Bdd;
//!
//! let bdd = Bdd::default();
//! let x1 = bdd.mk_var(1);
//! let x2 = bdd.mk_var(2);
//! let f = bdd.apply_and(x1, -x2);
//! assert!(!bdd.is_zero(f));
//! assert_eq!(bdd.apply_or(-x1, x2), -f);
//! ```

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::fmt::Debug;

use log::debug;

use crate::cache::Cache;
use crate::reference::Ref;
use crate::utils::{pairing3, MyHash};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
struct Node {
    variable: u32,
    low: Ref,
    high: Ref,
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
struct IteKey(Ref, Ref, Ref);

impl MyHash for IteKey {
    fn hash(&self) -> u64 {
        pairing3(
            MyHash::hash(&self.0),
            MyHash::hash(&self.1),
            MyHash::hash(&self.2),
        )
    }
}

pub struct Bdd {
    nodes: RefCell<Vec<Node>>,
    unique: RefCell<HashMap<Node, u32>>,
    cache: RefCell<Cache<IteKey, Ref>>,
}

impl Bdd {
    pub fn new(cache_bits: usize) -> Self {
        let sentinel = Node {
            variable: 0,
            low: Ref::ZERO,
            high: Ref::ZERO,
        };
        // Index 0 is unused, index 1 is the terminal.
        let nodes = vec![sentinel, sentinel];
        Self {
            nodes: RefCell::new(nodes),
            unique: RefCell::new(HashMap::new()),
            cache: RefCell::new(Cache::new(cache_bits)),
        }
    }
}

impl Default for Bdd {
    fn default() -> Self {
        Bdd::new(16)
    }
}

impl Debug for Bdd {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cache = self.cache.borrow();
        f.debug_struct("Bdd")
            .field("nodes", &self.num_nodes())
            .field("cache_hits", &cache.hits())
            .field("cache_misses", &cache.misses())
            .finish()
    }
}

impl Bdd {
    pub fn zero(&self) -> Ref {
        Ref::ZERO
    }
    pub fn one(&self) -> Ref {
        Ref::ONE
    }

    /// Number of allocated internal nodes.
    pub fn num_nodes(&self) -> usize {
        self.nodes.borrow().len() - 2
    }

    pub fn variable(&self, index: usize) -> u32 {
        self.nodes.borrow()[index].variable
    }
    pub fn low(&self, index: usize) -> Ref {
        self.nodes.borrow()[index].low
    }
    pub fn high(&self, index: usize) -> Ref {
        self.nodes.borrow()[index].high
    }

    /// Low child of `node`, with the complement edge pushed down.
    pub fn low_node(&self, node: Ref) -> Ref {
        let low = self.low(node.index());
        if node.is_negated() {
            -low
        } else {
            low
        }
    }
    /// High child of `node`, with the complement edge pushed down.
    pub fn high_node(&self, node: Ref) -> Ref {
        let high = self.high(node.index());
        if node.is_negated() {
            -high
        } else {
            high
        }
    }

    pub fn is_zero(&self, node: Ref) -> bool {
        node == Ref::ZERO
    }
    pub fn is_one(&self, node: Ref) -> bool {
        node == Ref::ONE
    }
    pub fn is_terminal(&self, node: Ref) -> bool {
        node.index() == 1
    }

    pub fn mk_node(&self, v: u32, low: Ref, high: Ref) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");

        // The high edge is never complemented in the table.
        if high.is_negated() {
            return -self.mk_node(v, -low, -high);
        }
        if low == high {
            return low;
        }

        let node = Node {
            variable: v,
            low,
            high,
        };
        if let Some(&i) = self.unique.borrow().get(&node) {
            return Ref::positive(i);
        }
        let mut nodes = self.nodes.borrow_mut();
        let i = nodes.len() as u32;
        nodes.push(node);
        self.unique.borrow_mut().insert(node, i);
        Ref::positive(i)
    }

    pub fn mk_var(&self, v: u32) -> Ref {
        assert_ne!(v, 0, "Variable index should not be zero");
        self.mk_node(v, Ref::ZERO, Ref::ONE)
    }

    fn top_variable(&self, node: Ref) -> u32 {
        if self.is_terminal(node) {
            u32::MAX
        } else {
            self.variable(node.index())
        }
    }

    pub fn top_cofactors(&self, node: Ref, v: u32) -> (Ref, Ref) {
        assert_ne!(v, 0, "Variable index should not be zero");
        if self.is_terminal(node) || v < self.variable(node.index()) {
            return (node, node);
        }
        assert_eq!(v, self.variable(node.index()));
        (self.low_node(node), self.high_node(node))
    }

    /// Apply the ITE operation to the arguments.
    ///
    /// ```text
    /// ITE(x, y, z) = (x ∧ y) ∨ (¬x ∧ z)
    /// ```
    pub fn apply_ite(&self, f: Ref, g: Ref, h: Ref) -> Ref {
        // Terminal cases:
        if self.is_one(f) {
            return g;
        }
        if self.is_zero(f) {
            return h;
        }
        if g == h {
            return g;
        }
        if self.is_one(g) && self.is_zero(h) {
            return f;
        }
        if self.is_zero(g) && self.is_one(h) {
            return -f;
        }

        // Standard triples:
        //   ite(F,F,H) => ite(F,1,H)
        //   ite(F,G,F) => ite(F,G,0)
        //   ite(F,~F,H) => ite(F,0,H)
        //   ite(F,G,~F) => ite(F,G,1)
        let (g, h) = match () {
            _ if g == f => (Ref::ONE, h),
            _ if g == -f => (Ref::ZERO, h),
            _ if h == f => (g, Ref::ZERO),
            _ if h == -f => (g, Ref::ONE),
            _ => (g, h),
        };
        if g == h {
            return g;
        }

        // ite(~F,G,H) => ite(F,H,G)
        let (f, g, h) = if f.is_negated() { (-f, h, g) } else { (f, g, h) };
        // ite(F,~G,H) => ~ite(F,G,~H)
        let (g, h, negate) = if g.is_negated() {
            (-g, -h, true)
        } else {
            (g, h, false)
        };

        let key = IteKey(f, g, h);
        if let Some(&res) = self.cache.borrow_mut().get(&key) {
            return if negate { -res } else { res };
        }

        let m = self
            .top_variable(f)
            .min(self.top_variable(g))
            .min(self.top_variable(h));
        assert_ne!(m, u32::MAX);

        let (f0, f1) = self.top_cofactors(f, m);
        let (g0, g1) = self.top_cofactors(g, m);
        let (h0, h1) = self.top_cofactors(h, m);

        let e = self.apply_ite(f0, g0, h0);
        let t = self.apply_ite(f1, g1, h1);
        let res = self.mk_node(m, e, t);

        self.cache.borrow_mut().insert(key, res);
        if negate {
            -res
        } else {
            res
        }
    }

    pub fn apply_not(&self, f: Ref) -> Ref {
        -f
    }

    pub fn apply_and(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, Ref::ZERO)
    }

    pub fn apply_or(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, Ref::ONE, v)
    }

    pub fn apply_xor(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, -v, v)
    }

    pub fn apply_eq(&self, u: Ref, v: Ref) -> Ref {
        self.apply_ite(u, v, -v)
    }

    pub fn apply_and_many(&self, nodes: impl IntoIterator<Item = Ref>) -> Ref {
        nodes
            .into_iter()
            .fold(Ref::ONE, |acc, node| self.apply_and(acc, node))
    }

    /// Internal node indices reachable from `nodes`, the terminal included.
    pub fn descendants(&self, nodes: impl IntoIterator<Item = Ref>) -> HashSet<usize> {
        let mut visited = HashSet::new();
        let mut stack: Vec<Ref> = nodes.into_iter().collect();
        while let Some(node) = stack.pop() {
            if visited.insert(node.index()) && !self.is_terminal(node) {
                stack.push(self.low(node.index()));
                stack.push(self.high(node.index()));
            }
        }
        visited
    }

    pub fn size(&self, f: Ref) -> usize {
        let size = self.descendants([f]).len();
        debug!("size({}) = {}", f, size);
        size
    }

    pub fn to_bracket_string(&self, node: Ref) -> String {
        if self.is_zero(node) {
            return "(0)".to_string();
        } else if self.is_one(node) {
            return "(1)".to_string();
        }
        format!(
            "{}:(x{}, {}, {})",
            node,
            self.variable(node.index()),
            self.to_bracket_string(self.high_node(node)),
            self.to_bracket_string(self.low_node(node))
        )
    }
}

#[cfg(test)]
mod tests {
    use test_log::test;

    use super::*;

    #[test]
    fn test_var() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);

        assert_eq!(bdd.variable(x.index()), 1);
        assert_eq!(bdd.high_node(x), bdd.one());
        assert_eq!(bdd.low_node(x), bdd.zero());
        assert_eq!(bdd.high_node(-x), bdd.zero());
        assert_eq!(bdd.low_node(-x), bdd.one());
    }

    #[test]
    fn test_hash_consing() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let before = bdd.num_nodes();
        let f = bdd.apply_and(x, y);
        let g = bdd.apply_and(y, x);
        assert_eq!(f, g);
        assert_eq!(bdd.num_nodes(), before + 1);
    }

    #[test]
    fn test_de_morgan() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);

        assert_eq!(-bdd.apply_and(x, y), bdd.apply_or(-x, -y));
        assert_eq!(-bdd.apply_or(x, y), bdd.apply_and(-x, -y));
    }

    #[test]
    fn test_xor_itself() {
        let bdd = Bdd::default();

        let x = bdd.mk_var(1);
        let y = bdd.mk_var(2);
        let f = bdd.apply_and(x, y);

        assert_eq!(bdd.apply_xor(f, f), bdd.zero());
        assert_eq!(bdd.apply_xor(f, -f), bdd.one());
        assert_eq!(bdd.apply_eq(f, f), bdd.one());
    }

    #[test]
    fn test_apply_ite() {
        let bdd = Bdd::default();

        let f = bdd.mk_var(1);
        let g = bdd.mk_var(2);
        let h = bdd.mk_var(3);
        assert_eq!(bdd.apply_ite(bdd.one(), g, h), g);
        assert_eq!(bdd.apply_ite(bdd.zero(), g, h), h);
        assert_eq!(bdd.apply_ite(f, g, g), g);
        assert_eq!(bdd.apply_ite(f, f, h), bdd.apply_or(f, h));
        assert_eq!(bdd.apply_ite(f, g, f), bdd.apply_and(f, g));

        let ite = bdd.apply_ite(f, g, h);
        let expected = bdd.apply_or(bdd.apply_and(f, g), bdd.apply_and(-f, h));
        assert_eq!(ite, expected);
        assert_eq!(bdd.apply_ite(-f, h, g), ite);
    }

    #[test]
    fn test_size() {
        let bdd = Bdd::default();

        let f = bdd.apply_and_many([1, 2, 3].map(|v| bdd.mk_var(v)));
        // Three internal nodes plus the terminal.
        assert_eq!(bdd.size(f), 4);
        assert_eq!(bdd.size(-f), 4);
    }
}
