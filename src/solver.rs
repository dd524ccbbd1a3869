//! Satisfiability oracle.
//!
//! Queries are single-output circuits; a witness assigns every input. Trace
//! reconstruction asks many structurally similar questions, so answers are
//! memoised in a bounded table keyed by the query circuit itself.

use std::cell::RefCell;
use std::fmt::{Debug, Formatter};

use log::debug;

use crate::bdd::Bdd;
use crate::cache::Cache;
use crate::circuit::{Assignment, Circuit};
use crate::compile::compile;
use crate::error::{CoinsError, Result};
use crate::utils::{structural_hash, MyHash};

impl MyHash for Circuit {
    fn hash(&self) -> u64 {
        structural_hash(self)
    }
}

pub struct Solver {
    memo: RefCell<Cache<Circuit, Option<Assignment>>>,
}

impl Solver {
    /// Creates a solver memoising up to `2^cache_bits` queries.
    pub fn new(cache_bits: usize) -> Self {
        Self {
            memo: RefCell::new(Cache::new(cache_bits)),
        }
    }
}

impl Default for Solver {
    fn default() -> Self {
        Solver::new(12)
    }
}

impl Debug for Solver {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let memo = self.memo.borrow();
        f.debug_struct("Solver")
            .field("capacity", &memo.capacity())
            .field("hits", &memo.hits())
            .field("misses", &memo.misses())
            .finish()
    }
}

impl Solver {
    /// Returns inputs under which the single 1-bit output of `query` is true,
    /// or `None` if there are none. Unconstrained bits are `false`.
    pub fn solve(&self, query: &Circuit) -> Result<Option<Assignment>> {
        let outputs = query.outputs();
        if outputs.len() != 1 || query.output_ports().values().any(|bits| bits.len() != 1) {
            return Err(CoinsError::NotSingleOutput(outputs.into_iter().collect()));
        }

        if let Some(answer) = self.memo.borrow_mut().get(query) {
            debug!("solve: memo hit");
            return Ok(answer.clone());
        }

        let answer = Self::solve_uncached(query);
        self.memo.borrow_mut().insert(query.clone(), answer.clone());
        Ok(answer)
    }

    fn solve_uncached(query: &Circuit) -> Option<Assignment> {
        let bdd = Bdd::default();
        let compiled = compile(&bdd, query);
        let root = compiled.outputs.values().next()?[0];
        debug!("solve: {} variables, {} diagram nodes", compiled.num_vars(), bdd.size(root));

        let path = bdd.one_sat(root)?;
        let mut values = vec![false; compiled.num_vars() + 1];
        for (var, value) in path {
            values[var as usize] = value;
        }
        let witness = compiled
            .vars
            .into_iter()
            .map(|(name, vars)| {
                let bits = vars.iter().map(|&v| values[v as usize]).collect();
                (name, bits)
            })
            .collect();
        Some(witness)
    }

    pub fn hits(&self) -> usize {
        self.memo.borrow().hits()
    }
}
