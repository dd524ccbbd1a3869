//! # coins-rs: Probabilistic Circuits in Rust
//!
//! **`coins-rs`** models finite-state stochastic systems as sequential
//! boolean circuits with a dedicated input of independent biased coins.
//! Randomness stays symbolic: a probability is a model count over the coin
//! input, and every question about a system is a question about a circuit.
//!
//! ## Key Features
//!
//! - **Distribution algebra**: [`Distribution`][crate::distribution::Distribution]
//!   pairs a bit-vector expression over coin inputs with a validity predicate.
//!   Operators combine distributions and compare them against constants;
//!   [`Coin::prob`][crate::distribution::Coin::prob] gives the exact rational probability.
//! - **Discrete-distribution encoder**: any finite weighted distribution becomes
//!   a circuit driven by a handful of biased coins ([`encoder`]).
//! - **Probabilistic circuits**: [`PCirc`][crate::pcirc::PCirc] composes
//!   sequentially and in parallel, merging coin channels and their biases.
//! - **MDPs**: [`Mdp`][crate::mdp::Mdp] separates system actions from
//!   environment inputs and maps traces to coin flips and back.
//! - **Exact inference**: [`prob`][crate::infer::prob] compiles a query to a
//!   decision diagram and sums probabilities in log space.
//!
//! ## Basic Usage
//!
//! ```rust
//! use coins_rs::distribution::coin;
//! use coins_rs::utils::ratio;
//!
//! let c1 = coin(&ratio(1, 3), "c1");
//! let c2 = coin(&ratio(1, 2), "c2");
//!
//! // Independent coins: Pr(c1 & c2) = 1/6.
//! let both = &c1 & &c2;
//! assert_eq!(both.prob(), ratio(1, 6));
//! ```
//!
//! ## Core Components
//!
//! - **[`circuit`]**, **[`expr`]**, **[`func`]**: named bit-vector circuits,
//!   single-output expressions and functions with symbolic encodings.
//! - **[`bdd`]**, **[`compile`]**, **[`solver`]**: the decision-diagram
//!   backend, model counting and satisfiability.
//! - **[`distribution`]**, **[`encoder`]**, **[`pcirc`]**, **[`mdp`]**: the
//!   probabilistic layers.
//! - **[`infer`]**, **[`preimage`]**: exact probabilities and coin
//!   assignments consistent with an observation.

pub mod bdd;
pub mod cache;
pub mod circuit;
pub mod compile;
pub mod distribution;
pub mod encoder;
pub mod encoding;
pub mod error;
pub mod expr;
pub mod func;
pub mod infer;
pub mod mdp;
pub mod network;
pub mod pcirc;
pub mod preimage;
pub mod reference;
pub mod sat;
pub mod signal;
pub mod solver;
pub mod utils;
