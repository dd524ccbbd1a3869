//! Recoverable failures.
//!
//! Broken invariants (colliding names, overlapping randomness, mismatched
//! widths) are programmer errors and panic at the call site, the same way the
//! decision-diagram manager asserts on a zero variable index. Everything that
//! depends on caller-supplied data comes back as a [`CoinsError`].

use thiserror::Error;

pub type Result<T> = std::result::Result<T, CoinsError>;

#[derive(Debug, Clone, Eq, PartialEq, Error)]
pub enum CoinsError {
    /// Simulation was asked to run without a value for this input.
    #[error("missing value for input '{0}'")]
    MissingInput(String),

    /// A value of the wrong width was supplied for a port.
    #[error("port '{name}' expects {expected} bits, got {actual}")]
    WidthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    /// The named port does not exist on the circuit.
    #[error("'{0}' is not an input of the circuit")]
    UnknownInput(String),

    /// The named port does not exist on the circuit.
    #[error("'{0}' is not an output of the circuit")]
    UnknownOutput(String),

    /// A partial encoding has no code for this symbol.
    #[error("no encoding for value {symbol} on port '{name}'")]
    UnknownSymbol { name: String, symbol: String },

    /// An integer does not fit into the port width.
    #[error("value {value} does not fit into {width} bits")]
    ValueTooWide { value: u64, width: usize },

    /// Biases were given but the circuit has no reserved coin input.
    #[error("underlying circuit doesn't have coins input '{0}'")]
    MissingCoinsInput(String),

    /// The reserved coin input width disagrees with the bias vector.
    #[error("coin input has {actual} bits but {expected} biases were given")]
    CoinWidthMismatch { expected: usize, actual: usize },

    /// General relabeling may not touch the coin channel.
    #[error("use with_coins_id to relabel the coin input '{0}'")]
    ReservedCoinsRelabel(String),

    /// Probability queries need every non-coin input to be fixed.
    #[error("all inputs must be randomized, free inputs: {0:?}")]
    FreeInputs(Vec<String>),

    /// Probability queries need exactly one boolean output.
    #[error("expected a single 1-bit output, found {0:?}")]
    NotSingleOutput(Vec<String>),

    /// A preimage query did not reduce to one coin input and one output.
    #[error("malformed query: inputs {inputs:?}, outputs {outputs:?}")]
    MalformedQuery {
        inputs: Vec<String>,
        outputs: Vec<String>,
    },

    /// Trace reconstruction found no coin assignment.
    #[error("no coin flips reproduce the given trace")]
    UnrealizableTrace,

    /// Trace vectors of different lengths.
    #[error("trace has {actions} action steps but {states} state steps")]
    TraceLengthMismatch { actions: usize, states: usize },
}
