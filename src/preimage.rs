//! Coin assignments consistent with an observation.

use std::collections::BTreeMap;

use log::debug;

use crate::circuit::{Assignment, Circuit};
use crate::error::{CoinsError, Result};
use crate::func::Values;
use crate::network::Network;
use crate::pcirc::PCirc;
use crate::signal::Signal;
use crate::solver::Solver;

/// Output of a preimage query circuit.
pub const QUERY_ID: &str = "##query";

/// Builds a circuit over the coin channel alone that is true exactly when
/// the coins, together with the fixed `inputs` and latch values, produce the
/// given `outputs` and `latchouts` (and satisfy the validity output, if any).
///
/// Latch-ins default to the initial latch values. Every non-coin input must
/// be fixed, either directly or as a latch-in.
pub fn coins_preimage(
    pcirc: &PCirc,
    inputs: &Values,
    outputs: &Values,
    latchins: Option<&Assignment>,
    latchouts: &Assignment,
) -> Result<Circuit> {
    let func = pcirc.func();
    let mut fixed_inputs = func.encode_inputs(inputs)?;
    let mut fixed_outputs = func.encode_outputs(outputs)?;
    let latchins = latchins.cloned().unwrap_or_else(|| pcirc.latch2init());
    fixed_inputs.extend(latchins);
    fixed_outputs.extend(latchouts.clone());

    let cut = func.circ().cut_latches();
    let mut net = Network::new();
    let mut bound = BTreeMap::new();
    for (name, bits) in cut.input_ports() {
        let signals = match fixed_inputs.get(name) {
            Some(value) => {
                if value.len() != bits.len() {
                    return Err(CoinsError::WidthMismatch {
                        name: name.clone(),
                        expected: bits.len(),
                        actual: value.len(),
                    });
                }
                net.constant(value)
            }
            None => net.input(name, bits.len()),
        };
        bound.insert(name.clone(), signals);
    }
    let imported = net.import(&cut, &bound, &BTreeMap::new());

    let mut sat = Signal::one();
    for (name, value) in &fixed_outputs {
        let wire = imported
            .outputs
            .get(name)
            .ok_or_else(|| CoinsError::UnknownOutput(name.clone()))?;
        if wire.len() != value.len() {
            return Err(CoinsError::WidthMismatch {
                name: name.clone(),
                expected: wire.len(),
                actual: value.len(),
            });
        }
        let expected = net.constant(value);
        let eq = net.equals(wire, &expected);
        sat = net.and(sat, eq);
    }
    if let Some(valid) = func.valid_id() {
        sat = net.and(sat, imported.outputs[valid][0]);
    }

    let query = net.finish(BTreeMap::from([(QUERY_ID.to_string(), vec![sat])]), BTreeMap::new());
    let free = query.inputs();
    if free.len() != 1 || !free.contains(pcirc.coins_id()) {
        return Err(CoinsError::MalformedQuery {
            inputs: free.into_iter().collect(),
            outputs: query.outputs().into_iter().collect(),
        });
    }
    debug!("preimage query with {} gates", query.num_ands());
    Ok(query)
}

/// One coin assignment consistent with the observation, or `None` if the
/// observation is impossible.
pub fn find_coins(
    solver: &Solver,
    pcirc: &PCirc,
    inputs: &Values,
    outputs: &Values,
    latchins: Option<&Assignment>,
    latchouts: &Assignment,
) -> Result<Option<Vec<bool>>> {
    let query = coins_preimage(pcirc, inputs, outputs, latchins, latchouts)?;
    let witness = solver.solve(&query)?;
    Ok(witness.and_then(|mut w| w.remove(pcirc.coins_id())))
}
