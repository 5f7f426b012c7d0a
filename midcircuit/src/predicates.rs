//! Mutually exclusive guards for `if` / `elif` / `else` chains over measurement values.

use crate::error::{Error, Result};
use crate::value::MeasurementValue;

/// Rewrite the guards `p_0, .., p_k` of an `if` / `elif` chain into `k + 2`
/// guards of which exactly one holds on every branch.
///
/// Guard `i` holds when `p_i` holds and every earlier predicate fails; the
/// final guard is the implicit `else`. Each step merges the full dependency
/// sets, so predicates that share measurements are handled like any others.
///
/// # Errors
///
/// [`Error::NoPredicates`] if `predicates` is empty.
pub fn mutually_exclusive(predicates: &[MeasurementValue]) -> Result<Vec<MeasurementValue>> {
    let (first, rest) = predicates.split_first().ok_or(Error::NoPredicates)?;
    let mut guards = Vec::with_capacity(predicates.len() + 1);
    guards.push(first.clone());
    let mut none_so_far = first.logical_not();

    for predicate in rest {
        guards.push(none_so_far.logical_and(predicate));
        none_so_far = none_so_far.logical_and(predicate.logical_not());
    }

    guards.push(none_so_far);
    Ok(guards)
}
