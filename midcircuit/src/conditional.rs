//! `if` / `else` over a measurement value, with both branches traced and
//! their variable assignments merged into symbolic selections.

use crate::error::{Error, Result};
use crate::predicates::mutually_exclusive;
use crate::scalar::Value;
use crate::value::{MeasurementValue, Operand};

/// A variable's state at a point in the traced program.
#[derive(Debug, Clone, Default)]
pub enum Variable {
    /// Not assigned yet.
    #[default]
    Undefined,
    Value(Value),
    Measurement(MeasurementValue),
}

impl Variable {
    #[must_use]
    pub fn is_defined(&self) -> bool {
        !matches!(self, Variable::Undefined)
    }

    #[must_use]
    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Variable::Value(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_measurement(&self) -> Option<&MeasurementValue> {
        match self {
            Variable::Measurement(value) => Some(value),
            _ => None,
        }
    }

    fn into_operand(self) -> Option<Operand> {
        match self {
            Variable::Undefined => None,
            Variable::Value(value) => Some(Operand::Value(value)),
            Variable::Measurement(value) => Some(Operand::Measurement(value)),
        }
    }
}

impl From<Value> for Variable {
    fn from(value: Value) -> Self {
        Variable::Value(value)
    }
}

impl From<MeasurementValue> for Variable {
    fn from(value: MeasurementValue) -> Self {
        Variable::Measurement(value)
    }
}

/// The predicate of an `if` statement.
#[derive(Debug, Clone)]
pub enum Condition {
    Concrete(bool),
    Measurement(MeasurementValue),
}

impl From<bool> for Condition {
    fn from(value: bool) -> Self {
        Condition::Concrete(value)
    }
}

impl From<MeasurementValue> for Condition {
    fn from(value: MeasurementValue) -> Self {
        Condition::Measurement(value)
    }
}

impl From<&MeasurementValue> for Condition {
    fn from(value: &MeasurementValue) -> Self {
        Condition::Measurement(value.clone())
    }
}

fn check_defined(results: &[Variable], symbol_names: &[&str]) -> Result<()> {
    if results.len() != symbol_names.len() {
        return Err(Error::StateLengthMismatch {
            expected: symbol_names.len(),
            actual: results.len(),
        });
    }
    match results.iter().zip(symbol_names).find(|(result, _)| !result.is_defined()) {
        Some((_, name)) => Err(Error::UndefinedVariable { name: (*name).to_owned() }),
        None => Ok(()),
    }
}

/// Run one branch from `initial` and return the variables it leaves behind.
fn trace_branch<C>(
    context: &mut C,
    branch: impl FnOnce(&mut C),
    initial: &[Variable],
    get_state: &impl Fn(&C) -> Vec<Variable>,
    set_state: &impl Fn(&mut C, Vec<Variable>),
    symbol_names: &[&str],
) -> Result<Vec<Variable>> {
    set_state(context, initial.to_vec());
    branch(context);
    let results = get_state(context);
    if let Err(error) = check_defined(&results, symbol_names) {
        set_state(context, initial.to_vec());
        return Err(error);
    }
    Ok(results)
}

fn merge_results(guard: &MeasurementValue, on_true: Variable, on_false: Variable) -> Variable {
    if let (Variable::Value(lhs), Variable::Value(rhs)) = (&on_true, &on_false) {
        if lhs.type_name() == rhs.type_name() && lhs == rhs {
            return on_true;
        }
    }
    match (on_true.into_operand(), on_false.into_operand()) {
        (Some(on_true), Some(on_false)) => Variable::Measurement(MeasurementValue::select(guard, on_true, on_false)),
        _ => Variable::Undefined,
    }
}

/// Execute `if predicate { true_fn } else { false_fn }` against `context`.
///
/// `get_state` reads the variables named by `symbol_names` out of the
/// context and `set_state` writes them back. A concrete predicate runs only
/// the chosen branch. A symbolic predicate runs both branches, each from the
/// initial state, and leaves every variable as a selection between the two
/// branch results guarded by the predicate. Results that agree are kept as they are.
///
/// # Errors
///
/// [`Error::UndefinedVariable`] if a branch leaves a variable unassigned,
/// [`Error::StateLengthMismatch`] if the state and `symbol_names` disagree.
/// On error the context is left in its initial state.
pub fn if_stmt<C>(
    context: &mut C,
    predicate: impl Into<Condition>,
    true_fn: impl FnOnce(&mut C),
    false_fn: impl FnOnce(&mut C),
    get_state: impl Fn(&C) -> Vec<Variable>,
    set_state: impl Fn(&mut C, Vec<Variable>),
    symbol_names: &[&str],
) -> Result<()> {
    let initial = get_state(context);
    if initial.len() != symbol_names.len() {
        return Err(Error::StateLengthMismatch {
            expected: symbol_names.len(),
            actual: initial.len(),
        });
    }

    let predicate = match predicate.into() {
        Condition::Concrete(true) => {
            let results = trace_branch(context, true_fn, &initial, &get_state, &set_state, symbol_names)?;
            set_state(context, results);
            return Ok(());
        }
        Condition::Concrete(false) => {
            let results = trace_branch(context, false_fn, &initial, &get_state, &set_state, symbol_names)?;
            set_state(context, results);
            return Ok(());
        }
        Condition::Measurement(predicate) => predicate,
    };

    let guards = mutually_exclusive(std::slice::from_ref(&predicate))?;
    let true_results = trace_branch(context, true_fn, &initial, &get_state, &set_state, symbol_names)?;
    let false_results = trace_branch(context, false_fn, &initial, &get_state, &set_state, symbol_names)?;

    let merged: Vec<Variable> = true_results
        .into_iter()
        .zip(false_results)
        .map(|(on_true, on_false)| merge_results(&guards[0], on_true, on_false))
        .collect();
    tracing::debug!(
        variables = merged.len(),
        dependencies = predicate.dependency_count(),
        "merged conditional branches"
    );
    set_state(context, merged);
    Ok(())
}
