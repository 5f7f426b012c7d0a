//! Concrete outcomes of executed shots and statistics of measurement values over them.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use derive_more::{Deref, Display, From};

use crate::error::{Error, Result};
use crate::record::MidMeasure;
use crate::scalar::Value;
use crate::value::{MeasurementValue, OutcomeLookup};

/// The mid-circuit measurement outcomes observed in one execution.
#[derive(Debug, Clone, Default, PartialEq, Eq, From, Deref)]
#[must_use]
pub struct Shot(HashMap<MidMeasure, bool>);

impl Shot {
    pub fn new() -> Self {
        Shot::default()
    }

    pub fn insert(&mut self, record: MidMeasure, outcome: bool) -> Option<bool> {
        self.0.insert(record, outcome)
    }

    /// The outcomes of `records` only.
    ///
    /// # Errors
    ///
    /// [`Error::MissingOutcome`] for a record this shot never observed.
    pub fn project(&self, records: &BTreeSet<MidMeasure>) -> Result<Shot> {
        records
            .iter()
            .map(|record| {
                self.outcome(record)
                    .map(|outcome| (record.clone(), outcome))
                    .ok_or_else(|| Error::MissingOutcome { id: record.id().clone() })
            })
            .collect()
    }
}

impl OutcomeLookup for Shot {
    fn outcome(&self, record: &MidMeasure) -> Option<bool> {
        self.0.get(record).copied()
    }
}

impl<const N: usize> From<[(MidMeasure, bool); N]> for Shot {
    fn from(outcomes: [(MidMeasure, bool); N]) -> Self {
        Shot(HashMap::from(outcomes))
    }
}

impl FromIterator<(MidMeasure, bool)> for Shot {
    fn from_iter<I: IntoIterator<Item = (MidMeasure, bool)>>(iter: I) -> Self {
        Shot(iter.into_iter().collect())
    }
}

/// Hashable key for a concrete output.
///
/// Numbers that compare equal share a key: `True`, `1` and `1.0` all map to
/// `"1"`. Non-integral floats keep their rendered form.
#[derive(Debug, Display, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[display("{_0}")]
pub struct ValueKey(String);

impl ValueKey {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        let mut key = String::new();
        write_key(value, &mut key);
        ValueKey(key)
    }
}

fn write_key(value: &Value, key: &mut String) {
    match value {
        Value::Bool(flag) => key.push_str(if *flag { "1" } else { "0" }),
        Value::Int(int) => key.push_str(&int.to_string()),
        Value::Float(float) if float.is_finite() && float.fract() == 0.0 && float.abs() < 9.0e18 => {
            key.push_str(&(*float as i64).to_string());
        }
        Value::Float(float) => key.push_str(&float.to_string()),
        Value::Tuple(items) => {
            key.push('(');
            for (index, item) in items.iter().enumerate() {
                if index > 0 {
                    key.push_str(", ");
                }
                write_key(item, key);
            }
            key.push(')');
        }
    }
}

/// `value` concretized on every shot, in shot order.
///
/// # Errors
///
/// The first concretization error.
pub fn sample(value: &MeasurementValue, shots: &[Shot]) -> Result<Vec<Value>> {
    shots.iter().map(|shot| value.concretize(shot)).collect()
}

fn numeric_samples(value: &MeasurementValue, shots: &[Shot], op: &'static str) -> Result<Vec<f64>> {
    sample(value, shots)?
        .iter()
        .map(|output| {
            output.as_f64().ok_or(Error::TypeMismatch {
                op,
                lhs: output.type_name(),
                rhs: "float",
            })
        })
        .collect()
}

/// Mean over `shots`; `NaN` when there are none.
///
/// # Errors
///
/// Concretization errors, or [`Error::TypeMismatch`] for a non-numeric output.
#[allow(clippy::cast_precision_loss)]
pub fn mean(value: &MeasurementValue, shots: &[Shot]) -> Result<f64> {
    let samples = numeric_samples(value, shots, "mean")?;
    Ok(samples.iter().sum::<f64>() / samples.len() as f64)
}

/// Population variance over `shots`; `NaN` when there are none.
///
/// # Errors
///
/// Same as [`mean`].
#[allow(clippy::cast_precision_loss)]
pub fn variance(value: &MeasurementValue, shots: &[Shot]) -> Result<f64> {
    let samples = numeric_samples(value, shots, "variance")?;
    let count = samples.len() as f64;
    let mean = samples.iter().sum::<f64>() / count;
    Ok(samples.iter().map(|sample| (sample - mean).powi(2)).sum::<f64>() / count)
}

/// Occurrences of each distinct output.
///
/// # Errors
///
/// The first concretization error.
pub fn counts(value: &MeasurementValue, shots: &[Shot]) -> Result<BTreeMap<ValueKey, usize>> {
    let mut counts = BTreeMap::new();
    for output in sample(value, shots)? {
        *counts.entry(ValueKey::from(&output)).or_insert(0) += 1;
    }
    Ok(counts)
}
