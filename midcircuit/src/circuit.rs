use std::collections::{BTreeSet, HashMap};

use crate::error::{Error, Result};
use crate::record::{MidMeasure, QubitId};
use crate::shots::Shot;
use crate::value::{MeasurementValue, OutcomeLookup};

#[derive(Debug, Clone)]
pub enum Instruction {
    /// A gate applied unconditionally. The gate itself is opaque here.
    Gate { name: String, qubits: Vec<QubitId> },
    MidMeasure(MidMeasure),
    /// A gate applied only on branches where `predicate` holds.
    Conditional {
        predicate: MeasurementValue,
        name: String,
        qubits: Vec<QubitId>,
    },
}

impl Instruction {
    #[must_use]
    pub fn gate(name: impl Into<String>, qubits: &[QubitId]) -> Self {
        Instruction::Gate {
            name: name.into(),
            qubits: qubits.to_vec(),
        }
    }

    #[must_use]
    pub fn conditional(predicate: &MeasurementValue, name: impl Into<String>, qubits: &[QubitId]) -> Self {
        Instruction::Conditional {
            predicate: predicate.clone(),
            name: name.into(),
            qubits: qubits.to_vec(),
        }
    }

    /// Returns the qubits this instruction acts on.
    #[must_use]
    pub fn qubits(&self) -> Vec<QubitId> {
        match self {
            Instruction::Gate { qubits, .. } | Instruction::Conditional { qubits, .. } => qubits.clone(),
            Instruction::MidMeasure(record) => vec![record.target()],
        }
    }

    #[must_use]
    pub fn map_wires(&self, wire_map: &HashMap<QubitId, QubitId>) -> Self {
        let remap = |qubits: &[QubitId]| -> Vec<QubitId> {
            qubits
                .iter()
                .map(|qubit| wire_map.get(qubit).copied().unwrap_or(*qubit))
                .collect()
        };
        match self {
            Instruction::Gate { name, qubits } => Instruction::Gate {
                name: name.clone(),
                qubits: remap(qubits),
            },
            Instruction::MidMeasure(record) => Instruction::MidMeasure(record.map_wires(wire_map)),
            Instruction::Conditional {
                predicate,
                name,
                qubits,
            } => Instruction::Conditional {
                predicate: predicate.map_wires(wire_map),
                name: name.clone(),
                qubits: remap(qubits),
            },
        }
    }
}

/// What a terminal measurement gathers statistics of.
#[derive(Debug, Clone)]
pub enum MeasurementTarget {
    Wires(Vec<QubitId>),
    Value(MeasurementValue),
    Values(Vec<MeasurementValue>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Statistic {
    Sample,
    Counts,
    Expectation,
    Variance,
    Probabilities,
}

#[derive(Debug, Clone)]
pub struct TerminalMeasurement {
    pub statistic: Statistic,
    pub target: MeasurementTarget,
}

impl TerminalMeasurement {
    #[must_use]
    pub fn new(statistic: Statistic, target: MeasurementTarget) -> Self {
        TerminalMeasurement { statistic, target }
    }

    /// The measurement values this terminal measurement post-processes.
    #[must_use]
    pub fn values(&self) -> &[MeasurementValue] {
        match &self.target {
            MeasurementTarget::Wires(_) => &[],
            MeasurementTarget::Value(value) => std::slice::from_ref(value),
            MeasurementTarget::Values(values) => values,
        }
    }
}

#[derive(Debug, Clone, Default)]
#[must_use]
pub struct Circuit {
    pub operations: Vec<Instruction>,
    pub measurements: Vec<TerminalMeasurement>,
}

impl Circuit {
    /// Create a new empty circuit.
    pub fn new() -> Self {
        Circuit::default()
    }

    /// Create a new circuit with pre-allocated operation capacity.
    pub fn with_capacity(capacity: usize) -> Self {
        Circuit {
            operations: Vec::with_capacity(capacity),
            measurements: Vec::new(),
        }
    }

    pub fn push(&mut self, instruction: Instruction) {
        self.operations.push(instruction);
    }

    /// Record a mid-circuit measurement and return its outcome.
    ///
    /// # Errors
    ///
    /// Construction errors of [`MidMeasure::new`].
    pub fn measure(&mut self, wires: &[QubitId], reset: bool, postselect: Option<u8>) -> Result<MeasurementValue> {
        let record = MidMeasure::new(wires, reset, postselect)?;
        self.operations.push(Instruction::MidMeasure(record.clone()));
        Ok(MeasurementValue::from_record(record))
    }

    pub fn push_measurement(&mut self, measurement: TerminalMeasurement) {
        self.measurements.push(measurement);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Instruction> {
        self.operations.iter()
    }

    pub fn mid_measurements(&self) -> impl Iterator<Item = &MidMeasure> {
        self.operations.iter().filter_map(|instruction| match instruction {
            Instruction::MidMeasure(record) => Some(record),
            _ => None,
        })
    }

    pub fn outcome_count(&self) -> usize {
        self.mid_measurements().count()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn map_wires(&self, wire_map: &HashMap<QubitId, QubitId>) -> Circuit {
        Circuit {
            operations: self.operations.iter().map(|op| op.map_wires(wire_map)).collect(),
            measurements: self
                .measurements
                .iter()
                .map(|measurement| {
                    let target = match &measurement.target {
                        MeasurementTarget::Wires(wires) => MeasurementTarget::Wires(
                            wires
                                .iter()
                                .map(|wire| wire_map.get(wire).copied().unwrap_or(*wire))
                                .collect(),
                        ),
                        MeasurementTarget::Value(value) => MeasurementTarget::Value(value.map_wires(wire_map)),
                        MeasurementTarget::Values(values) => {
                            MeasurementTarget::Values(values.iter().map(|value| value.map_wires(wire_map)).collect())
                        }
                    };
                    TerminalMeasurement::new(measurement.statistic, target)
                })
                .collect(),
        }
    }

    /// Mid-circuit measurements whose outcomes must survive execution: every
    /// postselected measurement and every dependency of a terminal measurement.
    pub fn post_processed_measurements(&self) -> BTreeSet<MidMeasure> {
        let mut retained: BTreeSet<MidMeasure> =
            self.mid_measurements().filter(|record| record.is_postselected()).cloned().collect();
        for measurement in &self.measurements {
            for value in measurement.values() {
                retained.extend(value.measurements().iter().cloned());
            }
        }
        tracing::debug!(
            retained = retained.len(),
            mid_measurements = self.outcome_count(),
            "scanned post-processed measurements"
        );
        retained
    }

    /// Whether `shot` satisfies every postselection in the circuit.
    ///
    /// # Errors
    ///
    /// [`Error::MissingOutcome`] if the shot lacks a postselected measurement.
    pub fn accepts(&self, shot: &Shot) -> Result<bool> {
        for record in self.mid_measurements() {
            if let Some(required) = record.postselect() {
                let outcome = shot
                    .outcome(record)
                    .ok_or_else(|| Error::MissingOutcome { id: record.id().clone() })?;
                if outcome != required {
                    return Ok(false);
                }
            }
        }
        Ok(true)
    }

    /// Drop shots rejected by postselection and keep only the outcomes of
    /// [`Circuit::post_processed_measurements`] in the rest.
    ///
    /// # Errors
    ///
    /// [`Error::MissingOutcome`] if a shot lacks a retained measurement.
    pub fn post_process(&self, shots: &[Shot]) -> Result<Vec<Shot>> {
        let retained = self.post_processed_measurements();
        let mut kept = Vec::with_capacity(shots.len());
        for shot in shots {
            if self.accepts(shot)? {
                kept.push(shot.project(&retained)?);
            }
        }
        tracing::debug!(total = shots.len(), kept = kept.len(), "post-processed shots");
        Ok(kept)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::rngs::SmallRng;
    use rand::{Rng, SeedableRng};

    /// Configuration for circuit generation.
    #[derive(Debug, Clone, Copy)]
    struct CircuitConfig {
        qubit_count: usize,
        instruction_count: usize,
        postselect_probability: f64,
    }

    impl Default for CircuitConfig {
        fn default() -> Self {
            Self {
                qubit_count: 4,
                instruction_count: 20,
                postselect_probability: 0.2,
            }
        }
    }

    /// Generate a random circuit and the values of its mid-circuit measurements.
    fn random_circuit_with_rng(config: CircuitConfig, rng: &mut impl Rng) -> (Circuit, Vec<MeasurementValue>) {
        let mut circuit = Circuit::with_capacity(config.instruction_count);
        let mut values: Vec<MeasurementValue> = Vec::new();

        for _ in 0..config.instruction_count {
            let qubit = rng.gen_range(0..config.qubit_count);
            match rng.gen_range(0..3) {
                0 => circuit.push(Instruction::gate("H", &[qubit])),
                1 => {
                    let postselect = rng.gen_bool(config.postselect_probability).then(|| rng.gen_range(0..2u8));
                    values.push(circuit.measure(&[qubit], rng.gen(), postselect).unwrap());
                }
                _ => match values.last() {
                    Some(value) => circuit.push(Instruction::conditional(value, "X", &[qubit])),
                    None => circuit.push(Instruction::gate("X", &[qubit])),
                },
            }
        }

        (circuit, values)
    }

    fn ids(records: &BTreeSet<MidMeasure>) -> Vec<String> {
        records.iter().map(|record| record.id().to_string()).collect()
    }

    fn record(id: &str, wire: QubitId, postselect: Option<u8>) -> MidMeasure {
        MidMeasure::with_id(id, &[wire], false, postselect).unwrap()
    }

    // ========== Basic Unit Tests ==========

    #[test]
    fn empty_circuit() {
        let circuit = Circuit::new();
        assert!(circuit.is_empty());
        assert_eq!(circuit.outcome_count(), 0);
        assert!(circuit.post_processed_measurements().is_empty());
    }

    #[test]
    fn measure_records_an_operation() {
        let mut circuit = Circuit::new();
        circuit.push(Instruction::gate("H", &[0]));
        let m = circuit.measure(&[0], false, None).unwrap();
        assert_eq!(circuit.len(), 2);
        assert_eq!(circuit.outcome_count(), 1);
        assert_eq!(circuit.mid_measurements().next(), Some(&m.measurements()[0]));
        assert!(circuit.measure(&[0, 1], false, None).is_err());
        assert_eq!(circuit.len(), 2);
    }

    #[test]
    fn unobserved_measurements_are_not_retained() {
        let mut circuit = Circuit::new();
        circuit.push(Instruction::MidMeasure(record("a", 0, None)));
        circuit.push_measurement(TerminalMeasurement::new(Statistic::Probabilities, MeasurementTarget::Wires(vec![0])));
        assert!(circuit.post_processed_measurements().is_empty());
    }

    #[test]
    fn postselected_measurements_are_retained() {
        let mut circuit = Circuit::new();
        circuit.push(Instruction::MidMeasure(record("a", 0, Some(1))));
        circuit.push(Instruction::MidMeasure(record("b", 1, None)));
        assert_eq!(ids(&circuit.post_processed_measurements()), vec!["a"]);
    }

    #[test]
    fn terminal_dependencies_are_retained() {
        let (a, b, c, d) = (record("a", 0, None), record("b", 1, None), record("c", 2, None), record("d", 3, None));
        let mut circuit = Circuit::new();
        for r in [&a, &b, &c, &d] {
            circuit.push(Instruction::MidMeasure(r.clone()));
        }
        let sum = MeasurementValue::from(a) + MeasurementValue::from(b);
        circuit.push_measurement(TerminalMeasurement::new(Statistic::Expectation, MeasurementTarget::Value(sum)));
        circuit.push_measurement(TerminalMeasurement::new(
            Statistic::Sample,
            MeasurementTarget::Values(vec![MeasurementValue::from(c.clone()), !MeasurementValue::from(c)]),
        ));
        assert_eq!(ids(&circuit.post_processed_measurements()), vec!["a", "b", "c"]);
    }

    #[test]
    fn conditionals_alone_do_not_retain() {
        let mut circuit = Circuit::new();
        let m = circuit.measure(&[0], false, None).unwrap();
        circuit.push(Instruction::conditional(&m, "X", &[1]));
        assert!(circuit.post_processed_measurements().is_empty());
    }

    #[test]
    fn map_wires_keeps_identity() {
        let mut circuit = Circuit::new();
        let m = circuit.measure(&[0], false, Some(0)).unwrap();
        circuit.push(Instruction::conditional(&m, "X", &[1]));
        circuit.push_measurement(TerminalMeasurement::new(Statistic::Counts, MeasurementTarget::Value(m.clone())));

        let mapped = circuit.map_wires(&HashMap::from([(0, 5), (1, 6)]));
        assert_eq!(mapped.operations[0].qubits(), vec![5]);
        assert_eq!(mapped.operations[1].qubits(), vec![6]);
        assert_eq!(mapped.post_processed_measurements(), circuit.post_processed_measurements());
        assert_eq!(mapped.measurements[0].values()[0].wires(), vec![5]);
    }

    #[test]
    fn postselection_filters_shots() {
        let (a, b) = (record("a", 0, Some(1)), record("b", 1, None));
        let mut circuit = Circuit::new();
        circuit.push(Instruction::MidMeasure(a.clone()));
        circuit.push(Instruction::MidMeasure(b.clone()));

        let shots = vec![
            Shot::from([(a.clone(), true), (b.clone(), false)]),
            Shot::from([(a.clone(), false), (b.clone(), true)]),
            Shot::from([(a.clone(), true), (b.clone(), true)]),
        ];
        let kept = circuit.post_process(&shots).unwrap();
        assert_eq!(kept.len(), 2);
        for shot in &kept {
            assert_eq!(shot.len(), 1);
            assert_eq!(shot.outcome(&a), Some(true));
            assert_eq!(shot.outcome(&b), None);
        }

        let incomplete = Shot::from([(b, true)]);
        assert_eq!(circuit.accepts(&incomplete), Err(Error::MissingOutcome { id: "a".into() }));
    }

    // ========== Property-Based Tests ==========

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        #[test]
        fn retained_set_matches_rule(seed in any::<u64>(), observed in prop::collection::vec(any::<bool>(), 0..10)) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let (mut circuit, values) = random_circuit_with_rng(CircuitConfig::default(), &mut rng);
            let chosen: Vec<MeasurementValue> = values
                .iter()
                .zip(observed.iter())
                .filter(|(_, keep)| **keep)
                .map(|(value, _)| value.clone())
                .collect();
            circuit.push_measurement(TerminalMeasurement::new(Statistic::Sample, MeasurementTarget::Values(chosen.clone())));

            let retained = circuit.post_processed_measurements();
            for record in circuit.mid_measurements() {
                let observed = chosen.iter().any(|value| value.measurements().contains(record));
                prop_assert_eq!(retained.contains(record), observed || record.is_postselected());
            }
            prop_assert!(retained.len() <= circuit.outcome_count());
        }

        #[test]
        fn outcome_count_matches_measure_instructions(seed in any::<u64>()) {
            let mut rng = SmallRng::seed_from_u64(seed);
            let (circuit, values) = random_circuit_with_rng(CircuitConfig::default(), &mut rng);
            prop_assert_eq!(circuit.outcome_count(), values.len());
            prop_assert_eq!(circuit.iter().count(), circuit.len());
        }
    }
}
