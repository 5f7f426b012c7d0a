//! Criterion benchmarks for composing, enumerating and scanning measurement values.

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use midcircuit::sampling::random_shots_with_rng;
use midcircuit::shots::mean;
use midcircuit::{mutually_exclusive, Circuit, MeasurementTarget, MeasurementValue, Statistic, TerminalMeasurement};
use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

const SEED: u64 = 42;

/// Measure `count` qubits of a fresh circuit, a random fraction of them postselected.
fn measured_circuit(count: usize, rng: &mut impl Rng) -> (Circuit, Vec<MeasurementValue>) {
    let mut circuit = Circuit::with_capacity(count);
    let values = (0..count)
        .map(|qubit| {
            let postselect = rng.gen_bool(0.25).then_some(1);
            circuit.measure(&[qubit], false, postselect).expect("single wire")
        })
        .collect();
    (circuit, values)
}

fn parity(values: &[MeasurementValue]) -> MeasurementValue {
    values.iter().skip(1).fold(values[0].clone(), |parity, value| parity ^ value)
}

fn merge_chain_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("MeasurementValue::merge");
    for count in [16usize, 256, 4096] {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let (_, values) = measured_circuit(count, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(count), &values, |bencher, values| {
            bencher.iter(|| values.iter().skip(1).fold(values[0].clone(), |merged, value| merged.merge(value)));
        });
    }
    group.finish();
}

fn enumeration_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("MeasurementValue::items");
    for count in [4usize, 10, 16] {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let (_, values) = measured_circuit(count, &mut rng);
        let value = parity(&values);
        group.bench_with_input(BenchmarkId::new("full", count), &value, |bencher, value| {
            bencher.iter(|| value.items().expect("within bound").iter().count());
        });
        group.bench_with_input(BenchmarkId::new("postselected", count), &value, |bencher, value| {
            bencher.iter(|| value.postselected_items().expect("within bound").iter().count());
        });
    }
    group.finish();
}

fn exclusivity_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("mutually_exclusive");
    for count in [4usize, 16, 64] {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let (_, values) = measured_circuit(count, &mut rng);
        group.bench_with_input(BenchmarkId::from_parameter(count), &values, |bencher, values| {
            bencher.iter(|| mutually_exclusive(values).expect("non-empty"));
        });
    }
    group.finish();
}

fn post_processing_benchmark(criterion: &mut Criterion) {
    let mut group = criterion.benchmark_group("Circuit::post_process");
    for count in [8usize, 64] {
        let mut rng = SmallRng::seed_from_u64(SEED);
        let (mut circuit, values) = measured_circuit(count, &mut rng);
        let observed = parity(&values[..count / 2]);
        circuit.push_measurement(TerminalMeasurement::new(
            Statistic::Expectation,
            MeasurementTarget::Value(observed.clone()),
        ));
        let records: Vec<_> = circuit.mid_measurements().cloned().collect();
        group.bench_with_input(BenchmarkId::from_parameter(count), &count, |bencher, _| {
            bencher.iter_batched(
                || random_shots_with_rng(&records, 1000, &mut rng),
                |shots| {
                    let kept = circuit.post_process(&shots).expect("complete shots");
                    mean(&observed, &kept).expect("numeric")
                },
                BatchSize::LargeInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    merge_chain_benchmark,
    enumeration_benchmark,
    exclusivity_benchmark,
    post_processing_benchmark
);
criterion_main!(benches);
