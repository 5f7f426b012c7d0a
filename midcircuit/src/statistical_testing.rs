//! Statistical assertions for sampling tests.
//!
//! Standard tolerance thresholds:
//! - ±5% for high sample counts (≥100K samples)
//! - ±10% for lower sample counts or high-variance scenarios

use crate::record::MidMeasure;
use crate::shots::Shot;
use crate::value::OutcomeLookup;

/// Tolerance for tests with ≥100K samples.
pub const TOLERANCE_HIGH_SAMPLES: f64 = 0.05;

/// Tolerance for tests with fewer samples or higher variance.
pub const TOLERANCE_LOW_SAMPLES: f64 = 0.10;

/// Assert that `observed / total` is within `relative_tolerance` of `expected_probability`.
///
/// # Panics
/// Panics if the observed rate deviates from expected by more than the tolerance.
#[allow(clippy::cast_precision_loss)]
pub fn assert_rate_within_tolerance(
    observed: usize,
    total: usize,
    expected_probability: f64,
    relative_tolerance: f64,
    context: &str,
) {
    let observed_rate = observed as f64 / total as f64;
    let deviation = (observed_rate - expected_probability).abs() / expected_probability;
    assert!(
        deviation < relative_tolerance,
        "{context}: observed rate {observed_rate:.4} deviates from expected \
         {expected_probability:.4} by more than {:.0}%",
        relative_tolerance * 100.0
    );
}

/// Assert that every bucket holds `total_trials / counts.len()` within `relative_tolerance`.
///
/// # Panics
/// Panics if any bucket deviates from expected by more than the tolerance.
#[allow(clippy::cast_precision_loss)]
pub fn assert_uniform_distribution(counts: &[u32], total_trials: usize, relative_tolerance: f64, context: &str) {
    let expected = total_trials as f64 / counts.len() as f64;
    for (index, &count) in counts.iter().enumerate() {
        let ratio = f64::from(count) / expected;
        assert!(
            (ratio - 1.0).abs() < relative_tolerance,
            "{context}: branch {index} count {count} deviates from expected {expected:.0} \
             by {:.1}% (tolerance: ±{:.0}%)",
            (ratio - 1.0).abs() * 100.0,
            relative_tolerance * 100.0
        );
    }
}

/// Branch index of `shot` over `records`, first record as the most significant bit.
///
/// # Panics
/// Panics if the shot lacks one of `records`.
pub fn shot_to_bit_index(shot: &Shot, records: &[MidMeasure]) -> usize {
    records.iter().fold(0, |index, record| {
        let bit = shot.outcome(record).unwrap_or_else(|| panic!("shot lacks {:?}", record.id()));
        (index << 1) | usize::from(bit)
    })
}
