//! Random shot generation for exercising post-processing without a simulator.

use rand::Rng;

use crate::record::MidMeasure;
use crate::shots::Shot;

/// Draw `shot_count` shots with independent uniform outcomes.
///
/// Postselected records always take their required value, as if every
/// rejected shot had already been discarded.
pub fn random_shots_with_rng(records: &[MidMeasure], shot_count: usize, rng: &mut impl Rng) -> Vec<Shot> {
    (0..shot_count)
        .map(|_| {
            records
                .iter()
                .map(|record| (record.clone(), record.postselect().unwrap_or_else(|| rng.gen())))
                .collect::<Shot>()
        })
        .collect()
}

/// Same as [`random_shots_with_rng`] with the thread-local generator.
pub fn random_shots(records: &[MidMeasure], shot_count: usize) -> Vec<Shot> {
    random_shots_with_rng(records, shot_count, &mut rand::thread_rng())
}
