//! Symbolic values over mid-circuit measurement outcomes.
//!
//! A [`MeasurementValue`] stands for a classical result computed from
//! measurement outcomes that are not known yet. Values compose with ordinary
//! operators, enumerate their branches, and concretize once outcomes arrive.

pub mod branches;
pub mod capture;
pub mod circuit;
pub mod conditional;
pub mod config;
pub mod error;
mod plan;
pub mod predicates;
pub mod record;
pub mod sampling;
pub mod scalar;
pub mod shots;
pub mod value;

#[cfg(test)]
pub(crate) mod statistical_testing;

#[cfg(feature = "serde")]
mod serde;

pub use branches::{Branch, Branches, PostselectedBranches};
pub use capture::{mid_measure_primitive, Measured, MidMeasurePrimitive};
pub use circuit::{Circuit, Instruction, MeasurementTarget, Statistic, TerminalMeasurement};
pub use conditional::{if_stmt, Condition, Variable};
pub use config::{CaptureMode, Config};
pub use error::{Error, Result};
pub use predicates::mutually_exclusive;
pub use record::{MeasurementId, MidMeasure, MidMeasureMetadata, QubitId};
pub use scalar::{BinaryOp, UnaryOp, Value};
pub use shots::{Shot, ValueKey};
pub use value::{measure, MeasurementValue, Operand, OutcomeLookup};
