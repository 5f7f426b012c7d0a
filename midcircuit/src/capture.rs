//! The mid-circuit measurement primitive used by staged program capture.
//!
//! In eager mode binding the primitive measures immediately. In staged mode
//! it records the measurement and reports the abstract type of its outcome,
//! a scalar integer whose width follows [`Config::enable_x64`].

use std::sync::OnceLock;

use derive_more::Display;

use crate::config::{CaptureMode, Config};
use crate::error::Result;
use crate::record::{MidMeasure, QubitId};
use crate::value::MeasurementValue;

#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegerType {
    #[display("int32")]
    Int32,
    #[display("int64")]
    Int64,
}

/// Shape and element type of a traced outcome. Measurement outcomes are scalars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AbstractScalar {
    pub dtype: IntegerType,
}

impl AbstractScalar {
    #[must_use]
    pub fn shape(&self) -> &'static [usize] {
        &[]
    }
}

/// A measurement recorded for staged compilation.
#[derive(Debug, Clone)]
pub struct DeferredMeasurement {
    pub record: MidMeasure,
    pub output: AbstractScalar,
}

#[derive(Debug, Clone)]
pub enum Measured {
    Value(MeasurementValue),
    Deferred(DeferredMeasurement),
}

impl Measured {
    #[must_use]
    pub fn into_value(self) -> Option<MeasurementValue> {
        match self {
            Measured::Value(value) => Some(value),
            Measured::Deferred(_) => None,
        }
    }
}

#[derive(Debug)]
pub struct MidMeasurePrimitive {
    name: &'static str,
}

impl MidMeasurePrimitive {
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Measure `wires` now, or record the measurement when `config` stages capture.
    ///
    /// # Errors
    ///
    /// Construction errors of [`MidMeasure::new`], in either mode.
    pub fn bind(&self, wires: &[QubitId], reset: bool, postselect: Option<u8>, config: &Config) -> Result<Measured> {
        let record = MidMeasure::new(wires, reset, postselect)?;
        match config.capture {
            CaptureMode::Eager => Ok(Measured::Value(MeasurementValue::from_record(record))),
            CaptureMode::Staged => {
                let output = self.abstract_eval(config);
                tracing::debug!(primitive = self.name, id = %record.id(), dtype = %output.dtype, "staged measurement");
                Ok(Measured::Deferred(DeferredMeasurement { record, output }))
            }
        }
    }

    pub fn abstract_eval(&self, config: &Config) -> AbstractScalar {
        let dtype = if config.enable_x64 {
            IntegerType::Int64
        } else {
            IntegerType::Int32
        };
        AbstractScalar { dtype }
    }
}

/// The process-wide measurement primitive, created on first use.
pub fn mid_measure_primitive() -> &'static MidMeasurePrimitive {
    static PRIMITIVE: OnceLock<MidMeasurePrimitive> = OnceLock::new();
    PRIMITIVE.get_or_init(|| MidMeasurePrimitive { name: "measure" })
}
