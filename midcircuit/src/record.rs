//! Mid-circuit measurement records.
//!
//! A [`MidMeasure`] is a cheap, shareable handle. Equality, ordering and hashing
//! go through its [`MeasurementId`] only, so a record remapped onto other wires
//! is still the same measurement for merging and set membership.

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use derive_more::{Display, From};

use crate::error::{Error, Result};

pub type QubitId = usize;

/// Stable identity of a measurement, used as the canonical sort and dedup key.
#[derive(Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Display, From)]
#[display("{_0}")]
pub struct MeasurementId(Arc<str>);

impl MeasurementId {
    /// Fresh ids are zero-padded so that string order equals creation order.
    #[must_use]
    pub fn fresh() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        let serial = NEXT_ID.fetch_add(1, Ordering::Relaxed);
        MeasurementId(format!("mcm-{serial:016}").into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for MeasurementId {
    fn from(value: &str) -> Self {
        MeasurementId(value.into())
    }
}

impl From<String> for MeasurementId {
    fn from(value: String) -> Self {
        MeasurementId(value.into())
    }
}

impl fmt::Debug for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.as_str())
    }
}

struct MidMeasureData {
    id: MeasurementId,
    target: QubitId,
    reset: bool,
    postselect: Option<bool>,
}

/// A single computational-basis measurement performed mid-circuit.
#[derive(Clone)]
#[must_use]
pub struct MidMeasure(Arc<MidMeasureData>);

/// The metadata a record flattens into; records carry no data leaves.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MidMeasureMetadata {
    pub wires: QubitId,
    pub reset: bool,
    pub id: MeasurementId,
}

impl MidMeasure {
    /// Measure `wires` (which must name exactly one qubit) under a fresh identity.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidTarget`] unless exactly one wire is given and
    /// [`Error::InvalidPostselect`] for a postselection value other than 0 or 1.
    pub fn new(wires: &[QubitId], reset: bool, postselect: Option<u8>) -> Result<Self> {
        Self::with_id(MeasurementId::fresh(), wires, reset, postselect)
    }

    /// Like [`MidMeasure::new`] with a caller-chosen identity.
    ///
    /// # Errors
    ///
    /// Same as [`MidMeasure::new`].
    pub fn with_id(id: impl Into<MeasurementId>, wires: &[QubitId], reset: bool, postselect: Option<u8>) -> Result<Self> {
        let [target] = wires else {
            return Err(Error::InvalidTarget { count: wires.len() });
        };
        let postselect = match postselect {
            None => None,
            Some(0) => Some(false),
            Some(1) => Some(true),
            Some(value) => return Err(Error::InvalidPostselect { value }),
        };
        Ok(MidMeasure(Arc::new(MidMeasureData {
            id: id.into(),
            target: *target,
            reset,
            postselect,
        })))
    }

    #[must_use]
    pub fn id(&self) -> &MeasurementId {
        &self.0.id
    }

    #[must_use]
    pub fn target(&self) -> QubitId {
        self.0.target
    }

    #[must_use]
    pub fn reset(&self) -> bool {
        self.0.reset
    }

    /// The only outcome kept downstream of this measurement, if any.
    #[must_use]
    pub fn postselect(&self) -> Option<bool> {
        self.0.postselect
    }

    #[must_use]
    pub fn is_postselected(&self) -> bool {
        self.0.postselect.is_some()
    }

    /// Same measurement, retargeted through `wire_map`. Unmapped wires are kept.
    pub fn map_wires(&self, wire_map: &HashMap<QubitId, QubitId>) -> Self {
        let target = wire_map.get(&self.0.target).copied().unwrap_or(self.0.target);
        MidMeasure(Arc::new(MidMeasureData {
            id: self.0.id.clone(),
            target,
            reset: self.0.reset,
            postselect: self.0.postselect,
        }))
    }

    /// Drawing label, e.g. `┤↗₁├` for a measurement postselected on 1.
    #[must_use]
    pub fn label(&self) -> String {
        let mut label = String::from("┤↗");
        match self.0.postselect {
            Some(true) => label.push('₁'),
            Some(false) => label.push('₀'),
            None => {}
        }
        label.push_str(if self.0.reset { "│  │0⟩" } else { "├" });
        label
    }

    #[must_use]
    pub fn flatten(&self) -> MidMeasureMetadata {
        MidMeasureMetadata {
            wires: self.0.target,
            reset: self.0.reset,
            id: self.0.id.clone(),
        }
    }

    /// Rebuild a record from its metadata. Postselection is not part of the
    /// flattened form and comes back unconstrained.
    pub fn unflatten(metadata: MidMeasureMetadata) -> Self {
        MidMeasure(Arc::new(MidMeasureData {
            id: metadata.id,
            target: metadata.wires,
            reset: metadata.reset,
            postselect: None,
        }))
    }
}

impl PartialEq for MidMeasure {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for MidMeasure {}

impl PartialOrd for MidMeasure {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MidMeasure {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.0.id.cmp(&other.0.id)
    }
}

impl std::hash::Hash for MidMeasure {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl fmt::Debug for MidMeasure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MidMeasure")
            .field("id", &self.0.id)
            .field("wires", &self.0.target)
            .field("reset", &self.0.reset)
            .field("postselect", &self.0.postselect.map(u8::from))
            .finish()
    }
}
