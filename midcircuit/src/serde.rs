use serde::{de, Deserialize, Deserializer, Serialize, Serializer};

use crate::record::{MeasurementId, MidMeasure, QubitId};

impl Serialize for MeasurementId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MeasurementId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let string = String::deserialize(deserializer)?;
        if string.is_empty() {
            return Err(de::Error::custom("measurement id must not be empty"));
        }
        Ok(MeasurementId::from(string))
    }
}

#[derive(Serialize, Deserialize)]
struct MidMeasureRepr {
    id: MeasurementId,
    wires: QubitId,
    reset: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    postselect: Option<u8>,
}

impl Serialize for MidMeasure {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        MidMeasureRepr {
            id: self.id().clone(),
            wires: self.target(),
            reset: self.reset(),
            postselect: self.postselect().map(u8::from),
        }
        .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for MidMeasure {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let repr = MidMeasureRepr::deserialize(deserializer)?;
        MidMeasure::with_id(repr.id, &[repr.wires], repr.reset, repr.postselect).map_err(de::Error::custom)
    }
}
