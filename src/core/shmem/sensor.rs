//! Sensor element decoding (e.g. motherboard, cpu, gpu...).

use super::layout::{
    read_string, read_u32, SENSOR_OFF_ID, SENSOR_OFF_INSTANCE, SENSOR_OFF_NAME_ORIG,
    SENSOR_OFF_NAME_USER, STRING_LEN,
};
use crate::error::Result;

/// One decoded sensor element.
///
/// `id` and `instance` together identify the sensor; consumers address it by
/// the derived [`public_key`](SensorRecord::public_key).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SensorRecord {
    pub id: u32,
    pub instance: u32,
    /// Original sensor name.
    pub name_orig: String,
    /// Name displayed, which might have been renamed by the user.
    pub name_user: String,
}

impl SensorRecord {
    /// Decode one sensor element from its slice of the region buffer.
    pub(crate) fn decode(data: &[u8]) -> Result<Self> {
        Ok(SensorRecord {
            id: read_u32(data, SENSOR_OFF_ID)?,
            instance: read_u32(data, SENSOR_OFF_INSTANCE)?,
            name_orig: read_string(data, SENSOR_OFF_NAME_ORIG, STRING_LEN)?,
            name_user: read_string(data, SENSOR_OFF_NAME_USER, STRING_LEN)?,
        })
    }

    /// Public key combining id and instance, e.g. `(5, 2)` -> `"502"`.
    ///
    /// Keeps the exact derivation used by legacy consumers that persisted
    /// these keys in their settings.
    pub fn public_key(&self) -> String {
        (self.id as u64 * 100 + self.instance as u64).to_string()
    }
}
