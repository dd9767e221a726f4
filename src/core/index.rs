//! Per-snapshot index from sensor public key to its readings.
//!
//! Built lazily on the first query after a snapshot replacement, O(S + R):
//! one pass over the sensors to fix the ordered key list, one pass over the
//! readings resolving each positional sensor back-reference against it. The
//! index owns its decoded records, so it stays valid even after the snapshot
//! that produced it is superseded.

use std::collections::HashMap;

use crate::core::shmem::{ReadingRecord, Snapshot};
use crate::error::{BridgeError, Result};

#[derive(Debug, Default)]
pub struct ReadingIndex {
    /// Sensor public keys in snapshot order.
    keys: Vec<String>,
    buckets: HashMap<String, Vec<ReadingRecord>>,
}

impl ReadingIndex {
    /// Build the index for one snapshot generation.
    ///
    /// A reading whose sensor index falls outside the sensor list fails the
    /// whole build; the caller discards the partial result and retries on the
    /// next query rather than serving partially filled buckets.
    pub fn build(snapshot: &Snapshot) -> Result<Self> {
        let mut keys = Vec::with_capacity(snapshot.sensor_count());
        for sensor in snapshot.sensors() {
            keys.push(sensor?.public_key());
        }

        let mut buckets: HashMap<String, Vec<ReadingRecord>> = HashMap::new();
        for reading in snapshot.readings() {
            let reading = reading?;
            let key = keys.get(reading.sensor_index as usize).ok_or_else(|| {
                BridgeError::integrity(format!(
                    "reading {} references sensor index {} but snapshot has {} sensors",
                    reading.id,
                    reading.sensor_index,
                    keys.len()
                ))
            })?;
            buckets.entry(key.clone()).or_default().push(reading);
        }

        Ok(ReadingIndex { keys, buckets })
    }

    /// Ordered sensor public keys of the generation this index was built from.
    pub fn sensor_keys(&self) -> &[String] {
        &self.keys
    }

    /// Readings for a sensor public key, in snapshot order.
    pub fn readings_for(&self, key: &str) -> Result<&[ReadingRecord]> {
        match self.buckets.get(key) {
            Some(readings) => Ok(readings),
            // A known sensor may simply have no readings.
            None if self.keys.iter().any(|k| k == key) => Ok(&[]),
            None => Err(BridgeError::not_found(format!(
                "readings for sensor id {key} do not exist"
            ))),
        }
    }
}
