//! The three-operation hardware query contract and its in-process backing.
//!
//! [`HardwareService`] is the entire surface the rest of the system may
//! depend on. It has two interchangeable implementations: [`SensorHub`] here
//! (inside the worker, backed by the poller) and the RPC client in
//! `ipc::client` (inside the host, backed by the worker over the wire).

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::core::index::ReadingIndex;
use crate::core::shmem::{ReadingRecord, Snapshot};
use crate::error::{BridgeError, Result};

/// One sensor as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorInfo {
    /// Public key derived from sensor id and instance.
    pub id: String,
    pub name: String,
}

/// One reading as exposed to consumers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadingInfo {
    pub id: u32,
    pub type_code: u32,
    pub type_name: String,
    pub label: String,
    pub unit: String,
    pub value: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub value_avg: f64,
}

impl From<&ReadingRecord> for ReadingInfo {
    fn from(r: &ReadingRecord) -> Self {
        ReadingInfo {
            id: r.id,
            type_code: r.reading_type.as_code(),
            type_name: r.reading_type.as_str().to_string(),
            // Original label, not the user rename: legacy consumers keyed
            // their settings off this.
            label: r.label_orig.clone(),
            unit: r.unit.clone(),
            value: r.value,
            value_min: r.value_min,
            value_max: r.value_max,
            value_avg: r.value_avg,
        }
    }
}

/// The hardware query contract.
#[async_trait]
pub trait HardwareService: Send + Sync {
    /// Poll timestamp of the current snapshot.
    async fn poll_time(&self) -> Result<u64>;

    /// All sensors in snapshot order.
    async fn sensors(&self) -> Result<Vec<SensorInfo>>;

    /// Readings belonging to one sensor, in snapshot order.
    async fn readings_for_sensor(&self, id: &str) -> Result<Vec<ReadingInfo>>;
}

#[derive(Default)]
struct HubState {
    snapshot: Option<Arc<Snapshot>>,
    index: Option<ReadingIndex>,
    last_error: Option<String>,
}

/// In-process implementation backed by the snapshot poller.
///
/// The snapshot/index pair sits behind one reader-writer lock: queries take
/// read access, while publishing a snapshot (and the one-off lazy index
/// build) takes write access only for the swap itself.
#[derive(Default)]
pub struct SensorHub {
    state: RwLock<HubState>,
}

impl SensorHub {
    pub fn new() -> Self {
        SensorHub::default()
    }

    /// Atomically replace the current snapshot and mark the index stale.
    pub fn publish(&self, snapshot: Snapshot) {
        let mut state = self.state.write();
        state.snapshot = Some(Arc::new(snapshot));
        state.index = None;
        state.last_error = None;
    }

    /// Record a poll failure. The previous snapshot, if any, keeps serving;
    /// the error only surfaces to callers while no snapshot has ever been
    /// published.
    pub fn record_error(&self, err: &BridgeError) {
        let mut state = self.state.write();
        state.last_error = Some(err.to_string());
    }

    /// Current snapshot generation, if any.
    pub fn snapshot(&self) -> Result<Arc<Snapshot>> {
        let state = self.state.read();
        match &state.snapshot {
            Some(snapshot) => Ok(Arc::clone(snapshot)),
            None => Err(BridgeError::unavailable(match &state.last_error {
                Some(e) => format!("no snapshot yet, last poll error: {e}"),
                None => "no snapshot has been published yet".to_string(),
            })),
        }
    }

    fn lookup(&self, id: &str) -> Option<Result<Vec<ReadingInfo>>> {
        let state = self.state.read();
        let index = state.index.as_ref()?;
        Some(
            index
                .readings_for(id)
                .map(|readings| readings.iter().map(ReadingInfo::from).collect()),
        )
    }
}

#[async_trait]
impl HardwareService for SensorHub {
    async fn poll_time(&self) -> Result<u64> {
        Ok(self.snapshot()?.poll_time())
    }

    async fn sensors(&self) -> Result<Vec<SensorInfo>> {
        let snapshot = self.snapshot()?;
        let mut sensors = Vec::with_capacity(snapshot.sensor_count());
        for sensor in snapshot.sensors() {
            let sensor = sensor?;
            sensors.push(SensorInfo {
                id: sensor.public_key(),
                name: sensor.name_orig.clone(),
            });
        }
        Ok(sensors)
    }

    async fn readings_for_sensor(&self, id: &str) -> Result<Vec<ReadingInfo>> {
        // Fast path: index already built for this generation.
        if let Some(result) = self.lookup(id) {
            return result;
        }

        // Slow path: build the index under the write lock, from whatever
        // snapshot is current at that moment so the pair always matches one
        // generation. A failed build is dropped wholesale and retried on the
        // next query.
        {
            let mut state = self.state.write();
            let snapshot = match &state.snapshot {
                Some(snapshot) => Arc::clone(snapshot),
                None => {
                    return Err(BridgeError::unavailable(match &state.last_error {
                        Some(e) => format!("no snapshot yet, last poll error: {e}"),
                        None => "no snapshot has been published yet".to_string(),
                    }))
                }
            };
            if state.index.is_none() {
                state.index = Some(ReadingIndex::build(&snapshot)?);
            }
        }

        self.lookup(id)
            .unwrap_or_else(|| Err(BridgeError::unavailable("snapshot replaced during query")))
    }
}
