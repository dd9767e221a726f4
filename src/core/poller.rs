//! Snapshot polling task.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time::{interval, MissedTickBehavior};

use crate::core::service::SensorHub;
use crate::core::shmem::Snapshot;
use crate::error::Result;
use crate::platform::RegionSource;

/// Default poll cadence, matching the HWiNFO refresh rate.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Task that copies and decodes the shared memory region on a fixed interval.
///
/// On success the new snapshot replaces the hub's current one atomically and
/// marks the reading index stale. On failure the previous snapshot keeps
/// serving; the error is recorded for callers that have never seen a valid
/// snapshot. Runs until the shutdown broadcast fires.
pub async fn poll_task(
    hub: Arc<SensorHub>,
    mut source: Box<dyn RegionSource>,
    poll_interval: Duration,
    mut shutdown: broadcast::Receiver<()>,
) {
    log::info!(
        "snapshot poller started: {} every {:?}",
        source.describe(),
        poll_interval
    );

    let mut ticker = interval(poll_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                match poll_once(&mut *source) {
                    Ok(snapshot) => {
                        log::debug!(
                            "snapshot published: {} sensors, {} readings, poll_time {}",
                            snapshot.sensor_count(),
                            snapshot.reading_count(),
                            snapshot.poll_time()
                        );
                        hub.publish(snapshot);
                    }
                    Err(e) => {
                        log::warn!("poll failed: {e}");
                        hub.record_error(&e);
                    }
                }
            }
            _ = shutdown.recv() => {
                log::info!("snapshot poller shutting down");
                break;
            }
        }
    }
}

/// One read-and-decode pass over the region source.
pub fn poll_once(source: &mut dyn RegionSource) -> Result<Snapshot> {
    let bytes = source.read_region()?;
    Snapshot::decode(bytes)
}
