use std::sync::Arc;

use hwinfo_bridge::core::service::SensorHub;
use hwinfo_bridge::core::shmem::Snapshot;
use hwinfo_bridge::{BridgeError, HardwareService};

use super::fixtures::{small_region, RegionBuilder, ReadingSpec};

fn hub_with(region: Vec<u8>) -> SensorHub {
    let hub = SensorHub::new();
    hub.publish(Snapshot::decode(region).unwrap());
    hub
}

#[tokio::test]
async fn unavailable_before_first_snapshot() {
    let hub = SensorHub::new();
    assert!(matches!(
        hub.poll_time().await.unwrap_err(),
        BridgeError::Unavailable(_)
    ));
}

#[tokio::test]
async fn last_poll_error_surfaces_when_no_snapshot_exists() {
    let hub = SensorHub::new();
    hub.record_error(&BridgeError::unavailable("HWiNFO is not running"));
    let err = hub.sensors().await.unwrap_err();
    assert!(err.to_string().contains("HWiNFO is not running"));
}

#[tokio::test]
async fn sensors_use_original_names_in_snapshot_order() {
    let hub = hub_with(small_region(1));
    let sensors = hub.sensors().await.unwrap();
    let names: Vec<&str> = sensors.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, ["CPU [#0]: AMD Ryzen", "Motherboard"]);
    let keys: Vec<&str> = sensors.iter().map(|s| s.id.as_str()).collect();
    assert_eq!(keys, ["502", "700"]);
}

#[tokio::test]
async fn repeated_queries_are_order_stable_without_rebuild_effects() {
    let hub = hub_with(small_region(1));
    let first = hub.readings_for_sensor("700").await.unwrap();
    let second = hub.readings_for_sensor("700").await.unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn poll_time_tracks_latest_snapshot() {
    let hub = hub_with(small_region(100));
    assert_eq!(hub.poll_time().await.unwrap(), 100);
    hub.publish(Snapshot::decode(small_region(101)).unwrap());
    assert_eq!(hub.poll_time().await.unwrap(), 101);
}

#[tokio::test]
async fn poll_failure_keeps_serving_previous_snapshot() {
    let hub = hub_with(small_region(100));
    hub.record_error(&BridgeError::unavailable("mutex vanished"));
    // Previous snapshot stays usable; the stored error is not surfaced.
    assert_eq!(hub.poll_time().await.unwrap(), 100);
    assert_eq!(hub.sensors().await.unwrap().len(), 2);
}

#[tokio::test]
async fn failed_index_build_is_retried_and_does_not_poison() {
    let bad = RegionBuilder::new(1)
        .sensor(1, 0, "Only")
        .reading(ReadingSpec::temp(1, 9, "Dangling", 1.0))
        .build();
    let hub = hub_with(bad);

    // Build fails; no partial buckets become visible.
    assert!(matches!(
        hub.readings_for_sensor("100").await.unwrap_err(),
        BridgeError::Integrity(_)
    ));
    // And fails identically on retry within the same generation.
    assert!(matches!(
        hub.readings_for_sensor("100").await.unwrap_err(),
        BridgeError::Integrity(_)
    ));

    // The next good snapshot recovers.
    hub.publish(Snapshot::decode(small_region(2)).unwrap());
    assert_eq!(hub.readings_for_sensor("700").await.unwrap().len(), 2);
}

#[tokio::test]
async fn unknown_sensor_key_is_not_found() {
    let hub = hub_with(small_region(1));
    assert!(matches!(
        hub.readings_for_sensor("31337").await.unwrap_err(),
        BridgeError::NotFound(_)
    ));
}

/// Concurrent queriers racing snapshot publication never observe fields from
/// two different generations mixed together.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_queries_never_see_torn_generations() {
    fn generation(name: &'static str, value: f64) -> Vec<u8> {
        RegionBuilder::new(1)
            .sensor(1, 0, name)
            .reading(ReadingSpec::temp(1, 0, name, value))
            .build()
    }

    let hub = Arc::new(SensorHub::new());
    hub.publish(Snapshot::decode(generation("GenA", 1.0)).unwrap());

    let publisher = {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            for i in 0..200 {
                let (name, value) = if i % 2 == 0 {
                    ("GenB", 2.0)
                } else {
                    ("GenA", 1.0)
                };
                hub.publish(Snapshot::decode(generation(name, value)).unwrap());
                tokio::task::yield_now().await;
            }
        })
    };

    let mut readers = Vec::new();
    for _ in 0..4 {
        let hub = Arc::clone(&hub);
        readers.push(tokio::spawn(async move {
            for _ in 0..200 {
                let sensors = hub.sensors().await.unwrap();
                assert_eq!(sensors.len(), 1);
                let readings = hub.readings_for_sensor("100").await.unwrap();
                assert_eq!(readings.len(), 1);
                // Label and value always belong to the same generation.
                match readings[0].label.as_str() {
                    "GenA" => assert_eq!(readings[0].value, 1.0),
                    "GenB" => assert_eq!(readings[0].value, 2.0),
                    other => panic!("unexpected label {other}"),
                }
            }
        }));
    }

    publisher.await.unwrap();
    for reader in readers {
        reader.await.unwrap();
    }
}
