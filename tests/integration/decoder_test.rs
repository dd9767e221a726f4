use hwinfo_bridge::core::shmem::{ReadingType, Snapshot};
use hwinfo_bridge::BridgeError;

use super::fixtures::{small_region, RegionBuilder, ReadingSpec};

#[test]
fn decodes_full_region() {
    let snap = Snapshot::decode(small_region(1_700_000_000)).unwrap();
    assert_eq!(snap.poll_time(), 1_700_000_000);
    assert_eq!(snap.version(), 1);
    assert_eq!(snap.sensor_count(), 2);
    assert_eq!(snap.reading_count(), 3);

    let cpu = snap.sensor(0).unwrap();
    assert_eq!(cpu.id, 5);
    assert_eq!(cpu.instance, 2);
    assert_eq!(cpu.name_orig, "CPU [#0]: AMD Ryzen");
    assert_eq!(cpu.public_key(), "502");

    let fan = snap.reading(2).unwrap();
    assert_eq!(fan.reading_type, ReadingType::Fan);
    assert_eq!(fan.sensor_index, 1);
    assert_eq!(fan.label_orig, "Chassis2 Fan");
    assert_eq!(fan.unit, "RPM");
    assert_eq!(fan.value, 1200.0);
}

#[test]
fn unit_with_latin1_degree_sign_decodes() {
    let snap = Snapshot::decode(small_region(1)).unwrap();
    let temp = snap.reading(0).unwrap();
    assert_eq!(temp.unit, "\u{b0}C");
}

#[test]
fn sensor_iteration_is_in_section_order() {
    let snap = Snapshot::decode(small_region(1)).unwrap();
    let keys: Vec<String> = snap
        .sensors()
        .map(|s| s.unwrap().public_key())
        .collect();
    assert_eq!(keys, ["502", "700"]);
}

#[test]
fn position_past_declared_count_fails() {
    let snap = Snapshot::decode(small_region(1)).unwrap();
    assert!(matches!(
        snap.sensor(2).unwrap_err(),
        BridgeError::Integrity(_)
    ));
    assert!(matches!(
        snap.reading(3).unwrap_err(),
        BridgeError::Integrity(_)
    ));
}

#[test]
fn oversized_declared_count_is_rejected_up_front() {
    let mut region = small_region(1);
    // Claim one more reading element than the buffer holds.
    region[40..44].copy_from_slice(&4u32.to_le_bytes());
    assert!(matches!(
        Snapshot::decode(region).unwrap_err(),
        BridgeError::Integrity(_)
    ));
}

#[test]
fn empty_region_has_no_elements() {
    let region = RegionBuilder::new(9).build();
    let snap = Snapshot::decode(region).unwrap();
    assert_eq!(snap.sensor_count(), 0);
    assert!(snap.sensors().next().is_none());
}

#[test]
fn reading_for_unknown_type_code_still_decodes() {
    let region = RegionBuilder::new(1)
        .sensor(1, 0, "X")
        .reading(ReadingSpec {
            id: 9,
            type_code: 42,
            sensor_index: 0,
            label_orig: "Mystery",
            unit: "?",
            value: 1.0,
            value_min: 0.0,
            value_max: 2.0,
            value_avg: 1.0,
        })
        .build();
    let snap = Snapshot::decode(region).unwrap();
    assert_eq!(snap.reading(0).unwrap().reading_type, ReadingType::Other);
}
