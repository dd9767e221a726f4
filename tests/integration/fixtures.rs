//! Synthetic shared memory regions for tests.

use hwinfo_bridge::core::shmem::layout::{
    HEADER_LEN, READING_ELEMENT_MIN, SENSOR_ELEMENT_MIN, STRING_LEN, UNIT_STRING_LEN,
};

pub struct SensorSpec {
    pub id: u32,
    pub instance: u32,
    pub name_orig: &'static str,
    pub name_user: &'static str,
}

pub struct ReadingSpec {
    pub id: u32,
    pub type_code: u32,
    pub sensor_index: u32,
    pub label_orig: &'static str,
    pub unit: &'static str,
    pub value: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub value_avg: f64,
}

impl ReadingSpec {
    pub fn fan(id: u32, sensor_index: u32, label: &'static str, rpm: f64) -> Self {
        ReadingSpec {
            id,
            type_code: 3,
            sensor_index,
            label_orig: label,
            unit: "RPM",
            value: rpm,
            value_min: rpm - 100.0,
            value_max: rpm + 100.0,
            value_avg: rpm,
        }
    }

    pub fn temp(id: u32, sensor_index: u32, label: &'static str, celsius: f64) -> Self {
        ReadingSpec {
            id,
            type_code: 1,
            sensor_index,
            label_orig: label,
            unit: "\u{b0}C",
            value: celsius,
            value_min: celsius - 5.0,
            value_max: celsius + 5.0,
            value_avg: celsius,
        }
    }
}

pub struct RegionBuilder {
    pub signature: [u8; 4],
    pub poll_time: u64,
    pub sensors: Vec<SensorSpec>,
    pub readings: Vec<ReadingSpec>,
}

impl RegionBuilder {
    pub fn new(poll_time: u64) -> Self {
        RegionBuilder {
            signature: *b"HWiS",
            poll_time,
            sensors: Vec::new(),
            readings: Vec::new(),
        }
    }

    pub fn sensor(mut self, id: u32, instance: u32, name: &'static str) -> Self {
        self.sensors.push(SensorSpec {
            id,
            instance,
            name_orig: name,
            name_user: name,
        });
        self
    }

    pub fn reading(mut self, reading: ReadingSpec) -> Self {
        self.readings.push(reading);
        self
    }

    pub fn build(&self) -> Vec<u8> {
        let sensor_off = HEADER_LEN;
        let reading_off = sensor_off + SENSOR_ELEMENT_MIN * self.sensors.len();
        let total = reading_off + READING_ELEMENT_MIN * self.readings.len();

        let mut buf = vec![0u8; total];
        buf[..4].copy_from_slice(&self.signature);
        buf[4..8].copy_from_slice(&1u32.to_le_bytes());
        buf[8..12].copy_from_slice(&0u32.to_le_bytes());
        buf[12..20].copy_from_slice(&self.poll_time.to_le_bytes());
        buf[20..24].copy_from_slice(&(sensor_off as u32).to_le_bytes());
        buf[24..28].copy_from_slice(&(SENSOR_ELEMENT_MIN as u32).to_le_bytes());
        buf[28..32].copy_from_slice(&(self.sensors.len() as u32).to_le_bytes());
        buf[32..36].copy_from_slice(&(reading_off as u32).to_le_bytes());
        buf[36..40].copy_from_slice(&(READING_ELEMENT_MIN as u32).to_le_bytes());
        buf[40..44].copy_from_slice(&(self.readings.len() as u32).to_le_bytes());

        for (i, sensor) in self.sensors.iter().enumerate() {
            let base = sensor_off + i * SENSOR_ELEMENT_MIN;
            buf[base..base + 4].copy_from_slice(&sensor.id.to_le_bytes());
            buf[base + 4..base + 8].copy_from_slice(&sensor.instance.to_le_bytes());
            write_str(&mut buf, base + 8, STRING_LEN, sensor.name_orig);
            write_str(&mut buf, base + 8 + STRING_LEN, STRING_LEN, sensor.name_user);
        }

        for (i, r) in self.readings.iter().enumerate() {
            let base = reading_off + i * READING_ELEMENT_MIN;
            buf[base..base + 4].copy_from_slice(&r.type_code.to_le_bytes());
            buf[base + 4..base + 8].copy_from_slice(&r.sensor_index.to_le_bytes());
            buf[base + 8..base + 12].copy_from_slice(&r.id.to_le_bytes());
            write_str(&mut buf, base + 12, STRING_LEN, r.label_orig);
            write_str(&mut buf, base + 12 + STRING_LEN, STRING_LEN, r.label_orig);
            let unit_off = base + 12 + 2 * STRING_LEN;
            write_str(&mut buf, unit_off, UNIT_STRING_LEN, r.unit);
            let values_off = unit_off + UNIT_STRING_LEN;
            buf[values_off..values_off + 8].copy_from_slice(&r.value.to_le_bytes());
            buf[values_off + 8..values_off + 16].copy_from_slice(&r.value_min.to_le_bytes());
            buf[values_off + 16..values_off + 24].copy_from_slice(&r.value_max.to_le_bytes());
            buf[values_off + 24..values_off + 32].copy_from_slice(&r.value_avg.to_le_bytes());
        }

        buf
    }
}

fn write_str(buf: &mut [u8], offset: usize, width: usize, text: &str) {
    // Latin-1 encode: every char in test fixtures is below U+0100.
    let bytes: Vec<u8> = text.chars().map(|c| c as u32 as u8).collect();
    assert!(bytes.len() < width, "fixture string too long");
    buf[offset..offset + bytes.len()].copy_from_slice(&bytes);
}

/// Two sensors, three readings: a typical small region.
pub fn small_region(poll_time: u64) -> Vec<u8> {
    RegionBuilder::new(poll_time)
        .sensor(5, 2, "CPU [#0]: AMD Ryzen")
        .sensor(7, 0, "Motherboard")
        .reading(ReadingSpec::temp(1, 0, "Core Temp", 54.5))
        .reading(ReadingSpec::temp(2, 1, "VRM Temp", 41.0))
        .reading(ReadingSpec::fan(3, 1, "Chassis2 Fan", 1200.0))
        .build()
}
