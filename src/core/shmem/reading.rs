//! Reading element decoding (e.g. usage, power, mhz...).

use serde::{Deserialize, Serialize};

use super::layout::{
    read_f64, read_string, read_u32, READING_OFF_ID, READING_OFF_LABEL_ORIG,
    READING_OFF_LABEL_USER, READING_OFF_SENSOR_INDEX, READING_OFF_TYPE, READING_OFF_UNIT,
    READING_OFF_VALUE, READING_OFF_VALUE_AVG, READING_OFF_VALUE_MAX, READING_OFF_VALUE_MIN,
    STRING_LEN, UNIT_STRING_LEN,
};
use crate::error::Result;

/// Value/unit type of a reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReadingType {
    None,
    /// Temperature in celsius
    Temp,
    /// Voltage
    Volt,
    /// RPM
    Fan,
    /// Amps
    Current,
    /// Watts
    Power,
    /// MHz
    Clock,
    /// e.g. MBs
    Usage,
    Other,
}

impl ReadingType {
    /// Map the raw type code from shared memory. Codes above the known range
    /// fold into `Other` so a newer HWiNFO build never breaks decoding.
    pub fn from_code(code: u32) -> Self {
        match code {
            0 => ReadingType::None,
            1 => ReadingType::Temp,
            2 => ReadingType::Volt,
            3 => ReadingType::Fan,
            4 => ReadingType::Current,
            5 => ReadingType::Power,
            6 => ReadingType::Clock,
            7 => ReadingType::Usage,
            _ => ReadingType::Other,
        }
    }

    pub fn as_code(&self) -> u32 {
        match self {
            ReadingType::None => 0,
            ReadingType::Temp => 1,
            ReadingType::Volt => 2,
            ReadingType::Fan => 3,
            ReadingType::Current => 4,
            ReadingType::Power => 5,
            ReadingType::Clock => 6,
            ReadingType::Usage => 7,
            ReadingType::Other => 8,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReadingType::None => "None",
            ReadingType::Temp => "Temp",
            ReadingType::Volt => "Volt",
            ReadingType::Fan => "Fan",
            ReadingType::Current => "Current",
            ReadingType::Power => "Power",
            ReadingType::Clock => "Clock",
            ReadingType::Usage => "Usage",
            ReadingType::Other => "Other",
        }
    }
}

impl std::fmt::Display for ReadingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One decoded reading element.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingRecord {
    /// Unique ID of the reading within its sensor.
    pub id: u32,
    pub reading_type: ReadingType,
    /// Index of the owning sensor in the snapshot's sensor array. A
    /// positional back-reference, not a pointer; resolved at index build.
    pub sensor_index: u32,
    /// Original label (e.g. "Chassis2 Fan").
    pub label_orig: String,
    /// Label displayed, which might have been renamed by the user.
    pub label_user: String,
    /// e.g. "RPM"
    pub unit: String,
    pub value: f64,
    pub value_min: f64,
    pub value_max: f64,
    pub value_avg: f64,
}

impl ReadingRecord {
    /// Decode one reading element from its slice of the region buffer.
    pub(crate) fn decode(data: &[u8]) -> Result<Self> {
        Ok(ReadingRecord {
            reading_type: ReadingType::from_code(read_u32(data, READING_OFF_TYPE)?),
            sensor_index: read_u32(data, READING_OFF_SENSOR_INDEX)?,
            id: read_u32(data, READING_OFF_ID)?,
            label_orig: read_string(data, READING_OFF_LABEL_ORIG, STRING_LEN)?,
            label_user: read_string(data, READING_OFF_LABEL_USER, STRING_LEN)?,
            unit: read_string(data, READING_OFF_UNIT, UNIT_STRING_LEN)?,
            value: read_f64(data, READING_OFF_VALUE)?,
            value_min: read_f64(data, READING_OFF_VALUE_MIN)?,
            value_max: read_f64(data, READING_OFF_VALUE_MAX)?,
            value_avg: read_f64(data, READING_OFF_VALUE_AVG)?,
        })
    }
}
