//! Raw byte layout of the HWiNFO shared memory region.
//!
//! The region is a packed little-endian footprint: a fixed header followed by
//! a contiguous array of fixed-stride sensor elements, then a contiguous
//! array of fixed-stride reading elements. Element strides are declared in
//! the header, so field offsets below are minimums, not the stride.

use crate::error::{BridgeError, Result};

/// Signature of an active region ("HWiS"). HWiNFO writes "DEAD" on shutdown.
pub const SIGNATURE_ACTIVE: [u8; 4] = *b"HWiS";
/// Signature left behind when HWiNFO deactivates shared memory support.
pub const SIGNATURE_DEAD: [u8; 4] = *b"DEAD";

/// Fixed-width sensor/reading name and label strings.
pub const STRING_LEN: usize = 128;
/// Fixed-width unit strings (e.g. "RPM").
pub const UNIT_STRING_LEN: usize = 16;

/// Size of the fixed header preceding the sensor section.
pub const HEADER_LEN: usize = 44;

// Header field offsets.
const OFF_SIGNATURE: usize = 0;
const OFF_VERSION: usize = 4;
const OFF_REVISION: usize = 8;
const OFF_POLL_TIME: usize = 12;
const OFF_SENSOR_SECTION: usize = 20;
const OFF_SENSOR_SIZE: usize = 24;
const OFF_SENSOR_COUNT: usize = 28;
const OFF_READING_SECTION: usize = 32;
const OFF_READING_SIZE: usize = 36;
const OFF_READING_COUNT: usize = 40;

// Sensor element field offsets.
pub const SENSOR_OFF_ID: usize = 0;
pub const SENSOR_OFF_INSTANCE: usize = 4;
pub const SENSOR_OFF_NAME_ORIG: usize = 8;
pub const SENSOR_OFF_NAME_USER: usize = 8 + STRING_LEN;
/// Minimum sensor element stride covering all fixed fields.
pub const SENSOR_ELEMENT_MIN: usize = 8 + 2 * STRING_LEN;

// Reading element field offsets. The four doubles sit directly after the
// unit string; they are located by fixed offset, never by search.
pub const READING_OFF_TYPE: usize = 0;
pub const READING_OFF_SENSOR_INDEX: usize = 4;
pub const READING_OFF_ID: usize = 8;
pub const READING_OFF_LABEL_ORIG: usize = 12;
pub const READING_OFF_LABEL_USER: usize = 12 + STRING_LEN;
pub const READING_OFF_UNIT: usize = 12 + 2 * STRING_LEN;
pub const READING_OFF_VALUE: usize = READING_OFF_UNIT + UNIT_STRING_LEN;
pub const READING_OFF_VALUE_MIN: usize = READING_OFF_VALUE + 8;
pub const READING_OFF_VALUE_MAX: usize = READING_OFF_VALUE_MIN + 8;
pub const READING_OFF_VALUE_AVG: usize = READING_OFF_VALUE_MAX + 8;
/// Minimum reading element stride covering all fixed fields.
pub const READING_ELEMENT_MIN: usize = READING_OFF_VALUE_AVG + 8;

/// Parsed fixed header of the shared memory region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub signature: [u8; 4],
    pub version: u32,
    pub revision: u32,
    pub poll_time: u64,
    pub sensor_section_offset: u32,
    pub sensor_element_size: u32,
    pub sensor_element_count: u32,
    pub reading_section_offset: u32,
    pub reading_element_size: u32,
    pub reading_element_count: u32,
}

impl Header {
    /// Parse the fixed header from the front of a region buffer.
    pub fn parse(data: &[u8]) -> Result<Self> {
        if data.len() < HEADER_LEN {
            return Err(BridgeError::integrity(format!(
                "region too small for header: {} bytes, need {}",
                data.len(),
                HEADER_LEN
            )));
        }
        let mut signature = [0u8; 4];
        signature.copy_from_slice(&data[OFF_SIGNATURE..OFF_SIGNATURE + 4]);
        Ok(Header {
            signature,
            version: read_u32(data, OFF_VERSION)?,
            revision: read_u32(data, OFF_REVISION)?,
            poll_time: read_u64(data, OFF_POLL_TIME)?,
            sensor_section_offset: read_u32(data, OFF_SENSOR_SECTION)?,
            sensor_element_size: read_u32(data, OFF_SENSOR_SIZE)?,
            sensor_element_count: read_u32(data, OFF_SENSOR_COUNT)?,
            reading_section_offset: read_u32(data, OFF_READING_SECTION)?,
            reading_element_size: read_u32(data, OFF_READING_SIZE)?,
            reading_element_count: read_u32(data, OFF_READING_COUNT)?,
        })
    }

    /// Total region length declared by the header:
    /// reading section offset + stride * count.
    pub fn total_len(&self) -> usize {
        self.reading_section_offset as usize
            + self.reading_element_size as usize * self.reading_element_count as usize
    }

    /// Signature as text, e.g. "HWiS" or "DEAD".
    pub fn signature_str(&self) -> String {
        decode_latin1(&self.signature)
    }
}

pub(crate) fn read_u32(data: &[u8], offset: usize) -> Result<u32> {
    let bytes = data
        .get(offset..offset + 4)
        .ok_or_else(|| out_of_bounds(offset, 4, data.len()))?;
    Ok(u32::from_le_bytes(bytes.try_into().unwrap()))
}

pub(crate) fn read_u64(data: &[u8], offset: usize) -> Result<u64> {
    let bytes = data
        .get(offset..offset + 8)
        .ok_or_else(|| out_of_bounds(offset, 8, data.len()))?;
    Ok(u64::from_le_bytes(bytes.try_into().unwrap()))
}

pub(crate) fn read_f64(data: &[u8], offset: usize) -> Result<f64> {
    let bytes = data
        .get(offset..offset + 8)
        .ok_or_else(|| out_of_bounds(offset, 8, data.len()))?;
    Ok(f64::from_le_bytes(bytes.try_into().unwrap()))
}

/// Decode a fixed-width, NUL-terminated string field.
pub(crate) fn read_string(data: &[u8], offset: usize, width: usize) -> Result<String> {
    let bytes = data
        .get(offset..offset + width)
        .ok_or_else(|| out_of_bounds(offset, width, data.len()))?;
    let end = bytes.iter().position(|&b| b == 0).unwrap_or(width);
    Ok(decode_latin1(&bytes[..end]))
}

/// HWiNFO strings are ISO-8859-1, not UTF-8. Latin-1 maps every byte value
/// directly onto the matching Unicode code point, so the conversion is exact
/// and deterministic for the full byte range.
pub(crate) fn decode_latin1(bytes: &[u8]) -> String {
    bytes.iter().map(|&b| b as char).collect()
}

fn out_of_bounds(offset: usize, len: usize, buf_len: usize) -> BridgeError {
    BridgeError::integrity(format!(
        "field at {}..{} exceeds buffer of {} bytes",
        offset,
        offset + len,
        buf_len
    ))
}
