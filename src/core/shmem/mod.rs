//! Decoded view over one copy of the HWiNFO shared memory region.
//!
//! A [`Snapshot`] owns its bytes: the shared region reader hands over a fresh
//! copy per poll, so a snapshot never aliases the reader's scratch buffer and
//! stays valid after the next poll supersedes it.

pub mod layout;
pub mod reading;
pub mod sensor;

pub use layout::Header;
pub use reading::{ReadingRecord, ReadingType};
pub use sensor::SensorRecord;

use crate::error::{BridgeError, Result};
use layout::{READING_ELEMENT_MIN, SENSOR_ELEMENT_MIN, SIGNATURE_ACTIVE, SIGNATURE_DEAD};

/// One immutable, fully validated copy of the shared memory region.
///
/// Created once per poll tick and never mutated; the next poll replaces it
/// wholesale.
#[derive(Debug, Clone)]
pub struct Snapshot {
    header: Header,
    data: Vec<u8>,
}

impl Snapshot {
    /// Validate and take ownership of a region copy.
    ///
    /// Rejects buffers whose declared sections fall outside the buffer, whose
    /// element strides do not cover the fixed fields, or whose signature is
    /// not the active tag. A "DEAD" signature means HWiNFO shut down its
    /// shared memory support and maps to [`BridgeError::Unavailable`].
    pub fn decode(data: Vec<u8>) -> Result<Self> {
        let header = Header::parse(&data)?;

        if header.signature == SIGNATURE_DEAD {
            return Err(BridgeError::unavailable(
                "shared memory inactive (signature DEAD)",
            ));
        }
        if header.signature != SIGNATURE_ACTIVE {
            return Err(BridgeError::integrity(format!(
                "unexpected signature {:?}",
                header.signature_str()
            )));
        }

        if header.sensor_element_count > 0 {
            if (header.sensor_element_size as usize) < SENSOR_ELEMENT_MIN {
                return Err(BridgeError::integrity(format!(
                    "sensor element size {} below minimum {}",
                    header.sensor_element_size, SENSOR_ELEMENT_MIN
                )));
            }
            let end = header.sensor_section_offset as usize
                + header.sensor_element_size as usize * header.sensor_element_count as usize;
            if end > data.len() {
                return Err(BridgeError::integrity(format!(
                    "sensor section ends at {} but buffer is {} bytes",
                    end,
                    data.len()
                )));
            }
        }

        if header.reading_element_count > 0 {
            if (header.reading_element_size as usize) < READING_ELEMENT_MIN {
                return Err(BridgeError::integrity(format!(
                    "reading element size {} below minimum {}",
                    header.reading_element_size, READING_ELEMENT_MIN
                )));
            }
            let end = header.reading_section_offset as usize
                + header.reading_element_size as usize * header.reading_element_count as usize;
            if end > data.len() {
                return Err(BridgeError::integrity(format!(
                    "reading section ends at {} but buffer is {} bytes",
                    end,
                    data.len()
                )));
            }
        }

        Ok(Snapshot { header, data })
    }

    pub fn header(&self) -> &Header {
        &self.header
    }

    /// Last polling time recorded by HWiNFO (seconds since the epoch).
    pub fn poll_time(&self) -> u64 {
        self.header.poll_time
    }

    pub fn version(&self) -> u32 {
        self.header.version
    }

    pub fn revision(&self) -> u32 {
        self.header.revision
    }

    pub fn sensor_count(&self) -> usize {
        self.header.sensor_element_count as usize
    }

    pub fn reading_count(&self) -> usize {
        self.header.reading_element_count as usize
    }

    /// Decode the sensor at the given position in the sensor section.
    pub fn sensor(&self, pos: usize) -> Result<SensorRecord> {
        if pos >= self.sensor_count() {
            return Err(BridgeError::integrity(format!(
                "sensor position {} out of range for {} elements",
                pos,
                self.sensor_count()
            )));
        }
        let stride = self.header.sensor_element_size as usize;
        let start = self.header.sensor_section_offset as usize + pos * stride;
        SensorRecord::decode(&self.data[start..start + stride])
    }

    /// Decode the reading at the given position in the reading section.
    pub fn reading(&self, pos: usize) -> Result<ReadingRecord> {
        if pos >= self.reading_count() {
            return Err(BridgeError::integrity(format!(
                "reading position {} out of range for {} elements",
                pos,
                self.reading_count()
            )));
        }
        let stride = self.header.reading_element_size as usize;
        let start = self.header.reading_section_offset as usize + pos * stride;
        ReadingRecord::decode(&self.data[start..start + stride])
    }

    /// Iterate sensors in section order.
    pub fn sensors(&self) -> impl Iterator<Item = Result<SensorRecord>> + '_ {
        (0..self.sensor_count()).map(move |pos| self.sensor(pos))
    }

    /// Iterate readings in section order.
    pub fn readings(&self) -> impl Iterator<Item = Result<ReadingRecord>> + '_ {
        (0..self.reading_count()).map(move |pos| self.reading(pos))
    }
}
