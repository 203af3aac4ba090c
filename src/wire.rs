//! JSON reply sent to the data collector and the phone app.

use serde::{Deserialize, Serialize};

use crate::error::WireError;
use crate::model::SensorRecord;

/// Upper bound for an encoded reply, five fields of at most ~25 bytes.
pub const MAX_REPLY_LEN: usize = 128;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SensorReply {
    #[serde(rename = "ID")]
    pub id: u8,
    #[serde(rename = "T")]
    pub temperature: f64,
    #[serde(rename = "rH")]
    pub relative_humidity: f64,
    #[serde(rename = "aH")]
    pub absolute_humidity: f64,
    /// hPa, only sent by nodes with a pressure sensor
    #[serde(rename = "p", default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
}

impl SensorReply {
    pub fn from_record<R: SensorRecord>(id: u8, record: &R) -> Self {
        Self {
            id,
            temperature: record.temperature(),
            relative_humidity: record.relative_humidity(),
            absolute_humidity: record.absolute_humidity(),
            pressure: None,
        }
    }
}

/// Serialize `record` into `buf`, returning the number of bytes written.
pub fn encode_reply<R: SensorRecord>(
    id: u8,
    record: &R,
    buf: &mut [u8],
) -> Result<usize, WireError> {
    serde_json_core::to_slice(&SensorReply::from_record(id, record), buf)
        .map_err(|_| WireError::BufferTooSmall)
}

pub fn decode_reply(bytes: &[u8]) -> Result<SensorReply, WireError> {
    serde_json_core::from_slice::<SensorReply>(bytes)
        .map(|(reply, _)| reply)
        .map_err(|_| WireError::Malformed)
}
