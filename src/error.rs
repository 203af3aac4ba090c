//! Error types

use core::fmt;

/// Failure to get a usable reading out of a sensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// The bus transfer itself failed
    Bus,
    /// The sensor did not answer in time
    Timeout,
    /// The transferred data did not match its checksum
    Checksum,
    /// The sensor refused to load its calibration
    NotCalibrated,
    /// The reading is outside what the sensor can physically deliver
    Implausible,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            SensorError::Bus => "bus transfer failed",
            SensorError::Timeout => "sensor timed out",
            SensorError::Checksum => "checksum mismatch",
            SensorError::NotCalibrated => "sensor not calibrated",
            SensorError::Implausible => "implausible reading",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireError {
    /// Zero length datagram
    EmptyRequest,
    /// Nothing has been measured yet
    NoReading,
    BufferTooSmall,
    Malformed,
}

impl fmt::Display for WireError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            WireError::EmptyRequest => "empty request",
            WireError::NoReading => "no reading available yet",
            WireError::BufferTooSmall => "reply does not fit into buffer",
            WireError::Malformed => "malformed reply",
        };
        f.write_str(msg)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    InvalidNodeId,
    InvalidPort,
    InvalidInterval,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let msg = match self {
            ConfigError::InvalidNodeId => "NODE_ID must be a number in 0..=255",
            ConfigError::InvalidPort => "UDP_PORT must be a number in 1..=65535",
            ConfigError::InvalidInterval => "MEASURE_INTERVAL_SECS must be a positive number",
        };
        f.write_str(msg)
    }
}
